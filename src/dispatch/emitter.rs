//! The dispatcher: emission, subscription, and one-shot waits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use miette::Diagnostic;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::trace;

use super::api::{EventApi, Outcome};
use super::query::Query;
use super::registry::{Handler, HandlerBucket, Registry};
use crate::global::Excevent;
use crate::priority::PriorityMap;
use crate::types::{ClassToken, EventList, HandlerId, Priority, Source, SourceId};

/// Anything that owns an [`Emitter`] and wants the system to find it.
///
/// Implementing this is what makes a type a *host*: an `own_handler` binding
/// in a [`SubscriberSpec`](crate::global::SubscriberSpec) reaches the
/// instance's registry through it.
pub trait EventHost<A: 'static, R: 'static = A> {
    fn events(&self) -> &Emitter<A, R>;
}

/// A cheap, cloneable reference to one host's registry.
///
/// Lets other parties target a specific host instance (as a
/// [`Source::Host`](crate::types::Source)) without borrowing or owning the
/// host itself.
pub struct HostHandle<A: 'static, R: 'static = A> {
    registry: Arc<Registry<A, R>>,
}

impl<A, R> Clone for HostHandle<A, R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A, R> HostHandle<A, R> {
    pub(crate) fn from_registry(registry: Arc<Registry<A, R>>) -> Self {
        Self { registry }
    }

    pub fn id(&self) -> SourceId {
        self.registry.id()
    }

    pub(crate) fn registry(&self) -> &Arc<Registry<A, R>> {
        &self.registry
    }
}

/// Priority-ordered event dispatcher for one host.
///
/// Generic over the argument payload `A` every handler receives by reference
/// and the result type `R` handlers produce. An emitter created with
/// [`new`](Self::new) dispatches only to its own subscribers; one created
/// with [`attached`](Self::attached) additionally folds in the handlers of
/// its class registry and of every bus the class is wired to, all merged into
/// a single descending priority order.
///
/// ```
/// use excevent::dispatch::Emitter;
///
/// let emitter: Emitter<u32, u32> = Emitter::new();
/// emitter.on("doubled", |_api, n| (n * 2).into());
/// assert_eq!(emitter.emit("doubled", &21), vec![42]);
/// ```
pub struct Emitter<A: 'static, R: 'static = A> {
    registry: Arc<Registry<A, R>>,
    class: Option<ClassToken>,
    coordinator: Option<Arc<Excevent<A, R>>>,
}

impl<A, R> Default for Emitter<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Emitter<A, R> {
    /// A standalone emitter with no class or bus participation.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            class: None,
            coordinator: None,
        }
    }

    /// An emitter whose emissions also reach `class`'s shared registry and
    /// any buses that class is wired to through `coordinator`.
    pub fn attached(coordinator: &Arc<Excevent<A, R>>, class: ClassToken) -> Self {
        Self {
            registry: Registry::new(),
            class: Some(class),
            coordinator: Some(Arc::clone(coordinator)),
        }
    }

    /// A handle other parties can use to target this host.
    pub fn handle(&self) -> HostHandle<A, R> {
        HostHandle {
            registry: Arc::clone(&self.registry),
        }
    }

    pub(crate) fn registry(&self) -> &Arc<Registry<A, R>> {
        &self.registry
    }

    pub fn class(&self) -> Option<&ClassToken> {
        self.class.as_ref()
    }

    /// The registry a [`Source`] stands for, if it can be reached from this
    /// emitter. Bus and class sources need an attached coordinator.
    pub(crate) fn resolve_source(&self, source: &Source<A, R>) -> Option<Arc<Registry<A, R>>> {
        match source {
            Source::Host(handle) => Some(Arc::clone(handle.registry())),
            Source::Bus(key) => self
                .coordinator
                .as_ref()
                .map(|coordinator| coordinator.bus_registry(key)),
            Source::Class(token) => self
                .coordinator
                .as_ref()
                .map(|coordinator| coordinator.class_registry(token)),
        }
    }

    /// Register `handler` under each event in `events` at `priority`.
    ///
    /// Returns the token that [`unsubscribe`](Self::unsubscribe) takes. One
    /// token covers every event in the list.
    pub fn subscribe<E, F>(&self, events: E, priority: Priority, handler: F) -> HandlerId
    where
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        let events = events.into();
        let id = HandlerId::next();
        let handler: Handler<A, R> = Arc::new(handler);
        for event in events.iter() {
            self.registry
                .add_handler(event, priority, id, Arc::clone(&handler));
        }
        trace!(host = ?self.registry.id(), events = %events, priority, "subscribed handler");
        id
    }

    /// [`subscribe`](Self::subscribe) at the default priority of 0.
    pub fn on<E, F>(&self, events: E, handler: F) -> HandlerId
    where
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        self.subscribe(events, 0, handler)
    }

    /// Remove the handler registered under `id` from each event in `events`
    /// at `priority`. Returns true if at least one registration was removed.
    pub fn unsubscribe<E>(&self, events: E, priority: Priority, id: HandlerId) -> bool
    where
        E: Into<EventList>,
    {
        let events = events.into();
        let mut removed = false;
        for event in events.iter() {
            removed |= self.registry.remove_handler(event, priority, id);
        }
        removed
    }

    /// True if emitting any of `events` would reach at least one handler,
    /// counting class and bus subscribers for attached emitters.
    pub fn has_handlers<E: Into<EventList>>(&self, events: E) -> bool {
        events.into().iter().any(|event| {
            self.registry.has_event(event)
                || match (&self.coordinator, &self.class) {
                    (Some(coordinator), Some(class)) => coordinator.class_has_event(class, event),
                    _ => false,
                }
        })
    }

    /// Every bucket map a dispatch of `event` draws from, own registry
    /// first, then class, then wired buses in wiring order.
    pub(crate) fn gather(&self, event: &str) -> Vec<PriorityMap<HandlerBucket<A, R>>> {
        let mut snapshots = Vec::with_capacity(1);
        if let Some(own) = self.registry.snapshot(event) {
            snapshots.push(own);
        }
        if let (Some(coordinator), Some(class)) = (&self.coordinator, &self.class) {
            coordinator.external_snapshots(class, event, &mut snapshots);
        }
        snapshots
    }

    /// Dispatch `event` to every subscribed handler, highest priority first,
    /// and collect their results in invocation order.
    ///
    /// Handlers run synchronously on the calling thread against a snapshot of
    /// the subscription state, so a handler may freely emit, subscribe, or
    /// unsubscribe on this same emitter; such changes take effect from the
    /// next dispatch. A [`stop`](EventApi::stop) halts the remainder and the
    /// results so far are returned; a [`disregard`](EventApi::disregard)
    /// drops the current handler's contribution.
    pub fn emit(&self, event: &str, args: &A) -> Vec<R> {
        let snapshots = self.gather(event);
        if snapshots.is_empty() {
            return Vec::new();
        }
        let maps: Vec<&PriorityMap<HandlerBucket<A, R>>> = snapshots.iter().collect();

        let mut api = EventApi::new(self.registry.id(), event);
        let mut results = Vec::new();
        let mut invoked = 0usize;
        PriorityMap::map_all(
            &maps,
            |api: &mut EventApi<'_>, bucket| {
                dispatch_bucket(bucket, api, args, &mut invoked, |outcome| {
                    outcome.append_to(&mut results);
                });
            },
            &mut api,
        );
        trace!(event, handlers = invoked, results = results.len(), "emitted");
        results
    }

    /// Begin a filtered single-result lookup over `event`'s handlers.
    ///
    /// Nothing is dispatched until [`Query::get`] runs.
    pub fn query<'q>(&'q self, event: &'q str, args: &'q A) -> Query<'q, A, R> {
        Query::new(self, event, args)
    }
}

impl<A: Clone + Send, R> Emitter<A, R> {
    /// Resolve once with the arguments of the next emission of any of
    /// `events`.
    ///
    /// The wait rides a hidden handler at `Priority::MIN`, so every ordinary
    /// handler of that emission runs first; the hidden handler contributes
    /// nothing to the emission's results and removes itself after firing.
    /// Dropping the returned [`EventWait`] before the event fires leaves the
    /// hidden handler in place until the next emission, which removes it.
    pub fn wait_for<E: Into<EventList>>(&self, events: E) -> EventWait<A> {
        self.wait_for_at(events, Priority::MIN)
    }

    /// [`wait_for`](Self::wait_for), observing the emission at a chosen
    /// priority instead of after all other handlers.
    pub fn wait_for_at<E: Into<EventList>>(&self, events: E, priority: Priority) -> EventWait<A> {
        let events = events.into();
        let (sender, receiver) = oneshot::channel::<A>();
        let slot: Arc<Mutex<Option<oneshot::Sender<A>>>> = Arc::new(Mutex::new(Some(sender)));

        let id = HandlerId::next();
        let registry = Arc::downgrade(&self.registry);
        let watched = events.clone();
        let handler: Handler<A, R> = Arc::new(move |api, args| {
            if let Some(sender) = slot.lock().take() {
                // Receiver may have been dropped; the wait is over either way.
                let _ = sender.send(args.clone());
            }
            if let Some(registry) = registry.upgrade() {
                for event in watched.iter() {
                    registry.remove_handler(event, priority, id);
                }
            }
            api.disregard();
            Outcome::Skip
        });
        for event in events.iter() {
            self.registry.add_handler(event, priority, id, Arc::clone(&handler));
        }

        EventWait { receiver }
    }
}

/// Apply one bucket's handlers — direct first, then references in
/// registration order — feeding each kept outcome to `sink`.
fn dispatch_bucket<A, R>(
    bucket: &HandlerBucket<A, R>,
    api: &mut EventApi<'_>,
    args: &A,
    invoked: &mut usize,
    mut sink: impl FnMut(Outcome<R>),
) {
    let mut run = |api: &mut EventApi<'_>, handler: &Handler<A, R>| {
        api.index = *invoked;
        *invoked += 1;
        let outcome = handler(api, args);
        if !api.take_disregard() {
            sink(outcome);
        }
    };

    for (_, handler) in bucket.handlers() {
        run(api, handler);
        if api.stopped() {
            return;
        }
    }
    for group in bucket.reference_groups() {
        for (_, handler) in group.entries() {
            run(api, handler);
            if api.stopped() {
                return;
            }
        }
    }
}

/// Failure modes of an [`EventWait`].
#[derive(Debug, Error, Diagnostic)]
pub enum WaitError {
    /// The emitter side of the wait went away before the event fired.
    #[error("event wait closed before the event fired")]
    #[diagnostic(code(excevent::wait_closed))]
    Closed,
}

/// A pending [`Emitter::wait_for`], resolving to the arguments of the
/// awaited emission.
pub struct EventWait<A> {
    receiver: oneshot::Receiver<A>,
}

impl<A> EventWait<A> {
    /// Non-blocking check: the arguments if the event has already fired.
    pub fn try_take(&mut self) -> Option<A> {
        self.receiver.try_recv().ok()
    }
}

impl<A> Future for EventWait<A> {
    type Output = Result<A, WaitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| WaitError::Closed))
    }
}
