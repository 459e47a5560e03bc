//! Scoped subscriptions that expire when a chosen event fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::warn;

use super::api::{EventApi, Outcome};
use super::emitter::Emitter;
use super::registry::{Handler, Registry};
use crate::types::{EventList, HandlerId, Priority, Source};

/// A registration collected during setup, not yet attached.
struct Pending<A: 'static, R: 'static> {
    registry: Arc<Registry<A, R>>,
    events: EventList,
    priority: Priority,
    id: HandlerId,
    handler: Handler<A, R>,
}

struct Tracked<A: 'static, R: 'static> {
    registry: Weak<Registry<A, R>>,
    events: EventList,
    priority: Priority,
    id: HandlerId,
}

/// Collects the subscriptions made inside an [`Emitter::until`] or
/// [`Emitter::until_on`] setup closure.
///
/// Nothing attaches while the closure runs: registrations are collected
/// first and take effect together once the expiry source is in hand, so a
/// scope whose expiry can never fire attaches nothing at all. The expiry
/// event later tears every attached registration down together.
pub struct UntilScope<'u, A: 'static, R: 'static> {
    emitter: &'u Emitter<A, R>,
    pending: Vec<Pending<A, R>>,
}

impl<A, R> UntilScope<'_, A, R> {
    /// Subscribe on the owning emitter for the lifetime of the scope.
    pub fn subscribe<E, F>(&mut self, events: E, priority: Priority, handler: F) -> HandlerId
    where
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        self.collect(Arc::clone(self.emitter.registry()), events.into(), priority, Arc::new(handler))
    }

    /// [`subscribe`](Self::subscribe) at the default priority of 0.
    pub fn on<E, F>(&mut self, events: E, handler: F) -> HandlerId
    where
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        self.subscribe(events, 0, handler)
    }

    /// Subscribe on another source — a bus, a class, or a specific host —
    /// for the lifetime of the scope.
    ///
    /// Bus and class sources resolve through the owning emitter's
    /// coordinator; on a detached emitter the registration is skipped with a
    /// warning and `None` is returned.
    pub fn subscribe_source<S, E, F>(
        &mut self,
        source: S,
        events: E,
        priority: Priority,
        handler: F,
    ) -> Option<HandlerId>
    where
        S: Into<Source<A, R>>,
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        let source = source.into();
        let Some(registry) = self.emitter.resolve_source(&source) else {
            warn!(source = ?source, "cannot subscribe through a detached emitter; skipping");
            return None;
        };
        Some(self.collect(registry, events.into(), priority, Arc::new(handler)))
    }

    fn collect(
        &mut self,
        registry: Arc<Registry<A, R>>,
        events: EventList,
        priority: Priority,
        handler: Handler<A, R>,
    ) -> HandlerId {
        let id = HandlerId::next();
        self.pending.push(Pending {
            registry,
            events,
            priority,
            id,
            handler,
        });
        id
    }
}

impl<A, R> Emitter<A, R> {
    /// Run `setup`, keeping every subscription it makes only until this
    /// emitter next dispatches one of `events`.
    ///
    /// Teardown rides a hidden handler at `Priority::MIN` on each expiry
    /// event, so the scoped handlers still see the expiring emission itself.
    /// A setup that registers nothing is a no-op (logged at warn level).
    pub fn until<E>(&self, events: E, setup: impl FnOnce(&mut UntilScope<'_, A, R>))
    where
        E: Into<EventList>,
    {
        let events: EventList = events.into();
        let mut scope = UntilScope {
            emitter: self,
            pending: Vec::new(),
        };
        setup(&mut scope);
        if scope.pending.is_empty() {
            warn!(until = %events, "until scope registered no subscriptions");
            return;
        }
        let tracked = attach_all(scope.pending);
        install_cleanup(self.registry(), &events, tracked);
    }

    /// [`until`](Self::until), expiring when `events` fire on `source`
    /// rather than on this emitter.
    ///
    /// If `source` cannot be reached — a bus or class on an emitter with no
    /// coordinator — the scope attaches nothing: a warning is logged and the
    /// collected registrations are discarded rather than left alive with no
    /// way to expire.
    pub fn until_on<S, E>(
        &self,
        source: S,
        events: E,
        setup: impl FnOnce(&mut UntilScope<'_, A, R>),
    ) where
        S: Into<Source<A, R>>,
        E: Into<EventList>,
    {
        let source = source.into();
        let events: EventList = events.into();
        let mut scope = UntilScope {
            emitter: self,
            pending: Vec::new(),
        };
        setup(&mut scope);
        if scope.pending.is_empty() {
            warn!(until = %events, "until scope registered no subscriptions");
            return;
        }
        let Some(target) = self.resolve_source(&source) else {
            warn!(
                source = ?source,
                until = %events,
                "cannot resolve expiry source; registering nothing"
            );
            return;
        };
        let tracked = attach_all(scope.pending);
        install_cleanup(&target, &events, tracked);
    }
}

/// Attach every collected registration, handing back what the teardown
/// handler needs to undo them.
fn attach_all<A, R>(pending: Vec<Pending<A, R>>) -> Vec<Tracked<A, R>> {
    pending
        .into_iter()
        .map(|entry| {
            for event in entry.events.iter() {
                entry
                    .registry
                    .add_handler(event, entry.priority, entry.id, Arc::clone(&entry.handler));
            }
            Tracked {
                registry: Arc::downgrade(&entry.registry),
                events: entry.events,
                priority: entry.priority,
                id: entry.id,
            }
        })
        .collect()
}

/// Attach the one-shot teardown handler for a scope to `target` under each
/// expiry event.
fn install_cleanup<A, R>(
    target: &Arc<Registry<A, R>>,
    events: &EventList,
    tracked: Vec<Tracked<A, R>>,
) {
    let id = HandlerId::next();
    let fired = AtomicBool::new(false);
    let target_weak = Arc::downgrade(target);
    let expiry_events = events.clone();

    let handler: Handler<A, R> = Arc::new(move |api, _args| {
        api.disregard();
        // The expiry events may share a dispatch; only the first fire tears
        // down.
        if fired.swap(true, Ordering::SeqCst) {
            return Outcome::Skip;
        }
        for entry in &tracked {
            if let Some(registry) = entry.registry.upgrade() {
                for event in entry.events.iter() {
                    registry.remove_handler(event, entry.priority, entry.id);
                }
            }
        }
        if let Some(target) = target_weak.upgrade() {
            for event in expiry_events.iter() {
                target.remove_handler(event, Priority::MIN, id);
            }
        }
        Outcome::Skip
    });

    for event in events.iter() {
        target.add_handler(event, Priority::MIN, id, Arc::clone(&handler));
    }
}
