//! Declarative handler specs: which methods of a subscriber type listen to
//! what, where.
//!
//! A [`SubscriberSpec`] is built once per subscriber type and describes every
//! event binding its instances carry: the bound method (a closure over
//! `&T`), the [`Source`] it listens on, the events, and the priority.
//! Instances are then attached and detached as a unit through
//! [`Excevent::subscribe`](crate::global::Excevent::subscribe) and
//! [`Excevent::unsubscribe`](crate::global::Excevent::unsubscribe).
//!
//! Specs compose: [`SubscriberSpec::extend`] pulls a component type's
//! bindings into an outer type's spec through a projection, the closest
//! thing a flat struct world has to inheriting a parent class's handlers.

use std::sync::Arc;

use crate::dispatch::registry::{Handler, Registry};
use crate::dispatch::{EventApi, EventHost, Outcome};
use crate::types::{EventList, Priority, Source};

/// A method bound to events: receives the instance, the dispatch context,
/// and the emission arguments.
pub type InvokeFn<T, A, R> =
    Arc<dyn Fn(&T, &mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync>;

pub(crate) enum BindingTarget<T: 'static, A: 'static, R: 'static> {
    /// A bus, class, or specific-host source, resolved at (un)subscribe
    /// time.
    Source(Source<A, R>),
    /// The subscribing instance's own registry, resolved through the
    /// instance itself.
    Own(Arc<dyn Fn(&T) -> Arc<Registry<A, R>> + Send + Sync>),
}

impl<T, A, R> Clone for BindingTarget<T, A, R> {
    fn clone(&self) -> Self {
        match self {
            BindingTarget::Source(source) => BindingTarget::Source(source.clone()),
            BindingTarget::Own(resolve) => BindingTarget::Own(Arc::clone(resolve)),
        }
    }
}

/// One method-to-events binding within a [`SubscriberSpec`].
pub(crate) struct MethodBinding<T: 'static, A: 'static, R: 'static> {
    method: String,
    target: BindingTarget<T, A, R>,
    events: EventList,
    priority: Priority,
    invoke: InvokeFn<T, A, R>,
}

impl<T, A, R> Clone for MethodBinding<T, A, R> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            target: self.target.clone(),
            events: self.events.clone(),
            priority: self.priority,
            invoke: Arc::clone(&self.invoke),
        }
    }
}

impl<T, A, R> MethodBinding<T, A, R> {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn target(&self) -> &BindingTarget<T, A, R> {
        &self.target
    }

    pub(crate) fn events(&self) -> &EventList {
        &self.events
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }
}

impl<T: Send + Sync + 'static, A, R> MethodBinding<T, A, R> {
    /// Bind the invoke closure to a concrete instance.
    ///
    /// The produced handler holds the instance weakly: a binding left behind
    /// by a dropped subscriber disregards itself instead of keeping the
    /// instance alive.
    pub(crate) fn materialize(&self, instance: &Arc<T>) -> Handler<A, R> {
        let instance = Arc::downgrade(instance);
        let invoke = Arc::clone(&self.invoke);
        Arc::new(move |api, args| match instance.upgrade() {
            Some(instance) => invoke(&instance, api, args),
            None => {
                api.disregard();
                Outcome::Skip
            }
        })
    }
}

/// The full set of event bindings for one subscriber type.
///
/// ```
/// use excevent::global::SubscriberSpec;
/// use excevent::types::ClassToken;
///
/// struct Doorman {
///     name: String,
/// }
///
/// let guests = ClassToken::new("Guest");
/// let spec: SubscriberSpec<Doorman, String, String> = SubscriberSpec::new("Doorman")
///     .handler("greet", &guests, "arrived", 0, |doorman: &Doorman, _api, who| {
///         format!("{} welcomes {who}", doorman.name).into()
///     });
/// assert_eq!(spec.name(), "Doorman");
/// ```
pub struct SubscriberSpec<T: 'static, A: 'static, R: 'static = A> {
    name: String,
    bindings: Vec<MethodBinding<T, A, R>>,
}

impl<T, A, R> Clone for SubscriberSpec<T, A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

impl<T, A, R> SubscriberSpec<T, A, R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `method` to `events` on an external source.
    ///
    /// `method` is a label, unique per spec, that identifies the binding for
    /// deregistration and diagnostics.
    pub fn handler<S, E, F>(
        mut self,
        method: &str,
        source: S,
        events: E,
        priority: Priority,
        invoke: F,
    ) -> Self
    where
        S: Into<Source<A, R>>,
        E: Into<EventList>,
        F: Fn(&T, &mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        self.bindings.push(MethodBinding {
            method: method.to_string(),
            target: BindingTarget::Source(source.into()),
            events: events.into(),
            priority,
            invoke: Arc::new(invoke),
        });
        self
    }

    /// Bind `method` to `events` emitted by the subscribing instance itself.
    pub fn own_handler<E, F>(mut self, method: &str, events: E, priority: Priority, invoke: F) -> Self
    where
        T: EventHost<A, R>,
        E: Into<EventList>,
        F: Fn(&T, &mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        self.bindings.push(MethodBinding {
            method: method.to_string(),
            target: BindingTarget::Own(Arc::new(|host: &T| Arc::clone(host.events().registry()))),
            events: events.into(),
            priority,
            invoke: Arc::new(invoke),
        });
        self
    }

    /// Inherit every binding of a component type's spec, reached through
    /// `project`.
    ///
    /// The inherited bindings invoke the component's methods against the
    /// projected field, so a type embedding another subscriber keeps the
    /// embedded bindings alive under its own subscription.
    pub fn extend<P>(mut self, parent: &SubscriberSpec<P, A, R>, project: fn(&T) -> &P) -> Self
    where
        P: Send + Sync + 'static,
    {
        for binding in &parent.bindings {
            let invoke = Arc::clone(&binding.invoke);
            let target = match &binding.target {
                BindingTarget::Source(source) => BindingTarget::Source(source.clone()),
                BindingTarget::Own(resolve) => {
                    let resolve = Arc::clone(resolve);
                    BindingTarget::Own(Arc::new(move |host: &T| resolve(project(host))))
                }
            };
            self.bindings.push(MethodBinding {
                method: format!("{}::{}", parent.name, binding.method),
                target,
                events: binding.events.clone(),
                priority: binding.priority,
                invoke: Arc::new(move |host: &T, api, args| invoke(project(host), api, args)),
            });
        }
        self
    }

    pub(crate) fn bindings(&self) -> &[MethodBinding<T, A, R>] {
        &self.bindings
    }
}
