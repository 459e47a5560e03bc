//! The coordinator: named buses, class registries, and subscriber
//! lifecycles.

use std::any::Any;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::batch::BatchSubscriber;
use super::bindings::{BindingTarget, SubscriberSpec};
use crate::dispatch::registry::{HandlerBucket, Registry};
use crate::dispatch::{Emitter, HostHandle};
use crate::priority::PriorityMap;
use crate::types::{ClassId, ClassToken, Priority, Source, SubscriberId};

/// One registry attachment made on a subscriber's behalf, remembered so it
/// can be undone if the instance is dropped without unsubscribing.
struct ReferenceEntry<A: 'static, R: 'static> {
    registry: Weak<Registry<A, R>>,
    event: String,
    priority: Priority,
    method: String,
}

struct SubscriberRecord<A: 'static, R: 'static> {
    instance: Weak<dyn Any + Send + Sync>,
    entries: Vec<ReferenceEntry<A, R>>,
}

struct State<A: 'static, R: 'static> {
    buses: FxHashMap<String, Arc<Registry<A, R>>>,
    classes: FxHashMap<ClassId, Arc<Registry<A, R>>>,
    /// Bus keys each class feeds, in registration order.
    wirings: FxHashMap<ClassId, Vec<String>>,
    subscribed: FxHashMap<SubscriberId, SubscriberRecord<A, R>>,
}

impl<A, R> Default for State<A, R> {
    fn default() -> Self {
        Self {
            buses: FxHashMap::default(),
            classes: FxHashMap::default(),
            wirings: FxHashMap::default(),
            subscribed: FxHashMap::default(),
        }
    }
}

impl<A, R> State<A, R> {
    /// Drop every subscriber whose instance is gone, pulling its reference
    /// entries out of the registries they were attached to.
    ///
    /// A `SubscriberId` is an allocation address, so a stale record could
    /// otherwise shadow a new instance that happens to land on the same
    /// address.
    fn evict_dead(&mut self) {
        self.subscribed.retain(|subscriber, record| {
            if record.instance.strong_count() > 0 {
                return true;
            }
            for entry in &record.entries {
                if let Some(registry) = entry.registry.upgrade() {
                    registry.remove_reference(
                        &entry.event,
                        entry.priority,
                        &entry.method,
                        *subscriber,
                    );
                }
            }
            false
        });
    }
}

/// Shared coordination point for one dispatch universe.
///
/// An `Excevent` owns the registries that exist apart from any single host:
/// one per named bus and one per [`ClassToken`]. Hosts participate by being
/// created with [`Emitter::attached`]; their emissions then also consult
/// their class registry and, through [`register_bus`](Self::register_bus)
/// wirings, the bus registries.
///
/// It is also the attachment point for declarative subscribers: a
/// [`SubscriberSpec`] plus an instance goes in through
/// [`subscribe`](Self::subscribe) and comes out through
/// [`unsubscribe`](Self::unsubscribe), all bindings at once.
pub struct Excevent<A: 'static, R: 'static = A> {
    state: RwLock<State<A, R>>,
}

impl<A, R> Excevent<A, R> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(State::default()),
        })
    }

    /// Feed emissions from hosts of `class` into the bus named `bus`.
    ///
    /// Handlers subscribed to the bus then run inside those hosts'
    /// dispatches, merged by priority with the hosts' own handlers. A bus
    /// key feeds one class at a time; re-registering a key moves it.
    pub fn register_bus(&self, bus: impl Into<String>, class: &ClassToken) {
        let bus = bus.into();
        let mut state = self.state.write();
        state.buses.entry(bus.clone()).or_insert_with(Registry::new);
        for wired in state.wirings.values_mut() {
            wired.retain(|key| key != &bus);
        }
        debug!(bus = %bus, class = %class, "wired class to bus");
        state.wirings.entry(class.id()).or_default().push(bus);
    }

    /// Unwire `bus` from every class feeding it.
    ///
    /// The bus registry and its subscriptions survive; they simply stop
    /// receiving emissions until the bus is registered again.
    pub fn deregister_bus(&self, bus: &str) {
        let mut state = self.state.write();
        for wired in state.wirings.values_mut() {
            wired.retain(|key| key != bus);
        }
        debug!(bus = %bus, "unwired bus");
    }

    /// A handle targeting the bus's registry, for use as a
    /// [`Source::Host`] or an `until_on` expiry source.
    pub fn bus_handle(&self, bus: &str) -> HostHandle<A, R> {
        HostHandle::from_registry(self.bus_registry(bus))
    }

    /// An emitter participating in this universe as an instance of `class`.
    pub fn create_emitter(self: &Arc<Self>, class: &ClassToken) -> Emitter<A, R> {
        Emitter::attached(self, class.clone())
    }

    /// An empty imperative registration batch bound to this coordinator.
    pub fn create_subscriber(self: &Arc<Self>) -> BatchSubscriber<A, R> {
        BatchSubscriber::new(Arc::clone(self))
    }

    pub(crate) fn bus_registry(&self, bus: &str) -> Arc<Registry<A, R>> {
        if let Some(registry) = self.state.read().buses.get(bus) {
            return Arc::clone(registry);
        }
        let mut state = self.state.write();
        Arc::clone(state.buses.entry(bus.to_string()).or_insert_with(Registry::new))
    }

    pub(crate) fn class_registry(&self, class: &ClassToken) -> Arc<Registry<A, R>> {
        if let Some(registry) = self.state.read().classes.get(&class.id()) {
            return Arc::clone(registry);
        }
        let mut state = self.state.write();
        Arc::clone(state.classes.entry(class.id()).or_insert_with(Registry::new))
    }

    pub(crate) fn source_registry(&self, source: &Source<A, R>) -> Arc<Registry<A, R>> {
        match source {
            Source::Bus(key) => self.bus_registry(key),
            Source::Class(token) => self.class_registry(token),
            Source::Host(handle) => Arc::clone(handle.registry()),
        }
    }

    /// True if any registry an instance of `class` dispatches through has
    /// handlers for `event`.
    pub(crate) fn class_has_event(&self, class: &ClassToken, event: &str) -> bool {
        let state = self.state.read();
        if let Some(registry) = state.classes.get(&class.id())
            && registry.has_event(event)
        {
            return true;
        }
        if let Some(wired) = state.wirings.get(&class.id()) {
            for bus in wired {
                if let Some(registry) = state.buses.get(bus)
                    && registry.has_event(event)
                {
                    return true;
                }
            }
        }
        false
    }

    /// Append the bucket snapshots an instance of `class` draws from beyond
    /// its own registry: the class registry first, then each wired bus in
    /// wiring order.
    pub(crate) fn external_snapshots(
        &self,
        class: &ClassToken,
        event: &str,
        out: &mut Vec<PriorityMap<HandlerBucket<A, R>>>,
    ) {
        let state = self.state.read();
        if let Some(registry) = state.classes.get(&class.id())
            && let Some(snapshot) = registry.snapshot(event)
        {
            out.push(snapshot);
        }
        if let Some(wired) = state.wirings.get(&class.id()) {
            for bus in wired {
                if let Some(registry) = state.buses.get(bus)
                    && let Some(snapshot) = registry.snapshot(event)
                {
                    out.push(snapshot);
                }
            }
        }
    }

    /// Attach every binding of `spec` for `instance`.
    ///
    /// Idempotent per live instance: a second subscribe of the same
    /// allocation returns false and changes nothing, no matter which spec it
    /// arrives with. Subscribers dropped without unsubscribing are swept
    /// here, dead registry entries included, before the membership check.
    pub fn subscribe<T>(&self, spec: &SubscriberSpec<T, A, R>, instance: &Arc<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        let subscriber = SubscriberId::of(instance);
        let weak: Weak<T> = Arc::downgrade(instance);
        let liveness: Weak<dyn Any + Send + Sync> = weak;
        {
            let mut state = self.state.write();
            state.evict_dead();
            if state.subscribed.contains_key(&subscriber) {
                return false;
            }
            state.subscribed.insert(
                subscriber,
                SubscriberRecord {
                    instance: liveness,
                    entries: Vec::new(),
                },
            );
        }
        let mut entries = Vec::new();
        for binding in spec.bindings() {
            let registry = self.binding_registry(binding.target(), instance);
            let handler = binding.materialize(instance);
            for event in binding.events().iter() {
                registry.add_reference(
                    event,
                    binding.priority(),
                    binding.method(),
                    subscriber,
                    Arc::clone(&handler),
                );
                entries.push(ReferenceEntry {
                    registry: Arc::downgrade(&registry),
                    event: event.to_string(),
                    priority: binding.priority(),
                    method: binding.method().to_string(),
                });
            }
        }
        if let Some(record) = self.state.write().subscribed.get_mut(&subscriber) {
            record.entries = entries;
        }
        debug!(spec = spec.name(), ?subscriber, "subscribed instance");
        true
    }

    /// Detach every binding of `spec` for `instance`. Returns false if the
    /// instance was not subscribed.
    pub fn unsubscribe<T>(&self, spec: &SubscriberSpec<T, A, R>, instance: &Arc<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        let subscriber = SubscriberId::of(instance);
        {
            let mut state = self.state.write();
            state.evict_dead();
            if state.subscribed.remove(&subscriber).is_none() {
                return false;
            }
        }
        for binding in spec.bindings() {
            let registry = self.binding_registry(binding.target(), instance);
            for event in binding.events().iter() {
                registry.remove_reference(event, binding.priority(), binding.method(), subscriber);
            }
        }
        debug!(spec = spec.name(), ?subscriber, "unsubscribed instance");
        true
    }

    /// Move `instance` into shared ownership and subscribe it in one step.
    pub fn adopt<T>(&self, spec: &SubscriberSpec<T, A, R>, instance: T) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let instance = Arc::new(instance);
        self.subscribe(spec, &instance);
        instance
    }

    fn binding_registry<T>(
        &self,
        target: &BindingTarget<T, A, R>,
        instance: &Arc<T>,
    ) -> Arc<Registry<A, R>> {
        match target {
            BindingTarget::Source(source) => self.source_registry(source),
            BindingTarget::Own(resolve) => resolve(instance),
        }
    }
}
