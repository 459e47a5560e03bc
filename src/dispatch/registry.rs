//! Per-source handler storage: event name → priority buckets → handlers.
//!
//! A [`Registry`] belongs to exactly one dispatch source — a host instance,
//! a named bus, or a host class — and is shared behind an `Arc` so buses and
//! declarative bindings can reach it without owning the source. Dispatch
//! never iterates the live table: it takes a per-event snapshot (cloned
//! bucket maps full of cheap `Arc` handles) and drops the lock before any
//! handler runs, which is what makes reentrant emission and (un)subscription
//! from inside a handler safe.
//!
//! Removal prunes aggressively: emptying a bucket removes its priority,
//! emptying a priority map removes the event entry. Other code tests "does
//! this event have any subscribers" by entry presence, so a dangling empty
//! structure must never remain.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::api::{EventApi, Outcome};
use crate::priority::PriorityMap;
use crate::types::{HandlerId, Priority, SourceId, SubscriberId};

/// A shareable, type-erased event handler.
pub type Handler<A, R> = Arc<dyn Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync>;

/// One method's reference handlers, in subscriber insertion order.
pub(crate) struct ReferenceGroup<A: 'static, R: 'static> {
    method: String,
    entries: Vec<(SubscriberId, Handler<A, R>)>,
}

impl<A, R> Clone for ReferenceGroup<A, R> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<A, R> ReferenceGroup<A, R> {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn entries(&self) -> &[(SubscriberId, Handler<A, R>)] {
        &self.entries
    }
}

/// The handlers registered at one (event, priority) pair.
///
/// Two storage kinds, unified at dispatch time but tracked separately:
/// directly-added callables (ad hoc `subscribe` calls, keyed by
/// [`HandlerId`]) and declaratively-registered references (closures bound to
/// their owning instance, keyed by method name + [`SubscriberId`] so each
/// instance can deregister only its own binding).
pub(crate) struct HandlerBucket<A: 'static, R: 'static> {
    handlers: Vec<(HandlerId, Handler<A, R>)>,
    references: Vec<ReferenceGroup<A, R>>,
}

impl<A, R> Clone for HandlerBucket<A, R> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            references: self.references.clone(),
        }
    }
}

impl<A, R> Default for HandlerBucket<A, R> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            references: Vec::new(),
        }
    }
}

impl<A, R> HandlerBucket<A, R> {
    pub(crate) fn handlers(&self) -> &[(HandlerId, Handler<A, R>)] {
        &self.handlers
    }

    pub(crate) fn reference_groups(&self) -> &[ReferenceGroup<A, R>] {
        &self.references
    }

    fn add_handler(&mut self, id: HandlerId, handler: Handler<A, R>) {
        if !self.handlers.iter().any(|(existing, _)| *existing == id) {
            self.handlers.push((id, handler));
        }
    }

    fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    fn add_reference(&mut self, method: &str, subscriber: SubscriberId, handler: Handler<A, R>) {
        let group = match self.references.iter_mut().find(|g| g.method == method) {
            Some(group) => group,
            None => {
                self.references.push(ReferenceGroup {
                    method: method.to_string(),
                    entries: Vec::new(),
                });
                self.references
                    .last_mut()
                    .unwrap_or_else(|| unreachable!("group pushed above"))
            }
        };
        if !group.entries.iter().any(|(existing, _)| *existing == subscriber) {
            group.entries.push((subscriber, handler));
        }
    }

    fn remove_reference(&mut self, method: &str, subscriber: SubscriberId) -> bool {
        let Some(at) = self.references.iter().position(|g| g.method == method) else {
            return false;
        };
        let group = &mut self.references[at];
        let before = group.entries.len();
        group.entries.retain(|(existing, _)| *existing != subscriber);
        let removed = group.entries.len() != before;
        if group.entries.is_empty() {
            self.references.remove(at);
        }
        removed
    }

    fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.references.is_empty()
    }
}

/// Event handler storage for one dispatch source.
pub(crate) struct Registry<A: 'static, R: 'static> {
    id: SourceId,
    events: RwLock<FxHashMap<String, PriorityMap<HandlerBucket<A, R>>>>,
}

impl<A, R> Registry<A, R> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: SourceId::next(),
            events: RwLock::new(FxHashMap::default()),
        })
    }

    pub(crate) fn id(&self) -> SourceId {
        self.id
    }

    pub(crate) fn add_handler(
        &self,
        event: &str,
        priority: Priority,
        id: HandlerId,
        handler: Handler<A, R>,
    ) {
        let mut events = self.events.write();
        events
            .entry(event.to_string())
            .or_default()
            .get_or_default(priority)
            .add_handler(id, handler);
    }

    pub(crate) fn remove_handler(&self, event: &str, priority: Priority, id: HandlerId) -> bool {
        self.prune_after(event, priority, |bucket| bucket.remove_handler(id))
    }

    pub(crate) fn add_reference(
        &self,
        event: &str,
        priority: Priority,
        method: &str,
        subscriber: SubscriberId,
        handler: Handler<A, R>,
    ) {
        let mut events = self.events.write();
        events
            .entry(event.to_string())
            .or_default()
            .get_or_default(priority)
            .add_reference(method, subscriber, handler);
    }

    pub(crate) fn remove_reference(
        &self,
        event: &str,
        priority: Priority,
        method: &str,
        subscriber: SubscriberId,
    ) -> bool {
        self.prune_after(event, priority, |bucket| {
            bucket.remove_reference(method, subscriber)
        })
    }

    /// Apply a removal to the bucket at (event, priority), then prune the
    /// bucket and the event entry if they emptied out.
    fn prune_after(
        &self,
        event: &str,
        priority: Priority,
        remove: impl FnOnce(&mut HandlerBucket<A, R>) -> bool,
    ) -> bool {
        let mut events = self.events.write();
        let Some(buckets) = events.get_mut(event) else {
            return false;
        };
        let Some(bucket) = buckets.get_mut(priority) else {
            return false;
        };
        let removed = remove(bucket);
        if bucket.is_empty() {
            buckets.remove(priority);
        }
        if !buckets.has_any() {
            events.remove(event);
        }
        removed
    }

    /// Clone the bucket map for `event`, if any handlers exist for it.
    pub(crate) fn snapshot(&self, event: &str) -> Option<PriorityMap<HandlerBucket<A, R>>> {
        self.events.read().get(event).cloned()
    }

    pub(crate) fn has_event(&self, event: &str) -> bool {
        self.events.read().contains_key(event)
    }
}
