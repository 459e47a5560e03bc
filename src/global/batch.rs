//! Imperative batch registration, for subscriptions assembled at runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::excevent::Excevent;
use crate::dispatch::registry::Handler;
use crate::dispatch::{EventApi, Outcome};
use crate::types::{EventList, HandlerId, Priority, Source};

struct BatchRegistration<A: 'static, R: 'static> {
    source: Source<A, R>,
    events: EventList,
    priority: Priority,
    id: HandlerId,
    handler: Handler<A, R>,
}

/// A set of handler registrations toggled on and off as a unit.
///
/// Where [`SubscriberSpec`](crate::global::SubscriberSpec) describes a
/// type's bindings up front, a `BatchSubscriber` is built piece by piece at
/// runtime — registrations can target any mix of buses, classes, and hosts —
/// and then flipped live with [`subscribe`](Self::subscribe) and back off
/// with [`unsubscribe`](Self::unsubscribe), both idempotent.
///
/// Created by
/// [`Excevent::create_subscriber`](crate::global::Excevent::create_subscriber).
pub struct BatchSubscriber<A: 'static, R: 'static = A> {
    coordinator: Arc<Excevent<A, R>>,
    registrations: Mutex<Vec<BatchRegistration<A, R>>>,
    active: AtomicBool,
}

impl<A, R> BatchSubscriber<A, R> {
    pub(crate) fn new(coordinator: Arc<Excevent<A, R>>) -> Self {
        Self {
            coordinator,
            registrations: Mutex::new(Vec::new()),
            active: AtomicBool::new(false),
        }
    }

    /// Add a registration to the batch. Takes effect immediately if the
    /// batch is currently subscribed, otherwise on the next
    /// [`subscribe`](Self::subscribe).
    pub fn register<S, E, F>(&self, source: S, events: E, priority: Priority, handler: F) -> &Self
    where
        S: Into<Source<A, R>>,
        E: Into<EventList>,
        F: Fn(&mut EventApi<'_>, &A) -> Outcome<R> + Send + Sync + 'static,
    {
        let registration = BatchRegistration {
            source: source.into(),
            events: events.into(),
            priority,
            id: HandlerId::next(),
            handler: Arc::new(handler),
        };
        if self.active.load(Ordering::SeqCst) {
            self.attach(&registration);
        }
        self.registrations.lock().push(registration);
        self
    }

    pub fn has_registrations(&self) -> bool {
        !self.registrations.lock().is_empty()
    }

    /// Attach every registration. A no-op if already subscribed.
    pub fn subscribe(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        for registration in self.registrations.lock().iter() {
            self.attach(registration);
        }
    }

    /// Detach every registration. A no-op if not subscribed.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        for registration in self.registrations.lock().iter() {
            let registry = self.coordinator.source_registry(&registration.source);
            for event in registration.events.iter() {
                registry.remove_handler(event, registration.priority, registration.id);
            }
        }
    }

    fn attach(&self, registration: &BatchRegistration<A, R>) {
        let registry = self.coordinator.source_registry(&registration.source);
        for event in registration.events.iter() {
            registry.add_handler(
                event,
                registration.priority,
                registration.id,
                Arc::clone(&registration.handler),
            );
        }
    }
}
