//! Watched properties: values whose assignment emits events.

use crate::dispatch::Emitter;
use crate::types::EventList;

/// A value that announces its own assignments.
///
/// Wrap a field in `Watched` and route writes through
/// [`assign`](Self::assign); each write stores the new value and then emits
/// the configured events on the given emitter, with the new value and the
/// property name as the arguments. Reads go through [`get`](Self::get) and
/// cost nothing.
///
/// ```
/// use excevent::dispatch::Emitter;
/// use excevent::watch::Watched;
///
/// let emitter: Emitter<(u32, &'static str), ()> = Emitter::new();
/// emitter.on("healthChanged", |_api, (value, property)| {
///     assert_eq!(*property, "health");
///     assert_eq!(*value, 50);
///     ().into()
/// });
///
/// let mut health = Watched::new("health", "healthChanged", 100u32);
/// health.assign(&emitter, 50);
/// assert_eq!(*health.get(), 50);
/// ```
#[derive(Clone, Debug)]
pub struct Watched<T> {
    value: T,
    property: &'static str,
    events: EventList,
}

impl<T> Watched<T> {
    pub fn new(property: &'static str, event: &str, value: T) -> Self {
        Self {
            value,
            property,
            events: event.into(),
        }
    }

    /// Emit an additional event on every assignment.
    pub fn also_emits(mut self, event: &str) -> Self {
        let mut names = self.events.names().to_vec();
        names.push(event.to_string());
        self.events = names.into();
        self
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Replace the value without emitting.
    pub fn set_silent(&mut self, value: T) {
        self.value = value;
    }

    /// Store `value`, then emit each configured event with the new value
    /// and the property name. Handlers observing the property through the
    /// emitter already see the updated value.
    ///
    /// Results from every emitted event are collected in event order.
    pub fn assign<A, R>(&mut self, emitter: &Emitter<A, R>, value: T) -> Vec<R>
    where
        T: Clone,
        A: From<(T, &'static str)>,
    {
        self.value = value.clone();
        let mut results = Vec::new();
        for event in self.events.iter() {
            let args = A::from((value.clone(), self.property));
            results.extend(emitter.emit(event, &args));
        }
        results
    }
}
