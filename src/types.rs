//! Core identity and naming types for the excevent dispatch system.
//!
//! Everything the dispatch engine uses to tell things apart lives here:
//! priorities, event name lists, and the identity tokens that stand in for
//! handlers, subscriber instances, registries, and host classes.
//!
//! Identity is explicit by design. Handlers are closures and closures have no
//! equality in Rust, so [`subscribe`](crate::dispatch::Emitter::subscribe)
//! hands back a [`HandlerId`] that acts as the unsubscription token.
//! Subscriber instances are identified by the address of their shared
//! allocation ([`SubscriberId::of`]), and host classes by an explicit
//! [`ClassToken`] record created once per "class" of host.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dispatch::HostHandle;

/// Integer ranking controlling dispatch order. Higher runs first.
///
/// Ties are broken by source order (a host's own handlers before class and
/// bus handlers) and then by registration order within a bucket.
/// `Priority::MIN` is the "run after everything" sentinel used by
/// [`wait_for`](crate::dispatch::Emitter::wait_for) and the `until` cleanup
/// handlers.
pub type Priority = i64;

/// One or more event names, as accepted by subscribe/unsubscribe and friends.
///
/// Build it from a single name or a list:
///
/// ```
/// use excevent::types::EventList;
///
/// let one: EventList = "open".into();
/// let many: EventList = ["open", "close"].into();
/// assert_eq!(one.names().len(), 1);
/// assert_eq!(many.names().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventList(Vec<String>);

impl EventList {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.iter().any(|e| e == event)
    }
}

impl From<&str> for EventList {
    fn from(event: &str) -> Self {
        Self(vec![event.to_string()])
    }
}

impl From<String> for EventList {
    fn from(event: String) -> Self {
        Self(vec![event])
    }
}

impl From<&[&str]> for EventList {
    fn from(events: &[&str]) -> Self {
        Self(events.iter().map(|e| e.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventList {
    fn from(events: [&str; N]) -> Self {
        Self(events.iter().map(|e| e.to_string()).collect())
    }
}

impl From<Vec<String>> for EventList {
    fn from(events: Vec<String>) -> Self {
        Self(events)
    }
}

impl fmt::Display for EventList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

fn next_token() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Unsubscription token for a directly-registered handler.
///
/// One id covers every event name the handler was subscribed with in that
/// call; pass it back to `unsubscribe` together with the same events and
/// priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(next_token())
    }
}

/// Identity of a registry (a host instance, a named bus, or a host class).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub(crate) fn next() -> Self {
        Self(next_token())
    }
}

/// Identity of a subscriber instance, derived from its shared allocation.
///
/// Two `Arc`s pointing at the same instance produce the same id, which is
/// what makes double-subscription detection work without any bookkeeping on
/// the instance itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    pub fn of<T>(instance: &Arc<T>) -> Self {
        Self(Arc::as_ptr(instance) as usize)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        Self(next_token())
    }
}

/// Explicit identity record for a host class.
///
/// Rust has no runtime class objects, so anywhere the system needs "all
/// instances of this kind of host" (bus wiring, class-targeted handler
/// bindings) it uses a token created once and shared by every instance:
///
/// ```
/// use excevent::types::ClassToken;
///
/// let animals = ClassToken::new("Animal");
/// assert_eq!(animals.name(), "Animal");
/// ```
#[derive(Clone, Debug)]
pub struct ClassToken {
    id: ClassId,
    name: Arc<str>,
}

impl ClassToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClassId::next(),
            name: name.into().into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> ClassId {
        self.id
    }
}

impl PartialEq for ClassToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassToken {}

impl std::hash::Hash for ClassToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ClassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A subscription target: a named bus, a host class, or one specific host.
///
/// This is what declarative bindings, batch registrations, and the `until`
/// subscribers point handlers at. Bus and class keys resolve through the
/// [`Excevent`](crate::global::Excevent) coordinator; host handles resolve
/// directly.
pub enum Source<A: 'static, R: 'static = A> {
    /// A named, shared dispatch point resolved through the coordinator.
    Bus(String),
    /// The shared registry of every host carrying this class token.
    Class(ClassToken),
    /// One concrete host instance.
    Host(HostHandle<A, R>),
}

impl<A, R> Clone for Source<A, R> {
    fn clone(&self) -> Self {
        match self {
            Source::Bus(key) => Source::Bus(key.clone()),
            Source::Class(token) => Source::Class(token.clone()),
            Source::Host(handle) => Source::Host(handle.clone()),
        }
    }
}

impl<A, R> fmt::Debug for Source<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bus(key) => write!(f, "Source::Bus({key:?})"),
            Source::Class(token) => write!(f, "Source::Class({})", token.name()),
            Source::Host(handle) => write!(f, "Source::Host({:?})", handle.id()),
        }
    }
}

impl<A, R> From<&str> for Source<A, R> {
    fn from(bus: &str) -> Self {
        Source::Bus(bus.to_string())
    }
}

impl<A, R> From<String> for Source<A, R> {
    fn from(bus: String) -> Self {
        Source::Bus(bus)
    }
}

impl<A, R> From<&ClassToken> for Source<A, R> {
    fn from(token: &ClassToken) -> Self {
        Source::Class(token.clone())
    }
}

impl<A, R> From<ClassToken> for Source<A, R> {
    fn from(token: ClassToken) -> Self {
        Source::Class(token)
    }
}

impl<A, R> From<HostHandle<A, R>> for Source<A, R> {
    fn from(handle: HostHandle<A, R>) -> Self {
        Source::Host(handle)
    }
}

impl<A, R> From<&HostHandle<A, R>> for Source<A, R> {
    fn from(handle: &HostHandle<A, R>) -> Self {
        Source::Host(handle.clone())
    }
}
