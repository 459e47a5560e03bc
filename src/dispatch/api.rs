//! Per-dispatch context and the handler return model.

use crate::priority::MapControl;
use crate::types::SourceId;

/// What a handler hands back to the dispatcher.
///
/// Models the three return conventions of the dispatch engine:
///
/// - [`Outcome::Skip`] contributes nothing to an emission's results and is
///   never a query candidate (the "no answer" return).
/// - [`Outcome::One`] is a single result.
/// - [`Outcome::Many`] is a collection of results; `emit` splices the
///   elements into its output — exactly one level, never deeper. A handler
///   that wants a nested collection treated as one logical result returns
///   `Outcome::One` with a collection-valued result type instead.
///
/// `From` conversions cover the common cases:
///
/// ```
/// use excevent::dispatch::Outcome;
///
/// let one: Outcome<i32> = 7.into();
/// let none: Outcome<i32> = None.into();
/// let many: Outcome<i32> = vec![1, 2].into();
/// assert!(matches!(one, Outcome::One(7)));
/// assert!(none.is_skip());
/// assert!(matches!(many, Outcome::Many(_)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<R> {
    Skip,
    One(R),
    Many(Vec<R>),
}

impl<R> Outcome<R> {
    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skip)
    }

    /// Splice this outcome into an emission's result list (one flattening
    /// level for `Many`).
    pub(crate) fn append_to(self, results: &mut Vec<R>) {
        match self {
            Outcome::Skip => {}
            Outcome::One(value) => results.push(value),
            Outcome::Many(values) => results.extend(values),
        }
    }

    /// The candidate values this outcome offers to a query, in order.
    pub(crate) fn into_candidates(self) -> Vec<R> {
        match self {
            Outcome::Skip => Vec::new(),
            Outcome::One(value) => vec![value],
            Outcome::Many(values) => values,
        }
    }
}

impl<R> From<R> for Outcome<R> {
    fn from(value: R) -> Self {
        Outcome::One(value)
    }
}

impl<R> From<Option<R>> for Outcome<R> {
    fn from(value: Option<R>) -> Self {
        match value {
            Some(value) => Outcome::One(value),
            None => Outcome::Skip,
        }
    }
}

impl<R> From<Vec<R>> for Outcome<R> {
    fn from(values: Vec<R>) -> Self {
        Outcome::Many(values)
    }
}

/// Mutable per-dispatch context shared by every handler of one emission.
///
/// Lives exactly as long as one `emit`/`query` call. Handlers inspect it for
/// the event name and their position in the dispatch, and mutate it to
/// influence the remainder:
///
/// - [`stop`](Self::stop) halts the entire dispatch the moment the current
///   handler returns; results accumulated so far are kept.
/// - [`disregard`](Self::disregard) discards the current handler's own
///   result; the flag is cleared before the next handler runs.
#[derive(Debug)]
pub struct EventApi<'e> {
    host: SourceId,
    event: &'e str,
    pub(crate) index: usize,
    stop: bool,
    disregard: bool,
}

impl<'e> EventApi<'e> {
    pub(crate) fn new(host: SourceId, event: &'e str) -> Self {
        Self {
            host,
            event,
            index: 0,
            stop: false,
            disregard: false,
        }
    }

    /// Identity of the emitting host's registry.
    pub fn host(&self) -> SourceId {
        self.host
    }

    /// The event being dispatched.
    pub fn event(&self) -> &str {
        self.event
    }

    /// Zero-based position of the current handler within this dispatch,
    /// counted across every merged source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Halt the dispatch after the current handler returns.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub fn stopped(&self) -> bool {
        self.stop
    }

    /// Exclude the current handler's result from the dispatch output.
    pub fn disregard(&mut self) {
        self.disregard = true;
    }

    /// Consume the disregard flag for the invocation that just returned.
    pub(crate) fn take_disregard(&mut self) -> bool {
        std::mem::take(&mut self.disregard)
    }
}

impl MapControl for EventApi<'_> {
    fn stopped(&self) -> bool {
        self.stop
    }
}
