//! Single-result lookups over an event's handlers.

use super::api::EventApi;
use super::emitter::Emitter;
use super::registry::{Handler, HandlerBucket};
use crate::priority::PriorityMap;

/// A lazy, filtered search for the first acceptable handler result.
///
/// Built by [`Emitter::query`]; nothing runs until [`get`](Self::get).
/// Handlers are consulted in the same merged priority order as an emission,
/// but dispatch halts at the first produced value that passes every
/// [`filter`](Self::filter). A handler returning a collection offers each
/// element as a separate candidate, in order; a disregarded invocation
/// offers none.
///
/// ```
/// use excevent::dispatch::Emitter;
///
/// let emitter: Emitter<(), i32> = Emitter::new();
/// emitter.on("pick", |_, _| vec![1, 8, 3].into());
/// let found = emitter.query("pick", &()).filter(|n| *n > 2).get();
/// assert_eq!(found, Some(8));
/// ```
pub struct Query<'q, A: 'static, R: 'static> {
    emitter: &'q Emitter<A, R>,
    event: &'q str,
    args: &'q A,
    predicates: Vec<Box<dyn Fn(&R) -> bool + 'q>>,
}

impl<'q, A, R> Query<'q, A, R> {
    pub(crate) fn new(emitter: &'q Emitter<A, R>, event: &'q str, args: &'q A) -> Self {
        Self {
            emitter,
            event,
            args,
            predicates: Vec::new(),
        }
    }

    /// Require candidates to satisfy `predicate`. Filters stack; all must
    /// pass.
    pub fn filter(mut self, predicate: impl Fn(&R) -> bool + 'q) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Run the search and return the first passing candidate, if any.
    pub fn get(self) -> Option<R> {
        let snapshots = self.emitter.gather(self.event);
        let maps: Vec<&PriorityMap<HandlerBucket<A, R>>> = snapshots.iter().collect();

        let mut api = EventApi::new(self.emitter.registry().id(), self.event);
        let mut invoked = 0usize;
        let mut found: Option<R> = None;
        PriorityMap::map_all(
            &maps,
            |api: &mut EventApi<'_>, bucket| {
                self.scan_bucket(bucket, api, &mut invoked, &mut found);
            },
            &mut api,
        );
        found
    }

    fn scan_bucket(
        &self,
        bucket: &HandlerBucket<A, R>,
        api: &mut EventApi<'_>,
        invoked: &mut usize,
        found: &mut Option<R>,
    ) {
        let mut run = |api: &mut EventApi<'_>, handler: &Handler<A, R>| {
            api.index = *invoked;
            *invoked += 1;
            let outcome = handler(api, self.args);
            if api.take_disregard() {
                return;
            }
            for candidate in outcome.into_candidates() {
                if self.predicates.iter().all(|accepts| accepts(&candidate)) {
                    *found = Some(candidate);
                    api.stop();
                    return;
                }
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
}
