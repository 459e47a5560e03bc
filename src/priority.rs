//! Ordered priority container underpinning every handler registry.
//!
//! [`PriorityMap`] stores at most one value per integer priority and keeps a
//! sorted index of the priorities currently present, descending, so dispatch
//! can walk buckets from highest to lowest without sorting per emission.
//! [`PriorityMap::map_all`] merges several maps into a single descending
//! traversal — the primitive that lets one emission span a host's own
//! handlers plus any class and bus registries it participates in.
//!
//! Traversal always works over a snapshot of the priority index taken before
//! the first visit, so a visitor that removes buckets (directly or through
//! reentrant unsubscription) can never corrupt or skip unrelated entries.

use rustc_hash::FxHashMap;

use crate::types::Priority;

/// Break signal consulted between visits during [`PriorityMap::map`] and
/// [`PriorityMap::map_all`].
///
/// Implemented by the standalone [`MapApi`] and by the dispatcher's
/// [`EventApi`](crate::dispatch::EventApi), so the container is usable on its
/// own as well as under the emitter.
pub trait MapControl {
    /// True once a visitor has requested that traversal halt.
    fn stopped(&self) -> bool;
}

/// Minimal traversal context for using [`PriorityMap`] outside the
/// dispatcher.
#[derive(Debug, Default)]
pub struct MapApi {
    stop: bool,
}

impl MapApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Halt traversal after the current visit; results so far are kept.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

impl MapControl for MapApi {
    fn stopped(&self) -> bool {
        self.stop
    }
}

/// An ordered associative container keyed by integer priority.
///
/// Invariant: the sorted index always equals the key set of the entry table,
/// descending, with no duplicates. All order maintenance is done with binary
/// search on insert/remove, never by re-sorting.
///
/// ```
/// use excevent::priority::PriorityMap;
///
/// let mut map = PriorityMap::new();
/// map.set(1, "b");
/// map.set(5, "a");
/// map.set(-3, "c");
/// assert_eq!(map.priorities(), &[5, 1, -3]);
/// assert_eq!(map.map(|_, v| *v), vec!["a", "b", "c"]);
/// ```
#[derive(Clone, Debug)]
pub struct PriorityMap<V> {
    entries: FxHashMap<Priority, V>,
    order: Vec<Priority>,
}

impl<V> Default for PriorityMap<V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            order: Vec::new(),
        }
    }
}

impl<V> PriorityMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, priority: Priority) -> Option<&V> {
        self.entries.get(&priority)
    }

    pub fn get_mut(&mut self, priority: Priority) -> Option<&mut V> {
        self.entries.get_mut(&priority)
    }

    /// Insert or overwrite the value at `priority`.
    pub fn set(&mut self, priority: Priority, value: V) -> &mut Self {
        if self.entries.insert(priority, value).is_none() {
            let at = self.order.partition_point(|&p| p > priority);
            self.order.insert(at, priority);
        }
        self
    }

    /// Get the value at `priority`, inserting a default-constructed one if
    /// absent.
    pub fn get_or_default(&mut self, priority: Priority) -> &mut V
    where
        V: Default,
    {
        if !self.entries.contains_key(&priority) {
            self.set(priority, V::default());
        }
        self.entries
            .get_mut(&priority)
            .unwrap_or_else(|| unreachable!("priority inserted above"))
    }

    /// Remove and return the value at `priority`, if present.
    pub fn remove(&mut self, priority: Priority) -> Option<V> {
        let removed = self.entries.remove(&priority);
        if removed.is_some() {
            let at = self.order.partition_point(|&p| p > priority);
            debug_assert_eq!(self.order.get(at), Some(&priority));
            self.order.remove(at);
        }
        removed
    }

    pub fn has(&self, priority: Priority) -> bool {
        self.entries.contains_key(&priority)
    }

    /// True iff at least one priority is present.
    pub fn has_any(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// The distinct priorities currently present, descending.
    pub fn priorities(&self) -> &[Priority] {
        &self.order
    }

    /// Visit every value from highest to lowest priority, collecting the
    /// visitor's returns in visitation order.
    pub fn map<T>(&self, visitor: impl FnMut(&mut MapApi, &V) -> T) -> Vec<T> {
        let mut api = MapApi::new();
        self.map_with(visitor, &mut api)
    }

    /// [`map`](Self::map) with a caller-supplied traversal context.
    ///
    /// Halts immediately — returning the partial results — once
    /// `api.stopped()` turns true. The priority index is snapshotted before
    /// the first visit; a priority whose entry has vanished since the
    /// snapshot is skipped.
    pub fn map_with<T, C: MapControl>(
        &self,
        mut visitor: impl FnMut(&mut C, &V) -> T,
        api: &mut C,
    ) -> Vec<T> {
        let order = self.order.clone();
        let mut results = Vec::with_capacity(order.len());
        for priority in order {
            let Some(value) = self.entries.get(&priority) else {
                continue;
            };
            results.push(visitor(api, value));
            if api.stopped() {
                break;
            }
        }
        results
    }

    /// K-way merge traversal over several maps.
    ///
    /// Produces a single highest-to-lowest ordering over the union of all
    /// (map, priority) pairs — not first by map and then by priority. Equal
    /// priorities across different maps are visited in input order: the
    /// earlier map wins the tie. Maps with no entries are filtered out up
    /// front so they affect neither tie-breaking nor the iteration count.
    /// Stops early with partial results once `api.stopped()` turns true.
    pub fn map_all<T, C: MapControl>(
        maps: &[&PriorityMap<V>],
        mut visitor: impl FnMut(&mut C, &V) -> T,
        api: &mut C,
    ) -> Vec<T> {
        struct Cursor<'m, V> {
            map: &'m PriorityMap<V>,
            order: Vec<Priority>,
            index: usize,
        }

        let mut cursors: Vec<Cursor<'_, V>> = maps
            .iter()
            .filter(|map| map.has_any())
            .map(|map| Cursor {
                map,
                order: map.order.clone(),
                index: 0,
            })
            .collect();

        let mut results = Vec::new();
        loop {
            let mut best: Option<(usize, Priority)> = None;
            for (at, cursor) in cursors.iter().enumerate() {
                let Some(&priority) = cursor.order.get(cursor.index) else {
                    continue;
                };
                // Strict comparison keeps the earlier map on ties.
                if best.is_none_or(|(_, current)| priority > current) {
                    best = Some((at, priority));
                }
            }

            let Some((at, priority)) = best else {
                break;
            };
            cursors[at].index += 1;

            let Some(value) = cursors[at].map.entries.get(&priority) else {
                continue;
            };
            results.push(visitor(api, value));
            if api.stopped() {
                break;
            }
        }
        results
    }
}
