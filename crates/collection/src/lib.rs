//! Deferred query pipelines over in-memory record sequences.
//!
//! A [`LazyCollection`] describes a chain of filter / map / distinct /
//! flatten stages over an immutable source. Nothing runs until
//! [`materialize`](LazyCollection::materialize), and every materialization
//! re-runs the whole pipeline from the source. There is no memoization, so
//! callers needing repeated idempotent access should materialize once and
//! keep the result. Pipelines are pure: stages never observe or mutate
//! anything outside their input, and cloning a collection clones the
//! pipeline description, not the data.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type Producer<T> = Arc<dyn Fn() -> Vec<T> + Send + Sync>;

/// A lazy, composable pipeline producing an ordered sequence of `T`.
pub struct LazyCollection<T> {
    producer: Producer<T>,
}

impl<T> Clone for LazyCollection<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for LazyCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> LazyCollection<T> {
    /// Wraps an already-loaded sequence. The data is shared, not copied;
    /// each materialization clones items out of the shared source.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        let source = Arc::new(items);
        Self {
            producer: Arc::new(move || source.as_ref().clone()),
        }
    }

    /// Appends a filter stage keeping items that satisfy `pred`.
    #[must_use]
    pub fn filter(&self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        let prev = Arc::clone(&self.producer);
        Self {
            producer: Arc::new(move || {
                let mut out = prev();
                out.retain(|item| pred(item));
                out
            }),
        }
    }

    /// Appends a per-item transform stage; the item type may change.
    #[must_use]
    pub fn map<U>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> LazyCollection<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        let prev = Arc::clone(&self.producer);
        LazyCollection {
            producer: Arc::new(move || prev().iter().map(&f).collect()),
        }
    }

    /// Appends a deduplication stage: the first occurrence of each value
    /// wins, order is otherwise preserved.
    #[must_use]
    pub fn distinct(&self) -> Self
    where
        T: Eq + Hash,
    {
        let prev = Arc::clone(&self.producer);
        Self {
            producer: Arc::new(move || {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for item in prev() {
                    if seen.insert(item.clone()) {
                        out.push(item);
                    }
                }
                out
            }),
        }
    }

    /// Runs the pipeline from source and returns the ordered result.
    #[must_use]
    pub fn materialize(&self) -> Vec<T> {
        (self.producer)()
    }
}

impl<T> LazyCollection<T>
where
    T: IntoIterator + Clone + Send + Sync + 'static,
    T::Item: Clone + Send + Sync + 'static,
{
    /// Appends a flattening stage splicing nested sequences in order.
    #[must_use]
    pub fn flatten(&self) -> LazyCollection<T::Item> {
        let prev = Arc::clone(&self.producer);
        LazyCollection {
            producer: Arc::new(move || prev().into_iter().flatten().collect()),
        }
    }
}
