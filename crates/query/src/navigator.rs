use crate::Result;
use batchtrace_index::ProcessIndex;
use batchtrace_model::{EntityKind, Record};
use std::sync::Arc;

/// Parent/child traversal over the identifier hierarchy.
///
/// Hierarchy is expressed solely through identifier string prefixes: the
/// children of a record are the records of a chosen kind whose id starts
/// with the parent's id. The navigator answers those queries with a
/// prefix-bounded range scan over the per-kind sorted identifier lists,
/// so cost stays O(log n + matches) as the data set grows.
pub struct Navigator {
    index: Arc<ProcessIndex>,
}

impl Navigator {
    #[must_use]
    pub fn new(index: Arc<ProcessIndex>) -> Self {
        Self { index }
    }

    /// Single-record lookup. A miss is an expected, recoverable condition:
    /// logged at debug and answered with `None`, never an error.
    #[must_use]
    pub fn record_by_id(&self, id: &str) -> Option<&Record> {
        let found = self.index.record_by_id(id);
        if found.is_none() {
            log::debug!("record {id:?} not found");
        }
        found
    }

    /// All records of `kind` whose id starts with `parent_id`, in the
    /// kind's sorted-id order. A record whose id equals `parent_id` is
    /// included: prefix containment is inclusive.
    #[must_use]
    pub fn children_of(&self, parent_id: &str, kind: EntityKind) -> Vec<&Record> {
        let ids = self.index.identifiers_of(kind);
        // ids sharing the prefix form a contiguous run starting at the
        // first id >= parent_id
        let from = ids.partition_point(|id| id.as_str() < parent_id);
        ids[from..]
            .iter()
            .take_while(|id| id.starts_with(parent_id))
            .filter_map(|id| self.index.record_by_id(id))
            .collect()
    }

    /// [`children_of`](Navigator::children_of) with the kind given by
    /// name; an unrecognized name is rejected with the accepted choices.
    pub fn elements_under(&self, parent_id: &str, kind: &str) -> Result<Vec<&Record>> {
        let kind: EntityKind = kind.parse()?;
        Ok(self.children_of(parent_id, kind))
    }
}
