use crate::index::KindLists;
use crate::{IndexError, Result};
use batchtrace_model::{EntityKind, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable form of the four derived index structures.
///
/// A snapshot is only as trustworthy as the writer that produced it, so
/// [`validate`](Snapshot::validate) re-checks the structural invariants
/// before an index is restored from one: a partially written or
/// hand-edited cache must trigger a rebuild, never a corrupt index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub global_index: BTreeMap<String, Record>,
    pub identifier_lists: KindLists,
    pub modification_lists: KindLists,
    pub modification_index: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    /// Structural validation: size classes, orderings, and id resolution.
    pub fn validate(&self) -> Result<()> {
        let ids = self.identifier_lists.total_len();
        if ids != self.global_index.len() {
            return Err(IndexError::CorruptSnapshot(format!(
                "identifier lists hold {ids} ids but the global index holds {}",
                self.global_index.len()
            )));
        }

        for kind in EntityKind::ALL {
            let list = self.identifier_lists.of(kind);
            if !list.windows(2).all(|w| w[0] < w[1]) {
                return Err(IndexError::CorruptSnapshot(format!(
                    "{kind} identifier list is not strictly ascending"
                )));
            }
            for id in list {
                if !self.global_index.contains_key(id) {
                    return Err(IndexError::CorruptSnapshot(format!(
                        "{kind} identifier {id:?} is missing from the global index"
                    )));
                }
            }
        }

        if !self.modification_lists.is_sorted() {
            return Err(IndexError::CorruptSnapshot(
                "a modification-code list is not sorted".to_string(),
            ));
        }
        let codes = self.modification_lists.total_len();
        let bucketed: usize = self.modification_index.values().map(Vec::len).sum();
        if codes != bucketed {
            return Err(IndexError::CorruptSnapshot(format!(
                "modification-code lists hold {codes} entries but buckets hold {bucketed}"
            )));
        }
        for (code, bucket) in &self.modification_index {
            for id in bucket {
                if !self.global_index.contains_key(id) {
                    return Err(IndexError::CorruptSnapshot(format!(
                        "bucket {code:?} references unknown record {id:?}"
                    )));
                }
            }
        }

        for (key, record) in &self.global_index {
            if key != record.id() {
                return Err(IndexError::CorruptSnapshot(format!(
                    "global index key {key:?} disagrees with record id {:?}",
                    record.id()
                )));
            }
        }

        Ok(())
    }
}
