use crate::snapshot::Snapshot;
use crate::Result;
use batchtrace_model::{EntityKind, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `Vec<String>` per hierarchical kind, used for both the sorted
/// identifier lists and the sorted modification-code lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindLists {
    step: Vec<String>,
    sequence: Vec<String>,
    operation: Vec<String>,
    function: Vec<String>,
}

impl KindLists {
    #[must_use]
    pub fn of(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Step => &self.step,
            EntityKind::Sequence => &self.sequence,
            EntityKind::Operation => &self.operation,
            EntityKind::Function => &self.function,
        }
    }

    pub(crate) fn of_mut(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Step => &mut self.step,
            EntityKind::Sequence => &mut self.sequence,
            EntityKind::Operation => &mut self.operation,
            EntityKind::Function => &mut self.function,
        }
    }

    /// Sum of the four list lengths.
    #[must_use]
    pub fn total_len(&self) -> usize {
        EntityKind::ALL.iter().map(|&k| self.of(k).len()).sum()
    }

    pub(crate) fn sort_all(&mut self) {
        for kind in EntityKind::ALL {
            self.of_mut(kind).sort_unstable();
        }
    }

    pub(crate) fn is_sorted(&self) -> bool {
        EntityKind::ALL
            .iter()
            .all(|&k| self.of(k).windows(2).all(|w| w[0] <= w[1]))
    }
}

/// The derived index over the four hierarchical record collections.
///
/// Built once (fail-fast) or restored from a validated snapshot, then
/// immutable; readers share it via `Arc` without further locking. The
/// modification buckets hold record ids in arrival order and resolve
/// through the global map, which stays the single owner of every record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessIndex {
    global: BTreeMap<String, Record>,
    identifiers: KindLists,
    modification_codes: KindLists,
    modifications: BTreeMap<String, Vec<String>>,
}

impl ProcessIndex {
    pub(crate) fn from_parts(
        global: BTreeMap<String, Record>,
        identifiers: KindLists,
        modification_codes: KindLists,
        modifications: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            global,
            identifiers,
            modification_codes,
            modifications,
        }
    }

    /// Restores an index from a snapshot, revalidating it first.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        snapshot.validate()?;
        Ok(Self::from_parts(
            snapshot.global_index,
            snapshot.identifier_lists,
            snapshot.modification_lists,
            snapshot.modification_index,
        ))
    }

    /// Clones the four derived structures into their serializable form.
    #[must_use]
    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            global_index: self.global.clone(),
            identifier_lists: self.identifiers.clone(),
            modification_lists: self.modification_codes.clone(),
            modification_index: self.modifications.clone(),
        }
    }

    #[must_use]
    pub fn record_by_id(&self, id: &str) -> Option<&Record> {
        self.global.get(id)
    }

    /// Sorted, strictly ascending identifiers of one kind.
    #[must_use]
    pub fn identifiers_of(&self, kind: EntityKind) -> &[String] {
        self.identifiers.of(kind)
    }

    /// Sorted modification codes of one kind; a code repeats once per
    /// record carrying it.
    #[must_use]
    pub fn modification_codes_of(&self, kind: EntityKind) -> &[String] {
        self.modification_codes.of(kind)
    }

    /// The pre-grouped bucket for a code, records in arrival order.
    #[must_use]
    pub fn records_for_code(&self, code: &str) -> Vec<&Record> {
        self.modifications
            .get(code)
            .map(|ids| ids.iter().filter_map(|id| self.global.get(id)).collect())
            .unwrap_or_default()
    }

    /// Which hierarchical kind an indexed id belongs to.
    #[must_use]
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        EntityKind::ALL.into_iter().find(|&kind| {
            self.identifiers
                .of(kind)
                .binary_search_by(|probe| probe.as_str().cmp(id))
                .is_ok()
        })
    }

    /// Total records across the four kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.global.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// Number of distinct modification codes.
    #[must_use]
    pub fn distinct_modification_codes(&self) -> usize {
        self.modifications.len()
    }
}
