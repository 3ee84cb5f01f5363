use crate::index::{KindLists, ProcessIndex};
use crate::{IndexError, Result};
use batchtrace_model::{normalize_modification, EntityKind};
use batchtrace_source::RecordSource;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Instant;

/// What a build (or restore) produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Records indexed, per kind name.
    pub records_by_kind: BTreeMap<String, usize>,

    /// Total records across the four kinds.
    pub records: usize,

    /// Distinct modification codes after marker rewriting.
    pub distinct_codes: usize,

    /// Elapsed build or restore time in milliseconds.
    pub time_ms: u64,

    /// Whether the index came from the cache instead of a full build.
    pub restored_from_cache: bool,
}

impl BuildStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_record(&mut self, kind: EntityKind) {
        self.records += 1;
        *self
            .records_by_kind
            .entry(kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Counts taken from an already-assembled index (the restore path).
    #[must_use]
    pub fn for_index(index: &ProcessIndex) -> Self {
        let mut stats = Self::new();
        for kind in EntityKind::ALL {
            let count = index.identifiers_of(kind).len();
            if count > 0 {
                stats.records_by_kind.insert(kind.as_str().to_string(), count);
            }
            stats.records += count;
        }
        stats.distinct_codes = index.distinct_modification_codes();
        stats
    }
}

/// Builds the index from source in one fail-fast pass.
///
/// Per kind, in build order: load and materialize the collection; for
/// non-step records rewrite the `modifications` field (positional marker
/// stripped) and append the record to that code's bucket and the code to
/// the kind's code list; insert into the global map, where an existing id
/// aborts the whole build with [`IndexError::DuplicateIdentifier`]. The
/// per-kind lists are sorted once at the end. No partial index is ever
/// returned.
pub async fn build_index(source: &dyn RecordSource) -> Result<(ProcessIndex, BuildStats)> {
    let started = Instant::now();
    let mut global = BTreeMap::new();
    let mut identifiers = KindLists::default();
    let mut modification_codes = KindLists::default();
    let mut modifications: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut stats = BuildStats::new();

    for kind in EntityKind::ALL {
        let records = source.load(kind.collection()).await?.materialize();
        log::info!("indexing {} {} records", records.len(), kind);

        for mut record in records {
            if kind != EntityKind::Step {
                if let Some(raw) = record.modification_code() {
                    let code = normalize_modification(raw);
                    record.set_modification_code(code.clone());
                    modifications
                        .entry(code.clone())
                        .or_default()
                        .push(record.id().to_string());
                    modification_codes.of_mut(kind).push(code);
                } else {
                    log::debug!("{kind} record {:?} carries no modification code", record.id());
                }
            }

            let id = record.id().to_string();
            match global.entry(id.clone()) {
                Entry::Occupied(_) => {
                    return Err(IndexError::DuplicateIdentifier { id, kind });
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
            identifiers.of_mut(kind).push(id);
            stats.add_record(kind);
        }
    }

    identifiers.sort_all();
    modification_codes.sort_all();

    stats.distinct_codes = modifications.len();
    stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    log::info!(
        "index built: {} records, {} distinct modification codes in {}ms",
        stats.records,
        stats.distinct_codes,
        stats.time_ms
    );

    Ok((
        ProcessIndex::from_parts(global, identifiers, modification_codes, modifications),
        stats,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchtrace_model::{Collection, Record};
    use batchtrace_source::MemorySource;
    use pretty_assertions::assert_eq;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    fn sample_source() -> MemorySource {
        MemorySource::new()
            .with(
                Collection::Steps,
                vec![record(r#"{"id": "B12"}"#), record(r#"{"id": "B13"}"#)],
            )
            .with(
                Collection::Sequences,
                vec![
                    record(r#"{"id": "B12.S2", "modifications": "D2 manual purge"}"#),
                    record(r#"{"id": "B12.S1", "modifications": "D1 replaced valve"}"#),
                ],
            )
            .with(
                Collection::Operations,
                vec![record(r#"{"id": "B12.S1.O1", "modifications": "manual purge"}"#)],
            )
            .with(
                Collection::Functions,
                vec![record(r#"{"id": "B12.S1.O1.F1"}"#)],
            )
    }

    #[tokio::test]
    async fn builds_sorted_lists_and_counts() {
        let (index, stats) = build_index(&sample_source()).await.unwrap();

        assert_eq!(index.identifiers_of(EntityKind::Step), ["B12", "B13"]);
        assert_eq!(
            index.identifiers_of(EntityKind::Sequence),
            ["B12.S1", "B12.S2"]
        );
        assert_eq!(stats.records, 6);
        assert_eq!(stats.records_by_kind["sequence"], 2);
        assert_eq!(stats.distinct_codes, 2);
        assert!(!stats.restored_from_cache);
    }

    #[tokio::test]
    async fn positional_marker_is_stripped_before_grouping() {
        let (index, _) = build_index(&sample_source()).await.unwrap();

        let bucket: Vec<&str> = index
            .records_for_code("replaced valve")
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(bucket, ["B12.S1"]);
        assert!(index.records_for_code("D1 replaced valve").is_empty());

        // the stored field was rewritten, not just the bucket key
        let stored = index.record_by_id("B12.S1").unwrap();
        assert_eq!(stored.modification_code(), Some("replaced valve"));
    }

    #[tokio::test]
    async fn shared_code_groups_across_kinds_in_arrival_order() {
        let (index, _) = build_index(&sample_source()).await.unwrap();
        let bucket: Vec<&str> = index
            .records_for_code("manual purge")
            .iter()
            .map(|r| r.id())
            .collect();
        // sequences load before operations
        assert_eq!(bucket, ["B12.S2", "B12.S1.O1"]);
    }

    #[tokio::test]
    async fn code_lists_are_sorted_with_duplicates_kept() {
        let source = sample_source().with(
            Collection::Functions,
            vec![
                record(r#"{"id": "B12.S1.O1.F1", "modifications": "manual purge"}"#),
                record(r#"{"id": "B12.S1.O1.F2", "modifications": "manual purge"}"#),
            ],
        );
        let (index, _) = build_index(&source).await.unwrap();
        assert_eq!(
            index.modification_codes_of(EntityKind::Function),
            ["manual purge", "manual purge"]
        );
    }

    #[tokio::test]
    async fn step_modifications_are_not_indexed() {
        let source = MemorySource::new().with(
            Collection::Steps,
            vec![record(r#"{"id": "B12", "modifications": "D1 should be ignored"}"#)],
        );
        let (index, stats) = build_index(&source).await.unwrap();
        assert_eq!(stats.distinct_codes, 0);
        // the field is left untouched on step records
        let stored = index.record_by_id("B12").unwrap();
        assert_eq!(stored.modification_code(), Some("D1 should be ignored"));
    }

    #[tokio::test]
    async fn record_without_code_is_skipped_not_fatal() {
        let source = MemorySource::new().with(
            Collection::Sequences,
            vec![record(r#"{"id": "B12.S1"}"#)],
        );
        let (index, stats) = build_index(&source).await.unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.distinct_codes, 0);
        assert!(index.record_by_id("B12.S1").is_some());
    }

    #[tokio::test]
    async fn duplicate_identifier_aborts_the_build() {
        let source = MemorySource::new()
            .with(Collection::Steps, vec![record(r#"{"id": "A1"}"#)])
            .with(Collection::Sequences, vec![record(r#"{"id": "A1"}"#)]);
        let err = build_index(&source).await.unwrap_err();
        match err {
            IndexError::DuplicateIdentifier { id, kind } => {
                assert_eq!(id, "A1");
                assert_eq!(kind, EntityKind::Sequence);
            }
            other => panic!("expected DuplicateIdentifier, got {other}"),
        }
    }

    #[tokio::test]
    async fn rebuild_from_same_source_is_idempotent() {
        let source = sample_source();
        let (first, _) = build_index(&source).await.unwrap();
        let (second, _) = build_index(&source).await.unwrap();
        assert_eq!(first, second);
    }
}
