use batchtrace_index::ProcessIndex;
use batchtrace_model::{fields, EntityKind, Record, TimeMs};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Exact, suffix and chronologically ranked lookup over the indexed
/// modification codes.
///
/// Exact lookup answers with the pre-grouped bucket verbatim (arrival
/// order). Suffix lookup walks matching codes in lexicographic order and
/// deduplicates records by identity, so output is deterministic even when
/// one code is shared across kinds. Ranked lookups sort ascending by the
/// record's reported execution start; a record without one sorts first
/// (key 0), and the sort is stable so ties keep their bucket order.
pub struct ModificationSearch {
    index: Arc<ProcessIndex>,
}

impl ModificationSearch {
    #[must_use]
    pub fn new(index: Arc<ProcessIndex>) -> Self {
        Self { index }
    }

    /// The bucket stored for `code`, verbatim. Unknown codes are empty.
    #[must_use]
    pub fn exact_match(&self, code: &str) -> Vec<&Record> {
        self.index.records_for_code(code)
    }

    /// Records whose stored code ends with `code`, across the three
    /// modification-bearing kinds, each record once.
    #[must_use]
    pub fn suffix_match(&self, code: &str) -> Vec<&Record> {
        let mut matched: BTreeSet<&str> = BTreeSet::new();
        for kind in EntityKind::MODIFIED {
            for stored in self.index.modification_codes_of(kind) {
                if stored.ends_with(code) {
                    matched.insert(stored.as_str());
                }
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for code in matched {
            for record in self.index.records_for_code(code) {
                if seen.insert(record.id()) {
                    out.push(record);
                }
            }
        }
        out
    }

    /// Matches scoped to one kind, chronologically sorted. `exact` selects
    /// stored-code equality over suffix matching; `step` narrows to
    /// records whose owning step label (`etape_associee`) equals it.
    #[must_use]
    pub fn ranked(
        &self,
        kind: EntityKind,
        code: &str,
        exact: bool,
        step: Option<&str>,
    ) -> Vec<&Record> {
        let mut matches: Vec<&Record> = if exact {
            self.index
                .records_for_code(code)
                .into_iter()
                .filter(|r| self.index.kind_of(r.id()) == Some(kind))
                .collect()
        } else {
            // the kind's code list is sorted, so duplicates are adjacent
            let mut codes: Vec<&str> = self
                .index
                .modification_codes_of(kind)
                .iter()
                .map(String::as_str)
                .filter(|stored| stored.ends_with(code))
                .collect();
            codes.dedup();
            codes
                .into_iter()
                .flat_map(|c| self.index.records_for_code(c))
                .filter(|r| self.index.kind_of(r.id()) == Some(kind))
                .collect()
        };
        retain_step(&mut matches, step);
        sort_chronological(&mut matches);
        matches
    }

    /// [`ranked`](ModificationSearch::ranked) across all three
    /// modification-bearing kinds merged.
    #[must_use]
    pub fn ranked_all(&self, code: &str, exact: bool, step: Option<&str>) -> Vec<&Record> {
        let mut matches = if exact {
            self.exact_match(code)
        } else {
            self.suffix_match(code)
        };
        retain_step(&mut matches, step);
        sort_chronological(&mut matches);
        matches
    }
}

fn retain_step(records: &mut Vec<&Record>, step: Option<&str>) {
    if let Some(step) = step {
        records.retain(|r| r.text(fields::ETAPE_ASSOCIEE) == Some(step));
    }
}

/// Stable ascending sort by reported execution start, missing start first.
fn sort_chronological(records: &mut [&Record]) {
    records.sort_by_key(|r| r.window_start().map_or(0, TimeMs::millis));
}
