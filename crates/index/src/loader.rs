use crate::build::{build_index, BuildStats};
use crate::build_lock::acquire_build_lock;
use crate::cache::{FsBlobCache, IndexCache, RestoreOutcome};
use crate::index::ProcessIndex;
use crate::Result;
use batchtrace_source::{JsonDirSource, RecordSource};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Restore-or-build: try the cache, rebuild from source on a miss or an
/// invalid cache, persist what was built. Invalid caches are logged and
/// degrade to a rebuild; persist failures propagate.
///
/// Callers that need cross-process serialization go through
/// [`open_index_dir`], which wraps this in the file-based build lock.
pub async fn open_index(
    source: &dyn RecordSource,
    cache: &IndexCache,
) -> Result<(Arc<ProcessIndex>, BuildStats)> {
    let started = Instant::now();

    match cache.try_restore().await {
        RestoreOutcome::Hit(snapshot) => {
            let index = ProcessIndex::from_snapshot(snapshot)?;
            let mut stats = BuildStats::for_index(&index);
            stats.restored_from_cache = true;
            stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            log::info!(
                "restored index from cache: {} records in {}ms",
                stats.records,
                stats.time_ms
            );
            return Ok((Arc::new(index), stats));
        }
        RestoreOutcome::Miss => {
            log::info!("index cache miss; building from source");
        }
        RestoreOutcome::Invalid(reason) => {
            log::warn!("index cache invalid ({reason}); rebuilding from source");
        }
    }

    let (index, mut stats) = build_index(source).await?;
    cache.persist(&index.export_snapshot()).await?;
    stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok((Arc::new(index), stats))
}

/// [`open_index`] over the standard directory layout: exported JSON
/// collections under `data_root`, file-backed blob cache under
/// `cache_dir`, the whole sequence under the cross-process build lock.
pub async fn open_index_dir(
    data_root: impl AsRef<Path>,
    cache_dir: impl AsRef<Path>,
) -> Result<(Arc<ProcessIndex>, BuildStats)> {
    let cache_dir = cache_dir.as_ref();
    let _lock = acquire_build_lock(cache_dir).await?;

    let source = JsonDirSource::new(data_root);
    let cache = IndexCache::new(Arc::new(FsBlobCache::new(cache_dir)));
    open_index(&source, &cache).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBlobCache;
    use batchtrace_model::{Collection, EntityKind, Record};
    use batchtrace_source::MemorySource;
    use pretty_assertions::assert_eq;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    fn sample_source() -> MemorySource {
        MemorySource::new()
            .with(Collection::Steps, vec![record(r#"{"id": "B12"}"#)])
            .with(
                Collection::Sequences,
                vec![record(r#"{"id": "B12.S1", "modifications": "D1 purge"}"#)],
            )
    }

    #[tokio::test]
    async fn first_open_builds_second_restores() {
        let source = sample_source();
        let cache = IndexCache::new(Arc::new(MemoryBlobCache::new()));

        let (built, stats) = open_index(&source, &cache).await.unwrap();
        assert!(!stats.restored_from_cache);
        assert_eq!(stats.records, 2);

        let (restored, stats) = open_index(&source, &cache).await.unwrap();
        assert!(stats.restored_from_cache);
        assert_eq!(restored.as_ref(), built.as_ref());
    }

    #[tokio::test]
    async fn restored_index_answers_like_the_built_one() {
        let source = sample_source();
        let cache = IndexCache::new(Arc::new(MemoryBlobCache::new()));

        let (built, _) = open_index(&source, &cache).await.unwrap();
        let (restored, _) = open_index(&source, &cache).await.unwrap();

        assert_eq!(
            built.identifiers_of(EntityKind::Sequence),
            restored.identifiers_of(EntityKind::Sequence)
        );
        assert_eq!(
            built
                .records_for_code("purge")
                .iter()
                .map(|r| r.id())
                .collect::<Vec<_>>(),
            restored
                .records_for_code("purge")
                .iter()
                .map(|r| r.id())
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn build_failure_surfaces_and_persists_nothing() {
        let source = MemorySource::new()
            .with(Collection::Steps, vec![record(r#"{"id": "A1"}"#)])
            .with(Collection::Operations, vec![record(r#"{"id": "A1"}"#)]);
        let cache = IndexCache::new(Arc::new(MemoryBlobCache::new()));

        assert!(open_index(&source, &cache).await.is_err());
        assert!(matches!(cache.try_restore().await, RestoreOutcome::Miss));
    }
}
