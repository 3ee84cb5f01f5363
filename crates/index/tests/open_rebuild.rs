use batchtrace_index::{open_index_dir, IndexError, BLOB_GLOBAL_INDEX};
use batchtrace_model::EntityKind;
use std::path::Path;
use tempfile::TempDir;

fn write_exports(root: &Path) {
    std::fs::write(
        root.join("ETAPES.json"),
        r#"[{"id": "B12", "lib": "batch 12"}, {"id": "B13", "lib": "batch 13"}]"#,
    )
    .unwrap();
    std::fs::write(
        root.join("SEQUENCES.json"),
        r#"[
            {"id": "B12.S1", "modifications": "D1 replaced valve",
             "temps_executer": {"$date": 1000}, "temps_terminer": {"$date": 2000}},
            {"id": "B12.S2", "modifications": "manual purge"},
            {"id": "B13.S1", "modifications": "D2 manual purge"}
        ]"#,
    )
    .unwrap();
    std::fs::write(
        root.join("OPERATIONS.json"),
        r#"[{"id": "B12.S1.O1", "modifications": "recalibrated probe"}]"#,
    )
    .unwrap();
    std::fs::write(
        root.join("FONCTIONS.json"),
        r#"[{"id": "B12.S1.O1.F1", "temps_terminer": {"$date": 1500}}]"#,
    )
    .unwrap();
}

#[tokio::test]
async fn build_persist_restore_over_export_files() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    let cache_dir = tmp.path().join(".batchtrace");

    let (built, stats) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("initial build");
    assert!(!stats.restored_from_cache);
    assert_eq!(stats.records, 7);
    assert_eq!(stats.records_by_kind["step"], 2);
    assert_eq!(stats.distinct_codes, 3);
    assert!(cache_dir.join("global-index.json").exists());
    assert!(cache_dir.join("modification-index.json").exists());

    let (restored, stats) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("restore");
    assert!(stats.restored_from_cache);
    assert_eq!(restored.as_ref(), built.as_ref());

    // the rewritten code is what both indexes answer with
    let ids: Vec<&str> = restored
        .records_for_code("manual purge")
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(ids, ["B12.S2", "B13.S1"]);
}

#[tokio::test]
async fn tampered_cache_triggers_rebuild_and_repersist() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    let cache_dir = tmp.path().join(".batchtrace");

    open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("initial build");

    // a cardinality mismatch against the identifier lists: valid JSON,
    // current schema version, one record instead of seven
    std::fs::write(
        cache_dir.join(format!("{BLOB_GLOBAL_INDEX}.json")),
        r#"{"schema_version": 1, "data": {"B12": {"id": "B12"}}}"#,
    )
    .unwrap();

    let (index, stats) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("rebuild after invalid cache");
    assert!(!stats.restored_from_cache, "invalid cache must force a rebuild");
    assert_eq!(index.len(), 7);

    // the rebuild re-persisted a consistent snapshot
    let (_, stats) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("restore after repersist");
    assert!(stats.restored_from_cache);
    assert_eq!(stats.records, 7);
}

#[tokio::test]
async fn missing_blob_is_a_miss_not_an_error() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    let cache_dir = tmp.path().join(".batchtrace");

    open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("initial build");
    std::fs::remove_file(cache_dir.join("identifier-lists.json")).unwrap();

    let (_, stats) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("rebuild after partial cache");
    assert!(!stats.restored_from_cache);
}

#[tokio::test]
async fn duplicate_identifier_fails_the_open() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    std::fs::write(
        tmp.path().join("OPERATIONS.json"),
        r#"[{"id": "B12.S1"}]"#,
    )
    .unwrap();

    let err = open_index_dir(tmp.path(), tmp.path().join(".batchtrace"))
        .await
        .expect_err("duplicate id must abort");
    assert!(
        matches!(err, IndexError::DuplicateIdentifier { ref id, .. } if id == "B12.S1"),
        "{err}"
    );
}

#[tokio::test]
async fn missing_export_fails_the_open() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    std::fs::remove_file(tmp.path().join("FONCTIONS.json")).unwrap();

    let err = open_index_dir(tmp.path(), tmp.path().join(".batchtrace"))
        .await
        .expect_err("missing collection must abort");
    assert!(matches!(err, IndexError::Source(_)), "{err}");
}

#[tokio::test]
async fn restored_hierarchy_supports_prefix_scans() {
    let tmp = TempDir::new().expect("tempdir");
    write_exports(tmp.path());
    let cache_dir = tmp.path().join(".batchtrace");

    open_index_dir(tmp.path(), &cache_dir).await.expect("build");
    let (index, _) = open_index_dir(tmp.path(), &cache_dir)
        .await
        .expect("restore");

    let sequences = index.identifiers_of(EntityKind::Sequence);
    assert_eq!(sequences, ["B12.S1", "B12.S2", "B13.S1"]);
    assert_eq!(index.kind_of("B12.S1.O1"), Some(EntityKind::Operation));
}
