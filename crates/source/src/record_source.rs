use crate::error::{Result, SourceError};
use async_trait::async_trait;
use batchtrace_collection::LazyCollection;
use batchtrace_model::{Collection, FieldValue, Record};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Boundary loading a named collection into a lazy pipeline.
///
/// Loading is fail-fast: the first record without a valid `id` aborts the
/// load with [`SourceError::MalformedRecord`].
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load(&self, collection: Collection) -> Result<LazyCollection<Record>>;
}

/// Reads collections exported as `<STEM>.json` array files under a data
/// root directory.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}.json", collection.file_stem()))
    }
}

#[async_trait]
impl RecordSource for JsonDirSource {
    async fn load(&self, collection: Collection) -> Result<LazyCollection<Record>> {
        let path = self.collection_path(collection);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| SourceError::Unavailable {
                collection,
                path: path.clone(),
                source,
            })?;
        let raw: Vec<BTreeMap<String, FieldValue>> = serde_json::from_slice(&bytes)
            .map_err(|source| SourceError::Decode { collection, source })?;

        let mut records = Vec::with_capacity(raw.len());
        for (position, fields) in raw.into_iter().enumerate() {
            let record =
                Record::from_fields(fields).map_err(|err| SourceError::MalformedRecord {
                    collection,
                    position,
                    reason: err.to_string(),
                })?;
            records.push(record);
        }
        log::debug!(
            "loaded {} {} records from {}",
            records.len(),
            collection,
            path.display()
        );
        Ok(LazyCollection::from_items(records))
    }
}

/// In-memory source for tests and in-process callers.
///
/// A collection never inserted loads as empty.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: BTreeMap<Collection, Vec<Record>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, collection: Collection, records: Vec<Record>) -> Self {
        self.insert(collection, records);
        self
    }

    pub fn insert(&mut self, collection: Collection, records: Vec<Record>) {
        self.collections.insert(collection, records);
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn load(&self, collection: Collection) -> Result<LazyCollection<Record>> {
        let records = self.collections.get(&collection).cloned().unwrap_or_default();
        Ok(LazyCollection::from_items(records))
    }
}
