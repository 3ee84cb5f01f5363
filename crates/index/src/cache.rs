use crate::snapshot::Snapshot;
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const INDEX_CACHE_SCHEMA_VERSION: u32 = 1;

pub const BLOB_GLOBAL_INDEX: &str = "global-index";
pub const BLOB_IDENTIFIER_LISTS: &str = "identifier-lists";
pub const BLOB_MODIFICATION_LISTS: &str = "modification-lists";
pub const BLOB_MODIFICATION_INDEX: &str = "modification-index";

const CACHE_DIR_NAME: &str = ".batchtrace";

/// Default cache directory for a data root.
#[must_use]
pub fn cache_dir_for_data_root(data_root: &Path) -> PathBuf {
    data_root.join(CACHE_DIR_NAME)
}

/// Byte-oriented blob storage boundary.
///
/// `load` distinguishes "absent" (`Ok(None)`) from "unreadable"
/// (`Err`); the restore path treats the former as a cache miss and the
/// latter as an invalid cache, both ending in a rebuild.
#[async_trait]
pub trait BlobCache: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Blob cache as a directory of `<key>.json` files, written atomically by
/// temp-file rename so a crashed writer never leaves a half blob behind.
#[derive(Debug, Clone)]
pub struct FsBlobCache {
    dir: PathBuf,
}

impl FsBlobCache {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl BlobCache for FsBlobCache {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.blob_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-memory blob cache for tests and in-process callers.
#[derive(Debug, Default)]
pub struct MemoryBlobCache {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().expect("blob cache lock").get(key).cloned())
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs
            .lock()
            .expect("blob cache lock")
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Result of a restore attempt. `Invalid` is a diagnosis, not an error:
/// the loader logs it and rebuilds, exactly as it does on `Miss`.
#[derive(Debug)]
pub enum RestoreOutcome {
    Hit(Snapshot),
    Miss,
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionedBlob<T> {
    schema_version: u32,
    data: T,
}

/// Persists and restores index snapshots as four named blobs.
///
/// A restore is accepted only when all four blobs are present, decode at
/// the current schema version, and the reassembled snapshot passes
/// structural validation; every other state degrades to a rebuild rather
/// than surfacing from the loader. A partially valid cache is never used.
pub struct IndexCache {
    cache: Arc<dyn BlobCache>,
}

impl IndexCache {
    #[must_use]
    pub fn new(cache: Arc<dyn BlobCache>) -> Self {
        Self { cache }
    }

    /// Serializes and stores all four blobs. Failures propagate: a build
    /// that cannot persist its result is worth the caller's attention.
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        self.store_blob(BLOB_GLOBAL_INDEX, &snapshot.global_index)
            .await?;
        self.store_blob(BLOB_IDENTIFIER_LISTS, &snapshot.identifier_lists)
            .await?;
        self.store_blob(BLOB_MODIFICATION_LISTS, &snapshot.modification_lists)
            .await?;
        self.store_blob(BLOB_MODIFICATION_INDEX, &snapshot.modification_index)
            .await?;
        log::debug!("persisted index snapshot ({} records)", snapshot.global_index.len());
        Ok(())
    }

    /// Attempts to reassemble a snapshot from the four blobs.
    pub async fn try_restore(&self) -> RestoreOutcome {
        let global_index = match self.load_blob(BLOB_GLOBAL_INDEX).await {
            Ok(Some(data)) => data,
            Ok(None) => return RestoreOutcome::Miss,
            Err(reason) => return RestoreOutcome::Invalid(reason),
        };
        let identifier_lists = match self.load_blob(BLOB_IDENTIFIER_LISTS).await {
            Ok(Some(data)) => data,
            Ok(None) => return RestoreOutcome::Miss,
            Err(reason) => return RestoreOutcome::Invalid(reason),
        };
        let modification_lists = match self.load_blob(BLOB_MODIFICATION_LISTS).await {
            Ok(Some(data)) => data,
            Ok(None) => return RestoreOutcome::Miss,
            Err(reason) => return RestoreOutcome::Invalid(reason),
        };
        let modification_index = match self.load_blob(BLOB_MODIFICATION_INDEX).await {
            Ok(Some(data)) => data,
            Ok(None) => return RestoreOutcome::Miss,
            Err(reason) => return RestoreOutcome::Invalid(reason),
        };

        let snapshot = Snapshot {
            global_index,
            identifier_lists,
            modification_lists,
            modification_index,
        };
        match snapshot.validate() {
            Ok(()) => RestoreOutcome::Hit(snapshot),
            Err(err) => RestoreOutcome::Invalid(err.to_string()),
        }
    }

    async fn store_blob<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let bytes = serde_json::to_vec(&VersionedBlob {
            schema_version: INDEX_CACHE_SCHEMA_VERSION,
            data,
        })?;
        self.cache.store(key, &bytes).await
    }

    /// `Ok(None)` is a miss; the error side carries a human-readable
    /// reason for an invalid blob.
    async fn load_blob<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> std::result::Result<Option<T>, String> {
        let bytes = match self.cache.load(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::debug!("index cache miss: blob {key:?} absent");
                return Ok(None);
            }
            Err(err) => return Err(format!("load blob {key:?}: {err}")),
        };
        let blob: VersionedBlob<T> = serde_json::from_slice(&bytes)
            .map_err(|err| format!("decode blob {key:?}: {err}"))?;
        if blob.schema_version != INDEX_CACHE_SCHEMA_VERSION {
            return Err(format!(
                "blob {key:?} has schema_version {} (expected {INDEX_CACHE_SCHEMA_VERSION})",
                blob.schema_version
            ));
        }
        Ok(Some(blob.data))
    }
}
