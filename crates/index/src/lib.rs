//! Derived index over the exported process hierarchy.
//!
//! ```text
//! RecordSource --> build_index --> ProcessIndex --> export_snapshot
//!                      ^                                  |
//!                      |                                  v
//!                      +-- rebuild on miss/invalid <-- IndexCache
//! ```
//!
//! Four structures are derived in one fail-fast pass over the step,
//! sequence, operation and function collections: the global id -> record
//! map, per-kind sorted identifier lists, the modification code -> records
//! map, and per-kind sorted modification-code lists. [`IndexCache`]
//! persists them as four named blobs; a restore is accepted only when all
//! four are present and mutually consistent, anything else falls back to a
//! rebuild. [`open_index_dir`] ties it together under a cross-process
//! build lock.

mod build;
mod build_lock;
mod cache;
mod error;
mod index;
mod loader;
mod snapshot;

pub use build::{build_index, BuildStats};
pub use build_lock::{acquire_build_lock, BuildLock};
pub use cache::{
    cache_dir_for_data_root, BlobCache, FsBlobCache, IndexCache, MemoryBlobCache, RestoreOutcome,
    BLOB_GLOBAL_INDEX, BLOB_IDENTIFIER_LISTS, BLOB_MODIFICATION_INDEX, BLOB_MODIFICATION_LISTS,
    INDEX_CACHE_SCHEMA_VERSION,
};
pub use error::{IndexError, Result};
pub use index::{KindLists, ProcessIndex};
pub use loader::{open_index, open_index_dir};
pub use snapshot::Snapshot;
