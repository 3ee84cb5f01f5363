use crate::{IndexError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

const BUILD_LOCK_FILE_NAME: &str = "build.lock";

/// Exclusive cross-process build lock. Held for the whole
/// restore-or-build-and-persist sequence; released on drop.
pub struct BuildLock {
    #[allow(dead_code)]
    file: std::fs::File,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path_for_cache_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join(BUILD_LOCK_FILE_NAME)
}

/// Serializes index builds against the cache directory across
/// processes. Waiting is a blocking flock, so it runs on the blocking
/// pool.
pub async fn acquire_build_lock(cache_dir: &Path) -> Result<BuildLock> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let path = lock_path_for_cache_dir(cache_dir);

    let lock = tokio::task::spawn_blocking(move || -> Result<BuildLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                IndexError::Other(format!("open build lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            IndexError::Other(format!("acquire build lock {}: {err}", path.display()))
        })?;
        let waited = start.elapsed();
        if waited.as_millis() > 10 {
            log::debug!(
                "waited {}ms for build lock {}",
                waited.as_millis(),
                path.display()
            );
        }

        Ok(BuildLock { file })
    })
    .await
    .map_err(|err| IndexError::Other(format!("join build lock task: {err}")))??;

    Ok(lock)
}
