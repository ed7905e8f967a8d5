use crate::{IndexerError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

const BUILD_LOCK_FILE_NAME: &str = "index.lock";

/// Exclusive cross-process lock over an index directory, released on drop.
pub(crate) struct BuildLock {
    file: std::fs::File,
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("Failed to release {}: {err}", self.path.display());
        }
    }
}

pub(crate) fn lock_path(dir: &Path) -> PathBuf {
    dir.join(BUILD_LOCK_FILE_NAME)
}

pub(crate) async fn acquire_build_lock(dir: &Path) -> Result<BuildLock> {
    tokio::fs::create_dir_all(dir).await?;
    let path = lock_path(dir);

    tokio::task::spawn_blocking(move || -> Result<BuildLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .inspect_err(|err| log::warn!("Cannot open build lock {}: {err}", path.display()))?;

        let start = Instant::now();
        file.lock_exclusive()
            .inspect_err(|err| log::warn!("Cannot acquire build lock {}: {err}", path.display()))?;
        let waited = start.elapsed().as_millis() as u64;
        if waited > 0 {
            log::info!("Waited {waited} ms for build lock {}", path.display());
        }

        Ok(BuildLock { file, path })
    })
    .await
    .map_err(|err| IndexerError::Other(format!("join build lock task: {err}")))?
}
