use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::key::{BlobKey, Namespace};
use crate::traits::BlobStore;
use crate::wipe::{spawn_wipe, WipeConfig, WipeHandle};

/// Blob store laid out as `<root>/<namespace>/<name>`.
///
/// One directory per namespace, one file per blob, no index and no sidecar
/// metadata. The filesystem is the only source of truth.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    wipe: WipeConfig,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// Fails if the root cannot be created, is not a directory, or cannot be
    /// written to by this process, and (for the mirror wipe strategy) if the staging
    /// directory cannot be prepared.
    pub fn open(root: impl Into<PathBuf>, wipe: WipeConfig) -> StoreResult<Self> {
        let root = root.into();
        let unusable = |reason: String| StoreError::UnusableRoot {
            path: root.clone(),
            reason,
        };

        fs::create_dir_all(&root).map_err(|e| unusable(e.to_string()))?;
        let meta = fs::metadata(&root).map_err(|e| unusable(e.to_string()))?;
        if !meta.is_dir() {
            return Err(unusable("not a directory".into()));
        }
        // Permission bits say nothing about ownership, so write for real.
        tempfile::NamedTempFile::new_in(&root)
            .map_err(|e| unusable(format!("not writable: {e}")))?;

        wipe.prepare(&root)?;
        info!(root = %root.display(), wipe = %wipe.strategy, "blob store opened");
        Ok(Self { root, wipe })
    }

    /// Directory holding one subdirectory per namespace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How `delete_all` empties a namespace.
    pub fn wipe_config(&self) -> &WipeConfig {
        &self.wipe
    }

    /// `<root>/<namespace>`.
    pub fn namespace_path(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(namespace.as_str())
    }

    /// `<root>/<namespace>/<name>`.
    pub fn blob_path(&self, key: &BlobKey) -> PathBuf {
        self.namespace_path(&key.namespace).join(key.name.as_str())
    }
}

impl BlobStore for FsBlobStore {
    fn save(&self, key: &BlobKey, content: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(self.namespace_path(&key.namespace))?;
        fs::write(self.blob_path(key), content)?;
        debug!(%key, len = content.len(), "blob saved");
        Ok(())
    }

    fn load(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &BlobKey) -> StoreResult<bool> {
        Ok(self.blob_path(key).try_exists()?)
    }

    fn delete(&self, key: &BlobKey) -> StoreResult<bool> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => {
                debug!(%key, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_all(&self, namespace: &Namespace) -> StoreResult<Option<WipeHandle>> {
        let dir = self.namespace_path(namespace);
        if !dir.is_dir() {
            return Ok(None);
        }
        let handle = spawn_wipe(dir, &self.wipe)?;
        debug!(%namespace, "namespace wipe started");
        Ok(Some(handle))
    }
}
