use crate::error::StoreResult;
use crate::key::{BlobKey, Namespace};
use crate::wipe::WipeHandle;

/// Namespaced blob store.
///
/// All implementations must satisfy these invariants:
/// - Writes overwrite unconditionally; there is no versioning.
/// - Nothing is cached: every call observes the current backing state.
/// - Namespaces come into existence on the first `save` into them.
/// - Missing blobs and namespaces are outcomes, not errors.
pub trait BlobStore: Send + Sync {
    /// Write `content` under `key`, creating the namespace if needed.
    fn save(&self, key: &BlobKey, content: &[u8]) -> StoreResult<()>;

    /// Read a blob.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    /// Returns `Err` if it exists but cannot be read.
    fn load(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether anything exists at `key`.
    fn contains(&self, key: &BlobKey) -> StoreResult<bool>;

    /// Remove a blob. Returns `true` if it existed.
    fn delete(&self, key: &BlobKey) -> StoreResult<bool>;

    /// Remove a whole namespace.
    ///
    /// Returns `Ok(None)` if the namespace does not exist. Otherwise the
    /// removal may still be in progress when this returns; the handle can be
    /// joined to wait for it or dropped to let it finish on its own.
    fn delete_all(&self, namespace: &Namespace) -> StoreResult<Option<WipeHandle>>;
}
