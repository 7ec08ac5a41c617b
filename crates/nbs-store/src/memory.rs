use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::key::{BlobKey, BlobName, Namespace};
use crate::traits::BlobStore;
use crate::wipe::WipeHandle;

type NamespaceMap = HashMap<Namespace, HashMap<BlobName, Vec<u8>>>;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Namespace wipes complete before
/// `delete_all` returns.
pub struct InMemoryBlobStore {
    namespaces: RwLock<NamespaceMap>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs across all namespaces.
    pub fn len(&self) -> usize {
        self.namespaces
            .read()
            .expect("lock poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Whether no blob is stored in any namespace.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of namespaces that currently exist.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let map = self.namespaces.read().expect("lock poisoned");
        let mut names: Vec<Namespace> = map.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(&self, key: &BlobKey, content: &[u8]) -> StoreResult<()> {
        self.namespaces
            .write()
            .expect("lock poisoned")
            .entry(key.namespace.clone())
            .or_default()
            .insert(key.name.clone(), content.to_vec());
        Ok(())
    }

    fn load(&self, key: &BlobKey) -> StoreResult<Option<Vec<u8>>> {
        let map = self.namespaces.read().expect("lock poisoned");
        Ok(map
            .get(&key.namespace)
            .and_then(|blobs| blobs.get(&key.name))
            .cloned())
    }

    fn contains(&self, key: &BlobKey) -> StoreResult<bool> {
        let map = self.namespaces.read().expect("lock poisoned");
        Ok(map
            .get(&key.namespace)
            .is_some_and(|blobs| blobs.contains_key(&key.name)))
    }

    fn delete(&self, key: &BlobKey) -> StoreResult<bool> {
        let mut map = self.namespaces.write().expect("lock poisoned");
        Ok(map
            .get_mut(&key.namespace)
            .and_then(|blobs| blobs.remove(&key.name))
            .is_some())
    }

    fn delete_all(&self, namespace: &Namespace) -> StoreResult<Option<WipeHandle>> {
        let mut map = self.namespaces.write().expect("lock poisoned");
        Ok(map
            .remove(namespace)
            .map(|_| WipeHandle::finished(namespace.as_str())))
    }
}
