//! Namespaced blob storage for NBS.
//!
//! Blobs are opaque byte sequences addressed by a `(namespace, name)` pair.
//! On disk the layout is flat and self-describing:
//!
//! ```text
//! <root>/<namespace>/<name>
//! ```
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`FsBlobStore`] -- one directory per namespace, one file per blob
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Writes overwrite in place; there is no versioning.
//! 2. Nothing is cached. Every operation consults the backing store.
//! 3. Namespaces are created by the first save and removed wholesale.
//! 4. Key segments are validated before any path is built, so a key can
//!    never address anything outside its namespace directory.
//! 5. Namespace wipes run on a detached worker (see [`wipe`]).

pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod traits;
pub mod wipe;

pub use error::{SegmentKind, StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use key::{BlobKey, BlobName, Namespace};
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
pub use wipe::{WipeConfig, WipeHandle, WipeStrategy};
