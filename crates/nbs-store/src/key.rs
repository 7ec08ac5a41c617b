//! Blob key validation.
//!
//! A blob is addressed by a `(namespace, name)` pair, and each half maps to
//! exactly one path segment below the store root. Valid segments:
//! - Must be non-empty valid UTF-8
//! - Must not be `.` or `..`
//! - Must not contain `/`, `\` or NUL

use std::fmt;

use crate::error::{SegmentKind, StoreError, StoreResult};

/// Characters that would let a segment escape its directory.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

fn validate_segment(kind: SegmentKind, raw: &[u8]) -> StoreResult<String> {
    let invalid = |reason: String| StoreError::InvalidSegment {
        kind,
        segment: String::from_utf8_lossy(raw).into_owned(),
        reason,
    };

    let segment = std::str::from_utf8(raw).map_err(|_| invalid("not valid UTF-8".into()))?;

    if segment.is_empty() {
        return Err(invalid("must not be empty".into()));
    }

    if segment == "." || segment == ".." {
        return Err(invalid("must not be a relative directory reference".into()));
    }

    if let Some(ch) = segment.chars().find(|ch| FORBIDDEN_CHARS.contains(ch)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    Ok(segment.to_owned())
}

/// A validated namespace: one directory directly below the store root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validate raw bytes as a namespace segment.
    ///
    /// ```
    /// use nbs_store::Namespace;
    ///
    /// assert!(Namespace::parse("users").is_ok());
    /// assert!(Namespace::parse("..").is_err());
    /// assert!(Namespace::parse("a/b").is_err());
    /// ```
    pub fn parse(raw: impl AsRef<[u8]>) -> StoreResult<Self> {
        validate_segment(SegmentKind::Namespace, raw.as_ref()).map(Self)
    }

    /// The validated segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated blob name: one file inside a namespace directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    /// Validate raw bytes as a blob name segment.
    pub fn parse(raw: impl AsRef<[u8]>) -> StoreResult<Self> {
        validate_segment(SegmentKind::Name, raw.as_ref()).map(Self)
    }

    /// The validated segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full address of a blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub namespace: Namespace,
    pub name: BlobName,
}

impl BlobKey {
    /// Combine two already-validated segments.
    pub fn new(namespace: Namespace, name: BlobName) -> Self {
        Self { namespace, name }
    }

    /// Validate both halves of a key from raw message fields.
    pub fn parse(namespace: impl AsRef<[u8]>, name: impl AsRef<[u8]>) -> StoreResult<Self> {
        Ok(Self {
            namespace: Namespace::parse(namespace)?,
            name: BlobName::parse(name)?,
        })
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_segments_are_valid() {
        assert!(Namespace::parse("users").is_ok());
        assert!(Namespace::parse("user-data_2024").is_ok());
        assert!(BlobName::parse("42").is_ok());
        assert!(BlobName::parse("avatar.png").is_ok());
        assert!(BlobName::parse("..hidden").is_ok());
    }

    #[test]
    fn empty_is_rejected() {
        let err = Namespace::parse("").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidSegment { kind: SegmentKind::Namespace, .. }
        ));
        assert!(BlobName::parse(b"").is_err());
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(Namespace::parse(".").is_err());
        assert!(Namespace::parse("..").is_err());
        assert!(BlobName::parse("../etc").is_err());
        assert!(BlobName::parse("a\\b").is_err());
        assert!(BlobName::parse("/absolute").is_err());
    }

    #[test]
    fn nul_and_invalid_utf8_are_rejected() {
        assert!(BlobName::parse(b"nul\0byte").is_err());
        let err = BlobName::parse([0xff, 0xfe]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn key_parse_reports_failing_half() {
        let err = BlobKey::parse("ok", "..").unwrap_err();
        assert!(matches!(err, StoreError::InvalidSegment { kind: SegmentKind::Name, .. }));

        let err = BlobKey::parse("..", "ok").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidSegment { kind: SegmentKind::Namespace, .. }
        ));
    }

    #[test]
    fn key_display() {
        let key = BlobKey::parse("users", "42").unwrap();
        assert_eq!(key.to_string(), "users/42");
        assert_eq!(key.namespace.as_str(), "users");
        assert_eq!(key.name.as_str(), "42");
    }
}
