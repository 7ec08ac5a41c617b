use bytes::Bytes;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::QueryVerb;

/// Reply value signalling failure or absence on the query channel.
///
/// The sentinel is a plain single-part message, so a blob whose content is
/// exactly `-1` cannot be told apart from a failed `LOAD`.
pub const SENTINEL: &[u8] = b"-1";
pub const PRESENT: &[u8] = b"Y";
pub const ABSENT: &[u8] = b"N";

/// The single reply sent for every query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Raw content of a loaded blob.
    Blob(Bytes),
    /// `CONTAINS` found the key.
    Present,
    /// `CONTAINS` did not find the key.
    Absent,
    /// Missing blob, unreadable blob, or malformed query.
    Error,
}

impl Reply {
    /// The single-part wire form of this reply.
    pub fn encode(&self) -> Vec<Bytes> {
        let part = match self {
            Self::Blob(data) => data.clone(),
            Self::Present => Bytes::from_static(PRESENT),
            Self::Absent => Bytes::from_static(ABSENT),
            Self::Error => Bytes::from_static(SENTINEL),
        };
        vec![part]
    }

    /// Interpret a reply in the context of the query that produced it.
    pub fn decode(verb: QueryVerb, parts: &[Bytes]) -> ProtocolResult<Self> {
        let [part] = parts else {
            return Err(ProtocolError::UnexpectedReply {
                verb: verb.as_str(),
                reply: format!("{} parts", parts.len()),
            });
        };
        if part.as_ref() == SENTINEL {
            return Ok(Self::Error);
        }
        match verb {
            QueryVerb::Load => Ok(Self::Blob(part.clone())),
            QueryVerb::Contains => match part.as_ref() {
                PRESENT => Ok(Self::Present),
                ABSENT => Ok(Self::Absent),
                other => Err(ProtocolError::UnexpectedReply {
                    verb: verb.as_str(),
                    reply: String::from_utf8_lossy(other).into_owned(),
                }),
            },
        }
    }

    /// Whether this is the `-1` sentinel.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(data: &'static [u8]) -> Vec<Bytes> {
        vec![Bytes::from_static(data)]
    }

    #[test]
    fn encode_is_single_part() {
        assert_eq!(Reply::Blob(Bytes::from_static(b"alice")).encode(), one(b"alice"));
        assert_eq!(Reply::Present.encode(), one(b"Y"));
        assert_eq!(Reply::Absent.encode(), one(b"N"));
        assert_eq!(Reply::Error.encode(), one(b"-1"));
    }

    #[test]
    fn decode_load_replies() {
        assert_eq!(
            Reply::decode(QueryVerb::Load, &one(b"alice")).unwrap(),
            Reply::Blob(Bytes::from_static(b"alice"))
        );
        assert_eq!(Reply::decode(QueryVerb::Load, &one(b"Y")).unwrap(), Reply::Blob(Bytes::from_static(b"Y")));
        assert!(Reply::decode(QueryVerb::Load, &one(b"-1")).unwrap().is_error());
        assert_eq!(Reply::decode(QueryVerb::Load, &one(b"")).unwrap(), Reply::Blob(Bytes::new()));
    }

    #[test]
    fn decode_contains_replies() {
        assert_eq!(Reply::decode(QueryVerb::Contains, &one(b"Y")).unwrap(), Reply::Present);
        assert_eq!(Reply::decode(QueryVerb::Contains, &one(b"N")).unwrap(), Reply::Absent);
        assert_eq!(Reply::decode(QueryVerb::Contains, &one(b"-1")).unwrap(), Reply::Error);
        assert!(Reply::decode(QueryVerb::Contains, &one(b"maybe")).is_err());
    }

    #[test]
    fn decode_rejects_multi_part() {
        let parts = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let err = Reply::decode(QueryVerb::Load, &parts).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply { verb: "LOAD", .. }));
    }
}
