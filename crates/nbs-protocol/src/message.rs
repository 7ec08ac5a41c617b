use bytes::Bytes;

use crate::error::DecodeError;

/// Number of bytes of each argument shown in log previews.
pub const PREVIEW_LEN: usize = 12;

/// Verbs accepted on the command channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandVerb {
    Save,
    Delete,
    DeleteAll,
}

impl CommandVerb {
    /// Match a verb exactly; verbs are case-sensitive.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        match raw {
            b"SAVE" => Some(Self::Save),
            b"DELETE" => Some(Self::Delete),
            b"DELETE_ALL" => Some(Self::DeleteAll),
            _ => None,
        }
    }

    /// Wire spelling of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "SAVE",
            Self::Delete => "DELETE",
            Self::DeleteAll => "DELETE_ALL",
        }
    }

    /// Number of arguments following the verb.
    pub fn arity(&self) -> usize {
        match self {
            Self::Save => 3,
            Self::Delete => 2,
            Self::DeleteAll => 1,
        }
    }
}

/// Verbs accepted on the query channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryVerb {
    Load,
    Contains,
}

impl QueryVerb {
    /// Match a verb exactly; verbs are case-sensitive.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        match raw {
            b"LOAD" => Some(Self::Load),
            b"CONTAINS" => Some(Self::Contains),
            _ => None,
        }
    }

    /// Wire spelling of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Contains => "CONTAINS",
        }
    }

    /// Number of arguments after the verb.
    pub fn arity(&self) -> usize {
        match self {
            Self::Load | Self::Contains => 2,
        }
    }
}

/// A decoded command-channel message. Commands never get a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Save { namespace: Bytes, name: Bytes, content: Bytes },
    Delete { namespace: Bytes, name: Bytes },
    DeleteAll { namespace: Bytes },
}

impl Command {
    /// Decode a multi-part message: verb followed by its fixed arguments.
    pub fn decode(parts: &[Bytes]) -> Result<Self, DecodeError> {
        let (verb, args) = split_verb(parts)?;
        let verb = CommandVerb::parse(verb).ok_or_else(|| unknown(verb))?;
        check_arity(verb.as_str(), verb.arity(), args)?;
        Ok(match verb {
            CommandVerb::Save => Self::Save {
                namespace: args[0].clone(),
                name: args[1].clone(),
                content: args[2].clone(),
            },
            CommandVerb::Delete => Self::Delete {
                namespace: args[0].clone(),
                name: args[1].clone(),
            },
            CommandVerb::DeleteAll => Self::DeleteAll {
                namespace: args[0].clone(),
            },
        })
    }

    /// The verb this command was sent with.
    pub fn verb(&self) -> CommandVerb {
        match self {
            Self::Save { .. } => CommandVerb::Save,
            Self::Delete { .. } => CommandVerb::Delete,
            Self::DeleteAll { .. } => CommandVerb::DeleteAll,
        }
    }

    /// Verb followed by the arguments, ready for framing.
    pub fn encode(&self) -> Vec<Bytes> {
        let verb = Bytes::from_static(self.verb().as_str().as_bytes());
        match self {
            Self::Save { namespace, name, content } => {
                vec![verb, namespace.clone(), name.clone(), content.clone()]
            }
            Self::Delete { namespace, name } => vec![verb, namespace.clone(), name.clone()],
            Self::DeleteAll { namespace } => vec![verb, namespace.clone()],
        }
    }
}

/// A decoded query-channel message. Every query gets exactly one reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    Load { namespace: Bytes, name: Bytes },
    Contains { namespace: Bytes, name: Bytes },
}

impl Query {
    /// Decode a multi-part message: verb followed by its fixed arguments.
    pub fn decode(parts: &[Bytes]) -> Result<Self, DecodeError> {
        let (verb, args) = split_verb(parts)?;
        let verb = QueryVerb::parse(verb).ok_or_else(|| unknown(verb))?;
        check_arity(verb.as_str(), verb.arity(), args)?;
        let namespace = args[0].clone();
        let name = args[1].clone();
        Ok(match verb {
            QueryVerb::Load => Self::Load { namespace, name },
            QueryVerb::Contains => Self::Contains { namespace, name },
        })
    }

    /// The verb this query was sent with.
    pub fn verb(&self) -> QueryVerb {
        match self {
            Self::Load { .. } => QueryVerb::Load,
            Self::Contains { .. } => QueryVerb::Contains,
        }
    }

    /// Verb followed by the arguments, ready for framing.
    pub fn encode(&self) -> Vec<Bytes> {
        let verb = Bytes::from_static(self.verb().as_str().as_bytes());
        match self {
            Self::Load { namespace, name } | Self::Contains { namespace, name } => {
                vec![verb, namespace.clone(), name.clone()]
            }
        }
    }
}

fn split_verb(parts: &[Bytes]) -> Result<(&[u8], &[Bytes]), DecodeError> {
    match parts.split_first() {
        Some((verb, args)) => Ok((verb.as_ref(), args)),
        None => Err(DecodeError::Empty),
    }
}

fn unknown(verb: &[u8]) -> DecodeError {
    DecodeError::UnknownVerb {
        verb: String::from_utf8_lossy(verb).into_owned(),
    }
}

fn check_arity(verb: &'static str, expected: usize, args: &[Bytes]) -> Result<(), DecodeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(DecodeError::Arity { verb, expected, actual: args.len() })
    }
}

/// Short, log-safe rendering of message arguments.
///
/// Each argument is cut to [`PREVIEW_LEN`] bytes so blob content never
/// floods the log.
pub fn preview(args: &[Bytes]) -> String {
    args.iter()
        .map(|arg| String::from_utf8_lossy(&arg[..arg.len().min(PREVIEW_LEN)]).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(parts: &[&[u8]]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::copy_from_slice(p)).collect()
    }

    #[test]
    fn decode_save() {
        let cmd = Command::decode(&msg(&[b"SAVE", b"users", b"42", b"alice"])).unwrap();
        assert_eq!(
            cmd,
            Command::Save {
                namespace: Bytes::from_static(b"users"),
                name: Bytes::from_static(b"42"),
                content: Bytes::from_static(b"alice"),
            }
        );
        assert_eq!(cmd.verb(), CommandVerb::Save);
    }

    #[test]
    fn decode_delete_and_delete_all() {
        assert!(matches!(
            Command::decode(&msg(&[b"DELETE", b"users", b"42"])).unwrap(),
            Command::Delete { .. }
        ));
        assert!(matches!(
            Command::decode(&msg(&[b"DELETE_ALL", b"users"])).unwrap(),
            Command::DeleteAll { .. }
        ));
    }

    #[test]
    fn command_arity_mismatch() {
        let err = Command::decode(&msg(&[b"SAVE", b"users", b"42"])).unwrap_err();
        assert_eq!(err, DecodeError::Arity { verb: "SAVE", expected: 3, actual: 2 });

        let err = Command::decode(&msg(&[b"DELETE_ALL"])).unwrap_err();
        assert_eq!(err, DecodeError::Arity { verb: "DELETE_ALL", expected: 1, actual: 0 });

        let err = Command::decode(&msg(&[b"DELETE_ALL", b"a", b"b"])).unwrap_err();
        assert!(matches!(err, DecodeError::Arity { actual: 2, .. }));
    }

    #[test]
    fn query_verbs_are_unknown_on_command_channel() {
        let err = Command::decode(&msg(&[b"LOAD", b"users", b"42"])).unwrap_err();
        assert_eq!(err, DecodeError::UnknownVerb { verb: "LOAD".into() });
    }

    #[test]
    fn verbs_are_case_sensitive() {
        assert!(CommandVerb::parse(b"save").is_none());
        assert!(QueryVerb::parse(b"load").is_none());
    }

    #[test]
    fn empty_message() {
        assert_eq!(Command::decode(&[]).unwrap_err(), DecodeError::Empty);
        assert_eq!(Query::decode(&[]).unwrap_err(), DecodeError::Empty);
    }

    #[test]
    fn decode_queries() {
        let q = Query::decode(&msg(&[b"LOAD", b"users", b"42"])).unwrap();
        assert_eq!(q.verb(), QueryVerb::Load);
        let q = Query::decode(&msg(&[b"CONTAINS", b"users", b"42"])).unwrap();
        assert_eq!(q.verb(), QueryVerb::Contains);
    }

    #[test]
    fn query_errors() {
        let err = Query::decode(&msg(&[b"LOAD", b"users"])).unwrap_err();
        assert_eq!(err, DecodeError::Arity { verb: "LOAD", expected: 2, actual: 1 });
        let err = Query::decode(&msg(&[b"SAVE", b"a", b"b", b"c"])).unwrap_err();
        assert_eq!(err, DecodeError::UnknownVerb { verb: "SAVE".into() });
    }

    #[test]
    fn encode_is_decodable() {
        let cmd = Command::DeleteAll { namespace: Bytes::from_static(b"users") };
        assert_eq!(Command::decode(&cmd.encode()).unwrap(), cmd);
        let q = Query::Contains {
            namespace: Bytes::from_static(b"users"),
            name: Bytes::from_static(b"1"),
        };
        assert_eq!(Query::decode(&q.encode()).unwrap(), q);
    }

    #[test]
    fn preview_truncates_each_argument() {
        let args = msg(&[b"users", b"a very long blob body that goes on"]);
        assert_eq!(preview(&args), "users, a very long ");
        assert_eq!(preview(&[]), "");
    }

    #[test]
    fn preview_tolerates_binary() {
        let args = msg(&[&[0xff, 0x00, b'a']]);
        assert_eq!(preview(&args), "\u{fffd}\u{0}a");
    }
}
