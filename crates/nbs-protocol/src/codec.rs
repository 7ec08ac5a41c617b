use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};

/// Upper bound on the encoded size of one multi-part message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

const HEADER_SIZE: usize = 4;

/// Parts reserved up front when reading; more are added as they arrive.
const MAX_PREALLOC_PARTS: usize = 64;

/// Codec for multi-part messages.
///
/// Wire format, all integers big-endian:
/// ```text
/// [4 bytes: part count, at least 1]
/// for each part:
///   [4 bytes: part length]
///   [N bytes: part data]
/// ```
pub struct FrameCodec;

impl FrameCodec {
    /// Frame a message. Fails on zero parts or past `MAX_MESSAGE_SIZE`.
    pub fn encode(parts: &[Bytes]) -> ProtocolResult<Bytes> {
        if parts.is_empty() {
            return Err(ProtocolError::FramingError("message has no parts".into()));
        }
        let size = encoded_len(parts);
        if size > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge { size, max: MAX_MESSAGE_SIZE });
        }
        let mut buf = BytesMut::with_capacity(size);
        buf.put_u32(parts.len() as u32);
        for part in parts {
            buf.put_u32(part.len() as u32);
            buf.put_slice(part);
        }
        Ok(buf.freeze())
    }

    /// Decode one message from the front of `data`. Returns
    /// `(parts, bytes_consumed)`.
    pub fn decode(data: &[u8]) -> ProtocolResult<(Vec<Bytes>, usize)> {
        let mut cursor = data;
        let count = take_header(&mut cursor)?;
        check_count(count)?;
        let mut parts = Vec::with_capacity(count);
        let mut consumed = HEADER_SIZE;
        for _ in 0..count {
            let len = take_header(&mut cursor)?;
            consumed += HEADER_SIZE + len;
            if consumed > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::MessageTooLarge { size: consumed, max: MAX_MESSAGE_SIZE });
            }
            if cursor.remaining() < len {
                return Err(ProtocolError::FramingError(format!(
                    "incomplete part: have {}, need {}",
                    cursor.remaining(),
                    len
                )));
            }
            parts.push(Bytes::copy_from_slice(&cursor[..len]));
            cursor.advance(len);
        }
        Ok((parts, consumed))
    }

    /// Read one message from a stream.
    ///
    /// Returns `Ok(None)` when the peer closes the stream cleanly between
    /// messages.
    pub async fn read_message<R>(reader: &mut R) -> ProtocolResult<Option<Vec<Bytes>>>
    where
        R: AsyncRead + Unpin,
    {
        let count = match reader.read_u32().await {
            Ok(count) => count as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_count(count)?;

        // Headers are untrusted: memory grows with bytes received, not
        // with what the peer announces.
        let mut parts = Vec::with_capacity(count.min(MAX_PREALLOC_PARTS));
        let mut size = HEADER_SIZE;
        for _ in 0..count {
            let len = reader.read_u32().await? as usize;
            size += HEADER_SIZE + len;
            if size > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::MessageTooLarge { size, max: MAX_MESSAGE_SIZE });
            }
            let mut part = Vec::new();
            let read = (&mut *reader).take(len as u64).read_to_end(&mut part).await?;
            if read < len {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
            parts.push(Bytes::from(part));
        }
        Ok(Some(parts))
    }

    /// Frame a message, write it, and flush.
    pub async fn write_message<W>(writer: &mut W, parts: &[Bytes]) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = Self::encode(parts)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}

fn encoded_len(parts: &[Bytes]) -> usize {
    HEADER_SIZE + parts.iter().map(|p| HEADER_SIZE + p.len()).sum::<usize>()
}

fn take_header(cursor: &mut &[u8]) -> ProtocolResult<usize> {
    if cursor.remaining() < HEADER_SIZE {
        return Err(ProtocolError::FramingError("too short".into()));
    }
    Ok(cursor.get_u32() as usize)
}

fn check_count(count: usize) -> ProtocolResult<()> {
    if count == 0 {
        return Err(ProtocolError::FramingError("zero-part message".into()));
    }
    // Every part costs at least its length header.
    if HEADER_SIZE + count * HEADER_SIZE > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: HEADER_SIZE + count * HEADER_SIZE,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(items: &[&'static [u8]]) -> Vec<Bytes> {
        items.iter().map(|p| Bytes::from_static(p)).collect()
    }

    #[test]
    fn encode_layout() {
        let frame = FrameCodec::encode(&parts(&[b"LOAD", b"ns"])).unwrap();
        assert_eq!(
            frame.as_ref(),
            &[0, 0, 0, 2, 0, 0, 0, 4, b'L', b'O', b'A', b'D', 0, 0, 0, 2, b'n', b's'][..]
        );
    }

    #[test]
    fn decode_reports_consumed_bytes() {
        let msg = parts(&[b"SAVE", b"users", b"42", b""]);
        let mut data = FrameCodec::encode(&msg).unwrap().to_vec();
        let len = data.len();
        data.extend_from_slice(b"trailing");
        let (decoded, consumed) = FrameCodec::decode(&data).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, len);
    }

    #[test]
    fn encode_rejects_empty() {
        assert!(matches!(FrameCodec::encode(&[]), Err(ProtocolError::FramingError(_))));
    }

    #[test]
    fn decode_truncated() {
        let err = FrameCodec::decode(&[0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));

        let frame = FrameCodec::encode(&parts(&[b"CONTAINS"])).unwrap();
        let err = FrameCodec::decode(&frame[..frame.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_zero_parts() {
        let err = FrameCodec::decode(&[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_oversized_part() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(&(MAX_MESSAGE_SIZE as u32).to_be_bytes());
        let err = FrameCodec::decode(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn stream_read_write() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let first = parts(&[b"SAVE", b"users", b"42", b"alice"]);
        let second = parts(&[b"DELETE_ALL", b"users"]);

        FrameCodec::write_message(&mut client, &first).await.unwrap();
        FrameCodec::write_message(&mut client, &second).await.unwrap();
        drop(client);

        assert_eq!(FrameCodec::read_message(&mut server).await.unwrap(), Some(first));
        assert_eq!(FrameCodec::read_message(&mut server).await.unwrap(), Some(second));
        assert_eq!(FrameCodec::read_message(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_rejects_oversized_part_before_reading_it() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut header = vec![0, 0, 0, 1];
        header.extend_from_slice(&(MAX_MESSAGE_SIZE as u32).to_be_bytes());
        client.write_all(&header).await.unwrap();
        let err = FrameCodec::read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn stream_rejects_oversized_count() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0x01, 0x00, 0x00, 0x00]).await.unwrap();
        let err = FrameCodec::read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn stream_huge_announced_count_fails_on_eof_without_reserving() {
        // Passes the count check but the peer never sends the parts.
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0x00, 0xFF, 0xFF, 0xF0]).await.unwrap();
        client.write_all(&[0, 0, 0, 1, b'x']).await.unwrap();
        drop(client);
        let err = FrameCodec::read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[tokio::test]
    async fn stream_announced_length_longer_than_data_is_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(&(1024u32 * 1024).to_be_bytes());
        data.extend_from_slice(b"short");
        client.write_all(&data).await.unwrap();
        drop(client);
        let err = FrameCodec::read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn stream_eof_mid_message_is_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0, 2, 0, 0, 0, 9, b'x']).await.unwrap();
        drop(client);
        assert!(FrameCodec::read_message(&mut server).await.is_err());
    }
}
