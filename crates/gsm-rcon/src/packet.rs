// ── Source RCON packet framing ──
//
// Layout (all integers little-endian):
//
//   i32 size | i32 id | i32 type | body bytes | 0x00 | 0x00
//
// `size` counts everything after itself, so the smallest legal packet
// (empty body) has size 10.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Id the server puts in an auth response when the password is wrong.
pub const AUTH_FAILED_ID: i32 = -1;

/// Largest packet a client may send.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Largest packet accepted from a server. Some servers ignore the 4096
/// limit for long listings.
pub const MAX_INBOUND_SIZE: usize = 64 * 1024;

const HEADER_SIZE: usize = 8;
const MIN_SIZE: usize = HEADER_SIZE + 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Largest body that fits in an outbound packet.
    pub const fn max_body_len() -> usize {
        MAX_PACKET_SIZE - MIN_SIZE - 4
    }

    pub fn encode(&self) -> Bytes {
        let body = self.body.as_bytes();
        let mut buf = BytesMut::with_capacity(4 + MIN_SIZE + body.len());
        buf.put_i32_le(size_field(body.len()));
        buf.put_i32_le(self.id);
        buf.put_i32_le(self.kind);
        buf.put_slice(body);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.freeze()
    }

    /// Decode the part of a packet that follows the size field.
    pub fn decode(mut frame: Bytes) -> Result<Self, Error> {
        if frame.len() < MIN_SIZE {
            return Err(Error::Malformed(format!(
                "frame of {} bytes is shorter than the {MIN_SIZE}-byte minimum",
                frame.len()
            )));
        }
        let id = frame.get_i32_le();
        let kind = frame.get_i32_le();
        let end = frame.iter().position(|b| *b == 0).unwrap_or(frame.len());
        let body = String::from_utf8_lossy(&frame[..end]).into_owned();
        Ok(Self { id, kind, body })
    }

    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Error>
    where
        R: AsyncRead + Unpin,
    {
        let size = match reader.read_i32_le().await {
            Ok(size) => size,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(Error::Closed),
            Err(e) => return Err(e.into()),
        };
        let size = usize::try_from(size)
            .map_err(|_| Error::Malformed(format!("negative packet size {size}")))?;
        if !(MIN_SIZE..=MAX_INBOUND_SIZE).contains(&size) {
            return Err(Error::Malformed(format!("packet size {size} out of range")));
        }

        let mut frame = vec![0u8; size];
        reader.read_exact(&mut frame).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Closed
            } else {
                e.into()
            }
        })?;
        Self::decode(Bytes::from(frame))
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::as_conversions)]
fn size_field(body_len: usize) -> i32 {
    // Bodies are bounded by `MAX_INBOUND_SIZE` long before i32 overflows.
    (MIN_SIZE + body_len) as i32
}
