//! Native messaging framing.
//!
//! Every message on the wire is a 4-byte unsigned length prefix followed by
//! exactly that many bytes of UTF-8 JSON. The prefix byte order is part of
//! the protocol configuration ([`ByteOrder`]), never an accident of the host.

use crate::config::{ByteOrder, NativeMessagingConfig};
use crate::error::{NativeMessagingError, NativeMessagingResult};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Stdin, Stdout};

/// Width of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

impl ByteOrder {
    /// Append `length` to `buf` in this byte order.
    pub fn put_length(self, buf: &mut BytesMut, length: u32) {
        match self {
            Self::Little => buf.put_u32_le(length),
            Self::Big => buf.put_u32(length),
            Self::Native => buf.put_u32_ne(length),
        }
    }

    /// Interpret a length prefix in this byte order.
    pub fn read_length(self, prefix: [u8; LENGTH_PREFIX_LEN]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(prefix),
            Self::Big => u32::from_be_bytes(prefix),
            Self::Native => u32::from_ne_bytes(prefix),
        }
    }
}

/// Length-prefixed JSON channel over a reader/writer pair.
pub struct NativeMessagingProtocol<R, W> {
    reader: R,
    writer: W,
    byte_order: ByteOrder,
    max_message_size: usize,
}

impl NativeMessagingProtocol<Stdin, Stdout> {
    /// Bind the channel to the process's stdin and stdout.
    pub fn stdio(config: &NativeMessagingConfig) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), config)
    }
}

impl<R, W> NativeMessagingProtocol<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a channel over arbitrary streams.
    pub fn new(reader: R, writer: W, config: &NativeMessagingConfig) -> Self {
        Self {
            reader,
            writer,
            byte_order: config.byte_order,
            max_message_size: config.max_message_size,
        }
    }

    /// Read one message.
    ///
    /// Returns `Ok(None)` when the stream closes before any byte of a new
    /// frame arrives: that is how the browser signals it has nothing to send.
    ///
    /// # Errors
    ///
    /// * `MalformedFrame` - truncated prefix, oversize or truncated payload,
    ///   invalid UTF-8 or invalid JSON
    /// * `Io` - the underlying read failed
    pub async fn read_message(&mut self) -> NativeMessagingResult<Option<serde_json::Value>> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_LEN {
            let n = self.reader.read(&mut prefix[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        match filled {
            0 => return Ok(None),
            LENGTH_PREFIX_LEN => {}
            n => {
                return Err(NativeMessagingError::malformed(format!(
                    "Stream closed after {} of {} length prefix bytes",
                    n, LENGTH_PREFIX_LEN
                )))
            }
        }

        let length = self.byte_order.read_length(prefix) as usize;
        tracing::trace!(length, "Read frame length prefix");

        if length > self.max_message_size {
            return Err(NativeMessagingError::malformed(format!(
                "Message length {} exceeds maximum size {}",
                length, self.max_message_size
            )));
        }

        let mut payload = vec![0u8; length];
        self.reader.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                NativeMessagingError::malformed(format!(
                    "Stream closed before {} byte payload was complete",
                    length
                ))
            } else {
                NativeMessagingError::Io(e)
            }
        })?;

        parse_payload(payload).map(Some)
    }

    /// Write one message and flush it.
    ///
    /// # Errors
    ///
    /// * `MalformedFrame` - the encoded message exceeds the size limit
    /// * `Io` / `Json` - serialization or the write failed
    pub async fn write_message(&mut self, message: &serde_json::Value) -> NativeMessagingResult<()> {
        let frame = encode_frame(message, self.byte_order, self.max_message_size)?;

        self.writer.write_all(&frame).await?;
        // The reader on the other end blocks until the whole frame arrives
        self.writer.flush().await?;

        tracing::trace!(length = frame.len() - LENGTH_PREFIX_LEN, "Wrote frame");
        Ok(())
    }

    /// Give back the underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Encode `message` as one frame.
///
/// # Errors
///
/// Returns `MalformedFrame` if the encoded JSON is longer than `max_size`.
pub fn encode_frame(
    message: &serde_json::Value,
    byte_order: ByteOrder,
    max_size: usize,
) -> NativeMessagingResult<BytesMut> {
    let payload = serde_json::to_vec(message)?;

    if payload.len() > max_size {
        return Err(NativeMessagingError::malformed(format!(
            "Outgoing message length {} exceeds maximum size {}",
            payload.len(),
            max_size
        )));
    }
    let length = u32::try_from(payload.len()).map_err(|_| {
        NativeMessagingError::malformed(format!(
            "Outgoing message length {} does not fit the length prefix",
            payload.len()
        ))
    })?;

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    byte_order.put_length(&mut frame, length);
    frame.put_slice(&payload);
    Ok(frame)
}

/// Decode a single complete frame held in memory.
///
/// Trailing bytes after the declared payload are ignored.
///
/// # Errors
///
/// Returns `MalformedFrame` if the buffer is shorter than the prefix or the
/// declared payload, or if the payload is not UTF-8 JSON.
pub fn decode_frame(data: &[u8], byte_order: ByteOrder) -> NativeMessagingResult<serde_json::Value> {
    let (prefix, rest) = data
        .split_first_chunk::<LENGTH_PREFIX_LEN>()
        .ok_or_else(|| NativeMessagingError::malformed("Data too short for length header"))?;

    let length = byte_order.read_length(*prefix) as usize;
    let payload = rest
        .get(..length)
        .ok_or_else(|| NativeMessagingError::malformed("Data too short for message payload"))?;

    parse_payload(payload.to_vec())
}

fn parse_payload(payload: Vec<u8>) -> NativeMessagingResult<serde_json::Value> {
    let text = String::from_utf8(payload)
        .map_err(|e| NativeMessagingError::malformed(format!("Invalid UTF-8 in message: {}", e)))?;

    serde_json::from_str(&text)
        .map_err(|e| NativeMessagingError::malformed(format!("Invalid JSON in message: {}", e)))
}
