use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{DecodeError, EncodeError};
use crate::message::{ControlItemCode, MessageType};

/// Header word: type (3 bits) + length (13 bits), little-endian.
pub const HEADER_SIZE: usize = 2;

/// Header plus the item code or sequence field.
pub const MIN_FRAME_LEN: usize = HEADER_SIZE + 2;

/// Mask for the length part of the header word.
pub const LENGTH_MASK: u16 = 0x1FFF;

/// Largest control-item frame whose length fits the header without wrapping.
pub const MAX_CONTROL_FRAME_LEN: usize = LENGTH_MASK as usize;

const TYPE_SHIFT: u32 = 13;

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Type from the top 3 header bits.
    pub msg_type: MessageType,
    /// Item code of a control frame, `ControlItemCode::None` for data frames.
    pub item_code: ControlItemCode,
    /// Sequence number of a data frame.
    pub sequence: Option<u16>,
    /// Everything after the item code / sequence field.
    pub body: Bytes,
    /// Length field as reported by the header. Diagnostic only; it wraps for
    /// frames longer than 8191 bytes and is never used for slicing.
    pub reported_length: u16,
}

impl Frame {
    /// The actual size of this frame on the wire.
    pub fn wire_len(&self) -> usize {
        MIN_FRAME_LEN + self.body.len()
    }

    /// Whether the header's length field agrees with the real size.
    pub fn length_consistent(&self) -> bool {
        usize::from(self.reported_length) == self.wire_len()
    }
}

/// Encode a control-item frame.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬─────────────┬─────────────────┐
/// │ Header (2B LE)       │ Item code   │ Payload          │
/// │ type<<13 | length    │ (2B LE)     │                  │
/// └──────────────────────┴─────────────┴─────────────────┘
/// ```
///
/// Frames longer than [`MAX_CONTROL_FRAME_LEN`] are rejected before anything
/// is written.
pub fn encode_control_item(
    msg_type: MessageType,
    item_code: ControlItemCode,
    payload: &[u8],
) -> Result<Bytes, EncodeError> {
    if msg_type.is_data_item() {
        return Err(EncodeError::UnexpectedType(msg_type));
    }

    let len = MIN_FRAME_LEN + payload.len();
    if len > MAX_CONTROL_FRAME_LEN {
        return Err(EncodeError::FrameTooLarge {
            len,
            max: MAX_CONTROL_FRAME_LEN,
        });
    }

    let mut dst = BytesMut::with_capacity(len);
    dst.put_u16_le(header_word(msg_type, len));
    dst.put_u16_le(item_code.to_u16());
    dst.put_slice(payload);
    Ok(dst.freeze())
}

/// Encode a data-item frame. The first 2 payload bytes are the sequence number.
///
/// Oversized payloads are not rejected: the length field wraps modulo 8192.
pub fn encode_data_item(msg_type: MessageType, payload: &[u8]) -> Result<Bytes, EncodeError> {
    if !msg_type.is_data_item() {
        return Err(EncodeError::UnexpectedType(msg_type));
    }

    let len = HEADER_SIZE + payload.len();
    let mut dst = BytesMut::with_capacity(len);
    dst.put_u16_le(header_word(msg_type, len));
    dst.put_slice(payload);
    Ok(dst.freeze())
}

/// Encode a data-item frame from a sequence number and raw sample bytes.
pub fn encode_data_item_with_sequence(
    msg_type: MessageType,
    sequence: u16,
    samples: &[u8],
) -> Result<Bytes, EncodeError> {
    let mut payload = BytesMut::with_capacity(2 + samples.len());
    payload.put_u16_le(sequence);
    payload.put_slice(samples);
    encode_data_item(msg_type, &payload)
}

/// Decode one frame. The buffer must hold exactly one message.
///
/// Slicing always follows the buffer's real length; the header's length field
/// is only recorded in [`Frame::reported_length`].
pub fn decode(buf: Bytes) -> Result<Frame, DecodeError> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::TooShort {
            needed: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let word = u16::from_le_bytes([buf[0], buf[1]]);
    let msg_type = MessageType::from_bits((word >> TYPE_SHIFT) as u8);
    let reported_length = word & LENGTH_MASK;

    // Every type carries a 2-byte item code or sequence field.
    if buf.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort {
            needed: MIN_FRAME_LEN,
            actual: buf.len(),
        });
    }

    if usize::from(reported_length) != buf.len() {
        debug!(
            %msg_type,
            reported_length,
            actual = buf.len(),
            "header length disagrees with buffer length"
        );
    }

    let field = u16::from_le_bytes([buf[2], buf[3]]);
    let body = buf.slice(MIN_FRAME_LEN..);

    let (item_code, sequence) = if msg_type.is_data_item() {
        (ControlItemCode::None, Some(field))
    } else {
        (ControlItemCode::from_u16(field), None)
    };

    Ok(Frame {
        msg_type,
        item_code,
        sequence,
        body,
        reported_length,
    })
}

/// Decode one frame from a borrowed buffer (copies the bytes).
pub fn decode_slice(buf: &[u8]) -> Result<Frame, DecodeError> {
    decode(Bytes::copy_from_slice(buf))
}

fn header_word(msg_type: MessageType, len: usize) -> u16 {
    let length = (len % (usize::from(LENGTH_MASK) + 1)) as u16;
    (u16::from(msg_type.bits()) << TYPE_SHIFT) | length
}
