//! Wire codec for the NetSDR receiver protocol.
//!
//! Every message starts with a 16-bit little-endian header word:
//! - the top 3 bits carry the [`MessageType`]
//! - the low 13 bits carry the total frame length (header included)
//!
//! Control-item frames follow the header with a 2-byte item code, data-item
//! frames with a 2-byte sequence number. The length field wraps for frames
//! longer than 8191 bytes, so it is never used to find frame boundaries: one
//! delivered buffer is one frame.

pub mod codec;
pub mod error;
pub mod message;
pub mod samples;

pub use codec::{
    decode, decode_slice, encode_control_item, encode_data_item, encode_data_item_with_sequence,
    Frame, HEADER_SIZE, LENGTH_MASK, MAX_CONTROL_FRAME_LEN, MIN_FRAME_LEN,
};
pub use error::{DecodeError, EncodeError};
pub use message::{ControlItemCode, MessageType};
pub use samples::{decode_samples, Samples, MAX_SAMPLE_BITS};
