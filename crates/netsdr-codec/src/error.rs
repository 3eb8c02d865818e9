use crate::message::MessageType;

/// Errors raised while building a frame. Nothing is produced when these fire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The frame would not fit the 13-bit length field.
    #[error("frame too large ({len} bytes, max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// The message type does not belong to the requested frame class.
    #[error("message type {0} cannot be encoded in this frame class")]
    UnexpectedType(MessageType),
}

/// Errors raised while reading a frame or unpacking its samples.
///
/// These are per-frame: the offending frame is dropped, the stream goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ends before the fields its header implies.
    #[error("frame too short ({actual} bytes, need at least {needed})")]
    TooShort { needed: usize, actual: usize },

    /// Sample width is zero, not byte aligned, or wider than 32 bits.
    #[error("sample width {0} bits out of range (multiple of 8, at most 32)")]
    SampleWidthOutOfRange(u16),

    /// The body does not split into whole samples.
    #[error("body of {len} bytes is not a multiple of the {width_bytes}-byte sample width")]
    MisalignedBody { len: usize, width_bytes: usize },
}
