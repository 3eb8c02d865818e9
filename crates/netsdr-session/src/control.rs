use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use netsdr_codec::ControlItemCode;

use crate::error::{Result, SessionError};

const RECEIVER_STATE_RUN: u8 = 0x02;
const RECEIVER_STATE_IDLE: u8 = 0x01;
const DATA_TYPE_COMPLEX: u8 = 0x80;

/// Largest frequency the 5-byte field can carry.
pub const MAX_FREQUENCY_HZ: u64 = (1 << 40) - 1;

/// Capture mode byte of the receiver-state item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    Contiguous16,
    Contiguous24,
    Fifo16,
    HardwareTriggered,
}

impl CaptureMode {
    pub const ALL: [CaptureMode; 4] = [
        CaptureMode::Contiguous16,
        CaptureMode::Contiguous24,
        CaptureMode::Fifo16,
        CaptureMode::HardwareTriggered,
    ];

    pub fn code(self) -> u8 {
        match self {
            CaptureMode::Contiguous16 => 0x00,
            CaptureMode::Contiguous24 => 0x80,
            CaptureMode::Fifo16 => 0x01,
            CaptureMode::HardwareTriggered => 0x83,
        }
    }

    /// Width of the samples the receiver streams in this mode.
    pub fn sample_bits(self) -> u16 {
        match self {
            CaptureMode::Contiguous24 => 24,
            _ => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CaptureMode::Contiguous16 => "contiguous16",
            CaptureMode::Contiguous24 => "contiguous24",
            CaptureMode::Fifo16 => "fifo16",
            CaptureMode::HardwareTriggered => "hw-triggered",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaptureMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SessionError::InvalidCommand(format!("unknown capture mode: {s}")))
    }
}

/// A control item and its payload, ready to hand to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverCommand {
    item_code: ControlItemCode,
    payload: Bytes,
}

impl ReceiverCommand {
    pub fn new(item_code: ControlItemCode, payload: impl Into<Bytes>) -> Self {
        Self {
            item_code,
            payload: payload.into(),
        }
    }

    /// Start streaming complex I/Q samples.
    pub fn start_iq(mode: CaptureMode) -> Self {
        Self::new(
            ControlItemCode::ReceiverState,
            vec![DATA_TYPE_COMPLEX, RECEIVER_STATE_RUN, mode.code(), 0x01],
        )
    }

    /// Stop streaming.
    pub fn stop_iq() -> Self {
        Self::new(
            ControlItemCode::ReceiverState,
            vec![0x00, RECEIVER_STATE_IDLE, 0x00, 0x00],
        )
    }

    /// Tune `channel` to `hz`. The frequency is sent as 5 little-endian bytes.
    pub fn set_frequency(channel: u8, hz: u64) -> Result<Self> {
        if hz > MAX_FREQUENCY_HZ {
            return Err(SessionError::InvalidCommand(format!(
                "frequency {hz} Hz exceeds {MAX_FREQUENCY_HZ} Hz"
            )));
        }

        let mut payload = Vec::with_capacity(6);
        payload.push(channel);
        payload.extend_from_slice(&hz.to_le_bytes()[..5]);
        Ok(Self::new(ControlItemCode::ReceiverFrequency, payload))
    }

    pub fn item_code(&self) -> ControlItemCode {
        self.item_code
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_parts(self) -> (ControlItemCode, Bytes) {
        (self.item_code, self.payload)
    }
}
