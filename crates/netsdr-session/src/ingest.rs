//! Sequencing and sample decoding for data-item streams.

use netsdr_codec::{decode_samples, DecodeError, Frame, MessageType};
use tracing::{debug, warn};

/// A break in a stream's sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGap {
    pub expected: u16,
    pub actual: u16,
}

impl SequenceGap {
    /// Frames skipped between `expected` and `actual`, modulo 65536.
    pub fn missing(&self) -> u16 {
        self.actual.wrapping_sub(self.expected)
    }
}

/// Result of decoding one frame's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Samples(Vec<i32>),
    DecodeFailed(DecodeError),
}

/// One notification per processed data frame, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamNotification {
    pub stream: MessageType,
    pub sequence: u16,
    /// Set when the sequence did not follow the previous frame's.
    pub gap: Option<SequenceGap>,
    pub outcome: StreamOutcome,
}

impl StreamNotification {
    /// Decoded samples, if the body decoded.
    pub fn samples(&self) -> Option<&[i32]> {
        match &self.outcome {
            StreamOutcome::Samples(samples) => Some(samples),
            StreamOutcome::DecodeFailed(_) => None,
        }
    }

    /// The decode error, if the body did not decode.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match &self.outcome {
            StreamOutcome::Samples(_) => None,
            StreamOutcome::DecodeFailed(err) => Some(err),
        }
    }
}

/// Per-stream counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames: u64,
    pub samples: u64,
    pub gaps: u64,
    /// Frames discarded before ingest because its queue was full.
    pub dropped: u64,
    pub decode_failures: u64,
}

#[derive(Debug, Clone)]
struct StreamState {
    sample_bits: u16,
    last_sequence: Option<u16>,
    stats: StreamStats,
}

/// Demultiplexes data-item frames into the four logical streams.
#[derive(Debug, Clone)]
pub struct StreamIngest {
    streams: [StreamState; 4],
}

impl StreamIngest {
    /// Create with a sample width per stream (DataItem0..DataItem3).
    pub fn new(sample_bits: [u16; 4]) -> Self {
        Self {
            streams: sample_bits.map(|sample_bits| StreamState {
                sample_bits,
                last_sequence: None,
                stats: StreamStats::default(),
            }),
        }
    }

    pub fn sample_width(&self, stream: MessageType) -> Option<u16> {
        self.state(stream).map(|state| state.sample_bits)
    }

    /// Change a stream's sample width for subsequent frames.
    ///
    /// Returns false when `stream` is not a data-item type. The width is not
    /// validated here; a bad width shows up as per-frame decode failures.
    pub fn set_sample_width(&mut self, stream: MessageType, bits: u16) -> bool {
        match self.state_mut(stream) {
            Some(state) => {
                debug!(%stream, bits, "sample width changed");
                state.sample_bits = bits;
                true
            }
            None => false,
        }
    }

    pub fn last_sequence(&self, stream: MessageType) -> Option<u16> {
        self.state(stream).and_then(|state| state.last_sequence)
    }

    pub fn stats(&self, stream: MessageType) -> Option<StreamStats> {
        self.state(stream).map(|state| state.stats)
    }

    /// Forget a stream's sequence baseline; the next frame starts fresh.
    pub fn reset(&mut self, stream: MessageType) {
        if let Some(state) = self.state_mut(stream) {
            state.last_sequence = None;
        }
    }

    /// Process one data-item frame.
    ///
    /// Returns `None` for frames that are not data items. A sequence gap is
    /// reported alongside the batch and the observed sequence becomes the new
    /// baseline. Decode failures are reported but still advance the sequence.
    pub fn on_frame(&mut self, frame: &Frame) -> Option<StreamNotification> {
        let stream = frame.msg_type;
        let sequence = frame.sequence?;
        let state = self.state_mut(stream)?;

        let gap = state.last_sequence.and_then(|last| {
            let expected = last.wrapping_add(1);
            (expected != sequence).then_some(SequenceGap {
                expected,
                actual: sequence,
            })
        });
        state.last_sequence = Some(sequence);
        state.stats.frames += 1;

        if let Some(gap) = gap {
            state.stats.gaps += 1;
            warn!(
                %stream,
                expected = gap.expected,
                actual = gap.actual,
                missing = gap.missing(),
                "sequence gap"
            );
        }

        let outcome = match decode_samples(state.sample_bits, &frame.body) {
            Ok(samples) => {
                let samples: Vec<i32> = samples.collect();
                state.stats.samples += samples.len() as u64;
                StreamOutcome::Samples(samples)
            }
            Err(err) => {
                state.stats.decode_failures += 1;
                warn!(%stream, sequence, %err, "sample decode failed");
                StreamOutcome::DecodeFailed(err)
            }
        };

        Some(StreamNotification {
            stream,
            sequence,
            gap,
            outcome,
        })
    }

    fn state(&self, stream: MessageType) -> Option<&StreamState> {
        stream
            .data_stream_index()
            .map(|index| &self.streams[index])
    }

    fn state_mut(&mut self, stream: MessageType) -> Option<&mut StreamState> {
        stream
            .data_stream_index()
            .map(|index| &mut self.streams[index])
    }
}

#[cfg(test)]
mod tests {
    use netsdr_codec::{decode, encode_control_item, encode_data_item_with_sequence, ControlItemCode};

    use super::*;

    fn data(stream: MessageType, sequence: u16, body: &[u8]) -> Frame {
        decode(encode_data_item_with_sequence(stream, sequence, body).unwrap()).unwrap()
    }

    #[test]
    fn decodes_batches_in_order() {
        let mut ingest = StreamIngest::new([16; 4]);

        let first = ingest
            .on_frame(&data(MessageType::DataItem0, 1, &[1, 0, 2, 0]))
            .unwrap();
        assert_eq!(first.stream, MessageType::DataItem0);
        assert_eq!(first.sequence, 1);
        assert_eq!(first.gap, None);
        assert_eq!(first.samples(), Some(&[1, 2][..]));

        let second = ingest
            .on_frame(&data(MessageType::DataItem0, 2, &[3, 0]))
            .unwrap();
        assert_eq!(second.gap, None);
        assert_eq!(second.samples(), Some(&[3][..]));
        assert_eq!(ingest.last_sequence(MessageType::DataItem0), Some(2));
    }

    #[test]
    fn gap_is_reported_and_ingest_continues() {
        let mut ingest = StreamIngest::new([16; 4]);
        let mut notifications = Vec::new();
        for sequence in [1u16, 2, 4, 5] {
            notifications.push(
                ingest
                    .on_frame(&data(MessageType::DataItem0, sequence, &[9, 0]))
                    .unwrap(),
            );
        }

        assert_eq!(notifications[0].gap, None);
        assert_eq!(notifications[1].gap, None);
        assert_eq!(
            notifications[2].gap,
            Some(SequenceGap {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(notifications[2].samples(), Some(&[9][..]));
        assert_eq!(notifications[3].gap, None);

        let stats = ingest.stats(MessageType::DataItem0).unwrap();
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.gaps, 1);
        assert_eq!(stats.samples, 4);
    }

    #[test]
    fn sequence_wraps_without_gap() {
        let mut ingest = StreamIngest::new([16; 4]);
        ingest
            .on_frame(&data(MessageType::DataItem1, u16::MAX, &[]))
            .unwrap();
        let wrapped = ingest
            .on_frame(&data(MessageType::DataItem1, 0, &[]))
            .unwrap();
        assert_eq!(wrapped.gap, None);
    }

    #[test]
    fn backwards_sequence_is_a_gap() {
        let mut ingest = StreamIngest::new([16; 4]);
        ingest.on_frame(&data(MessageType::DataItem0, 10, &[])).unwrap();
        let back = ingest.on_frame(&data(MessageType::DataItem0, 5, &[])).unwrap();
        let gap = back.gap.unwrap();
        assert_eq!((gap.expected, gap.actual), (11, 5));
        assert_eq!(gap.missing(), 5u16.wrapping_sub(11));
        assert_eq!(ingest.last_sequence(MessageType::DataItem0), Some(5));
    }

    #[test]
    fn streams_are_tracked_independently() {
        let mut ingest = StreamIngest::new([16; 4]);
        ingest.on_frame(&data(MessageType::DataItem0, 1, &[])).unwrap();
        let other = ingest.on_frame(&data(MessageType::DataItem2, 7, &[])).unwrap();
        assert_eq!(other.gap, None);
        let back = ingest.on_frame(&data(MessageType::DataItem0, 2, &[])).unwrap();
        assert_eq!(back.gap, None);
    }

    #[test]
    fn decode_failure_is_reported_and_sequence_still_tracked() {
        let mut ingest = StreamIngest::new([16; 4]);
        ingest.on_frame(&data(MessageType::DataItem0, 1, &[1, 0])).unwrap();

        let bad = ingest
            .on_frame(&data(MessageType::DataItem0, 2, &[1, 0, 2]))
            .unwrap();
        assert_eq!(bad.gap, None);
        assert_eq!(
            bad.decode_error(),
            Some(&DecodeError::MisalignedBody {
                len: 3,
                width_bytes: 2
            })
        );

        let next = ingest.on_frame(&data(MessageType::DataItem0, 3, &[5, 0])).unwrap();
        assert_eq!(next.gap, None);
        assert_eq!(next.samples(), Some(&[5][..]));
        assert_eq!(ingest.stats(MessageType::DataItem0).unwrap().decode_failures, 1);
    }

    #[test]
    fn sample_width_follows_configuration() {
        let mut ingest = StreamIngest::new([16, 24, 16, 16]);
        let frame = data(MessageType::DataItem1, 0, &[1, 0, 0, 2, 0, 0]);
        assert_eq!(ingest.on_frame(&frame).unwrap().samples(), Some(&[1, 2][..]));

        assert!(ingest.set_sample_width(MessageType::DataItem1, 64));
        let frame = data(MessageType::DataItem1, 1, &[1, 0]);
        assert_eq!(
            ingest.on_frame(&frame).unwrap().decode_error(),
            Some(&DecodeError::SampleWidthOutOfRange(64))
        );

        assert!(!ingest.set_sample_width(MessageType::Ack, 8));
        assert_eq!(ingest.sample_width(MessageType::DataItem1), Some(64));
    }

    #[test]
    fn reset_forgets_baseline() {
        let mut ingest = StreamIngest::new([16; 4]);
        ingest.on_frame(&data(MessageType::DataItem3, 100, &[])).unwrap();
        ingest.reset(MessageType::DataItem3);
        assert_eq!(ingest.last_sequence(MessageType::DataItem3), None);

        let fresh = ingest.on_frame(&data(MessageType::DataItem3, 1, &[])).unwrap();
        assert_eq!(fresh.gap, None);
    }

    #[test]
    fn control_frames_are_not_ingested() {
        let mut ingest = StreamIngest::new([16; 4]);
        let ack = decode(
            encode_control_item(MessageType::Ack, ControlItemCode::ReceiverState, b"").unwrap(),
        )
        .unwrap();
        assert!(ingest.on_frame(&ack).is_none());
    }
}
