//! Sample unpacking for data-item bodies.

use std::iter::FusedIterator;
use std::slice::ChunksExact;

use crate::error::DecodeError;

/// Widest supported sample.
pub const MAX_SAMPLE_BITS: u16 = 32;

/// Split `body` into `width_bits`-wide little-endian samples.
///
/// Each chunk is zero-extended into the low bytes of a 32-bit word and read as
/// a little-endian `i32`. Narrow samples are never sign-extended, so only a
/// full 32-bit sample can come out negative.
pub fn decode_samples(width_bits: u16, body: &[u8]) -> Result<Samples<'_>, DecodeError> {
    if width_bits == 0 || width_bits % 8 != 0 || width_bits > MAX_SAMPLE_BITS {
        return Err(DecodeError::SampleWidthOutOfRange(width_bits));
    }

    let width_bytes = usize::from(width_bits / 8);
    if body.len() % width_bytes != 0 {
        return Err(DecodeError::MisalignedBody {
            len: body.len(),
            width_bytes,
        });
    }

    Ok(Samples {
        chunks: body.chunks_exact(width_bytes),
    })
}

/// Iterator over decoded samples. Clone it to walk the same samples again.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Samples<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.chunks.next().map(widen)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Samples<'_> {}

impl FusedIterator for Samples<'_> {}

fn widen(chunk: &[u8]) -> i32 {
    let mut word = [0u8; 4];
    word[..chunk.len()].copy_from_slice(chunk);
    i32::from_le_bytes(word)
}
