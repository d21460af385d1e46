use crate::drivers::demux::deinterleave_into;
use crate::drivers::source::{AcquiredBlock, BlockLayout};
use crate::drivers::SkewError;

/// One channel's samples for a single chunk, tagged with its sample rate.
#[derive(Clone, Copy, Debug)]
pub struct SampleChunk<'a> {
    pub sample_rate_hz: f64,
    pub samples: &'a [f64],
}

impl SampleChunk<'_> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz
    }
}

/// Both channels of a validated chunk.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPair<'a> {
    pub a: SampleChunk<'a>,
    pub b: SampleChunk<'a>,
}

impl ChunkPair<'_> {
    pub fn sample_rate_hz(&self) -> f64 {
        self.a.sample_rate_hz
    }
    pub fn chunk_len(&self) -> usize {
        self.a.len()
    }
}

/// Per-channel scratch sized once for the session's chunk length.
///
/// Interleaved blocks are split into the scratch buffers; per-channel blocks are
/// borrowed as-is. Either way the returned pair has exactly `chunk_len` samples
/// per channel at the session's sample rate.
pub struct ChunkBuffers {
    a: Vec<f64>,
    b: Vec<f64>,
    sample_rate_hz: f64,
    chunk_len: usize,
}

impl ChunkBuffers {
    pub fn new(sample_rate_hz: f64, chunk_len: usize) -> Result<Self, SkewError> {
        if !(sample_rate_hz > 0.0) {
            return Err(SkewError::InvalidSampleRate);
        }
        if chunk_len == 0 {
            return Err(SkewError::InvalidChunkLength);
        }
        Ok(Self {
            a: vec![0.0; chunk_len],
            b: vec![0.0; chunk_len],
            sample_rate_hz,
            chunk_len,
        })
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }
    pub fn load<'a>(&'a mut self, block: &'a AcquiredBlock) -> Result<ChunkPair<'a>, SkewError> {
        block.validate()?;
        if block.sample_rate_hz != self.sample_rate_hz {
            return Err(SkewError::SampleRateMismatch {
                expected: self.sample_rate_hz,
                actual: block.sample_rate_hz,
            });
        }
        let (a, b) = match &block.layout {
            BlockLayout::Interleaved(scan) => {
                deinterleave_into(scan, &mut self.a, &mut self.b)?;
                (self.a.as_slice(), self.b.as_slice())
            }
            BlockLayout::PerChannel { a, b } => {
                for channel in [a, b] {
                    if channel.len() != self.chunk_len {
                        return Err(SkewError::ChannelLengthMismatch {
                            expected: self.chunk_len,
                            actual: channel.len(),
                        });
                    }
                }
                (a.as_slice(), b.as_slice())
            }
        };
        Ok(ChunkPair {
            a: SampleChunk {
                sample_rate_hz: self.sample_rate_hz,
                samples: a,
            },
            b: SampleChunk {
                sample_rate_hz: self.sample_rate_hz,
                samples: b,
            },
        })
    }
}
