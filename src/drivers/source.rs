use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::drivers::SkewError;

/// Raw sample layout as delivered by the acquisition layer.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockLayout {
    /// Scan-major: `[a0, b0, a1, b1, ...]`.
    Interleaved(Vec<f64>),
    /// Each channel read into its own buffer.
    PerChannel { a: Vec<f64>, b: Vec<f64> },
}

/// One acquisition chunk for both channels.
#[derive(Clone, Debug)]
pub struct AcquiredBlock {
    pub started_at: SystemTime,
    pub sample_rate_hz: f64,
    pub layout: BlockLayout,
}

impl AcquiredBlock {
    pub fn interleaved(sample_rate_hz: f64, samples: Vec<f64>) -> Self {
        Self {
            started_at: SystemTime::now(),
            sample_rate_hz,
            layout: BlockLayout::Interleaved(samples),
        }
    }
    pub fn per_channel(sample_rate_hz: f64, a: Vec<f64>, b: Vec<f64>) -> Self {
        Self {
            started_at: SystemTime::now(),
            sample_rate_hz,
            layout: BlockLayout::PerChannel { a, b },
        }
    }
    pub fn validate(&self) -> Result<(), SkewError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(SkewError::InvalidSampleRate);
        }
        Ok(())
    }
    /// Samples delivered per channel as (a, b); an odd interleaved tail counts toward `a`.
    pub fn samples_read(&self) -> (usize, usize) {
        match &self.layout {
            BlockLayout::Interleaved(samples) => {
                let b = samples.len() / 2;
                (samples.len() - b, b)
            }
            BlockLayout::PerChannel { a, b } => (a.len(), b.len()),
        }
    }
}

/// Anything that can yield acquisition chunks on demand.
///
/// `Ok(None)` means acquisition has ended. Errors returned here are treated as
/// acquisition failures and end the session.
pub trait ChunkSource {
    fn next_block(&mut self) -> Result<Option<AcquiredBlock>, SkewError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<AcquiredBlock>,
}

impl ManualSource {
    pub fn new(blocks: impl IntoIterator<Item = AcquiredBlock>) -> Self {
        Self {
            queue: blocks.into_iter().collect(),
        }
    }
}

impl ChunkSource for ManualSource {
    fn next_block(&mut self) -> Result<Option<AcquiredBlock>, SkewError> {
        Ok(self.queue.pop_front())
    }
}

/// Parameters of the synthetic tone fed to both channels.
#[derive(Clone, Debug)]
pub struct ToneSettings {
    pub frequency_hz: f64,
    pub amplitude: f64,
    /// Phase of channel A relative to channel B.
    pub offset_deg: f64,
    /// Peak value of uniform noise added independently to each channel.
    pub noise: f64,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 100.0,
            amplitude: 1.0,
            offset_deg: 0.0,
            noise: 0.0,
        }
    }
}

/// Two clock-synchronized sine channels, continuous across chunks.
pub struct SimulatedSource {
    tone: ToneSettings,
    sample_rate_hz: f64,
    chunk_len: usize,
    interleaved: bool,
    realtime: bool,
    remaining: Option<u64>,
    sample_index: u64,
    next_deadline: Option<Instant>,
    rng: StdRng,
}

impl SimulatedSource {
    pub fn new(tone: ToneSettings, sample_rate_hz: f64, chunk_len: usize) -> Self {
        Self {
            tone,
            sample_rate_hz,
            chunk_len,
            interleaved: false,
            realtime: false,
            remaining: None,
            sample_index: 0,
            next_deadline: None,
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }
    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }
    /// Sleep so chunks arrive at `chunk_len / sample_rate` intervals.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
    pub fn limit(mut self, chunks: Option<u64>) -> Self {
        self.remaining = chunks;
        self
    }
    /// Reseed the noise generator; `None` keeps the built-in seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }
    fn sample(&mut self, index: u64, offset_rad: f64) -> f64 {
        let t = index as f64 / self.sample_rate_hz;
        let clean = self.tone.amplitude * (TAU * self.tone.frequency_hz * t + offset_rad).sin();
        if self.tone.noise > 0.0 {
            clean + self.rng.gen_range(-self.tone.noise..=self.tone.noise)
        } else {
            clean
        }
    }
    fn pace(&mut self) {
        let period = Duration::from_secs_f64(self.chunk_len as f64 / self.sample_rate_hz);
        let deadline = self.next_deadline.unwrap_or_else(Instant::now) + period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline);
    }
}

impl ChunkSource for SimulatedSource {
    fn next_block(&mut self) -> Result<Option<AcquiredBlock>, SkewError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        if self.realtime {
            self.pace();
        }
        let offset_rad = self.tone.offset_deg.to_radians();
        let start = self.sample_index;
        let mut a = Vec::with_capacity(self.chunk_len);
        let mut b = Vec::with_capacity(self.chunk_len);
        for i in 0..self.chunk_len as u64 {
            a.push(self.sample(start + i, offset_rad));
            b.push(self.sample(start + i, 0.0));
        }
        self.sample_index += self.chunk_len as u64;
        let block = if self.interleaved {
            let scan = crate::drivers::demux::interleave(&a, &b)?;
            AcquiredBlock::interleaved(self.sample_rate_hz, scan)
        } else {
            AcquiredBlock::per_channel(self.sample_rate_hz, a, b)
        };
        Ok(Some(block))
    }
}
