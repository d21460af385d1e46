// src/drivers/mod.rs
// Per-chunk analysis: acquisition boundary, demux, transform, bin selection, skew.
pub mod buffer;
pub mod demux;
pub mod error;
pub mod fft;
pub mod peak;
pub mod pipeline;
pub mod report;
pub mod skew;
pub mod source;
// Re-exported for callers outside the module
pub use buffer::{ChunkBuffers, ChunkPair, SampleChunk};
pub use demux::{deinterleave, deinterleave_into, interleave};
pub use error::{ErrorKind, SkewError};
pub use fft::{BinMeasurement, SpectralAnalyzer, Spectrum};
pub use peak::{select_dominant_bin, BinSelector, DominantBin, SelectionStrategy};
pub use pipeline::{ChannelSamples, ChunkAnalysis, Measurement, PipelineSettings, SkewPipeline};
pub use report::{bin_reports, BinReport};
pub use skew::{
    estimate_phase_skew, normalize_phase_difference, PhaseSkewResult, SkewTimeBasis,
};
pub use source::{
    AcquiredBlock, BlockLayout, ChunkSource, ManualSource, SimulatedSource, ToneSettings,
};
