use std::time::SystemTime;

use serde::Serialize;

use crate::drivers::buffer::{ChunkBuffers, ChunkPair};
use crate::drivers::error::SkewError;
use crate::drivers::fft::SpectralAnalyzer;
use crate::drivers::peak::{BinSelector, DominantBin, SelectionStrategy};
use crate::drivers::report::{bin_reports, BinReport};
use crate::drivers::skew::{estimate_phase_skew, PhaseSkewResult, SkewTimeBasis};
use crate::drivers::source::AcquiredBlock;

/// Fixed parameters for every chunk of a session.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub sample_rate_hz: f64,
    pub chunk_len: usize,
    pub strategy: SelectionStrategy,
    pub min_magnitude: Option<f64>,
    pub time_basis: SkewTimeBasis,
    /// Build per-bin records for each chunk.
    pub emit_reports: bool,
    /// Copy both channels' samples into the result.
    pub retain_samples: bool,
}

impl PipelineSettings {
    pub fn new(sample_rate_hz: f64, chunk_len: usize) -> Self {
        Self {
            sample_rate_hz,
            chunk_len,
            strategy: SelectionStrategy::default(),
            min_magnitude: None,
            time_basis: SkewTimeBasis::default(),
            emit_reports: false,
            retain_samples: false,
        }
    }
}

/// What a chunk yielded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Measurement {
    Skew(PhaseSkewResult),
    /// The dominant bin is DC: nothing periodic was found.
    NoSignal,
    /// The candidate bin (if any) is under the magnitude floor on a channel.
    BelowFloor { candidate: Option<DominantBin> },
}

impl Measurement {
    pub fn skew(&self) -> Option<&PhaseSkewResult> {
        match self {
            Measurement::Skew(result) => Some(result),
            _ => None,
        }
    }
}

/// Both channels of a chunk, kept when `retain_samples` is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelSamples {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct ChunkAnalysis {
    /// Zero-based position of the chunk in the session.
    pub sequence: u64,
    pub started_at: SystemTime,
    pub sample_rate_hz: f64,
    pub dominant: Option<DominantBin>,
    pub measurement: Measurement,
    pub reports: Vec<BinReport>,
    pub samples: Option<ChannelSamples>,
}

/// Demultiplex, transform, select, estimate: one synchronous pass per chunk.
///
/// Scratch buffers and transform plans are sized once from the settings and
/// reused, so a pipeline must process one chunk at a time.
pub struct SkewPipeline {
    settings: PipelineSettings,
    buffers: ChunkBuffers,
    analyzer: SpectralAnalyzer,
    selector: BinSelector,
    sequence: u64,
}

impl SkewPipeline {
    pub fn new(settings: PipelineSettings) -> Result<Self, SkewError> {
        let buffers = ChunkBuffers::new(settings.sample_rate_hz, settings.chunk_len)?;
        let analyzer = SpectralAnalyzer::with_len(settings.chunk_len)?;
        let selector = BinSelector::new(settings.strategy, settings.min_magnitude)?;
        Ok(Self {
            settings,
            buffers,
            analyzer,
            selector,
            sequence: 0,
        })
    }
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
    /// Analyze one block. A failed block still consumes a sequence number.
    pub fn process(&mut self, block: &AcquiredBlock) -> Result<ChunkAnalysis, SkewError> {
        let sequence = self.sequence;
        self.sequence += 1;
        let pair = self.buffers.load(block)?;
        let mut analysis = analyze_pair(
            &mut self.analyzer,
            &self.selector,
            &self.settings,
            pair,
        )?;
        analysis.sequence = sequence;
        analysis.started_at = block.started_at;
        Ok(analysis)
    }
}

fn analyze_pair(
    analyzer: &mut SpectralAnalyzer,
    selector: &BinSelector,
    settings: &PipelineSettings,
    pair: ChunkPair<'_>,
) -> Result<ChunkAnalysis, SkewError> {
    let rate = pair.sample_rate_hz();
    let spectrum_a = analyzer.analyze(pair.a.samples, rate)?;
    let spectrum_b = analyzer.analyze(pair.b.samples, rate)?;
    let dominant = selector.select(&spectrum_a, &spectrum_b)?;
    let measurement = match dominant {
        None => Measurement::BelowFloor { candidate: None },
        Some(bin) if !selector.accepts(&bin) => Measurement::BelowFloor {
            candidate: Some(bin),
        },
        Some(bin) => {
            let a = spectrum_a.bin(bin.index).unwrap_or_default();
            let b = spectrum_b.bin(bin.index).unwrap_or_default();
            match estimate_phase_skew(a, b, bin.frequency_hz, settings.time_basis) {
                Ok(result) => Measurement::Skew(result),
                Err(SkewError::UndefinedMeasurement { .. }) => Measurement::NoSignal,
                Err(other) => return Err(other),
            }
        }
    };
    let reports = if settings.emit_reports {
        bin_reports(&spectrum_a, &spectrum_b)?
    } else {
        Vec::new()
    };
    let samples = settings.retain_samples.then(|| ChannelSamples {
        a: pair.a.samples.to_vec(),
        b: pair.b.samples.to_vec(),
    });
    Ok(ChunkAnalysis {
        sequence: 0,
        started_at: SystemTime::now(),
        sample_rate_hz: rate,
        dominant,
        measurement,
        reports,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::demux::interleave;
    use std::f64::consts::TAU;
    const FS: f64 = 10_000.0;
    const N: usize = 1000;
    fn tone(freq: f64, offset_deg: f64) -> Vec<f64> {
        (0..N)
            .map(|i| (TAU * freq * i as f64 / FS + offset_deg.to_radians()).sin())
            .collect()
    }
    fn run(settings: PipelineSettings, block: AcquiredBlock) -> ChunkAnalysis {
        SkewPipeline::new(settings).unwrap().process(&block).unwrap()
    }
    #[test]
    fn identical_channels_report_zero_skew() {
        let block = AcquiredBlock::per_channel(FS, tone(100.0, 0.0), tone(100.0, 0.0));
        let analysis = run(PipelineSettings::new(FS, N), block);
        assert_eq!(analysis.dominant.unwrap().index, 10);
        let skew = analysis.measurement.skew().unwrap();
        assert!((skew.frequency_hz - 100.0).abs() < 1e-9);
        assert!(skew.phase_skew_deg.abs() < 1e-6);
        assert!(skew.phase_skew_sec.abs() < 1e-10);
    }
    #[test]
    fn off_bin_tone_selects_nearest_bin() {
        let block = AcquiredBlock::per_channel(FS, tone(103.0, 0.0), tone(103.0, 0.0));
        let analysis = run(PipelineSettings::new(FS, N), block);
        assert_eq!(analysis.dominant.unwrap().index, 10);
    }
    #[test]
    fn known_offset_is_recovered_from_interleaved_scan() {
        let scan = interleave(&tone(250.0, 60.0), &tone(250.0, 0.0)).unwrap();
        let analysis = run(PipelineSettings::new(FS, N), AcquiredBlock::interleaved(FS, scan));
        let skew = analysis.measurement.skew().unwrap();
        assert!((skew.frequency_hz - 250.0).abs() < 1e-9);
        assert!((skew.phase_skew_deg - 60.0).abs() < 1e-6);
        assert!((skew.phase_skew_sec - 60.0 / 360.0 / 250.0).abs() < 1e-10);
    }
    #[test]
    fn offset_across_the_wrap_follows_time_basis() {
        // Channel A sits at +170 deg and channel B at -110 deg after the transform.
        let a = tone(100.0, 260.0);
        let b = tone(100.0, -20.0);
        let mut settings = PipelineSettings::new(FS, N);
        let folded = run(
            settings.clone(),
            AcquiredBlock::per_channel(FS, a.clone(), b.clone()),
        );
        settings.time_basis = SkewTimeBasis::RawDifference;
        let raw = run(settings, AcquiredBlock::per_channel(FS, a, b));
        let folded = folded.measurement.skew().copied().unwrap();
        let raw = raw.measurement.skew().copied().unwrap();
        assert!((folded.phase_skew_deg + 80.0).abs() < 1e-6);
        assert!((raw.phase_skew_deg + 80.0).abs() < 1e-6);
        assert!((folded.phase_skew_sec + 80.0 / 360.0 / 100.0).abs() < 1e-10);
        assert!((raw.phase_skew_sec - 280.0 / 360.0 / 100.0).abs() < 1e-10);
    }
    #[test]
    fn silent_input_is_no_signal() {
        let block = AcquiredBlock::per_channel(FS, vec![0.0; N], vec![0.0; N]);
        let analysis = run(PipelineSettings::new(FS, N), block);
        assert_eq!(analysis.dominant.unwrap().index, 0);
        assert_eq!(analysis.measurement, Measurement::NoSignal);
    }
    #[test]
    fn floor_gate_withholds_weak_tones() {
        let weak: Vec<f64> = tone(100.0, 0.0).iter().map(|v| v * 0.001).collect();
        let mut settings = PipelineSettings::new(FS, N);
        settings.min_magnitude = Some(5.0);
        let analysis = run(settings, AcquiredBlock::per_channel(FS, weak.clone(), weak));
        assert!(matches!(
            analysis.measurement,
            Measurement::BelowFloor { candidate: Some(bin) } if bin.index == 10
        ));
    }
    #[test]
    fn reports_and_samples_are_optional() {
        let mut settings = PipelineSettings::new(FS, N);
        settings.emit_reports = true;
        settings.retain_samples = true;
        let a = tone(100.0, 0.0);
        let analysis = run(settings, AcquiredBlock::per_channel(FS, a.clone(), a.clone()));
        assert_eq!(analysis.reports.len(), N / 2 + 1);
        assert!((analysis.reports[10].amplitude_a - 1.0).abs() < 1e-9);
        assert_eq!(analysis.samples.unwrap().a, a);
        let bare = run(
            PipelineSettings::new(FS, N),
            AcquiredBlock::per_channel(FS, a.clone(), a),
        );
        assert!(bare.reports.is_empty());
        assert!(bare.samples.is_none());
    }
    #[test]
    fn floor_strategy_without_floor_is_rejected_up_front() {
        let mut settings = PipelineSettings::new(FS, N);
        settings.strategy = SelectionStrategy::LastAboveFloor;
        assert!(matches!(
            SkewPipeline::new(settings.clone()),
            Err(SkewError::Config(_))
        ));
        settings.strategy = SelectionStrategy::JointPeak;
        settings.min_magnitude = Some(f64::NAN);
        assert!(matches!(
            SkewPipeline::new(settings.clone()),
            Err(SkewError::Config(_))
        ));
        settings.strategy = SelectionStrategy::LastAboveFloor;
        settings.min_magnitude = Some(5.0);
        let block = AcquiredBlock::per_channel(FS, tone(100.0, 0.0), tone(100.0, 0.0));
        let analysis = run(settings, block);
        assert_eq!(analysis.dominant.unwrap().index, 10);
        assert!((analysis.measurement.skew().unwrap().frequency_hz - 100.0).abs() < 1e-9);
    }
    #[test]
    fn bad_chunk_does_not_poison_the_next() {
        let mut pipeline = SkewPipeline::new(PipelineSettings::new(FS, N)).unwrap();
        let short = AcquiredBlock::interleaved(FS, vec![0.0; 2 * N - 1]);
        assert!(matches!(
            pipeline.process(&short),
            Err(SkewError::InterleavedLength { .. })
        ));
        let good = AcquiredBlock::per_channel(FS, tone(100.0, 30.0), tone(100.0, 0.0));
        let analysis = pipeline.process(&good).unwrap();
        assert_eq!(analysis.sequence, 1);
        assert!((analysis.measurement.skew().unwrap().phase_skew_deg - 30.0).abs() < 1e-6);
    }
}
