// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::drivers::{
    BinSelector, PipelineSettings, SelectionStrategy, SkewError, SkewTimeBasis, ToneSettings,
};
use crate::recorder::LogPrecision;

/// Session parameters, loadable from JSON. Missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate_hz: f64,
    pub chunk_len: usize,
    /// Both channels must reach this magnitude for a skew to be reported.
    pub min_magnitude: Option<f64>,
    pub strategy: SelectionStrategy,
    pub time_basis: SkewTimeBasis,
    pub voltage_precision: usize,
    pub dft_precision: usize,
    pub voltage_csv: Option<PathBuf>,
    pub dft_csv: Option<PathBuf>,
    /// Events buffered between the analysis thread and the printer.
    pub queue_capacity: usize,
    pub simulation: SimulationConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10_000.0,
            chunk_len: 1000,
            min_magnitude: None,
            strategy: SelectionStrategy::JointPeak,
            time_basis: SkewTimeBasis::Normalized,
            voltage_precision: 2,
            dft_precision: 3,
            voltage_csv: None,
            dft_csv: None,
            queue_capacity: 4,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Synthetic acquisition used when no hardware is attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub frequency_hz: f64,
    pub amplitude: f64,
    pub offset_deg: f64,
    pub noise: f64,
    pub interleaved: bool,
    pub realtime: bool,
    /// Noise generator seed; a fixed seed repeats the same noise every run.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 100.0,
            amplitude: 1.0,
            offset_deg: 0.0,
            noise: 0.0,
            interleaved: false,
            realtime: false,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn tone(&self) -> ToneSettings {
        ToneSettings {
            frequency_hz: self.frequency_hz,
            amplitude: self.amplitude,
            offset_deg: self.offset_deg,
            noise: self.noise,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, SkewError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
    pub fn from_json(text: &str) -> Result<Self, SkewError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| SkewError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<(), SkewError> {
        if !(self.sample_rate_hz > 0.0) || !self.sample_rate_hz.is_finite() {
            return Err(SkewError::InvalidSampleRate);
        }
        if self.chunk_len == 0 {
            return Err(SkewError::InvalidChunkLength);
        }
        BinSelector::new(self.strategy, self.min_magnitude)?;
        Ok(())
    }
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            sample_rate_hz: self.sample_rate_hz,
            chunk_len: self.chunk_len,
            strategy: self.strategy,
            min_magnitude: self.min_magnitude,
            time_basis: self.time_basis,
            emit_reports: self.dft_csv.is_some(),
            retain_samples: self.voltage_csv.is_some(),
        }
    }
    pub fn log_precision(&self) -> LogPrecision {
        LogPrecision {
            voltage: self.voltage_precision,
            dft: self.dft_precision,
        }
    }
}
