use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex64;
use serde::Serialize;

use crate::drivers::SkewError;

/// One-sided spectrum of a real chunk: `chunk_len / 2 + 1` bins spaced at
/// `sample_rate / chunk_len`.
#[derive(Clone, Debug)]
pub struct Spectrum {
    sample_rate_hz: f64,
    chunk_len: usize,
    bins: Vec<Complex64>,
}

/// Derived quantities for a single bin of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BinMeasurement {
    pub frequency_hz: f64,
    pub magnitude: f64,
    pub amplitude: f64,
}

impl Spectrum {
    /// Wrap precomputed bins. The bin count must be `chunk_len / 2 + 1`.
    pub fn from_bins(
        sample_rate_hz: f64,
        chunk_len: usize,
        bins: Vec<Complex64>,
    ) -> Result<Self, SkewError> {
        if !(sample_rate_hz > 0.0) {
            return Err(SkewError::InvalidSampleRate);
        }
        if chunk_len == 0 {
            return Err(SkewError::InvalidChunkLength);
        }
        let expected = one_sided_len(chunk_len);
        if bins.len() != expected {
            return Err(SkewError::SpectrumLengthMismatch {
                left: expected,
                right: bins.len(),
            });
        }
        Ok(Self {
            sample_rate_hz,
            chunk_len,
            bins,
        })
    }
    pub fn len(&self) -> usize {
        self.bins.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }
    pub fn bins(&self) -> &[Complex64] {
        &self.bins
    }
    pub fn bin(&self, index: usize) -> Option<Complex64> {
        self.bins.get(index).copied()
    }
    pub fn bin_spacing_hz(&self) -> f64 {
        self.sample_rate_hz / self.chunk_len as f64
    }
    pub fn frequency_of(&self, index: usize) -> f64 {
        index as f64 * self.bin_spacing_hz()
    }
    pub fn magnitude(&self, index: usize) -> f64 {
        self.bins.get(index).map(|c| c.norm()).unwrap_or(0.0)
    }
    /// Single-sided amplitude in input units.
    ///
    /// DC and, for even chunk lengths, the Nyquist bin have no mirrored
    /// counterpart and are scaled by `1 / N` instead of `2 / N`.
    pub fn amplitude(&self, index: usize) -> f64 {
        let n = self.chunk_len as f64;
        let unmirrored = index == 0 || (self.chunk_len % 2 == 0 && index == self.chunk_len / 2);
        let scale = if unmirrored { 1.0 / n } else { 2.0 / n };
        self.magnitude(index) * scale
    }
    pub fn measurement(&self, index: usize) -> BinMeasurement {
        BinMeasurement {
            frequency_hz: self.frequency_of(index),
            magnitude: self.magnitude(index),
            amplitude: self.amplitude(index),
        }
    }
    pub fn measurements(&self) -> impl Iterator<Item = BinMeasurement> + '_ {
        (0..self.bins.len()).map(|i| self.measurement(i))
    }
}

pub fn one_sided_len(chunk_len: usize) -> usize {
    chunk_len / 2 + 1
}

/// Forward real-input transform planned once for a fixed chunk length.
///
/// Input samples are copied into an internal buffer before the transform runs,
/// so the caller's slice is never touched. The analyzer must not be shared
/// between concurrent analyses; it owns its scratch space.
pub struct SpectralAnalyzer {
    chunk_len: usize,
    plan: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    scratch: Vec<Complex64>,
}

impl SpectralAnalyzer {
    pub fn with_len(chunk_len: usize) -> Result<Self, SkewError> {
        if chunk_len == 0 {
            return Err(SkewError::InvalidChunkLength);
        }
        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(chunk_len);
        let input = plan.make_input_vec();
        let scratch = plan.make_scratch_vec();
        Ok(Self {
            chunk_len,
            plan,
            input,
            scratch,
        })
    }
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }
    pub fn analyze(&mut self, samples: &[f64], sample_rate_hz: f64) -> Result<Spectrum, SkewError> {
        if !(sample_rate_hz > 0.0) {
            return Err(SkewError::InvalidSampleRate);
        }
        if samples.len() != self.chunk_len {
            return Err(SkewError::ChannelLengthMismatch {
                expected: self.chunk_len,
                actual: samples.len(),
            });
        }
        self.input.copy_from_slice(samples);
        let mut bins = self.plan.make_output_vec();
        self.plan
            .process_with_scratch(&mut self.input, &mut bins, &mut self.scratch)?;
        Ok(Spectrum {
            sample_rate_hz,
            chunk_len: self.chunk_len,
            bins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    fn sine(n: usize, fs: f64, freq: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (TAU * freq * i as f64 / fs).sin())
            .collect()
    }
    #[test]
    fn spectrum_length_is_half_plus_one() {
        for n in (1..=33).chain([999, 1000, 1024]) {
            let mut analyzer = SpectralAnalyzer::with_len(n).unwrap();
            let spectrum = analyzer.analyze(&vec![0.5; n], 1000.0).unwrap();
            assert_eq!(spectrum.len(), n / 2 + 1, "n = {n}");
        }
    }
    #[test]
    fn bin_tone_lands_on_its_bin() {
        let samples = sine(1000, 10_000.0, 100.0, 2.0);
        let mut analyzer = SpectralAnalyzer::with_len(1000).unwrap();
        let spectrum = analyzer.analyze(&samples, 10_000.0).unwrap();
        assert!((spectrum.bin_spacing_hz() - 10.0).abs() < 1e-12);
        let m = spectrum.measurement(10);
        assert!((m.frequency_hz - 100.0).abs() < 1e-9);
        assert!((m.magnitude - 1000.0).abs() < 1e-6);
        assert!((m.amplitude - 2.0).abs() < 1e-9);
        assert!(spectrum.magnitude(11) < 1e-6);
    }
    #[test]
    fn dc_and_nyquist_are_not_doubled() {
        let n = 8;
        let samples: Vec<f64> = (0..n)
            .map(|i| 1.5 + if i % 2 == 0 { 0.25 } else { -0.25 })
            .collect();
        let mut analyzer = SpectralAnalyzer::with_len(n).unwrap();
        let spectrum = analyzer.analyze(&samples, 8.0).unwrap();
        assert!((spectrum.amplitude(0) - 1.5).abs() < 1e-12);
        assert!((spectrum.amplitude(n / 2) - 0.25).abs() < 1e-12);
    }
    #[test]
    fn caller_samples_are_left_untouched() {
        let samples = sine(64, 64.0, 5.0, 1.0);
        let before = samples.clone();
        let mut analyzer = SpectralAnalyzer::with_len(64).unwrap();
        let first = analyzer.analyze(&samples, 64.0).unwrap();
        let second = analyzer.analyze(&samples, 64.0).unwrap();
        assert_eq!(samples, before);
        assert_eq!(first.bins(), second.bins());
    }
    #[test]
    fn rejects_wrong_chunk_length() {
        let mut analyzer = SpectralAnalyzer::with_len(16).unwrap();
        assert!(matches!(
            analyzer.analyze(&[0.0; 15], 16.0),
            Err(SkewError::ChannelLengthMismatch {
                expected: 16,
                actual: 15
            })
        ));
        assert!(Spectrum::from_bins(16.0, 16, vec![Complex64::new(0.0, 0.0); 8]).is_err());
    }
}
