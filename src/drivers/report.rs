use serde::Serialize;

use crate::drivers::fft::Spectrum;
use crate::drivers::SkewError;

/// Both channels' figures for one frequency bin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BinReport {
    pub frequency_hz: f64,
    pub magnitude_a: f64,
    pub amplitude_a: f64,
    pub magnitude_b: f64,
    pub amplitude_b: f64,
}

/// One record per bin, in bin order.
pub fn bin_reports(a: &Spectrum, b: &Spectrum) -> Result<Vec<BinReport>, SkewError> {
    if a.len() != b.len() {
        return Err(SkewError::SpectrumLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.measurements()
        .zip(b.measurements())
        .map(|(ma, mb)| BinReport {
            frequency_hz: ma.frequency_hz,
            magnitude_a: ma.magnitude,
            amplitude_a: ma.amplitude,
            magnitude_b: mb.magnitude,
            amplitude_b: mb.amplitude,
        })
        .collect())
}
