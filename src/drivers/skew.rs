//! Phase skew between the two channels at the dominant bin.
//!
//! Each channel's phase comes from `atan2` in degrees, so the raw difference
//! lies in (-360, 360). It is folded with a two-threshold rule rather than a
//! modulo: above 270 subtract 360, below -90 add 360. The result stays in
//! [-90, 270].
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::drivers::SkewError;

/// Which phase difference feeds the time-domain skew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewTimeBasis {
    /// Seconds follow the folded difference, so both figures always agree.
    #[default]
    Normalized,
    /// Seconds follow the difference before folding.
    RawDifference,
}

/// One chunk's measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhaseSkewResult {
    pub frequency_hz: f64,
    pub phase_a_deg: f64,
    pub phase_b_deg: f64,
    /// `phase_a_deg - phase_b_deg` before folding.
    pub raw_difference_deg: f64,
    pub phase_skew_deg: f64,
    pub phase_skew_sec: f64,
}

pub fn normalize_phase_difference(mut degrees: f64) -> f64 {
    if degrees > 270.0 {
        degrees -= 360.0;
    }
    if degrees < -90.0 {
        degrees += 360.0;
    }
    degrees
}

pub fn phase_deg(value: Complex64) -> f64 {
    value.im.atan2(value.re).to_degrees()
}

/// Phase of `a` relative to `b` at `frequency_hz`.
///
/// A frequency of zero means the dominant bin is DC; no skew in seconds exists
/// there (nor at a non-finite frequency) and
/// [`SkewError::UndefinedMeasurement`] is returned.
pub fn estimate_phase_skew(
    a: Complex64,
    b: Complex64,
    frequency_hz: f64,
    basis: SkewTimeBasis,
) -> Result<PhaseSkewResult, SkewError> {
    if frequency_hz == 0.0 || !frequency_hz.is_finite() {
        return Err(SkewError::UndefinedMeasurement { frequency_hz });
    }
    let phase_a_deg = phase_deg(a);
    let phase_b_deg = phase_deg(b);
    let raw = phase_a_deg - phase_b_deg;
    let folded = normalize_phase_difference(raw);
    let basis_deg = match basis {
        SkewTimeBasis::Normalized => folded,
        SkewTimeBasis::RawDifference => raw,
    };
    Ok(PhaseSkewResult {
        frequency_hz,
        phase_a_deg,
        phase_b_deg,
        raw_difference_deg: raw,
        phase_skew_deg: folded,
        phase_skew_sec: (basis_deg / 360.0) * (1.0 / frequency_hz),
    })
}
