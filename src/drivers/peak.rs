//! Dominant-bin selection across two channel spectra.
//!
//! A bin only counts when *both* channels carry energy there, so a line present
//! in just one channel's noise floor is never reported as the signal frequency.
use serde::{Deserialize, Serialize};

use crate::drivers::fft::Spectrum;
use crate::drivers::SkewError;

/// How the reported bin is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Joint peak scan: first bin reaching the highest magnitude on channel A
    /// while channel B is at least as large.
    #[default]
    JointPeak,
    /// Highest-index bin whose magnitudes on both channels reach the floor.
    LastAboveFloor,
}

/// Outcome of a selection pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DominantBin {
    pub index: usize,
    pub frequency_hz: f64,
    pub magnitude_a: f64,
    pub magnitude_b: f64,
}

impl DominantBin {
    fn at(a: &Spectrum, b: &Spectrum, index: usize) -> Self {
        Self {
            index,
            frequency_hz: a.frequency_of(index),
            magnitude_a: a.magnitude(index),
            magnitude_b: b.magnitude(index),
        }
    }
    /// True when both channel magnitudes reach `floor`.
    pub fn clears(&self, floor: f64) -> bool {
        self.magnitude_a >= floor && self.magnitude_b >= floor
    }
}

fn check_pair(a: &Spectrum, b: &Spectrum) -> Result<(), SkewError> {
    if a.len() != b.len() {
        return Err(SkewError::SpectrumLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.sample_rate_hz() != b.sample_rate_hz() {
        return Err(SkewError::SampleRateMismatch {
            expected: a.sample_rate_hz(),
            actual: b.sample_rate_hz(),
        });
    }
    Ok(())
}

/// Index of the bin with the peak shared magnitude.
///
/// A bin qualifies when both magnitudes are at least the running best; it
/// replaces the current pick only when channel A strictly exceeds that best,
/// so among equal peaks the lowest index wins. Silent input selects bin 0.
pub fn select_dominant_bin(a: &Spectrum, b: &Spectrum) -> Result<usize, SkewError> {
    check_pair(a, b)?;
    let mut best = 0.0f64;
    let mut index = 0usize;
    for (i, (bin_a, bin_b)) in a.bins().iter().zip(b.bins()).enumerate() {
        let mag_a = bin_a.norm();
        let mag_b = bin_b.norm();
        if mag_a > best && mag_b >= best {
            best = mag_a;
            index = i;
        }
    }
    Ok(index)
}

/// Highest-index bin whose magnitudes on both channels reach `floor`.
pub fn last_bin_above(a: &Spectrum, b: &Spectrum, floor: f64) -> Result<Option<usize>, SkewError> {
    check_pair(a, b)?;
    Ok(a.bins()
        .iter()
        .zip(b.bins())
        .rposition(|(bin_a, bin_b)| bin_a.norm() >= floor && bin_b.norm() >= floor))
}

/// Applies a [`SelectionStrategy`] and an optional magnitude floor.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinSelector {
    strategy: SelectionStrategy,
    min_magnitude: Option<f64>,
}

impl BinSelector {
    /// Fails when the floor is negative or NaN, or when `LastAboveFloor` has
    /// no floor to scan against.
    pub fn new(
        strategy: SelectionStrategy,
        min_magnitude: Option<f64>,
    ) -> Result<Self, SkewError> {
        if let Some(floor) = min_magnitude {
            if !(floor >= 0.0) {
                return Err(SkewError::Config(format!(
                    "min_magnitude must be non-negative, got {floor}"
                )));
            }
        }
        if strategy == SelectionStrategy::LastAboveFloor && min_magnitude.is_none() {
            return Err(SkewError::Config(
                "last_above_floor selection needs min_magnitude".into(),
            ));
        }
        Ok(Self {
            strategy,
            min_magnitude,
        })
    }
    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }
    pub fn min_magnitude(&self) -> Option<f64> {
        self.min_magnitude
    }
    /// Returns `None` when the floor strategy finds no qualifying bin.
    pub fn select(&self, a: &Spectrum, b: &Spectrum) -> Result<Option<DominantBin>, SkewError> {
        let index = match self.strategy {
            SelectionStrategy::JointPeak => Some(select_dominant_bin(a, b)?),
            SelectionStrategy::LastAboveFloor => match self.min_magnitude {
                Some(floor) => last_bin_above(a, b, floor)?,
                None => {
                    return Err(SkewError::Config(
                        "last_above_floor selection needs min_magnitude".into(),
                    ))
                }
            },
        };
        Ok(index.map(|i| DominantBin::at(a, b, i)))
    }
    /// Whether the bin passes the configured floor (always true without one).
    pub fn accepts(&self, bin: &DominantBin) -> bool {
        self.min_magnitude.map_or(true, |floor| bin.clears(floor))
    }
}
