// src/recorder.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::drivers::{ChunkAnalysis, SkewError};

const VOLTAGE_HEADER: &str = "Time (s),Channel A (V),Channel B (V)";
const DFT_HEADER: &str =
    "Frequency (Hz),Channel A Magnitude,Channel A Amplitude (V),Channel B Magnitude,Channel B Amplitude (V)";

/// Decimal places used in each log.
#[derive(Clone, Copy, Debug)]
pub struct LogPrecision {
    pub voltage: usize,
    pub dft: usize,
}

impl Default for LogPrecision {
    fn default() -> Self {
        Self { voltage: 2, dft: 3 }
    }
}

/// Appends each chunk's samples and per-bin spectrum to CSV logs.
///
/// Every chunk starts with its own header line; time restarts at zero per chunk.
pub struct ChunkRecorder<W: Write> {
    voltage: Option<W>,
    dft: Option<W>,
    precision: LogPrecision,
}

impl ChunkRecorder<BufWriter<File>> {
    /// Create (truncate) the log files that are requested.
    pub fn create(
        voltage_path: Option<&Path>,
        dft_path: Option<&Path>,
        precision: LogPrecision,
    ) -> Result<Self, SkewError> {
        let open = |path: Option<&Path>| -> Result<Option<BufWriter<File>>, SkewError> {
            match path {
                Some(p) => {
                    let file = File::create(p)?;
                    info!("logging to {}", p.display());
                    Ok(Some(BufWriter::new(file)))
                }
                None => Ok(None),
            }
        };
        Ok(Self::new(open(voltage_path)?, open(dft_path)?, precision))
    }
}

impl<W: Write> ChunkRecorder<W> {
    pub fn new(voltage: Option<W>, dft: Option<W>, precision: LogPrecision) -> Self {
        Self {
            voltage,
            dft,
            precision,
        }
    }
    pub fn record(&mut self, analysis: &ChunkAnalysis) -> Result<(), SkewError> {
        if let (Some(w), Some(samples)) = (self.voltage.as_mut(), analysis.samples.as_ref()) {
            let p = self.precision.voltage;
            writeln!(w, "{VOLTAGE_HEADER}")?;
            for (i, (a, b)) in samples.a.iter().zip(&samples.b).enumerate() {
                let t = i as f64 / analysis.sample_rate_hz;
                writeln!(w, "{t:.p$},{a:.p$},{b:.p$}")?;
            }
        }
        if let Some(w) = self.dft.as_mut() {
            let p = self.precision.dft;
            writeln!(w, "{DFT_HEADER}")?;
            for r in &analysis.reports {
                writeln!(
                    w,
                    "{:.2},{:.p$},{:.p$},{:.p$},{:.p$}",
                    r.frequency_hz, r.magnitude_a, r.amplitude_a, r.magnitude_b, r.amplitude_b
                )?;
            }
        }
        Ok(())
    }
    pub fn flush(&mut self) -> Result<(), SkewError> {
        for w in [self.voltage.as_mut(), self.dft.as_mut()].into_iter().flatten() {
            w.flush()?;
        }
        Ok(())
    }
    /// Flush and hand back the writers.
    pub fn into_inner(mut self) -> Result<(Option<W>, Option<W>), SkewError> {
        self.flush()?;
        Ok((self.voltage, self.dft))
    }
}
