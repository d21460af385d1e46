// src/session.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::drivers::{
    ChunkAnalysis, ChunkSource, Measurement, PipelineSettings, SkewError, SkewPipeline,
};

/// Running totals owned by one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    pub samples_read_a: u64,
    pub samples_read_b: u64,
    pub chunks_measured: u64,
    pub chunks_without_signal: u64,
    pub chunks_failed: u64,
}

/// Cloneable flag that ends a session before its next chunk.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pulls chunks from a source and analyzes them one at a time.
///
/// Iterating yields one item per chunk in acquisition order. Chunk-level errors
/// are yielded and the stream carries on; an acquisition failure is yielded
/// once and ends the stream, as does exhausting the source or raising the
/// stop flag.
pub struct Session<S: ChunkSource> {
    source: S,
    pipeline: SkewPipeline,
    counters: SessionCounters,
    stop: StopHandle,
    finished: bool,
}

impl<S: ChunkSource> Session<S> {
    pub fn new(source: S, settings: PipelineSettings) -> Result<Self, SkewError> {
        let pipeline = SkewPipeline::new(settings)?;
        info!(
            "session ready: {} samples/chunk at {} Hz",
            pipeline.settings().chunk_len,
            pipeline.settings().sample_rate_hz
        );
        Ok(Self {
            source,
            pipeline,
            counters: SessionCounters::default(),
            stop: StopHandle::default(),
            finished: false,
        })
    }
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }
    pub fn settings(&self) -> &PipelineSettings {
        self.pipeline.settings()
    }
    /// Acquire and analyze the next chunk. `Ok(None)` means the stream is over.
    pub fn pump_once(&mut self) -> Result<Option<ChunkAnalysis>, SkewError> {
        if self.finished {
            return Ok(None);
        }
        if self.stop.is_stopped() {
            self.finish("stop requested");
            return Ok(None);
        }
        let block = match self.source.next_block() {
            Ok(Some(block)) => block,
            Ok(None) => {
                self.finish("source exhausted");
                return Ok(None);
            }
            Err(err) => {
                self.finish("acquisition failed");
                return Err(err);
            }
        };
        let (read_a, read_b) = block.samples_read();
        self.counters.samples_read_a += read_a as u64;
        self.counters.samples_read_b += read_b as u64;
        match self.pipeline.process(&block) {
            Ok(analysis) => {
                match &analysis.measurement {
                    Measurement::Skew(result) => {
                        self.counters.chunks_measured += 1;
                        debug!(
                            "chunk {}: {:.2} Hz, {:.2} deg, {:.3e} s",
                            analysis.sequence,
                            result.frequency_hz,
                            result.phase_skew_deg,
                            result.phase_skew_sec
                        );
                    }
                    Measurement::NoSignal | Measurement::BelowFloor { .. } => {
                        self.counters.chunks_without_signal += 1;
                        debug!("chunk {}: no measurement", analysis.sequence);
                    }
                }
                Ok(Some(analysis))
            }
            Err(err) => {
                self.counters.chunks_failed += 1;
                warn!("chunk dropped: {err}");
                if err.is_session_fatal() {
                    self.finish("fatal chunk error");
                }
                Err(err)
            }
        }
    }
    fn finish(&mut self, reason: &str) {
        self.finished = true;
        let c = self.counters;
        info!(
            "session ended ({reason}): read {}/{} samples, {} measured, {} without signal, {} failed",
            c.samples_read_a,
            c.samples_read_b,
            c.chunks_measured,
            c.chunks_without_signal,
            c.chunks_failed
        );
    }
}

impl<S: ChunkSource> Iterator for Session<S> {
    type Item = Result<ChunkAnalysis, SkewError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.pump_once().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{AcquiredBlock, ManualSource, SimulatedSource, ToneSettings};
    struct FailingSource {
        calls: usize,
    }
    impl ChunkSource for FailingSource {
        fn next_block(&mut self) -> Result<Option<AcquiredBlock>, SkewError> {
            self.calls += 1;
            Err(SkewError::Acquisition("device removed".into()))
        }
    }
    #[test]
    fn yields_one_result_per_chunk_in_order() {
        let tone = ToneSettings {
            frequency_hz: 50.0,
            offset_deg: 30.0,
            ..ToneSettings::default()
        };
        let source = SimulatedSource::new(tone, 1000.0, 100).limit(Some(3));
        let session = Session::new(source, PipelineSettings::new(1000.0, 100)).unwrap();
        let results: Vec<_> = session.collect::<Result<_, _>>().unwrap();
        let sequences: Vec<u64> = results.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        for r in &results {
            let skew = r.measurement.skew().unwrap();
            assert!((skew.frequency_hz - 50.0).abs() < 1e-9);
            assert!((skew.phase_skew_deg - 30.0).abs() < 1e-6);
        }
    }
    #[test]
    fn bad_chunks_are_reported_and_skipped() {
        let source = ManualSource::new(vec![
            AcquiredBlock::per_channel(100.0, vec![0.0; 3], vec![0.0; 4]),
            AcquiredBlock::interleaved(100.0, vec![0.0; 5]),
            AcquiredBlock::per_channel(100.0, vec![0.0; 4], vec![0.0; 4]),
        ]);
        let mut session = Session::new(source, PipelineSettings::new(100.0, 4)).unwrap();
        assert!(session.next().unwrap().is_err());
        assert!(session.next().unwrap().is_err());
        let silent = session.next().unwrap().unwrap();
        assert_eq!(silent.measurement, Measurement::NoSignal);
        assert!(session.next().is_none());
        let counters = session.counters();
        assert_eq!(counters.chunks_failed, 2);
        assert_eq!(counters.chunks_without_signal, 1);
        assert_eq!(counters.samples_read_a, 3 + 3 + 4);
        assert_eq!(counters.samples_read_b, 4 + 2 + 4);
    }
    #[test]
    fn stop_handle_ends_the_stream_between_chunks() {
        let source = SimulatedSource::new(ToneSettings::default(), 1000.0, 100);
        let mut session = Session::new(source, PipelineSettings::new(1000.0, 100)).unwrap();
        let stop = session.stop_handle();
        assert!(session.next().unwrap().is_ok());
        stop.stop();
        assert!(session.next().is_none());
        assert_eq!(session.counters().chunks_measured, 1);
    }
    #[test]
    fn acquisition_failure_is_yielded_once() {
        let mut session =
            Session::new(FailingSource { calls: 0 }, PipelineSettings::new(100.0, 4)).unwrap();
        let err = session.next().unwrap().unwrap_err();
        assert!(err.is_session_fatal());
        assert!(session.next().is_none());
        assert_eq!(session.source.calls, 1);
    }
}
