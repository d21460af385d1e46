// src/engine.rs
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::drivers::ChunkSource;
use crate::session::{Session, StopHandle};
use crate::types::SessionEvent;

/// Handle to a session running on its own thread.
pub struct EngineHandle {
    pub events: Receiver<SessionEvent>,
    stop: StopHandle,
    worker: JoinHandle<()>,
}

impl EngineHandle {
    /// Ask the worker to stop after the chunk in flight.
    pub fn stop(&self) {
        self.stop.stop();
    }
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
    pub fn join(self) {
        if self.worker.join().is_err() {
            error!("analysis thread panicked");
        }
    }
}

/// Run `session` on a worker thread.
///
/// Results travel over a queue holding at most `capacity` events; when the
/// consumer falls behind the worker blocks before acquiring the next chunk, so
/// only one chunk is ever being analyzed and events stay in chunk order.
pub fn spawn<S>(session: Session<S>, capacity: usize) -> EngineHandle
where
    S: ChunkSource + Send + 'static,
{
    let (tx, events) = mpsc::sync_channel(capacity.max(1));
    let stop = session.stop_handle();
    let worker = thread::spawn(move || run(session, tx));
    EngineHandle {
        events,
        stop,
        worker,
    }
}

fn run<S: ChunkSource>(mut session: Session<S>, tx: SyncSender<SessionEvent>) {
    info!("analysis thread started");
    let stop = session.stop_handle();
    loop {
        let event = match session.next() {
            Some(Ok(analysis)) => SessionEvent::Chunk {
                analysis: Box::new(analysis),
                counters: session.counters(),
            },
            Some(Err(err)) => SessionEvent::ChunkFailed(err.to_string()),
            None => break,
        };
        if tx.send(event).is_err() {
            // Receiver dropped; nobody is listening any more.
            stop.stop();
        }
    }
    tx.send(SessionEvent::Finished(session.counters())).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{PipelineSettings, SimulatedSource, ToneSettings};
    #[test]
    fn delivers_chunks_in_order_then_counters() {
        let source = SimulatedSource::new(ToneSettings::default(), 1000.0, 100).limit(Some(5));
        let session = Session::new(source, PipelineSettings::new(1000.0, 100)).unwrap();
        let handle = spawn(session, 2);
        let mut sequences = Vec::new();
        let mut finished = None;
        for event in handle.events.iter() {
            match event {
                SessionEvent::Chunk { analysis, counters } => {
                    sequences.push(analysis.sequence);
                    assert_eq!(counters.samples_read_a, (analysis.sequence + 1) * 100);
                }
                SessionEvent::ChunkFailed(msg) => panic!("unexpected failure: {msg}"),
                SessionEvent::Finished(counters) => finished = Some(counters),
            }
        }
        handle.join();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert_eq!(finished.unwrap().chunks_measured, 5);
    }
    #[test]
    fn stop_ends_an_endless_source() {
        let source = SimulatedSource::new(ToneSettings::default(), 1000.0, 100);
        let session = Session::new(source, PipelineSettings::new(1000.0, 100)).unwrap();
        let handle = spawn(session, 1);
        match handle.events.recv().unwrap() {
            SessionEvent::Chunk { analysis, .. } => assert_eq!(analysis.sequence, 0),
            other => panic!("unexpected event {other:?}"),
        }
        handle.stop();
        let last = handle.events.iter().last();
        assert!(matches!(last, Some(SessionEvent::Finished(_))));
        handle.join();
    }
    #[test]
    fn stop_handle_clone_stops_the_worker() {
        let source = SimulatedSource::new(ToneSettings::default(), 1000.0, 100);
        let session = Session::new(source, PipelineSettings::new(1000.0, 100)).unwrap();
        let handle = spawn(session, 1);
        let stop = handle.stop_handle();
        assert!(matches!(
            handle.events.recv().unwrap(),
            SessionEvent::Chunk { .. }
        ));
        stop.stop();
        assert!(handle.stop_handle().is_stopped());
        let last = handle.events.iter().last();
        assert!(matches!(last, Some(SessionEvent::Finished(_))));
        handle.join();
    }
}
