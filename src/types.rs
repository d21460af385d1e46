// src/types.rs
use crate::drivers::ChunkAnalysis;
use crate::session::SessionCounters;

// Events sent back from the analysis thread, in chunk order
#[derive(Debug)]
pub enum SessionEvent {
    // Counters are a snapshot taken right after the chunk
    Chunk {
        analysis: Box<ChunkAnalysis>,
        counters: SessionCounters,
    },
    // One message per failed chunk
    ChunkFailed(String),
    // Final counters; always the last event
    Finished(SessionCounters),
}
