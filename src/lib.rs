// src/lib.rs
//! Dominant frequency and phase skew between two clock-synchronized channels,
//! measured once per acquisition chunk.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod recorder;
pub mod session;
pub mod types;

pub use config::SessionConfig;
pub use session::{Session, SessionCounters, StopHandle};
