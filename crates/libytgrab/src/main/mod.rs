//! Module for all the main functionality in the library (to keep everything sorted)
pub mod cleanup;
pub mod destination;
pub mod embed;
pub mod engine;
pub mod pipeline;
pub mod progress;
pub mod snapshot;
