//! Module for all data types used across the pipeline

pub mod progress_event;
pub mod request;
