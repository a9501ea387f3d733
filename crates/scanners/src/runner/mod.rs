//! Detector execution.
//!
//! The registry owns the closed set of detectors for a session and runs them
//! over one source unit at a time. Spreading units over worker threads is the
//! session's job; a registry run is always sequential and deterministic.

pub mod registry;

pub use registry::{DetectorInfo, DetectorRegistry};
