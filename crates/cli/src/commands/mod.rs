//! Subcommands of the `solaudit` binary.
//!
//! `scan` runs an audit session and renders its report, `detectors` prints
//! what the built-in registry would run.

pub mod detectors;
pub mod scan;
