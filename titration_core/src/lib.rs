#![forbid(unsafe_code)]

//! Core domain model and schedule computation for medication titration calendars.
//!
//! This crate provides:
//! - Domain types (steps, transitions, schedules, day entries)
//! - Schedule validation and reference resolution
//! - The schedule expander
//! - The built-in default regimen
//! - Persistence (config, delay file) and export sinks (ICS, CSV)

pub mod types;
pub mod error;
pub mod schedule;
pub mod expander;
pub mod regimen;
pub mod config;
pub mod logging;
pub mod delays;
pub mod sink;
pub mod ics;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result, ScheduleError};
pub use types::*;
pub use schedule::{resolve_endpoints, StepIndex};
pub use expander::{expand, Expander};
pub use regimen::{build_default_regimen, load_regimen};
pub use config::{Config, ExportFormat};
pub use delays::DelayState;
pub use sink::DaySink;
pub use ics::IcsSink;
pub use csv_export::CsvSink;
