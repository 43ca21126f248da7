//! sox_controller - drive the `sox` audio engine from typed edit requests
//!
//! Operations (trim, fade, pad, delay, volume, resample, channel change,
//! mix, combine, length probe, format conversion) are turned into the exact
//! positional argument list sox expects, run through a pluggable process
//! launcher, and interpreted from the exit code, the streamed output and the
//! presence of the output file. All operations shell out to a `sox` binary
//! resolved on `PATH` unless configured otherwise.

pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod exec;
pub mod format;
pub mod media;
pub mod metrics;
pub mod parser;
pub mod result;
pub mod service;
pub mod validation;

pub use catalog::{FadeCurve, MixVolume, Operation, TrimOutput, UNSET};
pub use command::SoxCommand;
pub use config::SoxConfig;
pub use controller::SoxController;
pub use error::{Result, SoxError};
pub use exec::{ProcessLauncher, ShellEvent, StreamCallback, SystemLauncher};
pub use media::MediaDescriptor;
pub use parser::LengthParser;
pub use result::{ExecutionResult, Failure};
