//! # Perfbase Core
//!
//! Core engine for repeatable HTTP performance testing: request templating
//! with response chaining, a statistics engine producing trimmed averages
//! and signed variance percentages, and a baseline governor that decides
//! whether a persisted baseline is usable for comparison or needs to be
//! (re)generated.
//!
//! The pieces here are transport-agnostic. Request execution lives in
//! `perfbase-runner`; this crate owns the shared state it operates on:
//! the [`VariableStore`] that chains values between test cases, the
//! [`PerfStats`] record of a run, and the persisted [`BasePerfStats`]
//! baseline.

pub mod baseline;
pub mod config;
pub mod error;
pub mod fs;
pub mod stats;
pub mod template;
pub mod vars;

pub use baseline::{BasePerfStats, BaselineGovernor, RebaseOptions};
pub use config::Config;
pub use error::{BaselineError, ConfigError, StatsError, TemplateError};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use stats::{PerfStats, RunRecorder, TestMode, TestPartition};
pub use vars::VariableStore;
