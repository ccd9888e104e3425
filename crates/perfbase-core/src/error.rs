//! Error types for the perfbase core engine.
//!
//! Each concern gets its own enum so callers can match on exactly the
//! failure class they care about: statistics computation, templating and
//! extraction, baseline load/persist, and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the statistics engine.
///
/// Both variants guard division-by-zero conditions that must never be
/// coerced to zero or propagated as NaN.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// An average was requested over an empty set of samples.
    #[error("cannot compute an average over an empty set of response time samples")]
    EmptySamples,

    /// A variance percentage was requested against a zero baseline value.
    #[error("variance percentage is undefined against a zero baseline")]
    ZeroBaseline,
}

/// Errors from request templating and response extraction.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The expected tag for a response property was not found in the body.
    ///
    /// Callers must mark the test case as failed rather than let downstream
    /// substitutions silently adopt an empty value.
    #[error("response property '{property}' not found in body of test case '{test}'")]
    ExtractionMissing { test: String, property: String },

    /// The property name could not be compiled into an extraction pattern.
    #[error("invalid extraction pattern for property '{property}': {source}")]
    InvalidPattern {
        property: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors from baseline load, merge, and persistence.
#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("failed to read baseline file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse baseline file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize baseline: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to create baseline output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write baseline file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
}
