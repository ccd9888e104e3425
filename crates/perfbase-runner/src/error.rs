//! Error types for suite building and the memory probe.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from building a test suite out of XML definition files.
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("failed to read test definitions directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no test case files found in {path}")]
    NoTestCases { path: PathBuf },

    #[error("failed to read test suite definition {path}: {source}")]
    ReadSuite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse test suite definition {path}: {source}")]
    ParseSuite {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
}

/// Errors from sampling the target's memory endpoint.
#[derive(Error, Debug)]
pub enum MemoryProbeError {
    #[error("memory endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("memory endpoint returned unparseable stats: {0}")]
    Parse(#[from] serde_json::Error),
}
