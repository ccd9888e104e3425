//! # Perfbase Runner
//!
//! Executes a test suite against a target HTTP service: builds the suite
//! from XML definitions, fires each request with placeholder substitution
//! and response-property extraction, validates every response, records
//! timings, and judges the finished run against the persisted baseline.

pub mod definition;
pub mod error;
pub mod executor;
pub mod memory;
pub mod run;
pub mod validate;

pub use definition::{
    Header, MultipartField, TestDefinition, TestStrategy, TestSuite, TestSuiteDefinition,
};
pub use error::{MemoryProbeError, SuiteError};
pub use executor::{ExecutionOutcome, FailureKind, RequestExecutor, Verdict};
pub use run::{MemoryAssessment, RunAssessment, ServiceAssessment, TestRun, assess};
