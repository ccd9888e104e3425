//! Baseline governor: load, validate, merge, and persist the recorded
//! performance baseline a run is judged against.
//!
//! The baseline file of record is a JSON document at
//! `<baseStatsOutputDir>/<executionHost>-<apiName>-perfBaseStats`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::BaselineError;
use crate::fs::FileSystem;
use crate::stats::PerfStats;

/// Persisted baseline record. Field names match the JSON file contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasePerfStats {
    #[serde(rename = "GenerationDate", default)]
    pub generation_date: String,
    #[serde(rename = "ModifiedDate", default)]
    pub modified_date: String,
    #[serde(rename = "BasePeakMemory", default)]
    pub base_peak_memory: u64,
    #[serde(rename = "BaseServiceResponseTimes", default)]
    pub base_service_response_times: HashMap<String, i64>,
    #[serde(rename = "MemoryAudit", default)]
    pub memory_audit: Vec<u64>,
}

/// How a fresh run's measurements are merged into an existing baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebaseOptions {
    /// Overwrite peak memory and the memory audit even when already set.
    pub rebase_memory: bool,
    /// Overwrite everything, existing response-time entries included.
    /// Without this flag response times are only ever filled when empty.
    pub rebase_all: bool,
}

impl RebaseOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rebase_memory: config.rebase_memory,
            rebase_all: config.rebase_all,
        }
    }
}

/// Governs the lifecycle of the baseline file: load and readiness
/// validation for comparison runs, merge and persist for training runs.
///
/// Not safe for concurrent invocation against the same baseline file;
/// exactly one rebase-and-persist per run is assumed.
pub struct BaselineGovernor {
    fs: Arc<dyn FileSystem>,
}

impl BaselineGovernor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read and deserialize the baseline file named by the configured
    /// host/API convention.
    pub fn load(&self, config: &Config) -> Result<BasePerfStats, BaselineError> {
        let path = config.baseline_path();
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|source| BaselineError::Read {
                path: path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| BaselineError::Parse { path, source })
    }

    /// Decide whether a comparison run may proceed.
    ///
    /// Returns the loaded baseline when it is complete and covers exactly
    /// the configured number of test cases; otherwise logs the specific
    /// cause and returns `None`, and the run must not enter comparison
    /// mode.
    pub fn is_ready_for_test(&self, config: &Config, num_test_cases: usize) -> Option<BasePerfStats> {
        let baseline = match self.load(config) {
            Ok(baseline) => baseline,
            Err(err) => {
                tracing::error!(
                    execution_host = %config.execution_host,
                    error = %err,
                    "Failed to load base performance stats"
                );
                return None;
            }
        };

        if !validate_base_perf_stats(&baseline, config) {
            tracing::error!(
                execution_host = %config.execution_host,
                "Base performance stats are not fully populated"
            );
            return None;
        }

        let baseline_count = baseline.base_service_response_times.len();
        tracing::info!(defined = num_test_cases, baseline = baseline_count, "Test case coverage");
        if baseline_count != num_test_cases {
            tracing::error!(
                defined = num_test_cases,
                baseline = baseline_count,
                "The number of test definitions does not equal the number of baseline metrics"
            );
            return None;
        }

        Some(baseline)
    }

    /// Merge a fresh run's measurements into the baseline.
    ///
    /// Memory figures are overwritten when absent or when a memory rebase
    /// was requested. Response times are only filled for services with no
    /// existing entry, unless `rebase_all` explicitly forces overwrite.
    /// Returns true when any field changed.
    pub fn rebase(
        &self,
        perf: &PerfStats,
        baseline: &mut BasePerfStats,
        options: RebaseOptions,
    ) -> bool {
        let mut modified = false;
        let rebase_memory = options.rebase_memory || options.rebase_all;

        if baseline.base_peak_memory == 0 || rebase_memory {
            baseline.base_peak_memory = perf.peak_memory;
            modified = true;
        }
        if baseline.memory_audit.is_empty() || rebase_memory {
            baseline.memory_audit = perf.memory_audit.clone();
            modified = true;
        }

        for (service, response_time) in &perf.service_response_times {
            let existing = baseline
                .base_service_response_times
                .get(service)
                .copied()
                .unwrap_or(0);
            if existing == 0 || options.rebase_all {
                baseline
                    .base_service_response_times
                    .insert(service.clone(), *response_time);
                modified = true;
            }
        }

        let now = Utc::now().to_rfc2822();
        if baseline.generation_date.is_empty() {
            baseline.generation_date = now.clone();
        }
        if modified {
            baseline.modified_date = now;
        }
        modified
    }

    /// Serialize the baseline to its canonical path, creating the output
    /// directory if absent. Any failure here is fatal to baseline
    /// generation; the caller must stop rather than continue with a
    /// partially written baseline.
    pub fn persist(
        &self,
        baseline: &BasePerfStats,
        config: &Config,
    ) -> Result<(), BaselineError> {
        let json = serde_json::to_vec(baseline).map_err(BaselineError::Serialize)?;

        let out_dir = Path::new(&config.base_stats_output_dir);
        self.fs
            .create_dir_all(out_dir)
            .map_err(|source| BaselineError::CreateDir {
                path: out_dir.to_path_buf(),
                source,
            })?;

        let path = config.baseline_path();
        self.fs
            .write(&path, &json)
            .map_err(|source| BaselineError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "Baseline persisted");
        Ok(())
    }

    /// Training entry point: merge this run's measurements into the
    /// baseline and write the result to disk.
    pub fn generate(
        &self,
        perf: &PerfStats,
        baseline: &mut BasePerfStats,
        config: &Config,
    ) -> Result<(), BaselineError> {
        self.rebase(perf, baseline, RebaseOptions::from_config(config));
        self.persist(baseline, config)
    }
}

fn validate_base_perf_stats(baseline: &BasePerfStats, config: &Config) -> bool {
    let mut valid = true;

    if !config.skip_mem_check {
        if baseline.base_peak_memory == 0 {
            tracing::error!("Baseline peak memory is not populated");
            valid = false;
        }
        if baseline.memory_audit.is_empty() {
            tracing::error!("Baseline memory audit is empty");
            valid = false;
        }
    }
    if baseline.generation_date.is_empty() {
        tracing::error!("Baseline generation date is empty");
        valid = false;
    }
    if baseline.modified_date.is_empty() {
        tracing::error!("Baseline modified date is empty");
        valid = false;
    }
    if baseline.base_service_response_times.is_empty() {
        tracing::error!("Baseline has no service response times");
        valid = false;
    } else {
        for (service, response_time) in &baseline.base_service_response_times {
            if *response_time <= 0 {
                tracing::error!(service = %service, "Baseline response time is not positive");
                valid = false;
                break;
            }
        }
    }
    valid
}
