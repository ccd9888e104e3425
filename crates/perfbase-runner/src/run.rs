//! Run orchestration and assessment: drive a sequential pass over a test
//! suite, then judge the aggregated statistics against the baseline.

use std::time::Duration;

use perfbase_core::config::Config;
use perfbase_core::error::StatsError;
use perfbase_core::stats::{
    PerfStats, RunRecorder, TestMode, is_variance_acceptable, variance_percentage,
};
use perfbase_core::{BasePerfStats, VariableStore};

use crate::definition::TestSuite;
use crate::executor::RequestExecutor;
use crate::memory;

/// One logical test run: shared variable store, executor, and recorder.
///
/// A pass executes the suite's test cases in declared order, which is what
/// chained test cases rely on: a producing case completes and applies its
/// extraction to the store strictly before its consumer substitutes.
/// Callers orchestrating concurrent workers must preserve that ordering
/// for any chain using placeholders.
pub struct TestRun<'a> {
    config: &'a Config,
    executor: RequestExecutor,
    probe_client: reqwest::blocking::Client,
    store: VariableStore,
    recorder: RunRecorder,
}

impl<'a> TestRun<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            executor: RequestExecutor::new(&config.target_host, &config.target_port),
            probe_client: reqwest::blocking::Client::new(),
            store: VariableStore::new(),
            recorder: RunRecorder::new(),
            config,
        }
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn recorder(&self) -> &RunRecorder {
        &self.recorder
    }

    /// Execute one sequential pass over the suite, recording a timing
    /// sample per passed case and an error per failed case. Failures do
    /// not stop the pass.
    pub fn execute_pass(&self, suite: &TestSuite) {
        self.recorder.mark_partition(&suite.name);
        self.sample_memory();

        for definition in &suite.test_cases {
            let outcome = self.executor.execute(definition, &self.store);
            if outcome.passed() {
                self.recorder
                    .record_success(&definition.test_name, outcome.elapsed_nanos);
            } else {
                self.recorder.record_failure(&definition.test_name);
            }

            self.sample_memory();
            std::thread::sleep(Duration::from_millis(self.config.request_delay_ms));
        }
    }

    /// Collapse the recorded samples into final run statistics.
    pub fn finalize(self, mode: TestMode) -> Result<PerfStats, StatsError> {
        self.recorder.finalize(mode)
    }

    fn sample_memory(&self) {
        if self.config.skip_mem_check {
            return;
        }
        match memory::sample_memory(
            &self.probe_client,
            &self.config.target_host,
            &self.config.target_port,
            &self.config.memory_endpoint,
        ) {
            Ok(sample) => self.recorder.record_memory(sample),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to sample target memory");
            }
        }
    }
}

/// Peak-memory comparison against the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAssessment {
    pub peak_memory: u64,
    pub base_peak_memory: u64,
    pub variance_percent: f64,
    pub acceptable: bool,
}

/// One service's response-time comparison against the baseline.
///
/// A service whose every execution failed has no measurement; it is
/// reported with no variance and an unacceptable verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAssessment {
    pub service: String,
    pub average_nanos: Option<i64>,
    pub baseline_nanos: i64,
    pub variance_percent: Option<f64>,
    pub acceptable: bool,
}

/// Run-level verdict: every in-scope variance comparison within threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAssessment {
    pub memory: Option<MemoryAssessment>,
    pub services: Vec<ServiceAssessment>,
    pub passed: bool,
}

/// Judge a finished run against the baseline.
///
/// Memory is compared unless the memory check is skipped; every baseline
/// service's response time is compared. The run passes only when every
/// comparison is within its allowable threshold.
pub fn assess(
    perf: &PerfStats,
    baseline: &BasePerfStats,
    config: &Config,
) -> Result<RunAssessment, StatsError> {
    let memory = if config.skip_mem_check {
        None
    } else {
        let variance =
            variance_percentage(perf.peak_memory as f64, baseline.base_peak_memory as f64)?;
        let acceptable = is_variance_acceptable(config.allowable_peak_memory_variance, variance);
        if !acceptable {
            tracing::error!(
                variance_percent = variance,
                allowable_percent = config.allowable_peak_memory_variance,
                "Peak memory variance exceeded allowable threshold"
            );
        }
        Some(MemoryAssessment {
            peak_memory: perf.peak_memory,
            base_peak_memory: baseline.base_peak_memory,
            variance_percent: variance,
            acceptable,
        })
    };

    let mut names: Vec<&String> = baseline.base_service_response_times.keys().collect();
    names.sort();

    let mut services = Vec::with_capacity(names.len());
    for name in names {
        let baseline_nanos = baseline.base_service_response_times[name];
        let assessment = match perf.service_response_times.get(name) {
            Some(average) => {
                let variance = variance_percentage(*average as f64, baseline_nanos as f64)?;
                let acceptable = is_variance_acceptable(
                    config.allowable_service_response_time_variance,
                    variance,
                );
                if !acceptable {
                    tracing::error!(
                        service = %name,
                        variance_percent = variance,
                        allowable_percent = config.allowable_service_response_time_variance,
                        "Service response time variance exceeded allowable threshold"
                    );
                }
                ServiceAssessment {
                    service: name.clone(),
                    average_nanos: Some(*average),
                    baseline_nanos,
                    variance_percent: Some(variance),
                    acceptable,
                }
            }
            None => {
                tracing::error!(service = %name, "Service produced no successful measurements");
                ServiceAssessment {
                    service: name.clone(),
                    average_nanos: None,
                    baseline_nanos,
                    variance_percent: None,
                    acceptable: false,
                }
            }
        };
        services.push(assessment);
    }

    let passed = memory.as_ref().map(|m| m.acceptable).unwrap_or(true)
        && services.iter().all(|s| s.acceptable);

    Ok(RunAssessment {
        memory,
        services,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> Config {
        Config {
            allowable_peak_memory_variance: 15.0,
            allowable_service_response_time_variance: 15.0,
            skip_mem_check: false,
            ..Config::default()
        }
    }

    fn baseline(services: &[(&str, i64)], peak: u64) -> BasePerfStats {
        BasePerfStats {
            generation_date: "gen".to_string(),
            modified_date: "mod".to_string(),
            base_peak_memory: peak,
            base_service_response_times: services
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect(),
            memory_audit: vec![peak],
        }
    }

    fn perf(services: &[(&str, i64)], peak: u64) -> PerfStats {
        PerfStats {
            peak_memory: peak,
            service_response_times: services
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect::<HashMap<_, _>>(),
            ..PerfStats::default()
        }
    }

    #[test]
    fn run_within_thresholds_passes() {
        let assessment = assess(
            &perf(&[("a", 110), ("b", 90)], 1_050),
            &baseline(&[("a", 100), ("b", 100)], 1_000),
            &config(),
        )
        .unwrap();

        assert!(assessment.passed);
        let a = &assessment.services[0];
        assert_eq!(a.service, "a");
        assert_eq!(a.variance_percent, Some(10.0));
        assert!(a.acceptable);
        let b = &assessment.services[1];
        assert_eq!(b.variance_percent, Some(-10.0));
        assert!(b.acceptable);
        assert!(assessment.memory.unwrap().acceptable);
    }

    #[test]
    fn service_regression_fails_the_run() {
        let assessment = assess(
            &perf(&[("a", 120)], 1_000),
            &baseline(&[("a", 100)], 1_000),
            &config(),
        )
        .unwrap();

        assert!(!assessment.passed);
        assert_eq!(assessment.services[0].variance_percent, Some(20.0));
        assert!(!assessment.services[0].acceptable);
    }

    #[test]
    fn memory_regression_fails_the_run_even_when_services_pass() {
        let assessment = assess(
            &perf(&[("a", 100)], 2_000),
            &baseline(&[("a", 100)], 1_000),
            &config(),
        )
        .unwrap();

        assert!(!assessment.passed);
        let memory = assessment.memory.unwrap();
        assert_eq!(memory.variance_percent, 100.0);
        assert!(!memory.acceptable);
    }

    #[test]
    fn memory_check_can_be_skipped() {
        let mut config = config();
        config.skip_mem_check = true;

        let assessment = assess(
            &perf(&[("a", 100)], 9_999_999),
            &baseline(&[("a", 100)], 1),
            &config,
        )
        .unwrap();

        assert!(assessment.memory.is_none());
        assert!(assessment.passed);
    }

    #[test]
    fn big_improvement_always_passes() {
        let assessment = assess(
            &perf(&[("a", 10)], 500),
            &baseline(&[("a", 100)], 1_000),
            &config(),
        )
        .unwrap();

        assert!(assessment.passed);
        assert_eq!(assessment.services[0].variance_percent, Some(-90.0));
    }

    #[test]
    fn service_with_no_measurements_fails_the_run() {
        let assessment = assess(
            &perf(&[], 1_000),
            &baseline(&[("a", 100)], 1_000),
            &config(),
        )
        .unwrap();

        assert!(!assessment.passed);
        assert_eq!(assessment.services[0].average_nanos, None);
        assert_eq!(assessment.services[0].variance_percent, None);
        assert!(!assessment.services[0].acceptable);
    }

    #[test]
    fn zero_memory_baseline_is_a_hard_error() {
        let err = assess(
            &perf(&[("a", 100)], 1_000),
            &baseline(&[("a", 100)], 0),
            &config(),
        )
        .unwrap_err();
        assert_eq!(err, StatsError::ZeroBaseline);
    }
}
