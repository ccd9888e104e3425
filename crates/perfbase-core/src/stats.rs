//! Statistics engine: trimmed averages, signed variance percentages, and
//! per-run performance aggregation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::StatsError;

/// How a run's timing samples are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Baseline generation: every sample counts.
    Training,
    /// Comparison against a baseline: the slowest 10% of samples are
    /// dropped before averaging.
    Evaluation,
}

/// Average a set of response times, in nanoseconds.
///
/// Samples are sorted ascending; in [`TestMode::Evaluation`] the top
/// `floor(n * 0.1)` samples are discarded before the mean is taken. The
/// mean truncates toward zero. An empty input is a hard error, never a
/// silent zero.
pub fn trimmed_average(samples: &[i64], mode: TestMode) -> Result<i64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySamples);
    }

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    if mode == TestMode::Evaluation {
        let outliers = (sorted.len() as f64 * 0.1) as usize;
        sorted.truncate(sorted.len() - outliers);
    }

    let total: i64 = sorted.iter().sum();
    Ok(total / sorted.len() as i64)
}

/// Signed percentage variance of a current measurement against a baseline.
///
/// Positive means the current measurement grew past the baseline
/// (regression); negative or zero means improvement or no change. A zero
/// baseline is a hard error, never a silent zero or infinity.
pub fn variance_percentage(current: f64, baseline: f64) -> Result<f64, StatsError> {
    if baseline == 0.0 {
        return Err(StatsError::ZeroBaseline);
    }

    if baseline < current {
        Ok((current - baseline) / baseline * 100.0)
    } else {
        Ok(-((baseline - current) / baseline * 100.0))
    }
}

/// Whether an observed variance is within the allowable threshold.
///
/// The comparison is signed: a large negative variance (a big improvement)
/// always passes; only variance exceeding the positive allowable threshold
/// fails.
pub fn is_variance_acceptable(allowable: f64, observed: f64) -> bool {
    allowable >= observed
}

/// Transactions per second over a wall-clock window. No smoothing.
pub fn transactions_per_second(iterations: u64, elapsed: Duration) -> f64 {
    iterations as f64 / elapsed.as_secs_f64()
}

/// Test partition marker: a transaction count boundary labelled with the
/// test that starts there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPartition {
    pub count: u64,
    pub test_name: String,
}

/// Aggregated performance statistics for one run.
///
/// Created at run start, mutated as test cases execute (through
/// [`RunRecorder`]), finalized at run end. Owned exclusively by the run.
#[derive(Debug, Clone, Default)]
pub struct PerfStats {
    pub peak_memory: u64,
    pub service_response_times: HashMap<String, i64>,
    pub service_trans_count: HashMap<String, u64>,
    pub service_error_count: HashMap<String, u64>,
    pub service_tps: HashMap<String, f64>,
    pub overall_trans_count: u64,
    pub overall_error_count: u64,
    pub overall_tps: f64,
    pub memory_audit: Vec<u64>,
    pub test_partitions: Vec<TestPartition>,
    pub test_time_start: Option<DateTime<Utc>>,
    pub test_time_end: Option<DateTime<Utc>>,
}

impl PerfStats {
    /// Run start time as a human-readable timestamp.
    pub fn formatted_time_start(&self) -> String {
        self.test_time_start.map(|t| t.to_rfc2822()).unwrap_or_default()
    }

    /// Run end time as a human-readable timestamp.
    pub fn formatted_time_end(&self) -> String {
        self.test_time_end.map(|t| t.to_rfc2822()).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct RecorderInner {
    response_times: HashMap<String, Vec<i64>>,
    trans_count: HashMap<String, u64>,
    error_count: HashMap<String, u64>,
    memory_audit: Vec<u64>,
    partitions: Vec<TestPartition>,
    overall_trans: u64,
    overall_errors: u64,
}

/// Lock-protected collector that concurrent workers write into while test
/// cases execute. [`RunRecorder::finalize`] turns the raw samples into a
/// [`PerfStats`] using the statistics engine.
#[derive(Debug)]
pub struct RunRecorder {
    inner: Mutex<RecorderInner>,
    started_wall: DateTime<Utc>,
    started: Instant,
}

impl RunRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RecorderInner::default()),
            started_wall: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Record a passed test case execution with its timing sample.
    pub fn record_success(&self, test: &str, elapsed_nanos: u64) {
        let mut inner = self.inner.lock().expect("recorder lock poisoned");
        inner
            .response_times
            .entry(test.to_string())
            .or_default()
            .push(elapsed_nanos as i64);
        *inner.trans_count.entry(test.to_string()).or_default() += 1;
        inner.overall_trans += 1;
    }

    /// Record a failed test case execution. Failures contribute nothing to
    /// timing statistics.
    pub fn record_failure(&self, test: &str) {
        let mut inner = self.inner.lock().expect("recorder lock poisoned");
        *inner.trans_count.entry(test.to_string()).or_default() += 1;
        *inner.error_count.entry(test.to_string()).or_default() += 1;
        inner.overall_trans += 1;
        inner.overall_errors += 1;
    }

    /// Record a target-process memory sample, in bytes.
    pub fn record_memory(&self, sample: u64) {
        let mut inner = self.inner.lock().expect("recorder lock poisoned");
        inner.memory_audit.push(sample);
    }

    /// Mark a partition boundary at the current overall transaction count.
    pub fn mark_partition(&self, test: &str) {
        let mut inner = self.inner.lock().expect("recorder lock poisoned");
        let count = inner.overall_trans;
        inner.partitions.push(TestPartition {
            count,
            test_name: test.to_string(),
        });
    }

    /// Number of timing samples recorded so far for a test case.
    pub fn sample_count(&self, test: &str) -> usize {
        let inner = self.inner.lock().expect("recorder lock poisoned");
        inner.response_times.get(test).map(Vec::len).unwrap_or(0)
    }

    /// Collapse the raw samples into final run statistics.
    ///
    /// Each service's representative response time is the trimmed average
    /// of its samples under the given mode. Services whose every execution
    /// failed have no timing samples and are omitted from the response-time
    /// map; their error counters still tell the story.
    pub fn finalize(self, mode: TestMode) -> Result<PerfStats, StatsError> {
        let elapsed = self.started.elapsed();
        let inner = self.inner.into_inner().expect("recorder lock poisoned");

        let mut service_response_times = HashMap::new();
        for (test, samples) in &inner.response_times {
            if samples.is_empty() {
                continue;
            }
            service_response_times.insert(test.clone(), trimmed_average(samples, mode)?);
        }

        let mut service_tps = HashMap::new();
        for (test, count) in &inner.trans_count {
            service_tps.insert(test.clone(), transactions_per_second(*count, elapsed));
        }

        Ok(PerfStats {
            peak_memory: inner.memory_audit.iter().copied().max().unwrap_or(0),
            service_response_times,
            service_trans_count: inner.trans_count,
            service_error_count: inner.error_count,
            service_tps,
            overall_trans_count: inner.overall_trans,
            overall_error_count: inner.overall_errors,
            overall_tps: transactions_per_second(inner.overall_trans, elapsed),
            memory_audit: inner.memory_audit,
            test_partitions: inner.partitions,
            test_time_start: Some(self.started_wall),
            test_time_end: Some(Utc::now()),
        })
    }
}

impl Default for RunRecorder {
    fn default() -> Self {
        Self::new()
    }
}
