//! Perfbase CLI: run an HTTP performance test suite against a target
//! service, either training a new baseline or judging the run against an
//! existing one.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use perfbase_core::baseline::BaselineGovernor;
use perfbase_core::fs::{FileSystem, OsFileSystem};
use perfbase_core::stats::TestMode;
use perfbase_core::{BasePerfStats, Config};
use perfbase_runner::run::{TestRun, assess};
use perfbase_runner::TestSuite;

#[derive(Parser, Debug)]
#[command(name = "perfbase", version)]
#[command(about = "Repeatable HTTP performance tests judged against a recorded baseline")]
struct Cli {
    /// Path to the XML configuration file
    #[arg(long, default_value = "config.xml")]
    config: PathBuf,

    /// Generate base statistics (training mode) instead of comparing
    #[arg(long)]
    gbs: bool,

    /// Overwrite baseline memory figures from this run
    #[arg(long)]
    rebase_memory: bool,

    /// Overwrite every baseline figure from this run, response times included
    #[arg(long)]
    rebase_all: bool,

    /// Target host override
    #[arg(long)]
    target_host: Option<String>,

    /// Target port override
    #[arg(long)]
    target_port: Option<String>,

    /// Identifier of the machine running the test (part of the baseline
    /// file name); defaults to $HOSTNAME
    #[arg(long)]
    execution_host: Option<String>,
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();

    let cli = Cli::parse();
    let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem);

    let mut config = match Config::load(&cli.config, fs.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    config.gbs = cli.gbs;
    config.rebase_memory = cli.rebase_memory;
    config.rebase_all = cli.rebase_all;
    if let Some(host) = cli.target_host {
        config.target_host = host;
    }
    if let Some(port) = cli.target_port {
        config.target_port = port;
    }
    config.execution_host = cli
        .execution_host
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_default();
    config.validate();

    let suite = match TestSuite::build(&config, fs.as_ref()) {
        Ok(suite) => suite,
        Err(err) => {
            tracing::error!(error = %err, "Failed to build test suite");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(suite = %suite.name, test_cases = suite.len(), "Test suite ready");

    let governor = BaselineGovernor::new(Arc::clone(&fs));
    if config.gbs {
        train(&config, &suite, &governor)
    } else {
        compare(&config, &suite, &governor)
    }
}

/// Training mode: run the suite, merge the measurements into the baseline,
/// and persist it. A persistence failure halts the process.
fn train(config: &Config, suite: &TestSuite, governor: &BaselineGovernor) -> ExitCode {
    tracing::info!("Training run: generating base performance statistics");

    let perf = match run_suite(config, suite, TestMode::Training) {
        Ok(perf) => perf,
        Err(code) => return code,
    };

    let mut baseline = match governor.load(config) {
        Ok(existing) => existing,
        Err(_) => BasePerfStats::default(),
    };
    if let Err(err) = governor.generate(&perf, &mut baseline, config) {
        tracing::error!(error = %err, "Failed to persist baseline");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Comparison mode: refuse to run unless the baseline is ready, then judge
/// the fresh measurements against it.
fn compare(config: &Config, suite: &TestSuite, governor: &BaselineGovernor) -> ExitCode {
    let Some(baseline) = governor.is_ready_for_test(config, suite.len()) else {
        tracing::error!("Baseline is not ready for test; run with --gbs to generate one");
        return ExitCode::FAILURE;
    };

    let perf = match run_suite(config, suite, TestMode::Evaluation) {
        Ok(perf) => perf,
        Err(code) => return code,
    };

    let assessment = match assess(&perf, &baseline, config) {
        Ok(assessment) => assessment,
        Err(err) => {
            tracing::error!(error = %err, "Failed to assess run against baseline");
            return ExitCode::FAILURE;
        }
    };

    if let Some(memory) = &assessment.memory {
        tracing::info!(
            peak_memory = memory.peak_memory,
            base_peak_memory = memory.base_peak_memory,
            variance_percent = memory.variance_percent,
            acceptable = memory.acceptable,
            "Peak memory comparison"
        );
    }
    for service in &assessment.services {
        tracing::info!(
            service = %service.service,
            average_nanos = ?service.average_nanos,
            baseline_nanos = service.baseline_nanos,
            variance_percent = ?service.variance_percent,
            acceptable = service.acceptable,
            "Service response time comparison"
        );
    }

    if assessment.passed {
        tracing::info!("Run PASSED: all variances within allowable thresholds");
        ExitCode::SUCCESS
    } else {
        tracing::error!("Run FAILED: variance exceeded allowable thresholds");
        ExitCode::FAILURE
    }
}

fn run_suite(
    config: &Config,
    suite: &TestSuite,
    mode: TestMode,
) -> Result<perfbase_core::PerfStats, ExitCode> {
    let run = TestRun::new(config);
    for iteration in 0..config.num_iterations {
        run.execute_pass(suite);
        if iteration == 0 {
            tracing::info!(variables = run.store().len(), "First pass complete");
        }
    }

    run.finalize(mode).map_err(|err| {
        tracing::error!(error = %err, "Run produced no usable statistics");
        ExitCode::FAILURE
    })
}
