//! Flat run configuration, loaded from an XML document with documented
//! defaults for every field. Most values can be overridden from the
//! command line.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::fs::FileSystem;

const DEFAULT_API_NAME: &str = "Default_API_NAME";
const DEFAULT_TARGET_HOST: &str = "localhost";
const DEFAULT_TARGET_PORT: &str = "8080";
const DEFAULT_NUM_ITERATIONS: u32 = 1000;
const DEFAULT_ALLOWABLE_PEAK_MEMORY_VARIANCE: f64 = 15.0;
const DEFAULT_ALLOWABLE_SERVICE_RESPONSE_TIME_VARIANCE: f64 = 15.0;
const DEFAULT_TEST_CASE_DIR: &str = "./definitions/testCases";
const DEFAULT_TEST_SUITE_DIR: &str = "./definitions/testSuites";
const DEFAULT_BASE_STATS_OUTPUT_DIR: &str = "./envStats";
const DEFAULT_REPORT_OUTPUT_DIR: &str = "./report";
const DEFAULT_CONCURRENT_USERS: u32 = 1;
const DEFAULT_MEMORY_ENDPOINT: &str = "/debug/vars";
const DEFAULT_REQUEST_DELAY_MS: u64 = 1;
const DEFAULT_TPS_FREQ_SECS: u64 = 30;
const DEFAULT_RAMP_USERS: u32 = 0;
const DEFAULT_RAMP_DELAY_SECS: u64 = 10;

/// All settings consumed by a run.
///
/// Deserialized from `config.xml`; the run-control flags at the bottom are
/// only settable from the command line and are skipped during parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "config", default)]
pub struct Config {
    #[serde(rename = "apiName")]
    pub api_name: String,
    #[serde(rename = "targetHost")]
    pub target_host: String,
    #[serde(rename = "targetPort")]
    pub target_port: String,
    #[serde(rename = "numIterations")]
    pub num_iterations: u32,
    #[serde(rename = "allowablePeakMemoryVariance")]
    pub allowable_peak_memory_variance: f64,
    #[serde(rename = "allowableServiceResponseTimeVariance")]
    pub allowable_service_response_time_variance: f64,
    #[serde(rename = "testCaseDir")]
    pub test_case_dir: String,
    #[serde(rename = "testSuiteDir")]
    pub test_suite_dir: String,
    #[serde(rename = "baseStatsOutputDir")]
    pub base_stats_output_dir: String,
    #[serde(rename = "reportOutputDir")]
    pub report_output_dir: String,
    #[serde(rename = "concurrentUsers")]
    pub concurrent_users: u32,
    #[serde(rename = "testSuite")]
    pub test_suite: String,
    #[serde(rename = "memoryEndpoint")]
    pub memory_endpoint: String,
    #[serde(rename = "requestDelay")]
    pub request_delay_ms: u64,
    #[serde(rename = "TPSFreq")]
    pub tps_freq_secs: u64,
    #[serde(rename = "rampUsers")]
    pub ramp_users: u32,
    #[serde(rename = "rampDelay")]
    pub ramp_delay_secs: u64,
    #[serde(rename = "skipMemCheck")]
    pub skip_mem_check: bool,

    /// Training mode: generate base statistics instead of comparing.
    #[serde(skip)]
    pub gbs: bool,
    /// Overwrite baseline memory figures from this run.
    #[serde(skip)]
    pub rebase_memory: bool,
    /// Overwrite every baseline figure from this run, response times
    /// included.
    #[serde(skip)]
    pub rebase_all: bool,
    /// Identifier of the machine the test runs on; part of the baseline
    /// file name.
    #[serde(skip)]
    pub execution_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_name: DEFAULT_API_NAME.to_string(),
            target_host: DEFAULT_TARGET_HOST.to_string(),
            target_port: DEFAULT_TARGET_PORT.to_string(),
            num_iterations: DEFAULT_NUM_ITERATIONS,
            allowable_peak_memory_variance: DEFAULT_ALLOWABLE_PEAK_MEMORY_VARIANCE,
            allowable_service_response_time_variance:
                DEFAULT_ALLOWABLE_SERVICE_RESPONSE_TIME_VARIANCE,
            test_case_dir: DEFAULT_TEST_CASE_DIR.to_string(),
            test_suite_dir: DEFAULT_TEST_SUITE_DIR.to_string(),
            base_stats_output_dir: DEFAULT_BASE_STATS_OUTPUT_DIR.to_string(),
            report_output_dir: DEFAULT_REPORT_OUTPUT_DIR.to_string(),
            concurrent_users: DEFAULT_CONCURRENT_USERS,
            test_suite: String::new(),
            memory_endpoint: DEFAULT_MEMORY_ENDPOINT.to_string(),
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            tps_freq_secs: DEFAULT_TPS_FREQ_SECS,
            ramp_users: DEFAULT_RAMP_USERS,
            ramp_delay_secs: DEFAULT_RAMP_DELAY_SECS,
            skip_mem_check: false,
            gbs: false,
            rebase_memory: false,
            rebase_all: false,
            execution_host: DEFAULT_TARGET_HOST.to_string(),
        }
    }
}

impl Config {
    /// Load a configuration document through the filesystem abstraction.
    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let xml = fs.read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        quick_xml::de::from_str(&xml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Clamp out-of-range values back to their defaults and log the
    /// effective settings.
    pub fn validate(&mut self) {
        if self.api_name.trim().is_empty() {
            self.api_name = DEFAULT_API_NAME.to_string();
        }
        if self.target_host.trim().is_empty() {
            self.target_host = DEFAULT_TARGET_HOST.to_string();
        }
        if self.target_port.trim().is_empty() {
            self.target_port = DEFAULT_TARGET_PORT.to_string();
        }
        if self.num_iterations < 1 {
            self.num_iterations = DEFAULT_NUM_ITERATIONS;
        }
        if self.concurrent_users < 1 {
            self.concurrent_users = DEFAULT_CONCURRENT_USERS;
        }
        if self.allowable_peak_memory_variance < 0.0 {
            self.allowable_peak_memory_variance = DEFAULT_ALLOWABLE_PEAK_MEMORY_VARIANCE;
        }
        if self.allowable_service_response_time_variance < 0.0 {
            self.allowable_service_response_time_variance =
                DEFAULT_ALLOWABLE_SERVICE_RESPONSE_TIME_VARIANCE;
        }
        if self.test_case_dir.trim().is_empty() {
            self.test_case_dir = DEFAULT_TEST_CASE_DIR.to_string();
        }
        if self.base_stats_output_dir.trim().is_empty() {
            self.base_stats_output_dir = DEFAULT_BASE_STATS_OUTPUT_DIR.to_string();
        }
        if self.report_output_dir.trim().is_empty() {
            self.report_output_dir = DEFAULT_REPORT_OUTPUT_DIR.to_string();
        }
        if self.memory_endpoint.trim().is_empty() {
            self.memory_endpoint = DEFAULT_MEMORY_ENDPOINT.to_string();
        }
        if self.request_delay_ms < 1 {
            self.request_delay_ms = DEFAULT_REQUEST_DELAY_MS;
        }
        if self.tps_freq_secs < 1 {
            self.tps_freq_secs = DEFAULT_TPS_FREQ_SECS;
        }
        if self.ramp_delay_secs < 1 {
            self.ramp_delay_secs = DEFAULT_RAMP_DELAY_SECS;
        }
        if self.execution_host.trim().is_empty() {
            self.execution_host = DEFAULT_TARGET_HOST.to_string();
        }

        tracing::info!(
            api_name = %self.api_name,
            target_host = %self.target_host,
            target_port = %self.target_port,
            num_iterations = self.num_iterations,
            concurrent_users = self.concurrent_users,
            allowable_peak_memory_variance = self.allowable_peak_memory_variance,
            allowable_service_response_time_variance =
                self.allowable_service_response_time_variance,
            test_case_dir = %self.test_case_dir,
            test_suite_dir = %self.test_suite_dir,
            test_suite = %self.test_suite,
            memory_endpoint = %self.memory_endpoint,
            base_stats_output_dir = %self.base_stats_output_dir,
            report_output_dir = %self.report_output_dir,
            gbs = self.gbs,
            rebase_memory = self.rebase_memory,
            rebase_all = self.rebase_all,
            execution_host = %self.execution_host,
            request_delay_ms = self.request_delay_ms,
            tps_freq_secs = self.tps_freq_secs,
            ramp_users = self.ramp_users,
            ramp_delay_secs = self.ramp_delay_secs,
            skip_mem_check = self.skip_mem_check,
            "Effective configuration settings"
        );
    }

    /// Canonical baseline file name for this host and API.
    pub fn baseline_file_name(&self) -> String {
        format!("{}-{}-perfBaseStats", self.execution_host, self.api_name)
    }

    /// Full path of the baseline file of record.
    pub fn baseline_path(&self) -> PathBuf {
        Path::new(&self.base_stats_output_dir).join(self.baseline_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.api_name, "Default_API_NAME");
        assert_eq!(config.target_port, "8080");
        assert_eq!(config.num_iterations, 1000);
        assert_eq!(config.allowable_peak_memory_variance, 15.0);
        assert_eq!(config.memory_endpoint, "/debug/vars");
        assert!(!config.skip_mem_check);
        assert!(!config.gbs);
    }

    #[test]
    fn load_parses_xml_and_fills_missing_fields_with_defaults() {
        let fs = MemoryFileSystem::new();
        fs.put(
            "/etc/perfbase/config.xml",
            br#"<config>
                    <apiName>orders-api</apiName>
                    <targetHost>svc.internal</targetHost>
                    <targetPort>9000</targetPort>
                    <numIterations>50</numIterations>
                    <skipMemCheck>true</skipMemCheck>
                </config>"#
                .to_vec(),
        );

        let config = Config::load(Path::new("/etc/perfbase/config.xml"), &fs).unwrap();
        assert_eq!(config.api_name, "orders-api");
        assert_eq!(config.target_host, "svc.internal");
        assert_eq!(config.num_iterations, 50);
        assert!(config.skip_mem_check);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.test_case_dir, "./definitions/testCases");
        assert_eq!(config.allowable_service_response_time_variance, 15.0);
    }

    #[test]
    fn validate_clamps_out_of_range_values() {
        let mut config = Config {
            api_name: "   ".to_string(),
            num_iterations: 0,
            allowable_peak_memory_variance: -3.0,
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.api_name, "Default_API_NAME");
        assert_eq!(config.num_iterations, 1000);
        assert_eq!(config.allowable_peak_memory_variance, 15.0);
    }

    #[test]
    fn baseline_path_follows_naming_convention() {
        let config = Config {
            execution_host: "perf01".to_string(),
            api_name: "orders".to_string(),
            base_stats_output_dir: "/var/envStats".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.baseline_path(),
            PathBuf::from("/var/envStats/perf01-orders-perfBaseStats")
        );
    }
}
