//! Request executor: builds a transport-level HTTP request from a test
//! definition, sends it over a blocking call, times the round trip, and
//! hands the response to validation and extraction.

use std::str::FromStr;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};

use perfbase_core::template;
use perfbase_core::vars::VariableStore;

use crate::definition::TestDefinition;
use crate::validate::{validate_response_body, validate_response_time, validate_status_code};

/// Why a test case execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not be built from its definition (bad method,
    /// non-POST multipart, undecodable file content).
    InvalidRequest,
    /// Connection error or transport-level timeout.
    Transport,
    /// Observed status code differed from the expected one.
    StatusCode,
    /// Response body was empty.
    EmptyBody,
    /// Elapsed time was not strictly positive.
    ResponseTime,
    /// An expected response property was absent from the body.
    Extraction,
}

/// Pass/fail verdict for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(FailureKind),
}

/// Timed, validated result of one test case execution.
///
/// `elapsed_nanos` is meaningful only when the verdict is a pass; a failed
/// execution always reports zero, never a partial timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub elapsed_nanos: u64,
    pub verdict: Verdict,
}

impl ExecutionOutcome {
    fn failed(kind: FailureKind) -> Self {
        Self {
            elapsed_nanos: 0,
            verdict: Verdict::Failed(kind),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

/// Sends test case requests at a single target host and port.
///
/// Each call blocks for the duration of one network round trip. Calls are
/// independent; the executor can be shared across concurrent workers.
pub struct RequestExecutor {
    client: reqwest::blocking::Client,
    target_host: String,
    target_port: String,
}

impl RequestExecutor {
    pub fn new(target_host: impl Into<String>, target_port: impl Into<String>) -> Self {
        Self::with_client(reqwest::blocking::Client::new(), target_host, target_port)
    }

    /// Use a preconfigured client, e.g. one carrying a transport deadline.
    /// A deadline expiry is treated like any other transport failure.
    pub fn with_client(
        client: reqwest::blocking::Client,
        target_host: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            client,
            target_host: target_host.into(),
            target_port: target_port.into(),
        }
    }

    /// Execute one test case: build, send, time, validate, extract.
    pub fn execute(&self, definition: &TestDefinition, store: &VariableStore) -> ExecutionOutcome {
        let method = match Method::from_str(&definition.http_method) {
            Ok(method) => method,
            Err(_) => {
                tracing::error!(
                    test = %definition.test_name,
                    method = %definition.http_method,
                    "Unsupported HTTP method in test definition"
                );
                return ExecutionOutcome::failed(FailureKind::InvalidRequest);
            }
        };

        let url = format!(
            "http://{}:{}{}",
            self.target_host, self.target_port, definition.base_uri
        );
        let mut request = self.client.request(method.clone(), &url);

        if definition.multipart {
            // File-bearing bodies are reserved for POST.
            if method != Method::POST {
                tracing::error!(
                    test = %definition.test_name,
                    method = %definition.http_method,
                    "Multipart request has to be 'POST' method"
                );
                return ExecutionOutcome::failed(FailureKind::InvalidRequest);
            }
            let mut form = Form::new();
            for field in definition.multipart_fields() {
                match &field.file_name {
                    None => {
                        form = form.text(field.field_name.clone(), field.field_value.clone());
                    }
                    Some(file_name) => {
                        let encoded = field.file_content.as_deref().unwrap_or_default();
                        let bytes = match BASE64.decode(encoded) {
                            Ok(bytes) => bytes,
                            Err(err) => {
                                tracing::error!(
                                    test = %definition.test_name,
                                    field = %field.field_name,
                                    error = %err,
                                    "Failed to decode multipart file content"
                                );
                                return ExecutionOutcome::failed(FailureKind::InvalidRequest);
                            }
                        };
                        let part = Part::bytes(bytes).file_name(file_name.clone());
                        form = form.part(field.field_name.clone(), part);
                    }
                }
            }
            request = request.multipart(form);
        } else if let Some(payload) = &definition.payload
            && !payload.is_empty()
        {
            request = request.body(template::substitute(payload, store));
        }

        for header in definition.headers() {
            request = request.header(header.key.as_str(), header.value.as_str());
        }

        let start = Instant::now();
        let response = match request.send() {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    test = %definition.test_name,
                    url = %url,
                    error = %err,
                    "Error firing request"
                );
                return ExecutionOutcome::failed(FailureKind::Transport);
            }
        };
        let elapsed_nanos = start.elapsed().as_nanos() as u64;

        let status = response.status().as_u16();
        let body = match response.text() {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(
                    test = %definition.test_name,
                    error = %err,
                    "Failed to buffer response body"
                );
                return ExecutionOutcome::failed(FailureKind::Transport);
            }
        };

        // All three checks run and log independently.
        let body_ok = validate_response_body(&body, &definition.test_name);
        let code_ok = validate_status_code(status, definition.response_status_code, &definition.test_name);
        let time_ok = validate_response_time(elapsed_nanos, &definition.test_name);

        if !code_ok {
            return ExecutionOutcome::failed(FailureKind::StatusCode);
        }
        if !body_ok {
            return ExecutionOutcome::failed(FailureKind::EmptyBody);
        }
        if !time_ok {
            return ExecutionOutcome::failed(FailureKind::ResponseTime);
        }

        if let Err(err) = template::extract(
            &definition.test_name,
            &body,
            definition.response_properties(),
            store,
        ) {
            tracing::error!(test = %definition.test_name, error = %err, "Response extraction failed");
            return ExecutionOutcome::failed(FailureKind::Extraction);
        }

        ExecutionOutcome {
            elapsed_nanos,
            verdict: Verdict::Passed,
        }
    }
}
