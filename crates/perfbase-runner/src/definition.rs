//! Test case and test suite definitions, deserialized from XML documents.
//!
//! Two strategies exist for assembling a suite: service-based, where every
//! file in the test-case directory becomes one test case, and suite-based,
//! where a suite file names an explicit ordered list of test case files.
//! Declared order is the execution order; chained test cases rely on it.

use std::path::Path;

use serde::Deserialize;

use perfbase_core::Config;
use perfbase_core::fs::FileSystem;

use crate::error::SuiteError;

/// One HTTP header to attach to an outgoing request. The key is an XML
/// attribute, the value is the element text; values are never templated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Header {
    #[serde(rename = "@key")]
    pub key: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// One field of a multipart request body: either a plain form field or,
/// when a file name is present, a file part carrying raw bytes
/// (base64-encoded in the XML).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultipartField {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "fieldValue", default)]
    pub field_value: String,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "fileContent", default)]
    pub file_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct HeaderList {
    #[serde(rename = "header", default)]
    header: Vec<Header>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MultipartPayload {
    #[serde(rename = "multipartFormField", default)]
    multipart_form_field: Vec<MultipartField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResponseProperties {
    #[serde(rename = "value", default)]
    value: Vec<String>,
}

fn default_status_code() -> u16 {
    200
}

/// Specification of one HTTP call. Immutable once loaded; owned by the
/// suite.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "testDefinition")]
pub struct TestDefinition {
    #[serde(rename = "testName")]
    pub test_name: String,
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(rename = "baseUri", default)]
    pub base_uri: String,
    #[serde(rename = "multipart", default)]
    pub multipart: bool,
    #[serde(rename = "payload", default)]
    pub payload: Option<String>,
    #[serde(rename = "multipartPayload", default)]
    multipart_payload: MultipartPayload,
    #[serde(rename = "responseStatusCode", default = "default_status_code")]
    pub response_status_code: u16,
    #[serde(rename = "headers", default)]
    headers: HeaderList,
    #[serde(rename = "responseProperties", default)]
    response_properties: ResponseProperties,
}

impl TestDefinition {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers.header
    }

    pub fn multipart_fields(&self) -> &[MultipartField] {
        &self.multipart_payload.multipart_form_field
    }

    /// Names of the response properties to extract after a validated
    /// response.
    pub fn response_properties(&self) -> &[String] {
        &self.response_properties.value
    }
}

/// How a suite's test cases were assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TestStrategy {
    #[default]
    #[serde(rename = "ServiceBased")]
    ServiceBased,
    #[serde(rename = "SuiteBased")]
    SuiteBased,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TestCaseRefs {
    #[serde(rename = "testCase", default)]
    test_case: Vec<String>,
}

/// A suite definition file: a name, a strategy tag, and an ordered list of
/// test case file names.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "testSuite")]
pub struct TestSuiteDefinition {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "testStrategy", default)]
    pub test_strategy: TestStrategy,
    #[serde(rename = "testCases", default)]
    test_cases: TestCaseRefs,
}

impl TestSuiteDefinition {
    pub fn test_cases(&self) -> &[String] {
        &self.test_cases.test_case
    }
}

/// Fully loaded, ordered collection of test definitions executed as one
/// logical run. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    pub name: String,
    pub strategy: TestStrategy,
    pub test_cases: Vec<TestDefinition>,
}

impl TestSuite {
    /// Build the suite from the configured definition sources.
    ///
    /// With no suite configured, every file in the test-case directory is
    /// one test case (service-based). Otherwise the named suite file is
    /// read and each listed test case file is loaded in declared order.
    /// Individual unreadable or unparseable test files are logged and
    /// skipped; an empty result is an error.
    pub fn build(config: &Config, fs: &dyn FileSystem) -> Result<Self, SuiteError> {
        tracing::info!("Building test suite");

        if config.test_suite.is_empty() {
            let dir = Path::new(&config.test_case_dir);
            let files = fs.read_dir(dir).map_err(|source| SuiteError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;

            let mut suite = TestSuite {
                name: "Default".to_string(),
                strategy: TestStrategy::ServiceBased,
                test_cases: Vec::new(),
            };
            for file in &files {
                if let Some(definition) = load_test_case(fs, file) {
                    suite.test_cases.push(definition);
                }
            }
            if suite.test_cases.is_empty() {
                return Err(SuiteError::NoTestCases {
                    path: dir.to_path_buf(),
                });
            }
            Ok(suite)
        } else {
            let suite_path = Path::new(&config.test_suite_dir).join(&config.test_suite);
            let xml = fs
                .read_to_string(&suite_path)
                .map_err(|source| SuiteError::ReadSuite {
                    path: suite_path.clone(),
                    source,
                })?;
            let definition: TestSuiteDefinition = quick_xml::de::from_str(&xml).map_err(
                |source| SuiteError::ParseSuite {
                    path: suite_path.clone(),
                    source,
                },
            )?;

            let mut suite = TestSuite {
                name: definition.name.clone(),
                strategy: definition.test_strategy,
                test_cases: Vec::new(),
            };
            for file_name in definition.test_cases() {
                let path = Path::new(&config.test_case_dir).join(file_name);
                if let Some(test_case) = load_test_case(fs, &path) {
                    suite.test_cases.push(test_case);
                }
            }
            if suite.test_cases.is_empty() {
                return Err(SuiteError::NoTestCases {
                    path: suite_path,
                });
            }
            Ok(suite)
        }
    }

    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

fn load_test_case(fs: &dyn FileSystem, path: &Path) -> Option<TestDefinition> {
    let xml = match fs.read_to_string(path) {
        Ok(xml) => xml,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable test file");
            return None;
        }
    };
    match TestDefinition::from_xml(&xml) {
        Ok(definition) => Some(definition),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping unparseable test file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfbase_core::MemoryFileSystem;

    const CASE_A: &str = r#"<testDefinition>
        <testName>createOrder</testName>
        <httpMethod>POST</httpMethod>
        <baseUri>/orders</baseUri>
        <payload>&lt;order&gt;new&lt;/order&gt;</payload>
        <responseStatusCode>201</responseStatusCode>
        <headers>
            <header key="Content-Type">application/xml</header>
        </headers>
        <responseProperties>
            <value>orderId</value>
        </responseProperties>
    </testDefinition>"#;

    const CASE_B: &str = r#"<testDefinition>
        <testName>getOrder</testName>
        <httpMethod>GET</httpMethod>
        <baseUri>/orders/lookup</baseUri>
        <payload>&lt;id&gt;{{createOrder.orderId}}&lt;/id&gt;</payload>
        <responseStatusCode>200</responseStatusCode>
    </testDefinition>"#;

    #[test]
    fn parses_a_full_test_definition() {
        let definition = TestDefinition::from_xml(CASE_A).unwrap();
        assert_eq!(definition.test_name, "createOrder");
        assert_eq!(definition.http_method, "POST");
        assert_eq!(definition.base_uri, "/orders");
        assert_eq!(definition.response_status_code, 201);
        assert!(!definition.multipart);
        assert_eq!(definition.payload.as_deref(), Some("<order>new</order>"));
        assert_eq!(definition.headers().len(), 1);
        assert_eq!(definition.headers()[0].key, "Content-Type");
        assert_eq!(definition.headers()[0].value, "application/xml");
        assert_eq!(definition.response_properties(), ["orderId"]);
    }

    #[test]
    fn missing_status_code_defaults_to_200() {
        let xml = r#"<testDefinition>
            <testName>ping</testName>
            <httpMethod>GET</httpMethod>
            <baseUri>/ping</baseUri>
        </testDefinition>"#;
        let definition = TestDefinition::from_xml(xml).unwrap();
        assert_eq!(definition.response_status_code, 200);
        assert!(definition.payload.is_none());
        assert!(definition.headers().is_empty());
    }

    #[test]
    fn parses_multipart_fields() {
        let xml = r#"<testDefinition>
            <testName>upload</testName>
            <httpMethod>POST</httpMethod>
            <baseUri>/upload</baseUri>
            <multipart>true</multipart>
            <multipartPayload>
                <multipartFormField>
                    <fieldName>comment</fieldName>
                    <fieldValue>nightly run</fieldValue>
                </multipartFormField>
                <multipartFormField>
                    <fieldName>archive</fieldName>
                    <fileName>data.bin</fileName>
                    <fileContent>aGVsbG8=</fileContent>
                </multipartFormField>
            </multipartPayload>
        </testDefinition>"#;
        let definition = TestDefinition::from_xml(xml).unwrap();
        assert!(definition.multipart);
        let fields = definition.multipart_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_name, "comment");
        assert!(fields[0].file_name.is_none());
        assert_eq!(fields[1].file_name.as_deref(), Some("data.bin"));
        assert_eq!(fields[1].file_content.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn service_based_suite_loads_every_file_in_the_directory() {
        let fs = MemoryFileSystem::new();
        fs.put("./definitions/testCases/a.xml", CASE_A.as_bytes().to_vec());
        fs.put("./definitions/testCases/b.xml", CASE_B.as_bytes().to_vec());

        let config = Config::default();
        let suite = TestSuite::build(&config, &fs).unwrap();
        assert_eq!(suite.name, "Default");
        assert_eq!(suite.strategy, TestStrategy::ServiceBased);
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn suite_based_suite_preserves_declared_order() {
        let fs = MemoryFileSystem::new();
        fs.put("./definitions/testCases/a.xml", CASE_A.as_bytes().to_vec());
        fs.put("./definitions/testCases/b.xml", CASE_B.as_bytes().to_vec());
        fs.put(
            "./definitions/testSuites/orders.xml",
            br#"<testSuite>
                <name>orderFlow</name>
                <testStrategy>SuiteBased</testStrategy>
                <testCases>
                    <testCase>b.xml</testCase>
                    <testCase>a.xml</testCase>
                </testCases>
            </testSuite>"#
                .to_vec(),
        );

        let config = Config {
            test_suite: "orders.xml".to_string(),
            ..Config::default()
        };
        let suite = TestSuite::build(&config, &fs).unwrap();
        assert_eq!(suite.name, "orderFlow");
        assert_eq!(suite.strategy, TestStrategy::SuiteBased);
        assert_eq!(suite.test_cases[0].test_name, "getOrder");
        assert_eq!(suite.test_cases[1].test_name, "createOrder");
    }

    #[test]
    fn unparseable_test_files_are_skipped() {
        let fs = MemoryFileSystem::new();
        fs.put("./definitions/testCases/a.xml", CASE_A.as_bytes().to_vec());
        fs.put("./definitions/testCases/junk.xml", b"not xml at all".to_vec());

        let suite = TestSuite::build(&Config::default(), &fs).unwrap();
        assert_eq!(suite.len(), 1);
    }

    #[test]
    fn empty_test_case_directory_is_an_error() {
        let fs = MemoryFileSystem::new();
        fs.put("./definitions/testCases/junk.xml", b"<broken".to_vec());

        let err = TestSuite::build(&Config::default(), &fs).unwrap_err();
        assert!(matches!(err, SuiteError::NoTestCases { .. }));
    }

    #[test]
    fn missing_suite_file_is_an_error() {
        let fs = MemoryFileSystem::new();
        let config = Config {
            test_suite: "missing.xml".to_string(),
            ..Config::default()
        };
        let err = TestSuite::build(&config, &fs).unwrap_err();
        assert!(matches!(err, SuiteError::ReadSuite { .. }));
    }
}
