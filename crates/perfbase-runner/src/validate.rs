//! Response validation: three independent checks, all required for a pass.
//!
//! Each failing check logs which test case and which expectation failed.
//! The overall verdict is the logical AND; a failed call contributes
//! nothing to positive statistics.

/// Observed status code must equal the test definition's expected code.
pub fn validate_status_code(actual: u16, expected: u16, test: &str) -> bool {
    if actual == expected {
        true
    } else {
        tracing::error!(
            test = %test,
            actual,
            expected,
            "Incorrect status code returned for service"
        );
        false
    }
}

/// Response body must be non-empty.
pub fn validate_response_body(body: &str, test: &str) -> bool {
    if body.trim().is_empty() {
        tracing::error!(test = %test, "Empty response body returned for service");
        false
    } else {
        true
    }
}

/// Elapsed time must be strictly positive.
pub fn validate_response_time(elapsed_nanos: u64, test: &str) -> bool {
    if elapsed_nanos > 0 {
        true
    } else {
        tracing::error!(test = %test, "Time taken to complete request was 0 nanoseconds");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_must_match_exactly() {
        assert!(validate_status_code(200, 200, "t"));
        assert!(!validate_status_code(500, 200, "t"));
        assert!(!validate_status_code(201, 200, "t"));
    }

    #[test]
    fn body_must_be_non_empty() {
        assert!(validate_response_body("<ok/>", "t"));
        assert!(!validate_response_body("", "t"));
        assert!(!validate_response_body("   \n", "t"));
    }

    #[test]
    fn response_time_must_be_strictly_positive() {
        assert!(validate_response_time(1, "t"));
        assert!(!validate_response_time(0, "t"));
    }
}
