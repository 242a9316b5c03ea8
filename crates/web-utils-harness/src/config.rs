//! Harness configuration
//!
//! The defaults are the fixed values the exported checks run with. A JSON
//! document can override any subset of them for native runs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Message sent by the console-log check
    pub log_message: String,
    /// Path used by the file lifecycle checks
    pub test_path: String,
    /// Written without its terminator; the terminator is added on write
    pub test_content: String,
    pub http_method: String,
    pub server_name: String,
    pub endpoint: String,
    pub header: String,
    pub body: String,
    pub timeout_ms: i32,
    pub expected_status_code: i32,
    pub expected_response: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_message: "testing console log".to_string(),
            test_path: "test_path".to_string(),
            test_content: "content".to_string(),
            http_method: "GET".to_string(),
            server_name: "localhost".to_string(),
            endpoint: "/test_route".to_string(),
            header: String::new(),
            body: String::new(),
            timeout_ms: 7000,
            expected_status_code: 200,
            expected_response: "test data".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Parse and validate a (possibly partial) JSON config
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_path.is_empty() {
            return Err(ConfigError::Invalid {
                field: "test_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.test_content.contains('\0') {
            return Err(ConfigError::Invalid {
                field: "test_content",
                reason: "must not contain NUL bytes".to_string(),
            });
        }
        if self.expected_response.contains('\0') {
            return Err(ConfigError::Invalid {
                field: "expected_response",
                reason: "must not contain NUL bytes".to_string(),
            });
        }
        Ok(())
    }

    /// Content bytes including the terminating NUL
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.test_content.len() + 1);
        bytes.extend_from_slice(self.test_content.as_bytes());
        bytes.push(0);
        bytes
    }
}
