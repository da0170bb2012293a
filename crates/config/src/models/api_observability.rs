use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

use super::logging::{LogLevel, OutputFormat};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub request_timeout_seconds: u64,
    pub max_request_size_mb: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            request_timeout_seconds: 30,
            max_request_size_mb: 10,
        }
    }
}

impl ConfigValidator for ApiConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_bind_address(&self.bind_address, "api.bind_address")?;
        ValidationUtils::validate_timeout_seconds(self.request_timeout_seconds)?;

        if self.max_request_size_mb == 0 {
            return Err(crate::ConfigError::Validation(
                "api.max_request_size_mb must be greater than 0".to_string(),
            ));
        }

        if self.max_request_size_mb > 100 {
            return Err(crate::ConfigError::Validation(
                "api.max_request_size_mb must be less than or equal to 100".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: LogLevel,
    pub log_format: OutputFormat,
}

impl ConfigValidator for ObservabilityConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        Ok(())
    }
}
