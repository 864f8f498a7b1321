//! Configuration validation utilities.

use figment::value::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ConduitConfig, LogLevel, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ConduitConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;

    for (name, section) in &config.adapters {
        if !matches!(section, Value::Dict(..)) {
            return Err(ConfigError::validation(format!(
                "adapters.{name} must be a table"
            )));
        }
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (module, level) in &logging.filters {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid module name in logging.filters: '{module}'"
            )));
        }
        if !LogLevel::NAMES.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid log level for '{module}': {level}. Valid values are: {:?}",
                LogLevel::NAMES
            )));
        }
    }

    if logging.output == LogOutput::File {
        let Some(path) = &logging.file_path else {
            return Err(ConfigError::missing_field("logging.file_path"));
        };
        if path.file_name().is_none() {
            return Err(ConfigError::validation(format!(
                "logging.file_path must name a file: {}",
                path.display()
            )));
        }
    }

    Ok(())
}
