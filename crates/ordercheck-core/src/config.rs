use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const EFFICACY_PLACEHOLDERS: [&str; 4] = ["{metric}", "{input}", "{transmissions}", "{start}"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub efficacy: EfficacyToolConfig,
}

impl Config {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = if let Some(path) = path {
            let data = std::fs::read_to_string(path).map_err(|e| {
                AppError::usage(format!("failed to read config {}: {e}", path.display()))
            })?;
            serde_yaml::from_str::<Config>(&data).map_err(|e| {
                AppError::usage(format!("failed to parse config {}: {e}", path.display()))
            })?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.logging.validate()?;
        self.efficacy.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> AppResult<()> {
        validate_log_level(&self.level)?;
        validate_log_format(&self.format)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EfficacyToolConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
    pub scratch_dir: Option<PathBuf>,
}

impl EfficacyToolConfig {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(program) = &self.program {
            if program.trim().is_empty() {
                return Err(AppError::usage("efficacy.program is empty"));
            }
        } else if !self.args.is_empty() {
            return Err(AppError::usage(
                "efficacy.args requires efficacy.program to be set",
            ));
        }
        for arg in &self.args {
            if arg.contains('{') && !EFFICACY_PLACEHOLDERS.iter().any(|p| arg.contains(p)) {
                return Err(AppError::usage(format!(
                    "unknown placeholder in efficacy argument '{arg}'"
                )));
            }
        }
        Ok(())
    }
}

pub fn validate_log_level(value: &str) -> AppResult<()> {
    match value {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
        _ => Err(AppError::usage(format!(
            "invalid log level '{value}'; expected error|warn|info|debug|trace"
        ))),
    }
}

pub fn validate_log_format(value: &str) -> AppResult<()> {
    match value {
        "text" | "json" => Ok(()),
        _ => Err(AppError::usage(format!(
            "invalid log format '{value}'; expected text|json"
        ))),
    }
}
