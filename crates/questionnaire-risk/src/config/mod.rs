use crate::workflows::questionnaire::DEFAULT_IDENTIFIER_LABEL;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub extraction: ExtractionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let identifier_label = env::var("QRISK_IDENTIFIER_LABEL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTIFIER_LABEL.to_string());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            extraction: ExtractionConfig {
                input: path_var("QRISK_INPUT"),
                field_info: path_var("QRISK_FIELD_INFO"),
                risk_profile: path_var("QRISK_RISK_PROFILE"),
                output_dir: path_var("QRISK_OUTPUT_DIR"),
                identifier_label,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Locations of the reference data, the documents to process and the output
/// folder. Every path may come from the environment or the command line.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub input: Option<PathBuf>,
    pub field_info: Option<PathBuf>,
    pub risk_profile: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub identifier_label: String,
}

impl ExtractionConfig {
    pub fn required_paths(&self) -> Result<ExtractionPaths, ConfigError> {
        Ok(ExtractionPaths {
            input: required(&self.input, "QRISK_INPUT")?,
            field_info: required(&self.field_info, "QRISK_FIELD_INFO")?,
            risk_profile: required(&self.risk_profile, "QRISK_RISK_PROFILE")?,
            output_dir: required(&self.output_dir, "QRISK_OUTPUT_DIR")?,
        })
    }
}

fn required(value: &Option<PathBuf>, name: &'static str) -> Result<PathBuf, ConfigError> {
    value.clone().ok_or(ConfigError::MissingPath { name })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPaths {
    pub input: PathBuf,
    pub field_info: PathBuf,
    pub risk_profile: PathBuf,
    pub output_dir: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingPath { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingPath { name } => {
                write!(f, "{name} is not set and no command-line override was given")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
