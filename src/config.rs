use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::engine::TransactionKeying;
use crate::{ArtifactError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub dhcp_capture: PathBuf,
    pub dns_capture: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub artifacts_json: String,
    pub events_ndjson: String,
    pub events_csv: String,
    pub timeline_json: String,
    pub report_txt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub transaction_keying: TransactionKeying,
    /// Extract the two streams on separate workers.
    #[serde(default)]
    pub parallel: bool,
    /// Treat any diagnostic as a failed run.
    #[serde(default)]
    pub fail_on_diagnostics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig {
                dhcp_capture: PathBuf::from("dhcp.json"),
                dns_capture: PathBuf::from("dns_capture.json"),
            },
            output: OutputConfig {
                directory: PathBuf::from("results"),
                artifacts_json: "artifacts.json".to_string(),
                events_ndjson: "events.ndjson".to_string(),
                events_csv: "artifacts.csv".to_string(),
                timeline_json: "timeline.json".to_string(),
                report_txt: Some("report.txt".to_string()),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ArtifactError::Config(format!(
                "Unknown log level {:?}",
                self.logging.level
            )));
        }

        let output = &self.output;
        let names = [
            &output.artifacts_json,
            &output.events_ndjson,
            &output.events_csv,
            &output.timeline_json,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(ArtifactError::Config("Output file names must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output.directory.join(file_name)
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
