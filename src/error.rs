use serde::Serialize;
use thiserror::Error;

use crate::capture::Protocol;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{protocol} stream produced no valid records")]
    EmptyStream { protocol: Protocol },

    #[error("{0} records produced diagnostics")]
    Diagnostics(usize),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

/// A problem with a single packet record. Never aborts a run on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("malformed record: field `{field}` {reason}")]
    MalformedRecord { field: &'static str, reason: String },

    #[error("unknown encoding for field `{field}`: {value:?}")]
    UnknownFieldEncoding { field: &'static str, value: String },
}

impl RecordError {
    pub(crate) fn missing(field: &'static str) -> Self {
        RecordError::MalformedRecord {
            field,
            reason: "is missing".to_string(),
        }
    }

    pub(crate) fn unparsable(field: &'static str, value: &str) -> Self {
        RecordError::MalformedRecord {
            field,
            reason: format!("has unparsable value {:?}", value),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RecordError::MalformedRecord { .. } => Severity::Error,
            RecordError::UnknownFieldEncoding { .. } => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One entry of the diagnostics list returned next to an engine result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub protocol: Protocol,
    /// Zero-based position of the record in its input stream.
    pub position: usize,
    pub sequence_number: Option<u64>,
    pub error: RecordError,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.error.severity()
    }

    /// Whether the record was dropped from the output because of this issue.
    pub fn dropped_record(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.sequence_number {
            Some(seq) => write!(f, "[{}] {} record #{}: {}", severity, self.protocol, seq, self.error),
            None => write!(f, "[{}] {} record at position {}: {}", severity, self.protocol, self.position, self.error),
        }
    }
}
