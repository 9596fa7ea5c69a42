pub mod capture;
pub mod engine;
pub mod output;
pub mod config;
pub mod error;
pub mod utils;

pub use error::{ArtifactError, Diagnostic, RecordError, Result};
pub use config::Config;
