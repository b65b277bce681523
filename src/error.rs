//! Error types for the restore pipeline.
//!
//! Only the variants raised before processing starts are ever returned from a run.
//! `Resolution` and `Path` describe per-edge and per-page failures that are logged
//! and counted, then skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikiRestoreError {
    #[error("Configuration error: table '{table}' is not a valid target table")]
    Configuration { table: String },

    #[error("Unresolved {edge} edge: {key} matched {matches} pages")]
    Resolution {
        edge: &'static str,
        key: String,
        matches: usize,
    },

    #[error("Title '{title}' could not be saved: {reason}")]
    Path { title: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid spam domain pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Malformed dump: {0}")]
    Dump(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WikiRestoreError>;
