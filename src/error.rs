use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("Unknown column layout: {0}")]
    UnknownLayout(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
