//! Output module for crawl events and reports
//!
//! This module handles:
//! - Streaming crawl events to a JSON-lines file
//! - Generating markdown summaries of finished crawls
//! - Printing final statistics to the terminal

mod jsonl;
mod markdown;
pub mod stats;

pub use jsonl::JsonLinesObserver;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{format_statistics, print_statistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
