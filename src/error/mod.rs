// src/error/mod.rs

use thiserror::Error;
use warp::http::StatusCode;

pub const TABLE_NOT_FOUND_DETAIL: &str = "Table not found on the webpage";

/// Ways a request to the data endpoint can fail, in the order they are matched.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Connection failure, timeout, non-2xx status or unreadable body.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    #[error("table {index} requested but the page only has {found}")]
    TableNotFound { index: usize, found: usize },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::TableNotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text for the `detail` field of the error body.
    pub fn detail(&self) -> String {
        match self {
            PipelineError::Upstream(e) => format!("Failed to fetch data: {}", e),
            PipelineError::TableNotFound { .. } => TABLE_NOT_FOUND_DETAIL.to_string(),
            PipelineError::Other(e) => format!("Internal server error: {:#}", e),
        }
    }
}
