use std::path::PathBuf;

use axum::http::StatusCode;
use literal::{LocateError, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Unauthorized. Admin access required.")]
    Unauthorized,

    #[error("{what} not found at {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("{0}")]
    Validation(String),

    #[error("{source} in {}", .path.display())]
    Segment {
        path: PathBuf,
        #[source]
        source: LocateError,
    },

    #[error("failed to parse {segment}: {source}")]
    Parse {
        segment: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("unexpected shape in {segment}: {message}")]
    Shape {
        segment: &'static str,
        message: String,
    },

    #[error("invalid role catalog: {0}")]
    Catalog(String),

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    Task(String),
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::Unauthorized => StatusCode::FORBIDDEN,
            AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::Segment { .. }
            | AdminError::Parse { .. }
            | AdminError::Shape { .. }
            | AdminError::Catalog(_)
            | AdminError::Io { .. }
            | AdminError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn shape(segment: &'static str, message: impl Into<String>) -> Self {
        AdminError::Shape {
            segment,
            message: message.into(),
        }
    }

    pub(crate) fn io(action: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        AdminError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}
