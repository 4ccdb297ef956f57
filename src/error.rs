use thiserror::Error;

use crate::http::ErrorInfo;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by tool invocations.
///
/// Everything except [`Error::InvalidParams`] is reported back to the caller as a
/// tool result with `isError: true`; argument decoding failures become JSON-RPC errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid repository format: \"{value}\". Expected \"owner/repo\"")]
    InvalidRepository { value: String },

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Path \"{path}\" is a {kind}, not a file")]
    NotAFile { path: String, kind: String },

    #[error("Path \"{path}\" is a file, not a directory")]
    NotADirectory { path: String },

    #[error("GitHub API request failed ({code}): {message}")]
    Upstream {
        code: String,
        message: String,
        retriable: bool,
    },

    #[error("unexpected response from GitHub: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code used in `structuredContent.error`.
    pub fn code(&self) -> &str {
        match self {
            Error::InvalidRepository { .. } | Error::InvalidArgument { .. } => "invalid_argument",
            Error::InvalidParams(_) => "invalid_params",
            Error::NotAFile { .. } | Error::NotADirectory { .. } => "wrong_type",
            Error::Upstream { code, .. } => code,
            Error::Decode(_) => "server_error",
            Error::Config(_) => "config_error",
        }
    }

    pub fn retriable(&self) -> bool {
        matches!(self, Error::Upstream { retriable: true, .. })
    }
}

impl From<ErrorInfo> for Error {
    fn from(info: ErrorInfo) -> Self {
        Error::Upstream {
            code: info.code,
            message: info.message,
            retriable: info.retriable,
        }
    }
}
