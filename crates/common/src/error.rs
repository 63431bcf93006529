//! Error types shared across dispviz crates.

use std::path::PathBuf;

/// Top-level error type for dispviz operations.
#[derive(Debug, thiserror::Error)]
pub enum DispvizError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Channel not found in sample table: {name}")]
    ChannelNotFound { name: String },

    #[error("Channel {name} has no samples")]
    EmptyChannel { name: String },

    #[error("Frame {frame} is out of range for a channel with {len} samples")]
    FrameOutOfRange { frame: usize, len: usize },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DispvizError.
pub type DispvizResult<T> = Result<T, DispvizError>;

impl DispvizError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error came from indexing past the end of the data.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::FrameOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_frame_and_length() {
        let err = DispvizError::FrameOutOfRange { frame: 10, len: 10 };
        assert!(err.is_out_of_range());
        assert_eq!(
            err.to_string(),
            "Frame 10 is out of range for a channel with 10 samples"
        );
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: DispvizError = io.into();
        assert!(matches!(err, DispvizError::Io(_)));
        assert!(!err.is_out_of_range());
    }
}
