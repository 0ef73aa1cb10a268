//! Error types for text extraction

use std::collections::TryReserveError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extraction operations
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Coarse classification used by operators to tell failures apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The input is malformed, unsupported or unreadable
    Decode,
    /// The input is too expensive to decode within the memory ceiling
    ResourceExhausted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => write!(f, "DecodeFailure"),
            Self::ResourceExhausted => write!(f, "ResourceExhaustion"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported content-type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{format} decoding failed: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("archive nesting exceeds {max_depth} levels")]
    NestingTooDeep { max_depth: usize },

    #[error("decoder panicked: {message}")]
    DecoderPanicked { message: String },

    #[error("extraction task was cancelled")]
    Cancelled,

    #[error("failed to reserve {requested} bytes while decoding")]
    AllocationFailed {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("decoded output exceeds the {limit} byte ceiling")]
    DecodedSizeExceeded { limit: u64 },
}

impl ExtractionError {
    pub fn malformed(format: &'static str, error: impl fmt::Display) -> Self {
        Self::Malformed {
            format,
            message: error.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AllocationFailed { .. } | Self::DecodedSizeExceeded { .. } => {
                FailureKind::ResourceExhausted
            }
            Self::UnsupportedContentType { .. }
            | Self::Io { .. }
            | Self::Malformed { .. }
            | Self::NestingTooDeep { .. }
            | Self::DecoderPanicked { .. }
            | Self::Cancelled => FailureKind::Decode,
        }
    }

    /// Short class name used in log lines
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::UnsupportedContentType { .. } => "UnsupportedContentType",
            Self::Io { .. } => "Io",
            Self::Malformed { .. } => "Malformed",
            Self::NestingTooDeep { .. } => "NestingTooDeep",
            Self::DecoderPanicked { .. } => "DecoderPanicked",
            Self::Cancelled => "Cancelled",
            Self::AllocationFailed { .. } => "AllocationFailed",
            Self::DecodedSizeExceeded { .. } => "DecodedSizeExceeded",
        }
    }
}
