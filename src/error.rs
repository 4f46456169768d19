use std::path::PathBuf;
use thiserror::Error;

use crate::ir::SourceDialect;

/// The main error type for textlayer operations.
#[derive(Debug, Error)]
pub enum TextLayerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to fetch {uri}: {message}")]
    Transport { uri: String, message: String },

    #[error("Malformed {dialect} source: {message}")]
    MalformedSource {
        dialect: SourceDialect,
        message: String,
    },

    #[error("Could not resolve external resource {id}: {message}")]
    UnresolvableReference { id: String, message: String },

    /// A canvas ended without text; `message` is the error its entry recorded.
    #[error("No text available for {canvas}: {message}")]
    TextUnavailable { canvas: String, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse settings from {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write JSON output: {0}")]
    JsonWrite(#[source] serde_json::Error),
}

impl TextLayerError {
    pub(crate) fn malformed(dialect: SourceDialect, message: impl Into<String>) -> Self {
        TextLayerError::MalformedSource {
            dialect,
            message: message.into(),
        }
    }

    pub(crate) fn transport(uri: impl Into<String>, message: impl Into<String>) -> Self {
        TextLayerError::Transport {
            uri: uri.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unresolvable(id: impl Into<String>, message: impl Into<String>) -> Self {
        TextLayerError::UnresolvableReference {
            id: id.into(),
            message: message.into(),
        }
    }
}
