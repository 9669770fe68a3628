use thiserror::Error;

/// Everything that can go wrong while loading, editing or saving a manifest.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("request for {path} failed: {reason}")]
    Fetch { path: String, reason: String },

    /// The folder key cannot be used as a single `data/<key>/` path segment.
    #[error("folder key {0:?} does not name a data directory")]
    InvalidFolderKey(String),
}

impl EditorError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
