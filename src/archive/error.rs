//! Archive access errors

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Cannot open archive {path}: {detail}")]
    Open { path: String, detail: String },

    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("Stream for {0} was aborted")]
    StreamAborted(String),

    #[error("Entry {path} uses unsupported compression {method}")]
    Unsupported { path: String, method: String },

    #[error("Invalid entry path: {0}")]
    InvalidPath(String),

    #[error("Archive I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn open(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.display().to_string(),
            detail: detail.to_string(),
        }
    }
}
