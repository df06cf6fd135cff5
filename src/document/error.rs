//! Document viewer errors

/// Failure reported by a backend binding
#[derive(Debug, Clone, thiserror::Error)]
#[error("{detail}")]
pub struct BackendError {
    detail: String,
}

impl BackendError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::error::Error> for BackendError {
    fn from(err: mupdf::error::Error) -> Self {
        Self::new(format!("PDF engine: {err}"))
    }
}

/// Errors surfaced by a document session
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Cannot open {path}: {source}")]
    Open { path: String, source: BackendError },

    #[error("Document is encrypted and needs a password")]
    AuthenticationRequired,

    #[error("Invalid password")]
    AuthenticationFailed,

    #[error("Cannot load page {page}: {detail}")]
    PageLoad { page: i64, detail: String },

    #[error("Cannot render page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("Document session is closed")]
    UseAfterClose,

    #[error("Invalid pixel buffer: {detail}")]
    InvalidBuffer { detail: String },
}

impl ViewerError {
    pub fn invalid_buffer(msg: impl Into<String>) -> Self {
        Self::InvalidBuffer { detail: msg.into() }
    }

    pub fn page_load(page: i64, msg: impl Into<String>) -> Self {
        Self::PageLoad {
            page,
            detail: msg.into(),
        }
    }

    pub fn render(page: usize, msg: impl Into<String>) -> Self {
        Self::Render {
            page,
            detail: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
