//! Error types shared by the viewer, documents and configuration

/// Errors surfaced by viewer operations and document backends
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("document has no pages")]
    EmptyDocument,

    #[error("plugin already installed: {0}")]
    DuplicatePlugin(String),

    #[error("document: {detail}")]
    Document { detail: String },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewerError {
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document { detail: msg.into() }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
