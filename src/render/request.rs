//! Render request and response types

use std::sync::Arc;

use crate::view::Rotation;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// What to render: one page at a scale and rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Page number (0-indexed)
    pub page: usize,
    /// Viewer scale factor
    pub scale: f32,
    /// Document rotation combined with the page's own rotation
    pub rotation: Rotation,
}

/// Raw rendered page image, RGB, 3 bytes per pixel
#[derive(Clone)]
pub struct RenderedPage {
    pub page: usize,
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub scale: f32,
    pub rotation: Rotation,
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page", &self.page)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation.degrees())
            .finish_non_exhaustive()
    }
}

/// Rasterizes pages; one instance lives in each worker thread
pub trait PageRenderer {
    fn render(&mut self, params: &RenderParams) -> Result<RenderedPage, RenderFault>;
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    Page { id: RequestId, params: RenderParams },
    Shutdown,
}

/// Errors from render workers
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    Page {
        id: RequestId,
        params: RenderParams,
        data: Arc<RenderedPage>,
    },
    Error {
        id: RequestId,
        params: RenderParams,
        error: RenderFault,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Page { id, .. } | Self::Error { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn params(&self) -> &RenderParams {
        match self {
            Self::Page { params, .. } | Self::Error { params, .. } => params,
        }
    }
}
