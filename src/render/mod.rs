//! Page rasterization infrastructure
//!
//! Rendering itself is delegated to a [`PageRenderer`]; this module only
//! schedules work on threads and keeps the results.

mod cache;
mod request;
mod service;
mod worker;

pub use cache::{CacheKey, PageCache};
pub use request::{
    PageRenderer, RenderFault, RenderParams, RenderRequest, RenderResponse, RenderedPage,
    RequestId,
};
pub use service::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS, RenderService};
