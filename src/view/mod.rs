//! Page geometry, zoom and layout state of the viewer

mod geometry;
mod layout;
mod state;
mod zoom;

pub use geometry::{PageSize, Rect, RotateDirection, Rotation, Size, map_point};
pub use layout::{LayoutParams, PageLayout, Row, ScrollMode, ViewMode};
pub use state::{Command, Effect, PageMetrics, ScrollPosition, ViewerState};
pub use zoom::{SpecialZoomLevel, Zoom, ZoomLevel};
