//! What the viewer hands to a UI for painting

use crate::attributes::Attributes;
use crate::scheduler::RenderStatus;
use crate::view::{Rect, Rotation, ScrollPosition, Size};

/// Extra content a plugin draws on top of a page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
    /// Plugin-chosen identifier, e.g. `"highlights"`
    pub name: String,
    pub attributes: Attributes,
    /// Opaque payload interpreted by the UI
    pub content: String,
}

impl Layer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// One page inside the rendered window
#[derive(Clone, Debug)]
pub struct PageSlot {
    pub index: usize,
    /// Position in content coordinates at the current scale
    pub rect: Rect,
    /// Document rotation combined with the page's own rotation
    pub rotation: Rotation,
    pub scale: f32,
    pub status: RenderStatus,
    /// Fraction of the page inside the viewport
    pub visibility: f32,
    pub attributes: Attributes,
    pub layers: Vec<Layer>,
}

impl PageSlot {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility > 0.0
    }
}

/// Snapshot of everything a UI needs to paint the viewer
#[derive(Clone, Debug)]
pub struct Frame {
    pub attributes: Attributes,
    pub content_size: Size,
    pub viewport: Size,
    pub scroll: ScrollPosition,
    /// Pages of the overscanned window, in document order
    pub pages: Vec<PageSlot>,
}

impl Frame {
    pub fn visible_pages(&self) -> impl Iterator<Item = &PageSlot> {
        self.pages.iter().filter(|slot| slot.is_visible())
    }

    #[must_use]
    pub fn page(&self, index: usize) -> Option<&PageSlot> {
        self.pages.iter().find(|slot| slot.index == index)
    }
}
