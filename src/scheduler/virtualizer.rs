//! One-dimensional list virtualization
//!
//! Keeps prefix offsets over variable item sizes so that the visible window
//! for a scroll position is found with binary searches instead of walking
//! every item.

/// Alignment used when scrolling an item into view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
    /// Leave the offset alone if the item is fully visible
    Auto,
}

/// An item inside the rendered window
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f32,
    pub size: f32,
}

impl VirtualItem {
    #[must_use]
    pub fn end(&self) -> f32 {
        self.start + self.size
    }
}

/// Visible window, inclusive on both ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualRange {
    /// First item intersecting the viewport
    pub start: usize,
    /// Last item intersecting the viewport
    pub end: usize,
    /// First item to keep mounted
    pub overscan_start: usize,
    /// Last item to keep mounted
    pub overscan_end: usize,
}

impl VirtualRange {
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    #[must_use]
    pub fn contains_overscan(&self, index: usize) -> bool {
        (self.overscan_start..=self.overscan_end).contains(&index)
    }
}

/// Virtualization state for a list of variable-size items
#[derive(Clone, Debug, Default)]
pub struct Virtualizer {
    sizes: Vec<f32>,
    starts: Vec<f32>,
    gap: f32,
    padding_start: f32,
    padding_end: f32,
    scroll_offset: f32,
    viewport_size: f32,
}

impl Virtualizer {
    /// Create a virtualizer for `count` items sized by `estimate`
    #[must_use]
    pub fn new(count: usize, estimate: impl Fn(usize) -> f32) -> Self {
        let sizes = (0..count).map(|i| estimate(i).max(0.0)).collect();
        let mut v = Self {
            sizes,
            ..Self::default()
        };
        v.rebuild_from(0);
        v
    }

    #[must_use]
    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap.max(0.0);
        self.rebuild_from(0);
        self
    }

    #[must_use]
    pub fn with_padding(mut self, start: f32, end: f32) -> Self {
        self.padding_start = start.max(0.0);
        self.padding_end = end.max(0.0);
        self.rebuild_from(0);
        self
    }

    fn rebuild_from(&mut self, index: usize) {
        self.starts.resize(self.sizes.len(), 0.0);
        for i in index..self.sizes.len() {
            self.starts[i] = if i == 0 {
                self.padding_start
            } else {
                self.starts[i - 1] + self.sizes[i - 1] + self.gap
            };
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Replace the estimate of one item with its measured size
    pub fn measure(&mut self, index: usize, size: f32) {
        let Some(slot) = self.sizes.get_mut(index) else {
            return;
        };
        let size = size.max(0.0);
        if (*slot - size).abs() > f32::EPSILON {
            *slot = size;
            self.rebuild_from(index + 1);
        }
    }

    pub fn set_viewport(&mut self, scroll_offset: f32, viewport_size: f32) {
        self.scroll_offset = scroll_offset.max(0.0);
        self.viewport_size = viewport_size.max(0.0);
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    #[must_use]
    pub fn viewport_size(&self) -> f32 {
        self.viewport_size
    }

    #[must_use]
    pub fn total_size(&self) -> f32 {
        match (self.starts.last(), self.sizes.last()) {
            (Some(start), Some(size)) => start + size + self.padding_end,
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn max_scroll_offset(&self) -> f32 {
        (self.total_size() - self.viewport_size).max(0.0)
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        Some(VirtualItem {
            index,
            start: *self.starts.get(index)?,
            size: *self.sizes.get(index)?,
        })
    }

    /// Item whose slot (item plus trailing gap) contains `offset`
    #[must_use]
    pub fn index_at(&self, offset: f32) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        Some(
            self.starts
                .partition_point(|&s| s <= offset)
                .saturating_sub(1),
        )
    }

    /// Items intersecting the viewport, widened by `overscan` on both sides
    #[must_use]
    pub fn range(&self, overscan: usize) -> Option<VirtualRange> {
        if self.is_empty() || self.viewport_size <= 0.0 {
            return None;
        }

        let view_start = self.scroll_offset;
        let view_end = self.scroll_offset + self.viewport_size;

        let mut start = self.index_at(view_start)?;
        if self.starts[start] + self.sizes[start] <= view_start {
            start += 1;
        }
        let end = self
            .starts
            .partition_point(|&s| s < view_end)
            .checked_sub(1)?;

        if start >= self.len() || start > end {
            return None;
        }

        Some(VirtualRange {
            start,
            end,
            overscan_start: start.saturating_sub(overscan),
            overscan_end: (end + overscan).min(self.len() - 1),
        })
    }

    #[must_use]
    pub fn items(&self, overscan: usize) -> Vec<VirtualItem> {
        let Some(range) = self.range(overscan) else {
            return Vec::new();
        };
        (range.overscan_start..=range.overscan_end)
            .filter_map(|i| self.item(i))
            .collect()
    }

    /// Fraction of the item's extent inside the viewport, in `0.0..=1.0`
    #[must_use]
    pub fn visibility(&self, index: usize) -> f32 {
        let Some(item) = self.item(index) else {
            return 0.0;
        };
        if item.size <= 0.0 {
            return 0.0;
        }
        let view_end = self.scroll_offset + self.viewport_size;
        let visible = item.end().min(view_end) - item.start.max(self.scroll_offset);
        (visible / item.size).clamp(0.0, 1.0)
    }

    /// Scroll offset that brings `index` into view with the given alignment
    #[must_use]
    pub fn offset_for_index(&self, index: usize, align: Align) -> f32 {
        let Some(item) = self.item(index.min(self.len().saturating_sub(1))) else {
            return 0.0;
        };

        let offset = match align {
            Align::Start => item.start,
            Align::End => item.end() - self.viewport_size,
            Align::Center => item.start + (item.size - self.viewport_size) / 2.0,
            Align::Auto => {
                let view_end = self.scroll_offset + self.viewport_size;
                if item.start >= self.scroll_offset && item.end() <= view_end {
                    self.scroll_offset
                } else if item.start < self.scroll_offset || item.size > self.viewport_size {
                    item.start
                } else {
                    item.end() - self.viewport_size
                }
            }
        };

        offset.clamp(0.0, self.max_scroll_offset())
    }
}
