//! Page layout for the supported scroll and view modes
//!
//! Pages are grouped into rows, the unit the virtualizer works on. Rows are
//! stacked along the main axis (vertical for every mode except `Horizontal`)
//! and separated by the page gap; pages in a row sit side by side.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::geometry::{PageSize, Rect, Size};

/// How pages flow in the scroll container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    #[default]
    Vertical,
    Horizontal,
    /// Pages flow left to right and wrap to the next row
    Wrapped,
    /// One row at a time
    Page,
}

impl ScrollMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollMode::Vertical => "vertical",
            ScrollMode::Horizontal => "horizontal",
            ScrollMode::Wrapped => "wrapped",
            ScrollMode::Page => "page",
        }
    }

    /// True when rows are laid out along the x axis
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        self == ScrollMode::Horizontal
    }
}

impl std::str::FromStr for ScrollMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "vertical" => Ok(ScrollMode::Vertical),
            "horizontal" => Ok(ScrollMode::Horizontal),
            "wrapped" => Ok(ScrollMode::Wrapped),
            "page" => Ok(ScrollMode::Page),
            _ => Err(format!("invalid scroll mode: {s}")),
        }
    }
}

/// How many pages share a row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    SinglePage,
    /// Pages shown in pairs: (1, 2), (3, 4), ...
    DualPage,
    /// First page alone, then pairs: (1), (2, 3), ...
    DualPageWithCover,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::SinglePage => "single_page",
            ViewMode::DualPage => "dual_page",
            ViewMode::DualPageWithCover => "dual_page_with_cover",
        }
    }

    #[must_use]
    pub fn is_dual(self) -> bool {
        self != ViewMode::SinglePage
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "single" | "single_page" => Ok(ViewMode::SinglePage),
            "dual" | "dual_page" => Ok(ViewMode::DualPage),
            "cover" | "dual_page_with_cover" => Ok(ViewMode::DualPageWithCover),
            _ => Err(format!("invalid view mode: {s}")),
        }
    }
}

/// Inputs of a layout pass
#[derive(Clone, Copy, Debug)]
pub struct LayoutParams<'a> {
    /// Page sizes at scale 1 with their rotation already applied
    pub sizes: &'a [PageSize],
    pub scale: f32,
    pub gap: f32,
    pub scroll_mode: ScrollMode,
    pub view_mode: ViewMode,
    pub container: Size,
}

/// A group of consecutive pages laid out together
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub pages: Range<usize>,
    /// Start on the main axis
    pub offset: f32,
    /// Size on the main axis
    pub extent: f32,
    /// Size on the cross axis
    pub cross: f32,
}

/// Result of a layout pass
#[derive(Clone, Debug, Default)]
pub struct PageLayout {
    pub rows: Vec<Row>,
    pub page_rects: Vec<Rect>,
    /// Row index of every page
    pub page_rows: Vec<usize>,
    pub content_size: Size,
    pub horizontal: bool,
    pub gap: f32,
}

impl PageLayout {
    #[must_use]
    pub fn compute(params: &LayoutParams<'_>) -> Self {
        let LayoutParams {
            sizes,
            scale,
            gap,
            scroll_mode,
            view_mode,
            container,
        } = *params;

        let scaled: Vec<Size> = sizes.iter().map(|s| s.scaled(scale)).collect();
        let groups = group_pages(&scaled, gap, scroll_mode, view_mode, container);
        let horizontal = scroll_mode.is_horizontal();

        let mut rows = Vec::with_capacity(groups.len());
        let mut page_rows = vec![0; scaled.len()];
        let mut offset = gap;
        let mut max_cross = 0.0_f32;

        for (row_idx, group) in groups.into_iter().enumerate() {
            let pages = &scaled[group.clone()];
            let along_row: f32 = pages.iter().map(|s| s.width).sum::<f32>()
                + gap * pages.len().saturating_sub(1) as f32;
            let tallest = pages.iter().map(|s| s.height).fold(0.0_f32, f32::max);

            let (extent, cross) = if horizontal {
                (along_row, tallest)
            } else {
                (tallest, along_row)
            };

            for page in group.clone() {
                page_rows[page] = row_idx;
            }
            rows.push(Row {
                pages: group,
                offset,
                extent,
                cross,
            });
            offset += extent + gap;
            max_cross = max_cross.max(cross);
        }

        let total_main = if rows.is_empty() { 0.0 } else { offset };
        let viewport_cross = if horizontal {
            container.height
        } else {
            container.width
        };
        let content_cross = (max_cross + 2.0 * gap).max(viewport_cross);

        let mut page_rects = vec![Rect::default(); scaled.len()];
        for row in &rows {
            if horizontal {
                let mut x = row.offset;
                for page in row.pages.clone() {
                    let size = scaled[page];
                    let y = (content_cross - size.height) / 2.0;
                    page_rects[page] = Rect::new(x, y, size.width, size.height);
                    x += size.width + gap;
                }
            } else {
                let mut x = (content_cross - row.cross) / 2.0;
                for page in row.pages.clone() {
                    let size = scaled[page];
                    let y = row.offset + (row.extent - size.height) / 2.0;
                    page_rects[page] = Rect::new(x, y, size.width, size.height);
                    x += size.width + gap;
                }
            }
        }

        let content_size = if horizontal {
            Size::new(total_main, content_cross)
        } else {
            Size::new(content_cross, total_main)
        };

        Self {
            rows,
            page_rects,
            page_rows,
            content_size,
            horizontal,
            gap,
        }
    }

    /// Main-axis extents of all rows, the virtualizer's size estimates
    #[must_use]
    pub fn row_extents(&self) -> Vec<f32> {
        self.rows.iter().map(|r| r.extent).collect()
    }

    #[must_use]
    pub fn row_of(&self, page: usize) -> Option<usize> {
        self.page_rows.get(page).copied()
    }

    /// Main-axis coordinate of a rect
    #[must_use]
    pub fn main_start(&self, rect: &Rect) -> f32 {
        if self.horizontal { rect.x } else { rect.y }
    }

    #[must_use]
    pub fn main_extent(&self, rect: &Rect) -> f32 {
        if self.horizontal {
            rect.width
        } else {
            rect.height
        }
    }
}

fn group_pages(
    scaled: &[Size],
    gap: f32,
    scroll_mode: ScrollMode,
    view_mode: ViewMode,
    container: Size,
) -> Vec<Range<usize>> {
    let count = scaled.len();
    if count == 0 {
        return Vec::new();
    }

    if scroll_mode == ScrollMode::Wrapped {
        let available = (container.width - 2.0 * gap).max(0.0);
        let mut groups = Vec::new();
        let mut start = 0;
        let mut width = 0.0_f32;
        for (idx, size) in scaled.iter().enumerate() {
            if idx > start && width + gap + size.width > available {
                groups.push(start..idx);
                start = idx;
                width = 0.0;
            }
            if idx > start {
                width += gap;
            }
            width += size.width;
        }
        groups.push(start..count);
        return groups;
    }

    match view_mode {
        ViewMode::SinglePage => (0..count).map(|i| i..i + 1).collect(),
        ViewMode::DualPage => (0..count)
            .step_by(2)
            .map(|i| i..(i + 2).min(count))
            .collect(),
        ViewMode::DualPageWithCover => {
            let mut groups = vec![0..1];
            groups.extend((1..count).step_by(2).map(|i| i..(i + 2).min(count)));
            groups
        }
    }
}
