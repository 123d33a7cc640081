//! Navigation targets inside a document

use serde::{Deserialize, Serialize};

use crate::view::{SpecialZoomLevel, ZoomLevel};

/// A location inside the document.
///
/// `left` and `top` are in PDF user space (origin at the bottom-left of the
/// unrotated page, scale 1). Missing coordinates keep the page edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(alias = "page")]
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomLevel>,
}

impl Destination {
    /// Top of a page, current zoom
    #[must_use]
    pub const fn page(page_index: usize) -> Self {
        Self {
            page_index,
            left: None,
            top: None,
            zoom: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, left: Option<f32>, top: Option<f32>) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: ZoomLevel) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Parse PDF open parameters such as `page=3&zoom=150,10,700` or
    /// `page=2&view=FitH,500`. Pages are 1-based in the fragment.
    ///
    /// Returns `None` when no page is given.
    #[must_use]
    pub fn parse_fragment(fragment: &str) -> Option<Self> {
        let fragment = fragment.trim_start_matches('#');
        let mut dest: Option<Destination> = None;
        let mut zoom = None;
        let mut left = None;
        let mut top = None;

        for pair in fragment.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "page" => {
                    let page: usize = value.trim().parse().ok()?;
                    dest = Some(Destination::page(page.checked_sub(1)?));
                }
                "zoom" => {
                    let mut parts = value.split(',').map(str::trim);
                    zoom = parts
                        .next()
                        .and_then(|p| p.parse::<f32>().ok())
                        .map(|pct| ZoomLevel::Scale(pct / 100.0));
                    left = parts.next().and_then(|p| p.parse().ok());
                    top = parts.next().and_then(|p| p.parse().ok());
                }
                "view" => {
                    let mut parts = value.split(',').map(str::trim);
                    match parts.next().map(str::to_ascii_lowercase).as_deref() {
                        Some("fit") | Some("fitb") => {
                            zoom = Some(ZoomLevel::Special(SpecialZoomLevel::PageFit));
                        }
                        Some("fith") | Some("fitbh") => {
                            zoom = Some(ZoomLevel::Special(SpecialZoomLevel::PageWidth));
                            top = parts.next().and_then(|p| p.parse().ok());
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let mut dest = dest?.with_position(left, top);
        dest.zoom = zoom;
        Some(dest)
    }
}
