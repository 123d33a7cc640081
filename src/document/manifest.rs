//! In-memory document described by a YAML/JSON page manifest
//!
//! Useful for layout experiments and tests: the manifest lists page sizes,
//! named destinations and an outline, without any page content.
//!
//! ```yaml
//! title: Sample
//! pages:
//!   - { width: 612, height: 792 }
//!   - { width: 792, height: 612, rotation: 90 }
//! destinations:
//!   appendix: { page: 1, top: 400 }
//! outline:
//!   - title: Appendix
//!     destination: appendix
//! ```

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::source::DocumentSource;
use super::{Destination, Document, OutlineEntry};
use crate::error::{Result, ViewerError};
use crate::render::{PageRenderer, RenderFault, RenderParams, RenderedPage};
use crate::view::{PageSize, Rotation, Size};

/// Largest edge of a blank page render, in pixels
const MAX_RENDER_DIMENSION: f32 = 4096.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestPage {
    pub width: f32,
    pub height: f32,
    /// Intrinsic page rotation in degrees
    #[serde(default)]
    pub rotation: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestOutline {
    pub title: String,
    /// Name of an entry in `destinations`
    #[serde(default)]
    pub destination: Option<String>,
    /// Page number (0-indexed), used when no named destination is given
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub children: Vec<ManifestOutline>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default, skip_serializing)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub pages: Vec<ManifestPage>,
    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,
    #[serde(default)]
    pub outline: Vec<ManifestOutline>,
}

impl ManifestDocument {
    /// `count` pages of the same size
    #[must_use]
    pub fn uniform(count: usize, size: PageSize) -> Self {
        Self {
            pages: vec![
                ManifestPage {
                    width: size.width,
                    height: size.height,
                    rotation: 0,
                };
                count
            ],
            ..Self::default()
        }
    }

    /// Parse a manifest; JSON is accepted as well since it is valid YAML
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content)?;
        if let Some(bad) = manifest
            .pages
            .iter()
            .position(|p| !valid_extent(p.width) || !valid_extent(p.height))
        {
            return Err(ViewerError::document(format!(
                "page {bad} has an empty or infinite size"
            )));
        }
        Ok(manifest)
    }

    pub fn from_source(source: &DocumentSource) -> Result<Self> {
        let mut manifest = Self::parse(&source.read_to_string()?)?;
        manifest.name = source.name();
        debug!(
            "Loaded manifest {} with {} pages",
            manifest.name,
            manifest.pages.len()
        );
        Ok(manifest)
    }

    fn flatten_outline(&self, items: &[ManifestOutline], level: usize, out: &mut Vec<OutlineEntry>) {
        for item in items {
            let destination = item
                .destination
                .as_deref()
                .and_then(|name| self.destinations.get(name).cloned())
                .or_else(|| item.page.map(Destination::page));

            let title = item.title.trim();
            if !title.is_empty() {
                out.push(OutlineEntry {
                    title: title.to_string(),
                    level,
                    destination,
                    uri: item.uri.clone(),
                });
            }

            if !item.children.is_empty() {
                self.flatten_outline(&item.children, level + 1, out);
            }
        }
    }
}

impl Document for ManifestDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        let page = self.pages.get(index).ok_or(ViewerError::PageOutOfRange {
            page: index,
            page_count: self.pages.len(),
        })?;
        Ok(Size::new(page.width, page.height).rotated(Rotation::from_degrees(page.rotation)))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn title(&self) -> Option<String> {
        self.title.clone().filter(|t| !t.is_empty())
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        self.flatten_outline(&self.outline, 0, &mut entries);
        entries
    }

    fn named_destination(&self, name: &str) -> Option<Destination> {
        self.destinations.get(name).cloned()
    }
}

fn valid_extent(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Renders manifest pages as plain white rectangles
pub struct BlankRenderer {
    doc: ManifestDocument,
}

impl BlankRenderer {
    #[must_use]
    pub fn new(doc: ManifestDocument) -> Self {
        Self { doc }
    }
}

impl PageRenderer for BlankRenderer {
    fn render(&mut self, params: &RenderParams) -> std::result::Result<RenderedPage, RenderFault> {
        let size = self
            .doc
            .page_size(params.page)
            .map_err(|e| RenderFault::generic(e.to_string()))?
            .rotated(params.rotation)
            .scaled(params.scale);

        let reduction = (MAX_RENDER_DIMENSION / size.width.max(size.height)).min(1.0);
        let width_px = (size.width * reduction).round().max(1.0) as u32;
        let height_px = (size.height * reduction).round().max(1.0) as u32;

        Ok(RenderedPage {
            page: params.page,
            pixels: vec![0xFF; width_px as usize * height_px as usize * 3],
            width_px,
            height_px,
            scale: params.scale,
            rotation: params.rotation,
        })
    }
}
