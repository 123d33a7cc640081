//! PDF backend on top of MuPDF

use log::{debug, warn};
use mupdf::{Colorspace, Matrix, MetadataName, Pixmap};

use super::source::DocumentSource;
use super::{Destination, Document, OutlineEntry};
use crate::error::{Result, ViewerError};
use crate::render::{PageRenderer, RenderFault, RenderParams, RenderedPage};
use crate::view::{PageSize, Rotation, Size};

fn open(source: &DocumentSource) -> std::result::Result<mupdf::Document, mupdf::error::Error> {
    match source {
        DocumentSource::Path(path) => mupdf::Document::open(path.to_string_lossy().as_ref()),
        DocumentSource::Bytes { data, .. } => mupdf::Document::from_bytes(data, "application/pdf"),
    }
}

/// Page geometry and navigation data of a PDF file
pub struct PdfDocument {
    name: String,
    title: Option<String>,
    page_sizes: Vec<PageSize>,
    outline: Vec<OutlineEntry>,
}

impl PdfDocument {
    pub fn from_source(source: &DocumentSource) -> Result<Self> {
        let doc = open(source)?;
        let page_count = doc.page_count()?.max(0) as usize;

        let mut page_sizes = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let page = doc.load_page(index as i32)?;
            let bounds = page.bounds()?;
            page_sizes.push(Size::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0));
        }

        let title = doc
            .metadata(MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());

        let mut outline = Vec::new();
        match doc.outlines() {
            Ok(items) => flatten_outlines(&items, 0, &mut outline),
            Err(e) => warn!("Failed to read outline of {}: {e}", source.name()),
        }

        debug!(
            "Opened PDF {} with {page_count} pages, {} outline entries",
            source.name(),
            outline.len()
        );

        Ok(Self {
            name: source.name(),
            title,
            page_sizes,
            outline,
        })
    }
}

fn flatten_outlines(outlines: &[mupdf::Outline], level: usize, entries: &mut Vec<OutlineEntry>) {
    for outline in outlines {
        let destination = outline
            .dest
            .map(|dest| Destination::page(dest.loc.page_number as usize));
        let title = outline.title.trim();

        if !title.is_empty() && (destination.is_some() || outline.uri.is_some()) {
            entries.push(OutlineEntry {
                title: title.to_string(),
                level,
                destination,
                uri: outline.uri.clone(),
            });
        }

        if !outline.down.is_empty() {
            flatten_outlines(&outline.down, level + 1, entries);
        }
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.page_sizes
            .get(index)
            .copied()
            .ok_or(ViewerError::PageOutOfRange {
                page: index,
                page_count: self.page_sizes.len(),
            })
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        self.outline.clone()
    }
}

/// Rasterizes PDF pages; each render thread owns one
pub struct PdfRenderer {
    doc: mupdf::Document,
}

impl PdfRenderer {
    pub fn open(source: &DocumentSource) -> std::result::Result<Self, RenderFault> {
        Ok(Self { doc: open(source)? })
    }
}

impl PageRenderer for PdfRenderer {
    fn render(&mut self, params: &RenderParams) -> std::result::Result<RenderedPage, RenderFault> {
        let page = self.doc.load_page(params.page as i32)?;
        let transform = rotation_matrix(params.scale, params.rotation);
        let pixmap = page.to_pixmap(&transform, &Colorspace::device_rgb(), false, false)?;

        Ok(RenderedPage {
            page: params.page,
            pixels: pixmap_to_rgb(&pixmap)?,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
            scale: params.scale,
            rotation: params.rotation,
        })
    }
}

/// Scale then rotate clockwise; MuPDF recomputes the pixmap origin from the
/// transformed bounds so no translation is needed.
fn rotation_matrix(scale: f32, rotation: Rotation) -> Matrix {
    match rotation.degrees() {
        90 => Matrix::new(0.0, scale, -scale, 0.0, 0.0, 0.0),
        180 => Matrix::new(-scale, 0.0, 0.0, -scale, 0.0, 0.0),
        270 => Matrix::new(0.0, -scale, scale, 0.0, 0.0, 0.0),
        _ => Matrix::new_scale(scale, scale),
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> std::result::Result<Vec<u8>, RenderFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(RenderFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &samples[y * stride..y * stride + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
