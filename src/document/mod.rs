//! Document backends
//!
//! The viewer never parses documents itself. A backend reports page count,
//! page geometry and navigation data through the [`Document`] trait.

mod destination;
mod manifest;
#[cfg(feature = "pdf")]
mod pdf;
mod source;

pub use destination::Destination;
pub use manifest::{BlankRenderer, ManifestDocument};
#[cfg(feature = "pdf")]
pub use pdf::{PdfDocument, PdfRenderer};
pub use source::DocumentSource;

use log::info;

use crate::error::{Result, ViewerError};
use crate::view::PageSize;

/// A single entry in the document outline
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineEntry {
    /// Display title
    pub title: String,
    /// Nesting level (0 = top level)
    pub level: usize,
    /// Internal target, if any
    pub destination: Option<Destination>,
    /// External link, if any
    pub uri: Option<String>,
}

/// Metadata handed to plugins when a document is loaded
#[derive(Clone, Debug, Default)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    pub title: Option<String>,
    pub outline: Vec<OutlineEntry>,
}

/// Interface to a parsed document
pub trait Document {
    fn page_count(&self) -> usize;

    /// Page size at scale 1 with the page's own rotation applied
    fn page_size(&self, index: usize) -> Result<PageSize>;

    /// Name of the underlying file
    fn name(&self) -> String {
        String::new()
    }

    fn title(&self) -> Option<String> {
        None
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        Vec::new()
    }

    /// Look up a named destination
    fn named_destination(&self, _name: &str) -> Option<Destination> {
        None
    }

    /// Resolve a named destination or a `page=N...` fragment
    fn resolve_destination(&self, reference: &str) -> Result<Destination> {
        let reference = reference.trim_start_matches('#');
        let name = reference
            .split('&')
            .find_map(|pair| pair.strip_prefix("nameddest="))
            .unwrap_or(reference);

        if let Some(dest) = self.named_destination(name) {
            return Ok(dest);
        }

        Destination::parse_fragment(reference)
            .filter(|dest| dest.page_index < self.page_count())
            .ok_or_else(|| ViewerError::UnknownDestination(reference.to_string()))
    }
}

/// Collect document metadata
pub fn describe(doc: &dyn Document) -> DocumentInfo {
    DocumentInfo {
        name: doc.name(),
        page_count: doc.page_count(),
        title: doc.title(),
        outline: doc.outline(),
    }
}

/// Open a document, picking the backend from the file extension
pub fn open_document(source: &DocumentSource) -> Result<Box<dyn Document>> {
    let extension = source.extension().unwrap_or_default();
    info!("Opening document {} ({extension})", source.name());

    match extension.as_str() {
        "yaml" | "yml" | "json" => Ok(Box::new(ManifestDocument::from_source(source)?)),
        #[cfg(feature = "pdf")]
        "pdf" => Ok(Box::new(PdfDocument::from_source(source)?)),
        other => Err(ViewerError::document(format!(
            "unsupported document type: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Size;

    #[test]
    fn resolves_fragments_within_page_count() {
        let doc = ManifestDocument::uniform(3, Size::new(100.0, 100.0));
        assert_eq!(doc.resolve_destination("#page=3").unwrap(), Destination::page(2));
        assert!(matches!(
            doc.resolve_destination("page=4"),
            Err(ViewerError::UnknownDestination(_))
        ));
    }

    #[test]
    fn describe_collects_metadata() {
        let doc = ManifestDocument::uniform(4, Size::new(100.0, 100.0));
        let info = describe(&doc);
        assert_eq!(info.page_count, 4);
        assert!(info.outline.is_empty());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let source = DocumentSource::Bytes {
            name: "notes.txt".into(),
            data: b"hello".to_vec().into(),
        };
        assert!(open_document(&source).is_err());
    }
}
