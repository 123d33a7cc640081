//! Where document bytes come from

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::error::Result;

/// A document file on disk or already in memory
#[derive(Clone, Debug)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes { name: String, data: Arc<[u8]> },
}

impl DocumentSource {
    /// File name shown to the user
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    /// Lowercased file extension
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Path(path) => path.to_string_lossy().into_owned(),
            Self::Bytes { name, .. } => name.clone(),
        };
        Path::new(&name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => {
                let data = fs::read(path)?;
                debug!("Read {} bytes from {path:?}", data.len());
                Ok(data)
            }
            Self::Bytes { data, .. } => Ok(data.to_vec()),
        }
    }

    pub fn read_to_string(&self) -> Result<String> {
        match self {
            Self::Path(path) => Ok(fs::read_to_string(path)?),
            Self::Bytes { data, .. } => Ok(String::from_utf8_lossy(data).into_owned()),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Book.YAML");
        fs::write(&path, "pages: []").unwrap();

        let source = DocumentSource::from(path.as_path());
        assert_eq!(source.name(), "Book.YAML");
        assert_eq!(source.extension().as_deref(), Some("yaml"));
        assert_eq!(source.read_to_string().unwrap(), "pages: []");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = DocumentSource::Path(PathBuf::from("/definitely/not/here.pdf"));
        assert!(matches!(source.read(), Err(crate::ViewerError::Io(_))));
    }

    #[test]
    fn in_memory_bytes_keep_their_name() {
        let source = DocumentSource::Bytes {
            name: "scan.pdf".into(),
            data: vec![1, 2, 3].into(),
        };
        assert_eq!(source.name(), "scan.pdf");
        assert_eq!(source.read().unwrap(), vec![1, 2, 3]);
    }
}
