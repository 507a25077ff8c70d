use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    #[default]
    Zip,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub file_name: String,
    pub packaging: Packaging,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { file_name: "qrcodes.zip".to_string(), packaging: Packaging::Zip }
    }
}

/// File to be packaged, relative to the archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

pub fn build_zip(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        zip.start_file(entry.name.as_str(), options).map_err(ExportError::from)?;
        zip.write_all(&entry.bytes).map_err(ExportError::from)?;
    }
    let cursor = zip.finish().map_err(ExportError::from)?;
    let bytes = cursor.into_inner();
    info!(entries = entries.len(), bytes = bytes.len(), "Built archive");
    Ok(bytes)
}

/// Writes every entry under `dir`, creating it if needed. Returns the written paths.
pub fn write_directory(dir: &Path, entries: &[Entry]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(ExportError::from)?;
    let mut paths = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = dir.join(&entry.name);
        fs::write(&path, &entry.bytes).map_err(ExportError::from)?;
        debug!(path = %path.display(), bytes = entry.bytes.len(), "Wrote file");
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod archive_tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::{build_zip, write_directory, Entry};

    fn entries() -> Vec<Entry> {
        vec![Entry::new("qrcodes.pdf", b"%PDF-1.5".to_vec()), Entry::new("Box_1.png", vec![1, 2, 3])]
    }

    #[test]
    fn test_zip_contents() {
        let bytes = build_zip(&entries()).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut pdf = Vec::new();
        zip.by_name("qrcodes.pdf").unwrap().read_to_end(&mut pdf).unwrap();
        assert_eq!(pdf, b"%PDF-1.5");
        let mut png = Vec::new();
        zip.by_name("Box_1.png").unwrap().read_to_end(&mut png).unwrap();
        assert_eq!(png, vec![1, 2, 3]);
    }

    #[test]
    fn test_write_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested").join("out");
        let paths = write_directory(&out, &entries()).unwrap();
        assert_eq!(paths, vec![out.join("qrcodes.pdf"), out.join("Box_1.png")]);
        assert_eq!(std::fs::read(out.join("Box_1.png")).unwrap(), vec![1, 2, 3]);
    }
}
