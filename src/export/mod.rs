//! Turns a session into printable and shareable files.
//!
//! Every box becomes a PNG label, the labels are laid out into an A4 PDF, and
//! the box contents go into a spreadsheet. The PDF and the PNGs are then
//! packaged as a ZIP archive or written loose into a directory. Nothing here
//! mutates the session, so a failed export can simply be retried.

mod archive;
mod document;
mod images;
mod sheet;

pub use archive::{build_zip, write_directory, ArchiveConfig, Entry, Packaging};
pub use document::{build_document, DocumentConfig, RenderedDocument};
pub use images::{encode_png, render_boxes, render_payload, BoxImage, QrConfig};
pub use sheet::{build_sheet, rows, SheetConfig, SheetFormat, SheetRow};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::session::Session;

// Bundle
//------------------------------------------------------------------------------

/// Everything one export produces, still in memory.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub images: Vec<BoxImage>,
    pub document: RenderedDocument,
    pub document_name: String,
    pub sheet: Vec<u8>,
    pub sheet_name: String,
}

impl ExportBundle {
    /// Archive contents: the document first, then one PNG per box.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(self.images.len() + 1);
        entries.push(Entry::new(self.document_name.as_str(), self.document.bytes.clone()));
        entries.extend(self.images.iter().map(|img| Entry::new(img.file_name.as_str(), img.png.clone())));
        entries
    }

    pub fn to_zip(&self) -> Result<Vec<u8>> {
        build_zip(&self.entries())
    }
}

pub fn export_bundle(session: &Session, config: &Config) -> Result<ExportBundle> {
    let images = render_boxes(session, &config.qr)?;
    if images.is_empty() {
        return Err(ExportError::NothingToExport.into());
    }
    let document = build_document(session, &images, &config.document)?;
    let sheet = build_sheet(session, &config.sheet)?;
    let sheet_name = Path::new(&config.sheet.file_name)
        .with_extension(config.sheet.format.extension())
        .to_string_lossy()
        .into_owned();

    Ok(ExportBundle {
        images,
        document,
        document_name: config.document.file_name.clone(),
        sheet,
        sheet_name,
    })
}

// Writing
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub boxes: usize,
    pub pages: usize,
    pub files: Vec<PathBuf>,
}

/// Exports the session into `out_dir`.
///
/// With ZIP packaging the directory receives the archive and the spreadsheet.
/// With directory packaging it receives the document, the PNGs and the
/// spreadsheet as loose files.
pub fn export_to_dir(session: &Session, config: &Config, out_dir: &Path) -> Result<ExportSummary> {
    let bundle = export_bundle(session, config)?;
    let sheet = Entry::new(bundle.sheet_name.as_str(), bundle.sheet.clone());

    let files = match config.archive.packaging {
        Packaging::Zip => {
            let zip = Entry::new(config.archive.file_name.as_str(), bundle.to_zip()?);
            write_directory(out_dir, &[zip, sheet])?
        }
        Packaging::Directory => {
            let mut entries = bundle.entries();
            entries.push(sheet);
            write_directory(out_dir, &entries)?
        }
    };

    let summary = ExportSummary { boxes: bundle.images.len(), pages: bundle.document.pages, files };
    info!(
        out_dir = %out_dir.display(),
        boxes = summary.boxes,
        pages = summary.pages,
        files = summary.files.len(),
        "Exported session"
    );
    Ok(summary)
}

/// Writes a single PNG for an arbitrary payload.
pub fn export_payload(payload: &str, qr: &QrConfig, path: &Path) -> Result<()> {
    let img = render_payload(payload, qr).map_err(ExportError::from)?;
    let png = encode_png(img)?;
    fs::write(path, png).map_err(ExportError::from)?;
    info!(path = %path.display(), "Rendered payload");
    Ok(())
}
