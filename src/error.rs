use std::path::PathBuf;

use thiserror::Error;

use crate::common::QRError;
use crate::extract::Identifier;

// Error
//------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

// Rejected input, nothing in the session is touched
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("input is empty")]
    EmptyInput,
    #[error("box name is empty")]
    EmptyBoxName,
    #[error("no active box, open or select one first")]
    NoActiveBox,
    #[error("box `{0}` does not exist")]
    UnknownBox(String),
    #[error("boxes are opened by hand only under the manual policy")]
    ManualOnly,
    #[error("box `{name}` would exceed its capacity of {capacity}")]
    BoxFull { name: String, capacity: usize },
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("required column `{0}` not found")]
    MissingColumn(String),
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("identifier {identifier} is already in box `{box_name}`")]
pub struct DuplicateError {
    pub box_name: String,
    pub identifier: Identifier,
}

// Aborts a single export; the session stays exportable
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export, every box is empty")]
    NothingToExport,
    #[error("failed to encode QR for box `{box_name}`: {source}")]
    Qr {
        box_name: String,
        #[source]
        source: QRError,
    },
    #[error("failed to encode QR payload: {0}")]
    Payload(#[from] QRError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("document error: {0}")]
    Document(#[from] lopdf::Error),
    #[error("spreadsheet error: {0}")]
    Sheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook has no sheets")]
    NoSheets,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod error_tests {
    use super::{DuplicateError, Error, ValidationError};
    use crate::extract::Identifier;

    #[test]
    fn test_messages() {
        let err = Error::from(ValidationError::NoActiveBox);
        assert_eq!(err.to_string(), "no active box, open or select one first");

        let dup = DuplicateError {
            box_name: "A".to_string(),
            identifier: Identifier::new("111").unwrap(),
        };
        assert_eq!(dup.to_string(), "identifier 111 is already in box `A`");
    }
}
