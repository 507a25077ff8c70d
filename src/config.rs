use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result, ValidationError};
use crate::export::{ArchiveConfig, DocumentConfig, QrConfig, SheetConfig};
use crate::session::SessionConfig;

/// Every tunable of a qrbox run, usually read from `qrbox.toml`.
///
/// ```toml
/// [session]
/// policy = "manual"
/// manual_capacity = 50
///
/// [document]
/// per_page = 8
/// footer = "Printed at the warehouse"
///
/// [archive]
/// packaging = "directory"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub session: SessionConfig,
    pub qr: QrConfig,
    pub document: DocumentConfig,
    pub sheet: SheetConfig,
    pub archive: ArchiveConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.session.validate()?;
        self.qr.validate()?;
        self.document.grid()?;
        let names = [
            ("document.file_name", &self.document.file_name),
            ("sheet.file_name", &self.sheet.file_name),
            ("sheet.sheet_name", &self.sheet.sheet_name),
            ("archive.file_name", &self.archive.file_name),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidConfig(format!("{key} must not be empty")));
            }
            if value.contains(['/', '\\']) {
                return Err(ValidationError::InvalidConfig(format!("{key} must be a plain name")));
            }
        }
        Ok(())
    }
}
