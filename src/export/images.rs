use std::collections::HashSet;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use serde::Deserialize;
use tracing::debug;

use crate::builder::QRBuilder;
use crate::common::{ECLevel, QRResult};
use crate::error::{ExportError, Result, ValidationError};
use crate::extract::Identifier;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    pub ec_level: ECLevel,
    /// Pixels per module
    pub module_size: u32,
    /// Light border, in modules
    pub quiet_zone: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self { ec_level: ECLevel::M, module_size: 10, quiet_zone: 4 }
    }
}

impl QrConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.module_size == 0 {
            return Err(ValidationError::InvalidConfig("qr.module_size must be positive".into()));
        }
        Ok(())
    }
}

/// QR label of one box, PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxImage {
    pub box_name: String,
    pub file_name: String,
    pub count: usize,
    pub last: Identifier,
    pub png: Vec<u8>,
}

pub fn render_payload(payload: &str, config: &QrConfig) -> QRResult<GrayImage> {
    let qr = QRBuilder::new(payload.as_bytes()).ec_level(config.ec_level).build()?;
    qr.render(config.module_size, config.quiet_zone)
}

pub fn encode_png(img: GrayImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(ExportError::from)?;
    Ok(bytes)
}

/// One PNG per non-empty box, in box creation order.
pub fn render_boxes(session: &Session, config: &QrConfig) -> Result<Vec<BoxImage>> {
    let mut taken = HashSet::new();
    let mut images = Vec::new();
    for b in session.boxes() {
        let Some(last) = b.last() else {
            continue;
        };
        let img = render_payload(&b.payload(), config)
            .map_err(|source| ExportError::Qr { box_name: b.name().to_string(), source })?;
        let png = encode_png(img)?;

        let file_name = unique_file_name(b.name(), &mut taken);
        debug!(box_name = b.name(), %file_name, bytes = png.len(), "Rendered box label");
        images.push(BoxImage {
            box_name: b.name().to_string(),
            file_name,
            count: b.len(),
            last: last.clone(),
            png,
        });
    }
    Ok(images)
}

// Characters outside [A-Za-z0-9._-] become '_' and leading dots are dropped.
// Clashing names get a numeric suffix.
fn unique_file_name(box_name: &str, taken: &mut HashSet<String>) -> String {
    let stem = box_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect::<String>();
    let stem = stem.trim_start_matches('.');
    let stem = if stem.is_empty() { "box" } else { stem };

    let mut name = format!("{stem}.png");
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{stem}-{n}.png");
        n += 1;
    }
    name
}
