//! # qrbox
//!
//! Collects device identifiers (IMEIs) into shipping boxes and exports every
//! box as a QR label, a printable A4 sheet of labels and a spreadsheet.
//!
//! ## Features
//!
//! - **Record extraction**: Pull every run of digits out of scanner or pasted text
//! - **Box allocation**: Fill numbered boxes of 50 automatically, or open and select boxes by hand
//! - **QR generation**: Self-contained QR Model 2 encoder with Reed-Solomon error correction
//! - **Page layout**: 6, 8 or 10 labels per A4 page, or any custom grid
//! - **Export**: PNG per box, PDF label sheet, XLSX or CSV listing, packaged as ZIP or loose files
//! - **Bulk import**: Read the `IMEI` column of an XLSX, XLS, ODS or CSV file
//!
//! ## Quick Start
//!
//! ### Filling boxes
//!
//! ```rust
//! use qrbox::{Session, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(SessionConfig { capacity: 2, ..Default::default() });
//! session.set_product_code("NCE-1");
//! session.set_invoice("NF-9");
//!
//! let report = session.add_text("356938035643809, 490154203237518\n356938035643817")?;
//! assert_eq!(report.added_count(), 3);
//!
//! let names = session.boxes().iter().map(|b| b.name()).collect::<Vec<_>>();
//! assert_eq!(names, ["Box_1", "Box_2"]);
//! # Ok(())
//! # }
//! ```
//!
//! ### Manual boxes
//!
//! ```rust
//! use qrbox::{Policy, Session, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(SessionConfig { policy: Policy::Manual, ..Default::default() });
//! session.open_box("PALLET-A")?;
//! let report = session.add_text("111 222 111")?;
//! assert_eq!(report.added_count(), 2);
//! assert_eq!(report.duplicates.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ### Exporting
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use qrbox::{export_to_dir, Config, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Path::new("qrbox.toml"))?;
//! let mut session = Session::new(config.session.clone());
//! session.add_text("356938035643809")?;
//!
//! let summary = export_to_dir(&session, &config, Path::new("out"))?;
//! println!("{} boxes on {} pages", summary.boxes, summary.pages);
//! # Ok(())
//! # }
//! ```
//!
//! ### Generating a QR code
//!
//! ```rust
//! use qrbox::{ECLevel, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new(b"356938035643809\n490154203237518")
//!     .ec_level(ECLevel::Q)
//!     .build()?;
//!
//! let img = qr.render(10, 4)?; // 10px per module, 4 module quiet zone
//! assert_eq!(img.width() as usize, (qr.width() + 8) * 10);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction, the default
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub(crate) mod common;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod import;
pub mod layout;
pub mod logging;
pub mod session;

pub use builder::{QRBuilder, QR};
pub use common::{ECLevel, MaskPattern, QRError, QRResult, Version};
pub use config::Config;
pub use error::{
    ConfigError, DuplicateError, Error, ExportError, ImportError, Result, ValidationError,
};
pub use export::{export_bundle, export_payload, export_to_dir, ExportBundle, ExportSummary};
pub use extract::{extract, Identifier};
pub use import::read_identifiers;
pub use layout::{GridConfig, Placement};
pub use session::{AddReport, BoxSummary, DeviceBox, Lookup, Policy, Session, SessionConfig};
