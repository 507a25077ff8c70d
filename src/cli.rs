//! Command line definitions for the qrbox binary.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use qrbox::export::{Packaging, SheetFormat};
use qrbox::logging::LogFormat;
use qrbox::{Config, ECLevel, Policy};

#[derive(Parser)]
#[command(
    name = "qrbox",
    version,
    about = "Collect IMEIs into boxes and print a QR label per box",
    long_about = "Collect device identifiers (IMEIs) into boxes and export every box as a QR label.\n\n\
                  Exports a PDF sheet of labels, one PNG per box and an XLSX or CSV listing,\n\
                  packaged as a ZIP archive or written into a directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output, repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less log output (-q errors only, -qq silent).
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormatArg,

    /// Append logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// TOML configuration file, flags override its values.
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan identifiers from files or stdin, fill boxes and export them.
    Pack(PackArgs),

    /// Load the IMEI column of a spreadsheet, one box per identifier, and export.
    Import(ImportArgs),

    /// Interactive line session, type `:help` for commands.
    Session(SessionArgs),

    /// Render a single payload to a PNG.
    Render(RenderArgs),
}

#[derive(Args)]
pub struct PackArgs {
    /// Text files to scan, stdin when none are given.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Put everything into this box; implies the manual policy.
    #[arg(long = "box", value_name = "NAME")]
    pub box_name: Option<String>,

    #[command(flatten)]
    pub session: SessionFlags,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[derive(Args)]
pub struct ImportArgs {
    /// XLSX, XLS, ODS or CSV file with an `IMEI` header.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[derive(Args)]
pub struct SessionArgs {
    #[command(flatten)]
    pub session: SessionFlags,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Text to encode, stdin when omitted.
    #[arg(value_name = "PAYLOAD")]
    pub payload: Option<String>,

    /// Output PNG.
    #[arg(long, short, value_name = "PATH", default_value = "qrcode.png")]
    pub out: PathBuf,

    /// Error correction level.
    #[arg(long = "ec-level", value_enum)]
    pub ec_level: Option<EcLevelArg>,

    /// Pixels per module.
    #[arg(long = "module-size", value_name = "PX")]
    pub module_size: Option<u32>,
}

#[derive(Args)]
pub struct SessionFlags {
    /// Box allocation policy.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Identifiers per box under the automatic policy.
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output directory.
    #[arg(long, short, value_name = "DIR", default_value = "qrbox-output")]
    pub out: PathBuf,

    /// Product code printed in the page header and the sheet.
    #[arg(long)]
    pub product: Option<String>,

    /// Invoice number printed in the page header and the sheet.
    #[arg(long)]
    pub invoice: Option<String>,

    /// Labels per PDF page: 6, 8 or 10.
    #[arg(long = "per-page", value_name = "N")]
    pub per_page: Option<usize>,

    /// Package the PDF and PNGs as a ZIP or as loose files.
    #[arg(long, value_enum)]
    pub packaging: Option<PackagingArg>,

    /// Spreadsheet format.
    #[arg(long = "sheet-format", value_enum)]
    pub sheet_format: Option<SheetFormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    #[value(alias = "auto")]
    Automatic,
    Manual,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PackagingArg {
    Zip,
    Directory,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SheetFormatArg {
    Xlsx,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EcLevelArg {
    L,
    M,
    Q,
    H,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl From<EcLevelArg> for ECLevel {
    fn from(arg: EcLevelArg) -> Self {
        match arg {
            EcLevelArg::L => ECLevel::L,
            EcLevelArg::M => ECLevel::M,
            EcLevelArg::Q => ECLevel::Q,
            EcLevelArg::H => ECLevel::H,
        }
    }
}

// Flag overrides
//------------------------------------------------------------------------------

impl SessionFlags {
    pub fn apply(&self, config: &mut Config) {
        if let Some(policy) = self.policy {
            config.session.policy = match policy {
                PolicyArg::Automatic => Policy::Automatic,
                PolicyArg::Manual => Policy::Manual,
            };
        }
        if let Some(capacity) = self.capacity {
            config.session.capacity = capacity;
        }
    }
}

impl ExportArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(per_page) = self.per_page {
            config.document.per_page = per_page;
            config.document.grid = None;
        }
        if let Some(packaging) = self.packaging {
            config.archive.packaging = match packaging {
                PackagingArg::Zip => Packaging::Zip,
                PackagingArg::Directory => Packaging::Directory,
            };
        }
        if let Some(format) = self.sheet_format {
            config.sheet.format = match format {
                SheetFormatArg::Xlsx => SheetFormat::Xlsx,
                SheetFormatArg::Csv => SheetFormat::Csv,
            };
        }
    }
}

impl RenderArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = self.ec_level {
            config.qr.ec_level = level.into();
        }
        if let Some(size) = self.module_size {
            config.qr.module_size = size;
        }
    }
}
