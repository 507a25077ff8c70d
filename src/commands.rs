use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, info_span, warn};

use qrbox::{export_payload, export_to_dir, read_identifiers, Config, ExportSummary, Policy, Session};

use crate::cli::{ExportArgs, ImportArgs, PackArgs, RenderArgs, SessionArgs};
use crate::repl::Repl;

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn new_session(config: &Config, export: &ExportArgs) -> Session {
    let mut session = Session::new(config.session.clone());
    if let Some(product) = &export.product {
        session.set_product_code(product.as_str());
    }
    if let Some(invoice) = &export.invoice {
        session.set_invoice(invoice.as_str());
    }
    session
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text).context("read stdin")?;
    Ok(text)
}

pub fn print_summary(out: &mut impl Write, session: &Session) -> io::Result<()> {
    if session.boxes().is_empty() {
        return writeln!(out, "No boxes yet");
    }
    for summary in session.summary() {
        write!(out, "{summary}")?;
    }
    writeln!(out, "{} IMEIs in {} boxes", session.total_items(), session.boxes().len())
}

pub fn print_export(out: &mut impl Write, summary: &ExportSummary) -> io::Result<()> {
    writeln!(out, "Exported {} boxes on {} pages:", summary.boxes, summary.pages)?;
    for file in &summary.files {
        writeln!(out, "  {}", file.display())?;
    }
    Ok(())
}

pub fn run_pack(args: &PackArgs, mut config: Config) -> Result<()> {
    let _span = info_span!("pack").entered();
    args.session.apply(&mut config);
    args.export.apply(&mut config);
    if args.box_name.is_some() {
        config.session.policy = Policy::Manual;
    }
    config.validate()?;

    let mut session = new_session(&config, &args.export);
    if let Some(name) = &args.box_name {
        session.open_box(name)?;
    } else if session.policy() == Policy::Manual {
        bail!("the manual policy needs --box NAME");
    }

    let text = if args.files.is_empty() {
        read_stdin()?
    } else {
        let mut text = String::new();
        for file in &args.files {
            let content =
                fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
            text.push_str(&content);
            text.push('\n');
        }
        text
    };

    let report = session.add_text(&text)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{report}")?;
    print_summary(&mut stdout, &session)?;

    let summary = export_to_dir(&session, &config, &args.export.out)?;
    print_export(&mut stdout, &summary)?;
    Ok(())
}

pub fn run_import(args: &ImportArgs, mut config: Config) -> Result<()> {
    let _span = info_span!("import", file = %args.file.display()).entered();
    args.export.apply(&mut config);
    config.validate()?;

    let ids = read_identifiers(&args.file)?;
    let mut session = new_session(&config, &args.export);
    let boxes = session.load_bulk(ids)?;
    info!(boxes, "Loaded spreadsheet");

    let summary = export_to_dir(&session, &config, &args.export.out)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{boxes} boxes loaded from {}", args.file.display())?;
    print_export(&mut stdout, &summary)?;
    Ok(())
}

pub fn run_session(args: &SessionArgs, mut config: Config) -> Result<()> {
    args.session.apply(&mut config);
    args.export.apply(&mut config);
    config.validate()?;

    let session = new_session(&config, &args.export);
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    Repl::new(session, config, args.export.out.clone()).run(stdin, stdout)
}

pub fn run_render(args: &RenderArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let payload = match &args.payload {
        Some(payload) => payload.clone(),
        None => {
            let text = read_stdin()?;
            text.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if payload.is_empty() {
        warn!("Rendering an empty payload");
    }
    export_payload(&payload, &config.qr, &args.out)?;
    println!("Wrote {}", args.out.display());
    Ok(())
}
