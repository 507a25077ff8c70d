//! Line oriented session: every line is either a `:command` or scanned text.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use qrbox::{export_to_dir, Config, Lookup, Session};

use crate::commands::{print_export, print_summary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    OpenBox(String),
    Select(String),
    Product(String),
    Invoice(String),
    List,
    Export,
    Clear,
    Help,
    Quit,
    Text(String),
    Invalid(String),
}

impl Line {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Line::Blank;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Line::Text(line.to_string());
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        let with_arg = |f: fn(String) -> Line| {
            if arg.is_empty() {
                Line::Invalid(format!(":{name} needs an argument"))
            } else {
                f(arg.to_string())
            }
        };
        match name {
            "box" | "b" => with_arg(Line::OpenBox),
            "select" | "s" => with_arg(Line::Select),
            "product" => with_arg(Line::Product),
            "invoice" => with_arg(Line::Invoice),
            "list" | "l" => Line::List,
            "export" | "e" => Line::Export,
            "clear" => Line::Clear,
            "help" | "h" | "?" => Line::Help,
            "quit" | "q" | "exit" => Line::Quit,
            other => Line::Invalid(format!("unknown command :{other}, try :help")),
        }
    }
}

pub struct Repl {
    session: Session,
    config: Config,
    out_dir: PathBuf,
}

impl Repl {
    pub fn new(session: Session, config: Config, out_dir: PathBuf) -> Self {
        Self { session, config, out_dir }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until `:quit` or end of input. Command failures are printed and the
    /// session goes on; only I/O errors on `input` or `output` end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        writeln!(output, "qrbox session ({:?} policy), :help for commands", self.session.policy())?;
        for line in input.lines() {
            let line = Line::parse(&line?);
            debug!(?line, "Read line");
            if line == Line::Quit {
                break;
            }
            if let Err(e) = self.handle(line, &mut output) {
                writeln!(output, "error: {e}")?;
            }
            output.flush()?;
        }
        Ok(())
    }

    fn handle<W: Write>(&mut self, line: Line, out: &mut W) -> Result<()> {
        match line {
            Line::Blank | Line::Quit => {}
            Line::OpenBox(name) => {
                let lookup = self.session.open_box(&name)?;
                let verb = if lookup == Lookup::Created { "Opened new" } else { "Reopened" };
                writeln!(out, "{verb} box {}", name.trim())?;
            }
            Line::Select(name) => {
                self.session.select(&name)?;
                writeln!(out, "Selected box {}", name.trim())?;
            }
            Line::Product(code) => {
                self.session.set_product_code(code);
                writeln!(out, "Product code set")?;
            }
            Line::Invoice(invoice) => {
                self.session.set_invoice(invoice);
                writeln!(out, "Invoice set")?;
            }
            Line::List => print_summary(out, &self.session)?,
            Line::Export => {
                let summary = export_to_dir(&self.session, &self.config, &self.out_dir)?;
                print_export(out, &summary)?;
            }
            Line::Clear => {
                self.session.clear();
                writeln!(out, "Session cleared")?;
            }
            Line::Help => out.write_all(HELP.as_bytes())?,
            Line::Text(text) => {
                let report = self.session.add_text(&text)?;
                writeln!(out, "{report}")?;
            }
            Line::Invalid(msg) => writeln!(out, "{msg}")?,
        }
        Ok(())
    }
}


const HELP: &str = "\
Type or paste identifiers, every run of digits is one IMEI.
  :box NAME      open (or create) a box and make it active, manual policy
  :select NAME   make an existing box active, manual policy
  :product CODE  set the product code
  :invoice NO    set the invoice number
  :list          show every box
  :export        write the PDF, PNGs and spreadsheet
  :clear         drop every box
  :help          this text
  :quit          leave
";
