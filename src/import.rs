use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, CellErrorType, Data, Range, Reader};
use num_traits::ToPrimitive;
use tracing::{debug, info};

use crate::error::{ImportError, Result, ValidationError};
use crate::extract::Identifier;

const IMEI_HEADER: &str = "IMEI";

// Spellings spreadsheet tools use for a missing value
const MISSING: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Cell normalisation
//------------------------------------------------------------------------------

fn float_text(v: f64) -> std::result::Result<Option<String>, ValidationError> {
    if v.is_nan() {
        return Ok(None);
    }
    if v.fract() != 0.0 {
        return Err(ValidationError::InvalidIdentifier(v.to_string()));
    }
    match v.to_u128() {
        Some(n) => Ok(Some(n.to_string())),
        None => Err(ValidationError::InvalidIdentifier(v.to_string())),
    }
}

fn text_cell(s: &str) -> std::result::Result<Option<String>, ValidationError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || MISSING.contains(&s) {
        return Ok(None);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(Some(s.to_string()));
    }
    // Numbers that went through a spreadsheet as text, e.g. "3.5e14"
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => float_text(v),
        _ => Err(ValidationError::InvalidIdentifier(s.to_string())),
    }
}

fn data_cell(cell: &Data) -> std::result::Result<Option<String>, ValidationError> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(n) if *n >= 0 => Ok(Some(n.to_string())),
        Data::Float(v) => float_text(*v),
        Data::String(s) => text_cell(s),
        Data::Error(CellErrorType::NA) => Ok(None),
        other => Err(ValidationError::InvalidIdentifier(other.to_string())),
    }
}

fn to_identifier(text: Option<String>) -> std::result::Result<Option<Identifier>, ValidationError> {
    text.map(Identifier::new).transpose()
}

fn imei_column<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<usize> {
    headers
        .into_iter()
        .position(|h| h.trim().eq_ignore_ascii_case(IMEI_HEADER))
        .ok_or_else(|| ValidationError::MissingColumn(IMEI_HEADER.to_string()).into())
}

// Readers
//------------------------------------------------------------------------------

/// Identifiers from the `IMEI` column of a worksheet whose first row holds the headers.
pub fn read_range(range: &Range<Data>) -> Result<Vec<Identifier>> {
    let mut rows = range.rows();
    let header = rows.next().unwrap_or_default();
    let col = imei_column(header.iter().map(|c| match c {
        Data::String(s) => s.as_str(),
        _ => "",
    }))?;

    let mut ids = Vec::new();
    for row in rows {
        let cell = row.get(col).unwrap_or(&Data::Empty);
        if let Some(id) = to_identifier(data_cell(cell)?)? {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Identifier>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers().map_err(ImportError::from)?.clone();
    let col = imei_column(headers.iter())?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(ImportError::from)?;
        let cell = record.get(col).unwrap_or_default();
        if let Some(id) = to_identifier(text_cell(cell)?)? {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Reads a `.csv` file or the first sheet of any workbook calamine understands.
pub fn read_identifiers(path: &Path) -> Result<Vec<Identifier>> {
    let is_csv = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let ids = if is_csv {
        let file = std::fs::File::open(path).map_err(|e| ImportError::from(csv::Error::from(e)))?;
        read_csv(file)?
    } else {
        let mut workbook = open_workbook_auto(path).map_err(ImportError::from)?;
        let sheet = workbook.sheet_names().into_iter().next().ok_or(ImportError::NoSheets)?;
        debug!(%sheet, "Reading first sheet");
        let range = workbook.worksheet_range(&sheet).map_err(ImportError::from)?;
        read_range(&range)?
    };
    info!(path = %path.display(), count = ids.len(), "Imported identifiers");
    Ok(ids)
}
