use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;
use tracing::info;

use crate::error::{ExportError, Result};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    #[default]
    Xlsx,
    Csv,
}

impl SheetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SheetFormat::Xlsx => "xlsx",
            SheetFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    pub file_name: String,
    pub format: SheetFormat,
    pub sheet_name: String,
    /// Adds a `System` column holding this value on every row
    pub system: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            file_name: "imeis.xlsx".to_string(),
            format: SheetFormat::Xlsx,
            sheet_name: "IMEIs".to_string(),
            system: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow<'a> {
    pub product_code: &'a str,
    pub invoice: &'a str,
    pub box_name: &'a str,
    pub imei: &'a str,
    pub system: Option<&'a str>,
}

impl SheetRow<'_> {
    fn cells(&self) -> Vec<&str> {
        let mut cells = vec![self.product_code, self.invoice, self.box_name, self.imei];
        cells.extend(self.system);
        cells
    }
}

/// One row per box member, boxes in creation order.
pub fn rows<'a>(session: &'a Session, system: Option<&'a str>) -> Vec<SheetRow<'a>> {
    session
        .boxes()
        .iter()
        .flat_map(|b| {
            b.items().iter().map(move |id| SheetRow {
                product_code: session.product_code(),
                invoice: session.invoice(),
                box_name: b.name(),
                imei: id.as_str(),
                system,
            })
        })
        .collect()
}

fn headers(system: bool) -> Vec<&'static str> {
    let mut headers = vec!["Product code", "Invoice", "Box", "IMEI"];
    if system {
        headers.push("System");
    }
    headers
}

fn write_xlsx(rows: &[SheetRow], config: &SheetConfig) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&config.sheet_name).map_err(ExportError::from)?;

    for (col, header) in headers(config.system.is_some()).into_iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &bold).map_err(ExportError::from)?;
    }
    for (r, row) in rows.iter().enumerate() {
        // Identifiers stay text so long IMEIs keep every digit
        for (col, cell) in row.cells().into_iter().enumerate() {
            sheet.write_string(r as u32 + 1, col as u16, cell).map_err(ExportError::from)?;
        }
    }
    let bytes = workbook.save_to_buffer().map_err(ExportError::from)?;
    Ok(bytes)
}

fn write_csv(rows: &[SheetRow], config: &SheetConfig) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers(config.system.is_some())).map_err(ExportError::from)?;
    for row in rows {
        writer.write_record(row.cells()).map_err(ExportError::from)?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::from(e.into_error()))?;
    Ok(bytes)
}

/// Tabular export of every (box, identifier) pair.
pub fn build_sheet(session: &Session, config: &SheetConfig) -> Result<Vec<u8>> {
    let rows = rows(session, config.system.as_deref());
    if rows.is_empty() {
        return Err(ExportError::NothingToExport.into());
    }
    let bytes = match config.format {
        SheetFormat::Xlsx => write_xlsx(&rows, config)?,
        SheetFormat::Csv => write_csv(&rows, config)?,
    };
    info!(rows = rows.len(), format = config.format.extension(), "Built sheet");
    Ok(bytes)
}

#[cfg(test)]
mod sheet_tests {
    use std::io::Cursor;

    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

    use super::{build_sheet, rows, SheetConfig, SheetFormat};
    use crate::error::{Error, ExportError};
    use crate::session::{Policy, Session, SessionConfig};

    fn two_boxes() -> Session {
        let mut session = Session::new(SessionConfig { policy: Policy::Manual, ..Default::default() });
        session.set_product_code("NCE-1");
        session.set_invoice("NF-9");
        session.open_box("A").unwrap();
        session.add_text("111 222").unwrap();
        session.open_box("B").unwrap();
        session.add_text("333").unwrap();
        session
    }

    #[test]
    fn test_rows_pair_box_and_identifier() {
        let session = two_boxes();
        let pairs = rows(&session, None).iter().map(|r| (r.box_name, r.imei)).collect::<Vec<_>>();
        assert_eq!(pairs, vec![("A", "111"), ("A", "222"), ("B", "333")]);
    }

    #[test]
    fn test_xlsx_reads_back() {
        let session = two_boxes();
        let bytes = build_sheet(&session, &SheetConfig::default()).unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["IMEIs".to_string()]);
        let range = workbook.worksheet_range("IMEIs").unwrap();
        let cells = range
            .rows()
            .map(|r| {
                r.iter()
                    .map(|c| match c {
                        Data::String(s) => s.clone(),
                        other => panic!("Unexpected cell {other:?}"),
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        assert_eq!(
            cells,
            vec![
                vec!["Product code", "Invoice", "Box", "IMEI"],
                vec!["NCE-1", "NF-9", "A", "111"],
                vec!["NCE-1", "NF-9", "A", "222"],
                vec!["NCE-1", "NF-9", "B", "333"],
            ]
        );
    }

    #[test]
    fn test_csv_with_system_column() {
        let session = two_boxes();
        let config = SheetConfig {
            format: SheetFormat::Csv,
            system: Some("Android".into()),
            ..Default::default()
        };
        let bytes = build_sheet(&session, &config).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "Product code,Invoice,Box,IMEI,System\n\
             NCE-1,NF-9,A,111,Android\n\
             NCE-1,NF-9,A,222,Android\n\
             NCE-1,NF-9,B,333,Android\n"
        );
    }

    #[test]
    fn test_empty_session() {
        let res = build_sheet(&Session::default(), &SheetConfig::default());
        assert!(matches!(res, Err(Error::Export(ExportError::NothingToExport))));
    }
}
