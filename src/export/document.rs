use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Deserialize;
use tracing::{debug, info};

use super::images::BoxImage;
use crate::error::{ExportError, Result, ValidationError};
use crate::layout::{GridConfig, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// Grid preset: 6, 8 or 10 labels per page
    pub per_page: usize,
    /// Explicit geometry, overrides `per_page`
    pub grid: Option<GridConfig>,
    /// Line under the header on every page
    pub subtitle: Option<String>,
    /// Line at the bottom of the last page
    pub footer: Option<String>,
    pub file_name: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            per_page: 6,
            grid: None,
            subtitle: None,
            footer: None,
            file_name: "qrcodes.pdf".to_string(),
        }
    }
}

impl DocumentConfig {
    pub fn grid(&self) -> std::result::Result<GridConfig, ValidationError> {
        let grid = match self.grid {
            Some(grid) => grid,
            None => GridConfig::preset(self.per_page)?,
        };
        grid.validate()?;
        Ok(grid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

// Page drawing
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }

    // Width in thousandths of the font size
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            _ => DEFAULT_GLYPH_WIDTH,
        }
    }

    fn text_width(self, encoded: &[u8], size: f64) -> f64 {
        encoded.iter().map(|&b| self.glyph_width(b) as f64).sum::<f64>() * size / 1000.0
    }
}

fn mm(v: f64) -> f64 {
    v * 72.0 / 25.4
}

fn real(v: f64) -> Object {
    (v as f32).into()
}

// WinAnsi bytes for the standard fonts, '?' for anything they cannot show
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

// Collects the content stream of one page. Positions are millimetres from the
// top left corner and are flipped into PDF user space here.
struct PageWriter {
    ops: Vec<Operation>,
    xobjects: Dictionary,
}

impl PageWriter {
    fn new() -> Self {
        Self { ops: Vec::new(), xobjects: Dictionary::new() }
    }

    // Centres a line of text in a box, the way a single-line cell would
    fn centered_text(&mut self, font: Font, size: f64, center_x: f64, top: f64, height: f64, text: &str) {
        let encoded = win_ansi(text);
        let width = font.text_width(&encoded, size);
        let size_mm = size * 25.4 / 72.0;
        let baseline = top + height / 2.0 + 0.3 * size_mm;

        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Tf", vec![font.resource().into(), real(size)]));
        self.ops.push(Operation::new(
            "Td",
            vec![real(mm(center_x) - width / 2.0), real(PAGE_HEIGHT_PT - mm(baseline))],
        ));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn image(&mut self, name: &str, id: ObjectId, x: f64, y: f64, size: f64) {
        self.xobjects.set(name, id);
        let size = mm(size);
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                real(size),
                real(0.0),
                real(0.0),
                real(size),
                real(mm(x)),
                real(PAGE_HEIGHT_PT - mm(y) - size),
            ],
        ));
        self.ops.push(Operation::new("Do", vec![name.into()]));
        self.ops.push(Operation::new("Q", vec![]));
    }
}

// Document
//------------------------------------------------------------------------------

fn add_image(doc: &mut Document, img: &BoxImage) -> Result<ObjectId> {
    let gray = image::load_from_memory(&img.png).map_err(ExportError::from)?.to_luma8();
    let (w, h) = gray.dimensions();
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(w),
        "Height" => i64::from(h),
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => 8,
    };
    Ok(doc.add_object(Stream::new(dict, gray.into_raw())))
}

/// Lays the box labels out on A4 pages.
///
/// Every page repeats the product code & invoice header. Each label shows the
/// box name, its item count and its most recent identifier under the QR.
pub fn build_document(
    session: &Session,
    images: &[BoxImage],
    config: &DocumentConfig,
) -> Result<RenderedDocument> {
    let grid = config.grid()?;
    if images.is_empty() {
        return Err(ExportError::NothingToExport.into());
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource(), id);
    }

    let header = format!("Product: {}    Invoice: {}", session.product_code(), session.invoice());
    let page_ranges = grid.pages(images.len());
    let last_page = page_ranges.len() - 1;
    let mut kids = Vec::with_capacity(page_ranges.len());

    for (page_no, range) in page_ranges.into_iter().enumerate() {
        let mut page = PageWriter::new();

        page.centered_text(Font::Bold, 12.0, PAGE_WIDTH_MM / 2.0, HEADER_TOP, 8.0, &header);
        if let Some(subtitle) = &config.subtitle {
            page.centered_text(Font::Oblique, 8.0, PAGE_WIDTH_MM / 2.0, HEADER_TOP + 8.0, 6.0, subtitle);
        }

        for i in range {
            let img = &images[i];
            let p = grid.place(i);
            let id = add_image(&mut doc, img)?;
            page.image(&format!("Im{i}"), id, p.x, p.y, grid.cell_width);

            let center = p.x + grid.cell_width / 2.0;
            let top = p.y + grid.cell_height + LABEL_GAP;
            let lines = [
                img.box_name.clone(),
                format!("Qty: {}", img.count),
                format!("Last: {}", img.last),
            ];
            for (k, line) in lines.iter().enumerate() {
                let line_top = top + k as f64 * LABEL_LINE_HEIGHT;
                page.centered_text(Font::Bold, 9.0, center, line_top, LABEL_LINE_HEIGHT, line);
            }
        }

        if page_no == last_page {
            if let Some(footer) = &config.footer {
                let top = PAGE_HEIGHT_MM - 15.0;
                page.centered_text(Font::Oblique, 8.0, PAGE_WIDTH_MM / 2.0, top, 10.0, footer);
            }
        }

        let content = Content { operations: page.ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(ExportError::from)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => page.xobjects,
            },
        });
        debug!(page = page_no, "Laid out page");
        kids.push(Object::from(page_id));
    }

    let pages = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
            "MediaBox" => vec![real(0.0), real(0.0), real(PAGE_WIDTH_PT), real(PAGE_HEIGHT_PT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(ExportError::from)?;
    info!(labels = images.len(), pages, bytes = bytes.len(), "Built document");
    Ok(RenderedDocument { bytes, pages })
}

#[cfg(test)]
mod document_tests {
    use lopdf::Document;

    use super::{build_document, win_ansi, DocumentConfig, Font};
    use crate::error::{Error, ExportError, ValidationError};
    use crate::export::images::{render_boxes, BoxImage, QrConfig};
    use crate::extract::Identifier;
    use crate::session::{Session, SessionConfig};

    fn session_with(boxes: usize) -> Session {
        let mut session = Session::new(SessionConfig { capacity: 2, ..SessionConfig::default() });
        session.set_product_code("NCE-1");
        session.set_invoice("NF-9");
        let text = (0..boxes * 2).map(|i| format!("{:015}", i)).collect::<Vec<_>>().join(" ");
        session.add_text(&text).unwrap();
        session
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_text_width() {
        // "Box" in Helvetica-Bold at 1000 units
        assert_eq!(Font::Bold.text_width(b"Box", 1000.0), (722 + 611 + 556) as f64);
        assert_eq!(Font::Regular.text_width(b"il", 10.0), 4.44);
    }

    #[test]
    fn test_pages_and_header() {
        let session = session_with(7);
        let images = render_boxes(&session, &QrConfig { module_size: 2, ..Default::default() }).unwrap();
        let config = DocumentConfig {
            subtitle: Some("Brand X".into()),
            footer: Some("Printed by qrbox".into()),
            ..Default::default()
        };
        let rendered = build_document(&session, &images, &config).unwrap();
        assert_eq!(rendered.pages, 2);
        assert!(rendered.bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&rendered.bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let first = doc.get_page_content(pages[&1]).unwrap();
        let second = doc.get_page_content(pages[&2]).unwrap();
        for content in [&first, &second] {
            assert!(contains(content, b"(Product: NCE-1    Invoice: NF-9)"));
            assert!(contains(content, b"(Brand X)"));
        }
        assert!(contains(&first, b"(Box_6)"));
        assert!(contains(&second, b"(Box_7)"));
        assert!(contains(&second, b"(Qty: 2)"));
        assert!(contains(&second, b"(Last: 000000000000013)"));
        assert!(!contains(&first, b"(Printed by qrbox)"));
        assert!(contains(&second, b"(Printed by qrbox)"));
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("Box_1"), b"Box_1");
        assert_eq!(win_ansi("Último"), b"\xDAltimo");
        assert_eq!(win_ansi("产品-7"), b"??-7");
    }

    #[test]
    fn test_unmappable_header() {
        let mut session = session_with(1);
        session.set_product_code("产品-7");
        let images = render_boxes(&session, &QrConfig { module_size: 2, ..Default::default() }).unwrap();
        let rendered = build_document(&session, &images, &DocumentConfig::default()).unwrap();

        let doc = Document::load_mem(&rendered.bytes).unwrap();
        let content = doc.get_page_content(doc.get_pages()[&1]).unwrap();
        assert!(contains(&content, b"(Product: ??-7    Invoice: NF-9)"));
        assert!(!contains(&content, b"&#"));
    }

    #[test]
    fn test_unreadable_image() {
        let session = session_with(1);
        let images = vec![BoxImage {
            box_name: "Box_1".into(),
            file_name: "Box_1.png".into(),
            count: 1,
            last: Identifier::new("1").unwrap(),
            png: b"not a png".to_vec(),
        }];
        let res = build_document(&session, &images, &DocumentConfig::default());
        assert!(matches!(res, Err(Error::Export(ExportError::Image(_)))));
    }

    #[test]
    fn test_nothing_to_export() {
        let session = Session::default();
        let res = build_document(&session, &[], &DocumentConfig::default());
        assert!(matches!(res, Err(Error::Export(ExportError::NothingToExport))));
    }

    #[test]
    fn test_invalid_preset() {
        let session = session_with(1);
        let config = DocumentConfig { per_page: 7, ..Default::default() };
        let res = build_document(&session, &[], &config);
        assert!(matches!(res, Err(Error::Validation(ValidationError::InvalidGrid(_)))));
    }
}

// Global constants
//------------------------------------------------------------------------------

const PAGE_WIDTH_PT: f64 = 595.28;

const PAGE_HEIGHT_PT: f64 = 841.89;

const HEADER_TOP: f64 = 10.0;

const LABEL_GAP: f64 = 2.0;

const LABEL_LINE_HEIGHT: f64 = 5.0;

const DEFAULT_GLYPH_WIDTH: u16 = 556;

// Standard 14 font metrics for the printable ASCII range, space to tilde
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
