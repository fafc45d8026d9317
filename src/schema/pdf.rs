use super::{
    Checker, FONT_SIZE_RANGE, ImageSpec, ValidationError, coerce_f64, field_path, item_path,
    parse_images,
};
use serde_json::{Map, Value};

pub const PDF_IMAGE_WIDTH: f64 = 3.0;
pub const DEFAULT_MARGIN_INCHES: f64 = 1.0;
pub const MARGIN_RANGE: (f64, f64) = (0.0, 3.0);
pub const LEADING_RANGE: (f64, f64) = (6.0, 120.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// Width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.2756, 841.8898),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: DEFAULT_MARGIN_INCHES,
            right: DEFAULT_MARGIN_INCHES,
            top: DEFAULT_MARGIN_INCHES,
            bottom: DEFAULT_MARGIN_INCHES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfParagraph {
    /// May contain `<b>`, `<i>`, `<u>` and `<br/>` markup.
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_name: Option<String>,
    pub font_size_pt: Option<f64>,
    pub leading_pt: Option<f64>,
    pub align: Align,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfTable {
    pub rows: Vec<Vec<String>>,
    pub header: bool,
    pub col_widths_inches: Option<Vec<f64>>,
    pub style_grid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfInstructions {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub page_size: PageSize,
    pub margins: Margins,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub show_page_numbers: bool,
    pub paragraphs: Vec<PdfParagraph>,
    pub tables: Vec<PdfTable>,
    pub images: Vec<ImageSpec>,
}

impl Default for PdfInstructions {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            subject: None,
            page_size: PageSize::Letter,
            margins: Margins::default(),
            header_text: None,
            footer_text: None,
            show_page_numbers: true,
            paragraphs: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
        }
    }
}

impl PdfInstructions {
    /// Whether a modify request has anything worth rendering as new pages.
    pub fn has_content(&self) -> bool {
        !self.paragraphs.is_empty()
            || !self.images.is_empty()
            || !self.tables.is_empty()
            || self.title.as_deref().is_some_and(|t| !t.is_empty())
            || self.header_text.as_deref().is_some_and(|t| !t.is_empty())
            || self.footer_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

pub fn parse_pdf(map: &Map<String, Value>) -> Result<PdfInstructions, ValidationError> {
    let mut checker = Checker::new();

    let page_size = match checker.opt_enum(map, "page_size", "", &["LETTER", "A4"]).as_deref() {
        Some("A4") => PageSize::A4,
        _ => PageSize::Letter,
    };

    let mut margins = Margins::default();
    if let Some(obj) = checker.opt_object(map, "margins_inches", "") {
        let slots: [(&str, &mut f64); 4] = [
            ("left", &mut margins.left),
            ("right", &mut margins.right),
            ("top", &mut margins.top),
            ("bottom", &mut margins.bottom),
        ];
        for (key, slot) in slots {
            *slot = checker.f64_in_or(
                obj,
                key,
                "margins_inches",
                MARGIN_RANGE.0,
                MARGIN_RANGE.1,
                DEFAULT_MARGIN_INCHES,
            );
        }
    }

    let mut paragraphs = Vec::new();
    for (index, item) in checker.array(map, "paragraphs", "").iter().enumerate() {
        let path = item_path("", "paragraphs", index);
        if let Some(obj) = checker.object(item, &path) {
            paragraphs.push(parse_paragraph(&mut checker, obj, &path));
        }
    }

    let mut tables = Vec::new();
    for (index, item) in checker.array(map, "tables", "").iter().enumerate() {
        let path = item_path("", "tables", index);
        if let Some(obj) = checker.object(item, &path) {
            tables.push(parse_table(&mut checker, obj, &path));
        }
    }

    let images = parse_images(&mut checker, map, "", PDF_IMAGE_WIDTH);

    let instructions = PdfInstructions {
        title: checker.opt_str(map, "title", ""),
        author: checker.opt_str(map, "author", ""),
        subject: checker.opt_str(map, "subject", ""),
        page_size,
        margins,
        header_text: checker.opt_str(map, "header_text", ""),
        footer_text: checker.opt_str(map, "footer_text", ""),
        show_page_numbers: checker.bool_or(map, "show_page_numbers", "", true),
        paragraphs,
        tables,
        images,
    };
    checker.finish(instructions)
}

fn parse_paragraph(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> PdfParagraph {
    let align = match checker
        .opt_enum(obj, "align", path, &["left", "center", "right", "justify"])
        .as_deref()
    {
        Some("center") => Align::Center,
        Some("right") => Align::Right,
        Some("justify") => Align::Justify,
        _ => Align::Left,
    };
    PdfParagraph {
        text: checker.req_str(obj, "text", path),
        bold: checker.bool_or(obj, "bold", path, false),
        italic: checker.bool_or(obj, "italic", path, false),
        underline: checker.bool_or(obj, "underline", path, false),
        font_name: checker.opt_str(obj, "font_name", path),
        font_size_pt: checker.opt_f64_in(
            obj,
            "font_size_pt",
            path,
            FONT_SIZE_RANGE.0,
            FONT_SIZE_RANGE.1,
        ),
        leading_pt: checker.opt_f64_in(obj, "leading_pt", path, LEADING_RANGE.0, LEADING_RANGE.1),
        align,
        color: checker.opt_color(obj, "color", path),
    }
}

fn parse_table(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> PdfTable {
    let rows_path = field_path(path, "rows");
    let mut rows = Vec::new();
    match obj.get("rows") {
        None | Some(Value::Null) => checker.push(rows_path.clone(), "field required"),
        Some(Value::Array(items)) if items.is_empty() => {
            checker.push(rows_path.clone(), "must contain at least 1 row")
        }
        Some(_) => {}
    }
    for (r, row) in checker.array(obj, "rows", path).iter().enumerate() {
        let row_path = format!("{rows_path}[{r}]");
        let Some(cells) = row.as_array() else {
            checker.push(row_path, "must be an array");
            continue;
        };
        let mut out = Vec::with_capacity(cells.len());
        for (c, cell) in cells.iter().enumerate() {
            match cell {
                Value::String(text) => out.push(text.clone()),
                Value::Number(number) => out.push(number.to_string()),
                Value::Null => out.push(String::new()),
                _ => checker.push(format!("{row_path}[{c}]"), "must be a string, number or null"),
            }
        }
        rows.push(out);
    }

    let col_widths_inches = match obj.get("col_widths_inches") {
        None | Some(Value::Null) => None,
        Some(_) => {
            let mut widths = Vec::new();
            for (index, value) in checker
                .array(obj, "col_widths_inches", path)
                .iter()
                .enumerate()
            {
                match coerce_f64(value) {
                    Some(width) if width > 0.0 => widths.push(width),
                    _ => checker.push(
                        item_path(path, "col_widths_inches", index),
                        "must be a positive number",
                    ),
                }
            }
            Some(widths)
        }
    };

    PdfTable {
        rows,
        header: checker.bool_or(obj, "header", path, false),
        col_widths_inches,
        style_grid: checker.bool_or(obj, "style_grid", path, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn defaults() {
        let pdf = parse_pdf(&Map::new()).expect("pdf");
        assert_eq!(pdf.page_size, PageSize::Letter);
        assert_eq!(pdf.margins, Margins::default());
        assert!(pdf.show_page_numbers);
        assert!(!pdf.has_content());
    }

    #[test]
    fn partial_margins_fill_in_defaults() {
        let pdf = parse_pdf(&obj(json!({"margins_inches": {"left": 0.5}, "page_size": "A4"})))
            .expect("pdf");
        assert_eq!(pdf.margins.left, 0.5);
        assert_eq!(pdf.margins.top, 1.0);
        assert_eq!(pdf.page_size, PageSize::A4);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = parse_pdf(&obj(json!({
            "margins_inches": {"top": 3.5},
            "page_size": "A3",
            "paragraphs": [{"text": "x", "leading_pt": 4, "align": "middle"}],
            "tables": [{"rows": []}]
        })))
        .expect_err("invalid");
        let paths: Vec<&str> = err.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "page_size",
                "margins_inches.top",
                "paragraphs[0].align",
                "paragraphs[0].leading_pt",
                "tables[0].rows",
            ]
        );
    }

    #[test]
    fn table_cells_accept_numbers_and_null() {
        let pdf = parse_pdf(&obj(json!({
            "tables": [{"rows": [["h1", "h2"], [1, null]], "header": true}]
        })))
        .expect("pdf");
        let table = &pdf.tables[0];
        assert!(table.header);
        assert!(table.style_grid);
        assert_eq!(table.rows[1], vec!["1".to_string(), String::new()]);
        assert!(pdf.has_content());
    }

    #[test]
    fn header_only_counts_as_content() {
        let pdf = parse_pdf(&obj(json!({"header_text": "Draft"}))).expect("pdf");
        assert!(pdf.has_content());
    }
}
