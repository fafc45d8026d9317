use super::cells::{CellRange, CellRef};
use super::{
    Checker, FONT_SIZE_RANGE, ImageSpec, ValidationError, coerce_f64, field_path, item_path,
    parse_images,
};
use log::warn;
use serde_json::{Map, Value};

pub const OFFICE_IMAGE_WIDTH: f64 = 2.0;
pub const DEFAULT_TABLE_STYLE: &str = "Light List";
pub const MAX_SHEET_NAME_CHARS: usize = 31;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphSpec {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_name: Option<String>,
    pub font_size_pt: Option<f64>,
    pub style: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub rows: Vec<Vec<String>>,
    pub style: Option<String>,
}

impl TableSpec {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindReplace {
    pub find: String,
    pub replace: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordInstructions {
    pub paragraphs: Vec<ParagraphSpec>,
    pub tables: Vec<TableSpec>,
    pub images: Vec<ImageSpec>,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub find_replace: Vec<FindReplace>,
    pub default_style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideChart {
    pub kind: String,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlideSpec {
    pub title: Option<String>,
    pub bullets: Vec<String>,
    pub images: Vec<ImageSpec>,
    pub chart: Option<SlideChart>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PptInstructions {
    pub title: Option<String>,
    pub slides: Vec<SlideSpec>,
    /// Informational only.
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalFormat {
    CellIs {
        range: CellRange,
        operator: String,
        formula: String,
        color: String,
    },
    ColorScale {
        range: CellRange,
        start_color: String,
        mid_color: String,
        end_color: String,
    },
}

impl ConditionalFormat {
    pub fn range(&self) -> CellRange {
        match self {
            ConditionalFormat::CellIs { range, .. } | ConditionalFormat::ColorScale { range, .. } => {
                *range
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    pub name: String,
    pub data: Vec<Vec<CellValue>>,
    pub formulas: Vec<(CellRef, String)>,
    pub number_formats: Vec<(CellRef, String)>,
    /// 1-based column index and width in characters.
    pub column_widths: Vec<(u32, f64)>,
    pub conditional_formatting: Vec<ConditionalFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookChart {
    pub kind: String,
    pub data_range: Option<CellRange>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExcelInstructions {
    pub sheets: Vec<SheetSpec>,
    pub chart: Option<WorkbookChart>,
}

const CELL_IS_OPERATORS: &[&str] = &[
    "between",
    "notBetween",
    "equal",
    "notEqual",
    "greaterThan",
    "lessThan",
    "greaterThanOrEqual",
    "lessThanOrEqual",
];

pub fn parse_paragraph(checker: &mut Checker, map: &Map<String, Value>, path: &str) -> ParagraphSpec {
    ParagraphSpec {
        text: checker.req_str(map, "text", path),
        bold: checker.bool_or(map, "bold", path, false),
        italic: checker.bool_or(map, "italic", path, false),
        underline: checker.bool_or(map, "underline", path, false),
        font_name: checker.opt_str(map, "font_name", path),
        font_size_pt: checker.opt_f64_in(
            map,
            "font_size_pt",
            path,
            FONT_SIZE_RANGE.0,
            FONT_SIZE_RANGE.1,
        ),
        style: checker.opt_str(map, "style", path),
        color: checker.opt_color(map, "color", path),
    }
}

pub fn parse_word(map: &Map<String, Value>) -> Result<WordInstructions, ValidationError> {
    let mut checker = Checker::new();

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
        let Some(obj) = checker.object(item, &path) else {
            continue;
        };
        let rows = parse_text_grid(&mut checker, obj, &path);
        let style = match obj.get("style") {
            None => Some(DEFAULT_TABLE_STYLE.to_string()),
            Some(_) => checker.opt_str(obj, "style", &path),
        };
        tables.push(TableSpec { rows, style });
    }

    let images = parse_images(&mut checker, map, "", OFFICE_IMAGE_WIDTH);

    let mut find_replace = Vec::new();
    for (index, item) in checker.array(map, "find_replace", "").iter().enumerate() {
        let path = item_path("", "find_replace", index);
        if let Some(obj) = checker.object(item, &path) {
            find_replace.push(FindReplace {
                find: checker.req_str(obj, "find", &path),
                replace: checker.req_str(obj, "replace", &path),
            });
        }
    }

    let instructions = WordInstructions {
        paragraphs,
        tables,
        images,
        header_text: checker.opt_str(map, "header_text", ""),
        footer_text: checker.opt_str(map, "footer_text", ""),
        find_replace,
        default_style: checker.opt_str(map, "default_style", ""),
    };
    checker.finish(instructions)
}

/// Table rows accept strings and numbers; numbers are rendered as text.
fn parse_text_grid(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> Vec<Vec<String>> {
    let rows_path = field_path(path, "rows");
    let rows = match obj.get("rows") {
        None | Some(Value::Null) => {
            checker.push(rows_path, "field required");
            return Vec::new();
        }
        Some(_) => checker.array(obj, "rows", path),
    };
    if rows.is_empty() && obj.get("rows").is_some_and(Value::is_array) {
        checker.push(rows_path.clone(), "must contain at least 1 row");
    }
    let mut grid = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
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
                _ => checker.push(format!("{row_path}[{c}]"), "must be a string"),
            }
        }
        grid.push(out);
    }
    grid
}

pub fn parse_slides(map: &Map<String, Value>) -> Result<PptInstructions, ValidationError> {
    let mut checker = Checker::new();
    let mut slides = Vec::new();
    for (index, item) in checker.array(map, "slides", "").iter().enumerate() {
        let path = item_path("", "slides", index);
        let Some(obj) = checker.object(item, &path) else {
            continue;
        };
        let chart = checker
            .opt_object(obj, "chart", &path)
            .map(|chart| parse_slide_chart(&mut checker, chart, &field_path(&path, "chart")));
        slides.push(SlideSpec {
            title: checker.opt_str(obj, "title", &path),
            bullets: checker.string_list(obj, "bullets", &path),
            images: parse_images(&mut checker, obj, &path, OFFICE_IMAGE_WIDTH),
            chart,
        });
    }
    let instructions = PptInstructions {
        title: checker.opt_str(map, "title", ""),
        slides,
        note: checker.opt_str(map, "note", ""),
    };
    checker.finish(instructions)
}

fn chart_kind(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> String {
    checker
        .opt_str(obj, "type", path)
        .map(|kind| kind.to_ascii_lowercase())
        .unwrap_or_else(|| "bar".to_string())
}

fn parse_slide_chart(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> SlideChart {
    let kind = chart_kind(checker, obj, path);
    let mut categories = Vec::new();
    for (index, item) in checker.array(obj, "categories", path).iter().enumerate() {
        match item {
            Value::String(text) => categories.push(text.clone()),
            Value::Number(number) => categories.push(number.to_string()),
            _ => checker.push(item_path(path, "categories", index), "must be a string"),
        }
    }
    let mut series = Vec::new();
    for (index, item) in checker.array(obj, "series", path).iter().enumerate() {
        let series_path = item_path(path, "series", index);
        let Some(entry) = checker.object(item, &series_path) else {
            continue;
        };
        let name = checker
            .opt_str(entry, "name", &series_path)
            .unwrap_or_else(|| "Series".to_string());
        let mut values = Vec::new();
        for (v, value) in checker.array(entry, "values", &series_path).iter().enumerate() {
            match coerce_f64(value) {
                Some(number) => values.push(number),
                None => checker.push(item_path(&series_path, "values", v), "must be a number"),
            }
        }
        series.push(ChartSeries { name, values });
    }
    SlideChart {
        kind,
        categories,
        series,
    }
}

pub fn parse_workbook(map: &Map<String, Value>) -> Result<ExcelInstructions, ValidationError> {
    let mut checker = Checker::new();
    let mut sheets = Vec::new();
    for (index, item) in checker.array(map, "sheets", "").iter().enumerate() {
        let path = item_path("", "sheets", index);
        if let Some(obj) = checker.object(item, &path) {
            sheets.push(parse_sheet(&mut checker, obj, &path));
        }
    }
    let chart = checker.opt_object(map, "chart", "").map(|obj| {
        let kind = chart_kind(&mut checker, obj, "chart");
        let data_range = checker
            .opt_str(obj, "data_range", "chart")
            .and_then(|text| match CellRange::parse(&text) {
                Some(range) => Some(range),
                None => {
                    checker.push("chart.data_range", "must be a cell range like A1:D5");
                    None
                }
            });
        WorkbookChart { kind, data_range }
    });
    checker.finish(ExcelInstructions { sheets, chart })
}

fn parse_sheet(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> SheetSpec {
    let name = checker.req_str(obj, "name", path);
    if name.chars().any(|ch| matches!(ch, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
        checker.push(
            field_path(path, "name"),
            "must not contain any of [ ] : * ? / \\",
        );
    }

    let mut data = Vec::new();
    for (r, row) in checker.array(obj, "data", path).iter().enumerate() {
        let row_path = item_path(path, "data", r);
        let Some(cells) = row.as_array() else {
            checker.push(row_path, "must be an array");
            continue;
        };
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            out.push(match cell {
                Value::String(text) => CellValue::Text(text.clone()),
                Value::Number(number) => number
                    .as_f64()
                    .map(CellValue::Number)
                    .unwrap_or(CellValue::Empty),
                Value::Bool(flag) => CellValue::Bool(*flag),
                Value::Null => CellValue::Empty,
                _ => {
                    checker.push(row_path.clone(), "cells must be strings, numbers, booleans or null");
                    CellValue::Empty
                }
            });
        }
        data.push(out);
    }

    let formulas = parse_cell_map(checker, obj, "formulas", path);
    let number_formats = parse_cell_map(checker, obj, "number_formats", path);

    let mut column_widths = Vec::new();
    if let Some(widths) = checker.opt_object(obj, "column_widths", path) {
        let widths_path = field_path(path, "column_widths");
        for (key, value) in widths {
            let entry_path = field_path(&widths_path, key);
            let Some(col) = key.trim().parse::<u32>().ok().filter(|col| (1..=16_384).contains(col)) else {
                checker.push(entry_path, "key must be a 1-based column index");
                continue;
            };
            match coerce_f64(value) {
                Some(width) if (0.0..=255.0).contains(&width) => column_widths.push((col, width)),
                Some(_) => checker.push(entry_path, "must be between 0 and 255"),
                None => checker.push(entry_path, "must be a number"),
            }
        }
    }

    let mut conditional_formatting = Vec::new();
    for (index, item) in checker
        .array(obj, "conditional_formatting", path)
        .iter()
        .enumerate()
    {
        let rule_path = item_path(path, "conditional_formatting", index);
        let Some(rule) = checker.object(item, &rule_path) else {
            continue;
        };
        if let Some(format) = parse_conditional(checker, rule, &rule_path) {
            conditional_formatting.push(format);
        }
    }

    SheetSpec {
        name,
        data,
        formulas,
        number_formats,
        column_widths,
        conditional_formatting,
    }
}

fn parse_cell_map(
    checker: &mut Checker,
    obj: &Map<String, Value>,
    key: &str,
    parent: &str,
) -> Vec<(CellRef, String)> {
    let mut out = Vec::new();
    let Some(entries) = checker.opt_object(obj, key, parent) else {
        return out;
    };
    let map_path = field_path(parent, key);
    for (address, value) in entries {
        let entry_path = field_path(&map_path, address);
        let Some(cell) = CellRef::parse(address) else {
            checker.push(entry_path, "key must be a cell address like B2");
            continue;
        };
        match value {
            Value::String(text) => out.push((cell, text.clone())),
            _ => checker.push(entry_path, "must be a string"),
        }
    }
    out
}

fn parse_conditional(
    checker: &mut Checker,
    rule: &Map<String, Value>,
    path: &str,
) -> Option<ConditionalFormat> {
    let kind = checker.opt_str(rule, "type", path).unwrap_or_default();
    let range_text = checker.opt_str(rule, "range", path).unwrap_or_default();
    let kind = kind.to_ascii_lowercase();
    if kind != "cellis" && kind != "colorscale" {
        warn!("skipping conditional format with unsupported type {kind:?} at {path}");
        return None;
    }
    let Some(range) = CellRange::parse(&range_text) else {
        checker.push(field_path(path, "range"), "must be a cell range like A1:A10");
        return None;
    };
    let color = |checker: &mut Checker, key: &str, default: &str| {
        checker
            .opt_color(rule, key, path)
            .unwrap_or_else(|| default.to_string())
    };
    if kind == "cellis" {
        let operator = checker
            .opt_enum(rule, "operator", path, CELL_IS_OPERATORS)
            .unwrap_or_else(|| "greaterThan".to_string());
        let formula = match rule.get("formula") {
            Some(Value::Number(number)) => number.to_string(),
            _ => checker
                .opt_str(rule, "formula", path)
                .unwrap_or_else(|| "0".to_string()),
        };
        Some(ConditionalFormat::CellIs {
            range,
            operator,
            formula,
            color: color(checker, "color", "FFC7CE"),
        })
    } else {
        Some(ConditionalFormat::ColorScale {
            range,
            start_color: color(checker, "start_color", "63BE7B"),
            mid_color: color(checker, "mid_color", "FFEB84"),
            end_color: color(checker, "end_color", "F8696B"),
        })
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
    fn word_defaults() {
        let word = parse_word(&obj(json!({
            "paragraphs": [{"text": "Hello", "bold": true}],
            "tables": [{"rows": [["a", "b"], ["c"]]}],
            "unknown": 42
        })))
        .expect("word");
        assert_eq!(word.paragraphs.len(), 1);
        assert!(word.paragraphs[0].bold);
        assert!(!word.paragraphs[0].italic);
        assert_eq!(word.tables[0].style.as_deref(), Some("Light List"));
        assert_eq!(word.tables[0].column_count(), 2);
    }

    #[test]
    fn word_reports_every_offending_field() {
        let err = parse_word(&obj(json!({
            "paragraphs": [{"bold": true}, {"text": "x", "font_size_pt": 120}],
            "images": [{"name": "a.png", "width_inches": 30}],
            "tables": [{"rows": []}],
            "find_replace": [{"find": "a"}]
        })))
        .expect_err("invalid");
        let paths: Vec<&str> = err.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "paragraphs[0].text",
                "paragraphs[1].font_size_pt",
                "tables[0].rows",
                "images[0].width_inches",
                "find_replace[0].replace",
            ]
        );
    }

    #[test]
    fn explicit_null_table_style_means_none() {
        let word = parse_word(&obj(json!({"tables": [{"rows": [["x"]], "style": null}]})))
            .expect("word");
        assert_eq!(word.tables[0].style, None);
    }

    #[test]
    fn slides_and_chart() {
        let deck = parse_slides(&obj(json!({
            "title": "Deck",
            "slides": [{
                "title": "Numbers",
                "bullets": ["one", "two"],
                "chart": {"categories": ["Q1", "Q2"], "series": [{"values": [1, "2.5"]}]}
            }]
        })))
        .expect("deck");
        let chart = deck.slides[0].chart.as_ref().expect("chart");
        assert_eq!(chart.kind, "bar");
        assert_eq!(chart.series[0].name, "Series");
        assert_eq!(chart.series[0].values, vec![1.0, 2.5]);
    }

    #[test]
    fn workbook_sheet_fields() {
        let book = parse_workbook(&obj(json!({
            "sheets": [{
                "name": "Data",
                "data": [["A", "B"], [1, 2.5, true, null]],
                "formulas": {"C1": "=SUM(A2:B2)"},
                "number_formats": {"B2": "0.00%"},
                "column_widths": {"1": 20, "3": 12.5},
                "conditional_formatting": [
                    {"type": "cellIs", "range": "A2:B2"},
                    {"type": "colorScale", "range": "B2:B9", "end_color": "#112233"},
                    {"type": "dataBar", "range": "A1"}
                ]
            }],
            "chart": {"type": "bar", "data_range": "A1:B2"}
        })))
        .expect("workbook");
        let sheet = &book.sheets[0];
        assert_eq!(sheet.data[1][2], CellValue::Bool(true));
        assert_eq!(sheet.data[1][3], CellValue::Empty);
        assert_eq!(sheet.formulas[0].0.to_string(), "C1");
        assert_eq!(sheet.column_widths.len(), 2);
        assert_eq!(sheet.conditional_formatting.len(), 2);
        match &sheet.conditional_formatting[0] {
            ConditionalFormat::CellIs {
                operator,
                formula,
                color,
                ..
            } => {
                assert_eq!(operator, "greaterThan");
                assert_eq!(formula, "0");
                assert_eq!(color, "FFC7CE");
            }
            other => panic!("unexpected rule {other:?}"),
        }
        match &sheet.conditional_formatting[1] {
            ConditionalFormat::ColorScale { end_color, mid_color, .. } => {
                assert_eq!(end_color, "112233");
                assert_eq!(mid_color, "FFEB84");
            }
            other => panic!("unexpected rule {other:?}"),
        }
        assert_eq!(
            book.chart.and_then(|c| c.data_range).map(|r| r.to_string()),
            Some("A1:B2".to_string())
        );
    }

    #[test]
    fn workbook_rejects_bad_addresses() {
        let err = parse_workbook(&obj(json!({
            "sheets": [{
                "name": "Bad/Name",
                "formulas": {"ZZZZ1": "=1"},
                "column_widths": {"0": 5}
            }],
            "chart": {"data_range": "nowhere"}
        })))
        .expect_err("invalid");
        assert_eq!(err.errors.len(), 4);
    }

    #[test]
    fn sheet_name_required() {
        let err = parse_workbook(&obj(json!({"sheets": [{"data": []}]}))).expect_err("invalid");
        assert_eq!(err.errors[0].path, "sheets[0].name");
    }
}
