//! SpreadsheetML rendering. Worksheets are edited through their
//! `sheetData` so rows and cells the request does not mention keep their
//! original markup.

use super::chart::{CHART_CONTENT_TYPE, CHART_NS, range_bar_chart};
use super::package::{
    APP_PROPS_CONTENT_TYPE, CONTENT_TYPES, CORE_PROPS_CONTENT_TYPE, Package, R_NS, REL_CHART,
    app_properties_xml, append_child, core_properties_xml, element_prefix, inner_xml, parse,
    prepend_child, relative_target, replace_range, root_relationships_xml, start_tag_end, tag_name,
    xml_attr, xml_text,
};
use super::RenderError;
use crate::schema::cells::{CellRange, CellRef};
use crate::schema::office::{
    CellValue, ConditionalFormat, ExcelInstructions, MAX_SHEET_NAME_CHARS, SheetSpec,
    WorkbookChart,
};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

pub const S_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const XDR_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";

const DEFAULT_SHEET_NAME: &str = "Sheet";
const FIRST_CUSTOM_NUM_FMT: u32 = 164;
/// 15cm x 7.5cm, the usual default chart size.
const CHART_EXTENT_EMU: (i64, i64) = (5_400_000, 2_700_000);
/// Zero-based (column, row) of G2.
const CHART_ANCHOR: (u32, u32) = (6, 1);

/// Worksheet children that must follow `conditionalFormatting`.
const AFTER_CONDITIONAL: &[&str] = &[
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// Worksheet children that must follow `drawing`.
const AFTER_DRAWING: &[&str] = &[
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

pub fn create(instructions: &ExcelInstructions) -> Result<Vec<u8>, RenderError> {
    let mut package = skeleton();
    let mut book = Workbook::load(&package)?;
    let mut styles = Styles::load(&mut package, &book.part)?;
    if instructions.sheets.is_empty() {
        book.add_sheet(&mut package, DEFAULT_SHEET_NAME)?;
    }
    let mut first = None;
    for spec in &instructions.sheets {
        let name = book.unique_name(&truncate_name(&spec.name));
        let part = book.add_sheet(&mut package, &name)?;
        apply_sheet(&mut package, &mut styles, &part, spec)?;
        first.get_or_insert((name, part));
    }
    styles.store(&mut package);
    if let (Some(chart), Some((name, part))) = (&instructions.chart, first) {
        add_chart(&mut package, &part, &name, chart)?;
    }
    package.to_bytes()
}

/// Sheets named in the request are edited in place; unknown names are appended.
pub fn modify(existing: &[u8], instructions: &ExcelInstructions) -> Result<Vec<u8>, RenderError> {
    let mut package = Package::open(existing)?;
    let mut book = Workbook::load(&package)?;
    let mut styles = Styles::load(&mut package, &book.part)?;
    let mut first = None;
    for spec in &instructions.sheets {
        let (name, part) = match book.find(&spec.name) {
            Some(part) => (spec.name.clone(), part.to_string()),
            None => {
                let name = book.unique_name(&truncate_name(&spec.name));
                let part = book.add_sheet(&mut package, &name)?;
                (name, part)
            }
        };
        apply_sheet(&mut package, &mut styles, &part, spec)?;
        first.get_or_insert((name, part));
    }
    styles.store(&mut package);
    if let Some(chart) = &instructions.chart {
        match first {
            Some((name, part)) => add_chart(&mut package, &part, &name, chart)?,
            None => warn!("workbook chart needs at least one sheet in the request; skipped"),
        }
    }
    package.to_bytes()
}

fn truncate_name(name: &str) -> String {
    let truncated: String = name.chars().take(MAX_SHEET_NAME_CHARS).collect();
    if truncated.trim().is_empty() {
        DEFAULT_SHEET_NAME.to_string()
    } else {
        truncated
    }
}

/// Root elements are expected in the default namespace, as Excel writes them.
fn check_default_namespace(xml: &str, part: &str) -> Result<(), RenderError> {
    let doc = parse(xml, part)?;
    let root = doc.root_element();
    if root.tag_name().namespace() != Some(S_NS) || !element_prefix(xml, root).is_empty() {
        return Err(RenderError::invalid(format!(
            "{part} does not use the default SpreadsheetML namespace"
        )));
    }
    Ok(())
}

struct Workbook {
    part: String,
    /// (name, worksheet part) in tab order.
    sheets: Vec<(String, String)>,
}

impl Workbook {
    fn load(package: &Package) -> Result<Self, RenderError> {
        let part = package.main_part()?;
        let xml = package.read_xml(&part)?;
        check_default_namespace(&xml, &part)?;
        let rels = package.related_parts(&part, REL_WORKSHEET)?;
        let doc = parse(&xml, &part)?;
        let sheets = doc
            .descendants()
            .filter(|node| node.has_tag_name((S_NS, "sheet")))
            .filter_map(|node| {
                let name = node.attribute("name")?;
                let id = node.attribute((R_NS, "id"))?;
                let (_, target) = rels.iter().find(|(rel_id, _)| rel_id == id)?;
                Some((name.to_string(), target.clone()))
            })
            .collect();
        Ok(Self { part, sheets })
    }

    fn find(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, part)| part.as_str())
    }

    /// Sheet names are unique without regard to case.
    fn unique_name(&self, base: &str) -> String {
        let taken = |candidate: &str| {
            self.sheets
                .iter()
                .any(|(sheet, _)| sheet.to_lowercase() == candidate.to_lowercase())
        };
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| {
                let suffix = n.to_string();
                let keep = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.len());
                format!("{}{suffix}", base.chars().take(keep).collect::<String>())
            })
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn add_sheet(&mut self, package: &mut Package, name: &str) -> Result<String, RenderError> {
        let part = package.unused_name("xl/worksheets/sheet", "xml");
        package.put_xml(
            &part,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{S_NS}" xmlns:r="{R_NS}"><sheetData/></worksheet>"#
            ),
        );
        package.add_override(&part, CT_WORKSHEET)?;
        let rel_id =
            package.add_relationship(&self.part, REL_WORKSHEET, &relative_target(&self.part, &part))?;

        let xml = package.read_xml(&self.part)?;
        let doc = parse(&xml, &self.part)?;
        let sheets = doc
            .root_element()
            .children()
            .find(|node| node.has_tag_name((S_NS, "sheets")))
            .ok_or_else(|| RenderError::invalid(format!("{} has no sheets list", self.part)))?;
        let sheet_id = sheets
            .children()
            .filter_map(|node| node.attribute("sheetId"))
            .filter_map(|id| id.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let entry = format!(
            r#"<sheet xmlns:r="{R_NS}" name="{}" sheetId="{sheet_id}" r:id="{rel_id}"/>"#,
            xml_attr(name)
        );
        let updated = append_child(&xml, sheets.range(), &entry);
        package.put_xml(&self.part, updated);
        self.sheets.push((name.to_string(), part.clone()));
        debug!("sheet {name:?} -> {part}");
        Ok(part)
    }
}

fn apply_sheet(
    package: &mut Package,
    styles: &mut Styles,
    part: &str,
    spec: &SheetSpec,
) -> Result<(), RenderError> {
    let mut xml = package.read_xml(part)?;
    check_default_namespace(&xml, part)?;

    let mut edits = Vec::new();
    for (r, row) in spec.data.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let cell = CellRef {
                row: r as u32 + 1,
                col: c as u32 + 1,
            };
            edits.push((cell, CellEdit::Value(value.clone())));
        }
    }
    for (cell, formula) in &spec.formulas {
        let edit = match formula.strip_prefix('=') {
            Some(expression) => CellEdit::Formula(expression.to_string()),
            None => CellEdit::Value(CellValue::Text(formula.clone())),
        };
        edits.push((*cell, edit));
    }
    if !edits.is_empty() {
        xml = rewrite_cells(&xml, part, &edits)?;
    }

    if !spec.number_formats.is_empty() {
        let current = cell_styles(&xml, part)?;
        let mut cache: HashMap<(u32, u32), u32> = HashMap::new();
        let mut edits = Vec::new();
        for (cell, code) in &spec.number_formats {
            let base = current.get(cell).copied().unwrap_or(0);
            let fmt_id = styles.num_fmt_id(code)?;
            let style = match cache.get(&(base, fmt_id)) {
                Some(style) => *style,
                None => {
                    let style = styles.xf_with_num_fmt(base, fmt_id)?;
                    cache.insert((base, fmt_id), style);
                    style
                }
            };
            edits.push((*cell, CellEdit::Style(style)));
        }
        xml = rewrite_cells(&xml, part, &edits)?;
    }

    if !spec.column_widths.is_empty() {
        xml = set_column_widths(&xml, part, &spec.column_widths)?;
    }

    if !spec.conditional_formatting.is_empty() {
        xml = add_conditional_formats(&xml, part, styles, &spec.conditional_formatting)?;
    }

    package.put_xml(part, xml);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum CellEdit {
    Value(CellValue),
    Formula(String),
    Style(u32),
}

#[derive(Debug, Clone, Default)]
struct CellMarkup {
    /// Unprefixed attributes other than `r`, in source order.
    attrs: Vec<(String, String)>,
    inner: String,
}

impl CellMarkup {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: Option<String>) {
        self.attrs.retain(|(key, _)| key != name);
        if let Some(value) = value {
            self.attrs.push((name.to_string(), value));
        }
    }

    fn apply(&mut self, edit: &CellEdit) {
        match edit {
            CellEdit::Style(style) => self.set_attr("s", Some(style.to_string())),
            CellEdit::Formula(expression) => {
                self.attrs.retain(|(key, _)| key == "s");
                self.inner = format!("<f>{}</f>", xml_text(expression));
            }
            CellEdit::Value(value) => {
                self.attrs.retain(|(key, _)| key == "s");
                self.inner = match value {
                    CellValue::Text(text) => {
                        self.set_attr("t", Some("inlineStr".to_string()));
                        format!(r#"<is><t xml:space="preserve">{}</t></is>"#, xml_text(text))
                    }
                    CellValue::Number(number) => format!("<v>{}</v>", format_number(*number)),
                    CellValue::Bool(flag) => {
                        self.set_attr("t", Some("b".to_string()));
                        format!("<v>{}</v>", u8::from(*flag))
                    }
                    CellValue::Empty => String::new(),
                };
            }
        }
    }

    fn render(&self, cell: CellRef) -> String {
        let mut out = format!(r#"<c r="{cell}""#);
        for (key, value) in &self.attrs {
            out.push_str(&format!(r#" {key}="{}""#, xml_attr(value)));
        }
        if self.inner.is_empty() {
            out.push_str("/>");
        } else {
            out.push_str(&format!(">{}</c>", self.inner));
        }
        out
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct RowMarkup {
    /// Start tag as written in the source, or a fresh `<row r="n">`.
    open: String,
    cells: BTreeMap<u32, CellMarkup>,
}

/// Rows of `sheetData` keyed by 1-based row number, each with its cells by column.
fn read_rows(xml: &str, sheet_data: roxmltree::Node) -> BTreeMap<u32, RowMarkup> {
    let mut rows = BTreeMap::new();
    let mut last_row = 0;
    for row in sheet_data
        .children()
        .filter(|node| node.has_tag_name((S_NS, "row")))
    {
        let number = row
            .attribute("r")
            .and_then(|r| r.parse::<u32>().ok())
            .unwrap_or(last_row + 1);
        last_row = number;
        let source = &xml[row.range()];
        let open = if source.ends_with("/>") {
            format!("{}>", source[..source.len() - 2].trim_end())
        } else {
            let end = start_tag_end(source).unwrap_or(source.len());
            source[..end].to_string()
        };
        let mut cells = BTreeMap::new();
        let mut last_col = 0;
        for cell in row.children().filter(|node| node.has_tag_name((S_NS, "c"))) {
            let col = cell
                .attribute("r")
                .and_then(CellRef::parse)
                .map(|r| r.col)
                .unwrap_or(last_col + 1);
            last_col = col;
            let attrs = cell
                .attributes()
                .filter(|attr| attr.namespace().is_none() && attr.name() != "r")
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect();
            cells.insert(
                col,
                CellMarkup {
                    attrs,
                    inner: inner_xml(&xml[cell.range()]).to_string(),
                },
            );
        }
        rows.insert(number, RowMarkup { open, cells });
    }
    rows
}

fn sheet_data<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    part: &str,
) -> Result<roxmltree::Node<'a, 'input>, RenderError> {
    doc.root_element()
        .children()
        .find(|node| node.has_tag_name((S_NS, "sheetData")))
        .ok_or_else(|| RenderError::invalid(format!("{part} has no sheetData")))
}

fn cell_styles(xml: &str, part: &str) -> Result<HashMap<CellRef, u32>, RenderError> {
    let doc = parse(xml, part)?;
    let rows = read_rows(xml, sheet_data(&doc, part)?);
    let mut styles = HashMap::new();
    for (row, markup) in rows {
        for (col, cell) in markup.cells {
            if let Some(style) = cell.attr("s").and_then(|s| s.parse().ok()) {
                styles.insert(CellRef { row, col }, style);
            }
        }
    }
    Ok(styles)
}

fn rewrite_cells(xml: &str, part: &str, edits: &[(CellRef, CellEdit)]) -> Result<String, RenderError> {
    let doc = parse(xml, part)?;
    let data = sheet_data(&doc, part)?;
    let mut rows = read_rows(xml, data);
    for (cell, edit) in edits {
        if matches!(edit, CellEdit::Value(CellValue::Empty))
            && !rows
                .get(&cell.row)
                .is_some_and(|row| row.cells.contains_key(&cell.col))
        {
            continue;
        }
        let row = rows.entry(cell.row).or_insert_with(|| RowMarkup {
            open: format!(r#"<row r="{}">"#, cell.row),
            cells: BTreeMap::new(),
        });
        row.cells.entry(cell.col).or_default().apply(edit);
    }

    let mut body = String::from("<sheetData>");
    let mut bounds: Option<CellRange> = None;
    for (number, row) in &rows {
        body.push_str(&row.open);
        for (col, cell) in &row.cells {
            let at = CellRef {
                row: *number,
                col: *col,
            };
            body.push_str(&cell.render(at));
            bounds = Some(match bounds {
                None => CellRange { start: at, end: at },
                Some(range) => CellRange {
                    start: CellRef {
                        row: range.start.row.min(at.row),
                        col: range.start.col.min(at.col),
                    },
                    end: CellRef {
                        row: range.end.row.max(at.row),
                        col: range.end.col.max(at.col),
                    },
                },
            });
        }
        body.push_str("</row>");
    }
    body.push_str("</sheetData>");

    let dimension = doc
        .root_element()
        .children()
        .find(|node| node.has_tag_name((S_NS, "dimension")));
    let mut out = replace_range(xml, data.range(), &body);
    if let Some(dimension) = dimension {
        let reference = bounds.map_or_else(|| "A1".to_string(), |range| range.to_string());
        // dimension precedes sheetData, so its offsets are still valid.
        out = replace_range(&out, dimension.range(), &format!(r#"<dimension ref="{reference}"/>"#));
    }
    Ok(out)
}

#[derive(Debug, Clone)]
struct ColumnSpan {
    min: u32,
    max: u32,
    attrs: Vec<(String, String)>,
}

fn set_column_widths(xml: &str, part: &str, widths: &[(u32, f64)]) -> Result<String, RenderError> {
    let doc = parse(xml, part)?;
    let root = doc.root_element();
    let existing = root
        .children()
        .find(|node| node.has_tag_name((S_NS, "cols")));
    let mut spans: Vec<ColumnSpan> = existing
        .map(|cols| {
            cols.children()
                .filter(|node| node.has_tag_name((S_NS, "col")))
                .filter_map(|col| {
                    Some(ColumnSpan {
                        min: col.attribute("min")?.parse().ok()?,
                        max: col.attribute("max")?.parse().ok()?,
                        attrs: col
                            .attributes()
                            .filter(|attr| {
                                attr.namespace().is_none() && !matches!(attr.name(), "min" | "max")
                            })
                            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                            .collect(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    for &(col, width) in widths {
        let mut attrs = Vec::new();
        let mut next = Vec::with_capacity(spans.len() + 2);
        for span in spans.drain(..) {
            if span.min > col || span.max < col {
                next.push(span);
                continue;
            }
            attrs = span.attrs.clone();
            if span.min < col {
                next.push(ColumnSpan {
                    min: span.min,
                    max: col - 1,
                    attrs: span.attrs.clone(),
                });
            }
            if span.max > col {
                next.push(ColumnSpan {
                    min: col + 1,
                    max: span.max,
                    attrs: span.attrs,
                });
            }
        }
        attrs.retain(|(key, _)| !matches!(key.as_str(), "width" | "customWidth"));
        attrs.push(("width".to_string(), format!("{width}")));
        attrs.push(("customWidth".to_string(), "1".to_string()));
        next.push(ColumnSpan {
            min: col,
            max: col,
            attrs,
        });
        next.sort_by_key(|span| span.min);
        spans = next;
    }

    let mut cols = String::from("<cols>");
    for span in &spans {
        cols.push_str(&format!(r#"<col min="{}" max="{}""#, span.min, span.max));
        for (key, value) in &span.attrs {
            cols.push_str(&format!(r#" {key}="{}""#, xml_attr(value)));
        }
        cols.push_str("/>");
    }
    cols.push_str("</cols>");

    Ok(match existing {
        Some(node) => replace_range(xml, node.range(), &cols),
        None => {
            let at = sheet_data(&doc, part)?.range().start;
            format!("{}{cols}{}", &xml[..at], &xml[at..])
        }
    })
}

fn add_conditional_formats(
    xml: &str,
    part: &str,
    styles: &mut Styles,
    formats: &[ConditionalFormat],
) -> Result<String, RenderError> {
    let doc = parse(xml, part)?;
    let mut priority = doc
        .descendants()
        .filter(|node| node.has_tag_name((S_NS, "cfRule")))
        .filter_map(|node| node.attribute("priority"))
        .filter_map(|p| p.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let mut fragment = String::new();
    for format in formats {
        priority += 1;
        let rule = match format {
            ConditionalFormat::CellIs {
                operator,
                formula,
                color,
                ..
            } => {
                let dxf = styles.fill_dxf(color)?;
                let formulas: Vec<&str> = if matches!(operator.as_str(), "between" | "notBetween") {
                    formula.splitn(2, ',').map(str::trim).collect()
                } else {
                    vec![formula.as_str()]
                };
                let formulas: String = formulas
                    .iter()
                    .map(|f| format!("<formula>{}</formula>", xml_text(f)))
                    .collect();
                format!(
                    r#"<cfRule type="cellIs" dxfId="{dxf}" priority="{priority}" operator="{operator}">{formulas}</cfRule>"#
                )
            }
            ConditionalFormat::ColorScale {
                start_color,
                mid_color,
                end_color,
                ..
            } => format!(
                r#"<cfRule type="colorScale" priority="{priority}"><colorScale><cfvo type="min"/><cfvo type="percentile" val="50"/><cfvo type="max"/><color rgb="FF{start_color}"/><color rgb="FF{mid_color}"/><color rgb="FF{end_color}"/></colorScale></cfRule>"#
            ),
        };
        fragment.push_str(&format!(
            r#"<conditionalFormatting sqref="{}">{rule}</conditionalFormatting>"#,
            format.range()
        ));
    }
    Ok(insert_before_any(xml, doc.root_element(), AFTER_CONDITIONAL, &fragment))
}

/// Inserts `fragment` before the first child named in `followers`, or at the end.
fn insert_before_any(xml: &str, parent: roxmltree::Node, followers: &[&str], fragment: &str) -> String {
    match parent
        .children()
        .find(|node| node.is_element() && followers.contains(&node.tag_name().name()))
    {
        Some(node) => {
            let at = node.range().start;
            format!("{}{fragment}{}", &xml[..at], &xml[at..])
        }
        None => append_child(xml, parent.range(), fragment),
    }
}

/// The workbook stylesheet, edited as text and written back once.
struct Styles {
    part: String,
    xml: String,
}

impl Styles {
    fn load(package: &mut Package, workbook: &str) -> Result<Self, RenderError> {
        if let Some((_, part)) = package.related_parts(workbook, REL_STYLES)?.into_iter().next() {
            let xml = package.read_xml(&part)?;
            check_default_namespace(&xml, &part)?;
            return Ok(Self { part, xml });
        }
        let part = package.unused_name("xl/styles", "xml");
        package.add_override(&part, CT_STYLES)?;
        package.add_relationship(workbook, REL_STYLES, &relative_target(workbook, &part))?;
        Ok(Self {
            part,
            xml: styles_xml(),
        })
    }

    fn store(self, package: &mut Package) {
        package.put_xml(&self.part, self.xml);
    }

    fn num_fmt_id(&mut self, code: &str) -> Result<u32, RenderError> {
        if let Some((id, _)) = BUILTIN_NUM_FMTS.iter().find(|(_, builtin)| *builtin == code) {
            return Ok(*id);
        }
        let doc = parse(&self.xml, &self.part)?;
        let root = doc.root_element();
        let list = root
            .children()
            .find(|node| node.has_tag_name((S_NS, "numFmts")));
        let existing: Vec<(u32, &str)> = list
            .map(|list| {
                list.children()
                    .filter(|node| node.has_tag_name((S_NS, "numFmt")))
                    .filter_map(|node| {
                        Some((
                            node.attribute("numFmtId")?.parse().ok()?,
                            node.attribute("formatCode")?,
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if let Some((id, _)) = existing.iter().find(|(_, existing)| *existing == code) {
            return Ok(*id);
        }
        let id = existing
            .iter()
            .map(|(id, _)| id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUM_FMT)
            .max(FIRST_CUSTOM_NUM_FMT);
        let entry = format!(r#"<numFmt numFmtId="{id}" formatCode="{}"/>"#, xml_attr(code));
        self.xml = match list {
            Some(list) => append_counted(&self.xml, list, &entry),
            None => prepend_child(&self.xml, root.range(), &format!(r#"<numFmts count="1">{entry}</numFmts>"#)),
        };
        Ok(id)
    }

    /// Copies cell format `base` with a different number format; returns the new index.
    fn xf_with_num_fmt(&mut self, base: u32, num_fmt_id: u32) -> Result<u32, RenderError> {
        let doc = parse(&self.xml, &self.part)?;
        let cell_xfs = doc
            .root_element()
            .children()
            .find(|node| node.has_tag_name((S_NS, "cellXfs")))
            .ok_or_else(|| RenderError::invalid(format!("{} has no cellXfs", self.part)))?;
        let xfs: Vec<_> = cell_xfs
            .children()
            .filter(|node| node.has_tag_name((S_NS, "xf")))
            .collect();
        let template = xfs.get(base as usize).or_else(|| xfs.first());
        let mut attrs: Vec<(String, String)> = template
            .map(|xf| {
                xf.attributes()
                    .filter(|attr| attr.namespace().is_none())
                    .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                    .collect()
            })
            .unwrap_or_else(|| {
                ["fontId", "fillId", "borderId", "xfId"]
                    .iter()
                    .map(|key| (key.to_string(), "0".to_string()))
                    .collect()
            });
        attrs.retain(|(key, _)| !matches!(key.as_str(), "numFmtId" | "applyNumberFormat"));
        attrs.insert(0, ("numFmtId".to_string(), num_fmt_id.to_string()));
        attrs.push(("applyNumberFormat".to_string(), "1".to_string()));
        let inner = template
            .map(|xf| inner_xml(&self.xml[xf.range()]).to_string())
            .unwrap_or_default();
        let mut entry = String::from("<xf");
        for (key, value) in &attrs {
            entry.push_str(&format!(r#" {key}="{}""#, xml_attr(value)));
        }
        if inner.is_empty() {
            entry.push_str("/>");
        } else {
            entry.push_str(&format!(">{inner}</xf>"));
        }
        let index = xfs.len() as u32;
        self.xml = append_counted(&self.xml, cell_xfs, &entry);
        Ok(index)
    }

    /// Differential format with a solid fill, for conditional rules.
    fn fill_dxf(&mut self, color: &str) -> Result<u32, RenderError> {
        let doc = parse(&self.xml, &self.part)?;
        let root = doc.root_element();
        let entry = format!(
            r#"<dxf><fill><patternFill patternType="solid"><fgColor rgb="FF{color}"/><bgColor rgb="FF{color}"/></patternFill></fill></dxf>"#
        );
        let (index, xml) = match root
            .children()
            .find(|node| node.has_tag_name((S_NS, "dxfs")))
        {
            Some(dxfs) => {
                let index = dxfs.children().filter(|node| node.is_element()).count() as u32;
                (index, append_counted(&self.xml, dxfs, &entry))
            }
            None => (
                0,
                insert_before_any(
                    &self.xml,
                    root,
                    &["tableStyles", "colors", "extLst"],
                    &format!(r#"<dxfs count="1">{entry}</dxfs>"#),
                ),
            ),
        };
        self.xml = xml;
        Ok(index)
    }
}

/// Appends a child to a list element and rewrites its `count`.
fn append_counted(xml: &str, list: roxmltree::Node, fragment: &str) -> String {
    let element = &xml[list.range()];
    let name = tag_name(element);
    let count = list.children().filter(|node| node.is_element()).count() + 1;
    replace_range(
        xml,
        list.range(),
        &format!(
            r#"<{name} count="{count}">{}{fragment}</{name}>"#,
            inner_xml(element)
        ),
    )
}

fn add_chart(
    package: &mut Package,
    sheet_part: &str,
    sheet_name: &str,
    chart: &WorkbookChart,
) -> Result<(), RenderError> {
    if chart.kind != "bar" {
        warn!("workbook chart type {:?} is not supported; skipped", chart.kind);
        return Ok(());
    }
    let Some(range) = chart.data_range else {
        warn!("workbook chart has no data_range; skipped");
        return Ok(());
    };
    let chart_part = package.unused_name("xl/charts/chart", "xml");
    package.put_xml(&chart_part, range_bar_chart(sheet_name, range));
    package.add_override(&chart_part, CHART_CONTENT_TYPE)?;

    let sheet_xml = package.read_xml(sheet_part)?;
    let existing_drawing = {
        let doc = parse(&sheet_xml, sheet_part)?;
        let rel_id = doc
            .root_element()
            .children()
            .find(|node| node.has_tag_name((S_NS, "drawing")))
            .and_then(|node| node.attribute((R_NS, "id")))
            .map(str::to_string);
        match rel_id {
            Some(rel_id) => package
                .related_parts(sheet_part, REL_DRAWING)?
                .into_iter()
                .find(|(id, _)| *id == rel_id)
                .map(|(_, part)| part),
            None => None,
        }
    };
    let drawing = match existing_drawing {
        Some(drawing) => drawing,
        None => {
            let drawing = package.unused_name("xl/drawings/drawing", "xml");
            package.put_xml(
                &drawing,
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="{XDR_NS}" xmlns:a="{A_NS}"></xdr:wsDr>"#
                ),
            );
            package.add_override(&drawing, CT_DRAWING)?;
            let rel_id = package.add_relationship(
                sheet_part,
                REL_DRAWING,
                &relative_target(sheet_part, &drawing),
            )?;
            let doc = parse(&sheet_xml, sheet_part)?;
            let updated = insert_before_any(
                &sheet_xml,
                doc.root_element(),
                AFTER_DRAWING,
                &format!(r#"<drawing xmlns:r="{R_NS}" r:id="{rel_id}"/>"#),
            );
            package.put_xml(sheet_part, updated);
            drawing
        }
    };

    let chart_rel =
        package.add_relationship(&drawing, REL_CHART, &relative_target(&drawing, &chart_part))?;
    let drawing_xml = package.read_xml(&drawing)?;
    let doc = parse(&drawing_xml, &drawing)?;
    let shape_id = doc
        .descendants()
        .filter(|node| node.tag_name().name() == "cNvPr")
        .filter_map(|node| node.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let (col, row) = CHART_ANCHOR;
    let (cx, cy) = CHART_EXTENT_EMU;
    let anchor = format!(
        r#"<xdr:oneCellAnchor xmlns:xdr="{XDR_NS}" xmlns:a="{A_NS}"><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:ext cx="{cx}" cy="{cy}"/><xdr:graphicFrame macro=""><xdr:nvGraphicFramePr><xdr:cNvPr id="{shape_id}" name="Chart {shape_id}"/><xdr:cNvGraphicFramePr/></xdr:nvGraphicFramePr><xdr:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></xdr:xfrm><a:graphic><a:graphicData uri="{CHART_NS}"><c:chart xmlns:c="{CHART_NS}" xmlns:r="{R_NS}" r:id="{chart_rel}"/></a:graphicData></a:graphic></xdr:graphicFrame><xdr:clientData/></xdr:oneCellAnchor>"#
    );
    let updated = append_child(&drawing_xml, doc.root_element().range(), &anchor);
    package.put_xml(&drawing, updated);
    debug!("{sheet_part}: chart {chart_part} over {range}");
    Ok(())
}

fn styles_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="{S_NS}"><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles><dxfs count="0"/></styleSheet>"#
    )
}

/// A workbook with no sheets yet; `create` always adds at least one.
fn skeleton() -> Package {
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="{CT_WORKBOOK}"/><Override PartName="/xl/styles.xml" ContentType="{CT_STYLES}"/><Override PartName="/docProps/core.xml" ContentType="{CORE_PROPS_CONTENT_TYPE}"/><Override PartName="/docProps/app.xml" ContentType="{APP_PROPS_CONTENT_TYPE}"/></Types>"#
    );
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{S_NS}" xmlns:r="{R_NS}"><bookViews><workbookView/></bookViews><sheets></sheets><calcPr calcId="191029" fullCalcOnLoad="1"/></workbook>"#
    );
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_STYLES}" Target="styles.xml"/></Relationships>"#
    );
    let root_rels = root_relationships_xml("xl/workbook.xml");
    let core = core_properties_xml();
    let app = app_properties_xml("docs-mcp");
    let styles = styles_xml();
    Package::from_parts(&[
        (CONTENT_TYPES, content_types.as_str()),
        ("_rels/.rels", root_rels.as_str()),
        ("docProps/core.xml", core.as_str()),
        ("docProps/app.xml", app.as_str()),
        ("xl/workbook.xml", workbook.as_str()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_str()),
        ("xl/styles.xml", styles.as_str()),
    ])
}
