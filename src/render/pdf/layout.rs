//! Page-flow composer. Blocks stack top to bottom inside the margins and a
//! new page starts whenever the next line, image or table row does not fit.

use super::resources::{Resources, deflate, text_width};
use super::text::{self, Style, Token, info_string, to_winansi};
use crate::attachments::ResolvedImage;
use crate::fonts::{FALLBACK_FONT, FaceRef, FontRegistry};
use crate::render::RenderError;
use crate::schema::pdf::{Align, Margins, PageSize, PdfParagraph, PdfTable};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use std::collections::HashMap;

pub const DEFAULT_FONT_SIZE: f32 = 10.0;
const LEADING_RATIO: f32 = 1.2;
const POINTS_PER_INCH: f32 = 72.0;

const CELL_FONT_SIZE: f32 = 10.0;
const CELL_LEADING: f32 = 12.0;
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_Y: f32 = 4.0;
const MIN_COLUMN_WIDTH: f32 = 24.0;
const HEADER_FACE: &str = "Inter-Bold";

const DECORATION_SIZE: f32 = 9.0;
const GREY: f32 = 128.0 / 255.0;
const LIGHT_GREY: f32 = 211.0 / 255.0;
const WHITE_SMOKE: f32 = 245.0 / 255.0;

/// Page size and margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl PageBox {
    pub fn new(size: PageSize, margins: &Margins) -> Self {
        let (width, height) = size.dimensions();
        let points = |inches: f64| inches as f32 * POINTS_PER_INCH;
        Self {
            width,
            height,
            left: points(margins.left),
            right: points(margins.right),
            top: points(margins.top),
            bottom: points(margins.bottom),
        }
    }

    fn frame_width(&self) -> f32 {
        (self.width - self.left - self.right).max(1.0)
    }

    fn frame_height(&self) -> f32 {
        (self.height - self.top - self.bottom).max(1.0)
    }

    fn frame_top(&self) -> f32 {
        self.height - self.top
    }
}

#[derive(Debug, Clone, Default)]
pub struct Decoration {
    pub header: Option<String>,
    pub footer: Option<String>,
    pub page_numbers: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

struct Faces<'a> {
    fonts: &'a FontRegistry,
    name: String,
    cache: HashMap<(bool, bool), FaceRef>,
}

impl<'a> Faces<'a> {
    fn new(fonts: &'a FontRegistry, name: impl Into<String>) -> Self {
        Self {
            fonts,
            name: name.into(),
            cache: HashMap::new(),
        }
    }

    fn get(&mut self, style: Style) -> FaceRef {
        self.cache
            .entry((style.bold, style.italic))
            .or_insert_with(|| self.fonts.resolve_face(&self.name, style.bold, style.italic))
            .clone()
    }
}

#[derive(Debug)]
struct Run {
    face: FaceRef,
    bytes: Vec<u8>,
    width: f32,
    underline: bool,
}

impl Run {
    fn spaces(&self) -> usize {
        self.bytes.iter().filter(|&&byte| byte == b' ').count()
    }
}

#[derive(Debug, Default)]
struct Line {
    runs: Vec<Run>,
    width: f32,
    /// Set on lines ended by wrapping; only those stretch when justified.
    wrapped: bool,
}

impl Line {
    fn push(&mut self, face: &FaceRef, underline: bool, bytes: &[u8], size: f32) {
        let width = text_width(face, bytes, size);
        self.width += width;
        if let Some(run) = self.runs.last_mut()
            && run.face.name() == face.name()
            && run.underline == underline
        {
            run.bytes.extend_from_slice(bytes);
            run.width += width;
            return;
        }
        self.runs.push(Run {
            face: face.clone(),
            bytes: bytes.to_vec(),
            width,
            underline,
        });
    }

    fn spaces(&self) -> usize {
        self.runs.iter().map(Run::spaces).sum()
    }
}

/// Greedy line filling. A word wider than the line gets a line of its own.
fn wrap(tokens: &[Token], faces: &mut Faces<'_>, size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space: Option<Style> = None;

    for token in tokens {
        match token {
            Token::Space(style) => {
                if !line.runs.is_empty() {
                    pending_space = Some(*style);
                }
            }
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                pending_space = None;
            }
            Token::Word(word) => {
                let pieces: Vec<(FaceRef, bool, Vec<u8>)> = word
                    .fragments
                    .iter()
                    .map(|fragment| {
                        (
                            faces.get(fragment.style),
                            fragment.style.underline,
                            to_winansi(&fragment.text),
                        )
                    })
                    .collect();
                let word_width: f32 = pieces
                    .iter()
                    .map(|(face, _, bytes)| text_width(face, bytes, size))
                    .sum();
                let space = pending_space
                    .take()
                    .map(|style| (faces.get(style), style.underline));
                let space_width = space
                    .as_ref()
                    .map(|(face, _)| text_width(face, b" ", size))
                    .unwrap_or(0.0);

                if !line.runs.is_empty() && line.width + space_width + word_width > max_width {
                    let mut full = std::mem::take(&mut line);
                    full.wrapped = true;
                    lines.push(full);
                } else if let Some((face, underline)) = &space {
                    line.push(face, *underline, b" ", size);
                }
                for (face, underline, bytes) in &pieces {
                    line.push(face, *underline, bytes, size);
                }
            }
        }
    }
    lines.push(line);
    lines
}

pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(hex.get(range)?, 16)
            .ok()
            .map(|value| f32::from(value) / 255.0)
    };
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn hex_string(bytes: Vec<u8>) -> Object {
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn gray_fill(level: f32) -> Operation {
    Operation::new("g", vec![real(level)])
}

fn gray_stroke(level: f32) -> Operation {
    Operation::new("G", vec![real(level)])
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> Operation {
    Operation::new("re", vec![real(x), real(y), real(width), real(height)])
}

fn segment(x1: f32, y1: f32, x2: f32, y2: f32) -> [Operation; 3] {
    [
        Operation::new("m", vec![real(x1), real(y1)]),
        Operation::new("l", vec![real(x2), real(y2)]),
        Operation::new("S", vec![]),
    ]
}

pub struct Composer<'a> {
    doc: Document,
    fonts: &'a FontRegistry,
    resources: Resources,
    page: PageBox,
    finished: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl<'a> Composer<'a> {
    pub fn new(fonts: &'a FontRegistry, page: PageBox) -> Self {
        Self {
            doc: Document::with_version("1.7"),
            fonts,
            resources: Resources::default(),
            page,
            finished: Vec::new(),
            ops: Vec::new(),
            y: page.frame_top(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    fn new_page(&mut self) {
        self.finished.push(std::mem::take(&mut self.ops));
        self.y = self.page.frame_top();
    }

    /// Breaks the page unless `needed` points fit or the page is still empty.
    fn ensure(&mut self, needed: f32) {
        if self.y - needed < self.page.bottom && self.y < self.page.frame_top() {
            self.new_page();
        }
    }

    pub fn spacer(&mut self, height: f32) {
        self.y -= height;
    }

    pub fn paragraph(&mut self, paragraph: &PdfParagraph) -> Result<(), RenderError> {
        let size = paragraph
            .font_size_pt
            .map(|size| size as f32)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let leading = paragraph
            .leading_pt
            .map(|leading| leading as f32)
            .unwrap_or(size * LEADING_RATIO);
        let base = Style {
            bold: paragraph.bold,
            italic: paragraph.italic,
            underline: paragraph.underline,
        };
        let mut faces = Faces::new(
            self.fonts,
            self.fonts.choose_font(paragraph.font_name.as_deref()),
        );
        let tokens = text::tokenize(&paragraph.text, base);
        let lines = wrap(&tokens, &mut faces, size, self.page.frame_width());
        let color = paragraph.color.as_deref().and_then(parse_hex_color);

        for line in &lines {
            self.ensure(leading.max(size));
            let baseline = self.y - size;
            self.draw_line(
                line,
                self.page.left,
                self.page.frame_width(),
                baseline,
                size,
                paragraph.align,
                color,
            )?;
            self.y -= leading;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_line(
        &mut self,
        line: &Line,
        left: f32,
        available: f32,
        baseline: f32,
        size: f32,
        align: Align,
        color: Option<[f32; 3]>,
    ) -> Result<(), RenderError> {
        if line.runs.is_empty() {
            return Ok(());
        }
        let slack = (available - line.width).max(0.0);
        let spaces = line.spaces();
        let (x, word_spacing) = match align {
            Align::Left => (left, 0.0),
            Align::Center => (left + slack / 2.0, 0.0),
            Align::Right => (left + slack, 0.0),
            Align::Justify if line.wrapped && spaces > 0 => (left, slack / spaces as f32),
            Align::Justify => (left, 0.0),
        };
        let [r, g, b] = color.unwrap_or([0.0, 0.0, 0.0]);

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
        self.ops.push(Operation::new("BT", vec![]));
        if word_spacing > 0.0 {
            self.ops.push(Operation::new("Tw", vec![real(word_spacing)]));
        }
        self.ops.push(Operation::new("Td", vec![real(x), real(baseline)]));
        for run in &line.runs {
            let font = self.resources.font(&mut self.doc, &run.face)?;
            self.ops.push(Operation::new("Tf", vec![name(&font), real(size)]));
            self.ops.push(Operation::new("Tj", vec![hex_string(run.bytes.clone())]));
        }
        self.ops.push(Operation::new("ET", vec![]));

        let mut underlines = Vec::new();
        let mut cursor = x;
        for run in &line.runs {
            let width = run.width + run.spaces() as f32 * word_spacing;
            if run.underline {
                underlines.push((cursor, cursor + width));
            }
            cursor += width;
        }
        if !underlines.is_empty() {
            let y = baseline - size * 0.12;
            self.ops.push(Operation::new("RG", vec![real(r), real(g), real(b)]));
            self.ops.push(Operation::new("w", vec![real((size * 0.05).max(0.5))]));
            for (start, end) in underlines {
                self.ops.extend(segment(start, y, end, y));
            }
        }
        self.ops.push(Operation::new("Q", vec![]));
        Ok(())
    }

    /// Centered, scaled down to fit the frame when needed.
    pub fn image(&mut self, image: &ResolvedImage) -> Result<(), RenderError> {
        let bytes = image
            .bytes
            .as_deref()
            .ok_or_else(|| RenderError::MissingImage(image.label.clone()))?;
        let placed = self.resources.image(&mut self.doc, &image.label, bytes)?;

        let frame_width = self.page.frame_width();
        let mut width = image.width_inches as f32 * POINTS_PER_INCH;
        let mut height = if placed.width == 0 {
            width
        } else {
            width * placed.height as f32 / placed.width as f32
        };
        let fit = (frame_width / width)
            .min(self.page.frame_height() / height)
            .min(1.0);
        width *= fit;
        height *= fit;

        self.ensure(height);
        let x = self.page.left + (frame_width - width) / 2.0;
        let y = self.y - height;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
        ));
        self.ops.push(Operation::new("Do", vec![name(&placed.resource)]));
        self.ops.push(Operation::new("Q", vec![]));
        self.y = y;
        Ok(())
    }

    pub fn table(&mut self, table: &PdfTable) -> Result<(), RenderError> {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }
        let header_name = if self.fonts.is_allowed(HEADER_FACE) {
            HEADER_FACE
        } else {
            FALLBACK_FONT
        };
        let mut body = Faces::new(self.fonts, FALLBACK_FONT);
        let mut head = Faces::new(self.fonts, header_name);
        let widths = self.column_widths(table, columns, &mut body, &mut head);
        let table_width: f32 = widths.iter().sum();
        let left = self.page.left + ((self.page.frame_width() - table_width) / 2.0).max(0.0);

        for (index, row) in table.rows.iter().enumerate() {
            let is_header = table.header && index == 0;
            let style = Style {
                bold: is_header,
                ..Style::default()
            };
            let faces = if is_header { &mut head } else { &mut body };
            let cells: Vec<Vec<Line>> = widths
                .iter()
                .enumerate()
                .map(|(column, width)| {
                    let value = row.get(column).map(String::as_str).unwrap_or("");
                    wrap(
                        &text::plain(value, style),
                        faces,
                        CELL_FONT_SIZE,
                        width - 2.0 * CELL_PAD_X,
                    )
                })
                .collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f32 * CELL_LEADING + 2.0 * CELL_PAD_Y;

            self.ensure(row_height);
            let top = self.y;
            let bottom = top - row_height;
            if is_header {
                self.ops.push(Operation::new("q", vec![]));
                self.ops.push(gray_fill(WHITE_SMOKE));
                self.ops.push(rect(left, bottom, table_width, row_height));
                self.ops.push(Operation::new("f", vec![]));
                self.ops.push(Operation::new("Q", vec![]));
            }

            let mut x = left;
            for (lines, width) in cells.iter().zip(&widths) {
                for (line_index, line) in lines.iter().enumerate() {
                    let baseline =
                        top - CELL_PAD_Y - CELL_FONT_SIZE - line_index as f32 * CELL_LEADING;
                    self.draw_line(
                        line,
                        x + CELL_PAD_X,
                        width - 2.0 * CELL_PAD_X,
                        baseline,
                        CELL_FONT_SIZE,
                        Align::Left,
                        None,
                    )?;
                }
                x += width;
            }

            if table.style_grid {
                self.ops.push(Operation::new("q", vec![]));
                self.ops.push(gray_stroke(LIGHT_GREY));
                self.ops.push(Operation::new("w", vec![real(0.5)]));
                let mut x = left;
                for width in &widths {
                    self.ops.push(rect(x, bottom, *width, row_height));
                    self.ops.push(Operation::new("S", vec![]));
                    x += width;
                }
                self.ops.push(Operation::new("Q", vec![]));
            }
            self.y = bottom;
        }
        Ok(())
    }

    /// Requested widths first; missing columns share what is left. Without
    /// requested widths, columns take their natural width, shrunk
    /// proportionally when the table would overflow the frame.
    fn column_widths(
        &self,
        table: &PdfTable,
        columns: usize,
        body: &mut Faces<'_>,
        head: &mut Faces<'_>,
    ) -> Vec<f32> {
        let frame = self.page.frame_width();
        if let Some(requested) = &table.col_widths_inches {
            let mut widths: Vec<f32> = requested
                .iter()
                .take(columns)
                .map(|inches| *inches as f32 * POINTS_PER_INCH)
                .collect();
            if widths.len() < columns {
                let used: f32 = widths.iter().sum();
                let share = ((frame - used) / (columns - widths.len()) as f32).max(MIN_COLUMN_WIDTH);
                widths.resize(columns, share);
            }
            return widths;
        }

        let mut natural = vec![MIN_COLUMN_WIDTH; columns];
        for (index, row) in table.rows.iter().enumerate() {
            let is_header = table.header && index == 0;
            let face = if is_header {
                head.get(Style {
                    bold: true,
                    ..Style::default()
                })
            } else {
                body.get(Style::default())
            };
            for (column, value) in row.iter().enumerate() {
                let widest = value
                    .lines()
                    .map(|line| {
                        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
                        text_width(&face, &to_winansi(&collapsed), CELL_FONT_SIZE)
                    })
                    .fold(0.0f32, f32::max);
                natural[column] = natural[column].max(widest + 2.0 * CELL_PAD_X);
            }
        }
        let total: f32 = natural.iter().sum();
        if total <= frame {
            return natural;
        }
        let scale = frame / total;
        natural.iter().map(|width| width * scale).collect()
    }

    fn decoration_ops(
        &mut self,
        decoration: &Decoration,
        page_number: usize,
    ) -> Result<Vec<Operation>, RenderError> {
        let face = FaceRef::Builtin(FALLBACK_FONT);
        let font = self.resources.font(&mut self.doc, &face)?;
        let page = self.page;
        let right = page.width - page.right;
        let text_at = |x: f32, y: f32, bytes: Vec<u8>| {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![name(&font), real(DECORATION_SIZE)]),
                Operation::new("Td", vec![real(x), real(y)]),
                Operation::new("Tj", vec![hex_string(bytes)]),
                Operation::new("ET", vec![]),
            ]
        };

        let mut ops = vec![Operation::new("q", vec![])];
        if let Some(header) = decoration.header.as_deref().filter(|text| !text.is_empty()) {
            let y = page.height - page.top;
            ops.push(gray_fill(GREY));
            ops.extend(text_at(page.left, y + 12.0, to_winansi(header)));
            ops.push(gray_stroke(0.0));
            ops.extend(segment(page.left, y + 8.0, right, y + 8.0));
        }

        let footer_line = page.bottom - 10.0;
        ops.push(gray_stroke(LIGHT_GREY));
        ops.extend(segment(page.left, footer_line, right, footer_line));
        let text_y = footer_line - 12.0;
        ops.push(gray_fill(GREY));
        if let Some(footer) = decoration.footer.as_deref().filter(|text| !text.is_empty()) {
            ops.extend(text_at(page.left, text_y, to_winansi(footer)));
        }
        if decoration.page_numbers {
            let label = to_winansi(&format!("Page {page_number}"));
            let width = text_width(&face, &label, DECORATION_SIZE);
            ops.extend(text_at(right - width, text_y, label));
        }
        ops.push(Operation::new("Q", vec![]));
        Ok(ops)
    }

    /// Closes the last page, decorates every page and assembles the
    /// document catalog. A composer that received nothing still yields one
    /// page.
    pub fn finish(
        mut self,
        decoration: &Decoration,
        info: &DocumentInfo,
    ) -> Result<Document, RenderError> {
        self.finished.push(std::mem::take(&mut self.ops));
        let pages = std::mem::take(&mut self.finished);

        let pages_id = self.doc.new_object_id();
        let resources_id = self.doc.new_object_id();
        let media_box = vec![
            real(0.0),
            real(0.0),
            real(self.page.width),
            real(self.page.height),
        ];

        let mut kids = Vec::with_capacity(pages.len());
        for (index, mut operations) in pages.into_iter().enumerate() {
            operations.extend(self.decoration_ops(decoration, index + 1)?);
            let encoded = Content { operations }.encode()?;
            let content_id = self.doc.add_object(Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                deflate(&encoded)?,
            ));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let resources = std::mem::take(&mut self.resources).into_dictionary();
        self.doc
            .objects
            .insert(resources_id, Object::Dictionary(resources));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = self.doc.add_object(info_dictionary(info));
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        Ok(self.doc)
    }
}

fn info_dictionary(info: &DocumentInfo) -> Dictionary {
    let text = |value: &str| Object::String(info_string(value), StringFormat::Literal);
    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let mut dict = dictionary! {
        "Producer" => text("docs-mcp"),
        "Creator" => text("docs-mcp"),
        "CreationDate" => text(&created),
    };
    let fields = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
    ];
    for (key, value) in fields {
        if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
            dict.set(key, text(value));
        }
    }
    dict
}
