//! WordprocessingML rendering. New documents start from a small built-in
//! skeleton; existing ones are edited in place so everything the request
//! does not touch survives byte for byte.

use super::image::{ImageInfo, probe};
use super::package::{
    APP_PROPS_CONTENT_TYPE, CONTENT_TYPES, CORE_PROPS_CONTENT_TYPE, Package, R_NS, REL_IMAGE,
    app_properties_xml, append_child, core_properties_xml, element_prefix, parse, prepend_child,
    relative_target, replace_range, root_relationships_xml, tag_name, xml_attr, xml_text,
};
use super::{RenderError, inches_to_emu};
use crate::attachments::ResolvedImage;
use crate::schema::office::{FindReplace, ParagraphSpec, TableSpec, WordInstructions};
use log::{debug, warn};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_SETTINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_SETTINGS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

/// Text width of a Letter page with one-inch margins, in twentieths of a point.
const TEXT_WIDTH_TWIPS: u32 = 9360;

pub fn create(
    instructions: &WordInstructions,
    images: &[ResolvedImage],
) -> Result<Vec<u8>, RenderError> {
    let mut package = skeleton();
    apply(&mut package, instructions, images)?;
    package.to_bytes()
}

pub fn modify(
    existing: &[u8],
    instructions: &WordInstructions,
    images: &[ResolvedImage],
) -> Result<Vec<u8>, RenderError> {
    let mut package = Package::open(existing)?;
    apply(&mut package, instructions, images)?;
    package.to_bytes()
}

fn apply(
    package: &mut Package,
    instructions: &WordInstructions,
    images: &[ResolvedImage],
) -> Result<(), RenderError> {
    let main = package.main_part()?;
    check_prefix(&package.read_xml(&main)?, &main)?;
    let styles = StyleBook::load(package, &main)?;

    if let Some(font) = &instructions.default_style {
        match &styles.part {
            Some(part) => set_normal_font(package, part, font)?,
            None => warn!("{main} has no styles part; default_style {font:?} ignored"),
        }
    }

    let mut body = String::new();
    for paragraph in &instructions.paragraphs {
        let style_id = paragraph
            .style
            .as_deref()
            .and_then(|name| styles.lookup("paragraph", name));
        body.push_str(&paragraph_xml(paragraph, style_id));
    }
    for table in &instructions.tables {
        let style_id = table
            .style
            .as_deref()
            .and_then(|name| styles.lookup("table", name));
        body.push_str(&table_xml(table, style_id));
    }
    let mut next_shape_id = max_drawing_id(&package.read_xml(&main)?, &main)? + 1;
    for image in images {
        let Some(bytes) = &image.bytes else {
            warn!("image {:?} has no data; skipped", image.label);
            continue;
        };
        let (rel_id, info) = add_media(package, &main, &image.label, bytes)?;
        body.push_str(&picture_xml(
            next_shape_id,
            &image.label,
            &rel_id,
            inches_to_emu(image.width_inches),
            inches_to_emu(info.scaled_height(image.width_inches)),
        ));
        next_shape_id += 1;
    }
    if !body.is_empty() {
        let xml = package.read_xml(&main)?;
        let updated = insert_into_body(&xml, &main, &body)?;
        package.put_xml(&main, updated);
    }

    if let Some(text) = &instructions.header_text {
        set_header_footer(package, &main, HeaderFooter::Header, text)?;
    }
    if let Some(text) = &instructions.footer_text {
        set_header_footer(package, &main, HeaderFooter::Footer, text)?;
    }

    if !instructions.find_replace.is_empty() {
        let xml = package.read_xml(&main)?;
        let updated = find_replace(&xml, &main, &instructions.find_replace)?;
        package.put_xml(&main, updated);
    }
    Ok(())
}

/// Fragments are written with the `w:` prefix, so the part must use it too.
fn check_prefix(xml: &str, part: &str) -> Result<(), RenderError> {
    let doc = parse(xml, part)?;
    let root = doc.root_element();
    if root.tag_name().namespace() != Some(W_NS) || element_prefix(xml, root) != "w" {
        return Err(RenderError::invalid(format!(
            "{part} does not use the standard w: WordprocessingML prefix"
        )));
    }
    Ok(())
}

struct StyleBook {
    part: Option<String>,
    /// (type, styleId, display name)
    styles: Vec<(String, String, String)>,
}

impl StyleBook {
    fn load(package: &Package, main: &str) -> Result<Self, RenderError> {
        let Some((_, part)) = package.related_parts(main, REL_STYLES)?.into_iter().next() else {
            return Ok(Self {
                part: None,
                styles: Vec::new(),
            });
        };
        let xml = package.read_xml(&part)?;
        let doc = parse(&xml, &part)?;
        let styles = doc
            .root_element()
            .children()
            .filter(|node| node.has_tag_name((W_NS, "style")))
            .map(|node| {
                let name = node
                    .children()
                    .find(|child| child.has_tag_name((W_NS, "name")))
                    .and_then(|child| child.attribute((W_NS, "val")))
                    .unwrap_or_default();
                (
                    node.attribute((W_NS, "type")).unwrap_or("paragraph").to_string(),
                    node.attribute((W_NS, "styleId")).unwrap_or_default().to_string(),
                    name.to_string(),
                )
            })
            .collect();
        Ok(Self {
            part: Some(part),
            styles,
        })
    }

    /// Matches display names case-insensitively ("Heading 1" finds "heading 1"),
    /// then style ids with spaces removed.
    fn lookup(&self, kind: &str, name: &str) -> Option<&str> {
        let compact: String = name.chars().filter(|ch| !ch.is_whitespace()).collect();
        let found = self
            .styles
            .iter()
            .filter(|(style_type, _, _)| style_type == kind)
            .find(|(_, _, display)| display.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.styles
                    .iter()
                    .filter(|(style_type, _, _)| style_type == kind)
                    .find(|(_, id, _)| id.eq_ignore_ascii_case(&compact))
            })
            .map(|(_, id, _)| id.as_str());
        if found.is_none() {
            warn!("no {kind} style named {name:?}; using the document default");
        }
        found
    }
}

fn set_normal_font(package: &mut Package, part: &str, font: &str) -> Result<(), RenderError> {
    let xml = package.read_xml(part)?;
    let doc = parse(&xml, part)?;
    let Some(normal) = doc.root_element().children().find(|node| {
        node.has_tag_name((W_NS, "style"))
            && node.attribute((W_NS, "type")) == Some("paragraph")
            && (node.attribute((W_NS, "styleId")) == Some("Normal")
                || node.attribute((W_NS, "default")) == Some("1"))
    }) else {
        warn!("{part} has no Normal style; default_style {font:?} ignored");
        return Ok(());
    };
    let fonts = fonts_xml(font);
    let updated = match normal
        .children()
        .find(|child| child.has_tag_name((W_NS, "rPr")))
    {
        Some(rpr) => match rpr
            .children()
            .find(|child| child.has_tag_name((W_NS, "rFonts")))
        {
            Some(existing) => replace_range(&xml, existing.range(), &fonts),
            None => prepend_child(&xml, rpr.range(), &fonts),
        },
        None => append_child(&xml, normal.range(), &format!("<w:rPr>{fonts}</w:rPr>")),
    };
    package.put_xml(part, updated);
    debug!("{part}: Normal font set to {font}");
    Ok(())
}

fn fonts_xml(font: &str) -> String {
    let font = xml_attr(font);
    format!(r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>"#)
}

fn paragraph_xml(spec: &ParagraphSpec, style_id: Option<&str>) -> String {
    let mut out = String::from("<w:p>");
    if let Some(id) = style_id {
        out.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, xml_attr(id)));
    }
    let mut rpr = String::new();
    if let Some(font) = &spec.font_name {
        rpr.push_str(&fonts_xml(font));
    }
    if spec.bold {
        rpr.push_str("<w:b/>");
    }
    if spec.italic {
        rpr.push_str("<w:i/>");
    }
    if let Some(color) = &spec.color {
        rpr.push_str(&format!(r#"<w:color w:val="{}"/>"#, xml_attr(color)));
    }
    if let Some(size) = spec.font_size_pt {
        let half_points = (size * 2.0).round() as u32;
        rpr.push_str(&format!(
            r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
        ));
    }
    if spec.underline {
        rpr.push_str(r#"<w:u w:val="single"/>"#);
    }
    out.push_str("<w:r>");
    if !rpr.is_empty() {
        out.push_str(&format!("<w:rPr>{rpr}</w:rPr>"));
    }
    out.push_str(&run_content(&spec.text));
    out.push_str("</w:r></w:p>");
    out
}

/// Line breaks and tabs become their own run children.
fn run_content(text: &str) -> String {
    let mut out = String::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push_str("<w:br/>");
        }
        for (tab, piece) in line.split('\t').enumerate() {
            if tab > 0 {
                out.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                out.push_str(&format!(
                    r#"<w:t xml:space="preserve">{}</w:t>"#,
                    xml_text(piece)
                ));
            }
        }
    }
    out
}

fn table_xml(table: &TableSpec, style_id: Option<&str>) -> String {
    let cols = table.column_count().max(1);
    let col_width = TEXT_WIDTH_TWIPS / cols as u32;
    let mut out = String::from("<w:tbl><w:tblPr>");
    if let Some(id) = style_id {
        out.push_str(&format!(r#"<w:tblStyle w:val="{}"/>"#, xml_attr(id)));
    }
    out.push_str(r#"<w:tblW w:w="0" w:type="auto"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#);
    for _ in 0..cols {
        out.push_str(&format!(r#"<w:gridCol w:w="{col_width}"/>"#));
    }
    out.push_str("</w:tblGrid>");
    for row in &table.rows {
        out.push_str("<w:tr>");
        for col in 0..cols {
            out.push_str(&format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="{col_width}" w:type="dxa"/></w:tcPr><w:p>"#
            ));
            if let Some(text) = row.get(col).filter(|text| !text.is_empty()) {
                out.push_str(&format!("<w:r>{}</w:r>", run_content(text)));
            }
            out.push_str("</w:p></w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    out
}

fn add_media(
    package: &mut Package,
    main: &str,
    label: &str,
    bytes: &[u8],
) -> Result<(String, ImageInfo), RenderError> {
    let info = probe(label, bytes)?;
    let dir = main.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let prefix = if dir.is_empty() {
        "media/image".to_string()
    } else {
        format!("{dir}/media/image")
    };
    let part = package.unused_name(&prefix, info.extension());
    package.put(&part, bytes.to_vec());
    package.add_default_content_type(info.extension(), info.content_type())?;
    let target = relative_target(main, &part);
    Ok((package.add_relationship(main, REL_IMAGE, &target)?, info))
}

fn max_drawing_id(xml: &str, part: &str) -> Result<u32, RenderError> {
    let doc = parse(xml, part)?;
    Ok(doc
        .descendants()
        .filter(|node| node.tag_name().name() == "docPr")
        .filter_map(|node| node.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0))
}

fn picture_xml(id: u32, label: &str, rel_id: &str, cx: i64, cy: i64) -> String {
    let name = xml_attr(label);
    format!(
        r#"<w:p><w:r><w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip xmlns:r="{R_NS}" r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
    )
}

/// New block content goes before the final section properties of the body.
fn insert_into_body(xml: &str, part: &str, fragment: &str) -> Result<String, RenderError> {
    let doc = parse(xml, part)?;
    let body = doc
        .root_element()
        .children()
        .find(|node| node.has_tag_name((W_NS, "body")))
        .ok_or_else(|| RenderError::invalid(format!("{part} has no w:body")))?;
    let last = body.children().filter(|node| node.is_element()).last();
    Ok(match last {
        Some(sect) if sect.has_tag_name((W_NS, "sectPr")) => {
            let at = sect.range().start;
            format!("{}{fragment}{}", &xml[..at], &xml[at..])
        }
        _ => append_child(xml, body.range(), fragment),
    })
}

#[derive(Debug, Clone, Copy)]
enum HeaderFooter {
    Header,
    Footer,
}

impl HeaderFooter {
    fn local_name(self) -> &'static str {
        match self {
            HeaderFooter::Header => "header",
            HeaderFooter::Footer => "footer",
        }
    }

    fn root(self) -> &'static str {
        match self {
            HeaderFooter::Header => "w:hdr",
            HeaderFooter::Footer => "w:ftr",
        }
    }

    fn reference(self) -> &'static str {
        match self {
            HeaderFooter::Header => "headerReference",
            HeaderFooter::Footer => "footerReference",
        }
    }
}

/// Writes a fresh header or footer part and points the first section's
/// default reference at it.
fn set_header_footer(
    package: &mut Package,
    main: &str,
    which: HeaderFooter,
    text: &str,
) -> Result<(), RenderError> {
    let dir = main.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let prefix = if dir.is_empty() {
        which.local_name().to_string()
    } else {
        format!("{dir}/{}", which.local_name())
    };
    let part = package.unused_name(&prefix, "xml");
    let paragraph = paragraph_xml(
        &ParagraphSpec {
            text: text.to_string(),
            ..ParagraphSpec::default()
        },
        None,
    );
    package.put_xml(
        &part,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<{root} xmlns:w="{W_NS}" xmlns:r="{R_NS}">{paragraph}</{root}>"#,
            root = which.root()
        ),
    );
    let content_type = match which {
        HeaderFooter::Header => CT_HEADER,
        HeaderFooter::Footer => CT_FOOTER,
    };
    package.add_override(&part, content_type)?;
    let rel_type = match which {
        HeaderFooter::Header => REL_HEADER,
        HeaderFooter::Footer => REL_FOOTER,
    };
    let rel_id = package.add_relationship(main, rel_type, &relative_target(main, &part))?;

    let reference = format!(
        r#"<w:{} xmlns:r="{R_NS}" w:type="default" r:id="{rel_id}"/>"#,
        which.reference()
    );
    let xml = package.read_xml(main)?;
    let without_default = {
        let doc = parse(&xml, main)?;
        let stale: Vec<_> = doc
            .descendants()
            .find(|node| node.has_tag_name((W_NS, "sectPr")))
            .map(|sect| {
                sect.children()
                    .filter(|child| {
                        child.has_tag_name((W_NS, which.reference()))
                            && child.attribute((W_NS, "type")).unwrap_or("default") == "default"
                    })
                    .map(|child| child.range())
                    .collect()
            })
            .unwrap_or_default();
        let mut out = xml.clone();
        for range in stale.into_iter().rev() {
            out = replace_range(&out, range, "");
        }
        out
    };
    let doc = parse(&without_default, main)?;
    let updated = match doc
        .descendants()
        .find(|node| node.has_tag_name((W_NS, "sectPr")))
    {
        Some(sect) => prepend_child(&without_default, sect.range(), &reference),
        None => {
            let body = doc
                .root_element()
                .children()
                .find(|node| node.has_tag_name((W_NS, "body")))
                .ok_or_else(|| RenderError::invalid(format!("{main} has no w:body")))?;
            append_child(
                &without_default,
                body.range(),
                &format!("<w:sectPr>{reference}</w:sectPr>"),
            )
        }
    };
    package.put_xml(main, updated);
    debug!("{main}: default {} -> {part}", which.local_name());
    Ok(())
}

/// Literal replacement inside each text run. Matches that span runs are not seen.
fn find_replace(xml: &str, part: &str, pairs: &[FindReplace]) -> Result<String, RenderError> {
    let doc = parse(xml, part)?;
    let mut edits = Vec::new();
    for node in doc.descendants().filter(|node| node.has_tag_name((W_NS, "t"))) {
        let original = node.text().unwrap_or("");
        let mut text = original.to_string();
        for pair in pairs {
            if pair.find.is_empty() {
                continue;
            }
            text = text.replace(&pair.find, &pair.replace);
        }
        if text != original {
            let qname = tag_name(&xml[node.range()]);
            edits.push((
                node.range(),
                format!(
                    r#"<{qname} xml:space="preserve">{}</{qname}>"#,
                    xml_text(&text)
                ),
            ));
        }
    }
    for pair in pairs.iter().filter(|pair| pair.find.is_empty()) {
        warn!("find_replace entry with an empty find string ignored (replace {:?})", pair.replace);
    }
    debug!("{part}: {} text runs rewritten", edits.len());
    let mut out = xml.to_string();
    for (range, replacement) in edits.into_iter().rev() {
        out = replace_range(&out, range, &replacement);
    }
    Ok(out)
}

fn skeleton() -> Package {
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="{CT_DOCUMENT}"/><Override PartName="/word/styles.xml" ContentType="{CT_STYLES}"/><Override PartName="/word/settings.xml" ContentType="{CT_SETTINGS}"/><Override PartName="/docProps/core.xml" ContentType="{CORE_PROPS_CONTENT_TYPE}"/><Override PartName="/docProps/app.xml" ContentType="{APP_PROPS_CONTENT_TYPE}"/></Types>"#
    );
    let document_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_STYLES}" Target="styles.xml"/><Relationship Id="rId2" Type="{REL_SETTINGS}" Target="settings.xml"/></Relationships>"#
    );
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/><w:cols w:space="720"/></w:sectPr></w:body></w:document>"#
    );
    let settings = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="{W_NS}"><w:defaultTabStop w:val="720"/><w:compat><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat></w:settings>"#
    );
    let root_rels = root_relationships_xml("word/document.xml");
    let core = core_properties_xml();
    let app = app_properties_xml("docs-mcp");
    let styles = styles_xml();
    Package::from_parts(&[
        (CONTENT_TYPES, content_types.as_str()),
        ("_rels/.rels", root_rels.as_str()),
        ("docProps/core.xml", core.as_str()),
        ("docProps/app.xml", app.as_str()),
        ("word/document.xml", document.as_str()),
        ("word/_rels/document.xml.rels", document_rels.as_str()),
        ("word/styles.xml", styles.as_str()),
        ("word/settings.xml", settings.as_str()),
    ])
}

fn heading_style(level: u8, size: u32) -> String {
    format!(
        r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#,
        level - 1
    )
}

fn styles_xml() -> String {
    let border = |name: &str, size: u32, color: &str| {
        format!(r#"<w:{name} w:val="single" w:sz="{size}" w:space="0" w:color="{color}"/>"#)
    };
    let grid_borders: String = ["top", "left", "bottom", "right", "insideH", "insideV"]
        .iter()
        .map(|side| border(side, 4, "auto"))
        .collect();
    let list_borders: String = ["top", "left", "bottom", "right"]
        .iter()
        .map(|side| border(side, 8, "000000"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{W_NS}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/><w:uiPriority w:val="1"/><w:semiHidden/></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:semiHidden/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="80" w:line="240" w:lineRule="auto"/></w:pPr><w:rPr><w:kern w:val="28"/><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style>{h1}{h2}{h3}<w:style w:type="paragraph" w:styleId="Header"><w:name w:val="header"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Footer"><w:name w:val="footer"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:basedOn w:val="TableNormal"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:tblPr><w:tblBorders>{grid_borders}</w:tblBorders></w:tblPr></w:style><w:style w:type="table" w:styleId="LightList"><w:name w:val="Light List"/><w:basedOn w:val="TableNormal"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:tblPr><w:tblBorders>{list_borders}</w:tblBorders></w:tblPr><w:tblStylePr w:type="firstRow"><w:pPr><w:spacing w:before="0" w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:rPr><w:b/><w:bCs/><w:color w:val="FFFFFF"/></w:rPr><w:tblPr/><w:tcPr><w:shd w:val="clear" w:color="auto" w:fill="000000"/></w:tcPr></w:tblStylePr></w:style></w:styles>"#,
        h1 = heading_style(1, 32),
        h2 = heading_style(2, 26),
        h3 = heading_style(3, 24),
    )
}
