//! Office Open XML packages: a zip of XML parts tied together by
//! `[Content_Types].xml` and `_rels/*.rels` relationship parts.

use super::RenderError;
use log::debug;
use quick_xml::escape::{escape, partial_escape};
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_CHART: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// All parts of a package held in memory, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn open(bytes: &[u8]) -> Result<Self, RenderError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            // The declared size comes from the archive and is not trusted.
            let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
            let mut data = Vec::with_capacity(declared.min(MAX_PREALLOCATION));
            file.read_to_end(&mut data)?;
            parts.push((name, data));
        }
        let package = Self { parts };
        if !package.contains(CONTENT_TYPES) {
            return Err(RenderError::invalid(
                "not an Office Open XML package ([Content_Types].xml missing)",
            ));
        }
        Ok(package)
    }

    pub fn from_parts(parts: &[(&str, &str)]) -> Self {
        Self {
            parts: parts
                .iter()
                .map(|(name, xml)| (name.to_string(), xml.as_bytes().to_vec()))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(part, _)| part == name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part, _)| part == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn read_xml(&self, name: &str) -> Result<String, RenderError> {
        let data = self
            .get(name)
            .ok_or_else(|| RenderError::invalid(format!("package part {name} is missing")))?;
        let text = String::from_utf8_lossy(data);
        // A byte-order mark would shift every roxmltree offset.
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(part, _)| part == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn put_xml(&mut self, name: &str, xml: String) {
        self.put(name, xml.into_bytes());
    }

    /// First `{prefix}{n}.{ext}` not yet in the package, counting from 1.
    pub fn unused_name(&self, prefix: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}{n}.{ext}"))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| format!("{prefix}.{ext}"))
    }

    pub fn add_default_content_type(&mut self, ext: &str, content_type: &str) -> Result<(), RenderError> {
        let xml = self.read_xml(CONTENT_TYPES)?;
        let doc = parse(&xml, CONTENT_TYPES)?;
        let exists = doc.root_element().children().any(|node| {
            node.has_tag_name("Default")
                && node
                    .attribute("Extension")
                    .is_some_and(|value| value.eq_ignore_ascii_case(ext))
        });
        if exists {
            return Ok(());
        }
        let fragment = format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape(ext),
            escape(content_type)
        );
        let updated = append_child(&xml, doc.root_element().range(), &fragment);
        self.put_xml(CONTENT_TYPES, updated);
        Ok(())
    }

    pub fn add_override(&mut self, part_name: &str, content_type: &str) -> Result<(), RenderError> {
        let xml = self.read_xml(CONTENT_TYPES)?;
        let doc = parse(&xml, CONTENT_TYPES)?;
        let absolute = format!("/{}", part_name.trim_start_matches('/'));
        let exists = doc.root_element().children().any(|node| {
            node.has_tag_name("Override") && node.attribute("PartName") == Some(absolute.as_str())
        });
        if exists {
            return Ok(());
        }
        let fragment = format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            escape(&absolute),
            escape(content_type)
        );
        let updated = append_child(&xml, doc.root_element().range(), &fragment);
        self.put_xml(CONTENT_TYPES, updated);
        Ok(())
    }

    pub fn relationships(&self, source_part: &str) -> Result<Vec<Relationship>, RenderError> {
        let rels = rels_path(source_part);
        if !self.contains(&rels) {
            return Ok(Vec::new());
        }
        let xml = self.read_xml(&rels)?;
        let doc = parse(&xml, &rels)?;
        Ok(doc
            .root_element()
            .children()
            .filter(|node| node.has_tag_name("Relationship"))
            .map(|node| Relationship {
                id: node.attribute("Id").unwrap_or_default().to_string(),
                rel_type: node.attribute("Type").unwrap_or_default().to_string(),
                target: node.attribute("Target").unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Adds a relationship from `source_part` and returns its new `rId`.
    pub fn add_relationship(
        &mut self,
        source_part: &str,
        rel_type: &str,
        target: &str,
    ) -> Result<String, RenderError> {
        let rels = rels_path(source_part);
        let xml = if self.contains(&rels) {
            self.read_xml(&rels)?
        } else {
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{RELS_NS}"></Relationships>"#
            )
        };
        let doc = parse(&xml, &rels)?;
        let next = doc
            .root_element()
            .children()
            .filter_map(|node| node.attribute("Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        let fragment = format!(
            r#"<Relationship Id="{id}" Type="{}" Target="{}"/>"#,
            escape(rel_type),
            escape(target)
        );
        let updated = append_child(&xml, doc.root_element().range(), &fragment);
        self.put_xml(&rels, updated);
        debug!("{source_part}: {id} -> {target}");
        Ok(id)
    }

    /// Part named by the package-level `officeDocument` relationship.
    pub fn main_part(&self) -> Result<String, RenderError> {
        self.relationships("")?
            .into_iter()
            .find(|rel| rel.rel_type == REL_OFFICE_DOCUMENT)
            .map(|rel| resolve_target("", &rel.target))
            .ok_or_else(|| RenderError::invalid("package has no main document relationship"))
    }

    /// Parts reached from `source_part` through relationships of `rel_type`.
    pub fn related_parts(&self, source_part: &str, rel_type: &str) -> Result<Vec<(String, String)>, RenderError> {
        Ok(self
            .relationships(source_part)?
            .into_iter()
            .filter(|rel| rel.rel_type == rel_type)
            .map(|rel| (rel.id, resolve_target(source_part, &rel.target)))
            .collect())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // Content types first, as Office writes them.
        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name == CONTENT_TYPES)
            .chain(self.parts.iter().filter(|(name, _)| name != CONTENT_TYPES));
        for (name, data) in ordered {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

pub fn parse<'a>(xml: &'a str, part: &str) -> Result<roxmltree::Document<'a>, RenderError> {
    roxmltree::Document::parse(xml).map_err(|source| RenderError::Xml {
        part: part.to_string(),
        source,
    })
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`; the package itself is `""`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`]: the relative path from one part to another.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let from: Vec<&str> = source_part.split('/').collect();
    let from_dir = &from[..from.len().saturating_sub(1)];
    let to: Vec<&str> = target_part.split('/').collect();
    let to_dir = &to[..to.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(to_dir)
        .take_while(|(a, b)| a == b)
        .count();
    let mut segments: Vec<&str> = vec![".."; from_dir.len() - common];
    segments.extend(&to[common..]);
    segments.join("/")
}

pub fn replace_range(xml: &str, range: Range<usize>, replacement: &str) -> String {
    format!("{}{replacement}{}", &xml[..range.start], &xml[range.end..])
}

/// Inserts `fragment` as the last child of the element spanning `range`,
/// expanding a self-closing tag when needed.
pub fn append_child(xml: &str, range: Range<usize>, fragment: &str) -> String {
    let element = &xml[range.clone()];
    if element.ends_with("/>") {
        let open = element[..element.len() - 2].trim_end();
        let name = tag_name(open);
        return format!(
            "{}{open}>{fragment}</{name}>{}",
            &xml[..range.start],
            &xml[range.end..]
        );
    }
    let close = element.rfind("</").map(|pos| range.start + pos).unwrap_or(range.end);
    format!("{}{fragment}{}", &xml[..close], &xml[close..])
}

/// Inserts `fragment` right after the start tag of the element spanning `range`.
pub fn prepend_child(xml: &str, range: Range<usize>, fragment: &str) -> String {
    let element = &xml[range.clone()];
    if element.ends_with("/>") {
        return append_child(xml, range, fragment);
    }
    let open_end = start_tag_end(element).map(|pos| range.start + pos).unwrap_or(range.end);
    format!("{}{fragment}{}", &xml[..open_end], &xml[open_end..])
}

/// Byte offset just past the `>` of the start tag, skipping quoted attribute values.
pub fn start_tag_end(element: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, ch) in element.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(index + 1),
            _ => {}
        }
    }
    None
}

/// Everything between the start and end tags; empty for a self-closing element.
pub fn inner_xml(element: &str) -> &str {
    if element.ends_with("/>") {
        return "";
    }
    let start = start_tag_end(element).unwrap_or(element.len());
    let end = element.rfind("</").unwrap_or(element.len()).max(start);
    &element[start..end]
}

/// Qualified tag name of an element given its start tag text.
pub fn tag_name(start_tag: &str) -> &str {
    let body = start_tag.trim_start_matches('<');
    let end = body
        .find(|ch: char| ch.is_whitespace() || ch == '>' || ch == '/')
        .unwrap_or(body.len());
    &body[..end]
}

/// Prefix used for an element in the source text (`""` for the default namespace).
pub fn element_prefix<'a>(xml: &'a str, node: roxmltree::Node) -> &'a str {
    let name = tag_name(&xml[node.range()]);
    name.split_once(':').map(|(prefix, _)| prefix).unwrap_or("")
}

/// Escapes character data; quotes are left alone.
pub fn xml_text(text: &str) -> String {
    partial_escape(text).into_owned()
}

pub fn xml_attr(value: &str) -> String {
    escape(value).into_owned()
}

pub fn core_properties_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>docs-mcp</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#
    )
}

pub fn app_properties_xml(application: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{}</Application></Properties>"#,
        xml_text(application)
    )
}

/// Package-level relationships shared by every skeleton.
pub fn root_relationships_xml(main_part: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="{main_part}"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

pub const CORE_PROPS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
pub const APP_PROPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    fn stored_zip(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in parts {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(data).expect("write part");
        }
        writer.finish().expect("finish").into_inner()
    }

    #[test]
    fn open_ignores_inflated_declared_sizes() {
        let mut bytes = stored_zip(&[(CONTENT_TYPES, TYPES.as_bytes())]);
        let header = bytes
            .windows(4)
            .position(|window| window == b"PK\x01\x02")
            .expect("central directory header");
        bytes[header + 24..header + 28].copy_from_slice(&0xF000_0000u32.to_le_bytes());

        let package = Package::open(&bytes).expect("package");
        assert_eq!(package.parts.len(), 1);
        let (name, data) = &package.parts[0];
        assert_eq!(name, CONTENT_TYPES);
        assert_eq!(data.as_slice(), TYPES.as_bytes());
        assert!(data.capacity() <= MAX_PREALLOCATION, "reserved {}", data.capacity());
    }

    #[test]
    fn rels_paths() {
        assert_eq!(rels_path("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path(""), "_rels/.rels");
    }

    #[test]
    fn resolves_relative_targets() {
        assert_eq!(resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("xl/workbook.xml", "/xl/styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn relative_targets_invert_resolution() {
        assert_eq!(relative_target("word/document.xml", "word/media/image1.png"), "media/image1.png");
        assert_eq!(
            relative_target("ppt/slides/slide3.xml", "ppt/slideLayouts/slideLayout2.xml"),
            "../slideLayouts/slideLayout2.xml"
        );
        assert_eq!(relative_target("xl/drawings/drawing1.xml", "xl/charts/chart1.xml"), "../charts/chart1.xml");
        let target = relative_target("ppt/slides/slide1.xml", "ppt/charts/chart2.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", &target), "ppt/charts/chart2.xml");
    }

    #[test]
    fn append_child_expands_self_closing() {
        let xml = r#"<a><b x="1"/></a>"#;
        let doc = roxmltree::Document::parse(xml).expect("xml");
        let b = doc.root_element().first_element_child().expect("b");
        assert_eq!(append_child(xml, b.range(), "<c/>"), r#"<a><b x="1"><c/></b></a>"#);
        assert_eq!(append_child(xml, doc.root_element().range(), "<d/>"), r#"<a><b x="1"/><d/></a>"#);
        assert_eq!(prepend_child(xml, doc.root_element().range(), "<d/>"), r#"<a><d/><b x="1"/></a>"#);
    }

    #[test]
    fn start_tag_end_skips_quoted_gt() {
        assert_eq!(start_tag_end(r#"<a t="x>y">z</a>"#), Some(11));
        assert_eq!(inner_xml(r#"<a t="x>y"><b/>z</a>"#), "<b/>z");
        assert_eq!(inner_xml(r#"<a count="0"/>"#), "");
    }

    #[test]
    fn content_types_and_relationships() {
        let mut package = Package::from_parts(&[(CONTENT_TYPES, TYPES)]);
        package.add_default_content_type("png", "image/png").expect("default");
        package.add_default_content_type("PNG", "image/png").expect("default");
        package
            .add_override("word/document.xml", "application/test")
            .expect("override");
        let types = package.read_xml(CONTENT_TYPES).expect("types");
        assert_eq!(types.matches("Extension=\"png\"").count(), 1);
        assert!(types.contains(r#"PartName="/word/document.xml""#));

        let first = package
            .add_relationship("word/document.xml", REL_IMAGE, "media/image1.png")
            .expect("rel");
        let second = package
            .add_relationship("word/document.xml", REL_IMAGE, "media/image2.png")
            .expect("rel");
        assert_eq!((first.as_str(), second.as_str()), ("rId1", "rId2"));
        let rels = package.relationships("word/document.xml").expect("rels");
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[1].target, "media/image2.png");
    }

    #[test]
    fn zip_round_trip_keeps_parts() {
        let mut package = Package::from_parts(&[(CONTENT_TYPES, TYPES)]);
        package.put("word/media/image1.png", vec![1, 2, 3]);
        assert_eq!(package.unused_name("word/media/image", "png"), "word/media/image2.png");
        let bytes = package.to_bytes().expect("zip");
        let reopened = Package::open(&bytes).expect("open");
        assert_eq!(reopened.get("word/media/image1.png"), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn finds_main_part_through_root_relationships() {
        let rels = root_relationships_xml("xl/workbook.xml");
        let package = Package::from_parts(&[(CONTENT_TYPES, TYPES), ("_rels/.rels", rels.as_str())]);
        assert_eq!(package.main_part().expect("main"), "xl/workbook.xml");
        assert!(Package::from_parts(&[(CONTENT_TYPES, TYPES)]).main_part().is_err());
    }

    #[test]
    fn rejects_non_packages() {
        assert!(Package::open(b"definitely not a zip").is_err());
    }
}
