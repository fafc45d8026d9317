//! PresentationML rendering: slides are generated whole and wired into the
//! presentation part, its relationships and the content types.

use super::chart::{CHART_CONTENT_TYPE, CHART_NS, literal_bar_chart};
use super::image::probe;
use super::package::{
    APP_PROPS_CONTENT_TYPE, CONTENT_TYPES, CORE_PROPS_CONTENT_TYPE, Package, R_NS, REL_CHART,
    REL_IMAGE, app_properties_xml, append_child, core_properties_xml, element_prefix, parse,
    relative_target, root_relationships_xml, xml_attr, xml_text,
};
use super::{RenderError, inches_to_emu};
use crate::attachments::ResolvedImage;
use crate::schema::office::{PptInstructions, SlideChart};
use log::{debug, warn};

pub const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Lowest slide id PowerPoint accepts.
const MIN_SLIDE_ID: u32 = 256;

const PICTURE_LEFT_INCHES: f64 = 1.0;
const PICTURE_TOP_INCHES: f64 = 1.5;
const PICTURE_GAP_INCHES: f64 = 0.25;
const CHART_FRAME_INCHES: (f64, f64, f64, f64) = (1.0, 3.0, 8.0, 3.0);

/// Images resolved for one slide, in the order they were listed.
pub type SlideImages = Vec<Vec<ResolvedImage>>;

pub fn create(instructions: &PptInstructions, images: &SlideImages) -> Result<Vec<u8>, RenderError> {
    let mut package = skeleton();
    let presentation = package.main_part()?;
    if let Some(title) = &instructions.title {
        let layouts = layouts(&package, &presentation)?;
        let slide = SlideContent {
            title: Some(title.as_str()),
            ..SlideContent::default()
        };
        add_slide(&mut package, &presentation, &layouts[0], &slide)?;
    }
    apply(&mut package, &presentation, instructions, images)?;
    package.to_bytes()
}

/// Appends the requested slides after the existing ones.
pub fn modify(
    existing: &[u8],
    instructions: &PptInstructions,
    images: &SlideImages,
) -> Result<Vec<u8>, RenderError> {
    let mut package = Package::open(existing)?;
    let presentation = package.main_part()?;
    apply(&mut package, &presentation, instructions, images)?;
    package.to_bytes()
}

fn apply(
    package: &mut Package,
    presentation: &str,
    instructions: &PptInstructions,
    images: &SlideImages,
) -> Result<(), RenderError> {
    let xml = package.read_xml(presentation)?;
    let doc = parse(&xml, presentation)?;
    let root = doc.root_element();
    if root.tag_name().namespace() != Some(P_NS) || element_prefix(&xml, root) != "p" {
        return Err(RenderError::invalid(format!(
            "{presentation} does not use the standard p: PresentationML prefix"
        )));
    }
    if instructions.slides.is_empty() {
        return Ok(());
    }
    let layouts = layouts(package, presentation)?;
    let layout = layouts.get(1).unwrap_or(&layouts[0]).clone();
    let no_images = Vec::new();
    for (index, spec) in instructions.slides.iter().enumerate() {
        let slide = SlideContent {
            title: spec.title.as_deref(),
            bullets: &spec.bullets,
            images: images.get(index).unwrap_or(&no_images),
            chart: spec.chart.as_ref(),
        };
        add_slide(package, presentation, &layout, &slide)?;
    }
    Ok(())
}

#[derive(Default)]
struct SlideContent<'a> {
    title: Option<&'a str>,
    bullets: &'a [String],
    images: &'a [ResolvedImage],
    chart: Option<&'a SlideChart>,
}

/// Layout parts in the order of the master's layout list; never empty.
fn layouts(package: &Package, presentation: &str) -> Result<Vec<String>, RenderError> {
    let (_, master) = package
        .related_parts(presentation, REL_SLIDE_MASTER)?
        .into_iter()
        .next()
        .ok_or_else(|| RenderError::invalid("presentation has no slide master"))?;
    let rels = package.related_parts(&master, REL_SLIDE_LAYOUT)?;
    let xml = package.read_xml(&master)?;
    let doc = parse(&xml, &master)?;
    let mut ordered: Vec<String> = doc
        .descendants()
        .filter(|node| node.has_tag_name((P_NS, "sldLayoutId")))
        .filter_map(|node| node.attribute((R_NS, "id")))
        .filter_map(|id| rels.iter().find(|(rel_id, _)| rel_id == id))
        .map(|(_, part)| part.clone())
        .collect();
    if ordered.is_empty() {
        ordered = rels.into_iter().map(|(_, part)| part).collect();
    }
    if ordered.is_empty() {
        return Err(RenderError::invalid(format!("{master} has no slide layouts")));
    }
    Ok(ordered)
}

#[derive(Debug, Clone, PartialEq)]
struct Placeholder {
    kind: String,
    idx: Option<String>,
    name: String,
}

impl Placeholder {
    fn is_title(&self) -> bool {
        matches!(self.kind.as_str(), "title" | "ctrTitle")
    }

    fn xml(&self) -> String {
        let mut out = String::from("<p:ph");
        if self.kind != "obj" {
            out.push_str(&format!(r#" type="{}""#, xml_attr(&self.kind)));
        }
        if let Some(idx) = &self.idx {
            out.push_str(&format!(r#" idx="{}""#, xml_attr(idx)));
        }
        out.push_str("/>");
        out
    }
}

fn placeholders(package: &Package, layout: &str) -> Result<Vec<Placeholder>, RenderError> {
    let xml = package.read_xml(layout)?;
    let doc = parse(&xml, layout)?;
    Ok(doc
        .descendants()
        .filter(|node| node.has_tag_name((P_NS, "sp")))
        .filter_map(|sp| {
            let ph = sp
                .descendants()
                .find(|node| node.has_tag_name((P_NS, "ph")))?;
            let name = sp
                .descendants()
                .find(|node| node.has_tag_name((P_NS, "cNvPr")))
                .and_then(|node| node.attribute("name"))
                .unwrap_or("Placeholder");
            Some(Placeholder {
                kind: ph.attribute("type").unwrap_or("obj").to_string(),
                idx: ph.attribute("idx").map(str::to_string),
                name: name.to_string(),
            })
        })
        .filter(|ph| !matches!(ph.kind.as_str(), "dt" | "ftr" | "sldNum"))
        .collect())
}

fn paragraphs_xml<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&format!(
            r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
            xml_text(line)
        ));
    }
    if out.is_empty() {
        out.push_str("<a:p/>");
    }
    out
}

fn add_slide(
    package: &mut Package,
    presentation: &str,
    layout: &str,
    content: &SlideContent,
) -> Result<String, RenderError> {
    let part = package.unused_name("ppt/slides/slide", "xml");
    package.add_relationship(&part, REL_SLIDE_LAYOUT, &relative_target(&part, layout))?;

    let mut shapes = String::new();
    let mut next_id = 2u32;
    let mut bullets_placed = content.bullets.is_empty();
    let mut title_placed = content.title.is_none();
    for ph in placeholders(package, layout)? {
        let text = if ph.is_title() {
            match content.title {
                Some(title) if !title_placed => {
                    title_placed = true;
                    paragraphs_xml([title])
                }
                _ => paragraphs_xml([]),
            }
        } else if ph.idx.as_deref() == Some("1") && !bullets_placed {
            bullets_placed = true;
            paragraphs_xml(content.bullets.iter().map(String::as_str))
        } else {
            paragraphs_xml([])
        };
        shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{next_id}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{text}</p:txBody></p:sp>"#,
            xml_attr(&ph.name),
            ph.xml()
        ));
        next_id += 1;
    }
    if !title_placed {
        warn!("{layout} has no title placeholder; slide title dropped");
    }
    if !bullets_placed {
        warn!("{layout} has no body placeholder; bullets written to a text box");
        shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{next_id}" name="TextBox {next_id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/>{}</p:txBody></p:sp>"#,
            inches_to_emu(1.0),
            inches_to_emu(1.5),
            inches_to_emu(8.0),
            inches_to_emu(5.0),
            paragraphs_xml(content.bullets.iter().map(String::as_str))
        ));
        next_id += 1;
    }

    let mut left = PICTURE_LEFT_INCHES;
    for image in content.images {
        let Some(bytes) = &image.bytes else {
            warn!("image {:?} has no data; skipped", image.label);
            continue;
        };
        let info = probe(&image.label, bytes)?;
        let media = package.unused_name("ppt/media/image", info.extension());
        package.put(&media, bytes.clone());
        package.add_default_content_type(info.extension(), info.content_type())?;
        let rel_id = package.add_relationship(&part, REL_IMAGE, &relative_target(&part, &media))?;
        shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{next_id}" name="Picture {next_id}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            xml_attr(&image.label),
            inches_to_emu(left),
            inches_to_emu(PICTURE_TOP_INCHES),
            inches_to_emu(image.width_inches),
            inches_to_emu(info.scaled_height(image.width_inches)),
        ));
        left += image.width_inches + PICTURE_GAP_INCHES;
        next_id += 1;
    }

    if let Some(chart) = content.chart {
        if chart.kind != "bar" {
            warn!("chart type {:?} is drawn as a clustered column chart", chart.kind);
        }
        let chart_part = package.unused_name("ppt/charts/chart", "xml");
        package.put_xml(&chart_part, literal_bar_chart(&chart.categories, &chart.series));
        package.add_override(&chart_part, CHART_CONTENT_TYPE)?;
        let rel_id =
            package.add_relationship(&part, REL_CHART, &relative_target(&part, &chart_part))?;
        let (x, y, cx, cy) = CHART_FRAME_INCHES;
        shapes.push_str(&format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{next_id}" name="Chart {next_id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm><a:graphic><a:graphicData uri="{CHART_NS}"><c:chart xmlns:c="{CHART_NS}" r:id="{rel_id}"/></a:graphicData></a:graphic></p:graphicFrame>"#,
            inches_to_emu(x),
            inches_to_emu(y),
            inches_to_emu(cx),
            inches_to_emu(cy),
        ));
    }

    package.put_xml(
        &part,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
    );
    package.add_override(&part, CT_SLIDE)?;
    let rel_id = package.add_relationship(presentation, REL_SLIDE, &relative_target(presentation, &part))?;
    register_slide(package, presentation, &rel_id)?;
    debug!("{part} added with layout {layout}");
    Ok(part)
}

/// Appends a `p:sldId` entry, creating the list in schema position when absent.
fn register_slide(package: &mut Package, presentation: &str, rel_id: &str) -> Result<(), RenderError> {
    let xml = package.read_xml(presentation)?;
    let doc = parse(&xml, presentation)?;
    let root = doc.root_element();
    let next = doc
        .descendants()
        .filter(|node| node.has_tag_name((P_NS, "sldId")))
        .filter_map(|node| node.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .map_or(MIN_SLIDE_ID, |max| (max + 1).max(MIN_SLIDE_ID));
    let entry = format!(r#"<p:sldId id="{next}" r:id="{rel_id}"/>"#);
    let updated = match root
        .children()
        .find(|node| node.has_tag_name((P_NS, "sldIdLst")))
    {
        Some(list) => append_child(&xml, list.range(), &entry),
        None => {
            let list = format!("<p:sldIdLst>{entry}</p:sldIdLst>");
            let before = root.children().filter(|node| node.is_element()).find(|node| {
                !matches!(
                    node.tag_name().name(),
                    "sldMasterIdLst" | "notesMasterIdLst" | "handoutMasterIdLst"
                )
            });
            match before {
                Some(node) => {
                    let at = node.range().start;
                    format!("{}{list}{}", &xml[..at], &xml[at..])
                }
                None => append_child(&xml, root.range(), &list),
            }
        }
    };
    package.put_xml(presentation, updated);
    Ok(())
}

fn skeleton() -> Package {
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/><Override PartName="/ppt/viewProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"/><Override PartName="/ppt/tableStyles.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"/><Override PartName="/docProps/core.xml" ContentType="{CORE_PROPS_CONTENT_TYPE}"/><Override PartName="/docProps/app.xml" ContentType="{APP_PROPS_CONTENT_TYPE}"/></Types>"#
    );
    let ns = format!(r#"xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}""#);
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {ns} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldSz cx="9144000" cy="6858000" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    );
    let presentation_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_SLIDE_MASTER}" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{REL_THEME}" Target="theme/theme1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps" Target="presProps.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps" Target="viewProps.xml"/><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles" Target="tableStyles.xml"/></Relationships>"#
    );
    let group = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;
    let master = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {ns}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{group}{title}{body}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr algn="ctr"><a:defRPr sz="4400"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/><a:ea typeface="+mj-ea"/><a:cs typeface="+mj-cs"/></a:defRPr></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/><a:defRPr sz="3200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/><a:ea typeface="+mn-ea"/><a:cs typeface="+mn-cs"/></a:defRPr></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:defPPr><a:defRPr lang="en-US"/></a:defPPr></p:otherStyle></p:txStyles></p:sldMaster>"#,
        title = placeholder_shape(2, "Title Placeholder 1", r#"type="title""#, (457_200, 274_638, 8_229_600, 1_143_000)),
        body = placeholder_shape(3, "Text Placeholder 2", r#"type="body" idx="1""#, (457_200, 1_600_200, 8_229_600, 4_525_963)),
    );
    let master_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_SLIDE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_SLIDE_LAYOUT}" Target="../slideLayouts/slideLayout2.xml"/><Relationship Id="rId3" Type="{REL_THEME}" Target="../theme/theme1.xml"/></Relationships>"#
    );
    let title_layout = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {ns} type="title" preserve="1"><p:cSld name="Title Slide"><p:spTree>{group}{title}{subtitle}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        title = placeholder_shape(2, "Title 1", r#"type="ctrTitle""#, (685_800, 2_130_425, 7_772_400, 1_470_025)),
        subtitle = placeholder_shape(3, "Subtitle 2", r#"type="subTitle" idx="1""#, (1_371_600, 3_886_200, 6_400_800, 1_752_600)),
    );
    let content_layout = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {ns} type="obj" preserve="1"><p:cSld name="Title and Content"><p:spTree>{group}{title}{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        title = placeholder_shape(2, "Title 1", r#"type="title""#, (457_200, 274_638, 8_229_600, 1_143_000)),
        body = placeholder_shape(3, "Content Placeholder 2", r#"idx="1""#, (457_200, 1_600_200, 8_229_600, 4_525_963)),
    );
    let layout_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_SLIDE_MASTER}" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
    );
    let pres_props = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentationPr {ns}/>"#
    );
    let view_props = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:viewPr {ns}><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#
    );
    let table_styles = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:tblStyleLst xmlns:a="{A_NS}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#
    );
    let theme = theme_xml();
    let root_rels = root_relationships_xml("ppt/presentation.xml");
    let core = core_properties_xml();
    let app = app_properties_xml("docs-mcp");
    Package::from_parts(&[
        (CONTENT_TYPES, content_types.as_str()),
        ("_rels/.rels", root_rels.as_str()),
        ("docProps/core.xml", core.as_str()),
        ("docProps/app.xml", app.as_str()),
        ("ppt/presentation.xml", presentation.as_str()),
        ("ppt/_rels/presentation.xml.rels", presentation_rels.as_str()),
        ("ppt/slideMasters/slideMaster1.xml", master.as_str()),
        ("ppt/slideMasters/_rels/slideMaster1.xml.rels", master_rels.as_str()),
        ("ppt/slideLayouts/slideLayout1.xml", title_layout.as_str()),
        ("ppt/slideLayouts/_rels/slideLayout1.xml.rels", layout_rels.as_str()),
        ("ppt/slideLayouts/slideLayout2.xml", content_layout.as_str()),
        ("ppt/slideLayouts/_rels/slideLayout2.xml.rels", layout_rels.as_str()),
        ("ppt/theme/theme1.xml", theme.as_str()),
        ("ppt/presProps.xml", pres_props.as_str()),
        ("ppt/viewProps.xml", view_props.as_str()),
        ("ppt/tableStyles.xml", table_styles.as_str()),
    ])
}

fn placeholder_shape(id: u32, name: &str, ph_attrs: &str, frame: (i64, i64, i64, i64)) -> String {
    let (x, y, cx, cy) = frame;
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph {ph_attrs}/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#
    )
}

fn theme_xml() -> String {
    let colors = [
        ("dk1", r#"<a:sysClr val="windowText" lastClr="000000"/>"#),
        ("lt1", r#"<a:sysClr val="window" lastClr="FFFFFF"/>"#),
        ("dk2", r#"<a:srgbClr val="1F497D"/>"#),
        ("lt2", r#"<a:srgbClr val="EEECE1"/>"#),
        ("accent1", r#"<a:srgbClr val="4F81BD"/>"#),
        ("accent2", r#"<a:srgbClr val="C0504D"/>"#),
        ("accent3", r#"<a:srgbClr val="9BBB59"/>"#),
        ("accent4", r#"<a:srgbClr val="8064A2"/>"#),
        ("accent5", r#"<a:srgbClr val="4BACC6"/>"#),
        ("accent6", r#"<a:srgbClr val="F79646"/>"#),
        ("hlink", r#"<a:srgbClr val="0000FF"/>"#),
        ("folHlink", r#"<a:srgbClr val="800080"/>"#),
    ]
    .iter()
    .map(|(name, value)| format!("<a:{name}>{value}</a:{name}>"))
    .collect::<String>();
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = |width: u32| {
        format!(r#"<a:ln w="{width}" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/></a:ln>"#)
    };
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{A_NS}" name="Office Theme"><a:themeElements><a:clrScheme name="Office">{colors}</a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{l1}{l2}{l3}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#,
        l1 = line(9525),
        l2 = line(25400),
        l3 = line(38100),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::tests::png_bytes;
    use crate::schema::office::{ChartSeries, SlideSpec};

    fn slide_texts(package: &Package, part: &str) -> Vec<String> {
        let xml = package.read_xml(part).expect("slide");
        let doc = roxmltree::Document::parse(&xml).expect("xml");
        doc.descendants()
            .filter(|node| node.has_tag_name((A_NS, "t")))
            .filter_map(|node| node.text())
            .map(str::to_string)
            .collect()
    }

    fn slide_ids(package: &Package) -> Vec<u32> {
        let xml = package.read_xml("ppt/presentation.xml").expect("presentation");
        let doc = roxmltree::Document::parse(&xml).expect("xml");
        doc.descendants()
            .filter(|node| node.has_tag_name((P_NS, "sldId")))
            .filter_map(|node| node.attribute("id"))
            .filter_map(|id| id.parse().ok())
            .collect()
    }

    fn content_slide(title: &str, bullets: &[&str]) -> SlideSpec {
        SlideSpec {
            title: Some(title.to_string()),
            bullets: bullets.iter().map(|bullet| bullet.to_string()).collect(),
            ..SlideSpec::default()
        }
    }

    #[test]
    fn create_adds_title_slide_then_content_slides() {
        let instructions = PptInstructions {
            title: Some("Quarterly Review".to_string()),
            slides: vec![content_slide("Agenda", &["Results", "Plans & Risks"])],
            note: None,
        };
        let bytes = create(&instructions, &Vec::new()).expect("render");
        let package = Package::open(&bytes).expect("package");
        assert_eq!(slide_ids(&package), vec![256, 257]);
        assert_eq!(slide_texts(&package, "ppt/slides/slide1.xml"), vec!["Quarterly Review"]);
        assert_eq!(
            slide_texts(&package, "ppt/slides/slide2.xml"),
            vec!["Agenda", "Results", "Plans & Risks"]
        );
        let rels = package.relationships("ppt/slides/slide2.xml").expect("rels");
        assert_eq!(rels[0].target, "../slideLayouts/slideLayout2.xml");
        let title_rels = package.relationships("ppt/slides/slide1.xml").expect("rels");
        assert_eq!(title_rels[0].target, "../slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn modify_appends_after_existing_slides() {
        let first = create(
            &PptInstructions {
                slides: vec![content_slide("One", &[])],
                ..PptInstructions::default()
            },
            &Vec::new(),
        )
        .expect("render");
        let second = modify(
            &first,
            &PptInstructions {
                title: Some("ignored on modify".to_string()),
                slides: vec![content_slide("Two", &["b"])],
                note: None,
            },
            &Vec::new(),
        )
        .expect("modify");
        let package = Package::open(&second).expect("package");
        assert_eq!(slide_ids(&package), vec![256, 257]);
        assert_eq!(slide_texts(&package, "ppt/slides/slide2.xml"), vec!["Two", "b"]);
        let types = package.read_xml(CONTENT_TYPES).expect("types");
        assert!(types.contains("/ppt/slides/slide2.xml"));
    }

    #[test]
    fn pictures_and_charts_get_their_own_parts() {
        let instructions = PptInstructions {
            slides: vec![SlideSpec {
                chart: Some(SlideChart {
                    kind: "bar".to_string(),
                    categories: vec!["Q1".to_string(), "Q2".to_string()],
                    series: vec![ChartSeries {
                        name: "Series".to_string(),
                        values: vec![3.0, 4.0],
                    }],
                }),
                ..content_slide("Numbers", &[])
            }],
            ..PptInstructions::default()
        };
        let images = vec![vec![ResolvedImage {
            label: "logo.png".to_string(),
            width_inches: 2.0,
            bytes: Some(png_bytes(20, 10)),
        }]];
        let bytes = create(&instructions, &images).expect("render");
        let package = Package::open(&bytes).expect("package");
        assert!(package.contains("ppt/media/image1.png"));
        assert!(package.contains("ppt/charts/chart1.xml"));
        let slide = package.read_xml("ppt/slides/slide1.xml").expect("slide");
        assert!(slide.contains(r#"<a:off x="914400" y="1371600"/><a:ext cx="1828800" cy="914400"/>"#));
        assert!(slide.contains(r#"<a:off x="914400" y="2743200"/><a:ext cx="7315200" cy="2743200"/>"#));
        let targets: Vec<String> = package
            .relationships("ppt/slides/slide1.xml")
            .expect("rels")
            .into_iter()
            .map(|rel| rel.target)
            .collect();
        assert!(targets.contains(&"../media/image1.png".to_string()));
        assert!(targets.contains(&"../charts/chart1.xml".to_string()));
    }

    #[test]
    fn layouts_follow_master_order() {
        let package = skeleton();
        assert_eq!(
            layouts(&package, "ppt/presentation.xml").expect("layouts"),
            vec![
                "ppt/slideLayouts/slideLayout1.xml".to_string(),
                "ppt/slideLayouts/slideLayout2.xml".to_string()
            ]
        );
    }
}
