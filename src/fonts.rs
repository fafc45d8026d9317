//! Process-wide registry of the font faces the PDF tool may use.
//!
//! Built-in PDF faces are always allowed. TrueType files attached to a
//! request join the registry when their file name maps to one of the known
//! open-source families; the registry only ever grows.

use crate::attachments::{AttachmentSet, inline_payload};
use crate::mcp::contracts::MAX_FONT_BYTES;
use crate::render::pdf::text::winansi_to_char;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use ttf_parser::Face;

pub const FALLBACK_FONT: &str = "Helvetica";

pub const BUILTIN_FONTS: [&str; 12] = [
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
];

pub const MODERN_FAMILIES: [&str; 8] = [
    "Inter",
    "Roboto",
    "SourceSans3",
    "OpenSans",
    "NotoSans",
    "Lato",
    "IBMPlexSans",
    "Montserrat",
];

/// File stem prefixes, checked in order.
pub const FAMILY_HINTS: [(&str, &str); 12] = [
    ("inter", "Inter"),
    ("roboto", "Roboto"),
    ("sourcesans3", "SourceSans3"),
    ("source-sans-3", "SourceSans3"),
    ("open-sans", "OpenSans"),
    ("opensans", "OpenSans"),
    ("noto-sans", "NotoSans"),
    ("notosans", "NotoSans"),
    ("lato", "Lato"),
    ("ibm-plex-sans", "IBMPlexSans"),
    ("ibmplexsans", "IBMPlexSans"),
    ("montserrat", "Montserrat"),
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("not a .ttf or .otf file")]
    NotAFontFile,
    #[error("no known family matches {0:?}")]
    UnknownFamily(String),
    #[error("font exceeds {MAX_FONT_BYTES} bytes")]
    TooLarge,
    #[error("font could not be parsed: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
    #[error("font has no TrueType outlines")]
    NoTrueTypeOutlines,
}

/// Metrics scaled to 1000 units per em.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Advance widths for WinAnsi bytes 32..=255.
    pub widths: Vec<f32>,
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
    pub italic_angle: f32,
    pub bbox: [f32; 4],
}

impl FontMetrics {
    pub fn from_face(face: &Face) -> Self {
        let units = f32::from(face.units_per_em().max(1));
        let scale = |value: f32| value / units * 1000.0;
        let widths = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|advance| scale(f32::from(advance)))
                    .unwrap_or(0.0)
            })
            .collect();
        let bb = face.global_bounding_box();
        Self {
            widths,
            ascent: scale(f32::from(face.ascender())),
            descent: scale(f32::from(face.descender())),
            cap_height: face
                .capital_height()
                .map(|h| scale(f32::from(h)))
                .unwrap_or(700.0),
            italic_angle: if face.is_italic() { -12.0 } else { 0.0 },
            bbox: [
                scale(f32::from(bb.x_min)),
                scale(f32::from(bb.y_min)),
                scale(f32::from(bb.x_max)),
                scale(f32::from(bb.y_max)),
            ],
        }
    }
}

#[derive(Debug)]
pub struct FontFace {
    pub face_name: String,
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    pub data: Vec<u8>,
    pub metrics: FontMetrics,
}

/// A face the PDF composer can draw with.
#[derive(Debug, Clone)]
pub enum FaceRef {
    Builtin(&'static str),
    Embedded(Arc<FontFace>),
}

impl FaceRef {
    pub fn name(&self) -> &str {
        match self {
            FaceRef::Builtin(name) => name,
            FaceRef::Embedded(face) => &face.face_name,
        }
    }
}

#[derive(Debug)]
pub struct FontRegistry {
    faces: HashMap<String, Arc<FontFace>>,
    family_map: HashMap<(String, bool, bool), String>,
    allowed: BTreeSet<String>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            family_map: HashMap::new(),
            allowed: BUILTIN_FONTS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }

    pub fn face(&self, face_name: &str) -> Option<Arc<FontFace>> {
        self.faces.get(face_name).cloned()
    }

    /// Registers every usable font attachment. Returns the names that
    /// became allowed by this call.
    pub fn register_from_attachments(&mut self, attachments: AttachmentSet<'_>) -> Vec<String> {
        let mut added = Vec::new();
        for (name, record) in attachments.named() {
            if !has_font_extension(name) {
                continue;
            }
            let bytes = match inline_payload(record) {
                Ok(bytes) => bytes,
                Err(err) => {
                    debug!("font attachment {name:?} skipped: {err}");
                    continue;
                }
            };
            match self.register_face(name, bytes) {
                Ok(names) => added.extend(names),
                Err(err) => debug!("font attachment {name:?} skipped: {err}"),
            }
        }
        if !added.is_empty() {
            info!("registered fonts: {}", added.join(", "));
        }
        added
    }

    pub fn register_face(&mut self, file_name: &str, data: Vec<u8>) -> Result<Vec<String>, FontError> {
        if !has_font_extension(file_name) {
            return Err(FontError::NotAFontFile);
        }
        let family = derive_family_from_filename(file_name)
            .filter(|family| MODERN_FAMILIES.contains(family))
            .ok_or_else(|| FontError::UnknownFamily(file_name.to_string()))?;
        if data.len() > MAX_FONT_BYTES {
            return Err(FontError::TooLarge);
        }

        let face_name = face_name_from_filename(file_name);
        if self.faces.contains_key(&face_name) {
            return Ok(Vec::new());
        }

        let metrics = {
            let face = Face::parse(&data, 0)?;
            if face.tables().glyf.is_none() {
                warn!("{file_name:?} uses CFF outlines; only TrueType outlines can be embedded");
                return Err(FontError::NoTrueTypeOutlines);
            }
            FontMetrics::from_face(&face)
        };

        let (bold, italic) = detect_style_flags(file_name);
        let face = Arc::new(FontFace {
            face_name: face_name.clone(),
            family: family.to_string(),
            bold,
            italic,
            data,
            metrics,
        });
        self.faces.insert(face_name.clone(), face);
        self.family_map
            .entry((family.to_string(), bold, italic))
            .or_insert_with(|| face_name.clone());

        let mut added = Vec::new();
        if self.allowed.insert(face_name.clone()) {
            added.push(face_name);
        }
        if !bold && !italic && self.allowed.insert(family.to_string()) {
            added.push(family.to_string());
        }
        Ok(added)
    }

    /// The requested name when allowed, else its derived family when
    /// allowed, else Helvetica.
    pub fn choose_font(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested.map(str::trim).filter(|name| !name.is_empty()) else {
            return FALLBACK_FONT.to_string();
        };
        if self.is_allowed(requested) {
            return requested.to_string();
        }
        let family = derive_family_from_filename(requested).unwrap_or(requested);
        if self.is_allowed(family) {
            return family.to_string();
        }
        FALLBACK_FONT.to_string()
    }

    /// Maps a chosen font name plus inline bold/italic to a drawable face.
    pub fn resolve_face(&self, name: &str, bold: bool, italic: bool) -> FaceRef {
        if let Some((family, base_bold, base_italic)) = builtin_family(name) {
            return FaceRef::Builtin(builtin_variant(family, base_bold || bold, base_italic || italic));
        }

        let (family, want_bold, want_italic) = match self.faces.get(name) {
            Some(face) => (face.family.clone(), face.bold || bold, face.italic || italic),
            None => (name.to_string(), bold, italic),
        };
        let candidates = [
            (want_bold, want_italic),
            (want_bold, false),
            (false, want_italic),
            (false, false),
        ];
        for (b, i) in candidates {
            if let Some(face) = self
                .family_map
                .get(&(family.clone(), b, i))
                .and_then(|face_name| self.faces.get(face_name))
            {
                return FaceRef::Embedded(Arc::clone(face));
            }
        }
        if let Some(face) = self.faces.get(name) {
            return FaceRef::Embedded(Arc::clone(face));
        }
        FaceRef::Builtin(builtin_variant("Helvetica", bold, italic))
    }
}

static REGISTRY: OnceLock<RwLock<FontRegistry>> = OnceLock::new();

pub fn global() -> &'static RwLock<FontRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(FontRegistry::new()))
}

/// Registration is idempotent, so a poisoned lock still holds a usable registry.
pub fn read_global() -> RwLockReadGuard<'static, FontRegistry> {
    global().read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_global() -> RwLockWriteGuard<'static, FontRegistry> {
    global().write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn has_font_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".ttf") || lower.ends_with(".otf")
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

pub fn derive_family_from_filename(name: &str) -> Option<&'static str> {
    let stem = file_stem(name).to_lowercase();
    FAMILY_HINTS
        .iter()
        .find(|(prefix, _)| stem.starts_with(prefix))
        .map(|(_, family)| *family)
}

/// `(bold, italic)` from keywords in the file name.
pub fn detect_style_flags(name: &str) -> (bool, bool) {
    let lower = Path::new(name)
        .file_name()
        .and_then(|base| base.to_str())
        .unwrap_or(name)
        .to_lowercase();
    let italic = lower.contains("italic") || lower.contains("oblique");
    if lower.contains("bolditalic") || (lower.contains("bold") && italic) {
        return (true, true);
    }
    let bold = lower.contains("bold") || lower.contains("semibold") || lower.contains("medium");
    (bold, italic)
}

pub fn face_name_from_filename(name: &str) -> String {
    file_stem(name)
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn builtin_family(name: &str) -> Option<(&'static str, bool, bool)> {
    let (family, bold, italic) = match name {
        "Helvetica" => ("Helvetica", false, false),
        "Helvetica-Bold" => ("Helvetica", true, false),
        "Helvetica-Oblique" => ("Helvetica", false, true),
        "Helvetica-BoldOblique" => ("Helvetica", true, true),
        "Times-Roman" => ("Times", false, false),
        "Times-Bold" => ("Times", true, false),
        "Times-Italic" => ("Times", false, true),
        "Times-BoldItalic" => ("Times", true, true),
        "Courier" => ("Courier", false, false),
        "Courier-Bold" => ("Courier", true, false),
        "Courier-Oblique" => ("Courier", false, true),
        "Courier-BoldOblique" => ("Courier", true, true),
        _ => return None,
    };
    Some((family, bold, italic))
}

fn builtin_variant(family: &str, bold: bool, italic: bool) -> &'static str {
    match (family, bold, italic) {
        ("Times", false, false) => "Times-Roman",
        ("Times", true, false) => "Times-Bold",
        ("Times", false, true) => "Times-Italic",
        ("Times", true, true) => "Times-BoldItalic",
        ("Courier", false, false) => "Courier",
        ("Courier", true, false) => "Courier-Bold",
        ("Courier", false, true) => "Courier-Oblique",
        ("Courier", true, true) => "Courier-BoldOblique",
        (_, false, false) => "Helvetica",
        (_, true, false) => "Helvetica-Bold",
        (_, false, true) => "Helvetica-Oblique",
        (_, true, true) => "Helvetica-BoldOblique",
    }
}
