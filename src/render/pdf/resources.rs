//! Font and image objects shared by every page of a composed document.

use super::standard::StandardMetrics;
use crate::fonts::{FaceRef, FontFace};
use crate::render::RenderError;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::HashMap;
use std::io::Write;

/// Advance width of `bytes` in points.
pub fn text_width(face: &FaceRef, bytes: &[u8], size: f32) -> f32 {
    let units: f32 = match face {
        FaceRef::Builtin(name) => {
            let metrics = StandardMetrics::for_face(name);
            bytes.iter().map(|&byte| metrics.width(byte)).sum()
        }
        FaceRef::Embedded(face) => bytes
            .iter()
            .map(|&byte| {
                byte.checked_sub(32)
                    .and_then(|index| face.metrics.widths.get(usize::from(index)))
                    .copied()
                    .unwrap_or(0.0)
            })
            .sum(),
    };
    units * size / 1000.0
}

pub fn deflate(bytes: &[u8]) -> Result<Vec<u8>, RenderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub resource: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Default)]
pub struct Resources {
    fonts: HashMap<String, String>,
    font_dict: Dictionary,
    xobjects: Dictionary,
    image_count: usize,
}

impl Resources {
    /// Resource name for `face`, writing its font objects on first use.
    pub fn font(&mut self, doc: &mut Document, face: &FaceRef) -> Result<String, RenderError> {
        if let Some(name) = self.fonts.get(face.name()) {
            return Ok(name.clone());
        }
        let font_id = match face {
            FaceRef::Builtin(base) => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => Object::Name(base.as_bytes().to_vec()),
                "Encoding" => "WinAnsiEncoding",
            }),
            FaceRef::Embedded(face) => embed_truetype(doc, face)?,
        };
        let name = format!("F{}", self.fonts.len() + 1);
        self.font_dict.set(name.as_bytes().to_vec(), Object::Reference(font_id));
        self.fonts.insert(face.name().to_string(), name.clone());
        Ok(name)
    }

    pub fn image(
        &mut self,
        doc: &mut Document,
        label: &str,
        bytes: &[u8],
    ) -> Result<PlacedImage, RenderError> {
        let (stream, width, height) = image_xobject(doc, label, bytes)?;
        let id = doc.add_object(stream);
        self.image_count += 1;
        let resource = format!("Im{}", self.image_count);
        self.xobjects.set(resource.as_bytes().to_vec(), Object::Reference(id));
        Ok(PlacedImage {
            resource,
            width,
            height,
        })
    }

    pub fn into_dictionary(self) -> Dictionary {
        let mut resources = dictionary! {
            "ProcSet" => vec![
                Object::Name(b"PDF".to_vec()),
                Object::Name(b"Text".to_vec()),
                Object::Name(b"ImageB".to_vec()),
                Object::Name(b"ImageC".to_vec()),
            ],
        };
        if !self.font_dict.is_empty() {
            resources.set("Font", self.font_dict);
        }
        if !self.xobjects.is_empty() {
            resources.set("XObject", self.xobjects);
        }
        resources
    }
}

fn embed_truetype(doc: &mut Document, face: &FontFace) -> Result<ObjectId, RenderError> {
    let metrics = &face.metrics;
    let file = Stream::new(
        dictionary! {
            "Length1" => face.data.len() as i64,
            "Filter" => "FlateDecode",
        },
        deflate(&face.data)?,
    );
    let file_id = doc.add_object(file);

    let mut flags = 32i64;
    if face.italic {
        flags |= 64;
    }
    let font_name = Object::Name(face.face_name.as_bytes().to_vec());
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font_name.clone(),
        "Flags" => flags,
        "FontBBox" => metrics.bbox.iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
        "ItalicAngle" => metrics.italic_angle,
        "Ascent" => metrics.ascent,
        "Descent" => metrics.descent,
        "CapHeight" => metrics.cap_height,
        "StemV" => if face.bold { 120i64 } else { 80i64 },
        "FontFile2" => file_id,
    });

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => font_name,
        "FirstChar" => 32i64,
        "LastChar" => 255i64,
        "Widths" => metrics.widths.iter().map(|&w| Object::Real(w)).collect::<Vec<_>>(),
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    }))
}

/// JPEG data passes through untouched when it is gray or RGB. Everything
/// else is decoded to RGB with the alpha channel moved into a soft mask.
fn image_xobject(
    doc: &mut Document,
    label: &str,
    bytes: &[u8],
) -> Result<(Stream, u32, u32), RenderError> {
    let image_error = |source| RenderError::Image {
        name: label.to_string(),
        source,
    };
    let format = image::guess_format(bytes).map_err(image_error)?;
    let decoded = image::load_from_memory_with_format(bytes, format).map_err(image_error)?;
    let (width, height) = (decoded.width(), decoded.height());

    if format == ImageFormat::Jpeg
        && let Some(space) = jpeg_color_space(&decoded)
    {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => space,
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            bytes.to_vec(),
        );
        return Ok((stream, width, height));
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(rgba.len() / 4);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
        "Filter" => "FlateDecode",
    };
    if alpha.iter().any(|&a| a < u8::MAX) {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        );
        dict.set("SMask", doc.add_object(mask));
    }
    Ok((Stream::new(dict, deflate(&rgb)?), width, height))
}

fn jpeg_color_space(decoded: &DynamicImage) -> Option<&'static str> {
    match decoded.color() {
        ColorType::L8 => Some("DeviceGray"),
        ColorType::Rgb8 => Some("DeviceRGB"),
        _ => None,
    }
}
