use super::RenderError;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl ImageInfo {
    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            _ => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            _ => "image/png",
        }
    }

    /// Height for a display width, keeping the aspect ratio.
    pub fn scaled_height(&self, width: f64) -> f64 {
        if self.width == 0 {
            return width;
        }
        width * f64::from(self.height) / f64::from(self.width)
    }
}

/// Reads format and pixel size without decoding the whole image.
pub fn probe(name: &str, bytes: &[u8]) -> Result<ImageInfo, RenderError> {
    let image_error = |source| RenderError::Image {
        name: name.to_string(),
        source,
    };
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = match reader.format() {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif)) => format,
        Some(other) => {
            return Err(RenderError::invalid(format!(
                "image {name:?} is {other:?}; use PNG, JPEG or GIF"
            )));
        }
        None => {
            return Err(RenderError::invalid(format!(
                "image {name:?} is not a recognised image format"
            )));
        }
    };
    let (width, height) = reader.into_dimensions().map_err(image_error)?;
    Ok(ImageInfo {
        width,
        height,
        format,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, _| Rgba([(x * 10) as u8, 40, 90, 200]));
        let mut out = Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |_, y| Rgb([120, (y * 5) as u8, 30]));
        let mut out = Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Jpeg)
            .expect("encode jpeg");
        out.into_inner()
    }

    #[test]
    fn probes_png_and_jpeg() {
        let png = probe("a.png", &png_bytes(40, 20)).expect("png");
        assert_eq!((png.width, png.height), (40, 20));
        assert_eq!(png.extension(), "png");
        assert_eq!(png.scaled_height(2.0), 1.0);

        let jpeg = probe("b.jpg", &jpeg_bytes(10, 30)).expect("jpeg");
        assert_eq!(jpeg.content_type(), "image/jpeg");
    }

    #[test]
    fn rejects_garbage() {
        assert!(probe("c.png", b"not an image").is_err());
    }
}
