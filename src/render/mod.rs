//! Document renderers. Each one turns validated instructions into the bytes
//! of a finished file, either from scratch or on top of an existing one.

use thiserror::Error;

pub mod chart;
pub mod docx;
pub mod image;
pub mod package;
pub mod pdf;
pub mod pptx;
pub mod xlsx;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("image {name:?} could not be decoded: {source}")]
    Image {
        name: String,
        #[source]
        source: ::image::ImageError,
    },
    #[error("image {0:?} has no data; attach the file or pass b64")]
    MissingImage(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl RenderError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RenderError::InvalidDocument(message.into())
    }
}

pub const EMU_PER_INCH: f64 = 914_400.0;

pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}
