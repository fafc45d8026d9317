//! Resolves attachment references against the files supplied with a request.

use crate::schema::ImageSpec;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment carries no payload")]
    NoPayload,
    #[error("attachment payload is empty")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("server path access is disabled")]
    ServerPathDisabled,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only view over the attachment records of one request.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentSet<'a> {
    records: &'a [Value],
    allow_server_paths: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    /// Name used in log and error messages.
    pub label: String,
    pub width_inches: f64,
    pub bytes: Option<Vec<u8>>,
}

impl<'a> AttachmentSet<'a> {
    pub fn new(records: &'a [Value], allow_server_paths: bool) -> Self {
        Self {
            records,
            allow_server_paths,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Named records in list order.
    pub fn named(self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.records
            .iter()
            .filter_map(|record| record_name(record).map(|name| (name, record)))
    }

    /// `content`, then `b64`, then `path` when server paths are enabled.
    pub fn payload(&self, record: &Value) -> Result<Vec<u8>, AttachmentError> {
        match inline_payload(record) {
            Err(AttachmentError::NoPayload) => {}
            other => return other,
        }
        let Some(path) = record.get("path").and_then(Value::as_str) else {
            return Err(AttachmentError::NoPayload);
        };
        if !self.allow_server_paths {
            return Err(AttachmentError::ServerPathDisabled);
        }
        read_file(Path::new(path))
    }

    /// Picks the document to modify. A hint matching a name exactly
    /// (ignoring case) wins; otherwise the first name with the extension.
    pub fn find_source(&self, extension: &str, hint: Option<&str>) -> Option<(String, Vec<u8>)> {
        let extension = extension.to_ascii_lowercase();
        if let Some(hint) = hint.map(str::trim).filter(|hint| !hint.is_empty()) {
            let hint = hint.to_lowercase();
            for (name, record) in self.named() {
                let lower = name.to_lowercase();
                if lower == hint && lower.ends_with(&extension) {
                    if let Some(bytes) = self.usable_payload(name, record) {
                        return Some((name.to_string(), bytes));
                    }
                }
            }
        }
        for (name, record) in self.named() {
            if name.to_lowercase().ends_with(&extension) {
                if let Some(bytes) = self.usable_payload(name, record) {
                    return Some((name.to_string(), bytes));
                }
            }
        }
        None
    }

    fn usable_payload(&self, name: &str, record: &Value) -> Option<Vec<u8>> {
        match self.payload(record) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("skipping attachment {name:?}: {err}");
                None
            }
        }
    }

    /// Inline `b64` wins; otherwise the name is matched exactly, then
    /// ignoring case. Unresolved references keep `bytes: None`.
    pub fn resolve_images(&self, images: &[ImageSpec]) -> Vec<ResolvedImage> {
        images
            .iter()
            .map(|image| {
                let label = image
                    .name
                    .clone()
                    .unwrap_or_else(|| "inline image".to_string());
                let bytes = match &image.b64 {
                    Some(encoded) => match decode_base64(encoded) {
                        Ok(bytes) => Some(bytes),
                        Err(err) => {
                            warn!("image {label:?} has an undecodable payload: {err}");
                            None
                        }
                    },
                    None => image.name.as_deref().and_then(|name| self.image_by_name(name)),
                };
                ResolvedImage {
                    label,
                    width_inches: image.width_inches,
                    bytes,
                }
            })
            .collect()
    }

    fn image_by_name(&self, wanted: &str) -> Option<Vec<u8>> {
        let exact = self.named().find(|(name, _)| *name == wanted);
        let found = exact.or_else(|| {
            let lower = wanted.to_lowercase();
            self.named().find(|(name, _)| name.to_lowercase() == lower)
        });
        let (name, record) = found?;
        debug!("resolved image {wanted:?} to attachment {name:?}");
        self.usable_payload(name, record)
    }
}

pub fn record_name(record: &Value) -> Option<&str> {
    ["name", "filename"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
}

/// Only `content` and `b64`, never the filesystem.
pub fn inline_payload(record: &Value) -> Result<Vec<u8>, AttachmentError> {
    let encoded = record
        .get("content")
        .and_then(Value::as_str)
        .or_else(|| record.get("b64").and_then(Value::as_str))
        .ok_or(AttachmentError::NoPayload)?;
    let bytes = decode_base64(encoded)?;
    if bytes.is_empty() {
        return Err(AttachmentError::Empty);
    }
    Ok(bytes)
}

/// Tolerates a `data:*;base64,` prefix, embedded whitespace and missing padding.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.trim_start().starts_with("data:") => rest,
        _ => encoded,
    };
    let compact: String = body.chars().filter(|ch| !ch.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .or_else(|err| STANDARD_NO_PAD.decode(compact.as_bytes()).map_err(|_| err))
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, AttachmentError> {
    let bytes = fs::read(path).map_err(|source| AttachmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(AttachmentError::Empty);
    }
    Ok(bytes)
}
