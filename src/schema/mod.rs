//! Hand-written validation of the free-form instruction payloads.
//!
//! Every check records a [`FieldError`] and keeps going so that a caller sees
//! all offending fields at once. Unknown keys are ignored.

use serde_json::{Map, Value};
use std::fmt;

pub mod cells;
pub mod office;
pub mod pdf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{count} validation {noun}")?;
        for error in &self.errors {
            if error.path.is_empty() {
                write!(f, "; {}", error.message)?;
            } else {
                write!(f, "; {}: {}", error.path, error.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

pub fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

pub fn item_path(parent: &str, key: &str, index: usize) -> String {
    format!("{}[{index}]", field_path(parent, key))
}

/// Accumulates field errors while typed values are pulled out of a payload.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }

    pub fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.push(path, "must be an object");
                None
            }
        }
    }

    pub fn opt_object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> Option<&'a Map<String, Value>> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => self.object(value, &field_path(parent, key)),
        }
    }

    pub fn opt_str(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => {
                self.push(field_path(parent, key), "must be a string");
                None
            }
        }
    }

    pub fn req_str(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> String {
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.push(field_path(parent, key), "field required");
                String::new()
            }
            Some(Value::String(text)) => text.clone(),
            Some(_) => {
                self.push(field_path(parent, key), "must be a string");
                String::new()
            }
        }
    }

    pub fn bool_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        default: bool,
    ) -> bool {
        match obj.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => match coerce_bool(value) {
                Some(flag) => flag,
                None => {
                    self.push(field_path(parent, key), "must be a boolean");
                    default
                }
            },
        }
    }

    pub fn opt_f64_in(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        min: f64,
        max: f64,
    ) -> Option<f64> {
        let value = match obj.get(key) {
            None | Some(Value::Null) => return None,
            Some(value) => value,
        };
        let path = field_path(parent, key);
        let Some(number) = coerce_f64(value) else {
            self.push(path, "must be a number");
            return None;
        };
        if number < min || number > max {
            self.push(path, format!("must be between {min} and {max}"));
            return None;
        }
        Some(number)
    }

    pub fn f64_in_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        min: f64,
        max: f64,
        default: f64,
    ) -> f64 {
        self.opt_f64_in(obj, key, parent, min, max)
            .unwrap_or(default)
    }

    /// Missing or null arrays read as empty.
    pub fn array<'a>(&mut self, obj: &'a Map<String, Value>, key: &str, parent: &str) -> &'a [Value] {
        match obj.get(key) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                self.push(field_path(parent, key), "must be an array");
                &[]
            }
        }
    }

    pub fn string_list(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Vec<String> {
        let items = self.array(obj, key, parent);
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(text) => out.push(text.clone()),
                _ => self.push(item_path(parent, key, index), "must be a string"),
            }
        }
        out
    }

    pub fn opt_enum(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        choices: &[&str],
    ) -> Option<String> {
        let value = self.opt_str(obj, key, parent)?;
        if choices.contains(&value.as_str()) {
            Some(value)
        } else {
            self.push(
                field_path(parent, key),
                format!("must be one of {}", choices.join(", ")),
            );
            None
        }
    }

    /// `RRGGBB` with an optional leading `#`, returned upper-cased without it.
    pub fn opt_color(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<String> {
        let value = self.opt_str(obj, key, parent)?;
        match normalize_hex_color(&value) {
            Some(color) => Some(color),
            None => {
                self.push(field_path(parent, key), "must be a hex colour like 1F4E79");
                None
            }
        }
    }
}

pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn normalize_hex_color(value: &str) -> Option<String> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        Some(hex.to_ascii_uppercase())
    } else {
        None
    }
}

/// Image reference shared by every document kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    pub name: Option<String>,
    pub b64: Option<String>,
    pub width_inches: f64,
}

pub const IMAGE_WIDTH_RANGE: (f64, f64) = (0.1, 20.0);
pub const FONT_SIZE_RANGE: (f64, f64) = (6.0, 96.0);

pub fn parse_images(
    checker: &mut Checker,
    obj: &Map<String, Value>,
    parent: &str,
    default_width: f64,
) -> Vec<ImageSpec> {
    let mut images = Vec::new();
    for (index, item) in checker.array(obj, "images", parent).iter().enumerate() {
        let path = item_path(parent, "images", index);
        let Some(map) = checker.object(item, &path) else {
            continue;
        };
        images.push(ImageSpec {
            name: checker.opt_str(map, "name", &path),
            b64: checker.opt_str(map, "b64", &path),
            width_inches: checker.f64_in_or(
                map,
                "width_inches",
                &path,
                IMAGE_WIDTH_RANGE.0,
                IMAGE_WIDTH_RANGE.1,
                default_width,
            ),
        });
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_every_error() {
        let payload = json!({"a": 5, "b": "x", "c": 200});
        let obj = payload.as_object().expect("object");
        let mut checker = Checker::new();
        checker.opt_str(obj, "a", "");
        checker.bool_or(obj, "b", "", false);
        checker.opt_f64_in(obj, "c", "root", 6.0, 96.0);
        let err = checker.finish(()).expect_err("errors");
        assert_eq!(err.errors.len(), 3);
        assert_eq!(err.errors[2].path, "root.c");
        assert!(err.to_string().starts_with("3 validation errors"));
    }

    #[test]
    fn bounds_are_inclusive_and_not_clamped() {
        let payload = json!({"lo": 6, "hi": 96, "over": 96.5, "text": "12"});
        let obj = payload.as_object().expect("object");
        let mut checker = Checker::new();
        assert_eq!(checker.opt_f64_in(obj, "lo", "", 6.0, 96.0), Some(6.0));
        assert_eq!(checker.opt_f64_in(obj, "hi", "", 6.0, 96.0), Some(96.0));
        assert_eq!(checker.opt_f64_in(obj, "text", "", 6.0, 96.0), Some(12.0));
        assert_eq!(checker.opt_f64_in(obj, "over", "", 6.0, 96.0), None);
        let err = checker.finish(()).expect_err("errors");
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, "over");
    }

    #[test]
    fn image_width_defaults_and_bounds() {
        let payload = json!({"images": [{"name": "a.png"}, {"name": "b.png", "width_inches": 0.05}]});
        let obj = payload.as_object().expect("object");
        let mut checker = Checker::new();
        let images = parse_images(&mut checker, obj, "", 2.0);
        assert_eq!(images[0].width_inches, 2.0);
        let err = checker.finish(()).expect_err("errors");
        assert_eq!(err.errors[0].path, "images[1].width_inches");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(normalize_hex_color("#1f4e79"), Some("1F4E79".to_string()));
        assert_eq!(normalize_hex_color("blue"), None);
    }
}
