use crate::mcp::errors;
use chrono::Local;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Docx,
    Pptx,
    Xlsx,
    Pdf,
}

impl FileType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" => Some(FileType::Docx),
            "pptx" => Some(FileType::Pptx),
            "xlsx" => Some(FileType::Xlsx),
            "pdf" => Some(FileType::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Docx => "docx",
            FileType::Pptx => "pptx",
            FileType::Xlsx => "xlsx",
            FileType::Pdf => "pdf",
        }
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Docx => ".docx",
            FileType::Pptx => ".pptx",
            FileType::Xlsx => ".xlsx",
            FileType::Pdf => ".pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            FileType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FileType::Pdf => "application/pdf",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Modify,
}

impl Operation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Some(Operation::Create),
            "modify" => Some(Operation::Modify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Modify => "modify",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Operation::Create => "Created",
            Operation::Modify => "Modified",
        }
    }
}

/// Arguments shared by both document tools, before the instruction payload
/// is validated against its kind-specific schema.
#[derive(Debug, Clone)]
pub struct ToolParams {
    pub file_type: FileType,
    pub operation: Operation,
    pub instructions: Map<String, Value>,
    pub source_filename_hint: Option<String>,
    pub source_path: Option<String>,
    pub output_basename: Option<String>,
    pub files: Vec<Value>,
    pub user: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct InputError {
    pub kind: &'static str,
    pub message: String,
}

impl InputError {
    fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: errors::INVALID_INPUT,
            message: message.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for InputError {}

pub fn parse_params(args: &Value, allowed: &[FileType]) -> Result<ToolParams, InputError> {
    let obj = args
        .as_object()
        .ok_or_else(|| InputError::invalid_input("arguments must be an object"))?;

    let file_type = obj
        .get("file_type")
        .and_then(Value::as_str)
        .ok_or_else(|| InputError::invalid_input("file_type is required"))?;
    let file_type = FileType::parse(file_type)
        .filter(|kind| allowed.contains(kind))
        .ok_or_else(|| {
            let names: Vec<&str> = allowed.iter().map(FileType::as_str).collect();
            InputError::invalid_input(format!("file_type must be one of {}", names.join(", ")))
        })?;

    let operation = obj
        .get("operation")
        .and_then(Value::as_str)
        .ok_or_else(|| InputError::invalid_input("operation is required"))?;
    let operation = Operation::parse(operation)
        .ok_or_else(|| InputError::invalid_input("operation must be create or modify"))?;

    // The free-form mapping wins when both are supplied.
    let instructions = match pick_instructions(obj)? {
        Some(map) => map,
        None => Map::new(),
    };

    let files = match obj.get("files") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(InputError::invalid_input("files must be an array")),
    };

    Ok(ToolParams {
        file_type,
        operation,
        instructions,
        source_filename_hint: optional_string(obj, "source_filename_hint")?,
        source_path: optional_string(obj, "source_path")?,
        output_basename: optional_string(obj, "output_basename")?
            .and_then(|value| sanitize_basename(&value)),
        files,
        user: obj.get("user").filter(|value| !value.is_null()).cloned(),
    })
}

fn pick_instructions(obj: &Map<String, Value>) -> Result<Option<Map<String, Value>>, InputError> {
    for key in ["raw_instructions", "instructions"] {
        match obj.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::Object(map)) if map.is_empty() => continue,
            Some(Value::Object(map)) => return Ok(Some(map.clone())),
            // Some hosts pass the payload as a JSON string.
            Some(Value::String(text)) if !text.trim().is_empty() => {
                return match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(map)) => Ok(Some(map)),
                    _ => Err(InputError::invalid_input(format!(
                        "{key} must be an object"
                    ))),
                };
            }
            Some(Value::String(_)) => continue,
            Some(_) => {
                return Err(InputError::invalid_input(format!(
                    "{key} must be an object"
                )));
            }
        }
    }
    Ok(None)
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, InputError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(InputError::invalid_input(format!("{key} must be a string"))),
    }
}

/// Keeps alphanumerics, `-`, `_` and spaces. `None` when nothing usable is left.
pub fn sanitize_basename(value: &str) -> Option<String> {
    let safe: String = value
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | ' '))
        .collect();
    let trimmed = safe.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn choose_output_name(file_type: FileType, basename: Option<&str>) -> String {
    let root = match basename {
        Some(base) => base.to_string(),
        None => format!("document_{}", Local::now().format("%Y%m%d_%H%M%S")),
    };
    format!("{root}{}", file_type.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OFFICE: &[FileType] = &[FileType::Docx, FileType::Pptx, FileType::Xlsx];

    #[test]
    fn parses_minimal_arguments() {
        let args = json!({"file_type": "docx", "operation": "create"});
        let params = parse_params(&args, OFFICE).expect("params");
        assert_eq!(params.file_type, FileType::Docx);
        assert_eq!(params.operation, Operation::Create);
        assert!(params.instructions.is_empty());
        assert!(params.files.is_empty());
    }

    #[test]
    fn rejects_file_type_outside_tool() {
        let args = json!({"file_type": "pdf", "operation": "create"});
        let err = parse_params(&args, OFFICE).expect_err("error");
        assert_eq!(err.kind, errors::INVALID_INPUT);
        assert!(err.message.contains("docx, pptx, xlsx"));
    }

    #[test]
    fn rejects_unknown_operation() {
        let args = json!({"file_type": "xlsx", "operation": "delete"});
        let err = parse_params(&args, OFFICE).expect_err("error");
        assert!(err.message.contains("operation"));
    }

    #[test]
    fn raw_instructions_take_priority() {
        let args = json!({
            "file_type": "docx",
            "operation": "create",
            "instructions": {"header_text": "structured"},
            "raw_instructions": {"header_text": "raw"}
        });
        let params = parse_params(&args, OFFICE).expect("params");
        assert_eq!(params.instructions.get("header_text"), Some(&json!("raw")));
    }

    #[test]
    fn empty_raw_instructions_fall_back() {
        let args = json!({
            "file_type": "docx",
            "operation": "create",
            "instructions": {"header_text": "structured"},
            "raw_instructions": {}
        });
        let params = parse_params(&args, OFFICE).expect("params");
        assert_eq!(
            params.instructions.get("header_text"),
            Some(&json!("structured"))
        );
    }

    #[test]
    fn instructions_as_json_string() {
        let args = json!({
            "file_type": "pptx",
            "operation": "create",
            "instructions": "{\"title\": \"Deck\"}"
        });
        let params = parse_params(&args, OFFICE).expect("params");
        assert_eq!(params.instructions.get("title"), Some(&json!("Deck")));
    }

    #[test]
    fn sanitizes_basename() {
        assert_eq!(
            sanitize_basename(" Q3 report/../final!.docx "),
            Some("Q3 reportfinaldocx".to_string())
        );
        assert_eq!(sanitize_basename("../"), None);
        assert_eq!(sanitize_basename("   "), None);
    }

    #[test]
    fn output_name_uses_extension() {
        assert_eq!(
            choose_output_name(FileType::Xlsx, Some("budget")),
            "budget.xlsx"
        );
        let stamped = choose_output_name(FileType::Pdf, None);
        assert!(stamped.starts_with("document_"));
        assert!(stamped.ends_with(".pdf"));
        // document_YYYYmmdd_HHMMSS.pdf
        assert_eq!(stamped.len(), "document_".len() + 15 + ".pdf".len());
    }
}
