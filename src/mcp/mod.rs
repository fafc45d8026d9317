use serde_json::json;

pub mod contracts;
pub mod errors;

pub fn tool_definitions() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": contracts::TOOL_OFFICE_DOCUMENT,
            "description": "Create or modify Office documents (.docx, .pptx, .xlsx) and attach them to the chat.",
            "inputSchema": contracts::office_document_schema()
        }),
        json!({
            "name": contracts::TOOL_PDF_DOCUMENT,
            "description": "Create or modify PDF documents and attach them to the chat. Modify appends new pages.",
            "inputSchema": contracts::pdf_document_schema()
        }),
    ]
}
