use serde_json::json;

pub const TOOL_OFFICE_DOCUMENT: &str = "office.document";
pub const TOOL_PDF_DOCUMENT: &str = "pdf.document";

pub const MAX_FONT_BYTES: usize = 25 * 1024 * 1024;

fn image_schema(default_width: f64) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "File name of an attached image." },
            "b64": { "type": "string", "description": "Base64-encoded image bytes." },
            "width_inches": {
                "type": "number",
                "minimum": 0.1,
                "maximum": 20.0,
                "default": default_width
            }
        }
    })
}

fn attachment_schema() -> serde_json::Value {
    json!({
        "type": "array",
        "description": "Files attached to the chat message.",
        "items": {
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "filename": { "type": "string" },
                "content": { "type": "string", "description": "Base64 payload." },
                "b64": { "type": "string", "description": "Base64 payload." },
                "path": { "type": "string", "description": "Server path, honoured only when enabled." }
            }
        }
    })
}

fn user_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { "id": { "type": "string" } },
        "required": ["id"]
    })
}

fn office_paragraph_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string" },
            "bold": { "type": "boolean" },
            "italic": { "type": "boolean" },
            "underline": { "type": "boolean" },
            "font_name": { "type": "string" },
            "font_size_pt": { "type": "number", "minimum": 6.0, "maximum": 96.0 },
            "style": { "type": "string", "description": "Paragraph style name, e.g. 'Heading 1'." },
            "color": { "type": "string", "description": "Hex colour RRGGBB." }
        },
        "required": ["text"]
    })
}

pub fn office_document_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "file_type": { "type": "string", "enum": ["docx", "pptx", "xlsx"] },
            "operation": { "type": "string", "enum": ["create", "modify"] },
            "instructions": {
                "type": "object",
                "description": "Word: paragraphs, tables, images, header_text, footer_text, find_replace, default_style. PowerPoint: title, slides[{title, bullets, images, chart}]. Excel: sheets[{name, data, formulas, number_formats, column_widths, conditional_formatting}], chart.",
                "properties": {
                    "paragraphs": { "type": "array", "items": office_paragraph_schema() },
                    "tables": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "rows": { "type": "array", "minItems": 1, "items": { "type": "array" } },
                                "style": { "type": "string", "default": "Light List" }
                            },
                            "required": ["rows"]
                        }
                    },
                    "images": { "type": "array", "items": image_schema(2.0) },
                    "header_text": { "type": "string" },
                    "footer_text": { "type": "string" },
                    "find_replace": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "find": { "type": "string" },
                                "replace": { "type": "string" }
                            },
                            "required": ["find", "replace"]
                        }
                    },
                    "default_style": { "type": "string" },
                    "title": { "type": "string" },
                    "slides": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "bullets": { "type": "array", "items": { "type": "string" } },
                                "images": { "type": "array", "items": image_schema(2.0) },
                                "chart": {
                                    "type": "object",
                                    "properties": {
                                        "type": { "type": "string", "enum": ["bar"] },
                                        "categories": { "type": "array", "items": { "type": "string" } },
                                        "series": {
                                            "type": "array",
                                            "items": {
                                                "type": "object",
                                                "properties": {
                                                    "name": { "type": "string" },
                                                    "values": { "type": "array", "items": { "type": "number" } }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "sheets": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "data": { "type": "array", "items": { "type": "array" } },
                                "formulas": { "type": "object", "additionalProperties": { "type": "string" } },
                                "number_formats": { "type": "object", "additionalProperties": { "type": "string" } },
                                "column_widths": { "type": "object", "additionalProperties": { "type": "number" } },
                                "conditional_formatting": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "type": { "type": "string", "enum": ["cellIs", "colorScale"] },
                                            "range": { "type": "string" }
                                        }
                                    }
                                }
                            },
                            "required": ["name"]
                        }
                    },
                    "chart": {
                        "type": "object",
                        "properties": {
                            "type": { "type": "string", "enum": ["bar"] },
                            "data_range": { "type": "string" }
                        }
                    }
                }
            },
            "raw_instructions": { "type": "object" },
            "source_filename_hint": { "type": "string" },
            "source_path": { "type": "string" },
            "output_basename": { "type": "string" },
            "files": attachment_schema(),
            "user": user_schema()
        },
        "required": ["file_type", "operation"]
    })
}

pub fn pdf_document_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "file_type": { "type": "string", "enum": ["pdf"] },
            "operation": { "type": "string", "enum": ["create", "modify"] },
            "instructions": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "author": { "type": "string" },
                    "subject": { "type": "string" },
                    "page_size": { "type": "string", "enum": ["LETTER", "A4"] },
                    "margins_inches": {
                        "type": "object",
                        "properties": {
                            "left": { "type": "number", "minimum": 0.0, "maximum": 3.0 },
                            "right": { "type": "number", "minimum": 0.0, "maximum": 3.0 },
                            "top": { "type": "number", "minimum": 0.0, "maximum": 3.0 },
                            "bottom": { "type": "number", "minimum": 0.0, "maximum": 3.0 }
                        }
                    },
                    "header_text": { "type": "string" },
                    "footer_text": { "type": "string" },
                    "show_page_numbers": { "type": "boolean", "default": true },
                    "paragraphs": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string", "description": "Paragraph text. Basic <b>, <i>, <u> supported." },
                                "bold": { "type": "boolean" },
                                "italic": { "type": "boolean" },
                                "underline": { "type": "boolean" },
                                "font_name": {
                                    "type": "string",
                                    "description": "Built-in faces (Helvetica, Times-Roman, Courier and variants) or Inter, Roboto, SourceSans3, OpenSans, NotoSans, Lato, IBMPlexSans, Montserrat when their TTF files are attached."
                                },
                                "font_size_pt": { "type": "number", "minimum": 6.0, "maximum": 96.0 },
                                "leading_pt": { "type": "number", "minimum": 6.0, "maximum": 120.0 },
                                "align": { "type": "string", "enum": ["left", "center", "right", "justify"] },
                                "color": { "type": "string" }
                            },
                            "required": ["text"]
                        }
                    },
                    "tables": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "rows": { "type": "array", "minItems": 1, "items": { "type": "array" } },
                                "header": { "type": "boolean" },
                                "col_widths_inches": { "type": "array", "items": { "type": "number" } },
                                "style_grid": { "type": "boolean", "default": true }
                            },
                            "required": ["rows"]
                        }
                    },
                    "images": { "type": "array", "items": image_schema(3.0) }
                }
            },
            "raw_instructions": { "type": "object" },
            "source_filename_hint": { "type": "string" },
            "source_path": { "type": "string" },
            "output_basename": { "type": "string" },
            "files": attachment_schema(),
            "user": user_schema()
        },
        "required": ["file_type", "operation"]
    })
}
