use super::{Pipeline, ToolError, ToolOutcome, execute, load_source};
use crate::attachments::AttachmentSet;
use crate::config::ToolConfig;
use crate::host::Host;
use crate::input::{FileType, Operation, ToolParams};
use crate::mcp::contracts::TOOL_OFFICE_DOCUMENT;
use crate::render::{docx, pptx, xlsx};
use crate::schema::office::{parse_slides, parse_word, parse_workbook};
use serde_json::Value;

pub const FILE_TYPES: &[FileType] = &[FileType::Docx, FileType::Pptx, FileType::Xlsx];

pub const PIPELINE: Pipeline = Pipeline {
    tool_name: TOOL_OFFICE_DOCUMENT,
    allowed: FILE_TYPES,
    generating_status: "Generating document…",
    failure_prefix: "Document processing failed",
    absolute_links: true,
    render,
};

pub fn call(args: &Value, config: &ToolConfig, host: Host<'_>) -> Value {
    run(args, config, host).to_mcp_result()
}

pub fn run(args: &Value, config: &ToolConfig, host: Host<'_>) -> ToolOutcome {
    execute(&PIPELINE, args, config, host)
}

fn render(
    params: &ToolParams,
    attachments: AttachmentSet<'_>,
    config: &ToolConfig,
) -> Result<Vec<u8>, ToolError> {
    let bytes = match params.file_type {
        FileType::Docx => {
            let instructions = parse_word(&params.instructions)?;
            let images = attachments.resolve_images(&instructions.images);
            match params.operation {
                Operation::Create => docx::create(&instructions, &images)?,
                Operation::Modify => {
                    let source = load_source(params, attachments, config)?;
                    docx::modify(&source, &instructions, &images)?
                }
            }
        }
        FileType::Pptx => {
            let instructions = parse_slides(&params.instructions)?;
            let images: pptx::SlideImages = instructions
                .slides
                .iter()
                .map(|slide| attachments.resolve_images(&slide.images))
                .collect();
            match params.operation {
                Operation::Create => pptx::create(&instructions, &images)?,
                Operation::Modify => {
                    let source = load_source(params, attachments, config)?;
                    pptx::modify(&source, &instructions, &images)?
                }
            }
        }
        FileType::Xlsx => {
            let instructions = parse_workbook(&params.instructions)?;
            match params.operation {
                Operation::Create => xlsx::create(&instructions)?,
                Operation::Modify => {
                    let source = load_source(params, attachments, config)?;
                    xlsx::modify(&source, &instructions)?
                }
            }
        }
        FileType::Pdf => {
            return Err(ToolError::Validation(
                "file_type must be one of docx, pptx, xlsx".to_string(),
            ));
        }
    };
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostEvent;
    use crate::render::package::Package;
    use crate::render::image::tests::png_bytes;
    use crate::tools::OutcomeKind;
    use crate::tools::tests::{Fixture, quiet_config};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;
    use std::fs;

    fn stored_bytes(fixture: &Fixture, outcome: &ToolOutcome) -> Vec<u8> {
        let file = outcome.file.as_ref().expect("uploaded file");
        let record = fixture
            .registry
            .get(&file.id)
            .expect("registry")
            .expect("record");
        fs::read(&record.path).expect("stored file")
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let package = Package::open(bytes).expect("package");
        package.read_xml(name).expect("part")
    }

    #[test]
    fn creates_a_word_document_with_a_picture() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "docx",
            "operation": "create",
            "output_basename": "brief",
            "instructions": {
                "paragraphs": [{"text": "Hello board", "bold": true}],
                "images": [{"name": "logo.png", "width_inches": 1.5}],
            },
            "files": [{"name": "logo.png", "content": STANDARD.encode(png_bytes(20, 10))}],
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Created, "{}", outcome.message);
        let bytes = stored_bytes(&fixture, &outcome);
        let document = part(&bytes, "word/document.xml");
        assert!(document.contains("Hello board"));
        assert!(document.contains("<w:drawing>"));
        let record = fixture
            .registry
            .get(&outcome.file.as_ref().expect("file").id)
            .expect("registry")
            .expect("record");
        assert_eq!(record.meta.content_type, FileType::Docx.content_type());
        assert_eq!(record.meta.data, json!({"source": "office.document"}));
    }

    #[test]
    fn modifies_the_attached_workbook() {
        let fixture = Fixture::new();
        let original = xlsx::create(
            &parse_workbook(
                json!({"sheets": [{"name": "Data", "data": [["a", 1]]}]})
                    .as_object()
                    .expect("object"),
            )
            .expect("instructions"),
        )
        .expect("workbook");
        let args = json!({
            "file_type": "xlsx",
            "operation": "modify",
            "instructions": {"sheets": [{"name": "Summary", "data": [["total", 42]]}]},
            "files": [
                {"name": "notes.docx", "content": STANDARD.encode(b"not it")},
                {"name": "budget.xlsx", "content": STANDARD.encode(&original)},
            ],
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Modified, "{}", outcome.message);
        assert!(outcome.message.starts_with("Modified XLSX - **"));
        let workbook = part(&stored_bytes(&fixture, &outcome), "xl/workbook.xml");
        assert!(workbook.contains("name=\"Data\""));
        assert!(workbook.contains("name=\"Summary\""));
    }

    #[test]
    fn creates_a_deck_with_slides() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "pptx",
            "operation": "create",
            "instructions": {
                "title": "Roadmap",
                "slides": [{"title": "Q1", "bullets": ["Ship", "Hire"]}],
            },
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Created, "{}", outcome.message);
        let bytes = stored_bytes(&fixture, &outcome);
        let second = part(&bytes, "ppt/slides/slide2.xml");
        assert!(second.contains("Ship") && second.contains("Hire"));
    }

    #[test]
    fn modify_without_a_source_warns() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "pptx",
            "operation": "modify",
            "instructions": {"slides": [{"title": "Extra"}]},
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::MissingSource);
        assert_eq!(
            outcome.message,
            "Missing source file: MissingSourceError - No existing .pptx file found to modify. \
             Attach a file or provide a valid source_path."
        );
        let events = fixture.events.take();
        assert_eq!(
            events.last(),
            Some(&HostEvent::warning("No source file was found to modify."))
        );
    }

    #[test]
    fn server_paths_are_refused_by_default() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "docx",
            "operation": "modify",
            "source_path": "/srv/report.docx",
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::PermissionDenied);
        assert!(outcome.message.starts_with("Permission error: PermissionError - Server path access is disabled."));
    }

    #[test]
    fn invalid_instructions_are_reported_with_paths() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "docx",
            "operation": "create",
            "instructions": {"paragraphs": [{"text": "ok"}, {"bold": true, "font_size_pt": 200}]},
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::InvalidInput);
        assert!(outcome.message.contains("paragraphs[1].text"), "{}", outcome.message);
        assert!(outcome.message.contains("paragraphs[1].font_size_pt"), "{}", outcome.message);
        assert!(fixture.registry.records().expect("records").is_empty());
    }
}
