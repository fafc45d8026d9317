use super::{Pipeline, ToolError, ToolOutcome, execute, load_source};
use crate::attachments::AttachmentSet;
use crate::config::ToolConfig;
use crate::fonts;
use crate::host::Host;
use crate::input::{FileType, Operation, ToolParams};
use crate::mcp::contracts::TOOL_PDF_DOCUMENT;
use crate::render::pdf;
use crate::schema::pdf::parse_pdf;
use log::debug;
use serde_json::Value;

pub const FILE_TYPES: &[FileType] = &[FileType::Pdf];

pub const PIPELINE: Pipeline = Pipeline {
    tool_name: TOOL_PDF_DOCUMENT,
    allowed: FILE_TYPES,
    generating_status: "Generating PDF…",
    failure_prefix: "PDF processing failed",
    absolute_links: false,
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
    if !attachments.is_empty() {
        let added = fonts::write_global().register_from_attachments(attachments);
        debug!("{} font name(s) added from attachments", added.len());
    }

    let instructions = parse_pdf(&params.instructions)?;
    let images = attachments.resolve_images(&instructions.images);

    let registry = fonts::read_global();
    let bytes = match params.operation {
        Operation::Create => pdf::create(&instructions, &images, &registry)?,
        Operation::Modify => {
            let source = load_source(params, attachments, config)?;
            pdf::modify(&source, &instructions, &images, &registry)?
        }
    };
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostEvent;
    use crate::render::image::tests::png_bytes;
    use crate::tools::OutcomeKind;
    use crate::tools::tests::{Fixture, quiet_config};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use lopdf::Document;
    use serde_json::json;
    use std::fs;

    fn stored(fixture: &Fixture, outcome: &ToolOutcome) -> Document {
        let file = outcome.file.as_ref().expect("uploaded file");
        let record = fixture
            .registry
            .get(&file.id)
            .expect("registry")
            .expect("record");
        Document::load_mem(&fs::read(&record.path).expect("stored")).expect("pdf")
    }

    #[test]
    fn creates_a_pdf_with_a_relative_link() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "pdf",
            "operation": "create",
            "output_basename": "memo",
            "instructions": {
                "title": "Memo",
                "paragraphs": [{"text": "Hello <b>team</b>"}],
            },
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Created, "{}", outcome.message);
        let file = outcome.file.clone().expect("file");
        assert_eq!(file.url, format!("/api/v1/files/{}/content", file.id));
        assert_eq!(
            outcome.message,
            format!("Created PDF - **memo.pdf** is ready: [memo.pdf]({})", file.url)
        );
        let doc = stored(&fixture, &outcome);
        let text = doc.extract_text(&[1]).expect("text");
        assert!(text.contains("Hello") && text.contains("team"), "{text:?}");
        let events = fixture.events.take();
        assert_eq!(events[0], HostEvent::status("Generating PDF…", false));
    }

    #[test]
    fn modify_appends_to_the_attached_pdf() {
        let fixture = Fixture::new();
        let registry = fonts::FontRegistry::new();
        let source = pdf::create(
            &parse_pdf(
                json!({"paragraphs": [{"text": "First"}]})
                    .as_object()
                    .expect("object"),
            )
            .expect("instructions"),
            &[],
            &registry,
        )
        .expect("source");
        let args = json!({
            "file_type": "pdf",
            "operation": "modify",
            "source_filename_hint": "Report.PDF",
            "instructions": {"paragraphs": [{"text": "Second"}]},
            "files": [
                {"name": "other.pdf", "content": STANDARD.encode(b"%PDF-garbage")},
                {"name": "report.pdf", "content": STANDARD.encode(&source)},
            ],
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Modified, "{}", outcome.message);
        let doc = stored(&fixture, &outcome);
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn unresolved_images_fail_the_render() {
        let fixture = Fixture::new();
        let args = json!({
            "file_type": "pdf",
            "operation": "create",
            "instructions": {"images": [{"name": "missing.png"}]},
            "files": [{"name": "present.png", "content": STANDARD.encode(png_bytes(4, 4))}],
            "user": {"id": "u1"},
        });
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert!(
            outcome.message.starts_with("PDF processing failed: RenderError - "),
            "{}",
            outcome.message
        );
        assert!(outcome.message.contains("missing.png"));
        assert!(fixture.registry.records().expect("records").is_empty());
    }

    #[test]
    fn office_types_are_rejected() {
        let fixture = Fixture::new();
        let args = json!({"file_type": "docx", "operation": "create", "user": {"id": "u1"}});
        let outcome = run(&args, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::InvalidInput);
        assert!(outcome.message.contains("file_type must be one of pdf"));
    }
}
