use crate::attachments::{AttachmentError, AttachmentSet, read_file};
use crate::config::ToolConfig;
use crate::host::{Host, HostEvent};
use crate::input::{self, FileType, InputError, Operation, ToolParams};
use crate::mcp::errors;
use crate::render::RenderError;
use crate::schema::ValidationError;
use crate::upload::{self, UploadError, UploadRequest};
use log::{debug, error, warn};
use serde_json::{Value, json};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::thread;
use std::time::Duration;
use thiserror::Error;

pub mod office_document;
pub mod pdf_document;

const UPLOADING_STATUS: &str = "Uploading attachment…";
const DONE_STATUS: &str = "Done";
const SERVER_PATHS_DISABLED: &str =
    "Server path access is disabled. Attach the file to the chat or enable allow_server_paths.";
const NO_SOURCE_NOTICE: &str = "No source file was found to modify.";

pub fn error_result(
    kind: &'static str,
    message: impl Into<String>,
    source: Option<&str>,
) -> serde_json::Value {
    let message = message.into();
    let mut error = json!({
        "kind": kind,
        "message": message,
    });

    if let Some(source) = source
        && let Some(obj) = error.as_object_mut()
    {
        obj.insert("source".to_string(), json!(source));
    }

    json!({
        "content": [{"type": "text", "text": format!("Error: {message}")}],
        "structuredContent": {"error": error},
        "isError": true
    })
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    MissingSource(String),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("renderer panicked: {0}")]
    Panic(String),
}

impl From<ValidationError> for ToolError {
    fn from(err: ValidationError) -> Self {
        ToolError::Validation(err.to_string())
    }
}

impl From<InputError> for ToolError {
    fn from(err: InputError) -> Self {
        ToolError::Validation(err.message)
    }
}

impl ToolError {
    /// Short type name shown in the returned summary.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "ValidationError",
            ToolError::Permission(_) => "PermissionError",
            ToolError::MissingSource(_) => "MissingSourceError",
            ToolError::Attachment(_) => "AttachmentError",
            ToolError::Render(_) => "RenderError",
            ToolError::Upload(_) => "UploadError",
            ToolError::Panic(_) => "Panic",
        }
    }

    pub fn outcome(&self) -> OutcomeKind {
        match self {
            ToolError::Validation(_) => OutcomeKind::InvalidInput,
            ToolError::Permission(_) => OutcomeKind::PermissionDenied,
            ToolError::MissingSource(_) => OutcomeKind::MissingSource,
            _ => OutcomeKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Created,
    Modified,
    InvalidInput,
    PermissionDenied,
    MissingSource,
    Failed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "created",
            OutcomeKind::Modified => "modified",
            OutcomeKind::InvalidInput => "invalid_input",
            OutcomeKind::PermissionDenied => "permission_denied",
            OutcomeKind::MissingSource => "missing_source",
            OutcomeKind::Failed => "failed",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, OutcomeKind::Created | OutcomeKind::Modified)
    }

    fn error_kind(&self) -> &'static str {
        match self {
            OutcomeKind::InvalidInput => errors::INVALID_INPUT,
            OutcomeKind::PermissionDenied => errors::PERMISSION_DENIED,
            OutcomeKind::MissingSource => errors::MISSING_SOURCE,
            _ => errors::INTERNAL_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// What one tool call produced: the summary string shown to the model and,
/// on success, the uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    pub file: Option<UploadedFile>,
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }

    pub fn to_mcp_result(&self) -> Value {
        let mut structured = json!({ "outcome": self.kind.as_str() });
        if let Some(obj) = structured.as_object_mut() {
            match &self.file {
                Some(file) => {
                    obj.insert("file_id".to_string(), json!(file.id));
                    obj.insert("name".to_string(), json!(file.name));
                    obj.insert("url".to_string(), json!(file.url));
                    obj.insert("size".to_string(), json!(file.size));
                }
                None if self.is_error() => {
                    obj.insert(
                        "error".to_string(),
                        json!({"kind": self.kind.error_kind(), "message": self.message}),
                    );
                }
                None => {}
            }
        }
        json!({
            "content": [{"type": "text", "text": self.message}],
            "structuredContent": structured,
            "isError": self.is_error()
        })
    }
}

/// The parts of a document tool that differ between Office and PDF.
pub struct Pipeline {
    pub tool_name: &'static str,
    pub allowed: &'static [FileType],
    pub generating_status: &'static str,
    pub failure_prefix: &'static str,
    /// Link the summary through `ToolConfig::base_url` instead of relatively.
    pub absolute_links: bool,
    pub render: fn(&ToolParams, AttachmentSet<'_>, &ToolConfig) -> Result<Vec<u8>, ToolError>,
}

/// Runs one call end to end: progress, render, upload, events. Every
/// failure is turned into a notification and a summary string.
pub fn execute(pipeline: &Pipeline, args: &Value, config: &ToolConfig, host: Host<'_>) -> ToolOutcome {
    if config.show_progress {
        host.emit(HostEvent::status(pipeline.generating_status, false));
    }
    if config.min_progress_delay_ms > 0 {
        thread::sleep(Duration::from_millis(config.min_progress_delay_ms));
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        produce(pipeline, args, config, host)
    }))
    .unwrap_or_else(|payload| Err(ToolError::Panic(panic_message(payload.as_ref()))));

    match attempt {
        Ok(outcome) => outcome,
        Err(err) => report_failure(pipeline, err, host),
    }
}

fn produce(
    pipeline: &Pipeline,
    args: &Value,
    config: &ToolConfig,
    host: Host<'_>,
) -> Result<ToolOutcome, ToolError> {
    let params = input::parse_params(args, pipeline.allowed)?;
    let attachments = AttachmentSet::new(&params.files, config.allow_server_paths);
    let output_name = input::choose_output_name(params.file_type, params.output_basename.as_deref());
    debug!(
        "{}: {} {} as {output_name}",
        pipeline.tool_name,
        params.operation.as_str(),
        params.file_type.as_str()
    );

    let bytes = (pipeline.render)(&params, attachments, config)?;

    host.emit(HostEvent::status(UPLOADING_STATUS, false));
    let user = upload::resolve_user(params.user.as_ref(), host.users)?;
    let request = UploadRequest {
        bytes: &bytes,
        filename: &output_name,
        content_type: params.file_type.content_type(),
        source: pipeline.tool_name,
    };
    let record = upload::upload_document(&request, &user, host.storage, host.registry)?;

    let relative = upload::content_url(&record.id);
    host.emit(HostEvent::file(&record.id, &output_name, &relative));
    host.emit(HostEvent::status(DONE_STATUS, true));

    let url = if pipeline.absolute_links {
        config.absolute_url(&relative)
    } else {
        relative
    };
    let kind = match params.operation {
        Operation::Create => OutcomeKind::Created,
        Operation::Modify => OutcomeKind::Modified,
    };
    Ok(ToolOutcome {
        kind,
        message: format!(
            "{} {} - **{output_name}** is ready: [{output_name}]({url})",
            params.operation.past_tense(),
            params.file_type.label()
        ),
        file: Some(UploadedFile {
            id: record.id,
            name: output_name,
            url,
            size: record.meta.size,
        }),
    })
}

fn report_failure(pipeline: &Pipeline, err: ToolError, host: Host<'_>) -> ToolOutcome {
    let kind = err.outcome();
    let message = match kind {
        OutcomeKind::InvalidInput => {
            host.emit(HostEvent::error(format!("Invalid inputs: {err}")));
            friendly_error("Input validation failed", &err)
        }
        OutcomeKind::PermissionDenied => {
            host.emit(HostEvent::warning(err.to_string()));
            friendly_error("Permission error", &err)
        }
        OutcomeKind::MissingSource => {
            host.emit(HostEvent::warning(NO_SOURCE_NOTICE));
            friendly_error("Missing source file", &err)
        }
        OutcomeKind::Created | OutcomeKind::Modified | OutcomeKind::Failed => {
            error!("{} failed: {err}", pipeline.tool_name);
            host.emit(HostEvent::error(format!("{}: {err}", pipeline.failure_prefix)));
            let summary = friendly_error(pipeline.failure_prefix, &err);
            format!("{summary}\n\nDetails:\n{:?}", anyhow::Error::new(err))
        }
    };
    ToolOutcome {
        kind,
        message,
        file: None,
    }
}

fn friendly_error(prefix: &str, err: &ToolError) -> String {
    let text = err.to_string();
    let text = if text.is_empty() {
        "unexpected error".to_string()
    } else {
        text
    };
    format!("{prefix}: {} - {text}", err.kind_name())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The bytes of the document a modify call edits: a matching attachment,
/// else `source_path` when server paths are allowed.
pub fn load_source(
    params: &ToolParams,
    attachments: AttachmentSet<'_>,
    config: &ToolConfig,
) -> Result<Vec<u8>, ToolError> {
    let extension = params.file_type.extension();
    if let Some((name, bytes)) =
        attachments.find_source(extension, params.source_filename_hint.as_deref())
    {
        debug!("modifying attached {name:?}");
        return Ok(bytes);
    }

    if let Some(path) = params.source_path.as_deref() {
        if !config.allow_server_paths {
            return Err(ToolError::Permission(SERVER_PATHS_DISABLED.to_string()));
        }
        let path = Path::new(path);
        if path.is_file() {
            match read_file(path) {
                Ok(bytes) => {
                    debug!("modifying server file {}", path.display());
                    return Ok(bytes);
                }
                Err(AttachmentError::Empty) => warn!("{} is empty", path.display()),
                Err(err) => return Err(err.into()),
            }
        }
    }

    Err(ToolError::MissingSource(format!(
        "No existing {extension} file found to modify. Attach a file or provide a valid source_path."
    )))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::local::{CollectingEmitter, JsonlFileRegistry, StaticUserDirectory};
    use crate::host::{FileRegistry, HostError, StorageProvider, Tags, UserRecord};
    use std::cell::Cell;

    pub(crate) struct Fixture {
        pub dir: tempfile::TempDir,
        pub events: CollectingEmitter,
        pub storage: crate::host::local::FilesystemStorage,
        pub registry: JsonlFileRegistry,
        pub users: StaticUserDirectory,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            Self {
                storage: crate::host::local::FilesystemStorage::new(dir.path().join("uploads")),
                registry: JsonlFileRegistry::new(dir.path().join("files.jsonl")),
                users: StaticUserDirectory::new([UserRecord {
                    id: "u1".to_string(),
                    email: "ada@example.com".to_string(),
                    name: "Ada".to_string(),
                }]),
                events: CollectingEmitter::new(),
                dir,
            }
        }

        pub fn host(&self) -> Host<'_> {
            Host {
                events: Some(&self.events),
                storage: &self.storage,
                registry: &self.registry,
                users: &self.users,
            }
        }
    }

    pub(crate) fn quiet_config() -> ToolConfig {
        ToolConfig {
            min_progress_delay_ms: 0,
            ..ToolConfig::default()
        }
    }

    fn echo(params: &ToolParams, _: AttachmentSet<'_>, _: &ToolConfig) -> Result<Vec<u8>, ToolError> {
        match params.instructions.get("fail").and_then(Value::as_str) {
            Some("validation") => Err(ToolError::Validation("paragraphs[0].text: is required".into())),
            Some("render") => Err(RenderError::invalid("broken part").into()),
            Some("panic") => panic!("renderer blew up"),
            _ => Ok(b"payload".to_vec()),
        }
    }

    const ECHO: Pipeline = Pipeline {
        tool_name: "echo.document",
        allowed: &[FileType::Docx],
        generating_status: "Generating document…",
        failure_prefix: "Document processing failed",
        absolute_links: true,
        render: echo,
    };

    fn args(extra: Value) -> Value {
        let mut base = json!({"file_type": "docx", "operation": "create", "user": {"id": "u1"}});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn success_emits_progress_files_and_done() {
        let fixture = Fixture::new();
        let outcome = execute(
            &ECHO,
            &args(json!({"output_basename": "notes"})),
            &quiet_config(),
            fixture.host(),
        );
        assert_eq!(outcome.kind, OutcomeKind::Created);
        let file = outcome.file.clone().expect("file");
        assert_eq!(file.name, "notes.docx");
        assert_eq!(
            file.url,
            format!("http://localhost:8080/api/v1/files/{}/content", file.id)
        );
        assert_eq!(
            outcome.message,
            format!("Created DOCX - **notes.docx** is ready: [notes.docx]({})", file.url)
        );

        let events = fixture.events.take();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], HostEvent::status("Generating document…", false));
        assert_eq!(events[1], HostEvent::status(UPLOADING_STATUS, false));
        assert_eq!(
            events[2],
            HostEvent::file(&file.id, "notes.docx", &upload::content_url(&file.id))
        );
        assert_eq!(events[3], HostEvent::status(DONE_STATUS, true));

        let record = fixture.registry.get(&file.id).expect("get").expect("record");
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.meta.data, json!({"source": "echo.document"}));

        let result = outcome.to_mcp_result();
        assert_eq!(result["isError"], json!(false));
        assert_eq!(result["structuredContent"]["outcome"], json!("created"));
        assert_eq!(result["structuredContent"]["size"], json!(7));
    }

    #[test]
    fn progress_can_be_silenced() {
        let fixture = Fixture::new();
        let config = ToolConfig {
            show_progress: false,
            ..quiet_config()
        };
        execute(&ECHO, &args(json!({})), &config, fixture.host());
        let events = fixture.events.take();
        assert_eq!(events[0], HostEvent::status(UPLOADING_STATUS, false));
    }

    #[test]
    fn validation_failures_notify_and_upload_nothing() {
        let fixture = Fixture::new();
        let outcome = execute(
            &ECHO,
            &args(json!({"instructions": {"fail": "validation"}})),
            &quiet_config(),
            fixture.host(),
        );
        assert_eq!(outcome.kind, OutcomeKind::InvalidInput);
        assert_eq!(
            outcome.message,
            "Input validation failed: ValidationError - paragraphs[0].text: is required"
        );
        let events = fixture.events.take();
        assert_eq!(
            events.last(),
            Some(&HostEvent::error("Invalid inputs: paragraphs[0].text: is required"))
        );
        assert!(fixture.registry.records().expect("records").is_empty());
        let result = outcome.to_mcp_result();
        assert_eq!(result["isError"], json!(true));
        assert_eq!(result["structuredContent"]["error"]["kind"], json!(errors::INVALID_INPUT));
    }

    #[test]
    fn unsupported_file_type_is_a_validation_failure() {
        let fixture = Fixture::new();
        let outcome = execute(
            &ECHO,
            &args(json!({"file_type": "pdf"})),
            &quiet_config(),
            fixture.host(),
        );
        assert_eq!(outcome.kind, OutcomeKind::InvalidInput);
    }

    #[test]
    fn render_failures_carry_details() {
        let fixture = Fixture::new();
        let outcome = execute(
            &ECHO,
            &args(json!({"instructions": {"fail": "render"}})),
            &quiet_config(),
            fixture.host(),
        );
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert!(
            outcome
                .message
                .starts_with("Document processing failed: RenderError - invalid document: broken part\n\nDetails:\n"),
            "{}",
            outcome.message
        );
        let events = fixture.events.take();
        assert_eq!(
            events.last(),
            Some(&HostEvent::error(
                "Document processing failed: invalid document: broken part"
            ))
        );
    }

    #[test]
    fn panics_are_reported_as_failures() {
        let fixture = Fixture::new();
        let outcome = execute(
            &ECHO,
            &args(json!({"instructions": {"fail": "panic"}})),
            &quiet_config(),
            fixture.host(),
        );
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert!(outcome.message.contains("renderer blew up"), "{}", outcome.message);
    }

    #[test]
    fn missing_and_unknown_users_fail_the_upload() {
        let fixture = Fixture::new();
        let mut no_user = args(json!({}));
        if let Some(obj) = no_user.as_object_mut() {
            obj.remove("user");
        }
        let outcome = execute(&ECHO, &no_user, &quiet_config(), fixture.host());
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert!(outcome.message.contains("No user context was provided for upload."));

        let outcome = execute(
            &ECHO,
            &args(json!({"user": {"id": "ghost"}})),
            &quiet_config(),
            fixture.host(),
        );
        assert!(outcome.message.contains("User not found with ID: ghost"));
        assert!(fixture.registry.records().expect("records").is_empty());
    }

    struct CountingRegistry {
        calls: Cell<usize>,
    }

    impl FileRegistry for CountingRegistry {
        fn insert_new_file(
            &self,
            _: &str,
            _: crate::host::FileForm,
        ) -> Result<crate::host::FileRecord, HostError> {
            self.calls.set(self.calls.get() + 1);
            Err(HostError::Rejected("registry offline".to_string()))
        }
    }

    struct NullStorage;

    impl StorageProvider for NullStorage {
        fn upload_file(&self, _: &[u8], key: &str, _: &Tags) -> Result<String, HostError> {
            Ok(key.to_string())
        }
    }

    #[test]
    fn registry_failure_is_reported_once() {
        let fixture = Fixture::new();
        let registry = CountingRegistry { calls: Cell::new(0) };
        let host = Host {
            events: Some(&fixture.events),
            storage: &NullStorage,
            registry: &registry,
            users: &fixture.users,
        };
        let outcome = execute(&ECHO, &args(json!({})), &quiet_config(), host);
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert_eq!(registry.calls.get(), 1);
        let events = fixture.events.take();
        assert!(!events.contains(&HostEvent::status(DONE_STATUS, true)));
    }

    fn modify_params(extra: Value) -> ToolParams {
        let mut base = json!({"file_type": "docx", "operation": "modify"});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        input::parse_params(&base, &[FileType::Docx]).expect("params")
    }

    #[test]
    fn source_path_needs_permission() {
        let params = modify_params(json!({"source_path": "/etc/hostname.docx"}));
        let err = load_source(&params, AttachmentSet::new(&[], false), &quiet_config())
            .expect_err("denied");
        assert!(matches!(err, ToolError::Permission(ref text) if text == SERVER_PATHS_DISABLED));
    }

    #[test]
    fn source_path_is_read_when_allowed() {
        let fixture = Fixture::new();
        let path = fixture.dir.path().join("old.docx");
        std::fs::write(&path, b"PK").expect("write");
        let params = modify_params(json!({"source_path": path.to_string_lossy()}));
        let config = ToolConfig {
            allow_server_paths: true,
            ..quiet_config()
        };
        let bytes = load_source(&params, AttachmentSet::new(&[], true), &config).expect("bytes");
        assert_eq!(bytes, b"PK");

        let params = modify_params(json!({"source_path": fixture.dir.path().join("gone.docx").to_string_lossy()}));
        let err = load_source(&params, AttachmentSet::new(&[], true), &config).expect_err("missing");
        assert_eq!(
            err.to_string(),
            "No existing .docx file found to modify. Attach a file or provide a valid source_path."
        );
    }

    #[test]
    fn attachments_win_over_source_path() {
        let files = vec![json!({"name": "old.docx", "content": "UEs="})];
        let params = modify_params(json!({"source_path": "/nowhere.docx"}));
        let bytes = load_source(&params, AttachmentSet::new(&files, false), &quiet_config())
            .expect("attachment");
        assert_eq!(bytes, b"PK");
    }
}
