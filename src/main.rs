use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Args, Parser, Subcommand, ValueEnum};
use docs_mcp::config::{self, HostConfig, ToolConfig};
use docs_mcp::host::local::{
    CollectingEmitter, FilesystemStorage, JsonlFileRegistry, StaticUserDirectory, StderrEmitter,
};
use docs_mcp::host::{EventEmitter, Host, UserRecord};
use docs_mcp::{mcp, tools};
use serde_json::{Map, Value, json};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "docs-mcp")]
#[command(
    version,
    about = "Create or modify Office and PDF documents over MCP or from the command line"
)]
struct Cli {
    #[command(flatten)]
    host: HostArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct HostArgs {
    /// Directory uploaded files are written to
    #[arg(long, global = true, env = "DOCS_MCP_STORAGE_DIR", default_value = config::DEFAULT_STORAGE_DIR)]
    storage_dir: PathBuf,
    /// JSON-lines file registry (defaults to <storage-dir>/files.jsonl)
    #[arg(long, global = true, env = "DOCS_MCP_REGISTRY")]
    registry_path: Option<PathBuf>,
    /// Allow source_path to read files from this machine
    #[arg(long, global = true, env = "DOCS_MCP_ALLOW_SERVER_PATHS")]
    allow_server_paths: bool,
    /// Do not emit progress status events
    #[arg(long, global = true)]
    no_progress: bool,
    /// Pause before rendering so progress stays visible
    #[arg(long, global = true, default_value_t = config::DEFAULT_MIN_PROGRESS_DELAY_MS)]
    min_progress_delay_ms: u64,
    /// Base URL for absolute download links
    #[arg(long, global = true, env = "DOCS_MCP_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    base_url: String,
    /// Known user as id:email:name (repeatable)
    #[arg(long = "user", global = true, value_parser = config::parse_user_entry)]
    users: Vec<UserRecord>,
}

impl HostArgs {
    fn tool_config(&self) -> ToolConfig {
        ToolConfig {
            allow_server_paths: self.allow_server_paths,
            show_progress: !self.no_progress,
            min_progress_delay_ms: self.min_progress_delay_ms,
            base_url: self.base_url.clone(),
        }
    }

    fn host_config(&self) -> HostConfig {
        let users = if self.users.is_empty() {
            vec![UserRecord::local()]
        } else {
            self.users.clone()
        };
        HostConfig {
            storage_dir: self.storage_dir.clone(),
            registry_path: self.registry_path.clone(),
            users,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationArg {
    Create,
    Modify,
}

impl OperationArg {
    fn as_str(self) -> &'static str {
        match self {
            OperationArg::Create => "create",
            OperationArg::Modify => "modify",
        }
    }
}

#[derive(Args, Clone)]
struct DocumentArgs {
    /// Output kind (docx, pptx, xlsx or pdf)
    #[arg(long)]
    file_type: String,
    #[arg(long, value_enum, default_value = "create")]
    operation: OperationArg,
    /// Instruction JSON, or @path to read it from a file
    #[arg(long)]
    instructions: Option<String>,
    /// File to attach (repeatable)
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,
    #[arg(long)]
    source_filename_hint: Option<String>,
    #[arg(long)]
    source_path: Option<String>,
    #[arg(long)]
    output_basename: Option<String>,
    /// Acting user id
    #[arg(long, default_value = "local")]
    user_id: String,
    /// Output JSON structuredContent
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP stdio server
    Serve {
        /// Serve MCP over stdio (NDJSON)
        #[arg(long)]
        stdio: bool,
    },
    /// Create or modify a .docx, .pptx or .xlsx file
    Office(DocumentArgs),
    /// Create or modify a .pdf file
    Pdf(DocumentArgs),
}

#[derive(Clone, Copy)]
enum ToolKind {
    Office,
    Pdf,
}

/// The bundled host implementations behind one process.
struct LocalHost {
    storage: FilesystemStorage,
    registry: JsonlFileRegistry,
    users: StaticUserDirectory,
}

impl LocalHost {
    fn new(config: &HostConfig) -> Self {
        Self {
            storage: FilesystemStorage::new(&config.storage_dir),
            registry: JsonlFileRegistry::new(config.registry_path()),
            users: StaticUserDirectory::new(config.users.clone()),
        }
    }

    fn host<'a>(&'a self, events: &'a dyn EventEmitter) -> Host<'a> {
        Host {
            events: Some(events),
            storage: &self.storage,
            registry: &self.registry,
            users: &self.users,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let tool_config = cli.host.tool_config();
    let local = LocalHost::new(&cli.host.host_config());

    match cli.command {
        Commands::Serve { stdio } => {
            if stdio {
                run_stdio_server(&tool_config, &local)
            } else {
                anyhow::bail!("only --stdio transport is supported")
            }
        }
        Commands::Office(args) => run_document(ToolKind::Office, &args, &tool_config, &local),
        Commands::Pdf(args) => run_document(ToolKind::Pdf, &args, &tool_config, &local),
    }
}

fn run_document(
    kind: ToolKind,
    args: &DocumentArgs,
    config: &ToolConfig,
    local: &LocalHost,
) -> Result<()> {
    let arguments = build_tool_args(args)?;
    let events = StderrEmitter;
    let host = local.host(&events);
    let result = match kind {
        ToolKind::Office => tools::office_document::call(&arguments, config, host),
        ToolKind::Pdf => tools::pdf_document::call(&arguments, config, host),
    };
    print_tool_result(result, args.json)
}

fn build_tool_args(args: &DocumentArgs) -> Result<Value> {
    let mut map = Map::new();
    map.insert("file_type".to_string(), json!(args.file_type));
    map.insert("operation".to_string(), json!(args.operation.as_str()));
    if let Some(instructions) = &args.instructions {
        map.insert("instructions".to_string(), load_instructions(instructions)?);
    }
    if let Some(hint) = &args.source_filename_hint {
        map.insert("source_filename_hint".to_string(), json!(hint));
    }
    if let Some(path) = &args.source_path {
        map.insert("source_path".to_string(), json!(path));
    }
    if let Some(basename) = &args.output_basename {
        map.insert("output_basename".to_string(), json!(basename));
    }
    let files = args
        .attachments
        .iter()
        .map(|path| attachment_record(path))
        .collect::<Result<Vec<_>>>()?;
    map.insert("files".to_string(), Value::Array(files));
    map.insert("user".to_string(), json!({"id": args.user_id}));
    Ok(Value::Object(map))
}

fn load_instructions(value: &str) -> Result<Value> {
    let text = match value.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read instructions from {path}"))?,
        None => value.to_string(),
    };
    serde_json::from_str(&text).context("instructions must be valid JSON")
}

fn attachment_record(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(json!({"name": name, "content": STANDARD.encode(bytes)}))
}

fn print_tool_result(result: Value, json_output: bool) -> Result<()> {
    let is_error = result
        .get("isError")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let text = result
        .get("content")
        .and_then(|value| value.as_array())
        .and_then(|arr| arr.first())
        .and_then(|value| value.get("text"))
        .and_then(|value| value.as_str())
        .unwrap_or("");

    if is_error {
        eprintln!("{text}");
        process::exit(1);
    }

    if json_output {
        let structured = result
            .get("structuredContent")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let output = serde_json::to_string_pretty(&structured)?;
        println!("{output}");
        return Ok(());
    }

    println!("{text}");
    Ok(())
}

fn run_stdio_server(config: &ToolConfig, local: &LocalHost) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = stdin.lock().lines();
    let mut writer = io::BufWriter::new(stdout.lock());

    for line in reader {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let request: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("ignoring malformed request: {err}");
                continue;
            }
        };

        let method = request.get("method").and_then(|value| value.as_str());
        let id = request.get("id").cloned();
        let response = match (method, id) {
            (Some("initialize"), Some(id)) => Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": "2025-11-25",
                    "capabilities": {
                        "tools": {}
                    },
                    "serverInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }
            })),
            (Some("tools/list"), Some(id)) => Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": mcp::tool_definitions()
                }
            })),
            (Some("tools/call"), Some(id)) => {
                let events = CollectingEmitter::new();
                let result = handle_tool_call(&request, config, local.host(&events));
                for event in events.take() {
                    let notification = json!({
                        "jsonrpc": "2.0",
                        "method": "notifications/event",
                        "params": event
                    });
                    write_line(&mut writer, &notification)?;
                }
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": result
                }))
            }
            _ => None,
        };

        if let Some(response) = response {
            write_line(&mut writer, &response)?;
        }
    }

    Ok(())
}

fn write_line(writer: &mut impl Write, message: &Value) -> Result<()> {
    let serialized = serde_json::to_string(message).context("failed to serialize message")?;
    writeln!(writer, "{serialized}").context("failed to write message")?;
    writer.flush().context("failed to flush message")?;
    Ok(())
}

fn handle_tool_call(request: &serde_json::Value, config: &ToolConfig, host: Host<'_>) -> serde_json::Value {
    let params = request.get("params");
    let Some(params) = params.and_then(|value| value.as_object()) else {
        return tools::error_result(mcp::errors::INVALID_INPUT, "params must be an object", None);
    };

    let name = params.get("name").and_then(|value| value.as_str());
    let Some(name) = name else {
        return tools::error_result(
            mcp::errors::INVALID_INPUT,
            "params.name must be a string",
            None,
        );
    };

    let args = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    match name {
        mcp::contracts::TOOL_OFFICE_DOCUMENT => tools::office_document::call(&args, config, host),
        mcp::contracts::TOOL_PDF_DOCUMENT => tools::pdf_document::call(&args, config, host),
        _ => tools::error_result(
            mcp::errors::INVALID_INPUT,
            format!("tool not implemented: {name}"),
            Some(name),
        ),
    }
}
