use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use tempfile::tempdir;

/// Sends one request and reads up to its response. Notification lines
/// written before the response are returned alongside it.
fn send_request(
    stdin: &mut std::process::ChildStdin,
    stdout: &mut BufReader<std::process::ChildStdout>,
    request: serde_json::Value,
) -> Result<(Vec<serde_json::Value>, serde_json::Value), Box<dyn std::error::Error>> {
    let serialized = serde_json::to_string(&request)?;
    writeln!(stdin, "{serialized}")?;
    stdin.flush()?;

    let mut notifications = Vec::new();
    loop {
        let mut line = String::new();
        if stdout.read_line(&mut line)? == 0 {
            return Err("server closed stdout".into());
        }
        let message: serde_json::Value = serde_json::from_str(line.trim())?;
        if message.get("id").is_some() {
            return Ok((notifications, message));
        }
        notifications.push(message);
    }
}

fn read_zip_entry(path: &str, entry: &str) -> Result<String, Box<dyn std::error::Error>> {
    let mut archive = zip::ZipArchive::new(fs::File::open(path)?)?;
    let mut file = archive.by_name(entry)?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(text)
}

#[test]
fn create_docx_and_register_upload() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let storage = dir.path().join("uploads");

    let mut child = Command::new(env!("CARGO_BIN_EXE_docs-mcp"))
        .args(["serve", "--stdio", "--min-progress-delay-ms", "0"])
        .args(["--user", "u7:ada@example.com:Ada"])
        .env("DOCS_MCP_STORAGE_DIR", &storage)
        .env_remove("DOCS_MCP_REGISTRY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("stdin available");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout available"));

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 10,
        "method": "tools/call",
        "params": {
            "name": "office.document",
            "arguments": {
                "file_type": "docx",
                "operation": "create",
                "output_basename": "minutes",
                "instructions": {
                    "paragraphs": [{"text": "Board minutes", "style": "Heading 1"}],
                    "tables": [{"rows": [["Item", "Owner"], ["Budget"]]}],
                    "header_text": "Confidential"
                },
                "user": {"id": "u7"}
            }
        }
    });
    let (events, response) = send_request(&mut stdin, &mut stdout, request)?;
    let result = response.get("result").expect("result present");
    assert_eq!(result.get("isError").and_then(|v| v.as_bool()), Some(false));

    let structured = result.get("structuredContent").expect("structuredContent");
    assert_eq!(
        structured.get("outcome").and_then(|v| v.as_str()),
        Some("created")
    );
    assert_eq!(
        structured.get("name").and_then(|v| v.as_str()),
        Some("minutes.docx")
    );
    let file_id = structured
        .get("file_id")
        .and_then(|v| v.as_str())
        .expect("file id");
    let url = structured.get("url").and_then(|v| v.as_str()).expect("url");
    assert_eq!(
        url,
        format!("http://localhost:8080/api/v1/files/{file_id}/content")
    );
    let text = result["content"][0]["text"].as_str().expect("text");
    assert_eq!(
        text,
        format!("Created DOCX - **minutes.docx** is ready: [minutes.docx]({url})")
    );

    let kinds: Vec<&str> = events
        .iter()
        .filter(|event| event.get("method").and_then(|v| v.as_str()) == Some("notifications/event"))
        .filter_map(|event| event["params"]["type"].as_str())
        .collect();
    assert_eq!(kinds, ["status", "status", "files", "status"]);
    assert_eq!(events[3]["params"]["data"]["done"], serde_json::json!(true));
    assert_eq!(
        events[2]["params"]["data"]["files"][0]["url"].as_str(),
        Some(format!("/api/v1/files/{file_id}/content").as_str())
    );

    let registry = fs::read_to_string(storage.join("files.jsonl"))?;
    let record: serde_json::Value = serde_json::from_str(registry.lines().next().expect("record"))?;
    assert_eq!(record["id"].as_str(), Some(file_id));
    assert_eq!(record["user_id"].as_str(), Some("u7"));
    assert_eq!(record["meta"]["data"]["source"].as_str(), Some("office.document"));
    let stored = record["path"].as_str().expect("path");
    assert!(stored.ends_with(&format!("{file_id}_minutes.docx")));

    let document = read_zip_entry(stored, "word/document.xml")?;
    assert!(document.contains("Board minutes"));
    assert!(document.contains("Budget"));

    let _ = child.kill();
    Ok(())
}

#[test]
fn xlsx_failures_are_reported_as_tool_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut child = Command::new(env!("CARGO_BIN_EXE_docs-mcp"))
        .args(["serve", "--stdio", "--min-progress-delay-ms", "0"])
        .env("DOCS_MCP_STORAGE_DIR", dir.path())
        .env_remove("DOCS_MCP_REGISTRY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("stdin available");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout available"));

    let invalid = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 11,
        "method": "tools/call",
        "params": {
            "name": "office.document",
            "arguments": {
                "file_type": "xlsx",
                "operation": "create",
                "instructions": {"sheets": [{"data": [["a"]]}]},
                "user": {"id": "local"}
            }
        }
    });
    let (events, response) = send_request(&mut stdin, &mut stdout, invalid)?;
    let result = response.get("result").expect("result present");
    assert_eq!(result.get("isError").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        result["structuredContent"]["outcome"].as_str(),
        Some("invalid_input")
    );
    let text = result["content"][0]["text"].as_str().expect("text");
    assert!(text.starts_with("Input validation failed: "), "{text}");
    assert!(text.contains("sheets[0].name"), "{text}");
    let last = events.last().expect("notification");
    assert_eq!(last["params"]["type"].as_str(), Some("notification"));
    assert_eq!(last["params"]["data"]["type"].as_str(), Some("error"));

    let missing = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 12,
        "method": "tools/call",
        "params": {
            "name": "office.document",
            "arguments": {
                "file_type": "xlsx",
                "operation": "modify",
                "instructions": {"sheets": [{"name": "Extra"}]},
                "user": {"id": "local"}
            }
        }
    });
    let (events, response) = send_request(&mut stdin, &mut stdout, missing)?;
    let result = response.get("result").expect("result present");
    assert_eq!(
        result["structuredContent"]["outcome"].as_str(),
        Some("missing_source")
    );
    let last = events.last().expect("notification");
    assert_eq!(last["params"]["data"]["type"].as_str(), Some("warning"));
    assert_eq!(
        last["params"]["data"]["content"].as_str(),
        Some("No source file was found to modify.")
    );

    let unknown = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 13,
        "method": "tools/call",
        "params": {"name": "office.delete", "arguments": {}}
    });
    let (_, response) = send_request(&mut stdin, &mut stdout, unknown)?;
    assert_eq!(
        response["result"]["structuredContent"]["error"]["kind"].as_str(),
        Some("invalid_input")
    );

    assert!(!dir.path().join("files.jsonl").exists());

    let _ = child.kill();
    Ok(())
}
