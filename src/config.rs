use crate::host::UserRecord;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_MIN_PROGRESS_DELAY_MS: u64 = 700;
pub const DEFAULT_STORAGE_DIR: &str = "./data/uploads";
pub const REGISTRY_FILE_NAME: &str = "files.jsonl";

/// Per-tool switches. One instance is shared by every call of a tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Allow `source_path` to read files from the server filesystem.
    pub allow_server_paths: bool,
    /// Emit `status` events while the tool runs.
    pub show_progress: bool,
    /// Pause before heavy work so the progress indicator stays visible.
    pub min_progress_delay_ms: u64,
    /// Base used for absolute download links.
    pub base_url: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            allow_server_paths: false,
            show_progress: true,
            min_progress_delay_ms: DEFAULT_MIN_PROGRESS_DELAY_MS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ToolConfig {
    pub fn absolute_url(&self, relative: &str) -> String {
        let base = self.base_url.trim_matches('/');
        if base.is_empty() {
            return relative.to_string();
        }
        format!("{base}/{}", relative.trim_start_matches('/'))
    }
}

/// Where the bundled host implementations keep their state.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub storage_dir: PathBuf,
    pub registry_path: Option<PathBuf>,
    pub users: Vec<UserRecord>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            registry_path: None,
            users: vec![UserRecord::local()],
        }
    }
}

impl HostConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| self.storage_dir.join(REGISTRY_FILE_NAME))
    }
}

/// Parses `id:email:name`. Email and name may be omitted.
pub fn parse_user_entry(entry: &str) -> Result<UserRecord, String> {
    let mut parts = entry.splitn(3, ':');
    let id = parts.next().unwrap_or("").trim();
    if id.is_empty() {
        return Err(format!("user entry must start with an id: {entry:?}"));
    }
    let email = parts.next().unwrap_or("").trim();
    let name = parts.next().unwrap_or("").trim();
    Ok(UserRecord {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_joins_without_double_slash() {
        let config = ToolConfig::default();
        assert_eq!(
            config.absolute_url("/api/v1/files/abc/content"),
            "http://localhost:8080/api/v1/files/abc/content"
        );
    }

    #[test]
    fn empty_base_keeps_relative_url() {
        let config = ToolConfig {
            base_url: "/".to_string(),
            ..ToolConfig::default()
        };
        assert_eq!(config.absolute_url("/x"), "/x");
    }

    #[test]
    fn registry_defaults_under_storage_dir() {
        let config = HostConfig {
            storage_dir: PathBuf::from("/srv/uploads"),
            ..HostConfig::default()
        };
        assert_eq!(
            config.registry_path(),
            PathBuf::from("/srv/uploads/files.jsonl")
        );
    }

    #[test]
    fn user_entry_parsing() {
        let user = parse_user_entry("u1:ada@example.com:Ada Lovelace").expect("user");
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada Lovelace");

        let bare = parse_user_entry("u2").expect("user");
        assert_eq!(bare.email, "");
        assert!(parse_user_entry(":x").is_err());
    }
}
