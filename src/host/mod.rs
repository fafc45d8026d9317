//! Collaborators supplied by the chat host: event delivery, byte storage,
//! the file registry and the user directory.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod local;

/// Events as the host UI expects them: `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum HostEvent {
    Status {
        description: String,
        done: bool,
        hidden: bool,
    },
    Files {
        files: Vec<FileLink>,
    },
    Notification {
        #[serde(rename = "type")]
        level: NotificationLevel,
        content: String,
    },
}

impl HostEvent {
    pub fn status(description: impl Into<String>, done: bool) -> Self {
        HostEvent::Status {
            description: description.into(),
            done,
            hidden: false,
        }
    }

    pub fn file(id: &str, name: &str, url: &str) -> Self {
        HostEvent::Files {
            files: vec![FileLink {
                kind: "file".to_string(),
                id: id.to_string(),
                name: name.to_string(),
                url: url.to_string(),
            }],
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        HostEvent::Notification {
            level: NotificationLevel::Error,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        HostEvent::Notification {
            level: NotificationLevel::Warning,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl UserRecord {
    /// The single user of a host run from the command line.
    pub fn local() -> Self {
        Self {
            id: "local".to_string(),
            email: "local@localhost".to_string(),
            name: "Local User".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub data: Value,
}

/// What a tool hands to the registry for a freshly stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileForm {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub data: Value,
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub path: String,
    pub data: Value,
    pub meta: FileMeta,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

pub type Tags = BTreeMap<String, String>;

pub trait EventEmitter {
    fn emit(&self, event: HostEvent);
}

pub trait StorageProvider {
    /// Stores `contents` under `key` and returns the path the registry
    /// should record.
    fn upload_file(&self, contents: &[u8], key: &str, tags: &Tags) -> Result<String, HostError>;
}

pub trait FileRegistry {
    fn insert_new_file(&self, user_id: &str, form: FileForm) -> Result<FileRecord, HostError>;
}

pub trait UserDirectory {
    fn get_user_by_id(&self, id: &str) -> Option<UserRecord>;
}

/// Everything a tool call needs from its host. The event emitter is
/// optional; without one the pipeline runs silently.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub events: Option<&'a dyn EventEmitter>,
    pub storage: &'a dyn StorageProvider,
    pub registry: &'a dyn FileRegistry,
    pub users: &'a dyn UserDirectory,
}

impl Host<'_> {
    pub fn emit(&self, event: HostEvent) {
        if let Some(events) = self.events {
            events.emit(event);
        }
    }
}
