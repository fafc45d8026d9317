//! Host implementations backed by the local filesystem, for the stdio server
//! and the command line.

use super::{
    EventEmitter, FileForm, FileRecord, FileRegistry, HostError, HostEvent, StorageProvider, Tags,
    UserDirectory, UserRecord,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes uploads into one flat directory.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    dir: PathBuf,
}

impl FilesystemStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageProvider for FilesystemStorage {
    fn upload_file(&self, contents: &[u8], key: &str, tags: &Tags) -> Result<String, HostError> {
        if key.contains('/') || key.contains('\\') || key.starts_with('.') {
            return Err(HostError::Rejected(format!("unsafe storage key {key:?}")));
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(key);
        fs::write(&path, contents)?;
        debug!("stored {} bytes at {} (tags: {tags:?})", contents.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Appends one JSON record per line.
#[derive(Debug)]
pub struct JsonlFileRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record written so far. Lines that fail to parse are skipped.
    pub fn records(&self) -> Result<Vec<FileRecord>, HostError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping unreadable registry line: {err}"),
            }
        }
        Ok(records)
    }

    pub fn get(&self, id: &str) -> Result<Option<FileRecord>, HostError> {
        Ok(self.records()?.into_iter().find(|record| record.id == id))
    }
}

impl FileRegistry for JsonlFileRegistry {
    fn insert_new_file(&self, user_id: &str, form: FileForm) -> Result<FileRecord, HostError> {
        let record = FileRecord {
            id: form.id,
            user_id: user_id.to_string(),
            filename: form.filename,
            path: form.path,
            data: form.data,
            meta: form.meta,
            created_at: chrono::Utc::now().timestamp(),
        };
        let line = serde_json::to_string(&record)?;

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(record)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl StaticUserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.id.clone(), user))
                .collect(),
        }
    }
}

impl UserDirectory for StaticUserDirectory {
    fn get_user_by_id(&self, id: &str) -> Option<UserRecord> {
        self.users.get(id).cloned()
    }
}

/// Keeps events in memory until the caller drains them.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    events: Mutex<Vec<HostEvent>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<HostEvent> {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *events)
    }
}

impl EventEmitter for CollectingEmitter {
    fn emit(&self, event: HostEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Prints each event as one JSON line on stderr.
#[derive(Debug, Default)]
pub struct StderrEmitter;

impl EventEmitter for StderrEmitter {
    fn emit(&self, event: HostEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => eprintln!("{line}"),
            Err(err) => warn!("failed to serialize event: {err}"),
        }
    }
}
