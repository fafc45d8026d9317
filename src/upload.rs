//! Hands rendered bytes to the host: storage first, then the file registry.

use crate::host::{
    FileForm, FileMeta, FileRecord, FileRegistry, HostError, StorageProvider, Tags, UserDirectory,
    UserRecord,
};
use log::info;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No user context was provided for upload.")]
    MissingUser,
    #[error("User not found with ID: {0}")]
    UserNotFound(String),
    #[error("storage upload failed: {0}")]
    Storage(#[source] HostError),
    #[error("file registration failed: {0}")]
    Registry(#[source] HostError),
}

pub fn content_url(file_id: &str) -> String {
    format!("/api/v1/files/{file_id}/content")
}

/// Looks up the acting user from the host-injected user mapping.
pub fn resolve_user(user: Option<&Value>, directory: &dyn UserDirectory) -> Result<UserRecord, UploadError> {
    let id = match user.and_then(|user| user.get("id")) {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(UploadError::MissingUser),
    };
    directory
        .get_user_by_id(&id)
        .ok_or(UploadError::UserNotFound(id))
}

pub struct UploadRequest<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    pub content_type: &'a str,
    /// Recorded as `meta.data.source`.
    pub source: &'a str,
}

pub fn upload_document(
    request: &UploadRequest<'_>,
    user: &UserRecord,
    storage: &dyn StorageProvider,
    registry: &dyn FileRegistry,
) -> Result<FileRecord, UploadError> {
    let file_id = Uuid::new_v4().to_string();
    let key = format!("{file_id}_{}", request.filename);
    let tags: Tags = [
        ("OpenWebUI-User-Email", user.email.as_str()),
        ("OpenWebUI-User-Id", user.id.as_str()),
        ("OpenWebUI-User-Name", user.name.as_str()),
        ("OpenWebUI-File-Id", file_id.as_str()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();

    let path = storage
        .upload_file(request.bytes, &key, &tags)
        .map_err(UploadError::Storage)?;

    let form = FileForm {
        id: file_id,
        filename: request.filename.to_string(),
        path,
        data: json!({}),
        meta: FileMeta {
            name: request.filename.to_string(),
            content_type: request.content_type.to_string(),
            size: request.bytes.len() as u64,
            data: json!({ "source": request.source }),
        },
    };
    let record = registry
        .insert_new_file(&user.id, form)
        .map_err(UploadError::Registry)?;
    info!(
        "uploaded {} ({} bytes) as {}",
        record.filename, record.meta.size, record.id
    );
    Ok(record)
}
