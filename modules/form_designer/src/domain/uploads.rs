//! Uploaded file lifecycle: spooling, policy checks, storage and cleanup

use rand::RngCore;
use std::path::{Path, PathBuf};

/// One uploaded file held in temporary or permanent storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    /// Sanitized client file name
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub path: PathBuf,
    /// Location relative to the storage directory once stored
    pub stored_location: Option<String>,
}

impl UploadedFile {
    /// Lower-case extension of the client file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Value logged and mailed for this upload
    pub fn cleaned_value(&self) -> serde_json::Value {
        match &self.stored_location {
            Some(location) => serde_json::json!({ "name": self.file_name, "url": location }),
            None => serde_json::json!({ "name": self.file_name, "size": self.size }),
        }
    }
}

/// Allowed types and size limits for uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Lower-case extensions; empty allows any type
    pub allowed_file_types: Vec<String>,
    pub max_upload_size: u64,
    pub max_upload_total_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_file_types: Vec::new(),
            max_upload_size: 5 * 1024 * 1024,
            max_upload_total_size: 10 * 1024 * 1024,
        }
    }
}

/// Outcome of checking a set of uploads against a policy
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PolicyViolations {
    pub field_errors: Vec<(String, String)>,
    pub form_errors: Vec<String>,
}

impl UploadPolicy {
    pub fn check<'a>(&self, files: impl IntoIterator<Item = &'a UploadedFile>) -> PolicyViolations {
        let mut violations = PolicyViolations::default();
        let mut total = 0u64;
        for file in files {
            total = total.saturating_add(file.size);
            if !self.allowed_file_types.is_empty() {
                let allowed = file
                    .extension()
                    .is_some_and(|ext| self.allowed_file_types.iter().any(|t| *t == ext));
                if !allowed {
                    violations.field_errors.push((
                        file.field_name.clone(),
                        "This file type is not allowed.".to_string(),
                    ));
                    continue;
                }
            }
            if file.size > self.max_upload_size {
                violations.field_errors.push((
                    file.field_name.clone(),
                    format!(
                        "Please keep file size under {}. Current size is {}.",
                        format_size(self.max_upload_size),
                        format_size(file.size)
                    ),
                ));
            }
        }
        if total > self.max_upload_total_size {
            violations.form_errors.push(format!(
                "Please keep total file size under {}. Current total size is {}.",
                format_size(self.max_upload_total_size),
                format_size(total)
            ));
        }
        violations
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Strip directories and unsafe characters from a client file name
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Write uploaded bytes into the temporary directory
pub async fn spool(
    temp_dir: &Path,
    field_name: &str,
    file_name: &str,
    content_type: Option<String>,
    bytes: &[u8],
) -> anyhow::Result<UploadedFile> {
    tokio::fs::create_dir_all(temp_dir).await?;
    let file_name = sanitize_file_name(file_name);
    let path = temp_dir.join(format!("{}-{}", random_secret(), file_name));
    tokio::fs::write(&path, bytes).await?;
    Ok(UploadedFile {
        field_name: field_name.to_string(),
        file_name,
        content_type,
        size: bytes.len() as u64,
        path,
        stored_location: None,
    })
}

/// Move a temporary upload to `storage_dir/<secret>/<file_name>`
pub async fn store(storage_dir: &Path, file: &mut UploadedFile) -> anyhow::Result<()> {
    let secret = random_secret();
    let dir = storage_dir.join(&secret);
    tokio::fs::create_dir_all(&dir).await?;
    let target = dir.join(&file.file_name);
    if tokio::fs::rename(&file.path, &target).await.is_err() {
        tokio::fs::copy(&file.path, &target).await?;
        tokio::fs::remove_file(&file.path).await?;
    }
    tracing::debug!(field = %file.field_name, target = %target.display(), "Stored uploaded file");
    file.path = target;
    file.stored_location = Some(format!("{}/{}", secret, file.file_name));
    Ok(())
}

/// Remove temporary uploads; failures are logged and ignored
pub async fn discard(files: impl IntoIterator<Item = UploadedFile>) {
    for file in files {
        if file.stored_location.is_some() {
            continue;
        }
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => tracing::debug!(field = %file.field_name, "Removed temporary upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                field = %file.field_name,
                path = %file.path.display(),
                "Failed to remove temporary upload: {}",
                e
            ),
        }
    }
}

/// Remove uploads wherever they live, stored ones included
///
/// Used when a submission fails after its files were moved to storage.
pub async fn purge(files: impl IntoIterator<Item = UploadedFile>) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    field = %file.field_name,
                    path = %file.path.display(),
                    "Failed to remove upload: {}",
                    e
                );
            }
            continue;
        }
        if file.stored_location.is_some() {
            if let Some(dir) = file.path.parent() {
                let _ = tokio::fs::remove_dir(dir).await;
            }
        }
        tracing::debug!(field = %file.field_name, "Removed upload");
    }
}
