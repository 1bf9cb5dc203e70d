//! Directory listing used by the UI's file picker.

use std::io;
use std::path::{Component, Path};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FilesQueryParams {
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub cwd: String,
    /// Sub-directories, each ending in `/`, usable as the next `prefix`.
    pub folders: Vec<String>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
enum ListError {
    /// Absolute or escaping the root.
    InvalidPrefix(String),
    NotFound(String),
    Io(io::Error),
}

impl ListError {
    fn status(&self) -> StatusCode {
        match self {
            ListError::InvalidPrefix(_) => StatusCode::BAD_REQUEST,
            ListError::NotFound(_) => StatusCode::NOT_FOUND,
            ListError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ListError::InvalidPrefix(prefix) => format!("Invalid prefix: {}", prefix),
            ListError::NotFound(prefix) => format!("Directory not found: {}", prefix),
            ListError::Io(e) => e.to_string(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /files?prefix=<dir>
///
/// List the folders and files of a directory under the configured root.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilesQueryParams>,
) -> Result<Json<FilesResponse>, impl IntoResponse> {
    let prefix = params.prefix.unwrap_or_default();

    match list_directory(state.files_root(), &prefix).await {
        Ok(listing) => Ok(Json(listing)),
        Err(e) => {
            match &e {
                ListError::Io(err) => warn!(prefix = %prefix, error = %err, "Failed to list directory"),
                other => debug!(prefix = %prefix, "Refusing listing: {}", other.message()),
            }
            Err((
                e.status(),
                Json(ErrorResponse {
                    error: e.message(),
                }),
            ))
        }
    }
}

async fn list_directory(root: &Path, prefix: &str) -> Result<FilesResponse, ListError> {
    let prefix = normalize_prefix(prefix)?;
    let dir = root.join(&prefix);

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ListError::NotFound(prefix));
        }
        Err(e) => return Err(ListError::Io(e)),
    };

    let mut folders = Vec::new();
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(ListError::Io)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Entries can vanish between read_dir and metadata
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };

        if metadata.is_dir() {
            if prefix == "." {
                folders.push(format!("{}/", name));
            } else {
                folders.push(format!("{}/{}/", prefix, name));
            }
        } else {
            files.push(FileEntry {
                name: format!("{}/{}", prefix, name),
                size: metadata.len(),
            });
        }
    }

    folders.sort();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let cwd = tokio::fs::canonicalize(root)
        .await
        .unwrap_or_else(|_| root.to_path_buf());

    Ok(FilesResponse {
        cwd: cwd.display().to_string(),
        folders,
        files,
    })
}

/// Trim the trailing slash, default to `.` and refuse anything that is not a
/// plain relative path below the root.
fn normalize_prefix(prefix: &str) -> Result<String, ListError> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return if prefix.is_empty() {
            Ok(".".to_string())
        } else {
            Err(ListError::InvalidPrefix(prefix.to_string()))
        };
    }

    let escapes = Path::new(trimmed).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ListError::InvalidPrefix(prefix.to_string()));
    }

    Ok(trimmed.to_string())
}
