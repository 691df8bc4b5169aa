use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::warn;

use super::error::{PortalError, RepositoryError};
use super::PortalState;
use crate::error::AppError;

/// Reject names that could escape the upload directory.
pub fn validate_file_name(name: &str) -> Result<(), PortalError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || trimmed.len() > 255
        || trimmed.starts_with('.')
        || trimmed.contains("..")
        || trimmed.contains(&['/', '\\', '\0'][..]);
    if invalid {
        return Err(PortalError::Validation(format!(
            "'{name}' is not a valid upload file name"
        )));
    }
    Ok(())
}

/// Read-only view over the directory holding uploaded documents.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

/// File contents together with the guessed MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn open(&self, name: &str) -> Result<StoredFile, PortalError> {
        validate_file_name(name)?;
        let path = self.root.join(name);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PortalError::not_found("upload", name));
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "upload read failed");
                return Err(RepositoryError::Unavailable(err.to_string()).into());
            }
        };

        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(StoredFile {
            content_type,
            bytes,
        })
    }
}

/// Documents live under `/api/uploads/`; matching requests link their certificate scan at the
/// site root.
pub(crate) fn routes() -> Router<PortalState> {
    Router::new()
        .route("/api/uploads/:filename", get(download_handler))
        .route("/:certificate_file", get(download_handler))
}

async fn download_handler(
    State(store): State<Arc<UploadStore>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let file = store.open(&filename).await?;
    Ok(([(header::CONTENT_TYPE, file.content_type)], file.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_separators() {
        for name in ["../secret", "a/b.pdf", "a\\b.pdf", ".env", "", " padded.pdf"] {
            assert!(validate_file_name(name).is_err(), "{name:?} should be rejected");
        }
        assert!(validate_file_name("license-2024.pdf").is_ok());
        assert!(validate_file_name("رخصة.pdf").is_ok());
    }

    #[tokio::test]
    async fn serves_existing_files_with_guessed_mime() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("license.pdf"), b"%PDF-1.7").expect("write file");
        let store = UploadStore::new(dir.path());

        let file = store.open("license.pdf").await.expect("file served");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = UploadStore::new(dir.path());
        match store.open("missing.png").await {
            Err(PortalError::NotFound { entity, .. }) => assert_eq!(entity, "upload"),
            other => panic!("expected not found, got {other:?}"),
        }
    }
}
