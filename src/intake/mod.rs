//! Artifact Intake
//!
//! Stages uploaded images under collision-resistant names and hands back a
//! handle whose release is guaranteed on every exit path. Staged files are
//! transient: none may outlive the request that created it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Declared media types accepted for analysis
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Multipart body carried no binary payload field
    #[error("no file uploaded")]
    NoFile,

    /// Declared media type is not an accepted image type
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("failed to stage upload")]
    Io(#[from] std::io::Error),
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::NoFile => ApiError::NoFile,
            IntakeError::UnsupportedType(_) => ApiError::UnsupportedFileType,
            IntakeError::Io(io) => ApiError::Upload(io),
        }
    }
}

/// Staging directory for in-flight uploads
#[derive(Clone)]
pub struct ArtifactStaging {
    dir: PathBuf,
}

impl ArtifactStaging {
    /// Open the staging directory, creating it if absent
    pub async fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload to the staging directory.
    ///
    /// The declared media type is checked before anything touches the
    /// filesystem; a partial write is removed before the error surfaces.
    /// Names are a fresh UUID plus the original extension, so concurrent
    /// requests cannot collide.
    pub async fn stage(
        &self,
        bytes: &[u8],
        media_type: &str,
        original_name: Option<&str>,
    ) -> Result<StagedArtifact, IntakeError> {
        if !ACCEPTED_IMAGE_TYPES.contains(&media_type) {
            return Err(IntakeError::UnsupportedType(media_type.to_string()));
        }

        let mut file_name = Uuid::new_v4().to_string();
        if let Some(ext) = original_name.and_then(extension_of) {
            file_name.push('.');
            file_name.push_str(ext);
        }
        let path = self.dir.join(file_name);

        if let Err(err) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(IntakeError::Io(err));
        }

        Ok(StagedArtifact {
            path,
            media_type: media_type.to_string(),
            size_bytes: bytes.len() as u64,
            released: false,
        })
    }
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

/// A staged upload with scoped lifetime.
///
/// `release` deletes the file and is idempotent; `Drop` performs a
/// best-effort removal as a backstop for panic and cancellation paths.
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
    media_type: String,
    size_bytes: u64,
    released: bool,
}

impl StagedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Read the staged bytes back for dispatch
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Delete the staged file. Releasing twice, or releasing a file that
    /// is already gone, is not an error.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = tokio::fs::remove_file(&self.path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::error!("Failed to delete staged file {:?}: {}", self.path, err);
            }
        }
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
