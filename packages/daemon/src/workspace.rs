// ABOUTME: Local staging directory for the job in flight
// ABOUTME: Wipes and recreates code/ and output/, unpacks code archives, packs output archives

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Workspace IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Archive(String),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// One daemon's workspace. Only one job is staged at a time.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Relative roots are resolved against the current directory so they can
    /// be handed to the container runtime as bind sources.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn code_dir(&self) -> PathBuf {
        self.root.join("code")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Discard whatever the previous job left behind and recreate empty dirs
    pub async fn reset(&self) -> WorkspaceResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::fs::create_dir_all(self.code_dir()).await?;
        tokio::fs::create_dir_all(self.output_dir()).await?;
        debug!(root = %self.root.display(), "Workspace reset");
        Ok(())
    }

    /// Unpack a gzip tar archive into `code/`
    pub async fn unpack_code(&self, archive: Vec<u8>) -> WorkspaceResult<()> {
        let dest = self.code_dir();
        tokio::task::spawn_blocking(move || unpack_archive(&archive, &dest))
            .await
            .map_err(|e| WorkspaceError::Archive(e.to_string()))?
    }

    /// Pack everything under `output/` into one gzip tar archive
    pub async fn pack_output(&self) -> WorkspaceResult<Vec<u8>> {
        let source = self.output_dir();
        tokio::task::spawn_blocking(move || pack_directory(&source))
            .await
            .map_err(|e| WorkspaceError::Archive(e.to_string()))?
    }
}

pub fn unpack_archive(archive: &[u8], dest: &Path) -> WorkspaceResult<()> {
    std::fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(archive));
    archive
        .unpack(dest)
        .map_err(|e| WorkspaceError::Archive(e.to_string()))
}

/// Symlinks are archived as links. Job containers write `output/`, so a link
/// there must never pull a host file into the archive.
pub fn pack_directory(source: &Path) -> WorkspaceResult<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", source)
        .map_err(|e| WorkspaceError::Archive(e.to_string()))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| WorkspaceError::Archive(e.to_string()))?;
    Ok(encoder.finish()?)
}
