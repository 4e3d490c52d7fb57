// ABOUTME: Filesystem blob store for job code and output archives
// ABOUTME: Keys are "<job_id>/<file>"; writes are staged in a private temp file and renamed into place

use hill_core::ArtifactKind;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Result, StorageError};

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` as the `kind` artifact of `job_id`, replacing any previous blob.
    /// Returns the artifact reference recorded on the job.
    pub async fn put(&self, job_id: &str, kind: ArtifactKind, bytes: &[u8]) -> Result<String> {
        self.stage(job_id, kind, bytes).await?.commit().await
    }

    /// Write `bytes` to a temp file private to this call. Nothing is visible
    /// under the artifact's key until the returned handle is committed.
    pub async fn stage(
        &self,
        job_id: &str,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<StagedArtifact> {
        let dir = self.job_dir(job_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let tmp_path = dir.join(format!(
            ".{}.{}.partial",
            kind.file_name(),
            Uuid::new_v4().simple()
        ));
        if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(StagedArtifact {
            job_id: job_id.to_string(),
            kind,
            final_path: dir.join(kind.file_name()),
            tmp_path,
            size: bytes.len(),
        })
    }

    pub async fn get(&self, job_id: &str, kind: ArtifactKind) -> Result<Vec<u8>> {
        let path = self.path_for(job_id, kind)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::ArtifactMissing(kind.artifact_ref(job_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, job_id: &str, kind: ArtifactKind) -> Result<bool> {
        let path = self.path_for(job_id, kind)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Delete one artifact. Missing blobs are not an error.
    pub async fn remove(&self, job_id: &str, kind: ArtifactKind) -> Result<()> {
        let path = self.path_for(job_id, kind)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every artifact of a job
    pub async fn remove_all(&self, job_id: &str) -> Result<()> {
        let dir = self.job_dir(job_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to remove artifacts");
                Err(e.into())
            }
        }
    }

    fn path_for(&self, job_id: &str, kind: ArtifactKind) -> Result<PathBuf> {
        Ok(self.job_dir(job_id)?.join(kind.file_name()))
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf> {
        validate_key(job_id)?;
        Ok(self.root.join(job_id))
    }
}

/// An artifact written to disk but not yet published under its key
#[derive(Debug)]
pub struct StagedArtifact {
    job_id: String,
    kind: ArtifactKind,
    tmp_path: PathBuf,
    final_path: PathBuf,
    size: usize,
}

impl StagedArtifact {
    /// Reference the artifact will have once committed
    pub fn artifact_ref(&self) -> String {
        self.kind.artifact_ref(&self.job_id)
    }

    /// Publish under the artifact's key, replacing any previous blob
    pub async fn commit(self) -> Result<String> {
        if let Err(e) = tokio::fs::rename(&self.tmp_path, &self.final_path).await {
            let _ = tokio::fs::remove_file(&self.tmp_path).await;
            return Err(e.into());
        }

        debug!(job_id = %self.job_id, kind = self.kind.as_str(), size = self.size, "Artifact stored");
        Ok(self.artifact_ref())
    }

    /// Drop the temp file; the published blob, if any, is untouched
    pub async fn discard(self) -> Result<()> {
        match tokio::fs::remove_file(&self.tmp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Job ids become directory names; reject anything that could escape the root
fn validate_key(job_id: &str) -> Result<()> {
    let valid = !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidInput(format!(
            "invalid artifact key: {job_id}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let reference = store
            .put("job_abc", ArtifactKind::Code, b"archive bytes")
            .await
            .unwrap();
        assert_eq!(reference, "job_abc/code.tar.gz");
        assert!(dir.path().join("job_abc").join("code.tar.gz").exists());

        let bytes = store.get("job_abc", ArtifactKind::Code).await.unwrap();
        assert_eq!(bytes, b"archive bytes");

        assert!(store.exists("job_abc", ArtifactKind::Code).await.unwrap());
        assert!(!store.exists("job_abc", ArtifactKind::Output).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.put("job_1", ArtifactKind::Output, b"old").await.unwrap();
        store.put("job_1", ArtifactKind::Output, b"new").await.unwrap();

        let bytes = store.get("job_1", ArtifactKind::Output).await.unwrap();
        assert_eq!(bytes, b"new");
    }

    #[tokio::test]
    async fn test_discarded_stage_leaves_committed_blob() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let winner = store
            .stage("job_1", ArtifactKind::Output, b"winner")
            .await
            .unwrap();
        let loser = store
            .stage("job_1", ArtifactKind::Output, b"loser")
            .await
            .unwrap();
        assert_eq!(winner.artifact_ref(), "job_1/output.tar.gz");
        assert!(!store.exists("job_1", ArtifactKind::Output).await.unwrap());

        winner.commit().await.unwrap();
        loser.discard().await.unwrap();

        let bytes = store.get("job_1", ArtifactKind::Output).await.unwrap();
        assert_eq!(bytes, b"winner");
        assert_eq!(std::fs::read_dir(dir.path().join("job_1")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let result = store.get("job_none", ArtifactKind::Output).await;
        assert!(
            matches!(result, Err(StorageError::ArtifactMissing(r)) if r == "job_none/output.tar.gz")
        );
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        for key in ["../escape", "a/b", "", "job 1"] {
            let result = store.put(key, ArtifactKind::Code, b"x").await;
            assert!(
                matches!(result, Err(StorageError::InvalidInput(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_remove_all() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.put("job_1", ArtifactKind::Code, b"c").await.unwrap();
        store.put("job_1", ArtifactKind::Output, b"o").await.unwrap();

        store.remove_all("job_1").await.unwrap();
        assert!(!dir.path().join("job_1").exists());

        // Idempotent
        store.remove_all("job_1").await.unwrap();
        store.remove("job_1", ArtifactKind::Code).await.unwrap();
    }
}
