//! One JSON file per followed account, named `<handle>.json`.
//!
//! Writes go to a hidden temp file in the same directory and are renamed into place,
//! so a reader never sees a half-written document.
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No file existed for this handle before the write.
    New,
    /// An existing file was replaced.
    Updated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot create account directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot serialize account {handle}: {source}")]
    Serialize {
        handle: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AccountStore {
    dir: PathBuf,
}

impl AccountStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, handle: &str) -> PathBuf {
        self.dir.join(format!("{handle}.json"))
    }

    /// Write `payload` as pretty-printed JSON, replacing any previous version.
    pub async fn persist(&self, handle: &str, payload: &Value) -> Result<WriteOutcome, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(handle);
        let existed = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        let bytes = serde_json::to_vec_pretty(payload).map_err(|source| StoreError::Serialize {
            handle: handle.to_string(),
            source,
        })?;

        let tmp = self.dir.join(format!(".{handle}.json.tmp"));
        let write = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &path).await
        };
        if let Err(source) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Write { path, source });
        }

        let outcome = if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::New
        };
        tracing::debug!(handle, path = %path.display(), ?outcome, "store.write");
        Ok(outcome)
    }
}
