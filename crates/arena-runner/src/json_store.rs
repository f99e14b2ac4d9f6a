//! JSON-file session store — one pretty-printed document per session.
//!
//! Saves are idempotent overwrites keyed by session id, so the newest
//! snapshot always wins and a half-written negotiation is recovered from
//! whatever made it to disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use arena::{SessionSnapshot, SessionStore, StoreError};

/// Durable store writing each session to `<dir>/<session-id>.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Write(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Directory the store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Session ids are UUIDs; anything that could walk the filesystem is not
/// one of ours.
fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        if !valid_id(&snapshot.session_id) {
            return Err(StoreError::Write(format!(
                "refusing to write session id {:?}",
                snapshot.session_id
            )));
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let path = self.path_for(&snapshot.session_id);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StoreError::Write(format!("write {}: {e}", path.display())))?;
        debug!(session_id = %snapshot.session_id, path = %path.display(), "snapshot written");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        if !valid_id(id) {
            return Ok(None);
        }
        let path = self.path_for(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Read(format!("parse {}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(format!("read {}: {e}", path.display()))),
        }
    }
}
