use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::credential::Credential;
use crate::error::{ApiError, ApiResult};

/// Durable session slot shared by every tab of the same origin.
/// Writes are whole-record replacements; `clear` drops token, role and
/// profile together.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: &Credential) -> ApiResult<()>;
    fn clear(&self) -> ApiResult<()>;
}

pub type SharedCredentials = Arc<dyn CredentialStore>;

/// Process-local store. Clone the `Arc` to share it between tabs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn with(credential: Credential) -> Self { Self { slot: RwLock::new(Some(credential)) } }

    pub fn shared() -> Arc<Self> { Arc::new(Self::new()) }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Option<Credential> { self.slot.read().clone() }

    fn set(&self, credential: &Credential) -> ApiResult<()> {
        *self.slot.write() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        *self.slot.write() = None;
        Ok(())
    }
}

/// JSON file on disk. Every process opened on the same path sees the same
/// session. Records are written to a sibling temp file and renamed into place
/// so a concurrent reader sees either the old or the new record.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or("session.json");
        self.path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Option<Credential> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(target: "prolens::store", "cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        if text.trim().is_empty() { return None; }
        match serde_json::from_str::<Credential>(&text) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(target: "prolens::store", "ignoring corrupt credential file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, credential: &Credential) -> ApiResult<()> {
        let _guard = self.write_lock.lock();
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| ApiError::store(format!("create {}: {}", dir.display(), e)))?;
            }
        }
        let body = serde_json::to_vec_pretty(credential)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, body).map_err(|e| ApiError::store(format!("write {}: {}", tmp.display(), e)))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ApiError::store(format!("replace {}: {}", self.path.display(), e)));
        }
        debug!(target: "prolens::store", "credential written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        let _guard = self.write_lock.lock();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::store(format!("remove {}: {}", self.path.display(), e))),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
