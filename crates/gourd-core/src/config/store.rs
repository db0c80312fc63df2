use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use gourd_model::UpdateKind;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ConfigDocument, ConfigError, DESIRED, FromConfigValue, TWIN};

/// Durable holder of the desired configuration.
///
/// Readers get whole `Arc<ConfigDocument>` snapshots; writers build the next
/// document off to the side and swap it in, so a partially applied update is
/// never visible. Every committed change is written to disk (temp file + rename).
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<ConfigDocument>>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Store that never touches the filesystem.
    pub fn in_memory(doc: ConfigDocument) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(doc)),
            write_lock: Mutex::new(()),
        }
    }

    /// Load the document at `path`.
    ///
    /// A missing file starts an empty document. A file that is not a JSON
    /// object is moved aside to `<path>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let doc = match fs::read(&path) {
            Ok(bytes) => match parse(&bytes) {
                Ok(doc) => {
                    info!(path = %path.display(), "loaded persisted configuration");
                    doc
                }
                Err(err) => {
                    let aside = path.with_extension("json.corrupt");
                    warn!(path = %path.display(), aside = %aside.display(), error = %err, "persisted configuration is unreadable; starting empty");
                    if let Err(e) = fs::rename(&path, &aside) {
                        warn!(path = %path.display(), error = %e, "failed to move corrupt configuration aside");
                    }
                    ConfigDocument::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted configuration; starting empty");
                ConfigDocument::new()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(doc)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current document; cheap to clone and safe to hold across awaits.
    pub fn snapshot(&self) -> Arc<ConfigDocument> {
        self.current.read().unwrap().clone()
    }

    pub fn get_or<T: FromConfigValue>(&self, path: &str, default: T) -> T {
        self.snapshot().get_or(path, default)
    }

    /// Write one value and persist.
    ///
    /// On [`ConfigError::Persist`] the value is already live in memory.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let value = value.into();
        self.commit(|doc| {
            doc.set(path, value);
            Ok(())
        })
        .map(|_| ())
    }

    /// Apply a remote update and return the resulting snapshot.
    ///
    /// `Complete` replaces the whole `Twin` subtree; `Partial` deep-merges
    /// into `Twin|desired`. Both require a JSON object payload.
    pub fn apply_update(
        &self,
        kind: UpdateKind,
        payload: Value,
    ) -> Result<Arc<ConfigDocument>, ConfigError> {
        let Value::Object(payload) = payload else {
            return Err(ConfigError::InvalidPayload(format!(
                "{kind:?} update payload must be a JSON object"
            )));
        };
        self.commit(|doc| {
            match kind {
                UpdateKind::Complete => doc.replace(TWIN, payload),
                UpdateKind::Partial => doc.merge(DESIRED, payload),
            }
            Ok(())
        })
    }

    fn commit(
        &self,
        change: impl FnOnce(&mut ConfigDocument) -> Result<(), ConfigError>,
    ) -> Result<Arc<ConfigDocument>, ConfigError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut next = ConfigDocument::clone(&self.snapshot());
        change(&mut next)?;
        let next = Arc::new(next);
        *self.current.write().unwrap() = next.clone();

        self.persist(&next)?;
        Ok(next)
    }

    fn persist(&self, doc: &ConfigDocument) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fail = |source: io::Error| ConfigError::Persist {
            path: path.clone(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(&doc.to_value()).map_err(|e| fail(io::Error::other(e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(fail)?;
        fs::rename(&tmp, path).map_err(fail)?;

        debug!(path = %path.display(), "configuration persisted");
        Ok(())
    }
}

fn parse(bytes: &[u8]) -> Result<ConfigDocument, ConfigError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;
    ConfigDocument::from_value(value)
}
