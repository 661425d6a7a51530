//! The consolidated set of endpoints and its on-disk rendering

use crate::endpoint::Endpoint;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::{
    fmt,
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, error, info};

/// Identifies the object an endpoint was derived from
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub name: String,
    pub namespace: String,
    pub resource: String,
}

/// Controls whether a state change is flushed to disk immediately
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Write {
    Now,

    /// Leaves flushing to a later [`StateManager::force_write`], e.g. while
    /// seeding state from an initial list.
    Deferred,
}

/// Tracks endpoints for all watched objects and persists them as a single
/// YAML document
///
/// Clones share the same underlying state.
#[derive(Clone, Debug)]
pub struct StateManager(Arc<Mutex<Inner>>);

#[derive(Debug)]
struct Inner {
    endpoints: AHashMap<Key, Endpoint>,
    output: PathBuf,
}

#[derive(serde::Serialize)]
struct Document<'a> {
    endpoints: Vec<&'a Endpoint>,
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("failed to render endpoints: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to replace output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

// === impl Key ===

impl Key {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.name, self.namespace, self.resource)
    }
}

// === impl StateManager ===

impl StateManager {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self(Arc::new(Mutex::new(Inner {
            endpoints: AHashMap::new(),
            output: output.into(),
        })))
    }

    /// Records the endpoint for `key`.
    ///
    /// Returns false, without writing, if an identical endpoint is already
    /// recorded.
    pub fn add_or_update(&self, key: Key, endpoint: Endpoint, write: Write) -> bool {
        let mut inner = self.0.lock();
        if inner.endpoints.get(&key) == Some(&endpoint) {
            return false;
        }

        debug!(%key, "updating endpoint");
        inner.endpoints.insert(key, endpoint);
        if write == Write::Now {
            inner.write();
        }
        true
    }

    /// Forgets the endpoint for `key`, rewriting the output if one was
    /// recorded.
    pub fn remove(&self, key: &Key) -> bool {
        let mut inner = self.0.lock();
        if inner.endpoints.remove(key).is_none() {
            return false;
        }

        debug!(%key, "removed endpoint");
        inner.write();
        true
    }

    /// Writes the output file from the current state, regardless of whether
    /// anything has changed.
    pub fn force_write(&self) {
        self.0.lock().write();
    }

    pub fn get(&self, key: &Key) -> Option<Endpoint> {
        self.0.lock().endpoints.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().endpoints.is_empty()
    }

    /// Renders the document that would be written to the output file.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        self.0.lock().render()
    }
}

// === impl Inner ===

impl Inner {
    /// Write failures are logged and otherwise ignored; the next successful
    /// write reflects the full state.
    fn write(&self) {
        match self.try_write() {
            Ok(()) => info!(
                file = %self.output.display(),
                endpoints = self.endpoints.len(),
                "wrote endpoints",
            ),
            Err(error) => error!(%error, file = %self.output.display(), "failed to write endpoints"),
        }
    }

    fn try_write(&self) -> Result<(), WriteError> {
        let yaml = self.render()?;

        let dir = match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::Builder::new()
            .prefix(".gatus-sidecar")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        file.write_all(yaml.as_bytes())?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o644);
            file.as_file().set_permissions(perms)?;
        }

        file.persist(&self.output)?;
        Ok(())
    }

    fn render(&self) -> Result<String, serde_yaml::Error> {
        let mut endpoints = self.endpoints.iter().collect::<Vec<_>>();
        endpoints.sort_by(|(ka, a), (kb, b)| a.name.cmp(&b.name).then_with(|| ka.cmp(kb)));
        serde_yaml::to_string(&Document {
            endpoints: endpoints.into_iter().map(|(_, ep)| ep).collect(),
        })
    }
}
