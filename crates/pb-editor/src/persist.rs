//! Debounced persistence of document snapshots.
//!
//! Saving is decoupled from editing: every history operation hands the
//! serialized document to [`DebouncedSave::schedule`], which restarts a
//! timer. Only the snapshot that survives a quiet period is written.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Key-value sink for serialized state.
pub trait StateStore: Send + Sync {
    fn save(&self, key: &str, json: &str) -> Result<(), String>;
}

/// Writes each key to `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a previously saved value. A missing file is `Ok(None)`.
    pub fn load(&self, key: &str) -> Result<Option<String>, String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("cannot read {}: {e}", path.display())),
        }
    }
}

impl StateStore for FileStore {
    fn save(&self, key: &str, json: &str) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("cannot create {}: {e}", self.dir.display()))?;
        let path = self.path_for(key);
        std::fs::write(&path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))
    }
}

/// In-memory store recording every write. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    writes: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes so far, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Most recent value written under `key`.
    pub fn last(&self, key: &str) -> Option<String> {
        self.writes().into_iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl StateStore for MemoryStore {
    fn save(&self, key: &str, json: &str) -> Result<(), String> {
        self.writes
            .lock()
            .map_err(|_| "memory store lock poisoned".to_string())?
            .push((key.to_string(), json.to_string()));
        Ok(())
    }
}

/// Restartable timer that writes the latest snapshot after a quiet period.
pub struct DebouncedSave {
    store: Arc<dyn StateStore>,
    key: String,
    delay: Duration,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
}

impl DebouncedSave {
    /// Bind to the current tokio runtime. Fails outside one.
    pub fn new(
        store: Arc<dyn StateStore>,
        key: impl Into<String>,
        delay: Duration,
    ) -> Result<Self, String> {
        let runtime = Handle::try_current()
            .map_err(|e| format!("debounced save needs a tokio runtime: {e}"))?;
        Ok(Self {
            store,
            key: key.into(),
            delay,
            runtime,
            pending: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace any pending write with `snapshot` and restart the delay.
    pub fn schedule(&mut self, snapshot: String) {
        self.cancel();
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let delay = self.delay;
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match store.save(&key, &snapshot) {
                Ok(()) => log::debug!("saved `{key}` ({} bytes)", snapshot.len()),
                Err(e) => log::error!("failed to save `{key}`: {e}"),
            }
        }));
    }

    /// Drop the pending write, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl std::fmt::Debug for DebouncedSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedSave")
            .field("key", &self.key)
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn rapid_schedules_coalesce() {
        let store = MemoryStore::new();
        let mut save = DebouncedSave::new(Arc::new(store.clone()), "state", DELAY).unwrap();

        save.schedule("one".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        save.schedule("two".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        save.schedule("three".into());
        assert!(save.is_pending());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(store.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.writes(), vec![("state".to_string(), "three".to_string())]);
        assert!(!save.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_write() {
        let store = MemoryStore::new();
        let mut save = DebouncedSave::new(Arc::new(store.clone()), "state", DELAY).unwrap();
        save.schedule("draft".into());
        save.cancel();
        tokio::time::sleep(DELAY * 2).await;
        assert!(store.writes().is_empty());
    }

    #[test]
    fn needs_a_runtime() {
        let err = DebouncedSave::new(Arc::new(MemoryStore::new()), "state", DELAY).unwrap_err();
        assert!(err.contains("tokio runtime"), "{err}");
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pb-editor-store-{}", std::process::id()));
        let store = FileStore::new(&dir);
        assert_eq!(store.load("missing").unwrap(), None);

        store.save("builder", r#"{"name":"A"}"#).unwrap();
        assert_eq!(store.path_for("builder"), dir.join("builder.json"));
        assert_eq!(store.load("builder").unwrap().as_deref(), Some(r#"{"name":"A"}"#));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
