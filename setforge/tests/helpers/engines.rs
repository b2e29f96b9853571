//! Scripted analysis engine and faulty storage for pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use setforge::analysis::{AnalysisEngine, AnalysisError, TrackFeatures};
use setforge::models::{SessionId, StorageHandle};
use setforge::services::{FsTrackStore, StoreError, TrackStore};

pub fn features(bpm: f64, key: &str, energy: f64) -> TrackFeatures {
    TrackFeatures {
        bpm,
        key: key.to_string(),
        energy,
    }
}

/// Scripted behaviour for one file name
#[derive(Debug, Clone)]
pub enum Scripted {
    Features(TrackFeatures),
    Fail(String),
    /// Succeed after a delay
    Slow(Duration, TrackFeatures),
    /// Never return
    Hang,
    /// Panic inside the engine call
    Panic,
}

/// Engine whose result is chosen by the stored file name suffix
pub struct ScriptedEngine {
    script: HashMap<String, Scripted>,
    default: Scripted,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            default: Scripted::Features(features(120.0, "8B", 5.0)),
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, filename: &str, behaviour: Scripted) -> Self {
        self.script.insert(filename.to_string(), behaviour);
        self
    }

    pub fn with_default(mut self, behaviour: Scripted) -> Self {
        self.default = behaviour;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behaviour_for(&self, path: &Path) -> Scripted {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Stored names carry a "NNNN_" position prefix
        let original = name.split_once('_').map(|(_, rest)| rest).unwrap_or(&name);

        self.script
            .get(original)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Decrements the in-flight counter when the call ends or is cancelled
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn analyze(&self, path: &Path) -> Result<TrackFeatures, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        match self.behaviour_for(path) {
            Scripted::Features(features) => {
                // Yield so concurrent calls overlap
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(features)
            }
            Scripted::Fail(message) => Err(AnalysisError::Decode(message)),
            Scripted::Slow(delay, features) => {
                tokio::time::sleep(delay).await;
                Ok(features)
            }
            Scripted::Hang => std::future::pending().await,
            Scripted::Panic => panic!("engine crashed on {}", path.display()),
        }
    }
}

/// Filesystem store that refuses one file name
pub struct FailingStore {
    inner: FsTrackStore,
    fail_on: String,
    stored: AtomicUsize,
}

impl FailingStore {
    pub fn new(root: PathBuf, fail_on: &str) -> Self {
        Self {
            inner: FsTrackStore::new(root),
            fail_on: fail_on.to_string(),
            stored: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> usize {
        self.stored.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackStore for FailingStore {
    async fn store(
        &self,
        session_id: SessionId,
        position: usize,
        filename: &str,
        content: &[u8],
    ) -> Result<StorageHandle, StoreError> {
        if filename == self.fail_on {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        let handle = self.inner.store(session_id, position, filename, content).await?;
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn path_of(&self, handle: &StorageHandle) -> PathBuf {
        self.inner.path_of(handle)
    }

    async fn discard(&self, handle: &StorageHandle) -> Result<(), StoreError> {
        self.inner.discard(handle).await
    }

    async fn remove_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        self.inner.remove_session(session_id).await
    }
}
