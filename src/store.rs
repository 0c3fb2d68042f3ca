//! Session-scoped persistence of in-progress answers.
//!
//! `KeyValueStore` is the raw capability (in-memory or one file per key).
//! `ResponseStore` keeps the whole response collection as one JSON blob under
//! a fixed key, namespaced by the browser session. Every save overwrites the
//! full collection.
//!
//! Entries are not kept forever: `evict_idle` drops keys that have not been
//! written for longer than the session TTL.

use std::{
  collections::HashMap,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::Arc,
  time::{Duration, Instant, SystemTime},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::domain::Response;

/// Fixed storage key of the response collection.
pub const RESPONSES_KEY: &str = "questionnaireResponses";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to serialize responses: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
  async fn remove(&self, key: &str) -> Result<(), StoreError>;
  /// Removes entries last written at least `max_idle` ago. Returns how many went.
  async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StoreError>;
}

struct MemoryEntry {
  value: String,
  written: Instant,
}

/// Process-local store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
  entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.entries.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.len().await == 0
  }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.entries.read().await.get(key).map(|e| e.value.clone()))
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let entry = MemoryEntry { value: value.to_string(), written: Instant::now() };
    self.entries.write().await.insert(key.to_string(), entry);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.entries.write().await.remove(key);
    Ok(())
  }

  async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StoreError> {
    let mut entries = self.entries.write().await;
    let before = entries.len();
    entries.retain(|_, e| e.written.elapsed() < max_idle);
    Ok(before - entries.len())
  }
}

/// One file per key under `dir`.
#[derive(Clone, Debug)]
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    let name: String = key
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
      .collect();
    self.dir.join(format!("{name}.json"))
  }
}

#[async_trait]
impl KeyValueStore for FileStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(self.path_for(key)).await {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(&self.dir).await?;
    tokio::fs::write(self.path_for(key), value).await?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), StoreError> {
    match tokio::fs::remove_file(self.path_for(key)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  /// Age is taken from the file's modification time.
  async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StoreError> {
    let mut dir = match tokio::fs::read_dir(&self.dir).await {
      Ok(d) => d,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
      Err(e) => return Err(e.into()),
    };
    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = dir.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let modified = entry.metadata().await?.modified()?;
      let idle = now.duration_since(modified).unwrap_or(Duration::ZERO);
      if idle < max_idle {
        continue;
      }
      match tokio::fs::remove_file(&path).await {
        Ok(()) => removed += 1,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
      }
    }
    Ok(removed)
  }
}

/// The response collection of one browser session.
#[derive(Clone)]
pub struct ResponseStore {
  kv: Arc<dyn KeyValueStore>,
  key: String,
}

impl ResponseStore {
  pub fn new(kv: Arc<dyn KeyValueStore>, session: &str) -> Self {
    Self { kv, key: format!("{session}.{RESPONSES_KEY}") }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  /// Stored collection, or `None` when nothing usable is stored.
  /// A blob that fails to parse counts as absent.
  #[instrument(level = "debug", skip(self), fields(key = %self.key))]
  pub async fn load(&self) -> Result<Option<Vec<Response>>, StoreError> {
    let Some(raw) = self.kv.get(&self.key).await? else {
      return Ok(None);
    };
    match serde_json::from_str::<Vec<Response>>(&raw) {
      Ok(responses) => {
        debug!(target: "questionnaire", count = responses.len(), "Loaded stored responses");
        Ok(Some(responses))
      }
      Err(e) => {
        warn!(target: "questionnaire", key = %self.key, error = %e, "Discarding malformed stored responses");
        Ok(None)
      }
    }
  }

  #[instrument(level = "debug", skip(self, responses), fields(key = %self.key, count = responses.len()))]
  pub async fn save(&self, responses: &[Response]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(responses)?;
    self.kv.set(&self.key, &raw).await
  }

  #[instrument(level = "debug", skip(self), fields(key = %self.key))]
  pub async fn clear(&self) -> Result<(), StoreError> {
    self.kv.remove(&self.key).await
  }
}
