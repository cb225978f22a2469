use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::card::Card;
use crate::config::{ConfigPaths, StorageOptions};

mod snapshot;

pub use snapshot::{SnapshotError, SNAPSHOT_VERSION};

const SNAPSHOT_TMP_EXTENSION: &str = "json.tmp";

/// Where the serialized card collection lives between runs.
///
/// The store never fails because of its backend: read trouble degrades to an
/// empty board, write trouble leaves the in-memory state authoritative for
/// the session.
pub trait SnapshotBackend {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, payload: &str) -> Result<()>;
    /// Short human label for log lines.
    fn describe(&self) -> String;
}

/// Snapshot file on disk. Writes go through a temp file and rename so a
/// crash mid-write cannot leave a torn snapshot behind.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotBackend for FileBackend {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        Ok(Some(raw))
    }

    fn write(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let tmp = self.path.with_extension(SNAPSHOT_TMP_EXTENSION);
        fs::write(&tmp, payload)
            .with_context(|| format!("writing snapshot temp file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing snapshot {}", self.path.display()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryBackend {
    cell: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.cell.lock().expect("backend lock poisoned").clone())
    }

    fn write(&self, payload: &str) -> Result<()> {
        *self.cell.lock().expect("backend lock poisoned") = Some(payload.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// The authoritative, ordered card collection, mirrored to the backend on
/// every mutation.
pub struct CardStore {
    cards: Vec<Card>,
    backend: Box<dyn SnapshotBackend>,
}

impl CardStore {
    /// Loads the persisted snapshot if the backend has one. Missing,
    /// malformed, or mismatched snapshots start an empty session-only board
    /// rather than failing startup.
    pub fn open(backend: Box<dyn SnapshotBackend>) -> Self {
        let cards = match backend.read() {
            Ok(Some(raw)) => match snapshot::decode(&raw) {
                Ok(cards) => cards,
                Err(err) => {
                    tracing::warn!(
                        backend = backend.describe(),
                        error = %err,
                        "discarding unreadable snapshot, starting empty"
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(
                    backend = backend.describe(),
                    error = %err,
                    "snapshot unavailable, starting empty"
                );
                Vec::new()
            }
        };
        tracing::debug!(count = cards.len(), "card store opened");
        Self { cards, backend }
    }

    /// Current board order: most recently created first, updates in place.
    pub fn list(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Replaces the entry with a matching id at its existing position, or
    /// inserts at the front. The stored copy's `updated_at` is overwritten
    /// with the commit time regardless of what the caller supplied.
    pub fn upsert(&mut self, card: Card) {
        let mut stored = card;
        stored.updated_at = time::OffsetDateTime::now_utc();
        match self.cards.iter().position(|c| c.id == stored.id) {
            Some(idx) => self.cards[idx] = stored,
            None => self.cards.insert(0, stored),
        }
        self.persist();
    }

    /// Deletes the entry with a matching id; absent ids are a silent no-op.
    pub fn remove(&mut self, id: Uuid) {
        let before = self.cards.len();
        self.cards.retain(|card| card.id != id);
        if self.cards.len() != before {
            self.persist();
        }
    }

    // Best-effort mirror of the whole collection. Failures stay inside the
    // store: the session keeps running on in-memory state.
    fn persist(&self) {
        let payload = match snapshot::encode(&self.cards) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize snapshot");
                return;
            }
        };
        if let Err(err) = self.backend.write(&payload) {
            tracing::warn!(
                backend = self.backend.describe(),
                error = %err,
                "failed to persist snapshot, keeping in-memory state"
            );
        }
    }
}

pub fn init(paths: &ConfigPaths, options: &StorageOptions) -> Result<CardStore> {
    let backend: Box<dyn SnapshotBackend> = if options.ephemeral {
        Box::new(MemoryBackend::new())
    } else {
        let path = if options.snapshot_path.as_os_str().is_empty() {
            paths.snapshot_path.clone()
        } else {
            options.snapshot_path.clone()
        };
        Box::new(FileBackend::new(path))
    };
    Ok(CardStore::open(backend))
}
