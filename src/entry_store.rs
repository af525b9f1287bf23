//! Durable entry collection.
//!
//! The whole collection is persisted as one unit. Every mutation reloads the
//! latest persisted collection, applies its change and writes the collection
//! back, all while holding the store's write lock, so a change made through one
//! path is never overwritten by a stale copy held by another.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::diary_entry::{Analysis, DiaryEntry, EntryDraft, EntryPatch};
use crate::error::{DiaryError, Result};

/// Where the serialized collection lives.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn load(&self) -> Result<Vec<DiaryEntry>>;
    async fn save(&self, entries: &[DiaryEntry]) -> Result<()>;
}

/// Stores the collection as a JSON array in a single file.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    /// Unique per save, so stores sharing a file never write the same temp file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    async fn write_and_swap(&self, temp: &Path, serialized: &str) -> Result<()> {
        let mut file = fs::File::create(temp).await?;
        file.write_all(serialized.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<DiaryEntry>> {
        let serialized = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if serialized.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&serialized)?)
    }

    /// Writes a sibling temp file and renames it over the target, so a failed
    /// write leaves the previous collection intact.
    async fn save(&self, entries: &[DiaryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        let temp = self.temp_path();
        let result = self.write_and_swap(&temp, &serialized).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp).await {
                debug!(path = %temp.display(), error = %e, "temp file cleanup skipped");
            }
        }
        result
    }
}

/// Process-local backend, mostly for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Vec<DiaryEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<DiaryEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn save(&self, entries: &[DiaryEntry]) -> Result<()> {
        *self.entries.lock().await = entries.to_vec();
        Ok(())
    }
}

pub struct EntryStore {
    backend: Box<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl EntryStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        EntryStore {
            backend: Box::new(backend),
            write_lock: Mutex::new(()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileBackend::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// All entries, newest first.
    pub async fn list(&self) -> Result<Vec<DiaryEntry>> {
        let mut entries = self.backend.load().await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn get(&self, id: Uuid) -> Result<DiaryEntry> {
        self.backend
            .load()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or(DiaryError::NotFound(id))
    }

    pub async fn create(&self, draft: EntryDraft) -> Result<DiaryEntry> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.backend.load().await?;

        let entry = DiaryEntry::new(draft);
        entries.insert(0, entry.clone());
        self.backend.save(&entries).await?;

        info!(entry_id = %entry.id, title = %entry.title, "entry created");
        Ok(entry)
    }

    pub async fn update(&self, id: Uuid, patch: EntryPatch) -> Result<DiaryEntry> {
        self.modify(id, |entry| entry.apply(patch)).await
    }

    /// Removing an absent entry is a no-op.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.backend.load().await?;

        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            debug!(entry_id = %id, "delete of absent entry ignored");
            return Ok(());
        }

        self.backend.save(&entries).await?;
        info!(entry_id = %id, "entry deleted");
        Ok(())
    }

    /// Replaces any previous analysis on the entry.
    pub async fn attach_analysis(&self, id: Uuid, analysis: Analysis) -> Result<DiaryEntry> {
        self.modify(id, |entry| entry.attach_analysis(analysis)).await
    }

    /// Case-insensitive match over title, content and tags.
    pub async fn search(&self, query: &str) -> Result<Vec<DiaryEntry>> {
        let query = query.to_lowercase();
        let entries = self.list().await?;
        Ok(entries
            .into_iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&query)
                    || e.content.to_lowercase().contains(&query)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect())
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.save(&[]).await?;
        info!("all entries cleared");
        Ok(())
    }

    async fn modify<F>(&self, id: Uuid, change: F) -> Result<DiaryEntry>
    where
        F: FnOnce(&mut DiaryEntry),
    {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.backend.load().await?;

        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DiaryError::NotFound(id))?;
        change(entry);
        let updated = entry.clone();

        self.backend.save(&entries).await?;
        debug!(entry_id = %id, "entry updated");
        Ok(updated)
    }
}
