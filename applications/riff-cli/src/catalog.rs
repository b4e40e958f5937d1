//! JSON catalog file acting as the document store

use async_trait::async_trait;
use riff_core::{BoostLevels, LikeAction, MemoryStore, Result, Track, TrackId, TrackStore, UserId, UserProfile};
use std::path::{Path, PathBuf};

/// Document store loaded from (and optionally saved back to) a JSON catalog
#[derive(Debug)]
pub struct CatalogStore {
    store: MemoryStore,
    path: PathBuf,
}

impl CatalogStore {
    /// Read a catalog file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let json = std::fs::read_to_string(&path)?;
        let store = MemoryStore::from_json(&json)?;
        tracing::debug!(path = %path.display(), "Catalog loaded");
        Ok(Self { store, path })
    }

    /// Catalog file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative media locators resolve against
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Underlying in-memory documents
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Write the current documents (view counts, likes) back to the file
    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.store.to_json()?)?;
        tracing::info!(path = %self.path.display(), "Catalog saved");
        Ok(())
    }
}

#[async_trait]
impl TrackStore for CatalogStore {
    async fn fetch_track(&self, id: &TrackId) -> Result<Track> {
        self.store.fetch_track(id).await
    }

    async fn fetch_user(&self, id: &UserId) -> Result<UserProfile> {
        self.store.fetch_user(id).await
    }

    async fn fetch_boost_levels(&self) -> Result<BoostLevels> {
        self.store.fetch_boost_levels().await
    }

    async fn increment_view(&self, track_id: &TrackId) -> Result<()> {
        self.store.increment_view(track_id).await
    }

    async fn update_liked_set(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        action: LikeAction,
    ) -> Result<()> {
        self.store.update_liked_set(user_id, track_id, action).await
    }
}
