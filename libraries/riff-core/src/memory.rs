//! In-memory [`TrackStore`] implementation
//!
//! Backs the offline renderer and the test suites. Mirrors the document layout
//! of the remote store: a track collection, a user collection and a single
//! promoted-tracks document.

use crate::error::{CoreError, Result};
use crate::store::{LikeAction, TrackStore};
use crate::types::{BoostLevels, Track, TrackId, UserId, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct Documents {
    tracks: HashMap<TrackId, Track>,
    users: HashMap<UserId, UserProfile>,
    boost: BoostLevels,
}

/// Serializable snapshot of a whole store (used for JSON catalogs)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Track documents
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// User documents
    #[serde(default)]
    pub users: Vec<UserProfile>,
    /// Promoted-tracks document
    #[serde(default)]
    pub boost: BoostLevels,
}

/// Thread-safe in-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a catalog snapshot
    pub fn from_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        for user in catalog.users {
            store.insert_user(user);
        }
        for track in catalog.tracks {
            store.insert_track(track);
        }
        for (id, level) in catalog.boost {
            store.set_boost_level(id, level);
        }
        store
    }

    /// Parse a JSON catalog
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        Ok(Self::from_catalog(catalog))
    }

    /// Insert or replace a track document
    ///
    /// A track with a non-zero boost is also recorded in the promoted-tracks
    /// document.
    pub fn insert_track(&self, track: Track) {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if track.boost > 0 {
            docs.boost.insert(track.id.clone(), track.boost);
        }
        docs.tracks.insert(track.id.clone(), track);
    }

    /// Insert or replace a user document
    pub fn insert_user(&self, user: UserProfile) {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        docs.users.insert(user.id.clone(), user);
    }

    /// Set a level in the promoted-tracks document (0 removes the entry)
    pub fn set_boost_level(&self, id: impl Into<TrackId>, level: u32) {
        let id = id.into();
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if level == 0 {
            docs.boost.remove(&id);
        } else {
            docs.boost.insert(id, level);
        }
    }

    /// Make every subsequent write fail (simulates an unreachable backend)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current snapshot of a track, if present
    pub fn track(&self, id: &TrackId) -> Option<Track> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        docs.tracks.get(id).cloned()
    }

    /// Current snapshot of a user, if present
    pub fn user(&self, id: &UserId) -> Option<UserProfile> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        docs.users.get(id).cloned()
    }

    /// Snapshot every document, tracks and users sorted by id
    pub fn catalog(&self) -> Catalog {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        let mut tracks: Vec<Track> = docs.tracks.values().cloned().collect();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        let mut users: Vec<UserProfile> = docs.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));

        Catalog {
            tracks,
            users,
            boost: docs.boost.clone(),
        }
    }

    /// Serialize the whole store as a JSON catalog
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.catalog())?)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::write("store is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackStore for MemoryStore {
    async fn fetch_track(&self, id: &TrackId) -> Result<Track> {
        self.track(id)
            .ok_or_else(|| CoreError::TrackNotFound(id.clone()))
    }

    async fn fetch_user(&self, id: &UserId) -> Result<UserProfile> {
        self.user(id).ok_or_else(|| CoreError::UserNotFound(id.clone()))
    }

    async fn fetch_boost_levels(&self) -> Result<BoostLevels> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.boost.clone())
    }

    async fn increment_view(&self, track_id: &TrackId) -> Result<()> {
        self.check_writable()?;
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        let track = docs
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| CoreError::TrackNotFound(track_id.clone()))?;
        track.views += 1;
        tracing::debug!(track = %track_id, views = track.views, "View count incremented");
        Ok(())
    }

    async fn update_liked_set(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        action: LikeAction,
    ) -> Result<()> {
        self.check_writable()?;
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);

        if !docs.users.contains_key(user_id) {
            return Err(CoreError::UserNotFound(user_id.clone()));
        }
        if !docs.tracks.contains_key(track_id) {
            return Err(CoreError::TrackNotFound(track_id.clone()));
        }

        if let Some(user) = docs.users.get_mut(user_id) {
            match action {
                LikeAction::Add => user.liked.insert(track_id.clone()),
                LikeAction::Remove => user.liked.remove(track_id),
            };
        }
        if let Some(track) = docs.tracks.get_mut(track_id) {
            match action {
                LikeAction::Add => track.liked.insert(user_id.clone()),
                LikeAction::Remove => track.liked.remove(user_id),
            };
        }
        Ok(())
    }
}
