//! Store contract consumed by the playback engine

use crate::error::Result;
use crate::types::{BoostLevels, Track, TrackId, UserId, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Direction of a like-set update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LikeAction {
    /// Add the user/track pair
    Add,
    /// Remove the user/track pair
    Remove,
}

/// Remote document store holding track, user and boost records
///
/// Reads return owned snapshots; the engine never holds references into the
/// store. Missing documents map to [`CoreError::TrackNotFound`] /
/// [`CoreError::UserNotFound`].
///
/// [`CoreError::TrackNotFound`]: crate::CoreError::TrackNotFound
/// [`CoreError::UserNotFound`]: crate::CoreError::UserNotFound
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Fetch a track snapshot
    async fn fetch_track(&self, id: &TrackId) -> Result<Track>;

    /// Fetch a user (or artist) snapshot
    async fn fetch_user(&self, id: &UserId) -> Result<UserProfile>;

    /// Fetch the promoted-tracks document
    async fn fetch_boost_levels(&self) -> Result<BoostLevels>;

    /// Increment a track's view counter by one
    async fn increment_view(&self, track_id: &TrackId) -> Result<()>;

    /// Add or remove a like on both the user and the track documents
    async fn update_liked_set(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        action: LikeAction,
    ) -> Result<()>;
}
