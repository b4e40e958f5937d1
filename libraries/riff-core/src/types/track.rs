/// Track domain type
use crate::types::{TrackId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Boost levels as stored in the promoted-tracks document (track id → level)
pub type BoostLevels = BTreeMap<TrackId, u32>;

/// Where the media bytes for a track live
///
/// Either a remote URL or a local/blob reference. The engine never interprets
/// it; the platform decoder does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaLocator(String);

impl MediaLocator {
    /// Create a new locator
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Get the raw locator string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the locator points at a network resource
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only snapshot of a track document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    #[serde(default)]
    pub title: String,

    /// Media locator handed to the decoder
    pub url: MediaLocator,

    /// Owning artist (a user document)
    pub artist: UserId,

    /// Boost level (0 = not promoted)
    #[serde(default)]
    pub boost: u32,

    /// Cumulative play count
    #[serde(default)]
    pub views: u64,

    /// Users who liked this track
    #[serde(default)]
    pub liked: BTreeSet<UserId>,
}

impl Track {
    /// Create a new track snapshot with no views, likes or boost
    pub fn new(
        id: impl Into<TrackId>,
        url: impl Into<String>,
        artist: impl Into<UserId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            url: MediaLocator::new(url),
            artist: artist.into(),
            boost: 0,
            views: 0,
            liked: BTreeSet::new(),
        }
    }

    /// Builder-style title setter
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder-style boost setter
    #[must_use]
    pub fn with_boost(mut self, level: u32) -> Self {
        self.boost = level;
        self
    }

    /// Whether `user` is in the liker set
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked.contains(user)
    }
}
