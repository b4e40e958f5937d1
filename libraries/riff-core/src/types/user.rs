/// User domain type
use crate::types::{TrackId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Snapshot of a user document (artists are users too)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique user identifier
    pub id: UserId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Tracks this user liked
    #[serde(default)]
    pub liked: BTreeSet<TrackId>,
}

impl UserProfile {
    /// Create a profile with an empty liked set
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            liked: BTreeSet::new(),
        }
    }
}
