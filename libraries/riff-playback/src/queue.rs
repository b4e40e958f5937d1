//! Ordered, navigable track queue
//!
//! Insertion order is play order. The cursor is either unset or a valid
//! index; navigation never wraps.

use crate::error::{Boundary, PlaybackError, Result};
use riff_core::{Track, TrackId};

/// Queue of track snapshots with a cursor
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl TrackQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole queue
    ///
    /// The cursor lands on the first entry whose id is `start`, or is unset
    /// when no entry matches.
    pub fn set_queue(&mut self, tracks: Vec<Track>, start: &TrackId) {
        self.cursor = tracks.iter().position(|t| &t.id == start);
        self.tracks = tracks;
    }

    /// Advance the cursor
    ///
    /// From an unset cursor this moves to the first entry. Fails at the last
    /// entry (or on an empty queue) without moving.
    pub fn next(&mut self) -> Result<&Track> {
        let target = match self.cursor {
            None if !self.tracks.is_empty() => 0,
            Some(i) if i + 1 < self.tracks.len() => i + 1,
            _ => return Err(PlaybackError::QueueBoundary(Boundary::End)),
        };
        self.cursor = Some(target);
        Ok(&self.tracks[target])
    }

    /// Step the cursor back; fails at the first entry or with no cursor
    pub fn prev(&mut self) -> Result<&Track> {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                Ok(&self.tracks[i - 1])
            }
            _ => Err(PlaybackError::QueueBoundary(Boundary::Start)),
        }
    }

    /// Track at the cursor
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    /// Mutable track at the cursor
    pub fn current_mut(&mut self) -> Option<&mut Track> {
        self.cursor.and_then(|i| self.tracks.get_mut(i))
    }

    /// Cursor index
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether `next()` would succeed
    pub fn has_next(&self) -> bool {
        match self.cursor {
            None => !self.tracks.is_empty(),
            Some(i) => i + 1 < self.tracks.len(),
        }
    }

    /// Whether `prev()` would succeed
    pub fn has_prev(&self) -> bool {
        self.cursor.is_some_and(|i| i > 0)
    }

    /// All entries in play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Entry ids in play order
    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    /// Mutable entry by id (first match)
    pub fn get_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.id == id)
    }

    /// Drop every entry and unset the cursor
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
    }
}
