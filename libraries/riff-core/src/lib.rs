//! Riff Player Core
//!
//! Platform-agnostic domain types and store contracts for Riff Player.
//!
//! The remote document store that owns tracks, users and boost levels is an
//! external collaborator. This crate only defines the narrow contract the
//! playback engine consumes ([`TrackStore`]) plus an in-memory implementation
//! used by tests and the offline renderer.
//!
//! # Example
//!
//! ```rust
//! use riff_core::{MemoryStore, Track, TrackStore, UserProfile};
//!
//! # async fn example() -> riff_core::Result<()> {
//! let store = MemoryStore::new();
//! store.insert_user(UserProfile::new("artist-1", "Some Artist"));
//! store.insert_track(Track::new("t1", "https://cdn.example.com/t1.mp3", "artist-1"));
//!
//! let track = store.fetch_track(&"t1".into()).await?;
//! store.increment_view(&track.id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{CoreError, Result};
pub use memory::{Catalog, MemoryStore};
pub use store::{LikeAction, TrackStore};
pub use types::{BoostLevels, MediaLocator, Track, TrackId, UserId, UserProfile};
