mod ids;
mod track;
mod user;

pub use ids::{TrackId, UserId};
pub use track::{BoostLevels, MediaLocator, Track};
pub use user::UserProfile;
