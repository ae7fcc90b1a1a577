//! Per-user podcast feeds.

pub mod error;
pub mod model;
pub mod store;

pub use error::FeedError;
pub use model::{Channel, Episode, PodcastFeed};
pub use store::{format_duration, EpisodeDraft, FeedStore};
