use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, Utc};
use tracing::{debug, info, warn};

use super::error::FeedError;
use super::model::{
    AtomLink, Channel, Enclosure, Episode, Guid, Owner, PodcastFeed, AUDIO_MIME_TYPE,
    RSS_MIME_TYPE,
};
use crate::config::FeedSettings;
use crate::storage::{feed_key, public_url, BlobStore};

/// What the pipeline knows about a finished episode.
#[derive(Debug, Clone)]
pub struct EpisodeDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub audio_url: String,
    /// Size of the audio object, when known.
    pub length_bytes: Option<u64>,
    pub duration_secs: f64,
}

/// Formats seconds as zero-padded `HH:MM:SS`. Fractions are truncated;
/// negative and non-finite input counts as zero.
pub fn format_duration(duration_secs: f64) -> String {
    let total = if duration_secs.is_finite() && duration_secs > 0.0 {
        duration_secs.trunc() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn fill_if_empty(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

/// Reads, extends and persists per-user podcast feeds.
pub struct FeedStore {
    storage: Arc<dyn BlobStore>,
    settings: FeedSettings,
    public_base_url: String,
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FeedStore {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        settings: FeedSettings,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            settings,
            public_base_url: public_base_url.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Public URL of the user's feed document.
    pub fn feed_url(&self, user_id: &str) -> String {
        public_url(&self.public_base_url, &feed_key(user_id))
    }

    fn default_channel(&self, user_id: &str, name: &str, email: &str) -> Channel {
        Channel {
            title: format!("{}'s Articles", name),
            link: self.settings.site_link.clone(),
            language: self.settings.language.clone(),
            copyright: format!("© {} {}", Utc::now().year(), name),
            author: name.to_string(),
            description: format!("{}'s articles", name),
            image_href: self.settings.cover_image_url.clone(),
            category: self.settings.category.clone(),
            explicit: "false".to_string(),
            self_link: AtomLink {
                href: self.feed_url(user_id),
                rel: "self".to_string(),
                link_type: RSS_MIME_TYPE.to_string(),
            },
            owner: Owner {
                name: name.to_string(),
                email: email.to_string(),
            },
            episodes: Vec::new(),
        }
    }

    /// A new, empty feed for `user_id`. Nothing is persisted.
    pub fn create(&self, user_id: &str, name: &str, email: &str) -> PodcastFeed {
        PodcastFeed {
            channel: self.default_channel(user_id, name, email),
        }
    }

    /// Fills every empty channel field from the creation defaults.
    fn apply_defaults(&self, feed: &mut PodcastFeed, user_id: &str, name: &str, email: &str) {
        let defaults = self.default_channel(user_id, name, email);
        let channel = &mut feed.channel;

        fill_if_empty(&mut channel.title, &defaults.title);
        fill_if_empty(&mut channel.link, &defaults.link);
        fill_if_empty(&mut channel.language, &defaults.language);
        fill_if_empty(&mut channel.copyright, &defaults.copyright);
        fill_if_empty(&mut channel.author, &defaults.author);
        fill_if_empty(&mut channel.description, &defaults.description);
        fill_if_empty(&mut channel.image_href, &defaults.image_href);
        fill_if_empty(&mut channel.category, &defaults.category);
        fill_if_empty(&mut channel.explicit, &defaults.explicit);
        fill_if_empty(&mut channel.self_link.href, &defaults.self_link.href);
        fill_if_empty(&mut channel.self_link.rel, &defaults.self_link.rel);
        fill_if_empty(&mut channel.self_link.link_type, &defaults.self_link.link_type);
        fill_if_empty(&mut channel.owner.name, &defaults.owner.name);
        fill_if_empty(&mut channel.owner.email, &defaults.owner.email);
    }

    /// Loads the user's stored feed, or builds a fresh one if none exists.
    ///
    /// A stored document that does not parse is an error; it is never
    /// silently replaced.
    pub async fn get_or_create(
        &self,
        user_id: &str,
        name: &str,
        email: &str,
    ) -> Result<PodcastFeed, FeedError> {
        let key = feed_key(user_id);
        if !self.storage.exists(&key).await? {
            debug!(user = %user_id, "No stored feed, creating a new one");
            return Ok(self.create(user_id, name, email));
        }

        let bytes = self.storage.get(&key).await?;
        let xml = String::from_utf8(bytes)
            .map_err(|e| FeedError::Parse(format!("feed is not valid UTF-8: {}", e)))?;
        let mut feed = PodcastFeed::from_xml(&xml)?;
        self.apply_defaults(&mut feed, user_id, name, email);
        Ok(feed)
    }

    /// Prepends a new episode, so the item list stays newest first.
    pub fn add_episode(&self, feed: &mut PodcastFeed, draft: EpisodeDraft) {
        let now = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let guid = format!(
            "{}/{}-{}",
            self.settings.site_link.trim_end_matches('/'),
            now.format("%Y%m%d%H%M%S%6f"),
            &suffix[..8]
        );

        let episode = Episode {
            title: draft.title,
            description: draft.description,
            pub_date: now.to_rfc2822(),
            enclosure: Enclosure {
                url: draft.audio_url,
                length: draft.length_bytes.unwrap_or(0).to_string(),
                mime_type: AUDIO_MIME_TYPE.to_string(),
            },
            guid: Guid {
                value: guid,
                is_permalink: Some(false),
            },
            author: draft.author,
            duration: format_duration(draft.duration_secs),
            explicit: "false".to_string(),
        };

        feed.channel.episodes.insert(0, episode);
    }

    /// Serializes the whole document and overwrites the stored copy.
    pub async fn save(&self, user_id: &str, feed: &PodcastFeed) -> Result<(), FeedError> {
        for episode in feed.episodes() {
            if episode.duration.trim().is_empty() {
                warn!(title = %episode.title, "Feed item has no duration");
            }
            if episode.author.trim().is_empty() {
                warn!(title = %episode.title, "Feed item has no author");
            }
        }

        let xml = feed.to_xml()?;
        self.storage.put(&feed_key(user_id), xml.as_bytes()).await?;
        debug!(user = %user_id, episodes = feed.episodes().len(), "Feed saved");
        Ok(())
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        match self.user_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Feed lock table was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.lock_table().entry(user_id.to_string()).or_default())
    }

    /// Forgets the user's lock once no append holds or awaits it.
    fn release_user_lock(&self, user_id: &str) {
        let mut locks = self.lock_table();
        let idle = locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.lock_table().len()
    }

    /// Load, prepend and save as one step per user, so concurrent
    /// completions for the same user never drop each other's episodes.
    pub async fn append_episode(
        &self,
        user_id: &str,
        name: &str,
        email: &str,
        draft: EpisodeDraft,
    ) -> Result<PodcastFeed, FeedError> {
        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_unlocked(user_id, name, email, draft).await
        };
        drop(lock);
        self.release_user_lock(user_id);
        result
    }

    async fn append_unlocked(
        &self,
        user_id: &str,
        name: &str,
        email: &str,
        draft: EpisodeDraft,
    ) -> Result<PodcastFeed, FeedError> {
        let mut feed = self.get_or_create(user_id, name, email).await?;
        let title = draft.title.clone();
        self.add_episode(&mut feed, draft);
        self.save(user_id, &feed).await?;

        info!(
            user = %user_id,
            title = %title,
            episodes = feed.episodes().len(),
            "Episode added to feed"
        );
        Ok(feed)
    }
}
