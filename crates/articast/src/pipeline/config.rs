use crate::config::Config;

pub struct PipelineConfig {
    pub max_chunk_size: usize,
    pub public_base_url: String,
    pub episode_author: String,
    pub owner_name: String,
    pub owner_email: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chunk_size: config.synthesis.max_chunk_size,
            public_base_url: config.storage.public_base_url.clone(),
            episode_author: config.feed.episode_author.clone(),
            owner_name: config.feed.owner_name.clone(),
            owner_email: config.feed.owner_email.clone(),
        }
    }
}
