//! Contract for the article-text extraction engine.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to fetch article: {0}")]
    Fetch(String),

    #[error("article has no readable content")]
    NoContent,
}

/// Turns an article URL into cleaned plain text.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, ExtractError>;
}
