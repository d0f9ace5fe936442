use async_trait::async_trait;

use omnivook_shared::{Article, LabelInput, Result, SearchPage};

/// Operations omnivook performs against the article service.
///
/// Implemented by [`crate::OmnivoreClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait ArticleService: Send + Sync {
    /// Fetch one page of search results starting after `after`.
    async fn search(&self, query: &str, after: &str) -> Result<SearchPage>;

    /// Username of the account the credential belongs to.
    async fn username(&self) -> Result<String>;

    /// Fetch a single article with its markdown content.
    async fn article(&self, username: &str, slug: &str) -> Result<Article>;

    /// Attach labels to an article.
    async fn set_labels(&self, article_id: &str, labels: &[LabelInput]) -> Result<()>;

    /// Move an article to the archive.
    async fn archive(&self, article_id: &str) -> Result<()>;
}
