//! Core domain types for articles retrieved from the read-it-later service.
//!
//! Field names follow the service's GraphQL schema (camelCase on the wire).

use serde::{Deserialize, Serialize};

/// Color applied to every label omnivook adds to an exported article.
const ADDED_LABEL_COLOR: &str = "#0000FF";

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// Summary of a saved article, as returned inside a search edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// Service-side identifier.
    pub id: String,
    /// URL slug, unique per user.
    pub slug: String,
    /// Article title.
    #[serde(default)]
    pub title: String,
    /// Where the article was originally published.
    #[serde(default)]
    pub original_article_url: String,
    /// Publishing site, used as the book's author list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

/// One edge of a paginated search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEdge {
    /// Opaque per-edge cursor.
    #[serde(default)]
    pub cursor: String,
    /// The matched article.
    pub node: SearchItem,
}

/// Pagination metadata of a search page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows this one.
    pub has_next_page: bool,
    /// Cursor to pass as `after` for the next page.
    #[serde(default)]
    pub end_cursor: Option<String>,
    /// Total number of matches across all pages.
    #[serde(default)]
    pub total_count: Option<usize>,
}

/// A single page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub edges: Vec<SearchEdge>,
    pub page_info: PageInfo,
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A label attached to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInput {
    pub name: String,
    pub color: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl LabelInput {
    /// Label in the form omnivook adds to exported articles.
    pub fn exported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: ADDED_LABEL_COLOR.to_string(),
            description: String::new(),
        }
    }
}

/// Full article with its markdown content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_article_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    /// Markdown rendering of the article body.
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<LabelInput>,
}

impl Article {
    /// Render the article as the markdown document written to the source tree.
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}\n\n{}\n\n{}\n",
            self.title, self.original_article_url, self.content
        )
    }
}

/// The service sends `null` for empty label lists and descriptions.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
