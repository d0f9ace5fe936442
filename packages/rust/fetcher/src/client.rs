//! GraphQL client for the Omnivore API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use omnivook_shared::{
    ApiConfig, Article, LabelInput, OmnivookError, Result, SearchPage, resolve_api_key,
};

use crate::service::ArticleService;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("omnivook/", env!("CARGO_PKG_VERSION"));

const SEARCH_QUERY: &str = r#"
query Search($after: String, $first: Int, $query: String) {
  search(after: $after, first: $first, query: $query, includeContent: false) {
    ... on SearchSuccess {
      edges {
        cursor
        node { id slug title originalArticleUrl siteName }
      }
      pageInfo { hasNextPage endCursor totalCount }
    }
    ... on SearchError { errorCodes }
  }
}"#;

const VIEWER_QUERY: &str = r#"
query Viewer {
  me { profile { username } }
}"#;

const ARTICLE_QUERY: &str = r#"
query GetArticle($username: String!, $slug: String!, $format: String) {
  article(username: $username, slug: $slug, format: $format) {
    ... on ArticleSuccess {
      article {
        id slug title originalArticleUrl siteName content
        labels { name color description }
      }
    }
    ... on ArticleError { errorCodes }
  }
}"#;

const SET_LABELS_MUTATION: &str = r#"
mutation SetLabels($input: SetLabelsInput!) {
  setLabels(input: $input) {
    ... on SetLabelsSuccess { labels { name color description } }
    ... on SetLabelsError { errorCodes }
  }
}"#;

const ARCHIVE_MUTATION: &str = r#"
mutation SetLinkArchived($input: ArchiveLinkInput!) {
  setLinkArchived(input: $input) {
    ... on ArchiveLinkSuccess { linkId message }
    ... on ArchiveLinkError { message errorCodes }
  }
}"#;

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// A GraphQL union of `...Success` and `...Error` members.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Outcome<T> {
    Success(T),
    Failure(ServiceFailure),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceFailure {
    #[serde(default)]
    error_codes: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ServiceFailure {
    fn describe(&self) -> String {
        match (&self.message, self.error_codes.is_empty()) {
            (Some(msg), false) => format!("{msg} ({})", self.error_codes.join(", ")),
            (Some(msg), true) => msg.clone(),
            (None, false) => self.error_codes.join(", "),
            (None, true) => "unrecognized response".into(),
        }
    }
}

impl<T> Outcome<T> {
    fn into_result(self, operation: &str) -> Result<T> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(OmnivookError::api(operation, failure.describe())),
        }
    }
}

#[derive(Deserialize)]
struct SearchData {
    search: Outcome<SearchPage>,
}

#[derive(Deserialize)]
struct ViewerData {
    me: Viewer,
}

#[derive(Deserialize)]
struct Viewer {
    profile: Profile,
}

#[derive(Deserialize)]
struct Profile {
    username: String,
}

#[derive(Deserialize)]
struct ArticleData {
    article: Outcome<ArticleSuccess>,
}

#[derive(Deserialize)]
struct ArticleSuccess {
    article: Article,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetLabelsData {
    set_labels: Outcome<LabelsSuccess>,
}

#[derive(Deserialize)]
struct LabelsSuccess {
    #[allow(dead_code)]
    labels: Vec<LabelInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveData {
    set_link_archived: Outcome<ArchiveSuccess>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveSuccess {
    link_id: String,
}

// ---------------------------------------------------------------------------
// OmnivoreClient
// ---------------------------------------------------------------------------

/// Authenticated client for the article service's GraphQL API.
#[derive(Debug, Clone)]
pub struct OmnivoreClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    page_size: u32,
}

impl OmnivoreClient {
    /// Build a client for the configured endpoint using `api_key`.
    pub fn new(config: &ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OmnivookError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            page_size: config.page_size,
        })
    }

    /// Build a client reading the API key from the configured env vars.
    pub fn from_env(config: &ApiConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(config, api_key)
    }

    /// POST a GraphQL document and decode its `data` member.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        debug!(operation, "sending GraphQL request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header("Authorization", &self.api_key)
            .json(&json!({
                "operationName": operation,
                "query": query,
                "variables": variables,
            }))
            .send()
            .await
            .map_err(|e| OmnivookError::Network(format!("{operation}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OmnivookError::Network(format!(
                "{operation}: HTTP {status}"
            )));
        }

        let body: GraphQlResponse<T> = response.json().await.map_err(|e| {
            OmnivookError::api(operation, format!("failed to decode response: {e}"))
        })?;

        if !body.errors.is_empty() {
            let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(OmnivookError::api(operation, messages.join("; ")));
        }

        body.data
            .ok_or_else(|| OmnivookError::api(operation, "response has no data"))
    }
}

#[async_trait]
impl ArticleService for OmnivoreClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, after: &str) -> Result<SearchPage> {
        let data: SearchData = self
            .execute(
                "Search",
                SEARCH_QUERY,
                json!({ "after": after, "first": self.page_size, "query": query }),
            )
            .await?;
        data.search.into_result("Search")
    }

    async fn username(&self) -> Result<String> {
        let data: ViewerData = self.execute("Viewer", VIEWER_QUERY, json!({})).await?;
        Ok(data.me.profile.username)
    }

    #[instrument(skip(self))]
    async fn article(&self, username: &str, slug: &str) -> Result<Article> {
        let data: ArticleData = self
            .execute(
                "GetArticle",
                ARTICLE_QUERY,
                json!({ "username": username, "slug": slug, "format": "markdown" }),
            )
            .await?;
        Ok(data.article.into_result("GetArticle")?.article)
    }

    async fn set_labels(&self, article_id: &str, labels: &[LabelInput]) -> Result<()> {
        let data: SetLabelsData = self
            .execute(
                "SetLabels",
                SET_LABELS_MUTATION,
                json!({ "input": { "pageId": article_id, "labels": labels } }),
            )
            .await?;
        data.set_labels.into_result("SetLabels")?;
        Ok(())
    }

    async fn archive(&self, article_id: &str) -> Result<()> {
        let data: ArchiveData = self
            .execute(
                "SetLinkArchived",
                ARCHIVE_MUTATION,
                json!({ "input": { "linkId": article_id, "archived": true } }),
            )
            .await?;
        let success = data.set_link_archived.into_result("SetLinkArchived")?;
        debug!(link_id = %success.link_id, "article archived");
        Ok(())
    }
}
