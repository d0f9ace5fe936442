//! Pagination over the search API and markdown materialization.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use omnivook_shared::{LabelInput, OmnivookError, Result, SearchItem};

use crate::service::ArticleService;

/// Cursor sent with the first search request.
pub const SEARCH_START_CURSOR: &str = "0";

/// Mutations applied to each article after it has been written to disk.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Labels attached to every exported article.
    pub add_labels: Vec<String>,
    /// Archive every exported article.
    pub archive: bool,
}

/// Collect every search result for `query`, following cursors until the last page.
///
/// The accumulated count must equal the total the service reports on the
/// final page; a mismatch is returned as [`OmnivookError::Consistency`].
#[instrument(skip(service))]
pub async fn search_all<S>(service: &S, query: &str) -> Result<Vec<SearchItem>>
where
    S: ArticleService + ?Sized,
{
    let mut items = Vec::new();
    let mut after = SEARCH_START_CURSOR.to_string();

    loop {
        let page = service.search(query, &after).await?;
        debug!(after = %after, edges = page.edges.len(), "search page received");
        items.extend(page.edges.into_iter().map(|edge| edge.node));

        if page.page_info.has_next_page {
            after = page.page_info.end_cursor.ok_or_else(|| {
                OmnivookError::api("search", "hasNextPage set without an endCursor")
            })?;
            continue;
        }

        let reported = page.page_info.total_count.unwrap_or(items.len());
        if reported != items.len() {
            return Err(OmnivookError::Consistency {
                fetched: items.len(),
                reported,
            });
        }

        info!(count = items.len(), "articles retrieved");
        return Ok(items);
    }
}

/// Download every article in `items` and write it as `{ordinal}_{slug}.md`
/// inside `source_dir`, applying `options` to each one afterwards.
///
/// Files are written in order; an error stops the loop and leaves the files
/// already written on disk. `on_saved` is called after each article with its
/// 1-based position and the total.
#[instrument(skip_all, fields(articles = items.len(), dir = %source_dir.display()))]
pub async fn materialize<S>(
    service: &S,
    items: &[SearchItem],
    source_dir: &Path,
    options: &ExportOptions,
    mut on_saved: impl FnMut(&Path, usize, usize),
) -> Result<Vec<PathBuf>>
where
    S: ArticleService + ?Sized,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let username = service.username().await?;
    let labels: Vec<LabelInput> = options
        .add_labels
        .iter()
        .map(LabelInput::exported)
        .collect();

    let mut written = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let article = service.article(&username, &item.slug).await?;

        let file_path = source_dir.join(format!("{i}_{}.md", item.slug));
        info!(
            url = %item.original_article_url,
            path = %file_path.display(),
            "processing article"
        );
        std::fs::write(&file_path, article.to_markdown())
            .map_err(|e| OmnivookError::io(&file_path, e))?;

        if !labels.is_empty() {
            service.set_labels(&article.id, &labels).await?;
        }

        if options.archive {
            info!(id = %article.id, "archiving");
            service.archive(&article.id).await?;
        }

        on_saved(&file_path, i + 1, items.len());
        written.push(file_path);
    }

    Ok(written)
}
