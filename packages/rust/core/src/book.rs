//! Book metadata handed to the builder.

use chrono::NaiveDate;

/// Env var overriding the builder project name (and so the artifact stem).
pub const PROJECT_NAME_ENV: &str = "PROJECT_NAME";
/// Env var overriding the ebook title.
pub const EPUB_TITLE_ENV: &str = "EPUB_TITLE";
/// Env var overriding the ebook author list.
pub const EPUB_AUTHORS_ENV: &str = "EPUB_AUTHORS";
/// CI run identifier used to stamp the version.
pub const RUN_ID_ENV: &str = "GITHUB_RUN_ID";
/// Env var the scaffolded builder config reads the version from.
pub const BOOK_VERSION_ENV: &str = "BOOK_VERSION";

/// Title, naming and authorship of the generated book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    /// Human readable title, `omnivook {since} to {today}`.
    pub title: String,
    /// Builder project name; the builder names its artifact after it.
    pub project_name: String,
    /// Comma-separated author list, `None` when nothing is known.
    pub authors: Option<String>,
    /// Version stamp, `0.1.{run id}`.
    pub version: String,
    /// Stem of the final artifact file name.
    file_stem: String,
}

impl BookMetadata {
    /// Compute metadata for a book covering `since..=today`.
    ///
    /// `site_names` become the author list; empty names are skipped.
    pub fn new(since: NaiveDate, today: NaiveDate, site_names: &[String]) -> Self {
        let title = format!(
            "omnivook {} to {}",
            since.format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        );
        let file_stem = title.replace(' ', "_");
        let authors: Vec<&str> = site_names
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            project_name: file_stem.clone(),
            authors: (!authors.is_empty()).then(|| authors.join(",")),
            version: "0.1.0".into(),
            title,
            file_stem,
        }
    }

    /// Apply environment overrides. Values already present in the
    /// environment win over computed ones.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(project) = lookup(PROJECT_NAME_ENV) {
            self.project_name = project;
        }
        if let Some(title) = lookup(EPUB_TITLE_ENV) {
            self.title = title;
        }
        if let Some(authors) = lookup(EPUB_AUTHORS_ENV) {
            self.authors = Some(authors);
        }
        if let Some(run_id) = lookup(RUN_ID_ENV) {
            self.version = format!("0.1.{run_id}");
        }
        self
    }

    /// File name of the artifact the builder produces.
    pub fn artifact_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.project_name)
    }

    /// Final file name the artifact is moved to.
    pub fn output_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.file_stem)
    }

    /// Environment passed to the builder process.
    pub fn builder_env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            (PROJECT_NAME_ENV, self.project_name.clone()),
            (EPUB_TITLE_ENV, self.title.clone()),
            (BOOK_VERSION_ENV, self.version.clone()),
        ];
        if let Some(authors) = &self.authors {
            env.push((EPUB_AUTHORS_ENV, authors.clone()));
        }
        env
    }
}
