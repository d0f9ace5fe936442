//! End-to-end run: search → scaffold → materialize → build/repair → package.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use omnivook_builder::{BuildDriver, BuildState, DocumentBuilder, LineFixer, SphinxBuilder};
use omnivook_fetcher::{ArticleService, ExportOptions, SearchFilter, materialize, search_all};
use omnivook_shared::{BuildConfig, OmnivookError, Result};

use crate::book::BookMetadata;
use crate::packager::{self, PackageOutcome};
use crate::scaffold::{self, Template};

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Retrieve, build, then remove the source directory.
    #[default]
    All,
    /// Only retrieve articles into the source directory.
    Retrieve,
    /// Only build from an existing source directory.
    Build,
}

impl Mode {
    pub fn retrieves(self) -> bool {
        matches!(self, Mode::All | Mode::Retrieve)
    }

    pub fn builds(self) -> bool {
        matches!(self, Mode::All | Mode::Build)
    }
}

/// Configuration for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    /// Search criteria; `since` also dates the book.
    pub filter: SearchFilter,
    /// Labels/archiving applied to exported articles.
    pub export: ExportOptions,
    /// Artifact extension, e.g. `epub`.
    pub output_format: String,
    /// Directory the final artifact is moved to.
    pub output_dir: PathBuf,
    pub build: BuildConfig,
    /// Upper date of the book title.
    pub today: NaiveDate,
}

/// What happened in the build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookOutcome {
    /// The source directory held no article files; nothing was built.
    NoArticles,
    /// The builder ran; `state` is the terminal repair-loop state.
    Built {
        state: BuildState,
        package: PackageOutcome,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Articles written in the retrieve phase.
    pub articles: usize,
    /// `None` when the build phase did not run.
    pub book: Option<BookOutcome>,
    pub elapsed: Duration,
}

/// Everything the build phase needs.
#[derive(Debug, Clone)]
pub struct BookJob {
    pub source_dir: PathBuf,
    pub metadata: BookMetadata,
    pub target: String,
    pub output_format: String,
    pub output_dir: PathBuf,
}

impl BookJob {
    /// Where the builder is expected to leave its artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.source_dir
            .join("_build")
            .join(&self.target)
            .join(self.metadata.artifact_name(&self.output_format))
    }

    pub fn destination(&self) -> PathBuf {
        self.output_dir
            .join(self.metadata.output_name(&self.output_format))
    }

    /// Whether the builder target produces a file with the requested extension.
    pub fn target_matches_format(&self) -> bool {
        self.target == self.output_format
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after an article file is written.
    fn article_saved(&self, path: &Path, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_saved(&self, _path: &Path, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Execute the phases selected by `config.mode`.
///
/// `service` is only consulted when the mode retrieves articles.
#[instrument(skip_all, fields(mode = ?config.mode, since = %config.filter.since))]
pub async fn run(
    config: &RunConfig,
    service: Option<&dyn ArticleService>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let source_dir = &config.build.source_dir;

    let mut articles = 0;
    let mut site_names = Vec::new();

    if config.mode.retrieves() {
        let service = service.ok_or_else(|| {
            OmnivookError::config("retrieving articles requires an API client")
        })?;
        let retrieved = retrieve(config, service, progress).await?;
        articles = retrieved.paths.len();
        site_names = retrieved.site_names;
    }

    let book = if config.mode.builds() {
        let metadata = BookMetadata::new(config.filter.since, config.today, &site_names)
            .with_env(|key| std::env::var(key).ok());
        let job = BookJob {
            source_dir: source_dir.clone(),
            metadata,
            target: config.build.target.clone(),
            output_format: config.output_format.clone(),
            output_dir: config.output_dir.clone(),
        };

        let mut builder = SphinxBuilder::new(&config.build.builder_cmd, &config.build.target);
        for (key, value) in job.metadata.builder_env() {
            builder = builder.env(key, value);
        }

        Some(build_book(&job, &builder, progress)?)
    } else {
        None
    };

    if config.mode == Mode::All {
        info!(path = %source_dir.display(), "removing source directory");
        std::fs::remove_dir_all(source_dir).map_err(|e| OmnivookError::io(source_dir, e))?;
    }

    let summary = RunSummary {
        articles,
        book,
        elapsed: start.elapsed(),
    };
    progress.done(&summary);

    info!(
        articles = summary.articles,
        elapsed_ms = summary.elapsed.as_millis(),
        "run complete"
    );
    Ok(summary)
}

/// Files written and site names collected by the retrieve phase.
#[derive(Debug, Default)]
pub struct Retrieved {
    pub paths: Vec<PathBuf>,
    pub site_names: Vec<String>,
}

/// Search, scaffold the source directory and write every article into it.
pub async fn retrieve(
    config: &RunConfig,
    service: &dyn ArticleService,
    progress: &dyn ProgressReporter,
) -> Result<Retrieved> {
    progress.phase("Searching articles");
    let query = config.filter.to_query();
    info!(%query, "searching");
    let items = search_all(service, &query).await?;

    progress.phase("Preparing source directory");
    let template = Template::from_config(config.build.template_dir.as_deref());
    scaffold::scaffold(&config.build.source_dir, &template)?;

    progress.phase("Downloading articles");
    let paths = materialize(
        service,
        &items,
        &config.build.source_dir,
        &config.export,
        |path, current, total| progress.article_saved(path, current, total),
    )
    .await?;

    let site_names = items
        .into_iter()
        .filter_map(|item| item.site_name)
        .collect();

    Ok(Retrieved { paths, site_names })
}

/// Build the book from `job.source_dir` with `builder`, repairing warnings,
/// then move the artifact into place.
#[instrument(skip_all, fields(source = %job.source_dir.display()))]
pub fn build_book(
    job: &BookJob,
    builder: &dyn DocumentBuilder,
    progress: &dyn ProgressReporter,
) -> Result<BookOutcome> {
    if count_articles(&job.source_dir)? == 0 {
        error!(path = %job.source_dir.display(), "No articles found to compile");
        return Ok(BookOutcome::NoArticles);
    }

    if !job.target_matches_format() {
        warn!(
            target = %job.target,
            format = %job.output_format,
            "builder target differs from the output format, the artifact will likely be missing"
        );
    }

    progress.phase("Building book");
    let state = BuildDriver::new(&job.source_dir).run(builder, &LineFixer)?;
    info!(attempts = state.attempts(), "build finished");

    progress.phase("Packaging");
    let package = packager::package(&job.artifact_path(), &job.destination())?;

    Ok(BookOutcome::Built { state, package })
}

/// Whether `name` looks like an article file, `{ordinal}_{slug}.md`.
fn is_article_file(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".md") else {
        return false;
    };
    match stem.split_once('_') {
        Some((ordinal, slug)) => {
            !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit()) && !slug.is_empty()
        }
        None => false,
    }
}

/// Number of article files directly inside `dir`; template pages are not counted.
fn count_articles(dir: &Path) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(OmnivookError::io(dir, e)),
    };

    let mut count = 0;
    for entry in entries {
        let path = entry.map_err(|e| OmnivookError::io(dir, e))?.path();
        let is_article = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_article_file);
        if path.is_file() && is_article {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use omnivook_shared::{
        Article, LabelInput, PageInfo, SearchEdge, SearchItem, SearchPage,
    };

    use super::*;

    struct FakeService {
        items: Vec<SearchItem>,
        archived: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn with_articles(slugs: &[(&str, Option<&str>)]) -> Self {
            let items = slugs
                .iter()
                .enumerate()
                .map(|(i, (slug, site))| SearchItem {
                    id: format!("id-{i}"),
                    slug: slug.to_string(),
                    title: format!("Title {slug}"),
                    original_article_url: format!("https://example.com/{slug}"),
                    site_name: site.map(str::to_string),
                })
                .collect();
            Self {
                items,
                archived: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ArticleService for FakeService {
        async fn search(&self, _query: &str, _after: &str) -> Result<SearchPage> {
            Ok(SearchPage {
                edges: self
                    .items
                    .iter()
                    .map(|item| SearchEdge {
                        cursor: item.id.clone(),
                        node: item.clone(),
                    })
                    .collect(),
                page_info: PageInfo {
                    has_next_page: false,
                    end_cursor: None,
                    total_count: Some(self.items.len()),
                },
            })
        }

        async fn username(&self) -> Result<String> {
            Ok("reader".into())
        }

        async fn article(&self, _username: &str, slug: &str) -> Result<Article> {
            let item = self
                .items
                .iter()
                .find(|i| i.slug == slug)
                .ok_or_else(|| OmnivookError::api("article", "not found"))?;
            Ok(Article {
                id: item.id.clone(),
                slug: item.slug.clone(),
                title: item.title.clone(),
                original_article_url: item.original_article_url.clone(),
                site_name: item.site_name.clone(),
                content: "Body".into(),
                labels: Vec::new(),
            })
        }

        async fn set_labels(&self, _article_id: &str, _labels: &[LabelInput]) -> Result<()> {
            Ok(())
        }

        async fn archive(&self, article_id: &str) -> Result<()> {
            self.archived.lock().unwrap().push(article_id.to_string());
            Ok(())
        }
    }

    /// Builder that drops an artifact where the job expects it.
    struct ArtifactBuilder {
        artifact: PathBuf,
        calls: Cell<u32>,
    }

    impl DocumentBuilder for ArtifactBuilder {
        fn build(&self, _source_dir: &Path) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            std::fs::create_dir_all(self.artifact.parent().unwrap()).unwrap();
            std::fs::write(&self.artifact, b"book").unwrap();
            Ok(String::new())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run_config(root: &Path, mode: Mode) -> RunConfig {
        RunConfig {
            mode,
            filter: SearchFilter::since(date(2024, 5, 1)),
            export: ExportOptions {
                add_labels: Vec::new(),
                archive: true,
            },
            output_format: "epub".into(),
            output_dir: root.to_path_buf(),
            build: BuildConfig {
                source_dir: root.join("source"),
                ..BuildConfig::default()
            },
            today: date(2024, 5, 8),
        }
    }

    fn job(root: &Path) -> BookJob {
        BookJob {
            source_dir: root.join("source"),
            metadata: BookMetadata::new(date(2024, 5, 1), date(2024, 5, 8), &[]),
            target: "epub".into(),
            output_format: "epub".into(),
            output_dir: root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn retrieve_mode_writes_scaffold_and_articles() {
        let dir = tempfile::tempdir().unwrap();
        let config = run_config(dir.path(), Mode::Retrieve);
        let service = FakeService::with_articles(&[("first", Some("Blog")), ("second", None)]);

        let summary = run(&config, Some(&service), &SilentProgress).await.unwrap();

        assert_eq!(summary.articles, 2);
        assert!(summary.book.is_none());
        let source = dir.path().join("source");
        assert!(source.join("conf.py").exists());
        assert_eq!(
            std::fs::read_to_string(source.join("0_first.md")).unwrap(),
            "# Title first\n\nhttps://example.com/first\n\nBody\n"
        );
        assert!(source.join("1_second.md").exists());
        assert_eq!(*service.archived.lock().unwrap(), vec!["id-0", "id-1"]);
    }

    #[tokio::test]
    async fn retrieve_collects_site_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = run_config(dir.path(), Mode::Retrieve);
        let service = FakeService::with_articles(&[("a", Some("Blog")), ("b", None), ("c", Some("News"))]);

        let retrieved = retrieve(&config, &service, &SilentProgress).await.unwrap();

        assert_eq!(retrieved.site_names, vec!["Blog", "News"]);
        assert_eq!(retrieved.paths.len(), 3);
    }

    #[tokio::test]
    async fn retrieve_without_service_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = run_config(dir.path(), Mode::Retrieve);

        let err = run(&config, None, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, OmnivookError::Config { .. }));
    }

    #[tokio::test]
    async fn existing_source_directory_aborts_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("source")).unwrap();
        let config = run_config(dir.path(), Mode::Retrieve);
        let service = FakeService::with_articles(&[("a", None)]);

        let err = run(&config, Some(&service), &SilentProgress).await.unwrap_err();
        assert!(matches!(err, OmnivookError::ScaffoldExists { .. }));
        assert!(service.archived.lock().unwrap().is_empty());
    }

    #[test]
    fn only_index_means_no_articles() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("index.md"), "# Index").unwrap();
        let builder = ArtifactBuilder {
            artifact: job.artifact_path(),
            calls: Cell::new(0),
        };

        let outcome = build_book(&job, &builder, &SilentProgress).unwrap();

        assert_eq!(outcome, BookOutcome::NoArticles);
        assert_eq!(builder.calls.get(), 0);
    }

    #[test]
    fn template_pages_are_not_articles() {
        assert!(is_article_file("0_first.md"));
        assert!(is_article_file("12_a_b.md"));
        assert!(!is_article_file("index.md"));
        assert!(!is_article_file("about_me.md"));
        assert!(!is_article_file("_intro.md"));
        assert!(!is_article_file("3_.md"));
        assert!(!is_article_file("0_first.txt"));
    }

    #[test]
    fn single_article_without_index_is_built() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("0_a.md"), "# A").unwrap();
        let builder = ArtifactBuilder {
            artifact: job.artifact_path(),
            calls: Cell::new(0),
        };

        let outcome = build_book(&job, &builder, &SilentProgress).unwrap();

        assert!(matches!(
            outcome,
            BookOutcome::Built {
                package: PackageOutcome::Packaged(_),
                ..
            }
        ));
        assert_eq!(builder.calls.get(), 1);
    }

    #[test]
    fn extra_template_pages_alone_mean_no_articles() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("index.md"), "# Index").unwrap();
        std::fs::write(job.source_dir.join("about.md"), "# About").unwrap();
        let builder = ArtifactBuilder {
            artifact: job.artifact_path(),
            calls: Cell::new(0),
        };

        let outcome = build_book(&job, &builder, &SilentProgress).unwrap();

        assert_eq!(outcome, BookOutcome::NoArticles);
        assert_eq!(builder.calls.get(), 0);
    }

    #[test]
    fn format_differing_from_target_ends_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        job.output_format = "html".into();
        assert!(!job.target_matches_format());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("0_a.md"), "# A").unwrap();
        // The builder writes the epub it was asked for
        let builder = ArtifactBuilder {
            artifact: job
                .source_dir
                .join("_build")
                .join("epub")
                .join(job.metadata.artifact_name("epub")),
            calls: Cell::new(0),
        };

        let outcome = build_book(&job, &builder, &SilentProgress).unwrap();

        assert!(matches!(
            outcome,
            BookOutcome::Built {
                package: PackageOutcome::Missing(_),
                ..
            }
        ));
    }

    #[test]
    fn built_artifact_is_packaged() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("index.md"), "# Index").unwrap();
        std::fs::write(job.source_dir.join("0_a.md"), "# A").unwrap();
        let builder = ArtifactBuilder {
            artifact: job.artifact_path(),
            calls: Cell::new(0),
        };

        let outcome = build_book(&job, &builder, &SilentProgress).unwrap();

        let destination = dir.path().join("omnivook_2024-05-01_to_2024-05-08.epub");
        assert_eq!(
            outcome,
            BookOutcome::Built {
                state: BuildState::Converged { attempts: 1 },
                package: PackageOutcome::Packaged(destination.clone()),
            }
        );
        assert_eq!(std::fs::read(destination).unwrap(), b"book");
    }

    #[test]
    fn missing_artifact_is_reported_not_raised() {
        struct QuietBuilder;
        impl DocumentBuilder for QuietBuilder {
            fn build(&self, _source_dir: &Path) -> Result<String> {
                Ok(String::new())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir(&job.source_dir).unwrap();
        std::fs::write(job.source_dir.join("index.md"), "# Index").unwrap();
        std::fs::write(job.source_dir.join("0_a.md"), "# A").unwrap();

        let outcome = build_book(&job, &QuietBuilder, &SilentProgress).unwrap();

        assert!(matches!(
            outcome,
            BookOutcome::Built {
                package: PackageOutcome::Missing(_),
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn all_mode_builds_packages_and_cleans_up() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // $3 target, $4 source, $5 output dir
        let script = dir.path().join("fake-sphinx.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nmkdir -p \"$5\"\nprintf book > \"$5/$PROJECT_NAME.epub\"\n",
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let mut config = run_config(dir.path(), Mode::All);
        config.build.builder_cmd = script.to_string_lossy().into_owned();
        let service = FakeService::with_articles(&[("a", Some("Blog"))]);

        let summary = run(&config, Some(&service), &SilentProgress).await.unwrap();

        assert_eq!(summary.articles, 1);
        match summary.book {
            Some(BookOutcome::Built {
                state: BuildState::Converged { attempts: 1 },
                package: PackageOutcome::Packaged(path),
            }) => assert!(path.exists()),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!dir.path().join("source").exists());
    }
}
