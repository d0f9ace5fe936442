//! Source directory scaffolding.
//!
//! Every retrieval starts from a fresh source directory seeded with the
//! builder configuration. An existing directory is never merged into.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use omnivook_shared::{OmnivookError, Result};

/// Files of the built-in template, relative to the source directory.
const BUILTIN_TEMPLATE: &[(&str, &str)] = &[
    (
        "conf.py",
        include_str!("../templates/source_template/conf.py"),
    ),
    (
        "index.md",
        include_str!("../templates/source_template/index.md"),
    ),
];

/// Where the scaffold files come from.
#[derive(Debug, Clone, Default)]
pub enum Template {
    /// The template compiled into the binary.
    #[default]
    Builtin,
    /// A user-provided directory, copied recursively.
    Directory(PathBuf),
}

impl Template {
    pub fn from_config(template_dir: Option<&Path>) -> Self {
        match template_dir {
            Some(dir) => Self::Directory(dir.to_path_buf()),
            None => Self::Builtin,
        }
    }
}

/// Create `target` and populate it from `template`.
///
/// Fails with [`OmnivookError::ScaffoldExists`] when `target` already exists.
#[instrument(skip_all, fields(target = %target.display()))]
pub fn scaffold(target: &Path, template: &Template) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OmnivookError::io(parent, e))?;
    }

    std::fs::create_dir(target).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            OmnivookError::ScaffoldExists {
                path: target.to_path_buf(),
            }
        } else {
            OmnivookError::io(target, e)
        }
    })?;

    match template {
        Template::Builtin => {
            for (name, content) in BUILTIN_TEMPLATE {
                let path = target.join(name);
                std::fs::write(&path, content).map_err(|e| OmnivookError::io(&path, e))?;
            }
        }
        Template::Directory(dir) => copy_tree(dir, target)?,
    }

    info!("source directory scaffolded");
    Ok(())
}

/// Recursively copy the contents of `from` into the existing directory `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            OmnivookError::io(path, e.into())
        })?;
        let src = entry.path();
        let relative = src
            .strip_prefix(from)
            .map_err(|_| OmnivookError::config(format!("{} escapes the template", src.display())))?;
        let dst = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dst).map_err(|e| OmnivookError::io(&dst, e))?;
        } else {
            debug!(from = %src.display(), to = %dst.display(), "copying template file");
            std::fs::copy(src, &dst).map_err(|e| OmnivookError::io(src, e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("work").join("source");

        scaffold(&target, &Template::Builtin).unwrap();

        let conf = std::fs::read_to_string(target.join("conf.py")).unwrap();
        assert!(conf.contains("myst_parser"));
        assert!(conf.contains("EPUB_TITLE"));
        let index = std::fs::read_to_string(target.join("index.md")).unwrap();
        assert!(index.contains("toctree"));
    }

    #[test]
    fn existing_target_is_rejected_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("source");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("0_old.md"), "# Old").unwrap();

        let err = scaffold(&target, &Template::Builtin).unwrap_err();

        assert!(matches!(err, OmnivookError::ScaffoldExists { .. }));
        assert!(!target.join("conf.py").exists());
        assert!(target.join("0_old.md").exists());
    }

    #[test]
    fn custom_template_directory_is_copied_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template");
        std::fs::create_dir_all(template.join("_static")).unwrap();
        std::fs::write(template.join("conf.py"), "project = 'custom'").unwrap();
        std::fs::write(template.join("_static").join("style.css"), "body {}").unwrap();

        let target = dir.path().join("source");
        scaffold(&target, &Template::from_config(Some(template.as_path()))).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("conf.py")).unwrap(),
            "project = 'custom'"
        );
        assert!(target.join("_static").join("style.css").exists());
        assert!(!target.join("index.md").exists());
    }

    #[test]
    fn nested_template_directories_keep_their_layout() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template");
        std::fs::create_dir_all(template.join("_templates").join("epub")).unwrap();
        std::fs::create_dir_all(template.join("empty")).unwrap();
        std::fs::write(
            template.join("_templates").join("epub").join("layout.html"),
            "<html/>",
        )
        .unwrap();

        let target = dir.path().join("source");
        scaffold(&target, &Template::Directory(template)).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("_templates").join("epub").join("layout.html"))
                .unwrap(),
            "<html/>"
        );
        assert!(target.join("empty").is_dir());
    }

    #[test]
    fn missing_template_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("source");

        let err = scaffold(&target, &Template::Directory(dir.path().join("nope"))).unwrap_err();

        assert!(matches!(err, OmnivookError::Io { .. }));
    }
}
