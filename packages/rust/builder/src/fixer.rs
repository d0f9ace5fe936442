//! In-place line repairs for classified builder warnings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use omnivook_shared::{OmnivookError, Result};

use crate::warnings::{Warning, WarningKind};

/// What applying a fix did to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// The addressed line was rewritten (possibly to the same text).
    Fixed,
    /// No repair exists for this warning; it was only reported.
    Unhandled,
}

/// Applies the repair for one warning.
pub trait WarningFixer {
    fn apply(&self, warning: &Warning) -> Result<FixOutcome>;
}

/// Collapse the doubled `.md.md` extension the builder sometimes reports.
pub fn normalize_target(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw.contains(".md.md") {
        PathBuf::from(raw.replace(".md.md", ".md"))
    } else {
        path.to_path_buf()
    }
}

/// Compute the repaired text of a single line, or `None` when `kind` has no repair.
pub fn fix_line(kind: &WarningKind, line: &str) -> Option<String> {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```.*").expect("valid regex"));
    static HASHES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#+").expect("valid regex"));
    static EMPTY_ANCHOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\]\(#.*?\)").expect("valid regex"));

    match *kind {
        WarningKind::Lexer => Some(FENCE_RE.replace(line, "```").into_owned()),
        WarningKind::Header { from, to } => {
            let level = if to > from {
                from.saturating_add(1)
            } else {
                from.saturating_sub(1)
            }
            .clamp(1, 6);
            let hashes = "#".repeat(usize::from(level));
            Some(HASHES_RE.replace(line, hashes.as_str()).into_owned())
        }
        WarningKind::DanglingReference => Some(EMPTY_ANCHOR_RE.replace_all(line, "").into_owned()),
        WarningKind::Unclassified => None,
    }
}

/// Fixer that rewrites the warning's target file on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFixer;

impl WarningFixer for LineFixer {
    fn apply(&self, warning: &Warning) -> Result<FixOutcome> {
        let path = normalize_target(&warning.file);
        let missing_target = || OmnivookError::WarningTarget {
            file: path.clone(),
            line: warning.line,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                missing_target()
            } else {
                OmnivookError::io(&path, e)
            }
        })?;

        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        let index = warning
            .line
            .checked_sub(1)
            .filter(|i| *i < lines.len())
            .ok_or_else(missing_target)?;

        let outcome = match fix_line(&warning.kind, &lines[index]) {
            Some(fixed) => {
                info!(file = %path.display(), line = warning.line, kind = ?warning.kind, "fixing warning");
                lines[index] = fixed;
                FixOutcome::Fixed
            }
            None => {
                warn!(
                    file = %path.display(),
                    line = warning.line,
                    reason = %warning.reason,
                    content = %lines[index].trim(),
                    "unhandled warning"
                );
                FixOutcome::Unhandled
            }
        };

        let mut rewritten = lines.join("\n");
        if content.ends_with('\n') {
            rewritten.push('\n');
        }
        std::fs::write(&path, rewritten).map_err(|e| OmnivookError::io(&path, e))?;

        Ok(outcome)
    }
}
