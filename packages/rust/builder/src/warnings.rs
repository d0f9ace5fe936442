//! Extraction and classification of builder warnings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// WarningKind
// ---------------------------------------------------------------------------

/// Cause of a builder warning, as far as the fixer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A code fence carries a language the highlighter cannot lex.
    Lexer,
    /// Heading level jumps from `H{from}` to `H{to}`.
    Header { from: u8, to: u8 },
    /// An empty-text link points at an anchor that does not exist.
    DanglingReference,
    /// Anything else; left for manual follow-up.
    Unclassified,
}

impl WarningKind {
    /// Classify a warning reason. Checks run in priority order, first match wins.
    pub fn classify(reason: &str) -> Self {
        static HEADER_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"H(\d) to H(\d)").expect("valid regex"));

        if reason.contains("lexer") || reason.contains("Lexing literal_block") {
            return Self::Lexer;
        }

        if reason.contains("header") {
            if let Some(caps) = HEADER_RE.captures(reason) {
                // Single ASCII digits always parse
                let from = caps[1].parse().unwrap_or(0);
                let to = caps[2].parse().unwrap_or(0);
                return Self::Header { from, to };
            }
            return Self::Unclassified;
        }

        if reason.contains("cross-reference target") {
            return Self::DanglingReference;
        }

        Self::Unclassified
    }
}

// ---------------------------------------------------------------------------
// Warning
// ---------------------------------------------------------------------------

/// One builder diagnostic tied to a source file and a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Source file as reported by the builder, resolved against the source directory.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// Free-text reason.
    pub reason: String,
    /// Classification of `reason`.
    pub kind: WarningKind,
}

impl Warning {
    pub fn new(file: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            file: file.into(),
            line,
            kind: WarningKind::classify(&reason),
            reason,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.reason)
    }
}

// ---------------------------------------------------------------------------
// WarningParser
// ---------------------------------------------------------------------------

/// Parses `<source>/<path>:<line>: WARNING: <reason>` lines out of builder output.
#[derive(Debug, Clone)]
pub struct WarningParser {
    source_dir: PathBuf,
    pattern: Regex,
}

impl WarningParser {
    /// Parser for warnings about files under `source_dir`.
    ///
    /// Only the directory's final component has to appear in the reported
    /// path, so absolute paths printed by the builder match too. The last
    /// component with that name wins, so ancestors sharing the name are
    /// skipped.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_dir.to_string_lossy().into_owned());

        let pattern = Regex::new(&format!(
            r"^(?:.*[\s/\\])?{}[/\\](?P<file>[^:]+):(?P<line>\d+): WARNING: (?P<reason>.+)",
            regex::escape(&name)
        ))
        .expect("escaped source directory name forms a valid regex");

        Self {
            source_dir,
            pattern,
        }
    }

    /// Source directory warnings are resolved against.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Lazily yield every warning in `output`.
    ///
    /// Lines that do not have the exact warning shape, including continuation
    /// lines of multi-line reasons, are skipped.
    pub fn parse<'a>(&'a self, output: &'a str) -> impl Iterator<Item = Warning> + 'a {
        output.lines().filter_map(move |line| {
            let caps = self.pattern.captures(line)?;
            let line_no = caps["line"].parse().ok()?;
            Some(Warning::new(
                self.source_dir.join(&caps["file"]),
                line_no,
                caps["reason"].trim_end(),
            ))
        })
    }
}
