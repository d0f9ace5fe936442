//! Bounded build → parse → fix loop.

use std::path::Path;

use tracing::{info, instrument, warn};

use omnivook_shared::Result;

use crate::fixer::{FixOutcome, WarningFixer};
use crate::warnings::{Warning, WarningParser};

/// Number of builder runs before giving up on remaining warnings.
pub const MAX_ATTEMPTS: u32 = 3;

/// Runs the external document builder once and returns its diagnostic output.
pub trait DocumentBuilder {
    fn build(&self, source_dir: &Path) -> Result<String>;
}

/// State of the repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    /// About to run the builder for the n-th time (1-based).
    Attempting(u32),
    /// The last build reported no warnings.
    Converged { attempts: u32 },
    /// The attempt budget ran out with warnings still present.
    Exhausted {
        attempts: u32,
        remaining: Vec<Warning>,
    },
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildState::Attempting(_))
    }

    /// Number of builder runs that led to this state.
    pub fn attempts(&self) -> u32 {
        match self {
            BuildState::Attempting(n) => n.saturating_sub(1),
            BuildState::Converged { attempts } | BuildState::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Drives the builder until its output is warning-free or the budget is spent.
///
/// There is no oscillation detection: a fix that reintroduces an earlier
/// warning simply consumes attempts. A builder that fails without printing
/// parseable warnings is indistinguishable from a clean build.
#[derive(Debug, Clone)]
pub struct BuildDriver {
    parser: WarningParser,
    max_attempts: u32,
}

impl BuildDriver {
    pub fn new(source_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            parser: WarningParser::new(source_dir),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Run the loop to a terminal state.
    #[instrument(skip_all, fields(source = %self.parser.source_dir().display()))]
    pub fn run(
        &self,
        builder: &dyn DocumentBuilder,
        fixer: &dyn WarningFixer,
    ) -> Result<BuildState> {
        let mut state = BuildState::Attempting(1);
        while !state.is_terminal() {
            state = self.step(state, builder, fixer)?;
        }
        Ok(state)
    }

    /// Advance one transition. Terminal states are returned unchanged.
    pub fn step(
        &self,
        state: BuildState,
        builder: &dyn DocumentBuilder,
        fixer: &dyn WarningFixer,
    ) -> Result<BuildState> {
        let attempt = match state {
            BuildState::Attempting(n) => n,
            terminal => return Ok(terminal),
        };

        info!(attempt, max = self.max_attempts, "running builder");
        let output = builder.build(self.parser.source_dir())?;
        let warnings: Vec<Warning> = self.parser.parse(&output).collect();

        if warnings.is_empty() {
            info!(attempts = attempt, "build converged without warnings");
            return Ok(BuildState::Converged { attempts: attempt });
        }

        info!(count = warnings.len(), attempt, "applying fixes");
        let mut unhandled = 0;
        for warning in &warnings {
            if fixer.apply(warning)? == FixOutcome::Unhandled {
                unhandled += 1;
            }
        }

        if attempt >= self.max_attempts {
            warn!(
                attempts = attempt,
                remaining = warnings.len(),
                unhandled,
                "max attempts reached, some warnings may still be present"
            );
            for warning in &warnings {
                warn!(%warning, "warning left in place");
            }
            return Ok(BuildState::Exhausted {
                attempts: attempt,
                remaining: warnings,
            });
        }

        Ok(BuildState::Attempting(attempt + 1))
    }
}
