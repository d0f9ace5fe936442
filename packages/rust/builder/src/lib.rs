//! Document build loop with automatic repair of builder warnings.
//!
//! The builder is run against the markdown source tree; every warning it
//! prints is parsed ([`WarningParser`]), classified ([`WarningKind`]) and
//! repaired in place ([`LineFixer`]), then the build is repeated until it is
//! clean or [`MAX_ATTEMPTS`] is reached ([`BuildDriver`]).

mod driver;
mod fixer;
mod sphinx;
mod warnings;

pub use driver::{BuildDriver, BuildState, DocumentBuilder, MAX_ATTEMPTS};
pub use fixer::{FixOutcome, LineFixer, WarningFixer, fix_line, normalize_target};
pub use sphinx::SphinxBuilder;
pub use warnings::{Warning, WarningKind, WarningParser};
