//! Moves the builder's artifact to its final location.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use omnivook_shared::{OmnivookError, Result};

/// Result of packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// The artifact was moved to this path.
    Packaged(PathBuf),
    /// The builder produced no artifact at the expected path.
    Missing(PathBuf),
}

/// Move `artifact` to `destination`.
///
/// A missing artifact is a soft failure reported as [`PackageOutcome::Missing`].
pub fn package(artifact: &Path, destination: &Path) -> Result<PackageOutcome> {
    if !artifact.is_file() {
        error!(expected = %artifact.display(), "failed to generate the ebook");
        return Ok(PackageOutcome::Missing(artifact.to_path_buf()));
    }

    if let Err(e) = std::fs::rename(artifact, destination) {
        // Rename fails across filesystems
        debug!(error = %e, "rename failed, copying instead");
        std::fs::copy(artifact, destination).map_err(|e| OmnivookError::io(destination, e))?;
        std::fs::remove_file(artifact).map_err(|e| OmnivookError::io(artifact, e))?;
    }

    info!(path = %destination.display(), "generated ebook");
    Ok(PackageOutcome::Packaged(destination.to_path_buf()))
}
