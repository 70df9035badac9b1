//! Boundary to the external binary installer.
//!
//! Downloading and unpacking the daemon binary is owned by a collaborator;
//! only the seam is defined here. The supervisor propagates [`InstallError`]
//! verbatim and never retries on the caller's behalf.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("installer failed: {0}")]
pub struct InstallError(pub String);

/// Places the daemon binary at `dest`.
pub trait Installer: Send + Sync {
    fn fetch(&self, dest: &Path) -> Result<(), InstallError>;
}
