use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

/// Filename prefix shared by every scratch entry this service creates.
pub const ARTIFACT_PREFIX: &str = "pdf-raster-";

// =============================================================================
// Artifact Kind
// =============================================================================

/// Role of a temporary file within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The uploaded document
    Input,
    /// The encoded JPEG served back to the caller
    Output,
}

impl ArtifactKind {
    /// File suffix for this kind.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Input => ".pdf",
            ArtifactKind::Output => ".jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Input => "input",
            ArtifactKind::Output => "output",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Temp Artifact
// =============================================================================

/// A uniquely named file owned by one request.
///
/// The backing file is deleted exactly once: either by an explicit
/// [`release`](Self::release) or when the handle is dropped. A missing file is
/// not an error, and a failed deletion is logged and never retried.
pub struct TempArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    request_id: u64,
    released: bool,
}

impl TempArtifact {
    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Identifier of the request that owns this artifact.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Delete the backing file now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(
                    request_id = self.request_id,
                    kind = self.kind.as_str(),
                    "Removed temporary file {}",
                    self.path.display()
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    request_id = self.request_id,
                    kind = self.kind.as_str(),
                    "Temporary file already gone: {}",
                    self.path.display()
                );
            }
            Err(e) => {
                error!(
                    request_id = self.request_id,
                    kind = self.kind.as_str(),
                    "Error cleaning up {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for TempArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempArtifact")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("request_id", &self.request_id)
            .finish()
    }
}

// =============================================================================
// Scratch Space
// =============================================================================

/// Directory in which request artifacts are created.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    /// Use the given directory for scratch files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use the operating system's temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a zero-length, uniquely named file for `kind`.
    pub fn acquire(&self, kind: ArtifactKind, request_id: u64) -> io::Result<TempArtifact> {
        let file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(kind.suffix())
            .tempfile_in(&self.dir)?;

        // Deletion is handled by TempArtifact, not by tempfile.
        let (_file, path) = file.keep().map_err(|e| e.error)?;

        debug!(
            request_id,
            kind = kind.as_str(),
            "Created temporary file {}",
            path.display()
        );

        Ok(TempArtifact {
            path,
            kind,
            request_id,
            released: false,
        })
    }
}

impl Default for ScratchSpace {
    fn default() -> Self {
        Self::system()
    }
}

// =============================================================================
// Tests
// =============================================================================
