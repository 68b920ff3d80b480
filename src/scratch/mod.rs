//! Request-scoped temporary files.
//!
//! Every conversion writes its upload to an input artifact and its JPEG to an
//! output artifact. Both live in a [`ScratchSpace`] directory and are removed
//! exactly once, whichever way the request ends.
//!
//! ```text
//!   acquire(Input) ──► write upload ──► rasterize ──► release()
//!   acquire(Output) ─► encode JPEG ──► ArtifactStream ──► dropped after body
//! ```
//!
//! Release is tied to ownership: [`TempArtifact::release`] consumes the
//! handle, and dropping a handle that was never released removes the file.
//! Error paths therefore need no explicit cleanup, and the output artifact can
//! be moved into the response body so the file outlives the handler and is
//! deleted only once the body has been sent or abandoned.

mod artifact;
mod stream;

pub use artifact::{ArtifactKind, ScratchSpace, TempArtifact, ARTIFACT_PREFIX};
pub use stream::{ArtifactStream, STREAM_CHUNK_SIZE};
