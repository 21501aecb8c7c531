//! Error types for archive patching operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of a patch run, along with a convenient [`Result<T>`] type
//! alias.
//!
//! # Error Handling
//!
//! Every failure aborts the run. There is no partial-success mode: either
//! every entry was copied and the manifest was patched, or an error is
//! returned and the output must be discarded.
//!
//! ```rust,no_run
//! use acipatch::{EditRequest, Error, TransformOptions, patch_stream};
//!
//! fn run() -> acipatch::Result<()> {
//!     let edits = EditRequest::new().name("example.com/app");
//!     match patch_stream(std::io::stdin().lock(), std::io::stdout().lock(), &edits, &TransformOptions::default()) {
//!         Ok(_) => Ok(()),
//!         Err(Error::InvalidNameFormat { name, reason }) => {
//!             eprintln!("Refusing name '{}': {}", name, reason);
//!             Err(Error::InvalidNameFormat { name, reason })
//!         }
//!         Err(e) if e.is_corruption() => {
//!             eprintln!("Input is not a valid image archive: {}", e);
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```

use std::io;

/// The main error type for archive patching.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | Input or output channel failure |
/// | Framing | [`Decompression`][Self::Decompression], [`Compression`][Self::Compression] | Bad gzip stream |
/// | Container | [`ArchiveFormat`][Self::ArchiveFormat] | Malformed tar header or truncated entry |
/// | Document | [`DocumentDecode`][Self::DocumentDecode], [`DocumentEncode`][Self::DocumentEncode] | Manifest is not a valid image manifest |
/// | Patch | [`InvalidNameFormat`][Self::InvalidNameFormat], [`MissingApp`][Self::MissingApp], [`IsolatorConflict`][Self::IsolatorConflict], [`InvalidIsolator`][Self::InvalidIsolator] | Requested edit refused |
/// | Options | [`InvalidCompressionLevel`][Self::InvalidCompressionLevel], [`ResourceLimitExceeded`][Self::ResourceLimitExceeded], [`ManifestNotFound`][Self::ManifestNotFound] | Run configuration |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred on the input or output channel.
    ///
    /// Errors raised by the channels themselves are propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input gzip stream is malformed or truncated.
    #[error("Decompression failed: {0}")]
    Decompression(#[source] io::Error),

    /// The output gzip stream could not be produced.
    #[error("Compression failed: {0}")]
    Compression(#[source] io::Error),

    /// The tar container is malformed.
    ///
    /// Raised for bad header checksums, short header blocks, and entries
    /// whose payload ends before the size declared in their header.
    #[error("Invalid archive{}: {reason}", entry.as_deref().map(|e| format!(" at entry '{}'", e)).unwrap_or_default())]
    ArchiveFormat {
        /// The entry being processed, if known.
        entry: Option<String>,
        /// A description of the problem.
        reason: String,
    },

    /// The manifest payload is not a valid image manifest.
    #[error("Invalid manifest: {reason}")]
    DocumentDecode {
        /// Why decoding failed.
        reason: String,
    },

    /// The patched manifest could not be encoded.
    #[error("Failed to encode manifest: {0}")]
    DocumentEncode(#[source] serde_json::Error),

    /// A requested name does not satisfy the identifier syntax.
    ///
    /// Names must be lowercase, start and end with an alphanumeric character,
    /// and use only `-`, `.`, `_`, `~` and `/` as separators.
    #[error("Invalid name '{name}': {reason}")]
    InvalidNameFormat {
        /// The rejected name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An isolator edit was requested but the manifest has no app.
    #[error("No app in the manifest")]
    MissingApp,

    /// An isolator with the requested name already exists.
    ///
    /// Adding over an existing isolator is a conflict, never a merge.
    #[error("Isolator already exists: {name}")]
    IsolatorConflict {
        /// The isolator name that is already taken.
        name: String,
    },

    /// A requested isolator payload is not acceptable.
    #[error("Invalid isolator '{name}': {reason}")]
    InvalidIsolator {
        /// The isolator name.
        name: String,
        /// What is wrong with its value.
        reason: String,
    },

    /// An invalid compression level was provided.
    ///
    /// Levels must be in the range 0-9.
    ///
    /// ```rust
    /// use acipatch::{Error, TransformOptions};
    ///
    /// assert!(TransformOptions::new().level(9).is_ok());
    /// assert!(matches!(
    ///     TransformOptions::new().level(15),
    ///     Err(Error::InvalidCompressionLevel { level: 15 })
    /// ));
    /// ```
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The invalid level that was provided.
        level: u32,
    },

    /// A resource limit was exceeded.
    ///
    /// The manifest is the only entry buffered in memory; its declared size
    /// is checked against [`TransformOptions::max_manifest_size`] first.
    ///
    /// [`TransformOptions::max_manifest_size`]: crate::TransformOptions::max_manifest_size
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// The archive has no manifest entry and one was required.
    #[error("Archive has no manifest entry")]
    ManifestNotFound,
}

impl Error {
    /// Returns `true` if a requested edit was refused.
    ///
    /// These errors depend only on the manifest content and the edit request,
    /// never on the archive framing.
    pub fn is_patch_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidNameFormat { .. }
                | Error::MissingApp
                | Error::IsolatorConflict { .. }
                | Error::InvalidIsolator { .. }
        )
    }

    /// Returns `true` if the input archive or its manifest is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Decompression(_) | Error::ArchiveFormat { .. } | Error::DocumentDecode { .. }
        )
    }

    /// Returns `true` if this error came from one of the I/O channels.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    pub(crate) fn archive_format(entry: Option<&str>, reason: impl Into<String>) -> Self {
        Error::ArchiveFormat {
            entry: entry.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub(crate) fn document_decode(reason: impl Into<String>) -> Self {
        Error::DocumentDecode {
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for archive patching.
pub type Result<T> = std::result::Result<T, Error>;
