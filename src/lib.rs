//! # acipatch
//!
//! Single-pass rewrite of gzip'd image archives (ACI files) with a patched
//! manifest.
//!
//! The input stream is decompressed and walked entry by entry. Every entry is
//! copied to a freshly compressed output stream unchanged, except the
//! top-level `manifest`, whose JSON content receives a small set of
//! validated edits:
//!
//! - Replacing the image name
//! - Adding a Linux capability-retain isolator to the app
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acipatch::{CapabilitySet, EditRequest, TransformOptions, patch_stream};
//!
//! fn main() -> acipatch::Result<()> {
//!     let request = EditRequest::new()
//!         .name("example.com/app")
//!         .retain_capabilities("CAP_SYS_ADMIN,CAP_NET_ADMIN".parse::<CapabilitySet>()?);
//!
//!     let result = patch_stream(
//!         std::io::stdin().lock(),
//!         std::io::stdout().lock(),
//!         &request,
//!         &TransformOptions::default(),
//!     )?;
//!     eprintln!("Rewrote {} entries", result.entries);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Any error aborts the run; the partially
//! written output is not a valid archive and must be discarded.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | No | Command-line interface tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive_path;
pub mod error;
pub mod manifest;
pub mod patch;
pub mod stream;

pub use archive_path::ArchivePath;
pub use error::{Error, Result};

// Re-export manifest API
pub use manifest::{AcIdentifier, ImageManifest, Isolator};

// Re-export patching API
pub use patch::{CapabilitySet, Edit, EditRequest, PatchSummary, patch_manifest};

// Re-export streaming API
pub use stream::{TransformOptions, TransformResult, patch_stream};
