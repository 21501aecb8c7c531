//! Streaming archive rewrite.
//!
//! This module drives a single forward pass over a gzip'd tar stream:
//! 1. The input is decompressed and walked entry by entry
//! 2. Each entry is either copied verbatim or, for the manifest, patched
//! 3. Entries are re-archived in order and recompressed
//!
//! Memory use is bounded by the manifest payload plus one header block; no
//! other entry is ever held in full.

mod io;
mod options;
mod transform;

pub use options::{DEFAULT_LEVEL, DEFAULT_MAX_MANIFEST_SIZE, TransformOptions};
pub use transform::{TransformResult, patch_stream};
