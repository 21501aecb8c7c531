//! Fuzz target for ArchivePath::canonical with arbitrary header names.
//!
//! Run with: cargo +nightly fuzz run canonical_path
//!
//! Properties being tested:
//! - Cleaning never panics, whatever the bytes
//! - Cleaning is idempotent
//! - Only a top-level name can match the manifest entry

#![no_main]

use acipatch::ArchivePath;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let path = ArchivePath::from_bytes(data);
    let normalized = path.as_str();

    assert!(!normalized.is_empty(), "empty canonical form for {:?}", data);
    assert_eq!(
        ArchivePath::canonical(normalized).as_str(),
        normalized,
        "cleaning is not idempotent"
    );
    assert!(
        !normalized.contains("//"),
        "repeated separator in {:?}",
        normalized
    );

    if normalized == "manifest" {
        assert!(path.is_top_level());
    }
});
