//! Fuzz target for the streaming rewrite over arbitrary input.
//!
//! Run with: cargo +nightly fuzz run patch_stream
//!
//! The input is wrapped as a gzip member so the fuzzer reaches the tar and
//! manifest layers. Any outcome is fine as long as nothing panics.

#![no_main]

use std::io::{Cursor, Write};

use acipatch::{EditRequest, TransformOptions, patch_stream};
use flate2::Compression;
use flate2::write::GzEncoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    if encoder.write_all(data).is_err() {
        return;
    }
    let Ok(input) = encoder.finish() else {
        return;
    };

    let request = EditRequest::new().name("example.com/fuzz");
    let options = TransformOptions::new().max_manifest_size(64 * 1024);
    let _ = patch_stream(Cursor::new(input), std::io::sink(), &request, &options);
});
