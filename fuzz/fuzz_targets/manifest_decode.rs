//! Fuzz target for manifest decoding and patching.
//!
//! Run with: cargo +nightly fuzz run manifest_decode
//!
//! Any manifest that decodes must survive a rename and an isolator addition
//! without panicking, and the re-encoded form must decode again.

#![no_main]

use acipatch::{CapabilitySet, EditRequest, ImageManifest, patch_manifest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut manifest) = ImageManifest::from_slice(data) else {
        return;
    };
    let Ok(caps) = CapabilitySet::new(["CAP_CHOWN"]) else {
        return;
    };
    let request = EditRequest::new()
        .name("example.com/fuzz")
        .retain_capabilities(caps);

    if patch_manifest(&mut manifest, &request).is_ok() {
        let encoded = manifest.to_vec().expect("patched manifest encodes");
        let decoded = ImageManifest::from_slice(&encoded).expect("re-encoded manifest decodes");
        assert_eq!(decoded.name(), "example.com/fuzz");
    }
});
