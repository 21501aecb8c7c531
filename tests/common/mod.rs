//! Shared test utilities for integration tests.
//!
//! Archives are assembled header by header so tests control the exact bytes
//! of every entry, including names that `tar::Builder::append_data` would
//! normalize away (`./manifest`, `../x`, trailing slashes).
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

/// A fixed modification time so archives are reproducible.
pub const MTIME: u64 = 1_700_000_000;

/// A manifest as produced by the image build tooling.
pub const MANIFEST: &str = r#"{"acKind":"ImageManifest","acVersion":"0.8.11","name":"example.com/original","labels":[{"name":"os","value":"linux"},{"name":"arch","value":"amd64"}],"app":{"exec":["/bin/server","--port=80"],"user":"0","group":"0"}}"#;

/// A manifest without an `app` section.
pub const MANIFEST_NO_APP: &str =
    r#"{"acKind":"ImageManifest","acVersion":"0.8.11","name":"example.com/original"}"#;

/// One entry to place in a test archive.
#[derive(Debug, Clone)]
pub struct TestEntry {
    pub name: String,
    pub entry_type: tar::EntryType,
    pub link: Option<String>,
    pub data: Vec<u8>,
}

impl TestEntry {
    /// A regular file.
    pub fn file(name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            entry_type: tar::EntryType::Regular,
            link: None,
            data: data.into(),
        }
    }

    /// A directory.
    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entry_type: tar::EntryType::Directory,
            link: None,
            data: Vec::new(),
        }
    }

    /// A symbolic link.
    pub fn symlink(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            entry_type: tar::EntryType::Symlink,
            link: Some(target.to_string()),
            data: Vec::new(),
        }
    }

    /// A PAX extended header record applying to the next entry.
    pub fn pax(records: &[(&str, &str)]) -> Self {
        let mut data = Vec::new();
        for (key, value) in records {
            data.extend_from_slice(&pax_record(key, value));
        }
        Self {
            name: "PaxHeaders.0/next".to_string(),
            entry_type: tar::EntryType::XHeader,
            link: None,
            data,
        }
    }

    /// A GNU long-name record applying to the next entry.
    pub fn gnu_long_name(name: &str) -> Self {
        let mut data = name.as_bytes().to_vec();
        data.push(0);
        Self {
            name: "././@LongLink".to_string(),
            entry_type: tar::EntryType::GNULongName,
            link: None,
            data,
        }
    }

    /// The manifest file.
    pub fn manifest(json: &str) -> Self {
        Self::file("manifest", json)
    }
}

/// Formats one PAX record, `"<len> <key>=<value>\n"`, where `len` counts
/// the whole record including its own digits.
pub fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = key.len() + value.len() + 3;
    let mut len = body + body.to_string().len();
    if len.to_string().len() != body.to_string().len() {
        len = body + len.to_string().len();
    }
    format!("{} {}={}\n", len, key, value).into_bytes()
}

fn set_raw_name(header: &mut tar::Header, name: &str) {
    let field = &mut header.as_old_mut().name;
    assert!(name.len() <= field.len(), "test entry name too long: {}", name);
    field.fill(0);
    field[..name.len()].copy_from_slice(name.as_bytes());
}

/// Builds an uncompressed tar stream from `entries`.
pub fn build_tar(entries: &[TestEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_ustar();
        set_raw_name(&mut header, &entry.name);
        header.set_entry_type(entry.entry_type);
        header.set_mode(if entry.entry_type.is_dir() { 0o755 } else { 0o644 });
        header.set_uid(0);
        header.set_gid(0);
        header.set_mtime(MTIME);
        header.set_size(entry.data.len() as u64);
        if let Some(link) = &entry.link {
            header.set_link_name(link).unwrap();
        }
        header.set_cksum();
        builder.append(&header, entry.data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Gzips `data` at the default level.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Decompresses a (possibly multi-member) gzip stream.
pub fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Builds a gzip'd tar archive from `entries`.
pub fn build_archive(entries: &[TestEntry]) -> Vec<u8> {
    gzip(&build_tar(entries))
}

/// An entry read back from an output archive.
#[derive(Debug, Clone)]
pub struct ReadEntry {
    /// Name bytes exactly as stored in the header.
    pub name: Vec<u8>,
    /// The raw 512-byte header block.
    pub header: Vec<u8>,
    pub data: Vec<u8>,
}

impl ReadEntry {
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn data_str(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Reads the entries of a gzip'd tar archive without interpreting
/// extension records.
///
/// Reading stops quietly at the first error, so this also works on the
/// partial output of an aborted run.
pub fn read_entries(archive: &[u8]) -> Vec<ReadEntry> {
    let mut out = Vec::new();
    let mut tar = tar::Archive::new(MultiGzDecoder::new(archive));
    let Ok(entries) = tar.entries() else {
        return out;
    };
    for entry in entries.raw(true) {
        let Ok(mut entry) = entry else { break };
        let name = entry.path_bytes().into_owned();
        let header = entry.header().as_bytes().to_vec();
        let mut data = Vec::new();
        if entry.read_to_end(&mut data).is_err() {
            break;
        }
        out.push(ReadEntry { name, header, data });
    }
    out
}

/// Returns the names of the entries of a gzip'd tar archive.
pub fn entry_names(archive: &[u8]) -> Vec<String> {
    read_entries(archive).iter().map(ReadEntry::name_str).collect()
}

/// A rootfs-style set of entries surrounding a manifest.
pub fn image_entries(manifest: &str) -> Vec<TestEntry> {
    vec![
        TestEntry::manifest(manifest),
        TestEntry::dir("rootfs/"),
        TestEntry::dir("rootfs/bin/"),
        TestEntry::file("rootfs/bin/server", vec![0x7fu8; 3000]),
        TestEntry::symlink("rootfs/bin/sh", "busybox"),
        TestEntry::file("rootfs/etc/hostname", "image\n"),
    ]
}
