//! The forward-only archive rewrite.

use std::io::{self, BufReader, Read, Write};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::io::{CountingReader, GzipMembers, Stage, StageReader, StageWriter, classify, tag};
use super::options::TransformOptions;
use crate::manifest::{ImageManifest, MANIFEST_ENTRY_NAME};
use crate::patch::{EditRequest, patch_manifest};
use crate::{ArchivePath, Error, Result};

/// Statistics of a completed patch run.
#[must_use = "transform result should be checked to verify the manifest was patched"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformResult {
    /// Number of archive entries written (extension records included).
    pub entries: usize,
    /// Number of manifest entries decoded and patched.
    ///
    /// A manifest is still decoded and validated when no edit is requested;
    /// it is then written back with its original bytes.
    pub manifests_patched: usize,
    /// Compressed bytes read from the input channel.
    pub bytes_in: u64,
    /// Compressed bytes written to the output channel.
    pub bytes_out: u64,
}

impl TransformResult {
    /// Returns `true` if a manifest entry was found and rewritten.
    pub fn manifest_found(&self) -> bool {
        self.manifests_patched > 0
    }
}

/// What to do with one archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryAction {
    /// Copy verbatim, remembering any name it carries for the next entry.
    Extension,
    /// Copy header and payload verbatim.
    Passthrough,
    /// Buffer, decode, patch and re-encode the payload.
    Patch,
}

fn is_extension(entry_type: tar::EntryType) -> bool {
    entry_type.is_pax_local_extensions()
        || entry_type.is_gnu_longname()
        || entry_type.is_gnu_longlink()
}

fn dispatch(header: &tar::Header, path: &ArchivePath) -> EntryAction {
    let entry_type = header.entry_type();
    if is_extension(entry_type) {
        EntryAction::Extension
    } else if entry_type.is_file() && path.as_str() == MANIFEST_ENTRY_NAME {
        EntryAction::Patch
    } else {
        EntryAction::Passthrough
    }
}

/// Names announced by extension records for the entry that follows them.
///
/// A PAX `path` record takes precedence over a GNU long name, and either
/// replaces the name stored in the entry's own header.
#[derive(Debug, Default)]
struct PendingName {
    long_name: Option<Vec<u8>>,
    pax_path: Option<Vec<u8>>,
}

impl PendingName {
    fn record(&mut self, entry_type: tar::EntryType, payload: &[u8]) -> io::Result<()> {
        if entry_type.is_gnu_longname() {
            let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
            self.long_name = Some(payload[..end].to_vec());
        } else if entry_type.is_pax_local_extensions() {
            for extension in tar::PaxExtensions::new(payload) {
                let extension = extension?;
                if extension.key_bytes() == b"path" {
                    self.pax_path = Some(extension.value_bytes().to_vec());
                }
            }
        }
        Ok(())
    }

    /// Returns the effective name of the entry stored as `stored`, and
    /// forgets the pending names.
    fn resolve(&mut self, stored: ArchivePath) -> ArchivePath {
        let long_name = self.long_name.take();
        match self.pax_path.take().or(long_name) {
            Some(name) => ArchivePath::from_bytes(&name),
            None => stored,
        }
    }
}

type ArchiveReader<R> = StageReader<GzipMembers<BufReader<StageReader<R>>>>;
type ArchiveWriter<W> = StageWriter<GzEncoder<StageWriter<W>>>;

/// Rewrites a gzip'd tar stream, patching its manifest entry.
///
/// Entries are read one at a time and written in the same order. Every
/// entry except the manifest is copied with its header block unchanged and
/// its payload streamed through. The manifest payload is buffered, decoded,
/// patched with `request`, re-encoded, and written under its original header
/// with the size (and checksum) updated. When `request` is empty the manifest
/// is only validated, and its original bytes are written back.
///
/// Archive-format extension records (PAX and GNU long-name headers) are
/// copied byte for byte like any other entry. A name they carry replaces the
/// stored name of the following entry when deciding whether it is the
/// manifest.
///
/// Input may consist of several gzip members. Bytes after the last member
/// that do not start a new member, such as block padding, are ignored.
///
/// An archive without a manifest is copied through unchanged unless
/// [`TransformOptions::require_manifest`] is set.
///
/// # Errors
///
/// Any failure aborts the run immediately. Entries already written are not
/// retracted, so on error the output is not a valid archive and must be
/// discarded.
///
/// # Example
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::io::{BufReader, BufWriter};
/// use acipatch::{EditRequest, TransformOptions, patch_stream};
///
/// let input = BufReader::new(File::open("image.aci")?);
/// let output = BufWriter::new(File::create("patched.aci")?);
/// let request = EditRequest::new().name("example.com/app");
///
/// let result = patch_stream(input, output, &request, &TransformOptions::default())?;
/// assert!(result.manifest_found());
/// # Ok::<(), acipatch::Error>(())
/// ```
pub fn patch_stream<R: Read, W: Write>(
    input: R,
    output: W,
    request: &EditRequest,
    options: &TransformOptions,
) -> Result<TransformResult> {
    let reader: ArchiveReader<R> = StageReader::new(
        GzipMembers::new(BufReader::new(StageReader::new(input, Stage::Input))),
        Stage::Decompress,
    );
    let writer: ArchiveWriter<W> = StageWriter::new(
        GzEncoder::new(
            StageWriter::new(output, Stage::Output),
            Compression::new(options.compression_level()),
        ),
        Stage::Compress,
    );

    let mut archive = tar::Archive::new(reader);
    // Dropping the builder on an error path writes a best-effort trailer.
    let mut builder = tar::Builder::new(writer);
    let mut result = TransformResult::default();
    let mut pending = PendingName::default();

    let entries = archive.entries().map_err(|e| classify(e, None))?.raw(true);
    for entry in entries {
        let mut entry = entry.map_err(|e| classify(e, None))?;
        let header = entry.header().clone();
        let stored = ArchivePath::from_bytes(&entry.path_bytes());
        let path = if is_extension(header.entry_type()) {
            stored
        } else {
            pending.resolve(stored)
        };
        let size = header
            .entry_size()
            .map_err(|e| Error::archive_format(Some(path.as_str()), e.to_string()))?;

        match dispatch(&header, &path) {
            EntryAction::Extension => {
                log::debug!("Copying extension record '{}' ({} bytes)", path, size);
                let record = read_payload(&mut entry, size, &path, options, "extension record")?;
                pending
                    .record(header.entry_type(), &record)
                    .map_err(|e| classify(e, Some(path.as_str())))?;
                builder
                    .append(&header, record.as_slice())
                    .map_err(|e| classify(e, Some(path.as_str())))?;
            }
            EntryAction::Passthrough => {
                log::debug!("Copying entry '{}' ({} bytes)", path, size);
                copy_entry(&mut builder, &header, &mut entry, size, &path)?;
            }
            EntryAction::Patch => {
                if result.manifest_found() {
                    log::warn!("Archive contains more than one manifest entry");
                }
                log::debug!("Patching manifest entry '{}' ({} bytes)", path, size);
                patch_entry(&mut builder, header, &mut entry, size, &path, request, options)?;
                result.manifests_patched += 1;
            }
        }
        result.entries += 1;
    }

    if !result.manifest_found() {
        if options.is_manifest_required() {
            return Err(Error::ManifestNotFound);
        }
        log::warn!("No manifest entry found; archive copied without edits");
    }

    // Finish the current gzip member so its trailer is verified.
    let mut reader = archive.into_inner();
    io::copy(&mut reader, &mut io::sink()).map_err(|e| classify(e, None))?;
    result.bytes_in = reader
        .into_inner()
        .into_inner()
        .map_or(0, |buffered| buffered.into_inner().bytes_read());

    // Archive trailer first, then the gzip trailer.
    let encoder = builder
        .into_inner()
        .map_err(|e| classify(e, None))?
        .into_inner();
    let mut sink = encoder
        .finish()
        .map_err(|e| classify(tag(Stage::Compress, e), None))?;
    sink.flush().map_err(|e| classify(e, None))?;
    result.bytes_out = sink.bytes_written();

    log::info!(
        "Rewrote {} entries ({} manifest patched, {} -> {} bytes)",
        result.entries,
        result.manifests_patched,
        result.bytes_in,
        result.bytes_out
    );
    Ok(result)
}

fn copy_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    header: &tar::Header,
    payload: &mut impl Read,
    size: u64,
    path: &ArchivePath,
) -> Result<()> {
    let mut counted = CountingReader::new(payload);
    builder
        .append(header, &mut counted)
        .map_err(|e| classify(e, Some(path.as_str())))?;

    if counted.count() != size {
        return Err(truncated(path, counted.count(), size));
    }
    Ok(())
}

fn patch_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    mut header: tar::Header,
    payload: &mut impl Read,
    size: u64,
    path: &ArchivePath,
    request: &EditRequest,
    options: &TransformOptions,
) -> Result<()> {
    let bytes = read_payload(payload, size, path, options, "manifest")?;

    let mut manifest = ImageManifest::from_slice(&bytes)?;
    let summary = patch_manifest(&mut manifest, request)?;
    if summary.is_noop() {
        log::debug!("No edits applied; manifest '{}' copied verbatim", path);
        return builder
            .append(&header, bytes.as_slice())
            .map_err(|e| classify(e, Some(path.as_str())));
    }

    let encoded = manifest.to_vec()?;
    header.set_size(encoded.len() as u64);
    header.set_cksum();
    builder
        .append(&header, encoded.as_slice())
        .map_err(|e| classify(e, Some(path.as_str())))
}

/// Buffers a payload that must be held in memory, within the size limit.
fn read_payload(
    payload: &mut impl Read,
    size: u64,
    path: &ArchivePath,
    options: &TransformOptions,
    what: &str,
) -> Result<Vec<u8>> {
    let limit = options.manifest_size_limit();
    if size > limit {
        return Err(Error::ResourceLimitExceeded(format!(
            "{} '{}' declares {} bytes, limit is {}",
            what, path, size, limit
        )));
    }

    let mut bytes = Vec::new();
    usize::try_from(size)
        .ok()
        .and_then(|capacity| bytes.try_reserve_exact(capacity).ok())
        .ok_or_else(|| {
            Error::ResourceLimitExceeded(format!(
                "{} '{}' of {} bytes does not fit in memory",
                what, path, size
            ))
        })?;
    payload
        .read_to_end(&mut bytes)
        .map_err(|e| classify(e, Some(path.as_str())))?;
    if bytes.len() as u64 != size {
        return Err(truncated(path, bytes.len() as u64, size));
    }
    Ok(bytes)
}

fn truncated(path: &ArchivePath, actual: u64, declared: u64) -> Error {
    Error::archive_format(
        Some(path.as_str()),
        format!(
            "payload truncated: got {} of {} declared bytes",
            actual, declared
        ),
    )
}
