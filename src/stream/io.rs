//! I/O adapters that attribute failures to a pipeline stage.
//!
//! The tar codec reports every failure as a plain [`io::Error`], whether it
//! came from the input channel, the gzip decoder, or its own header parsing.
//! Each stage of the pipeline is wrapped in an adapter that tags the errors it
//! produces, so the transform can map them onto the crate's error taxonomy
//! once they surface from the codec. Errors without a tag were raised by the
//! tar codec itself.

use std::fmt;
use std::io::{self, BufRead, Read, Write};

use flate2::bufread::GzDecoder;

use crate::Error;

/// First byte of every gzip member header.
const GZIP_MAGIC: u8 = 0x1f;

/// A stage of the decompress, de-archive, re-archive, compress pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// The caller's input channel.
    Input,
    /// The gzip decoder.
    Decompress,
    /// The gzip encoder.
    Compress,
    /// The caller's output channel.
    Output,
}

#[derive(Debug)]
struct StageError {
    stage: Stage,
    source: io::Error,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn is_tagged(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<StageError>())
}

/// Attributes `err` to `stage` unless an inner stage already claimed it.
///
/// `Interrupted` is left alone so retry loops keep working.
pub(crate) fn tag(stage: Stage, err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::Interrupted || is_tagged(&err) {
        return err;
    }
    io::Error::new(err.kind(), StageError { stage, source: err })
}

fn untag(err: io::Error) -> (Option<Stage>, io::Error) {
    if !is_tagged(&err) {
        return (None, err);
    }
    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<StageError>()) {
        Some(Ok(tagged)) => (Some(tagged.stage), tagged.source),
        Some(Err(other)) => (None, io::Error::new(kind, other)),
        None => (None, kind.into()),
    }
}

/// Maps an error that surfaced from the pipeline onto [`Error`].
pub(crate) fn classify(err: io::Error, entry: Option<&str>) -> Error {
    match untag(err) {
        (Some(Stage::Input | Stage::Output), source) => Error::Io(source),
        (Some(Stage::Decompress), source) => Error::Decompression(source),
        (Some(Stage::Compress), source) => Error::Compression(source),
        (None, source) => Error::archive_format(entry, source.to_string()),
    }
}

/// A reader that tags its errors with a stage and counts bytes read.
pub(crate) struct StageReader<R> {
    inner: R,
    stage: Stage,
    bytes: u64,
}

impl<R> StageReader<R> {
    pub(crate) fn new(inner: R, stage: Stage) -> Self {
        Self {
            inner,
            stage,
            bytes: 0,
        }
    }

    /// Total bytes read so far.
    pub(crate) fn bytes_read(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for StageReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf).map_err(|e| tag(self.stage, e))?;
        self.bytes += n as u64;
        Ok(n)
    }
}

/// A writer that tags its errors with a stage and counts bytes written.
pub(crate) struct StageWriter<W> {
    inner: W,
    stage: Stage,
    bytes: u64,
}

impl<W> StageWriter<W> {
    pub(crate) fn new(inner: W, stage: Stage) -> Self {
        Self {
            inner,
            stage,
            bytes: 0,
        }
    }

    /// Total bytes written so far.
    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for StageWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf).map_err(|e| tag(self.stage, e))?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| tag(self.stage, e))
    }
}

/// Counts the bytes pulled through a reader.
pub(crate) struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

enum Members<R> {
    Reading(GzDecoder<R>),
    Finished(R),
    Swapping,
}

/// Decodes a sequence of gzip members as one stream.
///
/// A new member starts wherever the previous one ended and the next byte is
/// the gzip magic. Anything else after a complete member (block padding from
/// `dd conv=sync`, tape blocking) ends the stream without being decoded.
/// Each member's CRC and length trailer is verified as it completes.
pub(crate) struct GzipMembers<R> {
    state: Members<R>,
}

impl<R: BufRead> GzipMembers<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            state: Members::Reading(GzDecoder::new(inner)),
        }
    }

    /// Returns the underlying reader, or `None` if a read failed while
    /// switching members.
    pub(crate) fn into_inner(self) -> Option<R> {
        match self.state {
            Members::Reading(decoder) => Some(decoder.into_inner()),
            Members::Finished(inner) => Some(inner),
            Members::Swapping => None,
        }
    }

    fn next_member(&mut self) -> io::Result<()> {
        let Members::Reading(decoder) = std::mem::replace(&mut self.state, Members::Swapping)
        else {
            return Ok(());
        };
        let mut inner = decoder.into_inner();
        let next = match inner.fill_buf() {
            Ok(buf) => buf.first().copied(),
            Err(e) => {
                self.state = Members::Finished(inner);
                return Err(e);
            }
        };
        self.state = match next {
            Some(GZIP_MAGIC) => Members::Reading(GzDecoder::new(inner)),
            Some(_) => {
                log::debug!("Ignoring trailing data after the last gzip member");
                Members::Finished(inner)
            }
            None => Members::Finished(inner),
        };
        Ok(())
    }
}

impl<R: BufRead> Read for GzipMembers<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Members::Reading(decoder) = &mut self.state else {
                return Ok(0);
            };
            let n = decoder.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            self.next_member()?;
        }
    }
}
