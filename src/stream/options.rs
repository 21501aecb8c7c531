//! Options for a patch run.

/// Default gzip level for the output stream.
pub const DEFAULT_LEVEL: u32 = 6;

/// Default upper bound on the declared size of the manifest entry (16 MiB).
pub const DEFAULT_MAX_MANIFEST_SIZE: u64 = 16 * 1024 * 1024;

/// Options controlling a patch run.
///
/// # Example
///
/// ```rust
/// use acipatch::TransformOptions;
///
/// let options = TransformOptions::new()
///     .level(9)?
///     .max_manifest_size(1024 * 1024)
///     .require_manifest(true);
/// assert_eq!(options.compression_level(), 9);
/// # Ok::<(), acipatch::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    level: u32,
    max_manifest_size: u64,
    require_manifest: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            require_manifest: false,
        }
    }
}

impl TransformOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gzip level of the output stream (strict validation).
    ///
    /// Valid values are 0-9, where:
    /// - 0: No compression (store only)
    /// - 1-3: Fast compression, lower ratio
    /// - 4-6: Balanced compression (default is 6)
    /// - 7-9: Maximum compression, slower
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`](crate::Error::InvalidCompressionLevel)
    /// if `level > 9`.
    pub fn level(mut self, level: u32) -> crate::Result<Self> {
        if level > 9 {
            return Err(crate::Error::InvalidCompressionLevel { level });
        }
        self.level = level;
        Ok(self)
    }

    /// Sets the largest manifest size, in bytes, that will be buffered.
    ///
    /// The manifest is the only entry held in memory. A manifest whose header
    /// declares more than this fails the run before any of it is read.
    pub fn max_manifest_size(mut self, bytes: u64) -> Self {
        self.max_manifest_size = bytes;
        self
    }

    /// Fails the run if the archive has no manifest entry.
    ///
    /// Off by default: an archive without a manifest is copied through
    /// unchanged and the run succeeds.
    pub fn require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = require;
        self
    }

    /// Returns the output gzip level.
    pub fn compression_level(&self) -> u32 {
        self.level
    }

    /// Returns the manifest size limit in bytes.
    pub fn manifest_size_limit(&self) -> u64 {
        self.max_manifest_size
    }

    /// Returns `true` if a missing manifest is an error.
    pub fn is_manifest_required(&self) -> bool {
        self.require_manifest
    }
}
