//! Exit codes for the CLI tool.

use acipatch::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive or manifest format error
pub const BAD_ARCHIVE: i32 = 3;
/// A requested edit was refused
pub const PATCH_REJECTED: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    PatchRejected,
    IoError,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::PatchRejected => PATCH_REJECTED,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts an acipatch error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::Decompression(_) | Error::ArchiveFormat { .. } => ExitCode::BadArchive,
        Error::DocumentDecode { .. } | Error::ManifestNotFound => ExitCode::BadArchive,
        Error::InvalidNameFormat { .. }
        | Error::MissingApp
        | Error::IsolatorConflict { .. }
        | Error::InvalidIsolator { .. } => ExitCode::PatchRejected,
        Error::InvalidCompressionLevel { .. } => ExitCode::BadArgs,
        Error::Compression(_) | Error::DocumentEncode(_) => ExitCode::FatalError,
        Error::ResourceLimitExceeded(_) => ExitCode::FatalError,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
