//! Canonical entry names for archive members.
//!
//! Tar writers disagree on how they spell the same member: `manifest`,
//! `./manifest` and `rootfs//etc/../manifest` can all appear in the wild.
//! [`ArchivePath`] reduces a raw header name to one canonical spelling so
//! that entries can be matched by name.

use std::fmt;

/// A canonical (lexically cleaned) archive entry name.
///
/// Cleaning applies the following rules until nothing changes:
/// - repeated `/` separators collapse into one
/// - `.` segments are removed
/// - `..` segments remove the preceding non-`..` segment
/// - `..` segments directly after a leading `/` are removed
/// - a trailing `/` is removed
///
/// Rooted names stay rooted, and a name that cleans to nothing becomes `.`.
/// Cleaning never touches the filesystem.
///
/// # Examples
///
/// ```
/// use acipatch::ArchivePath;
///
/// assert_eq!(ArchivePath::canonical("./manifest").as_str(), "manifest");
/// assert_eq!(ArchivePath::canonical("rootfs//etc/../bin/").as_str(), "rootfs/bin");
/// assert_eq!(ArchivePath::canonical("/../manifest").as_str(), "/manifest");
/// assert_eq!(ArchivePath::canonical("").as_str(), ".");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchivePath(String);

impl ArchivePath {
    /// Builds the canonical form of a raw entry name.
    pub fn canonical(raw: &str) -> Self {
        Self(clean(raw))
    }

    /// Builds the canonical form of a raw header name.
    ///
    /// Header names are bytes; invalid UTF-8 is replaced lossily, which can
    /// never produce a reserved name by accident.
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self::canonical(&String::from_utf8_lossy(raw))
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name starts at the archive root (`/`).
    pub fn is_rooted(&self) -> bool {
        self.0.starts_with('/')
    }

    /// Returns `true` if the name is a single segment at the top level.
    ///
    /// ```
    /// use acipatch::ArchivePath;
    ///
    /// assert!(ArchivePath::canonical("./manifest").is_top_level());
    /// assert!(!ArchivePath::canonical("rootfs/manifest").is_top_level());
    /// assert!(!ArchivePath::canonical("/manifest").is_top_level());
    /// ```
    pub fn is_top_level(&self) -> bool {
        !self.0.contains('/') && self.0 != "." && self.0 != ".."
    }

    /// Returns the last segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns an iterator over the path segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArchivePath {
    fn from(raw: &str) -> Self {
        Self::canonical(raw)
    }
}

impl PartialEq<str> for ArchivePath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ArchivePath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lexically cleans a slash-separated name.
fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return ".".to_string();
    }

    let rooted = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    // `..` above the root is dropped, elsewhere it is kept
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(ArchivePath::canonical("manifest").as_str(), "manifest");
        assert_eq!(
            ArchivePath::canonical("rootfs/etc/hosts").as_str(),
            "rootfs/etc/hosts"
        );
    }

    #[test]
    fn test_leading_dot_removed() {
        assert_eq!(ArchivePath::canonical("./manifest").as_str(), "manifest");
        assert_eq!(ArchivePath::canonical("././manifest").as_str(), "manifest");
    }

    #[test]
    fn test_repeated_separators_collapse() {
        assert_eq!(
            ArchivePath::canonical("rootfs//bin///sh").as_str(),
            "rootfs/bin/sh"
        );
    }

    #[test]
    fn test_trailing_slash_removed() {
        assert_eq!(ArchivePath::canonical("rootfs/").as_str(), "rootfs");
        assert_eq!(ArchivePath::canonical("manifest/").as_str(), "manifest");
    }

    #[test]
    fn test_parent_segments_resolved() {
        assert_eq!(
            ArchivePath::canonical("rootfs/../manifest").as_str(),
            "manifest"
        );
        assert_eq!(ArchivePath::canonical("a/b/../../c").as_str(), "c");
    }

    #[test]
    fn test_unresolvable_parent_kept() {
        assert_eq!(ArchivePath::canonical("../manifest").as_str(), "../manifest");
        assert_eq!(ArchivePath::canonical("a/../../b").as_str(), "../b");
        assert_eq!(ArchivePath::canonical("../../x").as_str(), "../../x");
    }

    #[test]
    fn test_rooted_paths() {
        assert_eq!(ArchivePath::canonical("/manifest").as_str(), "/manifest");
        assert_eq!(ArchivePath::canonical("/../manifest").as_str(), "/manifest");
        assert_eq!(ArchivePath::canonical("/").as_str(), "/");
        assert_eq!(ArchivePath::canonical("//").as_str(), "/");
        assert!(ArchivePath::canonical("/manifest").is_rooted());
    }

    #[test]
    fn test_empty_and_dot() {
        assert_eq!(ArchivePath::canonical("").as_str(), ".");
        assert_eq!(ArchivePath::canonical(".").as_str(), ".");
        assert_eq!(ArchivePath::canonical("./").as_str(), ".");
        assert_eq!(ArchivePath::canonical("a/..").as_str(), ".");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        for raw in ["./a//b/../c/", "/../x", "../../y", "", "a/./b/."] {
            let once = ArchivePath::canonical(raw);
            let twice = ArchivePath::canonical(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_top_level() {
        assert!(ArchivePath::canonical("manifest").is_top_level());
        assert!(ArchivePath::canonical("rootfs").is_top_level());
        assert!(!ArchivePath::canonical("rootfs/manifest").is_top_level());
        assert!(!ArchivePath::canonical(".").is_top_level());
        assert!(!ArchivePath::canonical("..").is_top_level());
    }

    #[test]
    fn test_from_bytes_lossy() {
        let path = ArchivePath::from_bytes(b"./rootfs/\xffbin");
        assert_eq!(path.as_str(), "rootfs/\u{fffd}bin");
        assert_eq!(ArchivePath::from_bytes(b"./manifest"), "manifest");
    }

    #[test]
    fn test_file_name_and_components() {
        let path = ArchivePath::canonical("./rootfs/bin/sh");
        assert_eq!(path.file_name(), "sh");
        assert_eq!(path.components().collect::<Vec<_>>(), ["rootfs", "bin", "sh"]);

        let rooted = ArchivePath::canonical("/etc");
        assert_eq!(rooted.components().collect::<Vec<_>>(), ["etc"]);
    }
}
