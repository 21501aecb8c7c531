//! Image name syntax.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Maximum length of an image name (in bytes).
const MAX_NAME_LENGTH: usize = 512;

/// Characters allowed between alphanumeric runs.
const SEPARATORS: &[char] = &['-', '.', '_', '~', '/'];

/// A validated image name such as `example.com/app`.
///
/// A name is one or more runs of lowercase ASCII letters and digits joined by
/// single separators (`-`, `.`, `_`, `~`, `/`). It must start and end with an
/// alphanumeric character.
///
/// # Examples
///
/// ```
/// use acipatch::AcIdentifier;
///
/// let name = AcIdentifier::new("example.com/app").unwrap();
/// assert_eq!(name.as_str(), "example.com/app");
///
/// assert!(AcIdentifier::new("").is_err());
/// assert!(AcIdentifier::new("Example.com/App").is_err());
/// assert!(AcIdentifier::new("example.com//app").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcIdentifier(String);

impl AcIdentifier {
    /// Validates `name` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNameFormat`] if the name:
    /// - Is empty or longer than 512 bytes
    /// - Contains a character other than `[a-z0-9]` and the separators
    /// - Starts or ends with a separator
    /// - Contains two separators in a row
    pub fn new(name: &str) -> Result<Self> {
        validate(name).map_err(|reason| Error::InvalidNameFormat {
            name: name.to_string(),
            reason,
        })?;
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".into());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "name exceeds maximum length of {} bytes",
            MAX_NAME_LENGTH
        ));
    }

    let mut previous_was_separator = false;
    for (pos, c) in name.char_indices() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            previous_was_separator = false;
        } else if SEPARATORS.contains(&c) {
            if pos == 0 {
                return Err("name must start with a lowercase letter or digit".into());
            }
            if previous_was_separator {
                return Err(format!("consecutive separators at position {}", pos));
            }
            previous_was_separator = true;
        } else {
            return Err(format!("invalid character {:?} at position {}", c, pos));
        }
    }

    if previous_was_separator {
        return Err("name must end with a lowercase letter or digit".into());
    }
    Ok(())
}

impl AsRef<str> for AcIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AcIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AcIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AcIdentifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        validate(&s).map_err(|reason| Error::InvalidNameFormat {
            name: s.clone(),
            reason,
        })?;
        Ok(Self(s))
    }
}
