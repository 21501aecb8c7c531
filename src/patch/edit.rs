//! Manifest edit requests.

use std::fmt;
use std::str::FromStr;

use crate::manifest::LINUX_CAPABILITIES_RETAIN_SET_NAME;
use crate::{Error, Result};

/// A single manifest modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Replace the image name.
    SetName {
        /// Requested name, validated when the edit is applied.
        name: String,
    },
    /// Add a new isolator whose value is a string set.
    AddIsolator {
        /// Isolator name; must not already be present.
        name: String,
        /// Members of the isolator's `set`, in order.
        values: Vec<String>,
    },
}

impl Edit {
    /// Returns the operation type as a string.
    pub fn operation_type(&self) -> &'static str {
        match self {
            Edit::SetName { .. } => "set-name",
            Edit::AddIsolator { .. } => "add-isolator",
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::SetName { name } => write!(f, "set name to '{}'", name),
            Edit::AddIsolator { name, values } => {
                write!(f, "add isolator '{}' [{}]", name, values.join(", "))
            }
        }
    }
}

/// A validated, ordered list of Linux capability names.
///
/// Parsed from a comma-separated list. Members are trimmed of surrounding
/// whitespace; empty members and duplicates are rejected.
///
/// ```
/// use acipatch::CapabilitySet;
///
/// let caps: CapabilitySet = "CAP_SYS_ADMIN, CAP_NET_ADMIN".parse().unwrap();
/// assert_eq!(caps.as_slice(), ["CAP_SYS_ADMIN", "CAP_NET_ADMIN"]);
///
/// assert!("CAP_SYS_ADMIN,,CAP_NET_ADMIN".parse::<CapabilitySet>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet(Vec<String>);

impl CapabilitySet {
    /// Builds a set from individual capability names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIsolator`] if the set is empty, or a member is
    /// empty or repeated.
    pub fn new<I, S>(capabilities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = capabilities
            .into_iter()
            .map(|c| {
                let c: String = c.into();
                c.trim().to_string()
            })
            .collect();
        validate_set_values(LINUX_CAPABILITIES_RETAIN_SET_NAME, &values)?;
        Ok(Self(values))
    }

    /// Returns the capability names in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of capabilities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an empty set cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for CapabilitySet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.split(','))
    }
}

/// Checks the members of a string-set isolator value.
pub(crate) fn validate_set_values(name: &str, values: &[String]) -> Result<()> {
    let invalid = |reason: String| Error::InvalidIsolator {
        name: name.to_string(),
        reason,
    };

    if values.is_empty() {
        return Err(invalid("set must be non-empty".into()));
    }
    for (index, value) in values.iter().enumerate() {
        if value.is_empty() {
            return Err(invalid(format!("set member {} is empty", index)));
        }
        if values[..index].contains(value) {
            return Err(invalid(format!("'{}' listed more than once", value)));
        }
    }
    Ok(())
}

/// The caller-supplied set of edits for one patch run.
///
/// A request is built once before the run and never changes while the archive
/// is walked. Edits are applied in a fixed order: name first, then isolator.
///
/// # Example
///
/// ```rust
/// use acipatch::{CapabilitySet, EditRequest};
///
/// let request = EditRequest::new()
///     .name("example.com/app")
///     .retain_capabilities("CAP_SYS_ADMIN,CAP_NET_ADMIN".parse::<CapabilitySet>()?);
///
/// let kinds: Vec<_> = request.edits().iter().map(|e| e.operation_type()).collect();
/// assert_eq!(kinds, ["set-name", "add-isolator"]);
/// # Ok::<(), acipatch::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    name: Option<String>,
    capabilities: Option<CapabilitySet>,
}

impl EditRequest {
    /// Creates an empty request (a no-op patch).
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the image name be replaced.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Requests a capability-retain isolator with the given members.
    pub fn retain_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Builds a request from raw flag values.
    ///
    /// `None` and empty strings both mean "not requested".
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIsolator`] if the capability list is malformed.
    pub fn from_flags(name: Option<&str>, capabilities: Option<&str>) -> Result<Self> {
        let mut request = Self::new();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            request = request.name(name);
        }
        if let Some(caps) = capabilities.filter(|c| !c.is_empty()) {
            request = request.retain_capabilities(caps.parse()?);
        }
        Ok(request)
    }

    /// Returns the requested name, if any.
    pub fn requested_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the requested capabilities, if any.
    pub fn requested_capabilities(&self) -> Option<&CapabilitySet> {
        self.capabilities.as_ref()
    }

    /// Returns `true` if no edit is requested.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.capabilities.is_none()
    }

    /// Returns the edits in application order.
    pub fn edits(&self) -> Vec<Edit> {
        let mut edits = Vec::with_capacity(2);
        if let Some(name) = &self.name {
            edits.push(Edit::SetName { name: name.clone() });
        }
        if let Some(caps) = &self.capabilities {
            edits.push(Edit::AddIsolator {
                name: LINUX_CAPABILITIES_RETAIN_SET_NAME.to_string(),
                values: caps.as_slice().to_vec(),
            });
        }
        edits
    }
}
