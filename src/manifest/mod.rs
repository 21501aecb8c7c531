//! Image manifest document.
//!
//! The manifest is the one archive entry this crate decodes. It is held as an
//! ordered JSON object so that every field the patcher does not touch is
//! re-encoded exactly as decoded, in the original order.
//!
//! # Example
//!
//! ```rust
//! use acipatch::manifest::ImageManifest;
//!
//! let bytes = br#"{"acKind":"ImageManifest","acVersion":"0.8.11","name":"example.com/old","app":{"exec":["/bin/sh"]}}"#;
//! let manifest = ImageManifest::from_slice(bytes)?;
//! assert_eq!(manifest.name(), "example.com/old");
//! assert!(manifest.has_app());
//! assert!(manifest.isolators().is_empty());
//! # Ok::<(), acipatch::Error>(())
//! ```

mod isolator;
mod name;

pub use isolator::{Isolator, LINUX_CAPABILITIES_RETAIN_SET_NAME};
pub use name::AcIdentifier;

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Canonical name of the manifest entry at the top of an image archive.
pub const MANIFEST_ENTRY_NAME: &str = "manifest";

/// Required value of the `acKind` field.
pub const IMAGE_MANIFEST_KIND: &str = "ImageManifest";

/// A decoded image manifest.
///
/// Construction validates the parts of the schema this crate relies on:
/// - the document is a JSON object
/// - `acKind` is `"ImageManifest"` and `acVersion` is a string
/// - `name` is a string
/// - `app`, if present and not null, is an object
/// - `app.isolators`, if present and not null, is an array of objects with a
///   string `name`
///
/// Everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageManifest {
    fields: Map<String, Value>,
}

impl ImageManifest {
    /// Decodes a manifest from its JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentDecode`] if the bytes are not JSON or the
    /// document fails validation.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::document_decode(format!("malformed JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Wraps an already parsed JSON value, validating it.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Error::document_decode("manifest is not a JSON object"));
        };
        validate(&fields)?;
        Ok(Self { fields })
    }

    /// Encodes the manifest as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentEncode`] if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.fields).map_err(Error::DocumentEncode)
    }

    /// Returns the image name.
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Replaces the image name. No other field is touched.
    pub fn set_name(&mut self, name: &AcIdentifier) {
        self.fields
            .insert("name".to_string(), Value::String(name.as_str().to_string()));
    }

    /// Returns a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns all top-level fields in document order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns `true` if the manifest describes an app.
    pub fn has_app(&self) -> bool {
        self.app().is_some()
    }

    /// Returns the isolators attached to the app, in document order.
    ///
    /// Returns an empty list when there is no app or no isolators.
    pub fn isolators(&self) -> Vec<Isolator> {
        self.isolator_values()
            .map(|values| values.iter().filter_map(Isolator::from_value).collect())
            .unwrap_or_default()
    }

    /// Looks up an isolator by name.
    pub fn isolator(&self, name: &str) -> Option<Isolator> {
        self.isolator_values()?
            .iter()
            .filter_map(Isolator::from_value)
            .find(|iso| iso.name() == name)
    }

    /// Appends an isolator to the app's isolator list.
    ///
    /// An absent or null list is created. Names are not checked here; callers
    /// that must refuse duplicates check [`isolator`](Self::isolator) first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApp`] if the manifest has no app.
    pub fn push_isolator(&mut self, isolator: &Isolator) -> Result<()> {
        let app = self
            .fields
            .get_mut("app")
            .and_then(Value::as_object_mut)
            .ok_or(Error::MissingApp)?;

        let list = app
            .entry("isolators")
            .or_insert_with(|| Value::Array(Vec::new()));
        if list.is_null() {
            *list = Value::Array(Vec::new());
        }
        match list {
            Value::Array(values) => {
                values.push(isolator.to_value());
                Ok(())
            }
            // validated on construction
            _ => Err(Error::document_decode("app.isolators is not an array")),
        }
    }

    /// Consumes the manifest and returns its JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn app(&self) -> Option<&Map<String, Value>> {
        self.fields.get("app").and_then(Value::as_object)
    }

    fn isolator_values(&self) -> Option<&Vec<Value>> {
        self.app()?.get("isolators")?.as_array()
    }
}

fn validate(fields: &Map<String, Value>) -> Result<()> {
    match fields.get("acKind") {
        Some(Value::String(kind)) if kind == IMAGE_MANIFEST_KIND => {}
        Some(Value::String(kind)) => {
            return Err(Error::document_decode(format!(
                "acKind must be {:?}, found {:?}",
                IMAGE_MANIFEST_KIND, kind
            )));
        }
        _ => return Err(Error::document_decode("missing acKind")),
    }

    if !fields.get("acVersion").is_some_and(Value::is_string) {
        return Err(Error::document_decode("missing acVersion"));
    }
    if !fields.get("name").is_some_and(Value::is_string) {
        return Err(Error::document_decode("missing name"));
    }

    let app = match fields.get("app") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(app)) => app,
        Some(_) => return Err(Error::document_decode("app is not an object")),
    };

    let isolators = match app.get("isolators") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(isolators)) => isolators,
        Some(_) => return Err(Error::document_decode("app.isolators is not an array")),
    };

    for (index, isolator) in isolators.iter().enumerate() {
        if Isolator::from_value(isolator).is_none() {
            return Err(Error::document_decode(format!(
                "app.isolators[{}] has no name",
                index
            )));
        }
    }
    Ok(())
}
