//! Manifest patching.
//!
//! This module applies an [`EditRequest`] to a decoded [`ImageManifest`]:
//! - Replacing the image name (validated against the name syntax)
//! - Adding a capability-retain isolator to the app
//!
//! # Example
//!
//! ```rust
//! use acipatch::manifest::ImageManifest;
//! use acipatch::patch::{EditRequest, patch_manifest};
//!
//! let mut manifest = ImageManifest::from_slice(
//!     br#"{"acKind":"ImageManifest","acVersion":"0.8.11","name":"old","app":{"exec":["/bin/sh"]}}"#,
//! )?;
//!
//! let request = EditRequest::from_flags(Some("example.com/app"), Some("CAP_NET_ADMIN"))?;
//! let summary = patch_manifest(&mut manifest, &request)?;
//!
//! assert_eq!(manifest.name(), "example.com/app");
//! assert_eq!(summary.renamed_from.as_deref(), Some("old"));
//! assert_eq!(summary.isolators_added, ["os/linux/capabilities-retain-set"]);
//! # Ok::<(), acipatch::Error>(())
//! ```
//!
//! # Atomicity
//!
//! Edits are applied to a working copy of the manifest, which replaces the
//! caller's manifest only once every edit has succeeded. On error the caller's
//! manifest is untouched and later edits are never attempted.

mod edit;

pub use edit::{CapabilitySet, Edit, EditRequest};

use crate::manifest::{AcIdentifier, ImageManifest, Isolator};
use crate::{Error, Result};

/// What a successful patch changed.
#[must_use = "patch summary should be checked to verify the expected edits were applied"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// The previous image name, if the name was replaced.
    pub renamed_from: Option<String>,
    /// Names of the isolators that were added, in order.
    pub isolators_added: Vec<String>,
}

impl PatchSummary {
    /// Returns `true` if nothing was changed.
    pub fn is_noop(&self) -> bool {
        self.renamed_from.is_none() && self.isolators_added.is_empty()
    }
}

/// Applies every edit of `request` to `manifest`, all or nothing.
///
/// An empty request is a successful no-op.
///
/// # Errors
///
/// - [`Error::InvalidNameFormat`] if the requested name is not a valid identifier
/// - [`Error::MissingApp`] if an isolator is requested but there is no app
/// - [`Error::IsolatorConflict`] if the isolator already exists
/// - [`Error::InvalidIsolator`] if the isolator value set is malformed
pub fn patch_manifest(manifest: &mut ImageManifest, request: &EditRequest) -> Result<PatchSummary> {
    let mut summary = PatchSummary::default();
    if request.is_empty() {
        return Ok(summary);
    }

    let mut draft = manifest.clone();
    for edit in request.edits() {
        apply_edit(&mut draft, &edit, &mut summary)?;
    }

    *manifest = draft;
    Ok(summary)
}

/// Applies a single edit in place, recording the change in `summary`.
///
/// Unlike [`patch_manifest`] this offers no atomicity across edits, but each
/// edit validates all of its preconditions before mutating anything.
pub fn apply_edit(
    manifest: &mut ImageManifest,
    edit: &Edit,
    summary: &mut PatchSummary,
) -> Result<()> {
    match edit {
        Edit::SetName { name } => {
            let name = AcIdentifier::new(name)?;
            let previous = manifest.name().to_string();
            manifest.set_name(&name);
            log::info!("Renamed image '{}' to '{}'", previous, name);
            summary.renamed_from = Some(previous);
        }
        Edit::AddIsolator { name, values } => {
            if !manifest.has_app() {
                return Err(Error::MissingApp);
            }
            if manifest.isolator(name).is_some() {
                return Err(Error::IsolatorConflict { name: name.clone() });
            }
            edit::validate_set_values(name, values)?;

            manifest.push_isolator(&Isolator::string_set(name.as_str(), values.iter().cloned()))?;
            log::info!("Added isolator '{}' [{}]", name, values.join(", "));
            summary.isolators_added.push(name.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::LINUX_CAPABILITIES_RETAIN_SET_NAME;
    use serde_json::{Value, json};

    fn manifest(app: Option<Value>) -> ImageManifest {
        let mut doc = json!({
            "acKind": "ImageManifest",
            "acVersion": "0.8.11",
            "name": "example.com/original",
            "labels": [{"name": "os", "value": "linux"}]
        });
        if let Some(app) = app {
            doc["app"] = app;
        }
        ImageManifest::from_value(doc).unwrap()
    }

    fn caps(list: &str) -> CapabilitySet {
        list.parse().unwrap()
    }

    #[test]
    fn test_empty_request_is_noop() {
        let mut m = manifest(Some(json!({"exec": ["/bin/sh"]})));
        let before = m.clone();

        let summary = patch_manifest(&mut m, &EditRequest::new()).unwrap();

        assert!(summary.is_noop());
        assert_eq!(m, before);
    }

    #[test]
    fn test_set_name() {
        let mut m = manifest(None);
        let before = m.clone();

        let summary = patch_manifest(&mut m, &EditRequest::new().name("example.com/app")).unwrap();

        assert_eq!(m.name(), "example.com/app");
        assert_eq!(summary.renamed_from.as_deref(), Some("example.com/original"));
        for (key, value) in before.fields() {
            if key != "name" {
                assert_eq!(m.get(key), Some(value), "field {} changed", key);
            }
        }
    }

    #[test]
    fn test_invalid_name_rejected() {
        for bad in ["", "Example.com/App", "example.com/my app", "app/"] {
            let mut m = manifest(None);
            let before = m.clone();

            let err = patch_manifest(&mut m, &EditRequest::new().name(bad)).unwrap_err();

            assert!(
                matches!(err, Error::InvalidNameFormat { ref name, .. } if name == bad),
                "unexpected error for {:?}: {:?}",
                bad,
                err
            );
            assert_eq!(m, before);
        }
    }

    #[test]
    fn test_add_isolator() {
        let mut m = manifest(Some(json!({
            "exec": ["/bin/sh"],
            "isolators": [{"name": "resource/memory", "value": {"limit": "1G"}}]
        })));

        let request = EditRequest::new().retain_capabilities(caps("CAP_SYS_ADMIN,CAP_NET_ADMIN"));
        let summary = patch_manifest(&mut m, &request).unwrap();

        assert_eq!(summary.isolators_added, [LINUX_CAPABILITIES_RETAIN_SET_NAME]);

        let isolators = m.isolators();
        assert_eq!(isolators.len(), 2);
        assert_eq!(isolators[0].name(), "resource/memory");
        assert_eq!(isolators[0].value(), &json!({"limit": "1G"}));
        assert_eq!(isolators[1].name(), LINUX_CAPABILITIES_RETAIN_SET_NAME);
        assert_eq!(
            isolators[1].set_values().unwrap(),
            ["CAP_SYS_ADMIN", "CAP_NET_ADMIN"]
        );
    }

    #[test]
    fn test_isolator_conflict() {
        let original = json!({
            "isolators": [
                {"name": LINUX_CAPABILITIES_RETAIN_SET_NAME, "value": {"set": ["CAP_CHOWN"]}}
            ]
        });
        let mut m = manifest(Some(original.clone()));

        let request = EditRequest::new().retain_capabilities(caps("CAP_SYS_ADMIN,CAP_NET_ADMIN"));
        let err = patch_manifest(&mut m, &request).unwrap_err();

        match err {
            Error::IsolatorConflict { name } => assert_eq!(name, LINUX_CAPABILITIES_RETAIN_SET_NAME),
            e => panic!("Expected IsolatorConflict, got: {:?}", e),
        }
        assert_eq!(m.get("app"), Some(&original));
    }

    #[test]
    fn test_missing_app() {
        let mut m = manifest(None);
        let request = EditRequest::new().retain_capabilities(caps("CAP_KILL"));

        let err = patch_manifest(&mut m, &request).unwrap_err();
        assert!(matches!(err, Error::MissingApp));
        assert!(m.get("app").is_none());
    }

    #[test]
    fn test_null_app_is_missing() {
        let mut m = manifest(Some(Value::Null));
        let request = EditRequest::new().retain_capabilities(caps("CAP_KILL"));
        assert!(matches!(
            patch_manifest(&mut m, &request),
            Err(Error::MissingApp)
        ));
    }

    #[test]
    fn test_failure_after_rename_leaves_manifest_untouched() {
        let mut m = manifest(None);
        let before = m.clone();
        let request = EditRequest::new()
            .name("example.com/app")
            .retain_capabilities(caps("CAP_KILL"));

        let err = patch_manifest(&mut m, &request).unwrap_err();

        assert!(matches!(err, Error::MissingApp));
        assert_eq!(m.name(), "example.com/original");
        assert_eq!(m, before);
    }

    #[test]
    fn test_name_failure_skips_isolator() {
        let mut m = manifest(Some(json!({"exec": ["/bin/sh"]})));
        let request = EditRequest::new()
            .name("BAD")
            .retain_capabilities(caps("CAP_KILL"));

        let err = patch_manifest(&mut m, &request).unwrap_err();

        assert!(matches!(err, Error::InvalidNameFormat { .. }));
        assert!(m.isolators().is_empty());
    }

    #[test]
    fn test_both_edits() {
        let mut m = manifest(Some(json!({"exec": ["/bin/sh"]})));
        let request = EditRequest::new()
            .name("example.com/app")
            .retain_capabilities(caps("CAP_NET_BIND_SERVICE"));

        let summary = patch_manifest(&mut m, &request).unwrap();

        assert!(!summary.is_noop());
        assert_eq!(m.name(), "example.com/app");
        assert_eq!(
            m.isolator(LINUX_CAPABILITIES_RETAIN_SET_NAME)
                .unwrap()
                .set_values()
                .unwrap(),
            ["CAP_NET_BIND_SERVICE"]
        );
    }

    #[test]
    fn test_apply_edit_rejects_empty_values() {
        let mut m = manifest(Some(json!({})));
        let mut summary = PatchSummary::default();
        let edit = Edit::AddIsolator {
            name: "custom/set".into(),
            values: vec![],
        };

        let err = apply_edit(&mut m, &edit, &mut summary).unwrap_err();

        assert!(matches!(err, Error::InvalidIsolator { ref name, .. } if name == "custom/set"));
        assert!(summary.is_noop());
        assert!(m.isolators().is_empty());
    }

    #[test]
    fn test_special_characters_survive_encoding() {
        let mut m = manifest(Some(json!({})));
        let mut summary = PatchSummary::default();
        let edit = Edit::AddIsolator {
            name: "custom/set".into(),
            values: vec!["a\"b".into(), "c\\d".into(), "e}f".into()],
        };
        apply_edit(&mut m, &edit, &mut summary).unwrap();

        let reparsed = ImageManifest::from_slice(&m.to_vec().unwrap()).unwrap();
        assert_eq!(
            reparsed.isolator("custom/set").unwrap().set_values().unwrap(),
            ["a\"b", "c\\d", "e}f"]
        );
    }
}
