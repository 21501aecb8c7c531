//! Isolator records attached to an app.

use serde_json::{Map, Value};

/// Reserved isolator name for the set of Linux capabilities an app retains.
pub const LINUX_CAPABILITIES_RETAIN_SET_NAME: &str = "os/linux/capabilities-retain-set";

/// A named capability or restriction attached to an app.
///
/// The value is kept as an opaque JSON value; only its name takes part in
/// conflict detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Isolator {
    name: String,
    value: Value,
}

impl Isolator {
    /// Creates an isolator from a name and an arbitrary value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Creates an isolator whose value is a string set: `{"set": [..]}`.
    ///
    /// The values are emitted in the order given. They are composed as JSON
    /// strings, so quotes and backslashes are escaped on encode.
    ///
    /// ```
    /// use acipatch::manifest::{Isolator, LINUX_CAPABILITIES_RETAIN_SET_NAME};
    ///
    /// let iso = Isolator::string_set(
    ///     LINUX_CAPABILITIES_RETAIN_SET_NAME,
    ///     ["CAP_SYS_ADMIN", "CAP_NET_ADMIN"],
    /// );
    /// assert_eq!(iso.set_values().unwrap(), ["CAP_SYS_ADMIN", "CAP_NET_ADMIN"]);
    /// ```
    pub fn string_set<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: Vec<Value> = values
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect();

        let mut value = Map::new();
        value.insert("set".to_string(), Value::Array(set));
        Self::new(name, Value::Object(value))
    }

    /// Reads an isolator from its JSON form.
    ///
    /// Returns `None` unless the value is an object with a string `name`.
    /// A missing `value` field reads as `null`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = object.get("name")?.as_str()?;
        Some(Self::new(
            name,
            object.get("value").cloned().unwrap_or(Value::Null),
        ))
    }

    /// Returns the JSON form: `{"name": .., "value": ..}`.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(self.name.clone()));
        object.insert("value".to_string(), self.value.clone());
        Value::Object(object)
    }

    /// Returns the isolator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the isolator value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the members of a string-set value, if the value is one.
    pub fn set_values(&self) -> Option<Vec<&str>> {
        self.value
            .get("set")?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }
}
