//! Passthrough documents: the untouched remainder of a loaded entity.
//!
//! Each entity keeps the document it was loaded from as an immutable
//! [`Passthrough`] snapshot next to its typed fields. Dumping clones the
//! snapshot into a [`MergedDocument`], writes typed fields over fixed keys and
//! hands the result back as a plain JSON object. Fields the entity does not
//! model survive the round trip untouched.

use serde_json::{Map, Value};

use crate::schema::SchemaError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Passthrough {
    snapshot: Map<String, Value>,
}

impl Passthrough {
    pub fn new(snapshot: Map<String, Value>) -> Self {
        Self { snapshot }
    }

    /// Snapshot of a built-in template document. Anything but an object
    /// yields an empty snapshot.
    pub(crate) fn from_template(doc: Value) -> Self {
        match doc {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// Capture `doc` as a snapshot. `path` names the location for error
    /// reporting when `doc` is not an object.
    pub fn capture(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        match doc {
            Value::Object(map) => Ok(Self::new(map.clone())),
            other => Err(SchemaError::malformed(
                path,
                format!("expected an object, found {}", value_kind(other)),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.snapshot.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.snapshot.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.snapshot
    }

    /// Build a new snapshot from a modified clone of this one.
    pub fn with(&self, edit: impl FnOnce(&mut Map<String, Value>)) -> Self {
        let mut snapshot = self.snapshot.clone();
        edit(&mut snapshot);
        Self { snapshot }
    }

    /// New snapshot with `key` replaced by `value`, only if `key` is present.
    pub fn with_existing(&self, key: &str, value: Value) -> Self {
        self.with(|map| {
            if let Some(slot) = map.get_mut(key) {
                *slot = value;
            }
        })
    }

    pub fn merge(&self) -> MergedDocument {
        MergedDocument {
            map: self.snapshot.clone(),
        }
    }

    pub fn required_str(&self, key: &str, path: &str) -> Result<String, SchemaError> {
        required_str(&self.snapshot, key, path)
    }

    pub fn optional_str(&self, key: &str, path: &str) -> Result<Option<String>, SchemaError> {
        optional_str(&self.snapshot, key, path)
    }

    pub fn optional_bool(&self, key: &str, path: &str) -> Result<Option<bool>, SchemaError> {
        match self.snapshot.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(SchemaError::malformed(
                format!("{path}.{key}"),
                format!("expected a boolean, found {}", value_kind(other)),
            )),
        }
    }

    /// The array stored under `key`; absent and `null` read as empty.
    pub fn optional_array(&self, key: &str, path: &str) -> Result<&[Value], SchemaError> {
        match self.snapshot.get(key) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(SchemaError::malformed(
                format!("{path}.{key}"),
                format!("expected an array, found {}", value_kind(other)),
            )),
        }
    }
}

/// A clone of a snapshot being rebuilt for output.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    map: Map<String, Value>,
}

impl MergedDocument {
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    /// Write `value`, or `null` when absent. Nulls are pruned at final dump.
    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        let value = value.map(Into::into).unwrap_or(Value::Null);
        self.map.insert(key.to_string(), value);
        self
    }

    /// Write `value` at a nested object path, creating or replacing
    /// intermediate objects as needed.
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> &mut Self {
        set_nested(&mut self.map, path, value.into());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.map)
    }
}

fn set_nested(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.to_string(), value);
        return;
    }
    let slot = map
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        set_nested(child, rest, value);
    }
}

pub(crate) fn required_str(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, SchemaError> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(SchemaError::malformed(
            format!("{path}.{key}"),
            "required field is missing",
        )),
        Some(other) => Err(SchemaError::malformed(
            format!("{path}.{key}"),
            format!("expected a string, found {}", value_kind(other)),
        )),
    }
}

pub(crate) fn optional_str(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, SchemaError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SchemaError::malformed(
            format!("{path}.{key}"),
            format!("expected a string, found {}", value_kind(other)),
        )),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
