//! The `Report/Layout` document.
//!
//! The layout stores its section, visual and filter configuration as JSON
//! re-encoded into strings. Reading expands every such layer; writing
//! collapses the known locations back into strings.

use serde_json::Value;

use crate::document::DocPath::{self, Each, Key};
use crate::document::{collapse_path, expand};
use crate::encoding::{read_json_document, write_json_document, EncodingError, JsonLayout};

/// Locations whose value is stored as a JSON string.
const STRING_ENCODED_PATHS: &[&[DocPath]] = &[
    &[Key("config")],
    &[Key("filters")],
    &[Key("sections"), Each, Key("config")],
    &[Key("sections"), Each, Key("filters")],
    &[Key("sections"), Each, Key("visualContainers"), Each, Key("config")],
    &[Key("sections"), Each, Key("visualContainers"), Each, Key("filters")],
    &[Key("sections"), Each, Key("visualContainers"), Each, Key("query")],
    &[Key("sections"), Each, Key("visualContainers"), Each, Key("dataTransforms")],
];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    document: Value,
}

impl ReportLayout {
    /// Wrap an already parsed layout, expanding string-encoded layers.
    pub fn from_value(value: Value) -> Self {
        Self {
            document: expand(value),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let layout = Self::from_value(read_json_document(bytes)?);
        log::debug!("read report layout with {} sections", layout.sections().len());
        Ok(layout)
    }

    /// The layout with string-encoded locations collapsed and pruned, as
    /// it is stored.
    pub fn to_value(&self) -> Value {
        let mut out = self.document.clone();
        let collapsed: usize = STRING_ENCODED_PATHS
            .iter()
            .map(|path| collapse_path(&mut out, path, true))
            .sum();
        log::trace!("collapsed {collapsed} layout sub-documents");
        out
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        write_json_document(&self.to_value(), JsonLayout::Compact)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Value {
        &mut self.document
    }

    pub fn sections(&self) -> &[Value] {
        self.document
            .get("sections")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display names of the report pages, in order.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections()
            .iter()
            .filter_map(|s| s.get("displayName").and_then(Value::as_str))
            .collect()
    }
}
