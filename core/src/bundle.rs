//! A template bundle opened for editing.
//!
//! [`PbitBundle`] hydrates the `DataModelSchema` part into a [`SchemaGraph`]
//! and the `Report/Layout` part into a [`ReportLayout`], and keeps every other
//! part as raw bytes so that saving writes the archive back in its original
//! order.

use std::io::{Read, Seek, Write};

use serde_json::Value;
use thiserror::Error;

use crate::config::SchemaConfig;
use crate::container::{write_bundle, BundleContainer, ContainerError, LAYOUT_PART, SCHEMA_PART};
use crate::encoding::{read_json_document, write_json_document, EncodingError, JsonLayout};
use crate::report::ReportLayout;
use crate::schema::{SchemaError, SchemaGraph};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BundleError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("[PBIT_CONTAINER_001] I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    pub fn code(&self) -> &'static str {
        match self {
            BundleError::Container(err) => err.code(),
            BundleError::Encoding(err) => err.code(),
            BundleError::Schema(err) => err.code(),
            BundleError::Io(_) => crate::error_codes::CONTAINER_IO,
        }
    }
}

/// Decode the `DataModelSchema` part into a JSON document.
pub fn read_schema_document(bytes: &[u8]) -> Result<Value, EncodingError> {
    read_json_document(bytes)
}

/// Encode a schema document the way Power BI Desktop stores it.
pub fn write_schema_document(value: &Value) -> Result<Vec<u8>, EncodingError> {
    write_json_document(value, JsonLayout::Pretty)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbitBundle {
    pub schema: SchemaGraph,
    pub layout: Option<ReportLayout>,
    /// Every part as read, in archive order.
    pub parts: Vec<(String, Vec<u8>)>,
}

impl PbitBundle {
    pub fn open<R: Read + Seek + 'static>(reader: R) -> Result<Self, BundleError> {
        Self::open_with_config(reader, SchemaConfig::default())
    }

    pub fn open_with_config<R: Read + Seek + 'static>(
        reader: R,
        config: SchemaConfig,
    ) -> Result<Self, BundleError> {
        let mut container = BundleContainer::open_from_reader(reader)?;
        let parts = container.read_all()?;

        let schema_bytes = part_bytes(&parts, SCHEMA_PART).ok_or_else(|| {
            ContainerError::MissingPart {
                path: SCHEMA_PART.to_string(),
            }
        })?;
        let schema = SchemaGraph::from_document(&read_schema_document(schema_bytes)?, config)?;
        let layout = match part_bytes(&parts, LAYOUT_PART) {
            Some(bytes) => Some(ReportLayout::from_bytes(bytes)?),
            None => None,
        };

        log::debug!(
            "opened bundle: {} parts, schema '{}', layout {}",
            parts.len(),
            schema.id(),
            if layout.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            schema,
            layout,
            parts,
        })
    }

    #[cfg(feature = "std-fs")]
    pub fn open_path(path: impl AsRef<std::path::Path>) -> Result<Self, BundleError> {
        let file = std::fs::File::open(path)?;
        Self::open(file)
    }

    /// The parts to write: originals in order, with the schema and layout
    /// replaced by freshly dumped content.
    pub fn to_parts(&self) -> Result<Vec<(String, Vec<u8>)>, BundleError> {
        let schema = write_schema_document(&self.schema.dump())?;
        let layout = match &self.layout {
            Some(layout) => Some(layout.to_bytes()?),
            None => None,
        };

        let mut out = Vec::with_capacity(self.parts.len() + 1);
        for (name, bytes) in &self.parts {
            let bytes = match (name.as_str(), &layout) {
                (SCHEMA_PART, _) => schema.clone(),
                (LAYOUT_PART, Some(layout)) => layout.clone(),
                _ => bytes.clone(),
            };
            out.push((name.clone(), bytes));
        }
        if part_bytes(&self.parts, SCHEMA_PART).is_none() {
            out.push((SCHEMA_PART.to_string(), schema));
        }
        if let (Some(layout), None) = (layout, part_bytes(&self.parts, LAYOUT_PART)) {
            out.push((LAYOUT_PART.to_string(), layout));
        }
        Ok(out)
    }

    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<W, BundleError> {
        let parts = self.to_parts()?;
        Ok(write_bundle(writer, parts.as_slice())?)
    }

    #[cfg(feature = "std-fs")]
    pub fn save_path(&self, path: impl AsRef<std::path::Path>) -> Result<(), BundleError> {
        let file = std::fs::File::create(path)?;
        self.save(file)?;
        Ok(())
    }
}

fn part_bytes<'a>(parts: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    parts
        .iter()
        .find(|(part, _)| part == name)
        .map(|(_, bytes)| bytes.as_slice())
}
