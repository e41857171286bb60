//! Pbit: build and parse Power BI template (`.pbit`) bundles.
//!
//! This crate provides functionality for:
//! - Loading the tabular model schema into a typed, editable graph and
//!   dumping it back without losing properties it does not model
//! - Compiling data-loading steps into Power Query (M) `let … in` expressions
//! - Reading and writing the report layout with its string-encoded JSON
//! - Opening and saving the zip bundle that holds both documents
//!
//! # Quick Start
//!
//! ```ignore
//! use pbit::{DataType, PbitBundle};
//!
//! let mut bundle = PbitBundle::open(std::fs::File::open("template.pbit")?)?;
//! let orders = bundle.schema.new_table("Orders")?;
//! orders.bind_to_json(
//!     std::path::Path::new("orders.json"),
//!     &[("id".to_string(), DataType::Int64), ("total".to_string(), DataType::Double)],
//!     None,
//! )?;
//! bundle.schema.new_relationship("Orders", "id", "Payments", Some("order_id"))?;
//! bundle.save(std::fs::File::create("out.pbit")?)?;
//! ```

#[cfg(feature = "std-fs")]
mod archive;
mod bundle;
mod config;
mod container;
mod data_type;
mod document;
mod encoding;
pub mod error_codes;
mod m_types;
mod passthrough;
mod report;
pub mod schema;
mod step_chain;

#[cfg(feature = "std-fs")]
pub use archive::{pack, unpack};
pub use bundle::{read_schema_document, write_schema_document, BundleError, PbitBundle};
pub use config::{ConfigError, SchemaConfig, SchemaConfigBuilder};
pub use container::{
    write_bundle, BundleContainer, ContainerError, ContainerLimits, LAYOUT_PART, SCHEMA_PART,
};
pub use data_type::{DataType, SummarizeBy};
pub use document::{collapse_path, expand, prune_nulls, DocPath};
pub use encoding::{
    decode_utf16le, encode_utf16le, read_json_document, write_json_document, EncodingError,
    JsonLayout,
};
pub use m_types::{m_list, m_pairs, m_text, MType};
pub use passthrough::{MergedDocument, Passthrough};
pub use report::ReportLayout;
pub use schema::{
    dax_column_ref, BinOptions, Column, EntityKind, Measure, NormalizeOptions, Partition,
    Relationship, SchemaError, SchemaGraph, Table, ROW_NUMBER_COLUMN,
};
pub use step_chain::{
    previous_step_ref, RecordFields, StepChain, StepCommand, StepNumbering, PREVIOUS_STEP,
};
