use thiserror::Error;

use crate::error_codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Table,
    Column,
    Measure,
    Partition,
    Relationship,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Measure => "measure",
            Self::Partition => "partition",
            Self::Relationship => "relationship",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error(
        "[PBIT_SCHEMA_001] a relationship between tables '{from_table}' and '{to_table}' already exists"
    )]
    DuplicateRelationship { from_table: String, to_table: String },

    #[error("[PBIT_SCHEMA_002] column '{column}' already exists in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("[PBIT_SCHEMA_003] table '{table}' already exists")]
    DuplicateTable { table: String },

    #[error("[PBIT_SCHEMA_004] measure '{measure}' already exists in table '{table}'")]
    DuplicateMeasure { table: String, measure: String },

    #[error("[PBIT_SCHEMA_005] {kind} '{name}' does not exist{}", scope_suffix(.scope))]
    MissingEntity {
        kind: EntityKind,
        name: String,
        scope: Option<String>,
    },

    #[error("[PBIT_SCHEMA_006] malformed document at '{path}': {message}")]
    MalformedDocument { path: String, message: String },

    #[error("[PBIT_SCHEMA_007] cannot resolve source path '{path}': {message}")]
    SourcePath { path: String, message: String },
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(scope) => format!(" in {scope}"),
        None => String::new(),
    }
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateRelationship { .. } => {
                error_codes::SCHEMA_DUPLICATE_RELATIONSHIP
            }
            SchemaError::DuplicateColumn { .. } => error_codes::SCHEMA_DUPLICATE_COLUMN,
            SchemaError::DuplicateTable { .. } => error_codes::SCHEMA_DUPLICATE_TABLE,
            SchemaError::DuplicateMeasure { .. } => error_codes::SCHEMA_DUPLICATE_MEASURE,
            SchemaError::MissingEntity { .. } => error_codes::SCHEMA_MISSING_ENTITY,
            SchemaError::MalformedDocument { .. } => error_codes::SCHEMA_MALFORMED_DOCUMENT,
            SchemaError::SourcePath { .. } => error_codes::SCHEMA_SOURCE_PATH,
        }
    }

    pub(crate) fn missing(kind: EntityKind, name: &str) -> Self {
        SchemaError::MissingEntity {
            kind,
            name: name.to_string(),
            scope: None,
        }
    }

    pub(crate) fn missing_in(kind: EntityKind, name: &str, table: &str) -> Self {
        SchemaError::MissingEntity {
            kind,
            name: name.to_string(),
            scope: Some(format!("table '{table}'")),
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::MalformedDocument {
            path: path.into(),
            message: message.into(),
        }
    }
}
