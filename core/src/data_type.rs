use serde::{Deserialize, Serialize};

/// Column and measure data types of the tabular model.
///
/// Values the model does not know are carried verbatim in `Other` so that a
/// loaded document is never rejected for an unfamiliar type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Int64,
    Double,
    Decimal,
    String,
    Boolean,
    DateTime,
    Binary,
    Variant,
    Unknown,
    Any,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Variant => "variant",
            Self::Unknown => "unknown",
            Self::Any => "any",
            Self::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "int64" => Self::Int64,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "dateTime" => Self::DateTime,
            "binary" => Self::Binary,
            "variant" => Self::Variant,
            "unknown" => Self::Unknown,
            "any" => Self::Any,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name written into a column document. `any` is stored as `string`.
    pub fn column_document_name(&self) -> &str {
        match self {
            Self::Any => "string",
            other => other.as_str(),
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        DataType::parse(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummarizeBy {
    None,
    Sum,
    Count,
    Min,
    Max,
    Average,
    DistinctCount,
}

impl Default for SummarizeBy {
    fn default() -> Self {
        Self::Sum
    }
}

impl SummarizeBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Average => "average",
            Self::DistinctCount => "distinctCount",
        }
    }
}
