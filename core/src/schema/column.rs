use serde_json::{json, Value};
use uuid::Uuid;

use crate::data_type::{DataType, SummarizeBy};
use crate::passthrough::Passthrough;

use super::SchemaError;

/// Name of the hidden row-number column every imported table carries.
pub const ROW_NUMBER_COLUMN: &str = "RowNumber-2662979B-1795-4F74-8F37-6A1BA8059B61";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    source_column: Option<String>,
    lineage_tag: Option<String>,
    passthrough: Passthrough,
}

impl Column {
    /// A plain imported column reading `source_column` from the partition.
    pub(crate) fn new(name: &str, data_type: DataType, source_column: Option<&str>) -> Self {
        let lineage_tag = Uuid::new_v4().to_string();
        let doc = json!({
            "name": name,
            "dataType": data_type.column_document_name(),
            "sourceColumn": source_column,
            "lineageTag": lineage_tag,
            "summarizeBy": SummarizeBy::None.as_str(),
            "attributeHierarchy": { "state": "ready" },
            "annotations": [
                { "name": "SummarizationSetBy", "value": "Automatic" }
            ]
        });
        Self {
            name: name.to_string(),
            data_type,
            source_column: source_column.map(str::to_string),
            lineage_tag: Some(lineage_tag),
            passthrough: Passthrough::from_template(doc),
        }
    }

    pub(crate) fn row_number() -> Self {
        let doc = json!({
            "type": "rowNumber",
            "name": ROW_NUMBER_COLUMN,
            "dataType": "int64",
            "isHidden": true,
            "isUnique": true,
            "isKey": true,
            "isNullable": false,
            "attributeHierarchy": { "state": "ready" }
        });
        Self {
            name: ROW_NUMBER_COLUMN.to_string(),
            data_type: DataType::Int64,
            source_column: None,
            lineage_tag: None,
            passthrough: Passthrough::from_template(doc),
        }
    }

    /// A calculated column evaluating a DAX expression per row.
    pub(crate) fn calculated(
        name: &str,
        expression: Value,
        data_type: DataType,
        summarize_by: SummarizeBy,
    ) -> Self {
        let lineage_tag = Uuid::new_v4().to_string();
        let doc = json!({
            "type": "calculated",
            "name": name,
            "dataType": data_type.column_document_name(),
            "isDataTypeInferred": true,
            "expression": expression,
            "lineageTag": lineage_tag,
            "summarizeBy": summarize_by.as_str(),
            "attributeHierarchy": { "state": "ready" },
            "annotations": [
                { "name": "SummarizationSetBy", "value": "Automatic" }
            ]
        });
        Self {
            name: name.to_string(),
            data_type,
            source_column: None,
            lineage_tag: Some(lineage_tag),
            passthrough: Passthrough::from_template(doc),
        }
    }

    /// A grouping column placing `table[column]` into buckets of width
    /// `increment`, rounding toward zero.
    pub(crate) fn bin(
        name: &str,
        table: &str,
        column: &str,
        increment: f64,
        data_type: DataType,
    ) -> Self {
        let target = dax_column_ref(table, column);
        let expression = json!([
            "IF(",
            format!("\tISBLANK({target}),"),
            "\tBLANK(),",
            "\tIF(",
            format!("\t\t{target} >= 0,"),
            format!("\t\tROUNDDOWN({target} / {increment}, 0) * {increment},"),
            format!("\t\tROUNDUP({target} / {increment}, 0) * {increment}"),
            "\t)",
            ")"
        ]);
        let source_ref = json!({ "SourceRef": { "Source": "p" } });
        let design_state = json!({
            "Version": 0,
            "Sources": [{ "Name": "p", "Entity": table }],
            "GroupedColumns": [
                { "Column": { "Expression": source_ref, "Property": column } }
            ],
            "BinItem": {
                "Expression": {
                    "Floor": {
                        "Expression": { "Column": { "Expression": source_ref, "Property": column } },
                        "Size": increment
                    }
                }
            }
        });

        let mut built = Self::calculated(name, expression, data_type, SummarizeBy::None);
        built.passthrough = built.passthrough.with(|doc| {
            doc.insert(
                "extendedProperties".to_string(),
                json!([{
                    "type": "json",
                    "name": "GroupingMetadata",
                    "value": {
                        "version": 0,
                        "groupedColumns": [{
                            "Column": {
                                "Expression": { "SourceRef": { "Entity": table } },
                                "Property": column
                            }
                        }],
                        "binningMetadata": {
                            "binSize": { "value": increment, "unit": 0 }
                        }
                    }
                }]),
            );
            doc.insert(
                "annotations".to_string(),
                json!([
                    { "name": "GroupingDesignState", "value": design_state.to_string() },
                    { "name": "SummarizationSetBy", "value": "Automatic" },
                    { "name": "PBI_FormatHint", "value": "{\"isGeneralNumber\":true}" }
                ]),
            );
        });
        built
    }

    pub fn load(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        let passthrough = Passthrough::capture(doc, path)?;
        Ok(Self {
            name: passthrough.required_str("name", path)?,
            data_type: DataType::parse(&passthrough.required_str("dataType", path)?),
            source_column: passthrough.optional_str("sourceColumn", path)?,
            lineage_tag: passthrough.optional_str("lineageTag", path)?,
            passthrough,
        })
    }

    pub fn dump(&self) -> Value {
        let mut merged = self.passthrough.merge();
        merged
            .set("name", self.name.as_str())
            .set("dataType", self.data_type.column_document_name())
            .set_opt("sourceColumn", self.source_column.as_deref())
            .set_opt("lineageTag", self.lineage_tag.as_deref());
        merged.into_value()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn set_data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    pub fn source_column(&self) -> Option<&str> {
        self.source_column.as_deref()
    }

    pub fn set_source_column(&mut self, source_column: Option<&str>) -> &mut Self {
        self.source_column = source_column.map(str::to_string);
        self
    }

    pub fn lineage_tag(&self) -> Option<&str> {
        self.lineage_tag.as_deref()
    }

    /// Column kind from the document (`calculated`, `rowNumber`, …); plain
    /// imported columns have none.
    pub fn kind(&self) -> Option<&str> {
        self.passthrough.get("type").and_then(Value::as_str)
    }

    pub fn is_calculated(&self) -> bool {
        self.kind() == Some("calculated")
    }

    /// DAX expression of a calculated column, with line arrays joined.
    pub fn expression(&self) -> Option<String> {
        match self.passthrough.get("expression")? {
            Value::String(text) => Some(text.clone()),
            Value::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        }
    }

    pub fn summarize_by(&self) -> Option<SummarizeBy> {
        let value = self.passthrough.get("summarizeBy")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }
}

/// DAX reference to `'table'[column]`, escaping quotes and brackets.
pub fn dax_column_ref(table: &str, column: &str) -> String {
    format!(
        "'{}'[{}]",
        table.replace('\'', "''"),
        column.replace(']', "]]")
    )
}
