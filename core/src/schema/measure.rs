use serde_json::{json, Value};
use uuid::Uuid;

use crate::data_type::DataType;
use crate::passthrough::{value_kind, Passthrough};

use super::column::dax_column_ref;
use super::SchemaError;

const PERCENT_FORMAT: &str = "0.00%;-0.00%;0.00%";

#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    name: String,
    expression: String,
    format_string: Option<String>,
    data_type: Option<DataType>,
    lineage_tag: Option<String>,
    passthrough: Passthrough,
}

impl Measure {
    pub(crate) fn new(name: &str) -> Self {
        let lineage_tag = Uuid::new_v4().to_string();
        let doc = json!({
            "name": name,
            "expression": "",
            "lineageTag": lineage_tag,
        });
        Self {
            name: name.to_string(),
            expression: String::new(),
            format_string: None,
            data_type: None,
            lineage_tag: Some(lineage_tag),
            passthrough: Passthrough::from_template(doc),
        }
    }

    /// Hydrate from a measure document. Multi-line expressions stored as an
    /// array of lines are joined with newlines.
    pub fn load(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        let passthrough = Passthrough::capture(doc, path)?;
        let expression = match passthrough.get("expression") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(lines)) => {
                let mut joined = Vec::with_capacity(lines.len());
                for (i, line) in lines.iter().enumerate() {
                    match line {
                        Value::String(text) => joined.push(text.as_str()),
                        other => {
                            return Err(SchemaError::malformed(
                                format!("{path}.expression[{i}]"),
                                format!("expected a string, found {}", value_kind(other)),
                            ))
                        }
                    }
                }
                joined.join("\n")
            }
            None | Some(Value::Null) => {
                return Err(SchemaError::malformed(
                    format!("{path}.expression"),
                    "required field is missing",
                ))
            }
            Some(other) => {
                return Err(SchemaError::malformed(
                    format!("{path}.expression"),
                    format!("expected a string or lines, found {}", value_kind(other)),
                ))
            }
        };
        Ok(Self {
            name: passthrough.required_str("name", path)?,
            expression,
            format_string: passthrough.optional_str("formatString", path)?,
            data_type: passthrough
                .optional_str("dataType", path)?
                .map(|name| DataType::parse(&name)),
            lineage_tag: passthrough.optional_str("lineageTag", path)?,
            passthrough,
        })
    }

    pub fn dump(&self) -> Value {
        let mut merged = self.passthrough.merge();
        merged
            .set("name", self.name.as_str())
            .set("expression", self.expression.as_str())
            .set_opt("formatString", self.format_string.as_deref())
            .set_opt("lineageTag", self.lineage_tag.as_deref())
            .set_opt("dataType", self.data_type.as_ref().map(DataType::as_str));
        merged.into_value()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn format_string(&self) -> Option<&str> {
        self.format_string.as_deref()
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    pub fn lineage_tag(&self) -> Option<&str> {
        self.lineage_tag.as_deref()
    }

    pub fn set_expression(&mut self, expression: impl Into<String>, data_type: DataType) -> &mut Self {
        self.expression = expression.into();
        self.data_type = Some(data_type);
        self
    }

    pub fn set_format(&mut self, format_string: impl Into<String>) -> &mut Self {
        self.format_string = Some(format_string.into());
        self
    }

    /// Share of rows in `table` whose boolean `retained_column` is true,
    /// formatted as a percentage.
    pub fn set_to_retention_rate(&mut self, table: &str, retained_column: &str) -> &mut Self {
        let table_ref = format!("'{}'", table.replace('\'', "''"));
        let flag = dax_column_ref(table, retained_column);
        let expression = format!(
            "COUNTROWS(FILTER({table_ref}, {flag}=TRUE()))/COUNTROWS({table_ref})"
        );
        self.set_expression(expression, DataType::Double)
            .set_format(PERCENT_FORMAT)
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }
}
