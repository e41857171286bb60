use std::path::Path;

use serde_json::{json, Value};

use crate::data_type::DataType;
use crate::m_types::MType;
use crate::passthrough::{required_str, value_kind, Passthrough};
use crate::step_chain::{RecordFields, StepChain, StepNumbering};

use super::SchemaError;

/// Column produced by `Table.FromList` over a JSON list.
const LIST_COLUMN: &str = "Column1";

/// A data-loading unit of a table.
///
/// When the attached [`StepChain`] holds commands, its rendered lines replace
/// `source.expression` on dump; otherwise the loaded expression is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    name: Option<String>,
    mode: Option<String>,
    state: Option<String>,
    query_group: Option<String>,
    source_type: String,
    steps: StepChain,
    passthrough: Passthrough,
}

impl Partition {
    pub(crate) fn new(name: Option<&str>, query_group: Option<&str>) -> Self {
        let doc = json!({
            "name": name,
            "mode": "import",
            "state": "ready",
            "queryGroup": query_group,
            "source": { "type": "m", "expression": [] }
        });
        Self {
            name: name.map(str::to_string),
            mode: Some("import".to_string()),
            state: Some("ready".to_string()),
            query_group: query_group.map(str::to_string),
            source_type: "m".to_string(),
            steps: StepChain::new(),
            passthrough: Passthrough::from_template(doc),
        }
    }

    pub fn load(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        let passthrough = Passthrough::capture(doc, path)?;
        let source_path = format!("{path}.source");
        let source_type = match passthrough.get("source") {
            Some(Value::Object(source)) => required_str(source, "type", &source_path)?,
            None | Some(Value::Null) => {
                return Err(SchemaError::malformed(source_path, "required field is missing"))
            }
            Some(other) => {
                return Err(SchemaError::malformed(
                    source_path,
                    format!("expected an object, found {}", value_kind(other)),
                ))
            }
        };
        Ok(Self {
            name: passthrough.optional_str("name", path)?,
            mode: passthrough.optional_str("mode", path)?,
            state: passthrough.optional_str("state", path)?,
            query_group: passthrough.optional_str("queryGroup", path)?,
            source_type,
            steps: StepChain::new(),
            passthrough,
        })
    }

    pub fn dump(&self, numbering: StepNumbering) -> Value {
        let mut merged = self.passthrough.merge();
        merged
            .set_opt("name", self.name.as_deref())
            .set_opt("mode", self.mode.as_deref())
            .set_opt("state", self.state.as_deref())
            .set_opt("queryGroup", self.query_group.as_deref())
            .set_path(&["source", "type"], self.source_type.as_str());
        if !self.steps.is_empty() {
            merged.set_path(
                &["source", "expression"],
                self.steps.render_lines_with(numbering),
            );
        }
        merged.into_value()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn query_group(&self) -> Option<&str> {
        self.query_group.as_deref()
    }

    pub fn set_query_group(&mut self, query_group: Option<&str>) -> &mut Self {
        self.query_group = query_group.map(str::to_string);
        self
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn steps(&self) -> &StepChain {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut StepChain {
        &mut self.steps
    }

    /// The expression this partition dumps: the rendered step chain when one
    /// is attached, otherwise the loaded `source.expression`.
    pub fn expression_text(&self, numbering: StepNumbering) -> Option<String> {
        if !self.steps.is_empty() {
            return Some(self.steps.render_lines_with(numbering).join("\n"));
        }
        match self.passthrough.get("source")?.get("expression")? {
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

    /// Replace the step chain with a reader for a JSON file holding a list of
    /// records, expanding one column per entry of `columns` with its M type.
    /// `path` is resolved to an absolute path and written with `/`
    /// separators.
    pub fn set_to_json_reader(
        &mut self,
        path: &Path,
        columns: &[(String, DataType)],
    ) -> Result<(), SchemaError> {
        let absolute = resolve_source_path(path)?;

        let mut steps = StepChain::new();
        steps.push_read_file(&absolute);
        steps.push_json_document(None);
        steps.push_table_from_list();
        steps.push_expand_record_column(
            LIST_COLUMN,
            &RecordFields::Keep(columns.iter().map(|(name, _)| name.clone()).collect()),
        );
        let types: Vec<(String, MType)> = columns
            .iter()
            .map(|(name, data_type)| (name.clone(), MType::from_data_type(data_type)))
            .collect();
        steps.push_transform_column_types(&types, None);

        self.steps = steps;
        self.source_type = "m".to_string();
        Ok(())
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }
}

fn resolve_source_path(path: &Path) -> Result<String, SchemaError> {
    let display = path.display().to_string();
    let absolute = std::path::absolute(path).map_err(|e| SchemaError::SourcePath {
        path: display.clone(),
        message: e.to_string(),
    })?;
    match absolute.to_str() {
        Some(text) => Ok(text.replace('\\', "/")),
        None => Err(SchemaError::SourcePath {
            path: display,
            message: "path is not valid UTF-8".to_string(),
        }),
    }
}
