//! Compile ordered data-loading steps into an M `let … in` expression.
//!
//! A [`StepChain`] holds [`StepCommand`]s in evaluation order. Rendering
//! assigns each command a unique display name derived from its base name and
//! substitutes the [`PREVIOUS_STEP`] placeholder with the display name of the
//! command right before it, so steps can chain without knowing final names.
//!
//! ```text
//! let
//!     #"File Contents1" = File.Contents( "C:/data/rows.json", null),
//!     #"Json Document1" = Json.Document( #"File Contents1", null)
//! in
//!     #"Json Document1"
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::m_types::{m_list, m_pairs, m_text, MType};

/// Placeholder standing for the display name of the preceding step.
pub const PREVIOUS_STEP: &str = "~!PRIOR_TABLE_KEY!~";

/// Quoted-identifier reference to the preceding step, the default `source`
/// argument of the chaining commands.
pub fn previous_step_ref() -> String {
    format!("#\"{PREVIOUS_STEP}\"")
}

/// How repeated base names are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepNumbering {
    /// `B1`, `B2`, `B3`, …
    Sequential,
    /// `B1`, `B3`, `B4`, … as written by earlier template generators.
    Legacy,
}

impl Default for StepNumbering {
    fn default() -> Self {
        Self::Sequential
    }
}

impl StepNumbering {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Legacy => "legacy",
        }
    }
}

/// Hands out unique display names for a chain being rendered.
#[derive(Debug, Default)]
struct StepNamer {
    numbering: StepNumbering,
    seen: HashMap<String, u32>,
    taken: HashSet<String>,
}

impl StepNamer {
    fn new(numbering: StepNumbering) -> Self {
        Self {
            numbering,
            seen: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    /// A candidate already handed out (`Step` + `11` vs. `Step1` + `1`) is
    /// skipped by advancing the counter of `base`.
    fn assign(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        loop {
            *count += 1;
            let suffix = match (self.numbering, *count) {
                (_, 1) => 1,
                (StepNumbering::Sequential, n) => n,
                (StepNumbering::Legacy, n) => n + 1,
            };
            let name = format!("{base}{suffix}");
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    id: String,
    function: String,
    parameter_order: Vec<String>,
    parameters: HashMap<String, Option<String>>,
    name: Option<String>,
}

impl StepCommand {
    pub fn new(function: impl Into<String>, parameter_order: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            function: function.into(),
            parameter_order: parameter_order.iter().map(|p| p.to_string()).collect(),
            parameters: HashMap::new(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a parameter to literal M text. `None` renders as `null`.
    pub fn with_param(mut self, key: &str, value: Option<String>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn set_param(&mut self, key: &str, value: Option<String>) -> &mut Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn set_name(&mut self, name: Option<String>) -> &mut Self {
        self.name = name;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn parameter_order(&self) -> &[String] {
        &self.parameter_order
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_deref())
    }

    /// Display name before numbering: the explicit name, or the function
    /// identifier with dots replaced by spaces.
    pub fn base_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.function.replace('.', " "),
        }
    }

    /// Render `function( arg0, arg1, …)` with the placeholder resolved to
    /// `previous`.
    pub fn render_call(&self, previous: &str) -> String {
        let args: Vec<String> = self
            .parameter_order
            .iter()
            .map(|key| match self.parameters.get(key) {
                Some(Some(value)) => format!(" {}", value.replace(PREVIOUS_STEP, previous)),
                _ => " null".to_string(),
            })
            .collect();
        format!("{}({})", self.function, args.join(","))
    }

    /// Render as a named `let` binding.
    pub fn render_binding(&self, assigned_name: &str, previous: &str) -> String {
        format!("#\"{assigned_name}\" = {}", self.render_call(previous))
    }
}

/// Ordered list of steps rendered into a `let … in` expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepChain {
    commands: Vec<StepCommand>,
}

impl StepChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[StepCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn push(&mut self, command: StepCommand) -> &mut StepCommand {
        self.commands.push(command);
        let last = self.commands.len() - 1;
        &mut self.commands[last]
    }

    /// Display names in chain order under `numbering`.
    pub fn assigned_names(&self, numbering: StepNumbering) -> Vec<String> {
        let mut namer = StepNamer::new(numbering);
        self.commands
            .iter()
            .map(|cmd| namer.assign(&cmd.base_name()))
            .collect()
    }

    pub fn render_lines(&self) -> Vec<String> {
        self.render_lines_with(StepNumbering::default())
    }

    /// Render one string per line: `let`, each binding indented by a tab and
    /// comma-terminated except the last, `in`, then the final step reference.
    /// An empty chain renders as `let` / `in` with no result.
    pub fn render_lines_with(&self, numbering: StepNumbering) -> Vec<String> {
        let names = self.assigned_names(numbering);
        let mut lines = Vec::with_capacity(self.commands.len() + 3);
        lines.push("let".to_string());

        let mut previous = "";
        for (idx, (command, name)) in self.commands.iter().zip(names.iter()).enumerate() {
            log::trace!("step {idx}: {} -> {name}", command.function());
            let mut line = format!("\t{}", command.render_binding(name, previous));
            if idx + 1 < self.commands.len() {
                line.push(',');
            }
            lines.push(line);
            previous = name;
        }

        lines.push("in".to_string());
        if let Some(last) = names.last() {
            lines.push(format!("\t#\"{last}\""));
        }
        lines
    }

    pub fn render_text(&self) -> String {
        self.render_lines().join("\n")
    }

    /// `File.Contents(path, options)`; backslashes in `path` are written as
    /// forward slashes.
    pub fn push_read_file(&mut self, path: &str) -> &mut StepCommand {
        let literal = m_text(&path.replace('\\', "/"));
        self.push(
            StepCommand::new("File.Contents", &["path", "options"]).with_param("path", Some(literal)),
        )
    }

    pub fn push_json_document(&mut self, encoding: Option<u32>) -> &mut StepCommand {
        self.push(
            StepCommand::new("Json.Document", &["source", "encoding"])
                .with_param("source", Some(previous_step_ref()))
                .with_param("encoding", encoding.map(|e| e.to_string())),
        )
    }

    pub fn push_csv_document(
        &mut self,
        column_names: &[&str],
        delimiter: Option<&str>,
        encoding: Option<u32>,
    ) -> &mut StepCommand {
        let columns = if column_names.is_empty() {
            None
        } else {
            Some(m_list(column_names, true))
        };
        self.push(
            StepCommand::new(
                "Csv.Document",
                &["source", "columns", "delimiter", "extra_values", "encoding"],
            )
            .with_param("source", Some(previous_step_ref()))
            .with_param("columns", columns)
            .with_param("delimiter", delimiter.map(m_text))
            .with_param("extra_values", Some("ExtraValues.Error".to_string()))
            .with_param("encoding", encoding.map(|e| e.to_string())),
        )
    }

    /// `Table.FromList` splitting nothing, so each list item becomes one row
    /// of a single column named `Column1`.
    pub fn push_table_from_list(&mut self) -> &mut StepCommand {
        self.push(
            StepCommand::new(
                "Table.FromList",
                &["source", "splitter", "columns", "default", "extra_values"],
            )
            .with_param("source", Some(previous_step_ref()))
            .with_param("splitter", Some("Splitter.SplitByNothing()".to_string()))
            .with_param("extra_values", Some("ExtraValues.Error".to_string())),
        )
    }

    pub fn push_expand_record_column(
        &mut self,
        column: &str,
        fields: &RecordFields,
    ) -> &mut StepCommand {
        let (field_names, new_names) = match fields {
            RecordFields::Keep(names) => (m_list(names.as_slice(), true), None),
            RecordFields::Rename(pairs) => {
                let from: Vec<&str> = pairs.iter().map(|(f, _)| f.as_str()).collect();
                let to: Vec<&str> = pairs.iter().map(|(_, t)| t.as_str()).collect();
                (m_list(&from, true), Some(m_list(&to, true)))
            }
        };
        self.push(
            StepCommand::new(
                "Table.ExpandRecordColumn",
                &["source", "column", "field_names", "new_column_names"],
            )
            .with_param("source", Some(previous_step_ref()))
            .with_param("column", Some(m_text(column)))
            .with_param("field_names", Some(field_names))
            .with_param("new_column_names", new_names),
        )
    }

    pub fn push_transform_column_types(
        &mut self,
        types: &[(String, MType)],
        culture: Option<&str>,
    ) -> &mut StepCommand {
        let pairs: Vec<(&str, &str)> = types.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();
        self.push(
            StepCommand::new(
                "Table.TransformColumnTypes",
                &["source", "type_transformations", "culture"],
            )
            .with_param("source", Some(previous_step_ref()))
            .with_param("type_transformations", Some(m_pairs(&pairs, true, false)))
            .with_param("culture", culture.map(m_text)),
        )
    }
}

/// Field selection for `Table.ExpandRecordColumn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFields {
    /// Expand these fields under their own names.
    Keep(Vec<String>),
    /// Expand `(field, new column name)` pairs.
    Rename(Vec<(String, String)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv() -> StepCommand {
        StepCommand::new("Csv.Document", &["source", "delimiter"])
            .with_param("source", Some(previous_step_ref()))
    }

    fn json_doc() -> StepCommand {
        StepCommand::new("Json.Document", &["source"]).with_param("source", Some(previous_step_ref()))
    }

    #[test]
    fn absent_parameters_render_as_null() {
        let cmd = StepCommand::new("File.Contents", &["path", "options"])
            .with_param("path", Some("\"a.json\"".to_string()));
        assert_eq!(cmd.render_call(""), "File.Contents( \"a.json\", null)");
        let unset = cmd.clone().with_param("path", None);
        assert_eq!(unset.render_call(""), "File.Contents( null, null)");
    }

    #[test]
    fn base_name_defaults_to_function_with_spaces() {
        assert_eq!(json_doc().base_name(), "Json Document");
        assert_eq!(json_doc().with_name("Parsed").base_name(), "Parsed");
    }

    #[test]
    fn sequential_numbering_counts_from_one() {
        let mut chain = StepChain::new();
        chain.push(csv());
        chain.push(csv());
        chain.push(json_doc());
        chain.push(csv());
        assert_eq!(
            chain.assigned_names(StepNumbering::Sequential),
            vec!["Csv Document1", "Csv Document2", "Json Document1", "Csv Document3"]
        );
    }

    #[test]
    fn legacy_numbering_skips_two() {
        let mut chain = StepChain::new();
        chain.push(csv());
        chain.push(csv());
        chain.push(csv());
        assert_eq!(
            chain.assigned_names(StepNumbering::Legacy),
            vec!["Csv Document1", "Csv Document3", "Csv Document4"]
        );
    }

    #[test]
    fn placeholder_resolves_to_preceding_assigned_name() {
        let mut chain = StepChain::new();
        chain.push(csv());
        chain.push(csv());
        chain.push(json_doc());
        let lines = chain.render_lines();
        assert_eq!(
            lines,
            vec![
                "let".to_string(),
                "\t#\"Csv Document1\" = Csv.Document( #\"\", null),".to_string(),
                "\t#\"Csv Document2\" = Csv.Document( #\"Csv Document1\", null),".to_string(),
                "\t#\"Json Document1\" = Json.Document( #\"Csv Document2\")".to_string(),
                "in".to_string(),
                "\t#\"Json Document1\"".to_string(),
            ]
        );
        assert!(!chain.render_text().contains(PREVIOUS_STEP));
    }

    #[test]
    fn empty_chain_has_no_result() {
        let chain = StepChain::new();
        assert_eq!(chain.render_lines(), vec!["let".to_string(), "in".to_string()]);
    }

    #[test]
    fn helper_commands_chain_through_previous_step() {
        let mut chain = StepChain::new();
        chain.push_read_file("C:\\data\\rows.json");
        chain.push_json_document(None);
        chain.push_table_from_list();
        chain.push_expand_record_column(
            "Column1",
            &RecordFields::Keep(vec!["id".to_string(), "name".to_string()]),
        );
        chain.push_transform_column_types(
            &[("id".to_string(), MType::Int64), ("name".to_string(), MType::Text)],
            None,
        );

        let lines = chain.render_lines();
        assert_eq!(lines.len(), 8);
        assert_eq!(
            lines[1],
            "\t#\"File Contents1\" = File.Contents( \"C:/data/rows.json\", null),"
        );
        assert_eq!(
            lines[2],
            "\t#\"Json Document1\" = Json.Document( #\"File Contents1\", null),"
        );
        assert_eq!(
            lines[3],
            "\t#\"Table FromList1\" = Table.FromList( #\"Json Document1\", Splitter.SplitByNothing(), null, null, ExtraValues.Error),"
        );
        assert_eq!(
            lines[4],
            "\t#\"Table ExpandRecordColumn1\" = Table.ExpandRecordColumn( #\"Table FromList1\", \"Column1\", {\"id\", \"name\"}, null),"
        );
        assert_eq!(
            lines[5],
            "\t#\"Table TransformColumnTypes1\" = Table.TransformColumnTypes( #\"Table ExpandRecordColumn1\", {{\"id\", Int64.Type},{\"name\", type text}}, null)"
        );
        assert_eq!(lines[7], "\t#\"Table TransformColumnTypes1\"");
    }

    #[test]
    fn renamed_record_fields_render_both_lists() {
        let mut chain = StepChain::new();
        chain.push_expand_record_column(
            "Column1",
            &RecordFields::Rename(vec![("a".to_string(), "A".to_string())]),
        );
        let text = chain.render_text();
        assert!(text.contains("{\"a\"}, {\"A\"})"), "{text}");
    }

    #[test]
    fn generated_names_never_repeat_an_explicit_name() {
        let step = || StepCommand::new("Step", &["source"]);
        let mut chain = StepChain::new();
        for _ in 0..11 {
            chain.push(step());
        }
        chain.push(step().with_name("Step1"));

        for numbering in [StepNumbering::Sequential, StepNumbering::Legacy] {
            let names = chain.assigned_names(numbering);
            let unique: HashSet<&String> = names.iter().collect();
            assert_eq!(unique.len(), names.len(), "{names:?}");
        }
        let names = chain.assigned_names(StepNumbering::Sequential);
        assert_eq!(names[10], "Step11");
        assert_eq!(names[11], "Step12");
    }
}
