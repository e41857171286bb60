use serde_json::{json, Value};
use uuid::Uuid;

use crate::passthrough::Passthrough;

use super::SchemaError;

const BOTH_DIRECTIONS: &str = "bothDirections";
const ONE_DIRECTION: &str = "oneDirection";

/// A link between a column of one table and a column of another.
///
/// Endpoints are table and column names; they are resolved against the
/// owning graph only when asked to (see `SchemaGraph::validate_references`).
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    name: String,
    from_table: String,
    from_column: String,
    to_table: String,
    to_column: String,
    /// `crossFilteringBehavior` as loaded or last set.
    cross_filtering: String,
    passthrough: Passthrough,
}

impl Relationship {
    pub(crate) fn new(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> Self {
        let name = Uuid::new_v4().to_string();
        let doc = json!({
            "name": name,
            "fromTable": from_table,
            "fromColumn": from_column,
            "toTable": to_table,
            "toColumn": to_column,
            "crossFilteringBehavior": BOTH_DIRECTIONS,
            "joinOnDateBehavior": "datePartOnly",
            "state": "ready",
        });
        let passthrough = Passthrough::from_template(doc);
        Self {
            name,
            from_table: from_table.to_string(),
            from_column: from_column.to_string(),
            to_table: to_table.to_string(),
            to_column: to_column.to_string(),
            cross_filtering: BOTH_DIRECTIONS.to_string(),
            passthrough,
        }
    }

    /// Hydrate from a relationship document. A document without
    /// `crossFilteringBehavior` filters in both directions; any other value
    /// (`automatic`, …) is kept as written until the direction is set.
    pub fn load(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        let passthrough = Passthrough::capture(doc, path)?;
        let cross_filtering = passthrough
            .optional_str("crossFilteringBehavior", path)?
            .unwrap_or_else(|| BOTH_DIRECTIONS.to_string());
        Ok(Self {
            name: passthrough.required_str("name", path)?,
            from_table: passthrough.required_str("fromTable", path)?,
            from_column: passthrough.required_str("fromColumn", path)?,
            to_table: passthrough.required_str("toTable", path)?,
            to_column: passthrough.required_str("toColumn", path)?,
            cross_filtering,
            passthrough,
        })
    }

    pub fn dump(&self) -> Value {
        let mut merged = self.passthrough.merge();
        merged
            .set("name", self.name.as_str())
            .set("fromTable", self.from_table.as_str())
            .set("fromColumn", self.from_column.as_str())
            .set("toTable", self.to_table.as_str())
            .set("toColumn", self.to_column.as_str())
            .set("crossFilteringBehavior", self.cross_filtering.as_str());
        merged.into_value()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from_table(&self) -> &str {
        &self.from_table
    }

    pub fn from_column(&self) -> &str {
        &self.from_column
    }

    pub fn to_table(&self) -> &str {
        &self.to_table
    }

    pub fn to_column(&self) -> &str {
        &self.to_column
    }

    pub fn is_both_directions(&self) -> bool {
        self.cross_filtering == BOTH_DIRECTIONS
    }

    pub fn cross_filtering_behavior(&self) -> &str {
        &self.cross_filtering
    }

    pub fn set_both_directions(&mut self, both: bool) -> &mut Self {
        let behavior = if both { BOTH_DIRECTIONS } else { ONE_DIRECTION };
        self.cross_filtering = behavior.to_string();
        self
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }

    /// True when this relationship joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_table == a && self.to_table == b) || (self.from_table == b && self.to_table == a)
    }
}
