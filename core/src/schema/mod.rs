//! The tabular model graph stored in a template's `DataModelSchema`.
//!
//! [`SchemaGraph`] owns tables and relationships and the ordered list of query
//! groups. Every entity keeps the document it was loaded from as a
//! [`Passthrough`] snapshot; dumping writes typed fields over a clone of it so
//! that properties this crate does not model survive a load/dump round trip.
//!
//! Mutation goes through the owning aggregate, which checks its invariants
//! before inserting anything:
//! - table names are unique within the graph,
//! - column and measure names are unique within a table,
//! - at most one relationship joins any unordered pair of tables.

mod column;
mod date_template;
mod error;
mod measure;
mod partition;
mod relationship;
mod table;


use std::collections::HashSet;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::SchemaConfig;
use crate::document::prune_nulls;
use crate::passthrough::{required_str, value_kind, Passthrough};

pub use column::{dax_column_ref, Column, ROW_NUMBER_COLUMN};
pub use date_template::{date_table_template, DATE_TABLE_TEMPLATE_NAME};
pub use error::{EntityKind, SchemaError};
pub use measure::Measure;
pub use partition::Partition;
pub use relationship::Relationship;
pub use table::{BinOptions, NormalizeOptions, Table};

const QUERY_GROUP_ORDER: &str = "PBI_QueryGroupOrder";

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaGraph {
    id: String,
    config: SchemaConfig,
    tables: Vec<Table>,
    relationships: Vec<Relationship>,
    query_groups: Vec<String>,
    /// Document root with `model` emptied; the model object lives in `model`.
    passthrough: Passthrough,
    model: Passthrough,
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::with_config(SchemaConfig::default())
    }

    /// An empty model carrying the culture, version and desktop annotations
    /// from `config`.
    pub fn with_config(config: SchemaConfig) -> Self {
        let id = Uuid::new_v4().to_string();
        let doc = default_document(&id, &config);
        let (passthrough, model) = split_model(&doc);
        Self {
            id,
            config,
            tables: Vec::new(),
            relationships: Vec::new(),
            query_groups: Vec::new(),
            passthrough,
            model,
        }
    }

    pub fn from_document(doc: &Value, config: SchemaConfig) -> Result<Self, SchemaError> {
        let mut graph = Self::with_config(config);
        graph.load(doc)?;
        Ok(graph)
    }

    /// Replace the whole graph with the content of `doc`. Relationships are
    /// hydrated first, then tables, then query groups. On error the graph is
    /// left as it was.
    pub fn load(&mut self, doc: &Value) -> Result<(), SchemaError> {
        let root = Passthrough::capture(doc, "$")?;
        let model = match root.get("model") {
            Some(model @ Value::Object(_)) => Passthrough::capture(model, "model")?,
            None | Some(Value::Null) => {
                return Err(SchemaError::malformed("model", "required field is missing"))
            }
            Some(other) => {
                return Err(SchemaError::malformed(
                    "model",
                    format!("expected an object, found {}", value_kind(other)),
                ))
            }
        };

        let relationships = model
            .optional_array("relationships", "model")?
            .iter()
            .enumerate()
            .map(|(i, item)| Relationship::load(item, &format!("model.relationships[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let tables = model
            .optional_array("tables", "model")?
            .iter()
            .enumerate()
            .map(|(i, item)| Table::load(item, &format!("model.tables[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let mut query_groups = Vec::new();
        for (i, item) in model.optional_array("queryGroups", "model")?.iter().enumerate() {
            let path = format!("model.queryGroups[{i}]");
            match item {
                Value::Object(group) => query_groups.push(required_str(group, "folder", &path)?),
                other => {
                    return Err(SchemaError::malformed(
                        path,
                        format!("expected an object, found {}", value_kind(other)),
                    ))
                }
            }
        }

        warn_on_duplicates(&tables, &relationships);

        let id = match root.optional_str("name", "$")? {
            Some(name) => name,
            None => Uuid::new_v4().to_string(),
        };
        log::debug!(
            "loaded schema '{id}': {} tables, {} relationships, {} query groups",
            tables.len(),
            relationships.len(),
            query_groups.len()
        );

        self.id = id;
        self.tables = tables;
        self.relationships = relationships;
        self.query_groups = query_groups;
        self.passthrough = root.with_existing("model", Value::Object(Map::new()));
        self.model = model
            .with_existing("relationships", json!([]))
            .with_existing("tables", json!([]))
            .with_existing("queryGroups", Value::Null);
        Ok(())
    }

    /// Merge typed state back into the document and prune null-valued keys.
    pub fn dump(&self) -> Value {
        let mut model = self.model.merge();
        model
            .set_path(&["dataAccessOptions", "legacyRedirects"], true)
            .set_path(&["dataAccessOptions", "returnErrorValuesAsNull"], true)
            .set(
                "defaultPowerBIDataSourceVersion",
                self.config.default_data_source_version.as_str(),
            )
            .set("sourceQueryCulture", self.config.source_query_culture.as_str());

        if !self.query_groups.is_empty() {
            let groups: Vec<Value> = self
                .query_groups
                .iter()
                .enumerate()
                .map(|(i, folder)| {
                    json!({
                        "folder": folder,
                        "annotations": [{ "name": QUERY_GROUP_ORDER, "value": i.to_string() }]
                    })
                })
                .collect();
            model.set("queryGroups", groups);
        }

        if !self.tables.is_empty() || model.contains_key("tables") {
            let tables: Vec<Value> = self.tables.iter().map(|t| t.dump(&self.config)).collect();
            model.set("tables", tables);
        }
        if !self.relationships.is_empty() || model.contains_key("relationships") {
            let relationships: Vec<Value> =
                self.relationships.iter().map(Relationship::dump).collect();
            model.set("relationships", relationships);
        }

        let mut root = self.passthrough.merge();
        root.set("name", self.id.as_str()).set("model", model.into_value());
        let mut doc = root.into_value();
        prune_nulls(&mut doc);
        log::debug!(
            "dumped schema '{}': {} tables, {} relationships",
            self.id,
            self.tables.len(),
            self.relationships.len()
        );
        doc
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn query_groups(&self) -> &[String] {
        &self.query_groups
    }

    pub fn clear_tables(&mut self) {
        self.tables.clear();
        self.model = self.model.with_existing("tables", json!([]));
    }

    pub fn clear_relationships(&mut self) {
        self.relationships.clear();
        self.model = self.model.with_existing("relationships", json!([]));
    }

    pub fn clear_query_groups(&mut self) {
        self.query_groups.clear();
        self.model = self.model.with_existing("queryGroups", json!([]));
    }

    pub fn clear(&mut self) {
        self.clear_tables();
        self.clear_relationships();
        self.clear_query_groups();
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name() == name)
    }

    pub fn get_table_by_name(&self, name: &str) -> Result<&Table, SchemaError> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| SchemaError::missing(EntityKind::Table, name))
    }

    pub fn get_table_by_name_mut(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        self.tables
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| SchemaError::missing(EntityKind::Table, name))
    }

    pub fn new_table(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        self.insert_table(Table::new(name))
    }

    /// Add the hidden auto date table, unless a table of that name exists.
    pub fn insert_date_table_template(&mut self) -> Result<&mut Table, SchemaError> {
        let table = Table::load(&date_table_template(), DATE_TABLE_TEMPLATE_NAME)?;
        self.insert_table(table)
    }

    fn insert_table(&mut self, table: Table) -> Result<&mut Table, SchemaError> {
        if self.has_table(table.name()) {
            return Err(SchemaError::DuplicateTable {
                table: table.name().to_string(),
            });
        }
        self.tables.push(table);
        let last = self.tables.len() - 1;
        Ok(&mut self.tables[last])
    }

    /// Append a query group folder; a name already listed is kept once.
    pub fn insert_query_group(&mut self, name: &str) {
        if !self.query_groups.iter().any(|g| g == name) {
            self.query_groups.push(name.to_string());
        }
    }

    /// Relate `from_table[from_column]` to `to_table[to_column]`, filtering
    /// in both directions. `to_column` defaults to `from_column`.
    pub fn new_relationship(
        &mut self,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: Option<&str>,
    ) -> Result<&mut Relationship, SchemaError> {
        if self.relationships.iter().any(|r| r.connects(from_table, to_table)) {
            return Err(SchemaError::DuplicateRelationship {
                from_table: from_table.to_string(),
                to_table: to_table.to_string(),
            });
        }
        let to_column = to_column.unwrap_or(from_column);
        self.relationships
            .push(Relationship::new(from_table, from_column, to_table, to_column));
        let last = self.relationships.len() - 1;
        Ok(&mut self.relationships[last])
    }

    /// The relationship joining `a` and `b`, in either direction.
    pub fn get_relationship(&self, a: &str, b: &str) -> Result<&Relationship, SchemaError> {
        self.relationships
            .iter()
            .find(|r| r.connects(a, b))
            .ok_or_else(|| SchemaError::missing(EntityKind::Relationship, &format!("{a} <-> {b}")))
    }

    pub fn get_relationship_mut(
        &mut self,
        a: &str,
        b: &str,
    ) -> Result<&mut Relationship, SchemaError> {
        self.relationships
            .iter_mut()
            .find(|r| r.connects(a, b))
            .ok_or_else(|| SchemaError::missing(EntityKind::Relationship, &format!("{a} <-> {b}")))
    }

    /// Check that every relationship endpoint names an existing table and
    /// column.
    pub fn validate_references(&self) -> Result<(), SchemaError> {
        for relationship in &self.relationships {
            let endpoints = [
                (relationship.from_table(), relationship.from_column()),
                (relationship.to_table(), relationship.to_column()),
            ];
            for (table, column) in endpoints {
                self.get_table_by_name(table)?.get_column_by_name(column)?;
            }
        }
        Ok(())
    }
}

fn default_document(id: &str, config: &SchemaConfig) -> Value {
    json!({
        "name": id,
        "compatibilityLevel": config.compatibility_level,
        "model": {
            "culture": config.culture,
            "dataAccessOptions": {
                "legacyRedirects": true,
                "returnErrorValuesAsNull": true
            },
            "defaultPowerBIDataSourceVersion": config.default_data_source_version,
            "sourceQueryCulture": config.source_query_culture,
            "tables": [],
            "relationships": [],
            "cultures": [{
                "name": config.culture,
                "linguisticMetadata": {
                    "content": {
                        "Version": "1.0.0",
                        "Language": config.culture,
                        "DynamicImprovement": "HighConfidence"
                    },
                    "contentType": "json"
                }
            }],
            "queryGroups": null,
            "annotations": [
                { "name": "PBI_QueryOrder", "value": "[]" },
                { "name": "__PBI_TimeIntelligenceEnabled", "value": "1" },
                { "name": "PBIDesktopVersion", "value": config.desktop_version }
            ]
        }
    })
}

fn split_model(doc: &Value) -> (Passthrough, Passthrough) {
    let root = Passthrough::from_template(doc.clone());
    let model = Passthrough::from_template(root.get("model").cloned().unwrap_or(Value::Null));
    (
        root.with_existing("model", Value::Object(Map::new())),
        model,
    )
}

fn warn_on_duplicates(tables: &[Table], relationships: &[Relationship]) {
    let mut names = HashSet::new();
    for table in tables {
        if !names.insert(table.name()) {
            log::warn!("schema repeats table '{}'", table.name());
        }
    }
    for (i, relationship) in relationships.iter().enumerate() {
        let earlier = &relationships[..i];
        if earlier
            .iter()
            .any(|r| r.connects(relationship.from_table(), relationship.to_table()))
        {
            log::warn!(
                "schema holds more than one relationship between '{}' and '{}'",
                relationship.from_table(),
                relationship.to_table()
            );
        }
    }
}
