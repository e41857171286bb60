use std::collections::HashSet;
use std::path::Path;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::SchemaConfig;
use crate::data_type::{DataType, SummarizeBy};
use crate::passthrough::Passthrough;

use super::column::{dax_column_ref, Column};
use super::measure::Measure;
use super::partition::Partition;
use super::{EntityKind, SchemaError};

/// Options for [`Table::new_bin`].
#[derive(Debug, Clone, PartialEq)]
pub struct BinOptions {
    /// Table holding the binned column; defaults to the owning table.
    pub target_table: Option<String>,
    /// Defaults to `<column>_bin`.
    pub name: Option<String>,
    pub data_type: DataType,
}

impl Default for BinOptions {
    fn default() -> Self {
        Self {
            target_table: None,
            name: None,
            data_type: DataType::Double,
        }
    }
}

/// Options for [`Table::new_normalized_column`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Table holding the denominator; defaults to the owning table.
    pub denominator_table: Option<String>,
    /// Defaults to `<numerator>_per_<denominator>`.
    pub name: Option<String>,
    pub data_type: DataType,
    pub summarize_by: SummarizeBy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            denominator_table: None,
            name: None,
            data_type: DataType::Double,
            summarize_by: SummarizeBy::Sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    lineage_tag: Option<String>,
    is_hidden: Option<bool>,
    columns: Vec<Column>,
    partitions: Vec<Partition>,
    measures: Vec<Measure>,
    passthrough: Passthrough,
}

impl Table {
    /// A fresh imported table holding only the hidden row-number column.
    pub(crate) fn new(name: &str) -> Self {
        let lineage_tag = Uuid::new_v4().to_string();
        let doc = json!({
            "name": name,
            "lineageTag": lineage_tag,
            "columns": [],
            "partitions": [],
            "annotations": [
                { "name": "PBI_ResultType", "value": "Table" }
            ]
        });
        Self {
            name: name.to_string(),
            lineage_tag: Some(lineage_tag),
            is_hidden: None,
            columns: vec![Column::row_number()],
            partitions: Vec::new(),
            measures: Vec::new(),
            passthrough: Passthrough::from_template(doc),
        }
    }

    pub fn load(doc: &Value, path: &str) -> Result<Self, SchemaError> {
        let passthrough = Passthrough::capture(doc, path)?;
        let name = passthrough.required_str("name", path)?;

        let columns = passthrough
            .optional_array("columns", path)?
            .iter()
            .enumerate()
            .map(|(i, item)| Column::load(item, &format!("{path}.columns[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let partitions = passthrough
            .optional_array("partitions", path)?
            .iter()
            .enumerate()
            .map(|(i, item)| Partition::load(item, &format!("{path}.partitions[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let measures = passthrough
            .optional_array("measures", path)?
            .iter()
            .enumerate()
            .map(|(i, item)| Measure::load(item, &format!("{path}.measures[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                log::warn!("table '{name}' repeats column '{}'", column.name());
            }
        }

        log::debug!(
            "loaded table '{name}': {} columns, {} partitions, {} measures",
            columns.len(),
            partitions.len(),
            measures.len()
        );

        Ok(Self {
            lineage_tag: passthrough.optional_str("lineageTag", path)?,
            is_hidden: passthrough.optional_bool("isHidden", path)?,
            name,
            columns,
            partitions,
            measures,
            passthrough: passthrough
                .with_existing("columns", json!([]))
                .with_existing("partitions", json!([]))
                .with_existing("measures", json!([])),
        })
    }

    pub fn dump(&self, config: &SchemaConfig) -> Value {
        let columns: Vec<Value> = self.columns.iter().map(Column::dump).collect();
        let partitions: Vec<Value> = self
            .partitions
            .iter()
            .map(|partition| partition.dump(config.step_numbering))
            .collect();

        let mut merged = self.passthrough.merge();
        merged
            .set("name", self.name.as_str())
            .set_opt("lineageTag", self.lineage_tag.as_deref())
            .set_opt("isHidden", self.is_hidden)
            .set("columns", columns)
            .set("partitions", partitions);
        if !self.measures.is_empty() || merged.contains_key("measures") {
            let measures: Vec<Value> = self.measures.iter().map(Measure::dump).collect();
            merged.set("measures", measures);
        }
        merged.into_value()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lineage_tag(&self) -> Option<&str> {
        self.lineage_tag.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden.unwrap_or(false)
    }

    pub fn set_hidden(&mut self, hidden: bool) -> &mut Self {
        self.is_hidden = Some(hidden);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    pub fn get_column_by_name(&self, name: &str) -> Result<&Column, SchemaError> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| SchemaError::missing_in(EntityKind::Column, name, &self.name))
    }

    pub fn get_column_by_name_mut(&mut self, name: &str) -> Result<&mut Column, SchemaError> {
        let table = self.name.clone();
        self.columns
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| SchemaError::missing_in(EntityKind::Column, name, &table))
    }

    /// Add an imported column. `source_column` defaults to `name`.
    pub fn new_column(
        &mut self,
        name: &str,
        data_type: DataType,
        source_column: Option<&str>,
    ) -> Result<&mut Column, SchemaError> {
        let source_column = source_column.or(Some(name).filter(|n| !n.is_empty()));
        self.insert_column(Column::new(name, data_type, source_column))
    }

    /// Add a calculated column evaluating `expression` per row.
    pub fn new_dax_column(
        &mut self,
        name: &str,
        expression: &str,
        data_type: DataType,
        summarize_by: SummarizeBy,
    ) -> Result<&mut Column, SchemaError> {
        self.insert_column(Column::calculated(
            name,
            Value::String(expression.to_string()),
            data_type,
            summarize_by,
        ))
    }

    /// Add a grouping column bucketing `target_column` by `increment`.
    pub fn new_bin(
        &mut self,
        target_column: &str,
        increment: f64,
        options: BinOptions,
    ) -> Result<&mut Column, SchemaError> {
        let target_table = options.target_table.unwrap_or_else(|| self.name.clone());
        let name = options
            .name
            .unwrap_or_else(|| format!("{target_column}_bin"));
        self.insert_column(Column::bin(
            &name,
            &target_table,
            target_column,
            increment,
            options.data_type,
        ))
    }

    /// Add a calculated column dividing `numerator` of this table by
    /// `denominator`, looked up through `RELATED` when it lives in another
    /// table.
    pub fn new_normalized_column(
        &mut self,
        numerator: &str,
        denominator: &str,
        options: NormalizeOptions,
    ) -> Result<&mut Column, SchemaError> {
        let name = options
            .name
            .unwrap_or_else(|| format!("{numerator}_per_{denominator}"));
        let numerator_ref = dax_column_ref(&self.name, numerator);
        let denominator_ref = match options.denominator_table.as_deref() {
            Some(table) if table != self.name => {
                format!("RELATED({})", dax_column_ref(table, denominator))
            }
            _ => dax_column_ref(&self.name, denominator),
        };
        let expression = format!("DIVIDE({numerator_ref}, {denominator_ref})");
        self.insert_column(Column::calculated(
            &name,
            Value::String(expression),
            options.data_type,
            options.summarize_by,
        ))
    }

    fn insert_column(&mut self, column: Column) -> Result<&mut Column, SchemaError> {
        if !column.name().is_empty() && self.has_column(column.name()) {
            return Err(SchemaError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name().to_string(),
            });
        }
        self.columns.push(column);
        let last = self.columns.len() - 1;
        Ok(&mut self.columns[last])
    }

    pub fn new_measure(&mut self, name: &str) -> Result<&mut Measure, SchemaError> {
        if self.measures.iter().any(|m| m.name() == name) {
            return Err(SchemaError::DuplicateMeasure {
                table: self.name.clone(),
                measure: name.to_string(),
            });
        }
        self.measures.push(Measure::new(name));
        let last = self.measures.len() - 1;
        Ok(&mut self.measures[last])
    }

    pub fn get_measure_by_name(&self, name: &str) -> Result<&Measure, SchemaError> {
        self.measures
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| SchemaError::missing_in(EntityKind::Measure, name, &self.name))
    }

    pub fn get_measure_by_name_mut(&mut self, name: &str) -> Result<&mut Measure, SchemaError> {
        let table = self.name.clone();
        self.measures
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| SchemaError::missing_in(EntityKind::Measure, name, &table))
    }

    /// Append a partition. `name` defaults to the table name.
    pub fn new_partition(&mut self, name: Option<&str>, query_group: Option<&str>) -> &mut Partition {
        let name = name.unwrap_or(&self.name).to_string();
        self.partitions
            .push(Partition::new(Some(name.as_str()), query_group));
        let last = self.partitions.len() - 1;
        &mut self.partitions[last]
    }

    /// Load this table from a JSON file: a reader partition plus one source
    /// column per entry of `columns`. Nothing is added if any column name is
    /// taken or repeated, or if `path` cannot be resolved.
    pub fn bind_to_json(
        &mut self,
        path: &Path,
        columns: &[(String, DataType)],
        query_group: Option<&str>,
    ) -> Result<&mut Partition, SchemaError> {
        let mut pending = HashSet::new();
        for (name, _) in columns {
            if self.has_column(name) || !pending.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name.clone(),
                    column: name.clone(),
                });
            }
        }

        let mut partition = Partition::new(Some(self.name.as_str()), query_group);
        partition.set_to_json_reader(path, columns)?;

        for (name, data_type) in columns {
            self.columns
                .push(Column::new(name, data_type.clone(), Some(name.as_str())));
        }
        self.partitions.push(partition);
        let last = self.partitions.len() - 1;
        Ok(&mut self.partitions[last])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ROW_NUMBER_COLUMN;

    fn orders() -> Table {
        Table::new("Orders")
    }

    #[test]
    fn fresh_table_has_hidden_row_number_column() {
        let table = orders();
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.columns()[0].name(), ROW_NUMBER_COLUMN);
        let doc = table.dump(&SchemaConfig::default());
        assert_eq!(doc["annotations"][0]["name"], "PBI_ResultType");
        assert_eq!(doc["columns"][0]["type"], "rowNumber");
        assert!(doc.get("measures").is_none());
    }

    #[test]
    fn new_column_defaults_source_to_name() {
        let mut table = orders();
        let column = table
            .new_column("qty", DataType::Int64, None)
            .expect("new column");
        assert_eq!(column.source_column(), Some("qty"));
    }

    #[test]
    fn duplicate_column_is_rejected_and_list_unchanged() {
        let mut table = orders();
        table.new_column("qty", DataType::Int64, None).expect("first");
        let before = table.columns().to_vec();
        let err = table
            .new_dax_column("qty", "1", DataType::Int64, SummarizeBy::Sum)
            .expect_err("duplicate");
        assert!(matches!(
            err,
            SchemaError::DuplicateColumn { ref table, ref column } if table == "Orders" && column == "qty"
        ));
        assert_eq!(table.columns(), before.as_slice());
    }

    #[test]
    fn empty_column_names_skip_the_duplicate_check() {
        let mut table = orders();
        table.new_column("", DataType::String, None).expect("first blank");
        table.new_column("", DataType::String, None).expect("second blank");
        let blanks = table.columns().iter().filter(|c| c.name().is_empty()).count();
        assert_eq!(blanks, 2);
        assert_eq!(table.columns()[1].source_column(), None);

        table.new_column("qty", DataType::Int64, None).expect("qty");
        let before = table.columns().to_vec();
        let err = table
            .new_column("qty", DataType::Double, None)
            .expect_err("repeated name");
        assert!(matches!(err, SchemaError::DuplicateColumn { ref column, .. } if column == "qty"));
        assert_eq!(table.columns(), before.as_slice());
    }

    #[test]
    fn missing_column_names_table() {
        let table = orders();
        let err = table.get_column_by_name("nope").expect_err("missing");
        assert_eq!(
            err.to_string(),
            "[PBIT_SCHEMA_005] column 'nope' does not exist in table 'Orders'"
        );
    }

    #[test]
    fn bin_defaults_name_and_table() {
        let mut table = orders();
        let column = table
            .new_bin("price", 10.0, BinOptions::default())
            .expect("bin");
        assert_eq!(column.name(), "price_bin");
        let expression = column.expression().expect("expression");
        assert!(expression.contains("'Orders'[price]"));
    }

    #[test]
    fn normalized_column_uses_related_across_tables() {
        let mut table = orders();
        let local = table
            .new_normalized_column("qty", "total", NormalizeOptions::default())
            .expect("same table");
        assert_eq!(local.name(), "qty_per_total");
        assert_eq!(
            local.expression().as_deref(),
            Some("DIVIDE('Orders'[qty], 'Orders'[total])")
        );

        let related = table
            .new_normalized_column(
                "qty",
                "population",
                NormalizeOptions {
                    denominator_table: Some("Regions".to_string()),
                    name: Some("qty_per_capita".to_string()),
                    ..NormalizeOptions::default()
                },
            )
            .expect("other table");
        assert_eq!(
            related.expression().as_deref(),
            Some("DIVIDE('Orders'[qty], RELATED('Regions'[population]))")
        );
        assert_eq!(related.summarize_by(), Some(SummarizeBy::Sum));
    }

    #[test]
    fn duplicate_measure_is_rejected() {
        let mut table = orders();
        table.new_measure("Total").expect("first");
        let err = table.new_measure("Total").expect_err("duplicate");
        assert!(matches!(err, SchemaError::DuplicateMeasure { .. }));
        assert_eq!(table.measures().len(), 1);
        assert!(table.get_measure_by_name("Total").is_ok());
    }

    #[test]
    fn partition_name_defaults_to_table() {
        let mut table = orders();
        let partition = table.new_partition(None, Some("Raw"));
        assert_eq!(partition.name(), Some("Orders"));
        assert_eq!(partition.query_group(), Some("Raw"));
    }

    #[test]
    fn bind_to_json_is_all_or_nothing() {
        let mut table = orders();
        table.new_column("id", DataType::Int64, None).expect("id");
        let columns = vec![
            ("name".to_string(), DataType::String),
            ("id".to_string(), DataType::Int64),
        ];
        let err = table
            .bind_to_json(Path::new("rows.json"), &columns, None)
            .expect_err("id taken");
        assert!(matches!(err, SchemaError::DuplicateColumn { ref column, .. } if column == "id"));
        assert_eq!(table.columns().len(), 2);
        assert!(table.partitions().is_empty());

        let repeated = vec![
            ("a".to_string(), DataType::String),
            ("a".to_string(), DataType::String),
        ];
        assert!(table
            .bind_to_json(Path::new("rows.json"), &repeated, None)
            .is_err());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn bind_to_json_adds_partition_and_columns() {
        let mut table = orders();
        let columns = vec![
            ("sku".to_string(), DataType::String),
            ("qty".to_string(), DataType::Int64),
        ];
        let partition = table
            .bind_to_json(Path::new("orders.json"), &columns, Some("Feeds"))
            .expect("bind");
        assert_eq!(partition.steps().len(), 5);
        assert_eq!(partition.query_group(), Some("Feeds"));
        assert!(table.has_column("sku"));
        assert_eq!(
            table.get_column_by_name("qty").expect("qty").source_column(),
            Some("qty")
        );
    }

    #[test]
    fn load_moves_children_out_of_passthrough() {
        let doc = json!({
            "name": "T",
            "lineageTag": "t-1",
            "isPrivate": true,
            "columns": [{ "name": "a", "dataType": "string", "sourceColumn": "a" }],
            "partitions": [{ "name": "T", "mode": "import", "source": { "type": "m", "expression": "let in" } }],
            "measures": [{ "name": "m", "expression": "1" }],
            "hierarchies": [{ "name": "h" }]
        });
        let table = Table::load(&doc, "model.tables[0]").expect("load");
        assert_eq!(table.passthrough().get("columns"), Some(&json!([])));
        assert_eq!(table.passthrough().get("measures"), Some(&json!([])));

        let mut out = table.dump(&SchemaConfig::default());
        crate::document::prune_nulls(&mut out);
        assert_eq!(out, doc);
    }
}
