//! The hidden auto date table Power BI Desktop adds to new models.

use serde_json::{json, Value};

pub const DATE_TABLE_TEMPLATE_NAME: &str = "DateTableTemplate_5975b0d6-7e08-4fc8-b30a-36e3eba94689";

fn calculated(
    name: &str,
    data_type: &str,
    expression: &str,
    lineage_tag: &str,
    data_category: &str,
    template_id: &str,
) -> Value {
    json!({
        "type": "calculated",
        "name": name,
        "dataType": data_type,
        "isDataTypeInferred": true,
        "isHidden": true,
        "expression": expression,
        "lineageTag": lineage_tag,
        "dataCategory": data_category,
        "summarizeBy": "none",
        "attributeHierarchy": { "state": "ready" },
        "annotations": [
            { "name": "SummarizationSetBy", "value": "User" },
            { "name": "TemplateId", "value": template_id }
        ]
    })
}

fn with_entry(mut column: Value, key: &str, value: &str) -> Value {
    if let Value::Object(map) = &mut column {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    column
}

fn level(name: &str, ordinal: u32, lineage_tag: &str) -> Value {
    json!({ "name": name, "ordinal": ordinal, "column": name, "lineageTag": lineage_tag })
}

/// Table document of the date template: a calculated `Calendar` partition,
/// year/quarter/month/day columns and the `Date Hierarchy` over them.
pub fn date_table_template() -> Value {
    let numeric = |column: Value| with_entry(column, "formatString", "0");
    let columns = vec![
        json!({
            "type": "rowNumber",
            "name": super::column::ROW_NUMBER_COLUMN,
            "dataType": "int64",
            "isHidden": true,
            "isUnique": true,
            "isKey": true,
            "isNullable": false,
            "attributeHierarchy": { "state": "ready" }
        }),
        json!({
            "type": "calculatedTableColumn",
            "name": "Date",
            "dataType": "dateTime",
            "isNameInferred": true,
            "isDataTypeInferred": true,
            "isHidden": true,
            "sourceColumn": "[Date]",
            "formatString": "General Date",
            "lineageTag": "889a51f9-99f0-4aa3-9e63-278d77d00ee1",
            "dataCategory": "PaddedDateTableDates",
            "summarizeBy": "none",
            "attributeHierarchy": { "state": "ready" },
            "annotations": [{ "name": "SummarizationSetBy", "value": "User" }]
        }),
        numeric(calculated(
            "Year",
            "int64",
            "YEAR([Date])",
            "94dfb75d-4ba9-4b90-b79f-ebfe9cff087b",
            "Years",
            "Year",
        )),
        numeric(calculated(
            "MonthNo",
            "int64",
            "MONTH([Date])",
            "98761376-1dab-48da-b6ff-b5851336dc89",
            "MonthOfYear",
            "MonthNumber",
        )),
        with_entry(
            calculated(
                "Month",
                "string",
                "FORMAT([Date], \"MMMM\")",
                "5b5f8789-885b-493c-a768-416efed357a8",
                "Months",
                "Month",
            ),
            "sortByColumn",
            "MonthNo",
        ),
        numeric(calculated(
            "QuarterNo",
            "int64",
            "INT(([MonthNo] + 2) / 3)",
            "30244721-a2b3-4014-81b5-bf95d8f344da",
            "QuarterOfYear",
            "QuarterNumber",
        )),
        with_entry(
            calculated(
                "Quarter",
                "string",
                "\"Qtr \" & [QuarterNo]",
                "5de8ea71-ebc4-4fff-9b6d-3f3e00bf3d20",
                "Quarters",
                "Quarter",
            ),
            "sortByColumn",
            "QuarterNo",
        ),
        numeric(calculated(
            "Day",
            "int64",
            "DAY([Date])",
            "9070e261-708c-4cb3-96cd-826a7cda38e8",
            "DayOfMonth",
            "Day",
        )),
    ];

    json!({
        "name": DATE_TABLE_TEMPLATE_NAME,
        "isHidden": true,
        "isPrivate": true,
        "lineageTag": "e21631ac-035c-440b-85ef-3259718d8da4",
        "columns": columns,
        "partitions": [{
            "name": format!("{DATE_TABLE_TEMPLATE_NAME}-1d04c13d-f7a1-4dae-aa9a-1a3a3400b609"),
            "mode": "import",
            "state": "ready",
            "source": {
                "type": "calculated",
                "expression": "Calendar(Date(2015,1,1), Date(2015,1,1))"
            }
        }],
        "hierarchies": [{
            "name": "Date Hierarchy",
            "lineageTag": "bbe0ed27-e8ef-4e76-8a14-85f0fcb1d594",
            "state": "ready",
            "levels": [
                level("Year", 0, "08329d53-fa1d-4986-8a37-f3873dee4e07"),
                level("Quarter", 1, "e5d11cdc-593c-43de-996b-b6040b2a678a"),
                level("Month", 2, "9e3fbfab-5920-462c-a4af-236b9952ac84"),
                level("Day", 3, "1b872e0f-440e-4e03-a2b4-4e87841b1489")
            ],
            "annotations": [{ "name": "TemplateId", "value": "DateHierarchy" }]
        }],
        "annotations": [
            { "name": "__PBI_TemplateDateTable", "value": "True" },
            { "name": "DefaultItem", "value": "DateHierarchy" }
        ]
    })
}
