//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use pbit::encode_utf16le;
use serde_json::{json, Value};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn build_zip(entries: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(name, options)
                .expect("start zip directory");
        } else {
            writer.start_file(name, options).expect("start zip entry");
            writer.write_all(&bytes).expect("write zip entry");
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

pub fn utf16_json(value: &Value) -> Vec<u8> {
    encode_utf16le(&value.to_string())
}

/// A schema document as Power BI Desktop writes it for a small model.
pub fn sample_schema() -> Value {
    json!({
        "name": "3f1c2a9e-0000-4000-8000-000000000001",
        "compatibilityLevel": 1550,
        "model": {
            "culture": "en-US",
            "dataAccessOptions": {
                "legacyRedirects": true,
                "returnErrorValuesAsNull": true
            },
            "defaultPowerBIDataSourceVersion": "powerBI_V3",
            "sourceQueryCulture": "en-US",
            "tables": [
                {
                    "name": "Orders",
                    "lineageTag": "orders-tag",
                    "columns": [
                        {
                            "name": "OrderId",
                            "dataType": "int64",
                            "sourceColumn": "OrderId",
                            "lineageTag": "orders-id",
                            "summarizeBy": "none",
                            "formatString": "0",
                            "annotations": [{ "name": "SummarizationSetBy", "value": "Automatic" }]
                        },
                        {
                            "name": "CustomerId",
                            "dataType": "int64",
                            "sourceColumn": "CustomerId",
                            "lineageTag": "orders-customer"
                        }
                    ],
                    "partitions": [{
                        "name": "Orders",
                        "mode": "import",
                        "queryGroup": "Sales",
                        "source": {
                            "type": "m",
                            "expression": [
                                "let",
                                "    Source = Csv.Document(File.Contents(\"C:/data/orders.csv\"))",
                                "in",
                                "    Source"
                            ]
                        }
                    }],
                    "measures": [{
                        "name": "Order Count",
                        "expression": "COUNTROWS(Orders)",
                        "formatString": "0",
                        "lineageTag": "orders-count"
                    }],
                    "annotations": [{ "name": "PBI_ResultType", "value": "Table" }]
                },
                {
                    "name": "Customers",
                    "lineageTag": "customers-tag",
                    "columns": [{
                        "name": "CustomerId",
                        "dataType": "int64",
                        "sourceColumn": "CustomerId",
                        "lineageTag": "customers-id"
                    }],
                    "partitions": [{
                        "name": "Customers",
                        "mode": "import",
                        "source": { "type": "m", "expression": "let Source = #table({}, {}) in Source" }
                    }]
                }
            ],
            "relationships": [{
                "name": "rel-1",
                "fromTable": "Orders",
                "fromColumn": "CustomerId",
                "toTable": "Customers",
                "toColumn": "CustomerId",
                "crossFilteringBehavior": "oneDirection",
                "state": "ready"
            }],
            "queryGroups": [{
                "folder": "Sales",
                "annotations": [{ "name": "PBI_QueryGroupOrder", "value": "0" }]
            }],
            "cultures": [{ "name": "en-US" }],
            "annotations": [
                { "name": "__PBI_TimeIntelligenceEnabled", "value": "0" },
                { "name": "PBIDesktopVersion", "value": "2.120.963.0" }
            ]
        }
    })
}

/// A report layout as stored: configuration sub-documents are JSON strings.
pub fn sample_layout() -> Value {
    json!({
        "id": 0,
        "config": "{\"version\":\"v5\",\"activeSectionIndex\":0}",
        "layoutOptimization": 0,
        "sections": [{
            "name": "ReportSection",
            "displayName": "Overview",
            "filters": "[]",
            "config": "{}",
            "visualContainers": [{
                "x": 12.5,
                "y": 40,
                "config": "{\"name\":\"card1\",\"singleVisual\":{\"visualType\":\"card\"}}",
                "filters": "[]"
            }]
        }]
    })
}

pub fn sample_bundle() -> Vec<u8> {
    build_zip(vec![
        ("Version", encode_utf16le("1.28")),
        ("DataModelSchema", utf16_json(&sample_schema())),
        ("DiagramLayout", utf16_json(&json!({ "version": "1.1.0" }))),
        ("Report/Layout", utf16_json(&sample_layout())),
        ("SecurityBindings", vec![1, 2, 3, 4]),
    ])
}
