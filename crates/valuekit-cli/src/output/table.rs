use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{scalar, GridView, RECORD_KEYS};

/// Format output as tables: the result's scalar fields, then any grid or
/// record list it carries, then warnings and methodology.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_fields(map),
        },
        Value::Array(arr) => print_records(arr),
        _ => println!("{value}"),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            if let Some(grid) = GridView::from_result(result) {
                print_grid(&grid);
            } else {
                print_fields(res_map);
            }
            for key in RECORD_KEYS {
                if let Some(Value::Array(records)) = res_map.get(key) {
                    if !records.is_empty() {
                        println!("\n{key}:");
                        print_records(records);
                    }
                }
            }
        }
        other => println!("{}", scalar(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

/// Field/value table of the scalar and small nested fields. Record lists
/// are left to their own tables.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if RECORD_KEYS.contains(&key.as_str()) {
            continue;
        }
        builder.push_record([key.as_str(), &display(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_grid(grid: &GridView<'_>) {
    let mut builder = Builder::default();
    builder.push_record(grid.header());
    for line in grid.body() {
        builder.push_record(line);
    }
    println!("{}", Table::from(builder));
}

fn print_records(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(display).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", display(item));
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(display).collect::<Vec<_>>().join(", "),
        other => scalar(other),
    }
}
