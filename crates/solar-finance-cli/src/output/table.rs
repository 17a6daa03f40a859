use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::cell;

/// Format output as tables using the tabled crate.
///
/// Scalars of the result go in a Field/Value table; arrays of rows (the cash
/// flow schedule) and maps of rows (sensitivities) get a table each.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                print_result_tables(result);
                print_envelope_notes(map);
            } else {
                print_result_tables(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&String, &Value)> = Vec::new();

    for (key, val) in result {
        if is_row_collection(val) {
            nested.push((key, val));
        } else {
            builder.push_record([key.clone(), cell(val)]);
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        println!("\n{key}:");
        match val {
            Value::Array(rows) => print_array_table(rows),
            Value::Object(rows) => print_keyed_table(rows),
            _ => {}
        }
    }
}

fn is_row_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.first().is_some_and(Value::is_object),
        Value::Object(map) => !map.is_empty() && map.values().all(Value::is_object) && !map.contains_key("status"),
        _ => false,
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", cell(w));
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", cell(item));
        }
    }
}

/// Rows keyed by label, e.g. sensitivities.
fn print_keyed_table(rows: &Map<String, Value>) {
    let Some(Value::Object(first)) = rows.values().next() else {
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(std::iter::once("case".to_string()).chain(headers.iter().cloned()));

    for (label, item) in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = std::iter::once(label.clone())
                .chain(headers.iter().map(|h| map.get(h.as_str()).map(cell).unwrap_or_default()))
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
