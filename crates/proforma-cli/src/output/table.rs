use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into one Field/Value table. Nested objects such
/// as `summary` get their own table, and arrays of objects such as
/// `projection` are printed one row per element.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_tables(result, map),
            None => println!("{}", field_value_table(map)),
        },
        Value::Array(arr) => println!("{}", rows_table(arr)),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            let scalars: Map<String, Value> = res_map
                .iter()
                .filter(|(_, v)| !is_nested(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if !scalars.is_empty() {
                println!("{}", field_value_table(&scalars));
            }

            for (key, val) in res_map.iter().filter(|(_, v)| is_nested(v)) {
                println!("\n{}:", key);
                match val {
                    Value::Object(inner) => println!("{}", field_value_table(inner)),
                    Value::Array(arr) if key == "matrix" => {
                        println!(
                            "{}",
                            grid_table(
                                arr,
                                res_map.get("variable_1_values"),
                                res_map.get("variable_2_values"),
                            )
                        )
                    }
                    Value::Array(arr) => println!("{}", rows_table(arr)),
                    _ => {}
                }
            }
        }
        other => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Objects and arrays of objects or arrays get their own table.
fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(arr) => arr
            .first()
            .map(|v| v.is_object() || v.is_array())
            .unwrap_or(false),
        _ => false,
    }
}

fn field_value_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    builder.build()
}

fn rows_table(arr: &[Value]) -> String {
    let Some(Value::Object(first)) = arr.first() else {
        return arr.iter().map(format_value).collect::<Vec<_>>().join("\n");
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(String::as_str));
    for item in arr {
        if let Value::Object(map) = item {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h).map(format_value).unwrap_or_default()),
            );
        }
    }
    builder.build().to_string()
}

/// Sensitivity grid: one row per first-axis value, columns from the second axis.
fn grid_table(rows: &[Value], row_values: Option<&Value>, column_values: Option<&Value>) -> String {
    let mut builder = Builder::default();
    if let Some(Value::Array(cols)) = column_values {
        let mut header = vec![String::new()];
        header.extend(cols.iter().map(format_value));
        builder.push_record(header);
    }
    for (i, row) in rows.iter().enumerate() {
        let label = match row_values {
            Some(Value::Array(vals)) => vals.get(i).map(format_value).unwrap_or_default(),
            _ => i.to_string(),
        };
        let mut record = vec![label];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        builder.push_record(record);
    }
    builder.build().to_string()
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_detection() {
        assert!(is_nested(&json!({"noi": "1"})));
        assert!(is_nested(&json!([{"year": 1}])));
        assert!(is_nested(&json!([["1", null]])));
        assert!(!is_nested(&json!(["1", "2"])));
        assert!(!is_nested(&json!([])));
        assert!(!is_nested(&json!("12.5")));
    }

    #[test]
    fn test_null_renders_as_dash() {
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&json!(["0.05", "0.06"])), "0.05, 0.06");
    }

    #[test]
    fn test_rows_table_has_header_and_rows() {
        let rendered = rows_table(&[
            json!({"year": 1, "noi": "20520"}),
            json!({"year": 2, "noi": "21135.6"}),
        ]);
        assert!(rendered.contains("year"));
        assert!(rendered.contains("21135.6"));
    }
}
