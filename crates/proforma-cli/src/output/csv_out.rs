use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Scalar fields (and those of a nested `summary`) are written as
/// field,value pairs, then the `projection` rows follow with their own
/// header. The writer is flexible since the two sections differ in width.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    if let Err(e) = write_csv(&mut wtr, value) {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    match value {
        Value::Object(map) => {
            let body = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            wtr.write_record(["field", "value"])?;
            write_pairs(wtr, body)?;
            if let Some(Value::Object(summary)) = body.get("summary") {
                write_pairs(wtr, summary)?;
            }
            if let Some(Value::Array(rows)) = body.get("projection") {
                write_rows(wtr, rows)?;
            }
        }
        Value::Array(arr) => write_rows(wtr, arr)?,
        _ => wtr.write_record([format_csv_value(value)])?,
    }
    wtr.flush()?;
    Ok(())
}

fn write_pairs<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    for (key, val) in map.iter().filter(|(_, v)| !v.is_object() && !v.is_array()) {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([format_csv_value(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
        write_csv(&mut wtr, value).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_summary_then_projection() {
        let out = render(&json!({
            "result": {
                "summary": {"noi": "20520", "grm": null},
                "projection": [{"year": 1, "noi": "20520"}]
            },
            "warnings": []
        }));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "field,value");
        assert!(lines.contains(&"grm,"));
        assert!(lines.contains(&"noi,20520"));
        assert!(lines.contains(&"noi,year"));
        assert!(lines.contains(&"20520,1"));
    }
}
