use serde_json::Value;

/// Headline figures, most specific first. Sensitivity output answers with
/// its base case; analysis output with the exit IRR.
const PRIORITY_KEYS: [&str; 8] = [
    "base_case_value",
    "monthly_payment",
    "irr",
    "equity_multiple",
    "cash_on_cash",
    "noi",
    "real_purchase_price",
    "address",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let mut result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    if let Some(summary) = result_obj.get("summary") {
        result_obj = summary;
    }

    let Value::Object(map) = result_obj else {
        return format_minimal(result_obj);
    };

    if let Some(val) = PRIORITY_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
    {
        return format_minimal(val);
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analysis_answers_with_irr() {
        let out = json!({"result": {"summary": {"noi": "100", "irr": "0.0812"}, "projection": []}});
        assert_eq!(minimal_answer(&out), "0.0812");
    }

    #[test]
    fn test_null_irr_falls_through() {
        let out = json!({"result": {"summary": {"noi": "100", "irr": null}}});
        assert_eq!(minimal_answer(&out), "100");
    }

    #[test]
    fn test_unknown_object_prints_first_field() {
        let out = json!({"result": {"alpha": 1}});
        assert_eq!(minimal_answer(&out), "alpha: 1");
    }
}
