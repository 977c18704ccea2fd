use serde_json::Value;

/// Key answer fields, in order of priority.
const PRIORITY_KEYS: [&str; 5] = ["npv", "expected_value", "level_npv", "valuation", "summary"];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields (one level into nested objects such as
/// `valuation` or `base_case`), then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(answer) = find_answer(result_obj) {
        println!("{}", format_minimal(answer));
        return;
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn find_answer(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    for key in PRIORITY_KEYS {
        match map.get(key) {
            Some(Value::Object(_)) => {
                if let Some(inner) = find_answer(&map[key]) {
                    return Some(inner);
                }
            }
            Some(val) if !val.is_null() => return Some(val),
            _ => {}
        }
    }
    map.get("base_case").and_then(find_answer)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // Metric values render as the number or the reason
        Value::Object(map) => match (map.get("value"), map.get("reason")) {
            (Some(v), _) => format_minimal(v),
            (None, Some(r)) => format!("undefined ({})", format_minimal(r)),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finds_nested_npv() {
        let v = json!({
            "projection": {},
            "valuation": {"npv": 12.5, "irr": {"status": "defined", "value": 0.2}}
        });
        assert_eq!(find_answer(&v), Some(&json!(12.5)));
    }

    #[test]
    fn test_finds_expected_value() {
        let v = json!({"results": [], "expected_value": 102.5, "std_dev": 3.0});
        assert_eq!(find_answer(&v), Some(&json!(102.5)));
    }

    #[test]
    fn test_monte_carlo_prefers_base_case() {
        let v = json!({"base_case": {"npv": 7.0}, "iterations": 10});
        assert_eq!(find_answer(&v), Some(&json!(7.0)));
    }

    #[test]
    fn test_metric_formatting() {
        assert_eq!(format_minimal(&json!({"status": "defined", "value": 0.25})), "0.25");
        assert_eq!(
            format_minimal(&json!({"status": "undefined", "reason": "not_recovered"})),
            "undefined (not_recovered)"
        );
    }
}
