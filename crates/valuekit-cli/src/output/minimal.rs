use serde_json::Value;

use super::scalar;

/// Result fields that answer each command, most specific first.
const PRIORITY_KEYS: [&str; 6] = [
    "implied_price_per_share",
    "intrinsic_value",
    "cost_of_equity",
    "best_peer",
    "value",
    "companies_valued",
];

/// Print just the headline value, falling back to the first result field.
pub fn print_minimal(value: &Value) {
    println!("{}", headline(value));
}

fn headline(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return scalar(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{key}: {}", scalar(val));
        }
    }

    scalar(result)
}
