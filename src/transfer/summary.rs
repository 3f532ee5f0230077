//! Folding of per-row bulk import results into one summary.

use serde_json::{Map, Value};

fn add_numbers(current: Option<&Value>, addend: &Value) -> Value {
    let current = current.filter(|v| v.is_number());
    match (current.and_then(Value::as_i64), addend.as_i64()) {
        (Some(a), Some(b)) => Value::from(a.saturating_add(b)),
        (None, Some(b)) if current.is_none() => Value::from(b),
        _ => {
            let a = current.and_then(Value::as_f64).unwrap_or(0.0);
            let b = addend.as_f64().unwrap_or(0.0);
            serde_json::Number::from_f64(a + b).map_or(Value::Null, Value::Number)
        }
    }
}

/// Fold `addend` into `total` key by key.
///
/// Objects merge recursively, strings are appended followed by a newline, and
/// everything else is added numerically with missing values counting as zero.
pub fn sum_object(total: &mut Map<String, Value>, addend: &Map<String, Value>) {
    for (key, value) in addend {
        match value {
            Value::Object(inner) => {
                let slot = total
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(slot) = slot {
                    sum_object(slot, inner);
                }
            }
            Value::String(text) => {
                let mut joined = total
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                joined.push_str(text);
                joined.push('\n');
                total.insert(key.clone(), Value::String(joined));
            }
            Value::Bool(flag) => {
                let summed = add_numbers(total.get(key), &Value::from(u8::from(*flag)));
                total.insert(key.clone(), summed);
            }
            Value::Null => {
                total.entry(key.clone()).or_insert_with(|| Value::from(0));
            }
            _ => {
                let summed = add_numbers(total.get(key), value);
                total.insert(key.clone(), summed);
            }
        }
    }
}
