use super::sanitize::sanitize_property_name;
use serde_json::{Map, Value};

/// Rewrite a property tree into the shape the store accepts: sanitized
/// object keys, no arrays.
///
/// Arrays become ordinal-keyed objects: the element at 0-based index `i` is
/// stored under the decimal string `i + 1`. The 1-based convention is pinned;
/// changing it would break every document already written through it.
///
/// When two source keys collide after sanitization, the key occurring later
/// in object iteration order wins (iteration order is insertion order).
pub fn normalize_tree(value: Value) -> Value {
    match value {
        Value::Object(entries) => {
            let mut normalized = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                normalized.insert(sanitize_property_name(&key), normalize_tree(entry));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => {
            let mut normalized = Map::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                normalized.insert((index + 1).to_string(), normalize_tree(item));
            }
            Value::Object(normalized)
        }
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contains_array(value: &Value) -> bool {
        match value {
            Value::Array(_) => true,
            Value::Object(map) => map.values().any(contains_array),
            _ => false,
        }
    }

    #[test]
    fn arrays_become_one_based_ordinal_objects() {
        let normalized = normalize_tree(json!(["a", "b", "c"]));
        assert_eq!(normalized, json!({"1": "a", "2": "b", "3": "c"}));
    }

    #[test]
    fn nested_arrays_are_flattened_recursively() {
        let normalized = normalize_tree(json!({
            "readings": [1, [2, 3]],
            "meta": {"tags": ["x"]}
        }));
        assert_eq!(
            normalized,
            json!({
                "readings": {"1": 1, "2": {"1": 2, "2": 3}},
                "meta": {"tags": {"1": "x"}}
            })
        );
    }

    #[test]
    fn no_array_survives_normalization() {
        let gnarly = json!({
            "a": [[1, 2], {"b": [3, {"c": [4]}]}],
            "d": {"e": [[[5]]]}
        });
        assert!(!contains_array(&normalize_tree(gnarly)));
    }

    #[test]
    fn keys_are_sanitized_at_every_level() {
        let normalized = normalize_tree(json!({
            "a.b": {"$c": 1, "d e": {"#f": 2}}
        }));
        assert_eq!(normalized, json!({"a_b": {"_c": 1, "d_e": {"_f": 2}}}));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(normalize_tree(json!(42)), json!(42));
        assert_eq!(normalize_tree(json!("s")), json!("s"));
        assert_eq!(normalize_tree(Value::Null), Value::Null);
        assert_eq!(normalize_tree(json!(true)), json!(true));
    }

    #[test]
    fn collisions_resolve_to_the_later_key() {
        // "a.b" and "a_b" both sanitize to "a_b"; the later entry wins.
        let normalized = normalize_tree(json!({"a.b": 1, "a_b": 2}));
        assert_eq!(normalized, json!({"a_b": 2}));

        let reversed = normalize_tree(json!({"a_b": 2, "a.b": 1}));
        assert_eq!(reversed, json!({"a_b": 1}));
    }
}
