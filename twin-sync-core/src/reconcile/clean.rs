use super::normalize::normalize_tree;
use serde_json::{Map, Value};
use twin_sync_models::constants::VOLATILE_TIMESTAMP_FIELD;

/// Remove top-level fields that change on every event and must not take part
/// in the merge or the no-op comparison.
pub fn strip_volatile_fields(payload: &mut Map<String, Value>) {
    payload.remove(VOLATILE_TIMESTAMP_FIELD);
}

/// Remove every field anywhere in the tree whose value is still an array.
///
/// Normalization is the primary array-elimination mechanism; this second
/// pass guards the update call in case a payload reaches the merge without
/// having been normalized. The store rejects array-typed properties outright.
pub fn strip_array_fields(value: &mut Value) {
    if let Value::Object(entries) = value {
        entries.retain(|_, entry| !entry.is_array());
        for entry in entries.values_mut() {
            strip_array_fields(entry);
        }
    }
}

/// Full cleaning pass for an incoming event payload: drop volatile fields,
/// normalize keys and arrays into the store schema, then defensively strip
/// any arrays left over.
pub fn clean_event_payload(mut payload: Map<String, Value>) -> Value {
    strip_volatile_fields(&mut payload);
    let mut normalized = normalize_tree(Value::Object(payload));
    strip_array_fields(&mut normalized);
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn volatile_timestamp_is_dropped() {
        let mut payload = as_map(json!({"timeStamp": "2026-08-07T10:00:00Z", "temp": 5}));
        strip_volatile_fields(&mut payload);
        assert_eq!(Value::Object(payload), json!({"temp": 5}));
    }

    #[test]
    fn only_the_top_level_timestamp_is_volatile() {
        let mut payload = as_map(json!({"nested": {"timeStamp": "keep me"}}));
        strip_volatile_fields(&mut payload);
        assert_eq!(
            Value::Object(payload),
            json!({"nested": {"timeStamp": "keep me"}})
        );
    }

    #[test]
    fn array_fields_are_removed_at_any_depth() {
        let mut tree = json!({
            "keep": 1,
            "drop": [1, 2],
            "nested": {"also_drop": [], "keep": "x"}
        });
        strip_array_fields(&mut tree);
        assert_eq!(tree, json!({"keep": 1, "nested": {"keep": "x"}}));
    }

    #[test]
    fn full_clean_normalizes_and_drops_volatiles() {
        let payload = as_map(json!({
            "timeStamp": "2026-08-07T10:00:00Z",
            "temp": 21,
            "readings": [1, 2]
        }));
        let cleaned = clean_event_payload(payload);
        assert_eq!(cleaned, json!({"temp": 21, "readings": {"1": 1, "2": 2}}));
    }
}
