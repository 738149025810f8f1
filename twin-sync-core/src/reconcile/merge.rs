use serde_json::{map::Entry, Value};

/// Outcome of merging an incoming payload over the current reported state.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Candidate new reported-property document
    pub merged: Value,
    /// Whether `merged` structurally differs from the current state
    pub changed: bool,
}

/// Merge `incoming` over a deep copy of `current` and decide whether the
/// result differs from `current`.
///
/// Union rule: keys absent from the target are inserted; when both sides
/// hold objects the merge recurses; otherwise the incoming value replaces
/// the target's, containers and explicit `null` included. `current` is never
/// mutated — it is the comparison baseline.
pub fn reconcile(current: &Value, incoming: &Value) -> Reconciliation {
    let mut merged = current.clone();
    deep_merge(&mut merged, incoming);
    let changed = !deep_equal(&merged, current);
    Reconciliation { merged, changed }
}

fn deep_merge(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match target_map.entry(key.clone()) {
                    Entry::Vacant(vacant) => {
                        vacant.insert(value.clone());
                    }
                    Entry::Occupied(mut occupied) => {
                        let slot = occupied.get_mut();
                        if slot.is_object() && value.is_object() {
                            deep_merge(slot, value);
                        } else {
                            *slot = value.clone();
                        }
                    }
                }
            }
        }
        (slot, _) => *slot = incoming.clone(),
    }
}

/// Structural equality: key sets equal at every level, scalars compared
/// JSON-equivalently with numeric coercion (`1` equals `1.0`).
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, av)| b.get(key).is_some_and(|bv| deep_equal(av, bv)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(av, bv)| deep_equal(av, bv))
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => a == b,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
