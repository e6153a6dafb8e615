use serde_json::{Map, Value};

// ============================================================================
// JSON Tree Operations
// ============================================================================
//
// Realtime-database semantics over a serde_json tree:
// - reading a missing location yields null
// - writing null deletes the location
// - objects left empty by a delete are pruned up to the root
//
// Shared by the in-memory backend and by the SSE snapshot cache.
//
// ============================================================================

pub fn get_at(root: &Value, segments: &[String]) -> Value {
    let mut node = root;
    for segment in segments {
        match node.get(segment) {
            Some(child) => node = child,
            None => return Value::Null,
        }
    }
    node.clone()
}

pub fn set_at(root: &mut Value, segments: &[String], value: Value) {
    let value = normalize(value);
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    if value.is_null() {
        remove_at(root, segments);
        return;
    }

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.clone(), value);
}

/// Multi-location update relative to `segments`; keys may contain `/`.
pub fn update_at(root: &mut Value, segments: &[String], fields: Map<String, Value>) {
    for (key, value) in fields {
        let mut target = segments.to_vec();
        target.extend(key.split('/').filter(|s| !s.is_empty()).map(str::to_string));
        set_at(root, &target, value);
    }
}

fn remove_at(root: &mut Value, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        *root = Value::Null;
        return;
    };
    let Value::Object(map) = root else {
        return;
    };

    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        remove_at(child, rest);
        if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
            map.remove(first);
        }
    }
    if map.is_empty() {
        *root = Value::Null;
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

/// Drop null members and empty objects the way the realtime store does.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}
