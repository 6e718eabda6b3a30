//! Operations on an in-memory JSON tree with realtime-store semantics.
//!
//! The store has no notion of `null` or of empty containers: writing `null`
//! deletes a node, and a parent whose last child disappears disappears too.

use serde_json::{Map, Value};

/// Returns `true` for values the store treats as absent.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Strip nulls and empty objects from a value before it is stored.
///
/// Returns `None` if nothing is left.
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| normalize(child).map(|child| (key, child)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

/// Look up the node at `path`, if present.
pub fn value_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let node = path
        .iter()
        .try_fold(root, |node, key| node.as_object()?.get(key))?;
    (!is_empty(node)).then_some(node)
}

/// Replace the node at `path` with `value`, or delete it when `value` is `None`.
///
/// Intermediate objects are created on the way down and pruned on the way up
/// when they end up empty. A root left empty becomes `null`.
pub fn write(root: &mut Value, path: &[String], value: Option<Value>) {
    write_node(root, path, value);
    if is_empty(root) {
        *root = Value::Null;
    }
}

fn write_node(node: &mut Value, path: &[String], value: Option<Value>) {
    let Some((head, rest)) = path.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_node(child, rest, value);
    if is_empty(child) {
        map.remove(head);
    }
}

/// Replace every `{".sv": "timestamp"}` placeholder with `now_ms`.
pub fn resolve_server_values(value: &mut Value, now_ms: i64) {
    if let Value::Object(map) = value {
        if map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp") {
            *value = Value::from(now_ms);
            return;
        }
        for child in map.values_mut() {
            resolve_server_values(child, now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| (*key).to_owned()).collect()
    }

    #[test]
    fn test_write_creates_intermediate_nodes() {
        let mut root = Value::Null;
        write(&mut root, &path(&["carts", "u1", "p1"]), Some(json!({"name": "Bolt"})));
        assert_eq!(root, json!({"carts": {"u1": {"p1": {"name": "Bolt"}}}}));
    }

    #[test]
    fn test_remove_prunes_empty_parents() {
        let mut root = json!({"carts": {"u1": {"p1": 1}}, "products": {"a": 1}});
        write(&mut root, &path(&["carts", "u1", "p1"]), None);
        assert_eq!(root, json!({"products": {"a": 1}}));
    }

    #[test]
    fn test_removing_last_leaf_empties_root() {
        let mut root = json!({"products": {"p1": {"name": "Bolt"}}});
        write(&mut root, &path(&["products", "p1"]), None);
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut root = json!({"products": {"a": 1}});
        write(&mut root, &path(&["carts", "u1"]), None);
        assert_eq!(root, json!({"products": {"a": 1}}));
    }

    #[test]
    fn test_value_at_treats_empty_as_absent() {
        let root = json!({"a": {"b": 2}, "c": {}});
        assert_eq!(value_at(&root, &path(&["a", "b"])), Some(&json!(2)));
        assert_eq!(value_at(&root, &path(&["c"])), None);
        assert_eq!(value_at(&root, &path(&["a", "b", "x"])), None);
        assert_eq!(value_at(&Value::Null, &[]), None);
    }

    #[test]
    fn test_normalize_drops_nulls() {
        assert_eq!(
            normalize(json!({"a": null, "b": {"c": null}, "d": 1})),
            Some(json!({"d": 1}))
        );
        assert_eq!(normalize(json!({"a": null})), None);
    }

    #[test]
    fn test_server_timestamp_is_resolved() {
        let mut value = json!({"status": "Pending", "timestamp": {".sv": "timestamp"}});
        resolve_server_values(&mut value, 1_700_000_000_000);
        assert_eq!(value, json!({"status": "Pending", "timestamp": 1_700_000_000_000_i64}));
    }
}
