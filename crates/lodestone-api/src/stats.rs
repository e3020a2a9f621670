//! Player statistics reshaping: the game writes a flat map with dotted keys
//! (`stat.mineBlock.minecraft.stone`); the API serves a nested category
//! tree.

use serde_json::{Map, Value};

/// Builds a nested object tree by splitting each flat key on `.`.
///
/// A key that is a prefix of another key cannot keep its value at the
/// branching node, so it is demoted to a `summary` field inside the nested
/// object: `{"a.b": 1, "a.b.c": 2}` becomes
/// `{"a": {"b": {"summary": 1, "c": 2}}}`, whichever key arrives first.
pub fn reshape_stats(flat: &Map<String, Value>) -> Value {
    let mut root = Map::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split('.').collect();
        insert_dotted(&mut root, &parts, value.clone());
    }
    Value::Object(root)
}

fn insert_dotted(node: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let (head, rest) = match parts.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        match node.get_mut(*head) {
            // A longer key already built an object here: this shorter key's
            // value becomes its summary.
            Some(Value::Object(existing)) => {
                existing.insert("summary".to_owned(), value);
            }
            _ => {
                node.insert((*head).to_owned(), value);
            }
        }
        return;
    }
    let child = node
        .entry((*head).to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        // A shorter key already put a leaf here: demote it to a summary and
        // keep descending.
        let summary = std::mem::replace(child, Value::Object(Map::new()));
        if let Value::Object(map) = child {
            map.insert("summary".to_owned(), summary);
        }
    }
    if let Value::Object(map) = child {
        insert_dotted(map, rest, value);
    }
}
