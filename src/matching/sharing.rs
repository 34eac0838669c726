//! Structural sharing.
//!
//! Updates are merged into the previous value in place: equal subtrees keep
//! their existing allocation and the caller learns whether anything changed,
//! so unchanged search or params never count as an update downstream.

use serde_json::{Map, Value};

/// Assign `next` into `slot` only when it differs. Returns whether it changed.
pub fn replace_if_changed<T: PartialEq>(slot: &mut T, next: T) -> bool {
    if *slot == next {
        false
    } else {
        *slot = next;
        true
    }
}

/// Merge `next` into `prev`, touching only the parts that differ.
pub fn replace_equal_deep(prev: &mut Value, next: Value) -> bool {
    match (prev, next) {
        (Value::Object(p), Value::Object(n)) => replace_equal_map(p, n),
        (Value::Array(p), Value::Array(n)) if p.len() == n.len() => {
            let mut changed = false;
            for (slot, item) in p.iter_mut().zip(n) {
                changed |= replace_equal_deep(slot, item);
            }
            changed
        }
        (p, n) => replace_if_changed(p, n),
    }
}

pub fn replace_equal_map(prev: &mut Map<String, Value>, next: Map<String, Value>) -> bool {
    let before = prev.len();
    prev.retain(|key, _| next.contains_key(key));
    let mut changed = prev.len() != before;
    for (key, value) in next {
        match prev.get_mut(&key) {
            Some(slot) => changed |= replace_equal_deep(slot, value),
            None => {
                prev.insert(key, value);
                changed = true;
            }
        }
    }
    changed
}
