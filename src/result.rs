//! Pull-based cache of the most recent invocation's result.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::engine::EngineObject;

/// Materialized output of the most recently completed invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum LastResult {
    /// Nothing produced, or nothing has run yet.
    #[default]
    Empty,
    /// Exactly one output object, unwrapped to its base value.
    Single(Value),
    /// Two or more base values in output order.
    Many(Vec<Value>),
}

impl LastResult {
    pub fn from_output(output: Vec<EngineObject>) -> Self {
        let mut values: Vec<Value> = output
            .into_iter()
            .map(EngineObject::into_base_value)
            .collect();
        match values.len() {
            0 => LastResult::Empty,
            1 => LastResult::Single(values.remove(0)),
            _ => LastResult::Many(values),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LastResult::Empty)
    }

    /// Flatten into a single JSON value: `null`, the value, or an array.
    pub fn into_value(self) -> Value {
        match self {
            LastResult::Empty => Value::Null,
            LastResult::Single(value) => value,
            LastResult::Many(values) => Value::Array(values),
        }
    }
}

/// Single guarded slot. No history is kept.
#[derive(Default)]
pub struct ResultCache {
    slot: Mutex<LastResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, result: LastResult) {
        *self.slot.lock() = result;
    }

    pub fn get(&self) -> LastResult {
        self.slot.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn objects(values: &[Value]) -> Vec<EngineObject> {
        values.iter().cloned().map(EngineObject::new).collect()
    }

    #[test]
    fn no_output_is_empty() {
        let result = LastResult::from_output(Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.into_value(), Value::Null);
    }

    #[test]
    fn single_output_is_unwrapped() {
        let result = LastResult::from_output(objects(&[json!(42)]));
        assert_eq!(result, LastResult::Single(json!(42)));
        assert_eq!(result.into_value(), json!(42));
    }

    #[test]
    fn single_array_value_is_not_flattened_into_many() {
        let result = LastResult::from_output(objects(&[json!([1, 2])]));
        assert_eq!(result, LastResult::Single(json!([1, 2])));
    }

    #[test]
    fn multiple_outputs_keep_order() {
        let result = LastResult::from_output(objects(&[json!("a"), json!("b"), json!(3)]));
        assert_eq!(
            result,
            LastResult::Many(vec![json!("a"), json!("b"), json!(3)])
        );
    }

    #[test]
    fn serializes_untagged() {
        let many = LastResult::Many(vec![json!(1), json!(2)]);
        assert_eq!(serde_json::to_string(&many).expect("json"), "[1,2]");
        assert_eq!(
            serde_json::to_string(&LastResult::Empty).expect("json"),
            "null"
        );
    }

    #[test]
    fn cache_starts_empty_and_keeps_only_latest() {
        let cache = ResultCache::new();
        assert_eq!(cache.get(), LastResult::Empty);

        cache.set(LastResult::Single(json!("first")));
        cache.set(LastResult::Single(json!("second")));
        assert_eq!(cache.get(), LastResult::Single(json!("second")));

        cache.set(LastResult::Empty);
        assert!(cache.get().is_empty());
    }

    #[test]
    fn concurrent_reads_see_whole_values() {
        let cache = Arc::new(ResultCache::new());
        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..200 {
                    cache.set(LastResult::Many(vec![json!(i), json!(i)]));
                }
            })
        };

        for _ in 0..200 {
            match cache.get() {
                LastResult::Empty => {}
                LastResult::Many(values) => assert_eq!(values[0], values[1]),
                other => panic!("unexpected {other:?}"),
            }
        }
        writer.join().expect("writer");
    }
}
