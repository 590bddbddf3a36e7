use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// One top-level field whose value differs between two versions of a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Serialise both values and list the top-level fields that differ.
///
/// Fields missing on one side compare as `null`. Non-object values are
/// compared as a whole and reported under the empty field name.
pub fn diff_fields<T: Serialize + ?Sized>(before: &T, after: &T) -> Vec<FieldChange> {
    let before = serde_json::to_value(before).unwrap_or(Value::Null);
    let after = serde_json::to_value(after).unwrap_or(Value::Null);
    diff_values(&before, &after)
}

pub fn diff_values(before: &Value, after: &Value) -> Vec<FieldChange> {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let keys: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
            keys.into_iter()
                .filter_map(|key| {
                    let bv = b.get(key).unwrap_or(&Value::Null);
                    let av = a.get(key).unwrap_or(&Value::Null);
                    (bv != av).then(|| FieldChange {
                        field: key.clone(),
                        before: bv.clone(),
                        after: av.clone(),
                    })
                })
                .collect()
        }
        _ if before == after => Vec::new(),
        _ => vec![FieldChange {
            field: String::new(),
            before: before.clone(),
            after: after.clone(),
        }],
    }
}

/// Merge a partial entity into `target`: objects merge key by key, every
/// other value replaces what was there.
pub fn merge_partial(target: &mut Value, partial: &Value) {
    match (target, partial) {
        (Value::Object(t), Value::Object(p)) => {
            for (key, value) in p {
                merge_partial(t.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (t, p) => *t = p.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_only_changed_fields() {
        let changes = diff_values(
            &json!({ "name": "Barn A", "propertySize": 10 }),
            &json!({ "name": "Barn A", "propertySize": 12 }),
        );
        assert_eq!(
            changes,
            vec![FieldChange {
                field: "propertySize".into(),
                before: json!(10),
                after: json!(12),
            }]
        );
    }

    #[test]
    fn missing_field_compares_as_null() {
        let changes = diff_values(&json!({ "a": 1 }), &json!({ "b": 2 }));
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, ["a", "b"]);
        assert_eq!(changes[0].after, Value::Null);
        assert_eq!(changes[1].before, Value::Null);
    }

    #[test]
    fn scalars_compare_whole() {
        assert!(diff_values(&json!(["x"]), &json!(["x"])).is_empty());
        let changes = diff_values(&json!(["x"]), &json!(["y"]));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "");
    }

    #[test]
    fn merge_partial_keeps_untouched_siblings() {
        let mut entity = json!({
            "basicInfo": { "name": "Barn A", "propertySize": 10, "description": "Quiet" },
            "services": ["Feeding"],
        });
        merge_partial(
            &mut entity,
            &json!({ "basicInfo": { "propertySize": 12 }, "services": [] }),
        );
        assert_eq!(
            entity,
            json!({
                "basicInfo": { "name": "Barn A", "propertySize": 12, "description": "Quiet" },
                "services": [],
            })
        );
    }
}
