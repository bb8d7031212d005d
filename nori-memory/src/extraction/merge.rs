//! Profile Merge Engine
//!
//! One schema-agnostic rule set, keyed on the runtime type of the value
//! already stored:
//!
//! | existing | reported | result                                   |
//! |----------|----------|------------------------------------------|
//! | list     | list     | append reported items not already present |
//! | list     | scalar   | append the scalar if not already present  |
//! | other    | any      | reported value overwrites                 |
//!
//! Keys outside the schema are ignored.

use serde_json::{Map, Value};

use crate::profile::{Profile, ProfileSchema};

/// Apply `update` to `profile` in place.
///
/// Returns the number of fields whose stored value changed. Idempotent:
/// applying the same update twice changes nothing the second time.
pub fn merge_update(schema: &ProfileSchema, profile: &mut Profile, update: &Map<String, Value>) -> usize {
    let mut changed_count = 0;

    for (key, reported) in update {
        if schema.field(key).is_none() {
            tracing::debug!(field = %key, "ignoring field outside schema");
            continue;
        }

        let changed = match profile.get_mut(key) {
            Some(Value::Array(existing)) => match reported {
                Value::Array(items) => append_unique(existing, items),
                scalar => append_unique(existing, std::slice::from_ref(scalar)),
            },
            Some(existing) => {
                if existing == reported {
                    false
                } else {
                    *existing = reported.clone();
                    true
                }
            }
            None => {
                profile.insert(key.clone(), reported.clone());
                true
            }
        };

        if changed {
            changed_count += 1;
        }
    }

    // Postcondition
    debug_assert!(changed_count <= update.len());
    changed_count
}

/// Append items not already present (exact match), preserving both orders.
fn append_unique(existing: &mut Vec<Value>, items: &[Value]) -> bool {
    let count_before = existing.len();
    for item in items {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
    existing.len() > count_before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::default_profile;
    use serde_json::json;

    fn update(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn profile_with(schema: &ProfileSchema, key: &str, value: Value) -> Profile {
        let mut profile = default_profile(schema);
        profile.insert(key, value);
        profile
    }

    #[test]
    fn test_list_plus_list_appends_new_items_in_order() {
        let schema = ProfileSchema::weight_loss();
        let mut profile = profile_with(&schema, "barriers", json!(["stress eating"]));

        let changed = merge_update(
            &schema,
            &mut profile,
            &update(json!({"barriers": ["travels for work", "stress eating", "night shifts"]})),
        );

        assert_eq!(changed, 1);
        assert_eq!(
            profile.list("barriers"),
            vec!["stress eating", "travels for work", "night shifts"]
        );
    }

    #[test]
    fn test_list_plus_scalar_appends_once() {
        let schema = ProfileSchema::health();
        let mut profile = default_profile(&schema);
        let patch = update(json!({"allergies": "penicillin"}));

        merge_update(&schema, &mut profile, &patch);
        merge_update(&schema, &mut profile, &patch);

        assert_eq!(profile.list("allergies"), vec!["penicillin"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let schema = ProfileSchema::weight_loss();
        let patch = update(json!({
            "notes": ["wants to lose 20 lbs"],
            "current_weight": "210 lbs",
            "committed": true
        }));

        let mut once = default_profile(&schema);
        merge_update(&schema, &mut once, &patch);

        let mut twice = once.clone();
        let changed = merge_update(&schema, &mut twice, &patch);

        assert_eq!(changed, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scalar_overwrites_non_null() {
        let schema = ProfileSchema::weight_loss();
        let mut profile = profile_with(&schema, "current_weight", json!("210 lbs"));

        merge_update(&schema, &mut profile, &update(json!({"current_weight": "205 lbs"})));

        assert_eq!(profile.get("current_weight"), Some(&json!("205 lbs")));
    }

    #[test]
    fn test_text_field_overwrites() {
        let schema = ProfileSchema::weight_loss();
        let mut profile = profile_with(&schema, "plan", json!("Walk daily"));

        merge_update(&schema, &mut profile, &update(json!({"plan": "Walk daily, cut soda"})));

        assert_eq!(profile.get("plan"), Some(&json!("Walk daily, cut soda")));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let schema = ProfileSchema::health();
        let mut profile = default_profile(&schema);
        let before = profile.clone();

        let changed = merge_update(&schema, &mut profile, &update(json!({"favorite_color": "blue"})));

        assert_eq!(changed, 0);
        assert_eq!(profile, before);
    }

    #[test]
    fn test_existing_scalar_replaced_by_list() {
        // Type is decided by what is stored, not by the schema.
        let schema = ProfileSchema::health();
        let mut profile = profile_with(&schema, "notes", json!("legacy string"));

        merge_update(&schema, &mut profile, &update(json!({"notes": ["new fact"]})));

        assert_eq!(profile.get("notes"), Some(&json!(["new fact"])));
    }

    #[test]
    fn test_missing_schema_key_is_inserted() {
        let schema = ProfileSchema::health();
        let mut profile = Profile::default();

        merge_update(&schema, &mut profile, &update(json!({"age": 42})));

        assert_eq!(profile.get("age"), Some(&json!(42)));
    }
}
