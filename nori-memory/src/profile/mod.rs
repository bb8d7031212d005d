//! Profile - Structured Per-User Fact Sheet
//!
//! `TigerStyle`: Pure functions for defaults, backfill and rendering; the
//! async [`ProfileStore`] only adds persistence around them.
//!
//! A profile is a JSON object keyed by schema field name. Keys a schema does
//! not know about (written by an older or newer variant) are carried along
//! untouched.

mod schema;
mod store;

pub use schema::{FieldKind, FieldSpec, ProfileSchema};
pub use store::ProfileStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::PROFILE_EMPTY_SENTINEL;

// =============================================================================
// Profile
// =============================================================================

/// Field values keyed by schema field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    /// Wrap an existing JSON object.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Value of a field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Mutable value of a field, if present.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// String items of a list field (non-string items are skipped).
    #[must_use]
    pub fn list(&self, name: &str) -> Vec<&str> {
        match self.0.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of keys (schema fields plus preserved unknown keys).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the profile holds no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// =============================================================================
// Pure Operations
// =============================================================================

/// Fresh profile holding every schema field at its default.
#[must_use]
pub fn default_profile(schema: &ProfileSchema) -> Profile {
    let profile = Profile(
        schema
            .fields()
            .iter()
            .map(|field| (field.name.to_string(), field.default_value()))
            .collect(),
    );

    // Postcondition
    debug_assert_eq!(profile.len(), schema.fields().len());
    profile
}

/// Overlay stored values on a fresh default profile.
///
/// Stored values win, missing schema fields are backfilled, and stored keys
/// unknown to the schema are preserved verbatim.
#[must_use]
pub fn backfill(schema: &ProfileSchema, stored: Map<String, Value>) -> Profile {
    let mut profile = default_profile(schema);
    let stored_count = stored.len();
    for (key, value) in stored {
        profile.0.insert(key, value);
    }

    // Postcondition
    debug_assert!(profile.len() >= stored_count, "no stored key may be dropped");
    profile
}

/// Whether a value counts as "known" when rendering.
///
/// `null`, empty strings and empty collections are unknown; `false` and `0`
/// are known facts.
#[must_use]
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Render one value for humans: lists joined with `", "`, booleans as
/// `Yes`/`No`.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Text block injected into prompts: one `Label: value` line per populated
/// field in schema order, or the empty sentinel.
#[must_use]
pub fn render_for_prompt(schema: &ProfileSchema, profile: &Profile) -> String {
    let lines: Vec<String> = schema
        .fields()
        .iter()
        .filter_map(|field| {
            profile
                .get(field.name)
                .filter(|value| is_populated(value))
                .map(|value| format!("{}: {}", field.label, render_value(value)))
        })
        .collect();

    if lines.is_empty() {
        return PROFILE_EMPTY_SENTINEL.to_string();
    }
    lines.join("\n")
}

/// Full human-readable view listing every schema field.
#[must_use]
pub fn render_display(schema: &ProfileSchema, profile: &Profile) -> String {
    let mut output = vec!["\n=== Your Profile ===".to_string()];
    for field in schema.fields() {
        let value = profile
            .get(field.name)
            .filter(|value| is_populated(value))
            .map(render_value);
        let shown = value.unwrap_or_else(|| {
            match field.kind {
                FieldKind::List => "None recorded",
                FieldKind::Scalar | FieldKind::Text => "Not set",
            }
            .to_string()
        });
        output.push(format!("{}: {shown}", field.label));
    }
    output.push("====================\n".to_string());
    output.join("\n")
}
