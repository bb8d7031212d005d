//! Profile Schemas
//!
//! A schema is the ordered field catalogue of one deployment variant. Merge,
//! render and extraction logic only ever look at field names and kinds, so
//! adding a variant is a data change.

use serde_json::Value;

use crate::constants::PROFILE_FIELDS_COUNT_MAX;

/// How a field behaves under merge and render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String, number or boolean; nullable; overwritten on update
    Scalar,
    /// List of strings; append-only and de-duplicated
    List,
    /// Free text; overwritten on update
    Text,
}

/// One named profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key
    pub name: &'static str,
    /// Human label used in rendered text
    pub label: &'static str,
    /// Merge/render behaviour
    pub kind: FieldKind,
    /// Default for scalar fields (`None` = null); ignored for lists
    pub default: Option<&'static str>,
    /// Type hint shown to the extraction model
    pub hint: &'static str,
}

impl FieldSpec {
    /// Nullable scalar field.
    #[must_use]
    pub const fn scalar(name: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Scalar,
            default: None,
            hint,
        }
    }

    /// List-of-string field.
    #[must_use]
    pub const fn list(name: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::List,
            default: None,
            hint,
        }
    }

    /// Free-text field.
    #[must_use]
    pub const fn text(name: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            default: None,
            hint,
        }
    }

    /// Give a scalar field a non-null default.
    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Fresh default value for this field.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match (self.kind, self.default) {
            (FieldKind::List, _) => Value::Array(Vec::new()),
            (_, Some(default)) => Value::String(default.to_string()),
            (_, None) => Value::Null,
        }
    }
}

const HEALTH_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("name", "Name", "string"),
    FieldSpec::scalar("age", "Age", "number or string"),
    FieldSpec::scalar("location", "Location", "string (city, state or country)").with_default("USA"),
    FieldSpec::list("conditions", "Conditions", "list of medical conditions to ADD"),
    FieldSpec::list(
        "medications",
        "Medications",
        "list of medications to ADD (e.g., \"lisinopril 10mg daily\")",
    ),
    FieldSpec::list("allergies", "Allergies", "list of allergies to ADD (e.g., \"penicillin\")"),
    FieldSpec::list(
        "health_goals",
        "Health goals",
        "list of goals to ADD (e.g., \"run a 5k\")",
    ),
    FieldSpec::list("notes", "Other notes", "list of relevant facts to ADD"),
];

const WEIGHT_LOSS_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("name", "Name", "string"),
    FieldSpec::scalar("height", "Height", "string (e.g., \"5'10\\\"\" or \"178 cm\")"),
    FieldSpec::scalar(
        "current_weight",
        "Current weight",
        "string (e.g., \"210 lbs\" or \"95 kg\")",
    ),
    FieldSpec::scalar(
        "target_weight",
        "Target weight",
        "string (e.g., \"180 lbs\" or \"82 kg\")",
    ),
    FieldSpec::scalar(
        "target_date",
        "Target date",
        "string (e.g., \"June 2025\", \"6 months from now\")",
    ),
    FieldSpec::list("conditions", "Conditions", "list of medical conditions to ADD"),
    FieldSpec::text(
        "current_diet",
        "Current diet",
        "string (summary of typical daily eating)",
    ),
    FieldSpec::text(
        "current_exercise",
        "Current exercise",
        "string (summary of current activity level)",
    ),
    FieldSpec::list(
        "diet_preferences",
        "Diet preferences",
        "list of preferences to ADD (e.g., \"vegetarian\", \"hates broccoli\")",
    ),
    FieldSpec::list(
        "exercise_preferences",
        "Exercise preferences",
        "list of preferences to ADD (e.g., \"likes walking\", \"no gym access\")",
    ),
    FieldSpec::list(
        "chosen_strategies",
        "Chosen strategies",
        "list of strategies to ADD (e.g., \"diet\", \"exercise\", \"GLP-1\")",
    ),
    FieldSpec::list(
        "barriers",
        "Barriers",
        "list of barriers to ADD (e.g., \"travels for work\", \"stress eating\")",
    ),
    FieldSpec::text(
        "plan",
        "Plan",
        "string (the weight loss plan if one was generated)",
    ),
    FieldSpec::scalar(
        "committed",
        "Committed to plan",
        "boolean (true if user explicitly committed to the plan)",
    ),
    FieldSpec::list("notes", "Other notes", "list of relevant facts to ADD"),
];

/// Ordered field catalogue for one deployment variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSchema {
    name: &'static str,
    purpose: &'static str,
    fields: Vec<FieldSpec>,
}

impl ProfileSchema {
    /// Build a custom schema.
    ///
    /// # Panics
    /// Panics if `fields` is empty, exceeds `PROFILE_FIELDS_COUNT_MAX`, or
    /// repeats a field name.
    #[must_use]
    pub fn new(name: &'static str, purpose: &'static str, fields: Vec<FieldSpec>) -> Self {
        assert!(!fields.is_empty(), "schema must have at least one field");
        assert!(
            fields.len() <= PROFILE_FIELDS_COUNT_MAX,
            "schema exceeds {PROFILE_FIELDS_COUNT_MAX} fields"
        );
        for (i, field) in fields.iter().enumerate() {
            assert!(
                fields[..i].iter().all(|other| other.name != field.name),
                "duplicate field name: {}",
                field.name
            );
        }

        Self {
            name,
            purpose,
            fields,
        }
    }

    /// General medical profile.
    #[must_use]
    pub fn health() -> Self {
        Self::new("health", "for their health profile", HEALTH_FIELDS.to_vec())
    }

    /// Weight-loss coaching plan.
    #[must_use]
    pub fn weight_loss() -> Self {
        Self::new(
            "weight-loss",
            "for their weight loss plan",
            WEIGHT_LOSS_FIELDS.to_vec(),
        )
    }

    /// Look up a built-in schema (`health`, `weight-loss`/`weight_loss`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "health" => Some(Self::health()),
            "weight-loss" | "weight_loss" | "weightloss" => Some(Self::weight_loss()),
            _ => None,
        }
    }

    /// Variant name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Phrase completing "information that should be remembered ...".
    #[must_use]
    pub fn purpose(&self) -> &'static str {
        self.purpose
    }

    /// Fields in render order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field by JSON key.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl Default for ProfileSchema {
    fn default() -> Self {
        Self::weight_loss()
    }
}
