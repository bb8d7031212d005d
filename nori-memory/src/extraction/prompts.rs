//! Prompt asking the model for profile changes, or `null` when there are none.

use crate::profile::ProfileSchema;
use crate::template::fill_placeholders;

/// Extraction prompt template.
///
/// Placeholders:
/// - `{purpose}` - schema purpose phrase
/// - `{profile}` - current profile as rendered for prompts
/// - `{user_message}` / `{assistant_response}` - the exchange
/// - `{field_catalogue}` - one `- name: hint` line per schema field
pub const EXTRACTION_PROMPT: &str = r#"Analyze this conversation exchange and extract any NEW information about the user that should be remembered {purpose}.

Current known profile:
{profile}

User said: {user_message}
Assistant responded: {assistant_response}

If there's new information to add, respond with a JSON object containing only the fields to update:
{field_catalogue}

Only include fields where you found NEW information not already in the profile.
If nothing new was learned, respond with exactly: null

Respond with ONLY the JSON object or null, no other text."#;

/// Schema field catalogue, one `- name: hint` line per field.
#[must_use]
pub fn build_field_catalogue(schema: &ProfileSchema) -> String {
    schema
        .fields()
        .iter()
        .map(|field| format!("- {}: {}", field.name, field.hint))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full extraction prompt.
///
/// # Example
/// ```
/// use nori_memory::extraction::build_extraction_prompt;
/// use nori_memory::profile::ProfileSchema;
///
/// let schema = ProfileSchema::weight_loss();
/// let prompt = build_extraction_prompt(&schema, "No information known yet about this person.", "hi", "hello");
/// assert!(prompt.contains("User said: hi"));
/// ```
#[must_use]
pub fn build_extraction_prompt(
    schema: &ProfileSchema,
    profile_text: &str,
    user_message: &str,
    assistant_response: &str,
) -> String {
    let catalogue = build_field_catalogue(schema);
    fill_placeholders(
        EXTRACTION_PROMPT,
        &[
            ("purpose", schema.purpose()),
            ("profile", profile_text),
            ("user_message", user_message),
            ("assistant_response", assistant_response),
            ("field_catalogue", &catalogue),
        ],
    )
}
