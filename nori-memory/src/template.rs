//! Prompt Template - System Prompt Loading and Rendering
//!
//! The template is plain text with `{user_profile}` and `{current_date}`
//! placeholders; `{{` and `}}` produce literal braces. An optional resources
//! file is appended after a blank line.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// File holding the system prompt template (required).
pub const SYSTEM_PROMPT_FILE: &str = "system.txt";

/// File holding extra resource text (optional).
pub const RESOURCES_FILE: &str = "resources.txt";

/// Date format used for `{current_date}` (e.g. "January 15, 2025").
pub const CURRENT_DATE_FORMAT: &str = "%B %d, %Y";

const BUILTIN_SYSTEM_PROMPT: &str = include_str!("../prompts/system.txt");
const BUILTIN_RESOURCES: &str = include_str!("../prompts/resources.txt");

/// Errors from loading templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// `system.txt` is missing from the prompts directory
    #[error("system prompt not found at {path}")]
    NotFound {
        /// Expected location
        path: PathBuf,
    },

    /// A template file exists but cannot be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// System prompt template plus optional resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: String,
    resources: String,
}

impl PromptTemplate {
    /// Template compiled into the binary.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_text(BUILTIN_SYSTEM_PROMPT, BUILTIN_RESOURCES)
    }

    /// Build from in-memory text. Empty `resources` means none.
    #[must_use]
    pub fn from_text(system: impl Into<String>, resources: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            resources: resources.into(),
        }
    }

    /// Load `system.txt` (required) and `resources.txt` (optional) from `dir`.
    ///
    /// # Errors
    /// Returns `TemplateError::NotFound` if `system.txt` is missing and
    /// `TemplateError::Read` for any other I/O failure.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();

        let system_path = dir.join(SYSTEM_PROMPT_FILE);
        let system = match tokio::fs::read_to_string(&system_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound { path: system_path });
            }
            Err(source) => {
                return Err(TemplateError::Read {
                    path: system_path,
                    source,
                })
            }
        };

        let resources_path = dir.join(RESOURCES_FILE);
        let resources = match tokio::fs::read_to_string(&resources_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(TemplateError::Read {
                    path: resources_path,
                    source,
                })
            }
        };

        tracing::debug!(dir = %dir.display(), has_resources = !resources.is_empty(), "prompt template loaded");
        Ok(Self::from_text(system, resources))
    }

    /// Raw template text.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Resource text (empty when absent).
    #[must_use]
    pub fn resources(&self) -> &str {
        &self.resources
    }

    /// Substitute the profile block and date, then append resources.
    #[must_use]
    pub fn render(&self, profile_text: &str, date: NaiveDate) -> String {
        let current_date = date.format(CURRENT_DATE_FORMAT).to_string();
        let mut prompt = fill_placeholders(
            &self.system,
            &[("user_profile", profile_text), ("current_date", &current_date)],
        );
        if !self.resources.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.resources);
        }
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replace `{name}` placeholders in one pass.
///
/// Substituted values are never rescanned. `{{`/`}}` become literal braces;
/// unknown placeholders are left as they are.
#[must_use]
pub fn fill_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let brace = &rest[pos..=pos];
        let tail = &rest[pos + 1..];

        if tail.starts_with(brace) {
            out.push_str(brace);
            rest = &tail[1..];
            continue;
        }

        if brace == "{" {
            let hit = vars.iter().find(|(name, _)| {
                tail.strip_prefix(name)
                    .is_some_and(|after| after.starts_with('}'))
            });
            if let Some((name, value)) = hit {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
                continue;
            }
        }

        out.push_str(brace);
        rest = tail;
    }

    out.push_str(rest);
    out
}
