//! Prompt templates with named placeholder substitution.
//!
//! Templates are plain text files carrying `{{TABLE_METADATA}}` and
//! `{{question}}` markers. Substitution is verbatim: no escaping is applied
//! to the question, so a question containing a literal marker would corrupt
//! the template. Known limitation of the template format.

use crate::error::{AssistantError, Result};
use std::path::Path;

pub const METADATA_PLACEHOLDER: &str = "{{TABLE_METADATA}}";
pub const QUESTION_PLACEHOLDER: &str = "{{question}}";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Load a template from disk, checking both placeholders are present.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(text).map_err(|e| {
            AssistantError::Template(format!("{}: {}", path.display(), e))
        })
    }

    pub fn from_text(text: impl Into<String>) -> std::result::Result<Self, String> {
        let text = text.into();
        for placeholder in [METADATA_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(format!("missing placeholder {}", placeholder));
            }
        }
        Ok(Self { text })
    }

    /// Substitute metadata first, then the question, matching the order the
    /// prompts were authored for.
    pub fn render(&self, table_metadata: &str, question: &str) -> String {
        self.text
            .replace(METADATA_PLACEHOLDER, table_metadata)
            .replace(QUESTION_PLACEHOLDER, question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_both_placeholders() {
        let template = PromptTemplate::from_text(
            "Tables:\n{{TABLE_METADATA}}\nQuestion: {{question}}",
        )
        .unwrap();
        let rendered = template.render("=== Table: A ===", "who listens?");
        assert_eq!(rendered, "Tables:\n=== Table: A ===\nQuestion: who listens?");
    }

    #[test]
    fn from_text_rejects_template_missing_placeholder() {
        let err = PromptTemplate::from_text("Question: {{question}}").unwrap_err();
        assert!(err.contains("TABLE_METADATA"));
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let template = PromptTemplate::from_text(
            "{{TABLE_METADATA}}\n{{question}}\n{{question}}",
        )
        .unwrap();
        let rendered = template.render("m", "q");
        assert_eq!(rendered, "m\nq\nq");
    }
}
