use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Failed to parse selector response: {0}")]
    SelectorParse(String),

    #[error("No relevant tables found for '{candidate}'. Please refine your question.")]
    NoTableMatch { candidate: String },

    #[error("Multiple tables matched '{candidate}': {}. Please refine your question.", .matches.join(", "))]
    AmbiguousTableMatch {
        candidate: String,
        matches: Vec<String>,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
