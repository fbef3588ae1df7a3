pub mod catalog;
pub mod error;
pub mod executor;
pub mod interpreter;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod session;
