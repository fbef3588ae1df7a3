//! Query orchestration pipeline.
//!
//! One question flows through a fixed sequence: build the selection prompt
//! from the full catalog's metadata, invoke the selector model, interpret
//! its response, resolve the named table, build the codegen prompt scoped to
//! that table alone, invoke the codegen model, and execute the generated
//! code with only the resolved table bound. Each failure exit produces a
//! terminal user-visible message; nothing propagates to the caller and no
//! stage is retried here.

use crate::catalog::TableCatalog;
use crate::error::{AssistantError, Result};
use crate::executor::{CodeExecutor, ExecutionPayload, KernelKind};
use crate::interpreter;
use crate::llm::{LanguageModel, SessionConfig};
use crate::prompt::PromptTemplate;
use crate::resolver::TableResolver;
use crate::session::{ChatSession, MessageContent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct QueryPipeline {
    catalog: Arc<TableCatalog>,
    selector_template: PromptTemplate,
    codegen_template: PromptTemplate,
    llm: Arc<dyn LanguageModel>,
    executor: Arc<dyn CodeExecutor>,
    resolver: TableResolver,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<TableCatalog>,
        selector_template: PromptTemplate,
        codegen_template: PromptTemplate,
        llm: Arc<dyn LanguageModel>,
        executor: Arc<dyn CodeExecutor>,
    ) -> Self {
        Self {
            catalog,
            selector_template,
            codegen_template,
            llm,
            executor,
            resolver: TableResolver::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: TableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Process one question end to end, appending both the user message and
    /// the assistant's reply to the session. Stage failures become the
    /// reply; this never returns an error to the caller.
    pub async fn ask(&self, session: &mut ChatSession, question: &str) -> MessageContent {
        session.push_user(question);
        let content = match self.run(question).await {
            Ok(content) => content,
            Err(e) => MessageContent::Error(e.to_string()),
        };
        session.push_assistant(content.clone());
        content
    }

    async fn run(&self, question: &str) -> Result<MessageContent> {
        let selector_prompt = self
            .selector_template
            .render(&self.catalog.format_all(), question);
        let raw = self
            .llm
            .invoke(&SessionConfig::selector(), &selector_prompt)
            .await?;

        // An unparseable response means no candidate, not a crash. The
        // empty candidate then fails resolution with the refine message.
        let candidate = match interpreter::interpret(&raw) {
            Ok(response) => interpreter::candidate_table_name(&response),
            Err(e) => {
                warn!("Selector response was not parseable JSON: {}", e);
                String::new()
            }
        };

        let keys = self.catalog.table_ids();
        let resolution = self.resolver.resolve(&candidate, &keys)?;
        info!(
            "Resolved table '{}' via {:?} tier",
            resolution.table, resolution.tier
        );

        // Codegen sees metadata for the resolved table only.
        let table_metadata = self
            .catalog
            .format_one(&resolution.table)
            .ok_or_else(|| AssistantError::Catalog(format!("missing table {}", resolution.table)))?;
        let codegen_prompt = self.codegen_template.render(&table_metadata, question);
        let code = self
            .llm
            .invoke(&SessionConfig::codegen(), &codegen_prompt)
            .await?;

        let frame = self
            .catalog
            .frame(&resolution.table)
            .ok_or_else(|| AssistantError::Catalog(format!("missing table {}", resolution.table)))?
            .clone();
        let mut binding = HashMap::new();
        binding.insert(resolution.table.clone(), frame);
        let result = self
            .executor
            .execute(&code, KernelKind::Sql, "main", binding)
            .await?;

        // A non-empty error is a failure even when output is also present.
        if let Some(error) = result.error.filter(|e| !e.is_empty()) {
            return Ok(MessageContent::Error(format!("Error: {}", error)));
        }
        Ok(match result.output {
            Some(ExecutionPayload::Table(frame)) => MessageContent::Tabular(frame),
            Some(ExecutionPayload::Text(text)) => MessageContent::Text(text),
            None => MessageContent::Text("The query produced no output.".to_string()),
        })
    }
}
