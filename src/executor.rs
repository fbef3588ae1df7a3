//! Code-execution capability.
//!
//! The pipeline hands generated code plus a table binding to a
//! [`CodeExecutor`] and gets back an `{output, error}` pair. An execution
//! error inside the generated code is captured in the `error` field rather
//! than surfaced as an `Err`, so the pipeline can turn it into a chat
//! message. The built-in kernel runs SQL against the bound tables through
//! polars' `SQLContext`; only the tables in the binding are registered.

use crate::error::Result;
use async_trait::async_trait;
use polars::prelude::*;
use polars::sql::SQLContext;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    Sql,
}

#[derive(Debug, Clone)]
pub enum ExecutionPayload {
    Table(DataFrame),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    pub output: Option<ExecutionPayload>,
    pub error: Option<String>,
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run generated code with only the given tables bound under their
    /// identifiers. `entry` names the entry function for kernels that need
    /// one; the SQL kernel ignores it.
    async fn execute(
        &self,
        code: &str,
        kernel: KernelKind,
        entry: &str,
        tables: HashMap<String, DataFrame>,
    ) -> Result<ExecutionOutput>;
}

/// SQL kernel over polars.
pub struct PolarsSqlExecutor;

#[async_trait]
impl CodeExecutor for PolarsSqlExecutor {
    async fn execute(
        &self,
        code: &str,
        kernel: KernelKind,
        _entry: &str,
        tables: HashMap<String, DataFrame>,
    ) -> Result<ExecutionOutput> {
        let KernelKind::Sql = kernel;
        let sql = strip_code_fences(code);
        debug!("Executing SQL: {}", sql);

        let mut ctx = SQLContext::new();
        for (name, frame) in tables {
            ctx.register(&name, frame.lazy());
        }
        match ctx.execute(sql).and_then(|lf| lf.collect()) {
            Ok(frame) => Ok(ExecutionOutput {
                output: Some(ExecutionPayload::Table(frame)),
                error: None,
            }),
            Err(e) => Ok(ExecutionOutput {
                output: None,
                error: Some(e.to_string()),
            }),
        }
    }
}

/// Models often wrap generated SQL in a markdown fence.
fn strip_code_fences(code: &str) -> &str {
    let mut text = code.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
    }
    text.trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_tables() -> HashMap<String, DataFrame> {
        let mut tables = HashMap::new();
        tables.insert(
            "DecisionMaker".to_string(),
            df![
                "gender" => ["F", "M", "F"],
                "is_decision_maker" => [1i64, 0, 1]
            ]
            .unwrap(),
        );
        tables
    }

    #[tokio::test]
    async fn executes_select_against_bound_table() {
        let out = PolarsSqlExecutor
            .execute(
                "SELECT gender, SUM(is_decision_maker) AS dm FROM DecisionMaker GROUP BY gender ORDER BY gender",
                KernelKind::Sql,
                "main",
                demo_tables(),
            )
            .await
            .unwrap();
        assert!(out.error.is_none());
        match out.output {
            Some(ExecutionPayload::Table(frame)) => assert_eq!(frame.height(), 2),
            other => panic!("expected table output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn strips_markdown_fence_around_sql() {
        let out = PolarsSqlExecutor
            .execute(
                "```sql\nSELECT * FROM DecisionMaker\n```",
                KernelKind::Sql,
                "main",
                demo_tables(),
            )
            .await
            .unwrap();
        assert!(out.error.is_none());
        assert!(out.output.is_some());
    }

    #[tokio::test]
    async fn execution_error_is_captured_not_raised() {
        let out = PolarsSqlExecutor
            .execute(
                "SELECT nonexistent_col FROM DecisionMaker",
                KernelKind::Sql,
                "main",
                demo_tables(),
            )
            .await
            .unwrap();
        assert!(out.output.is_none());
        assert!(out.error.is_some());
    }

    #[tokio::test]
    async fn unbound_table_is_an_execution_error() {
        let out = PolarsSqlExecutor
            .execute(
                "SELECT * FROM OtherTable",
                KernelKind::Sql,
                "main",
                demo_tables(),
            )
            .await
            .unwrap();
        assert!(out.error.is_some());
    }
}
