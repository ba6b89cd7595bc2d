//! Insight adapter over a generative model
//!
//! Three request-scoped operations: generate insights from a set of
//! expenses, categorize one expense description, and answer a free-text
//! question. Each one builds a prompt, makes one model call and parses the
//! reply. The public operations never fail; each has a `try_*` twin that
//! reports why it could not produce a value.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::{parsing, AIBackend, AIClient};
use crate::models::{AIInsight, Category, ExpenseRecord, ExpenseSummary, InsightKind};
use crate::prompts::{PromptId, PromptLibrary, RenderedPrompt};

pub const FALLBACK_INSIGHT_TITLE: &str = "Insights Unavailable";
pub const FALLBACK_INSIGHT_MESSAGE: &str =
    "Unable to generate insights at the moment. Please try again later.";
pub const FALLBACK_INSIGHT_CONFIDENCE: f64 = 0.5;

pub const FALLBACK_ANSWER: &str = "I'm unable to provide a detailed answer at the moment. Please try refreshing the insights or check your connection.";

const DEFAULT_TITLE: &str = "Financial Insight";
const DEFAULT_MESSAGE: &str = "No message provided";
const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Why an insight operation fell back
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("generative service call failed: {0}")]
    RemoteCallFailure(#[source] crate::Error),

    #[error("response has no usable structure: {0}")]
    UnparsableResponse(String),

    #[error("category not in allowed set: {0}")]
    InvalidLabel(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("prompt unavailable: {0}")]
    Prompt(String),
}

/// Builds prompts, calls the model and parses replies
#[derive(Clone)]
pub struct InsightAdapter {
    client: AIClient,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl InsightAdapter {
    /// Adapter using the default prompt library (embedded plus overrides)
    pub fn new(client: AIClient) -> Self {
        Self::with_prompts(client, PromptLibrary::new())
    }

    /// Adapter with a specific prompt library
    pub fn with_prompts(client: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            client,
            prompts: Arc::new(RwLock::new(prompts)),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    /// Generate 3-5 insights about `expenses`; a single fallback insight on
    /// any failure
    pub async fn generate_insights(&self, expenses: &[ExpenseRecord]) -> Vec<AIInsight> {
        match self.try_generate_insights(expenses).await {
            Ok(insights) => insights,
            Err(e) => {
                warn!(error = %e, "Insight generation failed, using fallback");
                vec![fallback_insight()]
            }
        }
    }

    pub async fn try_generate_insights(
        &self,
        expenses: &[ExpenseRecord],
    ) -> Result<Vec<AIInsight>, InsightError> {
        let summary = summarize_expenses(expenses);
        let prompt = self.render(PromptId::GenerateInsights, &[("expenses", summary.as_str())])?;

        let response = self.call(&prompt).await?;
        let items = parsing::parse_insight_values(&response)
            .map_err(|e| InsightError::UnparsableResponse(e.to_string()))?;

        debug!(count = items.len(), "Parsed insights");
        Ok(items.iter().map(insight_from_value).collect())
    }

    /// Categorize a description; `Other` on any failure
    pub async fn categorize_expense(&self, description: &str) -> Category {
        match self.try_categorize_expense(description).await {
            Ok(category) => category,
            Err(e) => {
                warn!(error = %e, "Categorization failed, using Other");
                Category::Other
            }
        }
    }

    pub async fn try_categorize_expense(&self, description: &str) -> Result<Category, InsightError> {
        let categories = Category::label_list();
        let prompt = self.render(
            PromptId::CategorizeExpense,
            &[("categories", categories.as_str()), ("description", description)],
        )?;

        let response = self.call(&prompt).await?;
        parsing::parse_category(&response)
            .map_err(|_| InsightError::InvalidLabel(response.trim().to_string()))
    }

    /// Answer a question about `expenses`; a fixed sentence on any failure
    pub async fn generate_answer(&self, question: &str, expenses: &[ExpenseRecord]) -> String {
        match self.try_generate_answer(question, expenses).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer generation failed, using fallback");
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    pub async fn try_generate_answer(
        &self,
        question: &str,
        expenses: &[ExpenseRecord],
    ) -> Result<String, InsightError> {
        let summary = summarize_expenses(expenses);
        let prompt = self.render(
            PromptId::AnswerQuestion,
            &[("question", question), ("expenses", summary.as_str())],
        )?;

        let response = self.call(&prompt).await?;
        let answer = response.trim();
        if answer.is_empty() {
            return Err(InsightError::EmptyResponse);
        }
        Ok(answer.to_string())
    }

    /// Whether the underlying model is reachable
    pub async fn health_check(&self) -> bool {
        self.client.health_check().await
    }

    fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<RenderedPrompt, InsightError> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| InsightError::Prompt("prompt library lock poisoned".into()))?;
        let prompt = prompts
            .get(id)
            .map_err(|e| InsightError::Prompt(e.to_string()))?;
        Ok(prompt.render(vars))
    }

    async fn call(&self, prompt: &RenderedPrompt) -> Result<String, InsightError> {
        self.client
            .generate(prompt)
            .await
            .map_err(InsightError::RemoteCallFailure)
    }
}

/// Pretty-printed JSON list of the fields the model sees
fn summarize_expenses(expenses: &[ExpenseRecord]) -> String {
    let summaries: Vec<ExpenseSummary> = expenses.iter().map(ExpenseRecord::summary).collect();
    serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string())
}

fn fallback_insight() -> AIInsight {
    AIInsight {
        id: format!("fallback-{}", uuid::Uuid::new_v4()),
        kind: InsightKind::Info,
        title: FALLBACK_INSIGHT_TITLE.to_string(),
        message: FALLBACK_INSIGHT_MESSAGE.to_string(),
        action: None,
        confidence: FALLBACK_INSIGHT_CONFIDENCE,
    }
}

/// Non-empty string field, if present
fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build an insight from one array element, applying defaults
fn insight_from_value(value: &Value) -> AIInsight {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<InsightKind>().ok())
        .unwrap_or_default();

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| *c != 0.0 && c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    AIInsight {
        id: format!("insight-{}", uuid::Uuid::new_v4()),
        kind,
        title: text_field(value, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        message: text_field(value, "message").unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        action: text_field(value, "action"),
        confidence,
    }
}
