//! Mock backend for testing
//!
//! Returns scripted replies when any are queued, otherwise a predictable
//! reply chosen from the shape of the prompt. Useful for unit tests and
//! development without a Gemini API key.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::prompts::RenderedPrompt;

use super::AIBackend;

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Return this text from `generate`
    Text(String),
    /// Fail `generate` with this message
    Fail(String),
}

/// Canned insights used when nothing is queued
const CANNED_INSIGHTS: &str = r#"Here is my analysis:
```json
[
  {
    "type": "info",
    "title": "Spending overview",
    "message": "Most of your recent spending is in a small number of categories.",
    "confidence": 0.8
  },
  {
    "type": "tip",
    "title": "Set a weekly budget",
    "message": "A weekly cap makes it easier to spot overspending early.",
    "action": "Pick a weekly limit for your largest category",
    "confidence": 0.7
  },
  {
    "type": "success",
    "title": "Consistent tracking",
    "message": "You are recording expenses regularly.",
    "confidence": 0.9
  }
]
```"#;

/// Prompts kept for inspection; older ones are dropped first
const MAX_RECORDED_PROMPTS: usize = 32;

const CANNED_ANSWER: &str =
    "Your largest category accounts for most of your spending. Setting a weekly limit for it is the quickest way to save.";

/// Mock AI backend for testing
///
/// Clones share the reply queue and the record of recent prompts received.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<VecDeque<RenderedPrompt>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a backend that answers with the given replies in order
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let backend = Self::new();
        for reply in replies {
            backend.push_reply(reply);
        }
        backend
    }

    /// Create a backend whose next call fails
    pub fn failing(message: &str) -> Self {
        Self::with_replies([MockReply::Fail(message.to_string())])
    }

    /// Queue a reply for the next `generate` call
    pub fn push_reply(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// The most recent prompts received, oldest first
    pub fn prompts(&self) -> Vec<RenderedPrompt> {
        self.prompts
            .lock()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

/// Pick a reply from the prompt text when nothing is scripted
fn heuristic_reply(prompt: &str) -> String {
    if prompt.contains("Categorize this expense") {
        return categorize_mock(prompt).to_string();
    }
    if prompt.contains("JSON array") || prompt.contains("insights in JSON format") {
        return CANNED_INSIGHTS.to_string();
    }
    CANNED_ANSWER.to_string()
}

fn categorize_mock(prompt: &str) -> &'static str {
    let description = prompt
        .split("Expense description:")
        .nth(1)
        .unwrap_or(prompt)
        .to_lowercase();

    match description.as_str() {
        d if ["pizza", "lunch", "dinner", "grocer", "coffee", "restaurant"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Food"
        }
        d if ["uber", "taxi", "bus", "train", "fuel", "gas"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Transportation"
        }
        d if ["movie", "concert", "netflix", "game"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Entertainment"
        }
        d if ["shoes", "shirt", "amazon", "store"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Shopping"
        }
        d if ["rent", "electric", "water", "internet", "phone bill"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Bills"
        }
        d if ["doctor", "pharmacy", "dentist", "medicine"]
            .iter()
            .any(|k| d.contains(k)) =>
        {
            "Healthcare"
        }
        _ => "Other",
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            if prompts.len() == MAX_RECORDED_PROMPTS {
                prompts.pop_front();
            }
            prompts.push_back(prompt.clone());
        }

        match self.next_reply() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(Error::Ai(message)),
            None => Ok(heuristic_reply(&prompt.user)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
