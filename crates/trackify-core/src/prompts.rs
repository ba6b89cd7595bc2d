//! Prompt templates for the insight adapter
//!
//! Each prompt is a markdown file with YAML frontmatter and optional
//! `# System` / `# User` sections. Defaults are compiled in; a file with the
//! same name in the override directory
//! (`~/.local/share/trackify/prompts/overrides/` on Linux) replaces the
//! default without a rebuild.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

mod defaults {
    pub const GENERATE_INSIGHTS: &str = include_str!("../../../prompts/generate_insights.md");
    pub const CATEGORIZE_EXPENSE: &str = include_str!("../../../prompts/categorize_expense.md");
    pub const ANSWER_QUESTION: &str = include_str!("../../../prompts/answer_question.md");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// JSON array of 3-5 insights from an expense summary
    GenerateInsights,
    /// Single category label for an expense description
    CategorizeExpense,
    /// Short free-text answer to a user question
    AnswerQuestion,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateInsights => "generate_insights",
            Self::CategorizeExpense => "categorize_expense",
            Self::AnswerQuestion => "answer_question",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::GenerateInsights,
            Self::CategorizeExpense,
            Self::AnswerQuestion,
        ]
    }

    /// File name used for overrides
    pub fn file_name(&self) -> String {
        format!("{}.md", self.as_str())
    }

    fn embedded(&self) -> &'static str {
        match self {
            Self::GenerateInsights => defaults::GENERATE_INSIGHTS,
            Self::CategorizeExpense => defaults::CATEGORIZE_EXPENSE,
            Self::AnswerQuestion => defaults::ANSWER_QUESTION,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| Error::NotFound(format!("Unknown prompt: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Bumped whenever the wording changes
    pub version: u32,
    pub task_type: String,
}

/// Where a loaded prompt came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Embedded,
    Override(PathBuf),
}

/// A parsed prompt template
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub system: Option<String>,
    pub user: String,
    pub source: PromptSource,
}

/// A prompt ready to send to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    /// Parse a prompt file
    pub fn parse(text: &str, source: PromptSource) -> Result<Self> {
        let (frontmatter, body) = split_frontmatter(text)?;
        let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
            .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;
        let (system, user) = split_sections(body);
        Ok(Self {
            metadata,
            system,
            user,
            source,
        })
    }

    pub fn is_override(&self) -> bool {
        matches!(self.source, PromptSource::Override(_))
    }

    /// Fill `{{name}}` placeholders in both sections
    pub fn render(&self, vars: &[(&str, &str)]) -> RenderedPrompt {
        RenderedPrompt {
            system: self.system.as_deref().map(|s| fill(s, vars)),
            user: fill(&self.user, vars),
        }
    }
}

/// Loads prompts on first use and keeps them for the life of the library
pub struct PromptLibrary {
    overrides: Option<PathBuf>,
    loaded: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Library using the platform override directory
    pub fn new() -> Self {
        Self {
            overrides: default_prompts_dir(),
            loaded: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            overrides: Some(path),
            loaded: HashMap::new(),
        }
    }

    /// Library that ignores override files (tests, reproducible runs)
    pub fn embedded_only() -> Self {
        Self {
            overrides: None,
            loaded: HashMap::new(),
        }
    }

    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        match self.loaded.entry(id) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => Ok(slot.insert(load_prompt(self.overrides.as_deref(), id)?)),
        }
    }

    pub fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.overrides
            .as_ref()
            .map(|dir| dir.join(id.file_name()))
            .filter(|path| path.exists())
    }

    /// Summary of every known prompt; unreadable overrides show version 0
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let override_path = self.override_path(id);
                let (version, task_type) = match self.get(id) {
                    Ok(prompt) => (prompt.metadata.version, prompt.metadata.task_type.clone()),
                    Err(e) => {
                        tracing::warn!(prompt = id.as_str(), error = %e, "Prompt failed to load");
                        (0, String::new())
                    }
                };
                PromptInfo {
                    id,
                    version,
                    task_type,
                    override_path,
                }
            })
            .collect()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing row for `trackify prompts list`
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: PromptId,
    pub version: u32,
    pub task_type: String,
    pub override_path: Option<PathBuf>,
}

/// Platform directory searched for prompt overrides
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("trackify").join("prompts").join("overrides"))
}

fn load_prompt(overrides: Option<&Path>, id: PromptId) -> Result<Prompt> {
    if let Some(path) = overrides.map(|dir| dir.join(id.file_name())) {
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            return Prompt::parse(&text, PromptSource::Override(path));
        }
    }
    Prompt::parse(id.embedded(), PromptSource::Embedded)
}

/// Split `---\n<yaml>\n---\n<body>` into its two parts
fn split_frontmatter(text: &str) -> Result<(&str, &str)> {
    let rest = text
        .trim_start()
        .strip_prefix("---")
        .ok_or_else(|| Error::InvalidData("Prompt must start with YAML frontmatter".into()))?;
    let (frontmatter, body) = rest
        .split_once("\n---")
        .ok_or_else(|| Error::InvalidData("Prompt frontmatter is not closed".into()))?;
    Ok((frontmatter.trim(), body.trim()))
}

/// Split a body into its `# System` and `# User` sections
///
/// A body without a `# User` header is used whole as the user section.
fn split_sections(body: &str) -> (Option<String>, String) {
    #[derive(Clone, Copy)]
    enum Section {
        Preamble,
        System,
        User,
    }

    let mut section = Section::Preamble;
    let mut system: Option<Vec<&str>> = None;
    let mut user: Option<Vec<&str>> = None;

    for line in body.lines() {
        match line.trim_end() {
            "# System" => {
                section = Section::System;
                system.get_or_insert_with(Vec::new);
            }
            "# User" => {
                section = Section::User;
                user.get_or_insert_with(Vec::new);
            }
            _ => match section {
                Section::System => system.get_or_insert_with(Vec::new).push(line),
                Section::User => user.get_or_insert_with(Vec::new).push(line),
                Section::Preamble => {}
            },
        }
    }

    let join = |lines: Vec<&str>| lines.join("\n").trim().to_string();
    let system = system.map(join).filter(|s| !s.is_empty());
    let user = user.map(join).unwrap_or_else(|| body.trim().to_string());
    (system, user)
}

/// Substitute `{{name}}` tokens found in `template`; inserted values are never
/// rescanned and unknown tokens are left as written
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match vars.iter().find(|(var, _)| *var == name) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
