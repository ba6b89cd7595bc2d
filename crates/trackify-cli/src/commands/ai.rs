//! AI command implementations
//!
//! Insights, categorization and questions go through `InsightAdapter`, so a
//! failing backend still produces the fallback output instead of an error.

use anyhow::{bail, Context, Result};
use trackify_core::prompts::default_prompts_dir;
use trackify_core::{
    AIBackend, AIClient, Database, InsightAdapter, InsightKind, PromptId, PromptLibrary,
    PromptSource, UserId,
};

/// Build an insight adapter from environment variables, if a backend is configured
pub fn insight_adapter() -> Option<InsightAdapter> {
    AIClient::from_env().map(InsightAdapter::new)
}

/// Like `insight_adapter`, but fail with setup hints when nothing is configured
pub fn require_insight_adapter() -> Result<InsightAdapter> {
    match insight_adapter() {
        Some(adapter) => Ok(adapter),
        None => bail!(
            "AI backend not configured. Set GEMINI_API_KEY, or AI_BACKEND=ollama / \
             AI_BACKEND=openai_compatible with the matching host variables."
        ),
    }
}

fn kind_icon(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Warning => "⚠️ ",
        InsightKind::Info => "ℹ️ ",
        InsightKind::Success => "✅",
        InsightKind::Tip => "💡",
    }
}

pub async fn cmd_insights(
    db: &Database,
    user: &UserId,
    insights: &InsightAdapter,
    json: bool,
) -> Result<()> {
    let records = db.list_records_for_user(user)?;
    let generated = insights.generate_insights(&records).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&generated)?);
        return Ok(());
    }

    println!(
        "🔍 Insights for {} ({} records, model: {})",
        user,
        records.len(),
        insights.client().model()
    );
    println!();

    for insight in &generated {
        println!(
            "{} {} ({:.0}% confidence)",
            kind_icon(insight.kind),
            insight.title,
            insight.confidence * 100.0
        );
        println!("   {}", insight.message);
        if let Some(ref action) = insight.action {
            println!("   → {}", action);
        }
        println!();
    }

    Ok(())
}

pub async fn cmd_categorize(insights: &InsightAdapter, description: &str) -> Result<()> {
    let category = insights.categorize_expense(description).await;
    println!("{}", category);
    Ok(())
}

pub async fn cmd_ask(
    db: &Database,
    user: &UserId,
    insights: &InsightAdapter,
    question: &str,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let records = db.list_records_for_user(user)?;
    let answer = insights.generate_answer(question, &records).await;
    println!("{}", answer);
    Ok(())
}

pub async fn cmd_ai_health() -> Result<()> {
    let Some(client) = AIClient::from_env() else {
        println!("ℹ️  AI backend not configured");
        println!("   Set GEMINI_API_KEY (default backend) or AI_BACKEND to choose another.");
        return Ok(());
    };

    println!("Backend: {}", client.kind());
    println!("Host:    {}", client.host());
    println!("Model:   {}", client.model());

    if client.health_check().await {
        println!("✅ Backend is reachable");
    } else {
        println!("❌ Backend is not responding");
    }

    Ok(())
}

/// List all available prompts and their override status
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("Available Prompts:\n");
    println!(
        "{:<25} {:>7}  {:<20}  {}",
        "ID", "VERSION", "TASK TYPE", "OVERRIDE"
    );
    println!("{}", "-".repeat(70));

    for info in library.list() {
        let override_status = match info.override_path {
            Some(ref path) => format!("✓ {}", path.display()),
            None => "Default".to_string(),
        };
        println!(
            "{:<25} {:>7}  {:<20}  {}",
            info.id.as_str(),
            info.version,
            info.task_type,
            override_status
        );
    }

    println!();
    println!(
        "Override directory: {}",
        default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );
    println!("Copy a prompt there as <id>.md and edit it; restart the server to pick it up.");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let id: PromptId = prompt_id.parse().with_context(|| {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        format!("Available prompts: {}", known.join(", "))
    })?;

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!(
        "Prompt: {} (v{}, {})",
        prompt.metadata.id, prompt.metadata.version, prompt.metadata.task_type
    );
    match prompt.source {
        PromptSource::Embedded => println!("Source: Default"),
        PromptSource::Override(ref path) => println!("Source: Override ({})", path.display()),
    }

    if let Some(ref system) = prompt.system {
        println!();
        println!("--- System ---");
        println!("{}", system);
    }
    println!();
    println!("--- User ---");
    println!("{}", prompt.user);

    Ok(())
}
