//! Root page and layout shell
//!
//! `GET /` renders the site layout around one of two bodies: a guest welcome
//! when no identity was resolved, or the signed-in home view.

use std::sync::Arc;

use axum::{extract::State, response::Html, Extension};
use chrono::{Datelike, Utc};
use maud::{html, Markup, DOCTYPE};

use crate::{AppState, CurrentUser};
use trackify_core::{compute_user_stats, StatsOutcome, UserId};

pub const SITE_TITLE: &str = "Trackify AI - Smart Financial Management";

const SITE_DESCRIPTION: &str = "AI-powered expense tracking app with intelligent insights, \
    smart categorization, and personalized financial recommendations";

const CARD_STYLE: &str = "rounded-lg bg-white dark:bg-gray-800 p-6 shadow";

/// GET / - Layout with the guest or home view
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Html<String> {
    let body = match current.user {
        Some(ref user) => {
            let outcome = compute_user_stats(Some(user), &state.db);
            home(user, &outcome)
        }
        None => guest(),
    };

    Html(layout(current.user.as_ref(), &body).into_string())
}

/// Full page: head, navbar, content, footer
pub fn layout(user: Option<&UserId>, content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="description" content=(SITE_DESCRIPTION);
                title { (SITE_TITLE) }
                link href="/static/main.css" rel="stylesheet";
            }
            body class="antialiased bg-gray-100 dark:bg-gray-900 text-gray-800 dark:text-gray-200" {
                (navbar(user))
                main class="container mx-auto px-4 py-8" {
                    (content)
                }
                (footer())
            }
        }
    }
}

fn navbar(user: Option<&UserId>) -> Markup {
    html! {
        nav class="bg-white dark:bg-gray-800 shadow" {
            div class="container mx-auto flex items-center justify-between px-4 py-3" {
                a href="/" class="text-xl font-bold" { "Trackify AI" }
                div class="flex items-center gap-4 text-sm" {
                    @if let Some(user) = user {
                        span class="text-gray-600 dark:text-gray-300" { (user.as_str()) }
                    } @else {
                        span { "Sign in through your organization's access portal" }
                    }
                }
            }
        }
    }
}

fn footer() -> Markup {
    html! {
        footer class="py-6 text-center text-sm text-gray-500" {
            "© " (Utc::now().year()) " Trackify AI. All rights reserved."
        }
    }
}

/// Welcome view for visitors without an identity
pub fn guest() -> Markup {
    html! {
        section class="text-center" {
            h1 class="text-3xl font-bold mb-4" { "Welcome to Trackify AI" }
            p class="mb-8" {
                "Track your expenses, see where your money goes and get personalized insights."
            }
            ul class="grid gap-4 md:grid-cols-3" {
                li class=(CARD_STYLE) { "Smart categorization of every expense" }
                li class=(CARD_STYLE) { "AI insights into your spending patterns" }
                li class=(CARD_STYLE) { "Ask questions about your finances" }
            }
        }
    }
}

/// Signed-in view with the dashboard numbers
pub fn home(user: &UserId, stats: &StatsOutcome) -> Markup {
    html! {
        section {
            h1 class="text-2xl font-bold mb-6" { "Welcome back, " (user.as_str()) }
            @match stats {
                StatsOutcome::Stats(stats) => {
                    div class="grid gap-4 md:grid-cols-2" {
                        div class=(CARD_STYLE) id="total-amount" {
                            h2 class="text-sm uppercase text-gray-500" { "Total spent" }
                            p class="text-3xl font-semibold" { (format!("${:.2}", stats.total_amount)) }
                        }
                        div class=(CARD_STYLE) id="days-with-records" {
                            h2 class="text-sm uppercase text-gray-500" { "Days with expenses" }
                            p class="text-3xl font-semibold" { (stats.days_with_records) }
                        }
                    }
                }
                StatsOutcome::Error { error } => {
                    p class="text-red-600" role="alert" { (error.to_string()) }
                }
            }
        }
    }
}
