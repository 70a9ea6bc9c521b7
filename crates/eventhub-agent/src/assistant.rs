//! Event suggestions and chat on top of an `LlmProvider`.
//!
//! Neither operation ever fails: provider errors degrade to a deterministic
//! fallback (suggestions) or a friendly explanation (chat).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eventhub_core::types::{Caller, Event, Rsvp, RsvpStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::provider::{ChatMessage, ChatRequest, LlmProvider, ProviderError, Role};

/// How many of the caller's most recent RSVPs feed the suggestion prompt.
pub const SUGGESTION_HISTORY_LIMIT: usize = 20;
/// Upper bound on upcoming events listed in the suggestion prompt.
pub const SUGGESTION_UPCOMING_LIMIT: usize = 50;
pub const CHAT_RSVP_LIMIT: usize = 10;
pub const CHAT_UPCOMING_LIMIT: usize = 20;

const FALLBACK_COUNT: usize = 5;
const CHAT_HISTORY_WINDOW: usize = 6;
const CHAT_CONTEXT_EVENTS: usize = 10;

const SUGGEST_SYSTEM: &str =
    "You are a helpful event recommendation assistant. Be friendly and concise.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub suggestions: String,
    pub events_analyzed: usize,
    pub user_history: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

pub struct Assistant {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Assistant {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Recommend upcoming events from the caller's RSVP history.
    ///
    /// `history` is the caller's recent RSVPs (newest first, events embedded);
    /// `upcoming` is approved future events, soonest first.
    pub async fn suggest(&self, history: &[Rsvp], upcoming: &[Event]) -> Suggestions {
        let req = ChatRequest {
            model: self.model.clone(),
            system: SUGGEST_SYSTEM.to_string(),
            messages: vec![ChatMessage::user(suggestion_prompt(history, upcoming))],
            max_tokens: 500,
            temperature: 0.7,
        };

        match self.provider.send(&req).await {
            Ok(resp) => {
                info!(
                    provider = self.provider.name(),
                    tokens_in = resp.tokens_in,
                    tokens_out = resp.tokens_out,
                    "suggestions generated"
                );
                let suggestions = if resp.content.trim().is_empty() {
                    "No suggestions available at this time.".to_string()
                } else {
                    resp.content
                };
                Suggestions {
                    suggestions,
                    events_analyzed: upcoming.len(),
                    user_history: history.len(),
                }
            }
            Err(e) => {
                warn!(provider = self.provider.name(), code = e.code(), error = %e, "suggestion request failed, using fallback");
                fallback_suggestions(upcoming)
            }
        }
    }

    /// Answer one chat turn. Only the last few history messages are forwarded.
    pub async fn chat(
        &self,
        caller: &Caller,
        message: &str,
        history: &[ChatMessage],
        past_rsvps: usize,
        upcoming: &[Event],
    ) -> ChatReply {
        let mut messages: Vec<ChatMessage> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        let skip = messages.len().saturating_sub(CHAT_HISTORY_WINDOW);
        messages.drain(..skip);
        messages.push(ChatMessage::user(message));

        let req = ChatRequest {
            model: self.model.clone(),
            system: chat_context(caller, past_rsvps, upcoming),
            messages,
            max_tokens: 300,
            temperature: 0.8,
        };

        let response = match self.provider.send(&req).await {
            Ok(resp) if !resp.content.trim().is_empty() => resp.content,
            Ok(_) => "I'm sorry, I couldn't process that request.".to_string(),
            Err(e) => {
                warn!(provider = self.provider.name(), code = e.code(), error = %e, "chat request failed");
                unavailable_message(&e)
            }
        };

        ChatReply {
            response,
            timestamp: Utc::now(),
        }
    }
}

fn day(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn suggestion_prompt(history: &[Rsvp], upcoming: &[Event]) -> String {
    let attended: Vec<String> = history
        .iter()
        .filter(|r| r.status == RsvpStatus::Going)
        .filter_map(|r| r.event.as_ref())
        .map(|e| format!("- {} ({}) - {}", e.title, e.location, e.description))
        .collect();
    let available: Vec<String> = upcoming
        .iter()
        .map(|e| format!("- {} at {} on {} - {}", e.title, e.location, day(&e.date), e.description))
        .collect();

    let attended = if attended.is_empty() {
        "No past events".to_string()
    } else {
        attended.join("\n")
    };
    let available = if available.is_empty() {
        "No upcoming events".to_string()
    } else {
        available.join("\n")
    };

    format!(
        "You are an event recommendation assistant. Based on the user's past event attendance, \
         suggest which upcoming events they might be interested in.\n\n\
         User's Past Events (Attended):\n{attended}\n\n\
         Available Upcoming Events:\n{available}\n\n\
         Please analyze the user's preferences and suggest 3-5 events they would most likely enjoy. \
         For each suggestion, explain why based on their history. Keep it concise and friendly."
    )
}

/// Deterministic list of the next few events, used whenever the provider fails.
pub fn fallback_suggestions(upcoming: &[Event]) -> Suggestions {
    let next: Vec<&Event> = upcoming.iter().take(FALLBACK_COUNT).collect();
    let suggestions = if next.is_empty() {
        "No upcoming events available at the moment.".to_string()
    } else {
        let lines: Vec<String> = next
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {} - {} on {}", i + 1, e.title, e.location, day(&e.date)))
            .collect();
        format!(
            "Here are {} upcoming events you might enjoy:\n\n{}",
            next.len(),
            lines.join("\n")
        )
    };
    Suggestions {
        suggestions,
        events_analyzed: next.len(),
        user_history: 0,
    }
}

fn chat_context(caller: &Caller, past_rsvps: usize, upcoming: &[Event]) -> String {
    let recent: Vec<String> = upcoming
        .iter()
        .take(CHAT_CONTEXT_EVENTS)
        .map(|e| format!("- {} at {} on {}", e.title, e.location, day(&e.date)))
        .collect();

    format!(
        "You are an AI assistant for an event management platform. Help users with:\n\
         - Finding events they might like\n\
         - Answering questions about events\n\
         - Helping with RSVPs\n\
         - General event-related queries\n\n\
         User Context:\n\
         - Email: {}\n\
         - Role: {}\n\
         - Past RSVPs: {}\n\
         - Upcoming events available: {}\n\n\
         Recent Events:\n{}\n\n\
         Be helpful, concise, and friendly. If asked about specific events, reference the available events above.",
        caller.email,
        caller.role,
        past_rsvps,
        upcoming.len(),
        recent.join("\n")
    )
}

/// User-facing explanation for a failed chat turn.
pub fn unavailable_message(err: &ProviderError) -> String {
    let detail = if err.is_auth() {
        "API authentication failed. Please check the API key configuration."
    } else if err.is_rate_limited() {
        "Too many requests. Please try again in a moment."
    } else if matches!(err, ProviderError::Connect(_)) {
        "Cannot connect to AI service. Please check your internet connection."
    } else {
        "Please try again later or contact support for assistance."
    };
    format!("I'm currently unavailable. {detail}")
}
