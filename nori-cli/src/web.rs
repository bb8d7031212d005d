//! HTTP front end.
//!
//! `POST /chat` takes `{"message": "..."}` and answers `{"messages": [...]}`,
//! one entry per chat bubble. Slash commands work the same as in the REPL.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nori_memory::constants::PROFILE_EMPTY_SENTINEL;
use nori_memory::llm::LLMProvider;
use nori_memory::session::{Session, SessionError};
use nori_memory::storage::DocumentBackend;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::commands::{Command, HELP_TEXT, NEW_CONVERSATION_TEXT, RESET_TEXT};

/// Shown by `/profile` before anything has been learned.
pub const EMPTY_PROFILE_TEXT: &str = "No profile information yet.";

/// Shared handler state.
pub struct WebState<L: LLMProvider, S: DocumentBackend> {
    session: Session<L, S>,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    messages: Vec<String>,
}

impl ChatResponse {
    fn new(messages: impl IntoIterator<Item = impl Into<String>>) -> Json<Self> {
        Json(Self {
            messages: messages.into_iter().map(Into::into).collect(),
        })
    }
}

/// Build the router for one shared user.
pub fn router<L, S>(session: Session<L, S>, user_id: impl Into<String>) -> Router
where
    L: LLMProvider + 'static,
    S: DocumentBackend + 'static,
{
    let state = Arc::new(WebState {
        session,
        user_id: user_id.into(),
    });

    Router::new()
        .route("/chat", post(chat::<L, S>))
        .route("/profile", get(profile::<L, S>))
        .with_state(state)
}

async fn chat<L: LLMProvider, S: DocumentBackend>(
    State(state): State<Arc<WebState<L, S>>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let message = request.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No message provided");
    }

    let result = match Command::parse(message) {
        Some(command) => run_command(&state, command, message).await,
        None => state
            .session
            .chat(&state.user_id, message)
            .await
            .map(|exchange| split_paragraphs(&exchange.reply)),
    };

    match result {
        Ok(messages) => ChatResponse::new(messages).into_response(),
        Err(e) => session_error_response(&e),
    }
}

async fn profile<L: LLMProvider, S: DocumentBackend>(
    State(state): State<Arc<WebState<L, S>>>,
) -> Response {
    match profile_lines(&state).await {
        Ok(lines) => ChatResponse::new(lines).into_response(),
        Err(e) => session_error_response(&e),
    }
}

async fn run_command<L: LLMProvider, S: DocumentBackend>(
    state: &WebState<L, S>,
    command: Command,
    input: &str,
) -> Result<Vec<String>, SessionError> {
    let messages = match command {
        Command::Profile => return profile_lines(state).await,
        Command::NewConversation => {
            state.session.new_conversation(&state.user_id).await?;
            vec![NEW_CONVERSATION_TEXT.to_string()]
        }
        Command::Reset => {
            state.session.reset(&state.user_id).await?;
            vec![RESET_TEXT.to_string()]
        }
        Command::Help => vec![HELP_TEXT.to_string()],
        // There is no session to leave over HTTP.
        Command::Quit | Command::Unknown(_) => {
            vec![Command::unknown_text(input), HELP_TEXT.to_string()]
        }
    };
    Ok(messages)
}

async fn profile_lines<L: LLMProvider, S: DocumentBackend>(
    state: &WebState<L, S>,
) -> Result<Vec<String>, SessionError> {
    let text = state.session.profile_text(&state.user_id).await?;
    if text == PROFILE_EMPTY_SENTINEL {
        return Ok(vec![EMPTY_PROFILE_TEXT.to_string()]);
    }
    Ok(text.lines().map(str::to_string).collect())
}

/// Split a reply into paragraphs, one per chat bubble.
pub fn split_paragraphs(reply: &str) -> Vec<String> {
    reply
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn session_error_response(error: &SessionError) -> Response {
    let status = match error {
        SessionError::EmptyMessage => StatusCode::BAD_REQUEST,
        SessionError::MessageTooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        SessionError::Provider(_) => StatusCode::BAD_GATEWAY,
        SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %error, status = status.as_u16(), "chat request failed");
    error_response(status, &error.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
