//! Chat route: moderation, response generation, and session persistence.
//!
//! Control flow for `POST /chat`: keyword filter, safety classifier, model
//! judge (each short-circuiting on a flag), then generation, then an
//! append-and-upsert against the stored session. Every external failure
//! past moderation degrades to a normal response; the caller always gets an
//! answer.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use chat_model::ChatModelError;
use docstore::{documents, ChatSession, Document, ReadOutcome, Store, UserProfile};
use moderation::{Verdict, SEVERITY_GENERIC};

use crate::auth::{current_user, require_user};
use crate::error::ApiError;
use crate::profile::load_profile;
use crate::state::AppState;

/// Default locale when neither the request nor the profile carries one.
const DEFAULT_LANG: &str = "es";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
}

#[derive(Debug, Serialize)]
struct ModerationReply {
    moderation_flagged: bool,
    ai_response: String,
    severity: u8,
    original_message: String,
}

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("empty message".to_string()));
    }

    let user = current_user(&session).await?;
    let profile = match &user {
        Some(user) => load_profile(&state, &user.oid).await,
        None => None,
    };
    let lang = resolve_lang(request.lang.as_deref(), profile.as_ref());

    let verdict = state.moderation.check(&message).await;
    if verdict.flagged {
        info!(severity = verdict.severity, reason = %verdict.reason, "Message blocked");
        return Ok(moderation_reply(&lang, &verdict, &message));
    }

    let system_prompt = build_system_prompt(&lang, profile.as_ref());
    let ai_response = match state.chat_model.complete(&system_prompt, &message).await {
        Ok(text) => text,
        Err(ChatModelError::ContentFilter) => {
            // The provider's own filter is a moderation outcome, not an error.
            let verdict = Verdict::flagged(SEVERITY_GENERIC, "Blocked by provider content filter");
            info!(reason = %verdict.reason, "Message blocked");
            return Ok(moderation_reply(&lang, &verdict, &message));
        }
        Err(err) => {
            warn!(error = %err, "Generation failed, returning fallback");
            fallback_message(&lang).to_string()
        }
    };

    if let (Some(user), Some(chat_id)) = (&user, request.chat_id.as_deref()) {
        if let Err(err) =
            persist_turn(&state.store, &user.oid, chat_id, &message, &ai_response).await
        {
            warn!(chat_id, error = %err, "Failed to persist chat turn");
        }
    }

    Ok(Json(ChatReply { response: ai_response }).into_response())
}

/// `GET /api/chats` - the caller's sessions, most recent first.
pub async fn list_chats(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let user = require_user(&session).await?;
    let chats = documents::list_chats(state.store.pool(), &user.oid).await?;
    Ok(Json(chats))
}

/// `DELETE /api/chats` - remove every session the caller owns.
pub async fn delete_all_chats(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&session).await?;
    let removed = documents::delete_all_chats(state.store.pool(), &user.oid).await?;
    info!(oid = %user.oid, removed, "Deleted all chats");
    Ok(Json(json!({ "status": "success" })))
}

/// `DELETE /api/chats/{id}` - point delete in the caller's partition.
pub async fn delete_chat(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Path(chat_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&session).await?;
    documents::delete_document(state.store.pool(), &user.oid, &chat_id).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// Load-or-create the session, append the exchange, write it back.
///
/// Not found, a transient read failure, and a non-chat document under the id
/// all fall back to a fresh session titled from the message; only the
/// transient case is logged as a failure.
pub async fn persist_turn(
    store: &Store,
    user_id: &str,
    chat_id: &str,
    user_text: &str,
    ai_text: &str,
) -> docstore::Result<()> {
    let mut chat = match documents::read_document(store.pool(), user_id, chat_id).await {
        Ok(ReadOutcome::Found(Document::Chat(chat))) => chat,
        Ok(ReadOutcome::Found(_)) => {
            warn!(chat_id, "Non-chat document under session id, starting fresh");
            ChatSession::new(chat_id, user_id, user_text)
        }
        Ok(ReadOutcome::NotFound) => ChatSession::new(chat_id, user_id, user_text),
        Err(err) => {
            warn!(chat_id, error = %err, "Session read failed, starting fresh");
            ChatSession::new(chat_id, user_id, user_text)
        }
    };

    chat.append_turn(user_text, ai_text);
    documents::upsert_document(store.pool(), &Document::Chat(chat)).await
}

/// Resolve the output locale: request, then stored profile, then default.
pub fn resolve_lang(request_lang: Option<&str>, profile: Option<&UserProfile>) -> String {
    if let Some(lang) = request_lang {
        if !lang.trim().is_empty() {
            return lang.trim().to_string();
        }
    }

    if let Some(profile) = profile {
        let stored = profile.personal_info.platform_lang.trim();
        if !stored.is_empty() {
            return stored.to_string();
        }
    }

    DEFAULT_LANG.to_string()
}

/// System prompt for one turn. Each turn is independently contextualized
/// from the stored profile; prior turns are not replayed.
fn build_system_prompt(lang: &str, profile: Option<&UserProfile>) -> String {
    let now = Utc::now().format("%Y-%m-%d %H:%M UTC");

    let user_context = match profile {
        Some(profile) => {
            let info = &profile.personal_info;
            format!(
                "Signed-in resident: {} ({}, {}). Preferred language: {}.",
                if info.name.is_empty() { "unknown" } else { &info.name },
                if info.country.is_empty() { "country unknown" } else { &info.country },
                if info.state.is_empty() { "state unknown" } else { &info.state },
                if info.platform_lang.is_empty() { DEFAULT_LANG } else { &info.platform_lang },
            )
        }
        None => "Anonymous visitor.".to_string(),
    };

    format!(
        "You are Civic Knit, a friendly and neutral civic assistant for residents \
of Mexico City. Your scope is the government of Mexico City: procedures, \
public services, events, institutions, and civic participation.\n\
When retrieved context documents are provided with a question, prioritize \
them over your general knowledge and say when you are using them.\n\
Do not make political, racial, gender, religious, or class-based \
recommendations.\n\
Answer in {}.\n\
Current time: {}.\n\
{}",
        language_name(lang),
        now,
        user_context
    )
}

/// Blocked-message reply shown instead of a generated answer.
fn moderation_reply(lang: &str, verdict: &Verdict, original_message: &str) -> Response {
    Json(ModerationReply {
        moderation_flagged: true,
        ai_response: refusal_message(lang).to_string(),
        severity: verdict.severity,
        original_message: original_message.to_string(),
    })
    .into_response()
}

/// Human-readable language name for the prompt instruction.
fn language_name(lang: &str) -> &'static str {
    match lang {
        "en" => "English",
        "fr" => "French",
        _ => "Spanish",
    }
}

fn refusal_message(lang: &str) -> &'static str {
    match lang {
        "en" => "Your message could not be processed because it does not meet our community guidelines.",
        "fr" => "Votre message n'a pas pu être traité car il ne respecte pas nos règles de communauté.",
        _ => "Tu mensaje no pudo ser procesado porque no cumple con nuestras normas de convivencia.",
    }
}

fn fallback_message(lang: &str) -> &'static str {
    match lang {
        "en" => "I'm sorry, something went wrong while processing your message. Please try again.",
        "fr" => "Désolé, une erreur s'est produite lors du traitement de votre message. Veuillez réessayer.",
        _ => "Lo siento, ocurrió un error al procesar tu mensaje. Por favor intenta de nuevo.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::http::StatusCode;
    use chat_model::{ChatModelClient, ChatModelConfig};
    use moderation::{ModerationPipeline, SafetyClassifier};
    use tower_sessions::{MemoryStore, Session};

    async fn test_store() -> Store {
        let store = Store::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn test_state(store: Store) -> AppState {
        // Model endpoint that refuses connections immediately; the flagged
        // and invalid-input paths must resolve before any model call.
        let config = ChatModelConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            ..ChatModelConfig::default()
        };
        let chat_model = Arc::new(ChatModelClient::new(config).unwrap());
        let moderation = Arc::new(ModerationPipeline::new(
            SafetyClassifier::new(None),
            chat_model.clone(),
        ));

        AppState {
            store,
            chat_model,
            moderation,
            auth: None,
            speech: None,
            http: reqwest::Client::new(),
        }
    }

    fn anonymous_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_flagged_message_returns_moderation_shape() {
        let state = test_state(test_store().await);

        let response = chat(
            State(state),
            anonymous_session(),
            Json(ChatRequest {
                message: "I hate bureaucrats".to_string(),
                chat_id: None,
                lang: Some("en".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["moderation_flagged"], true);
        assert_eq!(body["severity"], 1);
        assert_eq!(body["original_message"], "I hate bureaucrats");
        assert_eq!(body["ai_response"], refusal_message("en"));
    }

    #[tokio::test]
    async fn test_chat_rejects_whitespace_message() {
        let state = test_state(test_store().await);

        let err = chat(
            State(state),
            anonymous_session(),
            Json(ChatRequest {
                message: "   ".to_string(),
                chat_id: None,
                lang: None,
            }),
        )
        .await
        .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_resolve_lang_request_wins() {
        let mut profile = UserProfile::initial("user-1", "Ana", "ana@example.com");
        profile.personal_info.platform_lang = "en".to_string();

        assert_eq!(resolve_lang(Some("fr"), Some(&profile)), "fr");
    }

    #[test]
    fn test_resolve_lang_falls_back_to_profile() {
        let mut profile = UserProfile::initial("user-1", "Ana", "ana@example.com");
        profile.personal_info.platform_lang = "en".to_string();

        assert_eq!(resolve_lang(None, Some(&profile)), "en");
        assert_eq!(resolve_lang(Some("  "), Some(&profile)), "en");
    }

    #[test]
    fn test_resolve_lang_default() {
        assert_eq!(resolve_lang(None, None), "es");
    }

    #[test]
    fn test_system_prompt_mentions_language_and_context() {
        let profile = UserProfile::initial("user-1", "Jorge", "jorge@example.com");
        let prompt = build_system_prompt("en", Some(&profile));

        assert!(prompt.contains("Civic Knit"));
        assert!(prompt.contains("Mexico City"));
        assert!(prompt.contains("Answer in English."));
        assert!(prompt.contains("Jorge"));
    }

    #[test]
    fn test_system_prompt_anonymous() {
        let prompt = build_system_prompt("es", None);
        assert!(prompt.contains("Anonymous visitor."));
    }

    #[tokio::test]
    async fn test_persist_turn_creates_then_appends() {
        let store = test_store().await;

        persist_turn(&store, "user-1", "chat-1", "first question", "first answer")
            .await
            .unwrap();

        let outcome = documents::read_document(store.pool(), "user-1", "chat-1")
            .await
            .unwrap();
        let ReadOutcome::Found(Document::Chat(chat)) = outcome else {
            panic!("expected stored chat");
        };
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.title, "first question...");

        persist_turn(&store, "user-1", "chat-1", "second question", "second answer")
            .await
            .unwrap();

        let outcome = documents::read_document(store.pool(), "user-1", "chat-1")
            .await
            .unwrap();
        let ReadOutcome::Found(Document::Chat(chat)) = outcome else {
            panic!("expected stored chat");
        };
        // Exactly one user/ai pair more, in append order.
        assert_eq!(chat.messages.len(), 4);
        assert_eq!(chat.messages[2].text, "second question");
        assert_eq!(chat.messages[3].role, "ai");
        assert_eq!(chat.title, "first question...");
    }

    #[test]
    fn test_refusal_is_localized() {
        assert!(refusal_message("en").starts_with("Your message"));
        assert!(refusal_message("es").starts_with("Tu mensaje"));
        assert!(refusal_message("de").starts_with("Tu mensaje"));
    }
}
