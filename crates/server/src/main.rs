//! Civic Knit server binary: wiring, router, and startup.

mod auth;
mod chat;
mod error;
mod profile;
mod speech;
mod state;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::{info, warn};

use chat_model::ChatModelClient;
use docstore::Store;
use moderation::{ModerationPipeline, SafetyClassifier};

use crate::auth::AuthConfig;
use crate::speech::SpeechConfig;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let addr = env::var("CIVIC_KNIT_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let db_url =
        env::var("CIVIC_KNIT_DB_URL").unwrap_or_else(|_| "sqlite:civic-knit.db?mode=rwc".to_string());

    let store = Store::connect(&db_url)
        .await
        .expect("Failed to connect to document store");
    store.migrate().await.expect("Failed to run store migration");

    let chat_model = Arc::new(
        ChatModelClient::from_env().expect("Chat model configuration is required"),
    );
    let moderation = Arc::new(ModerationPipeline::new(
        SafetyClassifier::from_env(),
        chat_model.clone(),
    ));

    let auth = AuthConfig::from_env().map(Arc::new);
    if auth.is_none() {
        warn!("Identity provider not configured; login is disabled");
    }

    let speech = SpeechConfig::from_env();
    if speech.is_none() {
        info!("Speech service not configured; speech-token proxy is disabled");
    }

    let state = AppState {
        store,
        chat_model,
        moderation,
        auth,
        speech,
        http: reqwest::Client::new(),
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat::chat))
        .route(
            "/api/chats",
            get(chat::list_chats).delete(chat::delete_all_chats),
        )
        .route("/api/chats/:id", axum::routing::delete(chat::delete_chat))
        .route("/api/me", get(profile::me))
        .route("/api/save-profile", post(profile::save_profile))
        .route("/api/delete-account", post(profile::delete_account))
        .route("/api/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/api/logout", get(auth::logout))
        .route("/api/speech-token", get(speech::speech_token))
        .layer(session_layer)
        .with_state(state);

    let addr: SocketAddr = addr.parse().expect("Invalid CIVIC_KNIT_ADDR");
    info!(%addr, "Civic Knit listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}
