//! Profile routes: frontend context, profile save, account deletion.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use docstore::{
    documents, now_rfc3339, profile_doc_id, Document, PersonalInfo, Preferences, ReadOutcome,
    TopicSubscription, UserProfile,
};

use crate::auth::{current_user, require_user, UserClaims};
use crate::error::ApiError;
use crate::state::AppState;

/// Profile-save body: the flat form the frontend submits.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub platform_lang: String,
    /// Notification channels, channel name to enabled flag.
    #[serde(default)]
    pub channels: BTreeMap<String, bool>,
    #[serde(default)]
    pub topics: BTreeMap<String, TopicSubscription>,
}

/// Read the caller's profile document, if present and well-formed.
///
/// Store failures are logged and treated as "no profile"; the chat flow
/// must not fail because the profile read did.
pub async fn load_profile(state: &AppState, user_id: &str) -> Option<UserProfile> {
    let id = profile_doc_id(user_id);
    match documents::read_document(state.store.pool(), user_id, &id).await {
        Ok(ReadOutcome::Found(Document::Profile(profile))) => Some(profile),
        Ok(ReadOutcome::Found(_)) | Ok(ReadOutcome::NotFound) => None,
        Err(err) => {
            warn!(user_id, error = %err, "Profile read failed");
            None
        }
    }
}

/// `GET /api/me` - session user merged with the stored profile, the data
/// contract behind the frontend shell.
pub async fn me(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(user) = current_user(&session).await? else {
        return Ok(Json(json!({ "user": null })));
    };

    let profile = load_profile(&state, &user.oid).await;
    Ok(Json(user_context(&user, profile.as_ref())))
}

/// `POST /api/save-profile` - wholesale overwrite of the profile document.
pub async fn save_profile(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Json(request): Json<SaveProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&session).await?;

    let profile = profile_from_request(&user.oid, request);
    documents::upsert_document(state.store.pool(), &Document::Profile(profile)).await?;

    Ok(Json(json!({ "status": "success" })))
}

/// `POST /api/delete-account` - cascade delete of the user's partition,
/// then clear the server-side session.
pub async fn delete_account(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&session).await?;

    let removed = documents::delete_all_for_user(state.store.pool(), &user.oid).await?;
    info!(oid = %user.oid, removed, "Account deleted");

    session.flush().await?;
    Ok(Json(json!({ "status": "success" })))
}

/// Build the replacement profile document from a save request.
///
/// Full overwrite, not a merge: whatever the frontend sent is the new
/// document, with a fresh `updatedAt`.
fn profile_from_request(user_id: &str, request: SaveProfileRequest) -> UserProfile {
    UserProfile {
        id: profile_doc_id(user_id),
        user_id: user_id.to_string(),
        personal_info: PersonalInfo {
            name: request.name,
            email: request.email,
            age: request.age,
            gender: request.gender,
            country: request.country,
            state: request.state,
            phone: request.phone,
            platform_lang: request.platform_lang,
        },
        preferences: Preferences {
            notifications: request.channels,
        },
        topics: request.topics,
        created_at: None,
        updated_at: Some(now_rfc3339()),
    }
}

fn user_context(user: &UserClaims, profile: Option<&UserProfile>) -> serde_json::Value {
    let mut context = json!({
        "oid": user.oid,
        "name": user.name,
        "preferredUsername": user.preferred_username,
    });

    if let Some(profile) = profile {
        context["dbProfile"] = json!(profile.personal_info);
        context["dbPreferences"] = json!(profile.preferences);
        context["dbTopics"] = json!(profile.topics);
    }

    json!({ "user": context })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_request_overwrites_wholesale() {
        let body = json!({
            "name": "Ana Smith",
            "email": "ana@demo.com",
            "age": "28",
            "gender": "female",
            "country": "MX",
            "state": "MX-CMX",
            "phone": "",
            "platformLang": "en",
            "channels": { "email": true, "sms": false },
            "topics": {
                "civic": { "enabled": true, "subs": {} }
            }
        });

        let request: SaveProfileRequest = serde_json::from_value(body).unwrap();
        let profile = profile_from_request("user-1", request);

        assert_eq!(profile.id, "profile_user-1");
        assert_eq!(profile.user_id, "user-1");
        assert_eq!(profile.personal_info.platform_lang, "en");
        assert_eq!(profile.preferences.notifications.get("email"), Some(&true));
        // Only the submitted topics survive; nothing is merged in.
        assert_eq!(profile.topics.len(), 1);
        assert!(profile.topics["civic"].enabled);
        assert!(profile.updated_at.is_some());
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_user_context_shape() {
        let user = UserClaims {
            oid: "user-1".to_string(),
            name: Some("Jorge".to_string()),
            preferred_username: Some("jorge@example.com".to_string()),
        };
        let profile = UserProfile::initial("user-1", "Jorge", "jorge@example.com");

        let context = user_context(&user, Some(&profile));
        assert_eq!(context["user"]["oid"], "user-1");
        assert_eq!(context["user"]["dbProfile"]["platformLang"], "es");
        assert_eq!(context["user"]["dbPreferences"]["notifications"]["email"], true);

        let anonymous = user_context(&user, None);
        assert!(anonymous["user"]["dbProfile"].is_null());
    }
}
