//! Document models.
//!
//! Profiles and chat sessions share one heterogeneous container, told apart
//! by the `type` discriminator. [`Document`] is the tagged-union read path:
//! a stored body decodes into exactly one variant or is treated as absent.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum characters of the first message used for a session title.
const TITLE_MAX_CHARS: usize = 30;

/// Current UTC time as an RFC 3339 string, the wire format for all
/// document timestamps.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Deterministic document id for a user's profile.
pub fn profile_doc_id(user_id: &str) -> String {
    format!("profile_{}", user_id)
}

/// Derive a session title from the first user message.
pub fn chat_title(first_message: &str) -> String {
    let mut title: String = first_message.chars().take(TITLE_MAX_CHARS).collect();
    title.push_str("...");
    title
}

/// A single message in a chat session. Immutable once appended; vector
/// order is conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "user" or "ai".
    pub role: String,
    /// Message text.
    pub text: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// A persisted conversation owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Client-supplied session id.
    pub id: String,
    /// Owning user id (partition key).
    pub user_id: String,
    /// Title derived from the first message.
    pub title: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Ordered conversation messages.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create an empty session titled from the first user message.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, first_message: &str) -> Self {
        let now = now_rfc3339();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: chat_title(first_message),
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// Append one user/ai exchange sharing a timestamp and bump
    /// the last-update time.
    pub fn append_turn(&mut self, user_text: &str, ai_text: &str) {
        let ts = now_rfc3339();
        self.messages.push(ChatMessage {
            role: "user".to_string(),
            text: user_text.to_string(),
            timestamp: ts.clone(),
        });
        self.messages.push(ChatMessage {
            role: "ai".to_string(),
            text: ai_text.to_string(),
            timestamp: ts.clone(),
        });
        self.updated_at = ts;
    }
}

/// Personal details stored inside a profile document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
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
    /// Preferred platform language code, e.g. "es".
    #[serde(default)]
    pub platform_lang: String,
}

/// Notification preferences, channel name to enabled flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub notifications: BTreeMap<String, bool>,
}

/// Subscription state for one topic and its nested sub-topics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscription {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subs: BTreeMap<String, bool>,
}

/// A user's profile document, created on first login and fully
/// overwritten on every profile save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Deterministic id, `profile_<user id>`.
    pub id: String,
    /// Owning user id (partition key).
    pub user_id: String,
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub topics: BTreeMap<String, TopicSubscription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserProfile {
    /// Build the clean default profile created on first login.
    pub fn initial(user_id: &str, name: &str, email: &str) -> Self {
        let topic = |enabled: bool, subs: &[(&str, bool)]| TopicSubscription {
            enabled,
            subs: subs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        };

        let mut topics = BTreeMap::new();
        topics.insert(
            "events".to_string(),
            topic(true, &[("cultural", true), ("sports", false), ("arts", false)]),
        );
        topics.insert(
            "services".to_string(),
            topic(true, &[("water", true), ("light", true), ("potholes", false)]),
        );
        topics.insert("institutions".to_string(), topic(false, &[]));
        topics.insert("procedures".to_string(), topic(true, &[]));
        topics.insert("community".to_string(), topic(false, &[]));
        topics.insert("civic".to_string(), topic(false, &[]));

        let mut notifications = BTreeMap::new();
        notifications.insert("email".to_string(), true);
        notifications.insert("sms".to_string(), false);

        Self {
            id: profile_doc_id(user_id),
            user_id: user_id.to_string(),
            personal_info: PersonalInfo {
                name: name.to_string(),
                email: email.to_string(),
                platform_lang: "es".to_string(),
                ..PersonalInfo::default()
            },
            preferences: Preferences { notifications },
            topics,
            created_at: Some(now_rfc3339()),
            updated_at: None,
        }
    }
}

/// A container document: either a profile or a chat session, distinguished
/// by the `type` field in the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Document {
    #[serde(rename = "profile")]
    Profile(UserProfile),
    #[serde(rename = "chat")]
    Chat(ChatSession),
}

impl Document {
    /// Document id.
    pub fn id(&self) -> &str {
        match self {
            Document::Profile(profile) => &profile.id,
            Document::Chat(chat) => &chat.id,
        }
    }

    /// Owning user id (partition key).
    pub fn user_id(&self) -> &str {
        match self {
            Document::Profile(profile) => &profile.user_id,
            Document::Chat(chat) => &chat.user_id,
        }
    }

    /// Value of the `type` discriminator.
    pub fn doc_type(&self) -> &'static str {
        match self {
            Document::Profile(_) => "profile",
            Document::Chat(_) => "chat",
        }
    }

    /// Timestamp used to order partition-scoped listings.
    pub fn sort_timestamp(&self) -> String {
        match self {
            Document::Chat(chat) => chat.updated_at.clone(),
            Document::Profile(profile) => profile
                .updated_at
                .clone()
                .or_else(|| profile.created_at.clone())
                .unwrap_or_else(now_rfc3339),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_title_truncates() {
        let title = chat_title("What are the requirements to request a copy of my birth certificate?");
        assert_eq!(title.chars().count(), 33);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_chat_title_short_message() {
        assert_eq!(chat_title("Hola"), "Hola...");
    }

    #[test]
    fn test_append_turn_adds_pair_in_order() {
        let mut session = ChatSession::new("chat-1", "user-1", "Hola");
        session.append_turn("Hola", "¡Hola! ¿En qué puedo ayudarte?");

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, "user");
        assert_eq!(session.messages[1].role, "ai");
        assert_eq!(session.messages[0].timestamp, session.messages[1].timestamp);
    }

    #[test]
    fn test_document_tag_round_trip() {
        let doc = Document::Chat(ChatSession::new("chat-1", "user-1", "Hola"));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["userId"], "user-1");

        let decoded: Document = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.doc_type(), "chat");
    }

    #[test]
    fn test_malformed_body_fails_decode() {
        let result: std::result::Result<Document, _> =
            serde_json::from_str(r#"{"type": "chat", "id": 42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_initial_profile_defaults() {
        let profile = UserProfile::initial("user-1", "Jorge", "jorge@example.com");

        assert_eq!(profile.id, "profile_user-1");
        assert_eq!(profile.personal_info.platform_lang, "es");
        assert_eq!(profile.preferences.notifications.get("email"), Some(&true));
        assert_eq!(profile.preferences.notifications.get("sms"), Some(&false));
        assert_eq!(profile.topics.len(), 6);
        assert!(profile.topics["services"].enabled);
        assert!(!profile.topics["civic"].enabled);
    }
}
