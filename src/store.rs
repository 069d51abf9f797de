//! Persistence seams.
//!
//! Two external collaborators live behind traits here: the conversation
//! store (an append-only record log keyed by topic) and the settings store
//! (a plain-string key/value bag read once at startup). Both get in-memory
//! implementations for tests and headless use; the storage engines proper
//! are out of scope.

use crate::types::{Message, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// One archived message row, keyed by the topic it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub topic_id: String,
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Build a record from an archived message.
    pub fn new(topic_id: impl Into<String>, message: &Message) -> Self {
        Self {
            topic_id: topic_id.into(),
            id: message.id.clone(),
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

/// Append-only conversation history.
///
/// Writes are fire-and-forget from the core's perspective: the controller
/// spawns them and does not await acknowledgement before continuing.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one message row.
    async fn add_conversation(&self, record: ConversationRecord);
}

/// In-memory conversation store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: Mutex<Vec<ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub fn records(&self) -> Vec<ConversationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn add_conversation(&self, record: ConversationRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

/// Keys of the persisted local configuration.
pub mod settings_keys {
    pub const THEME: &str = "light_gpt_theme";
    pub const USER_AVATAR: &str = "light_gpt_user_avatar";
    pub const ROBOT_AVATAR: &str = "light_gpt_robot_avatar";
    pub const SYSTEM_ROLE: &str = "light_gpt_system_role";
    pub const API_KEY: &str = "light_gpt_api_key";
}

/// Plain-string local configuration store.
///
/// Read once at startup, written only on explicit user save actions.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

/// Typed snapshot of the persisted settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub theme: String,
    pub user_avatar: String,
    pub robot_avatar: String,
    /// System role text; empty means the stock default is used at context
    /// build time.
    pub system_role: String,
    /// API credential; absent until the user configures one.
    pub api_key: Option<SecretString>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            user_avatar: "/fox.png".to_string(),
            robot_avatar: "/robot.png".to_string(),
            system_role: String::new(),
            api_key: None,
        }
    }
}

impl ClientSettings {
    /// Load the persisted settings, falling back to defaults per key.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            theme: store.get(settings_keys::THEME).unwrap_or(defaults.theme),
            user_avatar: store
                .get(settings_keys::USER_AVATAR)
                .unwrap_or(defaults.user_avatar),
            robot_avatar: store
                .get(settings_keys::ROBOT_AVATAR)
                .unwrap_or(defaults.robot_avatar),
            system_role: store
                .get(settings_keys::SYSTEM_ROLE)
                .unwrap_or(defaults.system_role),
            api_key: store
                .get(settings_keys::API_KEY)
                .filter(|key| !key.is_empty())
                .map(SecretString::from),
        }
    }

    /// Persist every setting (explicit user save).
    pub fn save(&self, store: &dyn SettingsStore) {
        store.set(settings_keys::THEME, &self.theme);
        store.set(settings_keys::USER_AVATAR, &self.user_avatar);
        store.set(settings_keys::ROBOT_AVATAR, &self.robot_avatar);
        store.set(settings_keys::SYSTEM_ROLE, &self.system_role);
        if let Some(api_key) = &self.api_key {
            store.set(settings_keys::API_KEY, api_key.expose_secret());
        }
    }
}
