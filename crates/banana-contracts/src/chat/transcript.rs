use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::WELCOME_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ConversationMessage {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Append-only, creation-ordered list of conversation messages.
///
/// Message ids come from the creation time in milliseconds and are bumped
/// past the previous id so they stay strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ConversationMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_welcome() -> Self {
        let mut transcript = Self::new();
        transcript.push(Role::Assistant, WELCOME_MESSAGE, None);
        transcript
    }

    pub fn push(
        &mut self,
        role: Role,
        text: impl Into<String>,
        image: Option<String>,
    ) -> &ConversationMessage {
        let created_at = Utc::now().timestamp_millis();
        let id = self.next_id(created_at);
        self.messages.push(ConversationMessage {
            id,
            role,
            text: text.into(),
            created_at,
            image,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        self.messages.as_slice()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn last_by_role(&self, role: Role) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| message.role == role)
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role == role)
            .count()
    }

    fn next_id(&self, created_at: i64) -> u64 {
        let candidate = created_at.max(0) as u64;
        match self.messages.last() {
            Some(last) if last.id >= candidate => last.id + 1,
            _ => candidate,
        }
    }
}
