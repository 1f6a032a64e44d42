// Copyright 2025 Recall Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Message types
//!
//! A message is one conversational turn. The stored `content` may be a
//! summary or truncation of the original text; `token_count` always
//! reflects what is actually stored, never the original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message, assigned at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Estimate the token footprint of a piece of text.
///
/// Fixed heuristic: one token per four characters, rounded up. Every
/// token figure in the system comes from this function so that stored
/// counts and budget arithmetic agree.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars.div_ceil(4)
}

/// One conversational turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default)]
    pub id: MessageId,
    /// Who authored the message
    pub role: MessageRole,
    /// Text actually retained; may be shortened from the original
    pub content: String,
    /// Set only when the message was summarized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Creation time, immutable
    pub timestamp: DateTime<Utc>,
    /// Token estimate of `content`
    #[serde(default)]
    pub token_count: u32,
    /// Whether `content` is a shortened form of the original text
    #[serde(default)]
    pub is_summarized: bool,
}

impl Message {
    /// Create a new message, stamping id, timestamp, and token count
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        let content = content.into();
        let token_count = estimate_tokens(&content);
        Self {
            id: MessageId::new(),
            role,
            content,
            summary: None,
            timestamp: Utc::now(),
            token_count,
            is_summarized: false,
        }
    }

    /// Replace the stored content, keeping `token_count` in sync
    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.token_count = estimate_tokens(&self.content);
    }

    /// Character length of the stored content
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
