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

//! Conversation document
//!
//! The single persisted aggregate: ordered message history (oldest
//! first), session context, and a running token total that must equal
//! the sum of per-message counts whenever the document is saved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::SessionContext;
use crate::message::Message;

/// The whole conversation as persisted by the storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDocument {
    /// Messages in insertion order, oldest first
    pub messages: Vec<Message>,
    /// Ambient session context
    pub context: SessionContext,
    /// Sum of `token_count` over `messages`
    #[serde(default)]
    pub total_tokens: u64,
    /// Timestamp of the last write
    pub last_updated: DateTime<Utc>,
}

impl ConversationDocument {
    /// Empty history with a fresh default context
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            context: SessionContext::with_defaults(),
            total_tokens: 0,
            last_updated: Utc::now(),
        }
    }

    /// Sum of per-message token counts
    pub fn computed_tokens(&self) -> u64 {
        self.messages.iter().map(|m| u64::from(m.token_count)).sum()
    }

    /// Reconcile `total_tokens` with the messages actually stored
    pub fn recompute_total_tokens(&mut self) {
        self.total_tokens = self.computed_tokens();
    }

    /// Stamp the last-write time
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

impl Default for ConversationDocument {
    fn default() -> Self {
        Self::empty()
    }
}
