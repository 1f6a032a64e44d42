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

//! Conversation store
//!
//! Business-logic layer over the persistence backend. Every mutation is
//! a whole-document read-modify-write held under a single writer lock,
//! so two logically concurrent calls serialize instead of clobbering
//! each other's save. `total_tokens` is reconciled against the actual
//! messages before every save.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use recall_core::{
    estimate_tokens, ConversationDocument, Message, MessageId, MessageRole, SessionContext,
};
use recall_storage::StorageBackend;

use crate::error::{ContextError, ContextResult};
use crate::summary::summarize;

/// Version stamped into exports
const EXPORT_VERSION: &str = "1.0";

/// Partial update applied to a stored message
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    /// New content; the token count is recomputed from it
    pub content: Option<String>,
    /// New summary text
    pub summary: Option<String>,
    /// New summarized flag
    pub is_summarized: Option<bool>,
}

/// Bulk cleanup criteria; stages apply in order age → count → tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    /// Keep at most this many messages, dropping oldest first
    pub max_messages: Option<usize>,
    /// Keep the total token count at or under this, dropping oldest first
    pub max_tokens: Option<u64>,
    /// Drop messages older than this many days
    pub max_age_days: Option<i64>,
}

/// What a cleanup pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub messages_removed: usize,
    pub tokens_removed: u64,
}

/// What a summarize-existing pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarizeReport {
    pub messages_summarized: usize,
    pub tokens_saved: u64,
}

/// Aggregate statistics over the stored conversation
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub summarized_messages: usize,
    pub total_tokens: u64,
    pub avg_tokens_per_message: f64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// A portable snapshot of the whole conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub messages: Vec<Message>,
    pub context: SessionContext,
    pub metadata: ExportMetadata,
}

/// Export envelope metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_date: DateTime<Utc>,
    pub total_messages: usize,
    pub total_tokens: u64,
    pub version: String,
}

/// Storage coordinator owning the conversation document
pub struct ConversationStore {
    backend: Arc<dyn StorageBackend>,
    /// Serializes read-modify-write sequences; see module docs
    write_lock: Mutex<()>,
}

impl ConversationStore {
    /// Create a coordinator over the given backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Name of the backend in use, for logs and diagnostics
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Append a message and persist.
    ///
    /// Creates a default document (empty history, fresh context) when
    /// nothing was stored yet.
    pub async fn add_message(&self, message: Message) -> ContextResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_or_default().await?;
        doc.messages.push(message);
        self.persist(&mut doc).await
    }

    /// All messages, oldest first; empty when nothing is stored
    pub async fn get_all_messages(&self) -> ContextResult<Vec<Message>> {
        Ok(self
            .backend
            .load()
            .await?
            .map(|doc| doc.messages)
            .unwrap_or_default())
    }

    /// Messages authored by `role`
    pub async fn get_messages_by_role(&self, role: MessageRole) -> ContextResult<Vec<Message>> {
        let mut messages = self.get_all_messages().await?;
        messages.retain(|m| m.role == role);
        Ok(messages)
    }

    /// Messages with `start <= timestamp <= end`
    pub async fn get_messages_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ContextResult<Vec<Message>> {
        let mut messages = self.get_all_messages().await?;
        messages.retain(|m| m.timestamp >= start && m.timestamp <= end);
        Ok(messages)
    }

    /// Case-insensitive substring search over content and summary
    pub async fn search_messages(&self, query: &str) -> ContextResult<Vec<Message>> {
        let needle = query.to_lowercase();
        let mut messages = self.get_all_messages().await?;
        messages.retain(|m| {
            m.content.to_lowercase().contains(&needle)
                || m.summary
                    .as_ref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
        });
        Ok(messages)
    }

    /// Apply a patch to the message with the given id.
    ///
    /// Returns `false` when no such message exists; a miss is not an
    /// error.
    pub async fn update_message(&self, id: &MessageId, patch: MessagePatch) -> ContextResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut doc) = self.backend.load().await? else {
            return Ok(false);
        };
        let Some(message) = doc.messages.iter_mut().find(|m| &m.id == id) else {
            return Ok(false);
        };

        if let Some(content) = patch.content {
            message.set_content(content);
        }
        if let Some(summary) = patch.summary {
            message.summary = Some(summary);
        }
        if let Some(flag) = patch.is_summarized {
            message.is_summarized = flag;
        }

        self.persist(&mut doc).await?;
        Ok(true)
    }

    /// Remove the message with the given id.
    ///
    /// Returns `false` when no such message exists.
    pub async fn delete_message(&self, id: &MessageId) -> ContextResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut doc) = self.backend.load().await? else {
            return Ok(false);
        };
        let Some(index) = doc.messages.iter().position(|m| &m.id == id) else {
            return Ok(false);
        };

        doc.messages.remove(index);
        self.persist(&mut doc).await?;
        Ok(true)
    }

    /// Evict messages by age, count, and token budget.
    ///
    /// Stages compose: count-based eviction sees the result of age-based
    /// eviction, and token-based eviction sees both. Every stage drops
    /// oldest-first and never reorders.
    pub async fn cleanup_old_messages(&self, options: CleanupOptions) -> ContextResult<CleanupReport> {
        let _guard = self.write_lock.lock().await;
        let Some(mut doc) = self.backend.load().await? else {
            return Ok(CleanupReport::default());
        };

        let before_count = doc.messages.len();
        let before_tokens = doc.computed_tokens();

        if let Some(days) = options.max_age_days {
            let cutoff = Utc::now() - Duration::days(days);
            doc.messages.retain(|m| m.timestamp >= cutoff);
        }

        if let Some(max) = options.max_messages {
            if doc.messages.len() > max {
                let excess = doc.messages.len() - max;
                doc.messages.drain(..excess);
            }
        }

        if let Some(max_tokens) = options.max_tokens {
            let mut total = doc.computed_tokens();
            while total > max_tokens && !doc.messages.is_empty() {
                let dropped = doc.messages.remove(0);
                total -= u64::from(dropped.token_count);
            }
        }

        let report = CleanupReport {
            messages_removed: before_count - doc.messages.len(),
            tokens_removed: before_tokens - doc.computed_tokens(),
        };

        if report.messages_removed > 0 {
            debug!(
                removed = report.messages_removed,
                tokens = report.tokens_removed,
                "cleanup evicted messages"
            );
        }
        self.persist(&mut doc).await?;
        Ok(report)
    }

    /// Summarize every stored message over `threshold` characters that
    /// has not been summarized yet.
    ///
    /// Persists once at the end, and only if anything changed.
    pub async fn summarize_existing(
        &self,
        threshold: usize,
        max_length: usize,
    ) -> ContextResult<SummarizeReport> {
        let _guard = self.write_lock.lock().await;
        let Some(mut doc) = self.backend.load().await? else {
            return Ok(SummarizeReport::default());
        };

        let mut report = SummarizeReport::default();
        for message in &mut doc.messages {
            if message.is_summarized || message.char_len() <= threshold {
                continue;
            }
            let old_tokens = message.token_count;
            let shortened = summarize(&message.content, max_length);
            message.summary = Some(shortened.clone());
            message.is_summarized = true;
            message.set_content(shortened);

            report.messages_summarized += 1;
            report.tokens_saved += u64::from(old_tokens.saturating_sub(message.token_count));
        }

        if report.messages_summarized > 0 {
            debug!(
                summarized = report.messages_summarized,
                tokens_saved = report.tokens_saved,
                "summarized existing messages"
            );
            self.persist(&mut doc).await?;
        }
        Ok(report)
    }

    /// Snapshot the whole conversation for export.
    ///
    /// Fails with [`ContextError::NoConversation`] when nothing is
    /// stored.
    pub async fn export_conversation(&self) -> ContextResult<ConversationExport> {
        let doc = self
            .backend
            .load()
            .await?
            .ok_or(ContextError::NoConversation)?;

        Ok(ConversationExport {
            metadata: ExportMetadata {
                export_date: Utc::now(),
                total_messages: doc.messages.len(),
                total_tokens: doc.total_tokens,
                version: EXPORT_VERSION.to_string(),
            },
            messages: doc.messages,
            context: doc.context,
        })
    }

    /// Replace the stored conversation with imported data.
    ///
    /// Validation happens before any mutation: `messages` must be an
    /// array of well-formed messages and `context` must be present.
    /// Token counts and the running total are recomputed from scratch;
    /// incoming totals are never trusted. Returns the imported message
    /// count.
    pub async fn import_conversation(&self, data: serde_json::Value) -> ContextResult<usize> {
        let messages_value = data
            .get("messages")
            .ok_or_else(|| ContextError::InvalidImport("missing `messages`".to_string()))?;
        if !messages_value.is_array() {
            return Err(ContextError::InvalidImport(
                "`messages` must be an array".to_string(),
            ));
        }
        let context_value = data
            .get("context")
            .ok_or_else(|| ContextError::InvalidImport("missing `context`".to_string()))?;

        let mut messages: Vec<Message> = serde_json::from_value(messages_value.clone())
            .map_err(|e| ContextError::InvalidImport(format!("bad message entry: {e}")))?;
        let context: SessionContext = serde_json::from_value(context_value.clone())
            .map_err(|e| ContextError::InvalidImport(format!("bad context: {e}")))?;

        for message in &mut messages {
            message.token_count = estimate_tokens(&message.content);
        }

        let _guard = self.write_lock.lock().await;
        let mut doc = ConversationDocument {
            messages,
            context,
            total_tokens: 0,
            last_updated: Utc::now(),
        };
        self.persist(&mut doc).await?;
        Ok(doc.messages.len())
    }

    /// Aggregate statistics; zeroed when no messages exist
    pub async fn get_message_stats(&self) -> ContextResult<MessageStats> {
        let messages = self.get_all_messages().await?;
        if messages.is_empty() {
            return Ok(MessageStats::default());
        }

        let total_tokens: u64 = messages.iter().map(|m| u64::from(m.token_count)).sum();
        let stats = MessageStats {
            total_messages: messages.len(),
            user_messages: messages
                .iter()
                .filter(|m| m.role == MessageRole::User)
                .count(),
            assistant_messages: messages
                .iter()
                .filter(|m| m.role == MessageRole::Assistant)
                .count(),
            summarized_messages: messages.iter().filter(|m| m.is_summarized).count(),
            total_tokens,
            avg_tokens_per_message: total_tokens as f64 / messages.len() as f64,
            oldest: messages.first().map(|m| m.timestamp),
            newest: messages.last().map(|m| m.timestamp),
        };
        Ok(stats)
    }

    /// The stored session context, if a document exists
    pub async fn get_context(&self) -> ContextResult<Option<SessionContext>> {
        Ok(self.backend.load().await?.map(|doc| doc.context))
    }

    /// Replace the stored session context, keeping messages intact
    pub async fn save_context(&self, context: SessionContext) -> ContextResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_or_default().await?;
        doc.context = context;
        self.persist(&mut doc).await
    }

    /// Drop the stored document entirely
    pub async fn clear(&self) -> ContextResult<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.clear().await?;
        Ok(())
    }

    async fn load_or_default(&self) -> ContextResult<ConversationDocument> {
        Ok(self
            .backend
            .load()
            .await?
            .unwrap_or_else(ConversationDocument::empty))
    }

    /// Reconcile the token total, stamp the write time, save
    async fn persist(&self, doc: &mut ConversationDocument) -> ContextResult<()> {
        doc.recompute_total_tokens();
        doc.touch();
        self.backend.save(doc).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_storage::SqliteBackend;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(SqliteBackend::open_in_memory().unwrap()))
    }

    async fn seed(store: &ConversationStore, turns: &[(MessageRole, &str)]) -> Vec<MessageId> {
        let mut ids = Vec::new();
        for (role, content) in turns {
            let message = Message::new(*role, *content);
            ids.push(message.id.clone());
            store.add_message(message).await.unwrap();
        }
        ids
    }

    async fn assert_token_invariant(store: &ConversationStore) {
        let messages = store.get_all_messages().await.unwrap();
        let stats = store.get_message_stats().await.unwrap();
        let sum: u64 = messages.iter().map(|m| u64::from(m.token_count)).sum();
        assert_eq!(stats.total_tokens, sum);
    }

    #[tokio::test]
    async fn test_add_and_get_messages() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "hello"),
                (MessageRole::Assistant, "hi there"),
            ],
        )
        .await;

        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_filters_by_role() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "one"),
                (MessageRole::Assistant, "two"),
                (MessageRole::User, "three"),
            ],
        )
        .await;

        let users = store.get_messages_by_role(MessageRole::User).await.unwrap();
        assert_eq!(users.len(), 2);
        let assistants = store
            .get_messages_by_role(MessageRole::Assistant)
            .await
            .unwrap();
        assert_eq!(assistants.len(), 1);
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let store = store();
        seed(&store, &[(MessageRole::User, "recent")]).await;

        let now = Utc::now();
        let hour = Duration::hours(1);

        let hits = store
            .get_messages_by_date_range(now - hour, now + hour)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .get_messages_by_date_range(now - hour * 3, now - hour * 2)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_covers_summary() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "Tell me about Rust"),
                (MessageRole::Assistant, "a systems language"),
            ],
        )
        .await;

        assert_eq!(store.search_messages("RUST").await.unwrap().len(), 1);
        assert_eq!(store.search_messages("nothing").await.unwrap().len(), 0);

        // summaries are searched too
        let ids = seed(&store, &[(MessageRole::Assistant, "long answer")]).await;
        store
            .update_message(
                &ids[0],
                MessagePatch {
                    summary: Some("borrow checker overview".to_string()),
                    is_summarized: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.search_messages("Borrow Checker").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_message_adjusts_tokens() {
        let store = store();
        let ids = seed(&store, &[(MessageRole::User, "x".repeat(400).as_str())]).await;

        let updated = store
            .update_message(
                &ids[0],
                MessagePatch {
                    content: Some("tiny".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages[0].content, "tiny");
        assert_eq!(messages[0].token_count, 1);
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_update_or_delete_miss_returns_false() {
        let store = store();
        seed(&store, &[(MessageRole::User, "hello")]).await;

        let ghost = MessageId::new();
        assert!(!store
            .update_message(&ghost, MessagePatch::default())
            .await
            .unwrap());
        assert!(!store.delete_message(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_message() {
        let store = store();
        let ids = seed(
            &store,
            &[(MessageRole::User, "keep"), (MessageRole::User, "drop")],
        )
        .await;

        assert!(store.delete_message(&ids[1]).await.unwrap());
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "keep");
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_cleanup_by_count_keeps_newest() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "m1"),
                (MessageRole::Assistant, "m2"),
                (MessageRole::User, "m3"),
                (MessageRole::Assistant, "m4"),
                (MessageRole::User, "m5"),
            ],
        )
        .await;

        let report = store
            .cleanup_old_messages(CleanupOptions {
                max_messages: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.messages_removed, 3);
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "m4");
        assert_eq!(messages[1].content, "m5");
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_cleanup_by_tokens_drops_oldest_first() {
        let store = store();
        // 25, 25, and 5 tokens oldest to newest
        seed(
            &store,
            &[
                (MessageRole::User, "a".repeat(100).as_str()),
                (MessageRole::Assistant, "b".repeat(100).as_str()),
                (MessageRole::User, "c".repeat(20).as_str()),
            ],
        )
        .await;

        let report = store
            .cleanup_old_messages(CleanupOptions {
                max_tokens: Some(30),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.messages_removed, 1);
        assert_eq!(report.tokens_removed, 25);
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.chars().next(), Some('b'));
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_cleanup_stages_compose() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "x".repeat(100).as_str()),
                (MessageRole::User, "y".repeat(100).as_str()),
                (MessageRole::User, "z".repeat(100).as_str()),
            ],
        )
        .await;

        // Count stage trims to 2, token stage then trims to 1
        let report = store
            .cleanup_old_messages(CleanupOptions {
                max_messages: Some(2),
                max_tokens: Some(25),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.messages_removed, 2);
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.chars().next(), Some('z'));
    }

    #[tokio::test]
    async fn test_cleanup_on_empty_store() {
        let store = store();
        let report = store
            .cleanup_old_messages(CleanupOptions {
                max_messages: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_summarize_existing() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "short"),
                (MessageRole::Assistant, "long. ".repeat(100).as_str()),
            ],
        )
        .await;

        let report = store.summarize_existing(100, 50).await.unwrap();
        assert_eq!(report.messages_summarized, 1);
        assert!(report.tokens_saved > 0);

        let messages = store.get_all_messages().await.unwrap();
        assert!(!messages[0].is_summarized);
        assert!(messages[1].is_summarized);
        assert!(messages[1].content.contains("[summarized]"));
        assert_token_invariant(&store).await;

        // a second pass has nothing left to do
        let again = store.summarize_existing(100, 50).await.unwrap();
        assert_eq!(again.messages_summarized, 0);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let store = store();
        seed(
            &store,
            &[
                (MessageRole::User, "question"),
                (MessageRole::Assistant, "answer"),
            ],
        )
        .await;

        let export = store.export_conversation().await.unwrap();
        assert_eq!(export.metadata.total_messages, 2);

        let fresh = self::store();
        let data = serde_json::to_value(&export).unwrap();
        let imported = fresh.import_conversation(data).await.unwrap();
        assert_eq!(imported, 2);

        let stats = fresh.get_message_stats().await.unwrap();
        let original = store.get_message_stats().await.unwrap();
        assert_eq!(stats.total_messages, original.total_messages);
        assert_eq!(stats.total_tokens, original.total_tokens);
        assert_token_invariant(&fresh).await;
    }

    #[tokio::test]
    async fn test_export_empty_store_fails() {
        let store = store();
        assert!(matches!(
            store.export_conversation().await,
            Err(ContextError::NoConversation)
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_data() {
        let store = store();
        seed(&store, &[(MessageRole::User, "existing")]).await;

        // missing context
        let bad = serde_json::json!({ "messages": [] });
        assert!(matches!(
            store.import_conversation(bad).await,
            Err(ContextError::InvalidImport(_))
        ));

        // messages not an array
        let bad = serde_json::json!({ "messages": "nope", "context": {} });
        assert!(matches!(
            store.import_conversation(bad).await,
            Err(ContextError::InvalidImport(_))
        ));

        // existing document untouched
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "existing");
    }

    #[tokio::test]
    async fn test_import_recomputes_token_counts() {
        let store = store();
        let data = serde_json::json!({
            "messages": [{
                "role": "user",
                "content": "x".repeat(40),
                "timestamp": "2025-01-01T00:00:00Z",
                "token_count": 9999
            }],
            "context": SessionContext::with_defaults(),
        });

        store.import_conversation(data).await.unwrap();
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages[0].token_count, 10);
        assert_token_invariant(&store).await;
    }

    #[tokio::test]
    async fn test_stats() {
        let store = store();
        assert_eq!(
            store.get_message_stats().await.unwrap().total_messages,
            0
        );

        seed(
            &store,
            &[
                (MessageRole::User, "abcd"),
                (MessageRole::Assistant, "efghijkl"),
            ],
        )
        .await;

        let stats = store.get_message_stats().await.unwrap();
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.assistant_messages, 1);
        assert_eq!(stats.summarized_messages, 0);
        assert_eq!(stats.total_tokens, 3);
        assert!((stats.avg_tokens_per_message - 1.5).abs() < f64::EPSILON);
        assert!(stats.oldest.unwrap() <= stats.newest.unwrap());
    }

    #[tokio::test]
    async fn test_save_and_get_context() {
        let store = store();
        assert!(store.get_context().await.unwrap().is_none());

        let mut context = SessionContext::with_defaults();
        context.location = "Osaka, Japan".to_string();
        store.save_context(context).await.unwrap();

        let loaded = store.get_context().await.unwrap().unwrap();
        assert_eq!(loaded.location, "Osaka, Japan");
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store();
        seed(&store, &[(MessageRole::User, "gone soon")]).await;
        store.clear().await.unwrap();
        assert!(store.get_all_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_both_survive() {
        let store = Arc::new(store());

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .add_message(Message::new(MessageRole::User, "first"))
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .add_message(Message::new(MessageRole::Assistant, "second"))
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // the writer lock serializes the two read-modify-write cycles
        let messages = store.get_all_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_token_invariant(&store).await;
    }
}
