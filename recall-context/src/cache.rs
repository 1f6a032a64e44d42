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

//! Context cache
//!
//! The single entry point for UI collaborators. Owns the in-memory
//! session context and the conversation retrieval policy: token-budget
//! window assembly, per-message summarization/truncation on the way in,
//! and the runtime-tunable summarization settings. All durability is
//! delegated to [`ConversationStore`].

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use recall_core::{Message, MessageRole, SessionContext};
use recall_storage::open_default;

use crate::config::{CacheConfig, SummarizationSettings};
use crate::error::ContextResult;
use crate::location::{LocationSource, ReverseGeocoder};
use crate::store::{CleanupOptions, CleanupReport, ConversationExport, ConversationStore, SummarizeReport};
use crate::summary::{summarize, TRUNCATION_MARKER};

/// Callback invoked whenever ambient context changes
pub type ContextListener = Box<dyn Fn(&SessionContext) + Send + Sync>;

/// Token accounting over the stored conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens currently stored across all messages
    pub used_tokens: u64,
    /// Budget available to history (`max_tokens - reserve_tokens`)
    pub budget_tokens: u64,
    /// Remaining headroom before eviction kicks in
    pub available_tokens: u64,
}

/// Conversational-context cache
pub struct ContextCache {
    store: Arc<ConversationStore>,
    config: RwLock<CacheConfig>,
    context: RwLock<SessionContext>,
    listener: RwLock<Option<ContextListener>>,
}

impl ContextCache {
    /// Build a cache over an already-constructed coordinator.
    ///
    /// The session context is restored from storage when present; on an
    /// absent document or a storage failure a default context is
    /// synthesized immediately, so prompt formatting always has a value
    /// to render.
    pub async fn new(store: Arc<ConversationStore>, config: CacheConfig) -> Self {
        let context = match store.get_context().await {
            Ok(Some(mut ctx)) => {
                ctx.refresh_clock();
                ctx
            }
            Ok(None) => SessionContext::with_defaults(),
            Err(e) => {
                warn!(error = %e, "failed to restore session context, using defaults");
                SessionContext::with_defaults()
            }
        };

        Self {
            store,
            config: RwLock::new(config),
            context: RwLock::new(context),
            listener: RwLock::new(None),
        }
    }

    /// Open the default backend for the configured data directory and
    /// build the full stack over it.
    pub async fn open(config: CacheConfig) -> Self {
        let backend = open_default(&config.data_dir).await;
        let store = Arc::new(ConversationStore::new(backend));
        Self::new(store, config).await
    }

    /// The coordinator this cache delegates durability to
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Record one conversational turn.
    ///
    /// Content over the summarization threshold is shortened before it
    /// is stored; content under the threshold but over the per-message
    /// token cap is hard-truncated instead. The two never combine, and
    /// the stored token count always reflects the final text.
    pub async fn add_message(
        &self,
        role: MessageRole,
        content: &str,
    ) -> ContextResult<Message> {
        let (threshold, max_length, max_message_tokens) = {
            let config = self.config.read();
            (
                config.summarization_threshold,
                config.summary_max_length,
                config.max_message_tokens,
            )
        };

        let mut message = Message::new(role, content);
        let char_len = content.chars().count();

        if char_len > threshold {
            let shortened = summarize(content, max_length);
            debug!(
                original_chars = char_len,
                stored_chars = shortened.chars().count(),
                "summarizing oversized message"
            );
            message.summary = Some(shortened.clone());
            message.is_summarized = true;
            message.set_content(shortened);
        } else if message.token_count > max_message_tokens {
            let mut truncated: String = content
                .chars()
                .take(max_message_tokens as usize * 4)
                .collect();
            truncated.push_str(TRUNCATION_MARKER);
            message.set_content(truncated);
        }

        self.store.add_message(message.clone()).await?;
        Ok(message)
    }

    /// Assemble the prompt-ready message window.
    ///
    /// Walks the stored history newest to oldest, accumulating token
    /// counts, and stops before any message that would push the total
    /// plus the reserve over the budget. The result is therefore always
    /// a contiguous suffix of the history, oldest first.
    pub async fn get_conversation_messages(&self) -> ContextResult<Vec<Message>> {
        let (max_tokens, reserve_tokens) = {
            let config = self.config.read();
            (config.max_tokens, config.reserve_tokens)
        };

        let all = self.store.get_all_messages().await?;
        let mut selected = Vec::new();
        let mut used: u32 = 0;

        for message in all.into_iter().rev() {
            if used + message.token_count + reserve_tokens > max_tokens {
                break;
            }
            used += message.token_count;
            selected.push(message);
        }

        selected.reverse();
        Ok(selected)
    }

    /// Current token accounting over the stored conversation
    pub async fn get_token_usage(&self) -> ContextResult<TokenUsage> {
        let (max_tokens, reserve_tokens) = {
            let config = self.config.read();
            (config.max_tokens, config.reserve_tokens)
        };
        let budget = u64::from(max_tokens - reserve_tokens);

        let stats = self.store.get_message_stats().await?;
        Ok(TokenUsage {
            used_tokens: stats.total_tokens,
            budget_tokens: budget,
            available_tokens: budget.saturating_sub(stats.total_tokens),
        })
    }

    /// Evict history down to the configured ceilings.
    ///
    /// Oldest messages are dropped until the stored total fits inside
    /// `max_tokens - reserve_tokens`, then the count is trimmed to
    /// `max_conversation_length`.
    pub async fn cleanup_old_messages(&self) -> ContextResult<CleanupReport> {
        let (max_tokens, reserve_tokens, max_len) = {
            let config = self.config.read();
            (
                config.max_tokens,
                config.reserve_tokens,
                config.max_conversation_length,
            )
        };

        self.store
            .cleanup_old_messages(CleanupOptions {
                max_messages: Some(max_len),
                max_tokens: Some(u64::from(max_tokens - reserve_tokens)),
                max_age_days: None,
            })
            .await
    }

    /// One-shot maintenance pass shortening stored messages that exceed
    /// the current threshold
    pub async fn summarize_existing_messages(&self) -> ContextResult<SummarizeReport> {
        let settings = self.summarization_settings();
        self.store
            .summarize_existing(settings.threshold, settings.max_length)
            .await
    }

    /// Current summarization knobs
    pub fn summarization_settings(&self) -> SummarizationSettings {
        let config = self.config.read();
        SummarizationSettings {
            threshold: config.summarization_threshold,
            max_length: config.summary_max_length,
        }
    }

    /// Tune the summarization knobs at runtime
    pub fn update_summarization_settings(&self, threshold: usize, max_length: usize) {
        let mut config = self.config.write();
        config.summarization_threshold = threshold;
        config.summary_max_length = max_length;
    }

    /// The ambient session context with a freshly recomputed clock
    pub fn current_context(&self) -> SessionContext {
        let mut context = self.context.write();
        context.refresh_clock();
        context.clone()
    }

    /// Register the callback invoked when ambient context changes,
    /// replacing any previous one
    pub fn set_context_listener(&self, listener: ContextListener) {
        *self.listener.write() = Some(listener);
    }

    /// Refresh location from the injected collaborators.
    ///
    /// On success the resolved place name (or, when geocoding fails, a
    /// fixed-precision coordinate string) is stored and persisted. On
    /// permission denial or any position failure the context keeps its
    /// previous value. Never surfaces a hard failure.
    pub async fn refresh_location(
        &self,
        source: &dyn LocationSource,
        geocoder: &dyn ReverseGeocoder,
    ) -> ContextResult<()> {
        let position = match source.current_position().await {
            Ok(position) => position,
            Err(e) => {
                debug!(error = %e, "location unavailable, keeping previous value");
                return Ok(());
            }
        };

        let place = match geocoder.reverse_geocode(position).await {
            Ok(address) => address
                .display_name()
                .unwrap_or_else(|| position.display()),
            Err(e) => {
                debug!(error = %e, "geocoding failed, falling back to coordinates");
                position.display()
            }
        };

        let snapshot = {
            let mut context = self.context.write();
            context.set_location(place, position);
            context.refresh_clock();
            context.clone()
        };

        if let Err(e) = self.store.save_context(snapshot.clone()).await {
            warn!(error = %e, "failed to persist refreshed location");
        }
        self.notify_context_changed(&snapshot);
        Ok(())
    }

    /// Wipe storage and recreate a default context
    pub async fn clear_all_data(&self) -> ContextResult<()> {
        self.store.clear().await?;

        let snapshot = {
            let mut context = self.context.write();
            *context = SessionContext::with_defaults();
            context.clone()
        };
        self.notify_context_changed(&snapshot);
        Ok(())
    }

    /// Export the whole conversation through the coordinator
    pub async fn export_conversation(&self) -> ContextResult<ConversationExport> {
        self.store.export_conversation().await
    }

    /// Import a conversation, then re-derive the in-memory context from
    /// what was actually stored
    pub async fn import_conversation(&self, data: serde_json::Value) -> ContextResult<usize> {
        let imported = self.store.import_conversation(data).await?;

        match self.store.get_context().await {
            Ok(Some(stored)) => {
                let snapshot = {
                    let mut context = self.context.write();
                    *context = stored;
                    context.refresh_clock();
                    context.clone()
                };
                self.notify_context_changed(&snapshot);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to reload context after import"),
        }

        Ok(imported)
    }

    fn notify_context_changed(&self, context: &SessionContext) {
        let listener = self.listener.read();
        if let Some(listener) = listener.as_ref() {
            listener(context);
        }
    }
}
