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

//! Recall conversation cache
//!
//! Client-side conversational-context cache: retains a bounded chat
//! history, enforces a token budget when assembling a prompt-ready
//! window, shortens oversized turns deterministically, and persists
//! everything through the `recall-storage` backends.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                 ContextCache                   │
//! │  token-budget window · summarization policy ·  │
//! │  session context (date/time/location)          │
//! └──────────────────────┬─────────────────────────┘
//! ┌──────────────────────▼─────────────────────────┐
//! │              ConversationStore                 │
//! │  whole-document read-modify-write · filters ·  │
//! │  cleanup · export/import · stats               │
//! └──────────────────────┬─────────────────────────┘
//! ┌──────────────────────▼─────────────────────────┐
//! │         StorageBackend (recall-storage)        │
//! │        SQLite preferred, JSON fallback         │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! UI collaborators call into [`ContextCache`] only; nothing above it
//! touches storage directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use recall_context::{CacheConfig, ContextCache};
//! use recall_core::MessageRole;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ContextCache::open(CacheConfig::default()).await;
//!
//!     cache.add_message(MessageRole::User, "What's the weather like?").await?;
//!     let window = cache.get_conversation_messages().await?;
//!     let usage = cache.get_token_usage().await?;
//!
//!     println!("{} messages, {} tokens used", window.len(), usage.used_tokens);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod location;
pub mod store;
pub mod summary;

// Re-exports
pub use cache::{ContextCache, ContextListener, TokenUsage};
pub use config::{CacheConfig, SummarizationSettings};
pub use error::{ContextError, ContextResult};
pub use location::{Address, LocationError, LocationSource, ReverseGeocoder};
pub use store::{
    CleanupOptions, CleanupReport, ConversationExport, ConversationStore, ExportMetadata,
    MessagePatch, MessageStats, SummarizeReport,
};
pub use summary::{summarize, SUMMARY_MARKER, TRUNCATION_MARKER};
