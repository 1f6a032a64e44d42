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

//! Backend trait and selection
//!
//! One interface, two implementations, selected once at construction.
//! Callers never branch on the backend kind per call.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use recall_core::ConversationDocument;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::json::JsonFileBackend;
use crate::sqlite::SqliteBackend;

/// Durable storage for the single conversation document.
///
/// Failures on `save`/`load`/`clear` are surfaced to the caller; the
/// coordinator above decides how to degrade. `self_test` never errors.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist the whole document, replacing any previous version
    async fn save(&self, doc: &ConversationDocument) -> StorageResult<()>;

    /// Load the stored document, `None` if nothing was ever saved
    async fn load(&self) -> StorageResult<Option<ConversationDocument>>;

    /// Remove the stored document
    async fn clear(&self) -> StorageResult<()>;

    /// Round-trip a synthetic record end-to-end.
    ///
    /// Returns `false` on any failure, it never errors or panics.
    async fn self_test(&self) -> bool;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Open the preferred backend for `data_dir`, falling back to the flat
/// JSON store when the structured store is unavailable.
///
/// The probe runs once; the returned backend is used for the process
/// lifetime without re-probing per call.
pub async fn open_default(data_dir: impl AsRef<Path>) -> Arc<dyn StorageBackend> {
    let dir = data_dir.as_ref();

    match SqliteBackend::open(dir.join("conversation.db")) {
        Ok(backend) => {
            if backend.self_test().await {
                debug!(path = %dir.display(), "using sqlite storage backend");
                return Arc::new(backend);
            }
            warn!("sqlite backend failed self test, falling back to json store");
        }
        Err(e) => {
            warn!(error = %e, "sqlite backend unavailable, falling back to json store");
        }
    }

    Arc::new(JsonFileBackend::new(dir.join("conversation.json")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::{Message, MessageRole};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_default_prefers_sqlite() {
        let dir = tempdir().unwrap();
        let backend = open_default(dir.path()).await;
        assert_eq!(backend.name(), "sqlite");
    }

    #[tokio::test]
    async fn test_open_default_falls_back_when_sqlite_cannot_open() {
        let dir = tempdir().unwrap();
        // A directory where the database file should be makes SQLite
        // refuse to open; the probe must fall back instead of failing.
        std::fs::create_dir(dir.path().join("conversation.db")).unwrap();

        let backend = open_default(dir.path()).await;
        assert_eq!(backend.name(), "json");

        // The fallback is fully operational
        let mut doc = ConversationDocument::empty();
        doc.messages.push(Message::new(MessageRole::User, "still works"));
        doc.recompute_total_tokens();
        backend.save(&doc).await.unwrap();

        let loaded = backend.load().await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
    }
}
