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

//! Flat JSON file store
//!
//! Fallback backend used when the structured store is unavailable. The
//! whole document is serialized to one file under a fixed name; writes
//! go through a temp file and rename so a crash never leaves a
//! half-written document. Timestamps survive the trip through text via
//! chrono's serde representation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use recall_core::ConversationDocument;
use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::StorageResult;

/// Flat serialized fallback backend
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend storing the document at `path`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Document file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, path: &Path, contents: &str) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    async fn self_test_inner(&self) -> StorageResult<bool> {
        let probe_path = self.path.with_extension("probe");
        let mut probe = ConversationDocument::empty();
        probe.context.location = "self-test".to_string();

        self.write_file(&probe_path, &serde_json::to_string(&probe)?)?;
        let read_back: ConversationDocument =
            serde_json::from_str(&std::fs::read_to_string(&probe_path)?)?;
        std::fs::remove_file(&probe_path)?;

        Ok(read_back.context.location == "self-test")
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn save(&self, doc: &ConversationDocument) -> StorageResult<()> {
        let payload = serde_json::to_string_pretty(doc)?;
        self.write_file(&self.path, &payload)
    }

    async fn load(&self) -> StorageResult<Option<ConversationDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn clear(&self) -> StorageResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    async fn self_test(&self) -> bool {
        match self.self_test_inner().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "json self test failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
