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

//! Context cache error types

use recall_storage::StorageError;
use thiserror::Error;

/// Result type for cache and coordinator operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors that can occur in the conversation cache
#[derive(Debug, Error)]
pub enum ContextError {
    /// Underlying storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Export requested with no conversation on record
    #[error("no conversation to export")]
    NoConversation,

    /// Import data failed validation; nothing was mutated
    #[error("invalid import data: {0}")]
    InvalidImport(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ContextError {
    fn from(e: serde_json::Error) -> Self {
        ContextError::Serialization(e.to_string())
    }
}
