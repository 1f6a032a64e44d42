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

//! Recall persistence backends
//!
//! Durable storage for the single [`ConversationDocument`] record, behind
//! the [`StorageBackend`] trait:
//!
//! - [`SqliteBackend`] — the preferred structured store. Schema-versioned
//!   SQLite database holding the whole document as one row, with a
//!   per-message table reserved for future normalization.
//! - [`JsonFileBackend`] — flat serialized fallback used when SQLite is
//!   unavailable. One JSON file, whole document.
//!
//! [`open_default`] probes the structured store once at construction and
//! falls back to the flat store; the choice is fixed for the lifetime of
//! the returned backend.
//!
//! [`ConversationDocument`]: recall_core::ConversationDocument

pub mod backend;
pub mod error;
pub mod json;
pub mod sqlite;

// Re-exports
pub use backend::{open_default, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use json::JsonFileBackend;
pub use sqlite::SqliteBackend;
