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

//! Recall core types
//!
//! Shared data model for the Recall conversation cache:
//! - **Message**: one conversational turn, with a token estimate that
//!   always reflects the text actually retained
//! - **SessionContext**: ambient date/time/location metadata injected
//!   into prompts
//! - **ConversationDocument**: the single persisted aggregate owning the
//!   message history and its running token total
//!
//! This crate is types only; persistence lives in `recall-storage` and the
//! retrieval policy in `recall-context`.

pub mod context;
pub mod document;
pub mod message;

// Re-exports
pub use context::{Coordinates, SessionContext};
pub use document::ConversationDocument;
pub use message::{estimate_tokens, Message, MessageId, MessageRole};
