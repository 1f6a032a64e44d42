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

//! Cache configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the context cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Data directory for persistent storage
    pub data_dir: PathBuf,

    /// Total token budget for an assembled prompt window
    pub max_tokens: u32,

    /// Headroom reserved for the next turn and the rendered context block
    pub reserve_tokens: u32,

    /// Hard per-message cap before forced truncation
    pub max_message_tokens: u32,

    /// Hard cap on retained message count
    pub max_conversation_length: usize,

    /// Character length above which a message is summarized (tunable at
    /// runtime)
    pub summarization_threshold: usize,

    /// Target character length of a summary (tunable at runtime)
    pub summary_max_length: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recall");

        Self {
            data_dir,
            max_tokens: 32_000,
            reserve_tokens: 4_000,
            max_message_tokens: 2_000,
            max_conversation_length: 200,
            summarization_threshold: 2_000,
            summary_max_length: 500,
        }
    }
}

/// The runtime-tunable summarization knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationSettings {
    /// Character length above which a message is summarized
    pub threshold: usize,
    /// Target character length of a summary
    pub max_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_headroom() {
        let config = CacheConfig::default();
        assert!(config.reserve_tokens < config.max_tokens);
        assert!(config.summary_max_length < config.summarization_threshold);
    }
}
