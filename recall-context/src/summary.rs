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

//! Deterministic message shortening
//!
//! "Summarization" here keeps the head and tail of an over-length text
//! and discards the middle. It is lossy and irreversible; the original
//! text is not retained anywhere. The algorithm is deliberately not a
//! model call and must stay byte-for-byte stable across releases, since
//! stored token counts are derived from its output.

/// Marker joining the kept head and tail of a summarized message
pub const SUMMARY_MARKER: &str = "... [summarized] ...";

/// Marker appended to a hard-truncated message
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Shorten `text` to roughly `max_length` characters.
///
/// Text at or under `max_length` is returned unchanged. Otherwise the
/// first and last `max_length / 2` characters are kept: the head is
/// trimmed back to its last complete sentence and the tail forward past
/// its first sentence boundary, then the two are joined with
/// [`SUMMARY_MARKER`]. The result may exceed `max_length` by the marker
/// and joining whitespace, never by more.
pub fn summarize(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }

    let half = max_length / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();

    // Trim the head back to its last complete sentence, if it has one
    let head = match head.rfind('.') {
        Some(idx) => head[..=idx].to_string(),
        None => head,
    };

    // Trim the tail forward to just after its first sentence boundary,
    // dropping the partial sentence the cut landed in
    let tail = match tail.find('.') {
        Some(idx) => tail[idx + 1..].trim_start().to_string(),
        None => tail,
    };

    format!("{} {} {}", head.trim_end(), SUMMARY_MARKER, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        let text = "short enough already";
        assert_eq!(summarize(text, 100), text);
    }

    #[test]
    fn test_exact_length_unchanged() {
        let text = "x".repeat(100);
        assert_eq!(summarize(&text, 100), text);
    }

    #[test]
    fn test_long_text_contains_marker() {
        let text = "word ".repeat(200);
        let result = summarize(&text, 100);
        assert!(result.contains(SUMMARY_MARKER));
        assert!(result.chars().count() < text.chars().count());
    }

    #[test]
    fn test_length_bound() {
        let text = "x".repeat(3000);
        let result = summarize(&text, 500);
        // half + half + marker + two joining spaces
        let bound = 500 + SUMMARY_MARKER.chars().count() + 2;
        assert!(result.chars().count() <= bound);
    }

    #[test]
    fn test_head_trimmed_to_sentence() {
        // The head half ends mid-sentence; it gets trimmed back to the
        // period.
        let text = format!("One. Two{}", "x".repeat(200));
        let result = summarize(&text, 40);
        assert!(result.starts_with("One."));
        assert!(!result.starts_with("One. Two"));
    }

    #[test]
    fn test_tail_trimmed_past_first_sentence() {
        // The tail half starts mid-sentence; everything before its first
        // period is dropped.
        let text = format!("{}partial. Kept to the end", "x".repeat(200));
        let result = summarize(&text, 48);
        assert!(result.ends_with("Kept to the end"));
        assert!(!result.contains("partial."));
    }

    #[test]
    fn test_no_periods_keeps_raw_halves() {
        let text = "a".repeat(100) + &"b".repeat(100);
        let result = summarize(&text, 40);
        assert!(result.starts_with(&"a".repeat(20)));
        assert!(result.ends_with(&"b".repeat(20)));
        assert!(result.contains(SUMMARY_MARKER));
    }

    #[test]
    fn test_multibyte_text_is_boundary_safe() {
        let text = "日本語のテキスト。".repeat(50);
        let result = summarize(&text, 60);
        assert!(result.contains(SUMMARY_MARKER));
    }
}
