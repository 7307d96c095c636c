// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Char-boundary safe string helpers
//!
//! Every budget in this crate counts Unicode scalar values, not bytes.

/// Number of chars in a string
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the char at `char_index`, or `text.len()` past the end
pub fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// First `max_chars` chars of a string
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    &text[..byte_offset(text, max_chars)]
}

/// Last `max_chars` chars of a string
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let len = char_len(text);
    if len <= max_chars {
        return text;
    }
    &text[byte_offset(text, len - max_chars)..]
}
