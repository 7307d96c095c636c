// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text segmentation
//!
//! Both strategies return byte ranges that partition the input: ranges are
//! contiguous, non-overlapping, and their concatenation is the input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Longest segment the fine-grained splitter emits, in chars
pub const MAX_FINE_SEGMENT_CHARS: usize = 150;

const SIMPLE_TERMINATORS: [char; 7] = ['。', '！', '？', '.', '!', '?', '\n'];
const CJK_TERMINATORS: [char; 4] = ['。', '！', '？', '；'];
const LATIN_TERMINATORS: [char; 4] = ['.', '!', '?', ';'];
const SOFT_BREAKS: [char; 4] = [',', '，', '、', ';'];

/// Segmentation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Splitter {
    /// Cut after every sentence terminator and newline
    #[default]
    Simple,
    /// Line-aware sentence splitting with a hard cap on segment length
    FineGrained,
}

impl Splitter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::FineGrained => "fine-grained",
        }
    }

    /// Partition `text` into segment byte ranges
    pub fn split(&self, text: &str) -> Vec<Range<usize>> {
        match self {
            Self::Simple => split_simple(text),
            Self::FineGrained => split_fine(text),
        }
    }

    /// Partition `text` into segment slices
    pub fn segments<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split(text).into_iter().map(|r| &text[r]).collect()
    }
}

impl fmt::Display for Splitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Splitter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "fine-grained" | "fine_grained" | "fine" | "jina" => Ok(Self::FineGrained),
            other => Err(format!(
                "unknown splitter '{}', expected 'simple' or 'fine-grained'",
                other
            )),
        }
    }
}

fn split_simple(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if SIMPLE_TERMINATORS.contains(&c) {
            let end = i + c.len_utf8();
            ranges.push(start..end);
            start = end;
        }
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }

    ranges
}

fn split_fine(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    for line in split_lines(text) {
        if is_heading(&text[line.clone()]) {
            push_capped(text, line, &mut ranges);
            continue;
        }
        for sentence in split_sentences(text, line) {
            push_capped(text, sentence, &mut ranges);
        }
    }
    ranges
}

/// Lines including their trailing newline
fn split_lines(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '\n' {
            ranges.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Cut after CJK terminators, and after Latin ones only when followed by
/// whitespace, so "3.14" and "e.g." stay intact
fn split_sentences(text: &str, line: Range<usize>) -> Vec<Range<usize>> {
    let slice = &text[line.clone()];
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let cut = if CJK_TERMINATORS.contains(&c) {
            true
        } else if LATIN_TERMINATORS.contains(&c) {
            chars.peek().map_or(false, |(_, next)| next.is_whitespace())
        } else {
            false
        };

        if cut {
            let mut end = i + c.len_utf8();
            // Trailing whitespace stays with the sentence it follows
            while let Some(&(j, next)) = chars.peek() {
                if next.is_whitespace() {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            ranges.push(line.start + start..line.start + end);
            start = end;
        }
    }
    if start < slice.len() {
        ranges.push(line.start + start..line.end);
    }

    ranges
}

/// Push a range, cutting it into pieces of at most `MAX_FINE_SEGMENT_CHARS`
fn push_capped(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let mut start = range.start;

    while start < range.end {
        let rest = &text[start..range.end];
        if rest.chars().count() <= MAX_FINE_SEGMENT_CHARS {
            out.push(start..range.end);
            return;
        }

        let hard_end = rest
            .char_indices()
            .nth(MAX_FINE_SEGMENT_CHARS)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];

        // Prefer breaking after whitespace or a comma inside the window
        let soft_end = window
            .char_indices()
            .filter(|(_, c)| c.is_whitespace() || SOFT_BREAKS.contains(c))
            .map(|(i, c)| i + c.len_utf8())
            .filter(|end| *end > 0 && *end < window.len())
            .last();

        let end = soft_end.unwrap_or(hard_end);
        out.push(start..start + end);
        start += end;
    }
}
