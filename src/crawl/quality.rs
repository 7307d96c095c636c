// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Payload quality checks
//!
//! Detects responses that technically succeeded but carry nothing worth
//! extracting: anti-bot block pages, CDN error pages, and script-only shells
//! that need a browser to render.

use regex::Regex;
use std::sync::OnceLock;

/// Statuses that indicate a block page or an edge error rather than content
pub const BLOCKED_STATUSES: [u16; 6] = [403, 429, 503, 520, 521, 522];

/// Payloads shorter than this (after trimming) are never useful
pub const MIN_PAYLOAD_CHARS: usize = 50;

fn script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)<script[\s>]|function\s*\(|var\s+\w+\s*=|document\.|window\.|addEventListener|createElement|innerHTML",
        )
        .expect("script regex is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"))
}

/// Whether a payload is an HTML document regardless of its declared type
///
/// Only the start of the body is inspected. Misconfigured servers often label
/// pages `text/plain`, so the declared content type alone is not trusted.
pub fn sniff_html(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(1024)
        .collect::<String>()
        .to_lowercase();
    if !head.starts_with('<') {
        return false;
    }
    ["<!doctype html", "<html", "<head", "<body"]
        .iter()
        .any(|marker| head.contains(marker))
}

/// Remove every markup tag, keeping the text between them
pub fn strip_tags(html: &str) -> String {
    tag_pattern().replace_all(html, "").trim().to_string()
}

/// Count script markers in a payload
pub fn script_hits(body: &str) -> usize {
    script_pattern().find_iter(body).count()
}

/// Whether a fetched payload should be treated as a failed attempt
pub fn is_bad_content(body: &str, status: u16) -> bool {
    if BLOCKED_STATUSES.contains(&status) {
        return true;
    }
    if body.trim().chars().count() < MIN_PAYLOAD_CHARS {
        return true;
    }

    let hits = script_hits(body);
    let plain_len = strip_tags(body).chars().count();

    if plain_len < 100 && hits > 5 {
        return true;
    }
    if plain_len > 0 {
        let per_hundred = (plain_len as f64 / 100.0).max(1.0);
        if hits as f64 / per_hundred > 3.0 {
            return true;
        }
    }

    false
}
