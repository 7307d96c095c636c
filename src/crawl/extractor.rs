// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Body text extraction
//!
//! Turns fetched HTML into readable text. Extraction is a pluggable step
//! selected by the engine's configuration, independent of which backend
//! fetched the page.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use super::quality::strip_tags;

/// Errors from body extraction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Payload could not be read as a markup document
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Pluggable post-processing step: HTML in, clean text out
///
/// `Ok("")` means the document parsed but holds no readable text.
pub trait BodyExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<String, ExtractError>;

    fn name(&self) -> &'static str;
}

/// Content containers tried first, most specific last
const CONTENT_SELECTORS: [&str; 12] = [
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".story-body",
    ".article__body",
    ".content-body",
    "#article-body",
    "#content",
    ".prose",
];

/// Elements that never carry body text
const SKIP_TAGS: [&str; 14] = [
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "nav", "footer",
    "header", "aside", "form", "button", "select",
];

const BLOCK_TAGS: [&str; 20] = [
    "p",
    "div",
    "section",
    "article",
    "main",
    "ul",
    "ol",
    "dl",
    "dt",
    "dd",
    "table",
    "thead",
    "tbody",
    "tr",
    "blockquote",
    "pre",
    "figure",
    "figcaption",
    "details",
    "summary",
];

/// Class or id words that mark page chrome rather than content
const BOILERPLATE_WORDS: [&str; 22] = [
    "nav",
    "navbar",
    "navigation",
    "menu",
    "sidebar",
    "footer",
    "header",
    "banner",
    "cookie",
    "consent",
    "ad",
    "ads",
    "advert",
    "advertisement",
    "promo",
    "subscribe",
    "newsletter",
    "share",
    "social",
    "related",
    "comments",
    "breadcrumb",
];

/// Readability-style extractor built on scraper
///
/// Picks the main content container (known content selectors first, then the
/// densest non-link text block), drops boilerplate, and renders headings and
/// list items as markdown so downstream chunking keeps document structure.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    min_container_chars: usize,
}

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self {
            min_container_chars: 200,
        }
    }

    /// Minimum text a known content container must hold to be chosen
    pub fn with_min_container_chars(mut self, chars: usize) -> Self {
        self.min_container_chars = chars;
        self
    }

    fn pick_by_selector<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        for selector_str in CONTENT_SELECTORS {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            if let Some(element) = document.select(&selector).next() {
                if text_chars(&element) > self.min_container_chars {
                    return Some(element);
                }
            }
        }
        None
    }

    fn pick_by_density<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
        let selector = Selector::parse("article, main, section, div").ok()?;
        let mut best: Option<(i64, ElementRef<'a>)> = None;

        for element in document.select(&selector).take(20_000) {
            if is_boilerplate(&element) {
                continue;
            }
            let text = text_chars(&element);
            if text < 20 {
                continue;
            }
            let links = link_text_chars(&element);
            let mut score = text as i64 - 2 * links as i64;
            match element.value().name() {
                "article" => score += 500,
                "main" => score += 300,
                _ => {}
            }
            if links > text / 2 {
                score -= 500;
            }
            if score > 0 && best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, element));
            }
        }

        best.map(|(_, element)| element)
    }

    fn pick_root<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        if let Some(element) = self.pick_by_selector(document) {
            return element;
        }
        if let Some(element) = Self::pick_by_density(document) {
            return element;
        }
        Selector::parse("body")
            .ok()
            .and_then(|s| document.select(&s).next())
            .unwrap_or_else(|| document.root_element())
    }
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str) -> Result<String, ExtractError> {
        if !looks_like_markup(html) {
            return Err(ExtractError::Parse("payload is not markup".to_string()));
        }

        let document = Html::parse_document(html);
        let root = self.pick_root(&document);

        let mut renderer = Renderer::default();
        renderer.walk(root);
        renderer.flush();

        Ok(enhance_heading_structure(&renderer.blocks.join("\n\n")))
    }

    fn name(&self) -> &'static str {
        "readability"
    }
}

/// Crude extractor: drop every tag, keep the text
#[derive(Debug, Clone, Default)]
pub struct TagStripExtractor;

impl BodyExtractor for TagStripExtractor {
    fn extract(&self, html: &str) -> Result<String, ExtractError> {
        if !looks_like_markup(html) {
            return Err(ExtractError::Parse("payload is not markup".to_string()));
        }

        let lines: Vec<String> = strip_tags(html)
            .lines()
            .map(collapse_whitespace)
            .filter(|l| !l.is_empty())
            .collect();
        Ok(lines.join("\n"))
    }

    fn name(&self) -> &'static str {
        "strip"
    }
}

/// Promote Chinese ordinal headings and normalise bullets
///
/// `一、` lines become `##` headings, `1、` lines become `###` headings and
/// leading `* ` bullets become `- `.
pub fn enhance_heading_structure(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let stripped = line.trim();
            if starts_with_ordinal(stripped, is_chinese_numeral) {
                format!("## {}", stripped)
            } else if starts_with_ordinal(stripped, |c| c.is_ascii_digit()) {
                format!("### {}", stripped)
            } else if let Some(rest) = stripped.strip_prefix("* ") {
                format!("- {}", rest)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_chinese_numeral(c: char) -> bool {
    "一二三四五六七八九十".contains(c)
}

fn starts_with_ordinal(s: &str, is_numeral: impl Fn(char) -> bool) -> bool {
    let mut count = 0;
    for c in s.chars() {
        if is_numeral(c) {
            count += 1;
            continue;
        }
        return count > 0 && c == '、';
    }
    false
}

fn looks_like_markup(payload: &str) -> bool {
    let trimmed = payload.trim_start();
    trimmed.starts_with('<') || (trimmed.contains('<') && trimmed.contains('>'))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_chars(element: &ElementRef) -> usize {
    element.text().map(|t| t.trim().chars().count()).sum()
}

fn link_text_chars(element: &ElementRef) -> usize {
    let Ok(selector) = Selector::parse("a") else {
        return 0;
    };
    element.select(&selector).map(|a| text_chars(&a)).sum()
}

fn is_boilerplate(element: &ElementRef) -> bool {
    let value = element.value();
    let attrs = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    )
    .to_ascii_lowercase();

    attrs
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| BOILERPLATE_WORDS.contains(&word))
}

/// Walks an element tree emitting one block per paragraph-level element
#[derive(Default)]
struct Renderer {
    blocks: Vec<String>,
    current: String,
}

impl Renderer {
    fn flush(&mut self) {
        let line = collapse_whitespace(&self.current);
        if !line.is_empty() {
            self.blocks.push(line);
        }
        self.current.clear();
    }

    fn walk(&mut self, element: ElementRef) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.current.push_str(text),
                Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        self.visit(child_element);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef) {
        let name = element.value().name();
        if SKIP_TAGS.contains(&name) || is_boilerplate(&element) {
            return;
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    self.blocks.push(format!("{} {}", "#".repeat(level), text));
                }
            }
            "li" => {
                self.flush();
                self.walk(element);
                let text = collapse_whitespace(&self.current);
                self.current.clear();
                if !text.is_empty() {
                    self.blocks.push(format!("- {}", text));
                }
            }
            "br" | "hr" => self.flush(),
            "td" | "th" => {
                self.walk(element);
                self.current.push(' ');
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.flush();
                self.walk(element);
                self.flush();
            }
            _ => self.walk(element),
        }
    }
}
