// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Okapi BM25 relevance scoring

use std::collections::HashMap;

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;

/// BM25 index over a small in-memory corpus of tokenized documents
#[derive(Debug, Clone)]
pub struct Bm25 {
    k1: f64,
    b: f64,
    avg_doc_len: f64,
    doc_lens: Vec<usize>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_freqs: HashMap<String, usize>,
}

impl Bm25 {
    pub fn new(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, DEFAULT_K1, DEFAULT_B)
    }

    /// Build an index with explicit saturation (`k1`) and length normalization (`b`)
    pub fn with_params(corpus: &[Vec<String>], k1: f64, b: f64) -> Self {
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());

        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(doc.len());
            term_freqs.push(freqs);
        }

        let total: usize = doc_lens.iter().sum();
        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            total as f64 / doc_lens.len() as f64
        };

        Self {
            k1,
            b,
            avg_doc_len,
            doc_lens,
            term_freqs,
            doc_freqs,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// Inverse document frequency; never negative, so common terms add little
    /// rather than penalising a document
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.len() as f64;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Score one document against a tokenized query
    pub fn score(&self, query: &[String], doc: usize) -> f64 {
        let Some(freqs) = self.term_freqs.get(doc) else {
            return 0.0;
        };
        let doc_len = self.doc_lens[doc] as f64;
        let avg = if self.avg_doc_len > 0.0 {
            self.avg_doc_len
        } else {
            1.0
        };

        query
            .iter()
            .map(|term| {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    return 0.0;
                }
                let norm = self.k1 * (1.0 - self.b + self.b * doc_len / avg);
                self.idf(term) * tf * (self.k1 + 1.0) / (tf + norm)
            })
            .sum()
    }

    /// Scores for every document, in corpus order
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        (0..self.len()).map(|doc| self.score(query, doc)).collect()
    }
}
