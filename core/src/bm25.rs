//! Okapi BM25 ranking over any [`IndexView`].

use crate::error::Result;
use crate::normalize::normalize;
use crate::{DocId, IndexView, TermFreq};
use serde::Serialize;
use std::collections::HashMap;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: K1, b: B }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub doc_no: String,
    pub score: f64,
}

/// `ln((N - n + 0.5) / (n + 0.5) + 1)`.
///
/// The `+ 1` keeps the weight positive for terms found in more than half
/// the collection, where the textbook form goes negative and inverts the
/// ranking.
pub fn idf(num_docs: u32, doc_freq: usize) -> f64 {
    let n = doc_freq as f64;
    ((num_docs as f64 - n + 0.5) / (n + 0.5) + 1.0).ln()
}

/// Contribution of one term to one document.
pub fn term_score(params: Bm25Params, idf: f64, tf: TermFreq, doc_len: u32, avg_doc_len: f64) -> f64 {
    let tf = tf as f64;
    let k = params.k1 * ((1.0 - params.b) + params.b * (doc_len as f64 / avg_doc_len));
    idf * (tf * (params.k1 + 1.0) / (tf + k))
}

pub struct Scorer<'a, I: IndexView + ?Sized> {
    index: &'a I,
    params: Bm25Params,
}

impl<'a, I: IndexView + ?Sized> Scorer<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self::with_params(index, Bm25Params::default())
    }

    pub fn with_params(index: &'a I, params: Bm25Params) -> Self {
        Self { index, params }
    }

    /// Rank every document matching at least one query term, best first.
    ///
    /// Query terms are not de-duplicated: a term given twice counts twice.
    /// Only positive per-term contributions are added, and documents left
    /// without any are not returned. Equal scores fall back to ascending
    /// docId.
    pub fn search(&self, query: &str) -> Result<Vec<ScoredDoc>> {
        let num_docs = self.index.num_docs();
        let avg_doc_len = self.index.average_document_length();
        let mut totals: HashMap<DocId, f64> = HashMap::new();

        for term in normalize(query) {
            let postings = self.index.postings(&term)?;
            if postings.is_empty() {
                continue;
            }
            let idf = idf(num_docs, postings.len());
            tracing::debug!(%term, doc_freq = postings.len(), idf, "scoring term");
            for posting in postings {
                let doc_len = self.index.document_length(posting.doc_id);
                let score = term_score(self.params, idf, posting.term_freq, doc_len, avg_doc_len);
                if score > 0.0 {
                    *totals.entry(posting.doc_id).or_insert(0.0) += score;
                }
            }
        }

        let mut ranked: Vec<(DocId, f64)> = totals.into_iter().filter(|&(_, s)| s > 0.0).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .map(|(doc_id, score)| -> Result<ScoredDoc> {
                let doc_no = self.index.document_identifier(doc_id)?.to_string();
                Ok(ScoredDoc { doc_id, doc_no, score })
            })
            .collect()
    }
}
