use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 1-based, assigned in the order documents are read.
pub type DocId = u32;
pub type TermFreq = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: TermFreq,
}

/// Location of a term's postings in the shared postings artifact, in
/// posting-pair units rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermEntry {
    pub offset: u32,
    pub count: u32,
}

/// Read access to an index, whether it was just built or loaded from disk.
pub trait IndexView {
    fn num_docs(&self) -> u32;
    fn average_document_length(&self) -> f64;
    /// Zero for ids the index does not know.
    fn document_length(&self, doc_id: DocId) -> u32;
    fn document_identifier(&self, doc_id: DocId) -> Result<&str>;
    /// Empty when the term is not in the vocabulary.
    fn postings(&self, term: &str) -> Result<Vec<Posting>>;
}

/// Everything the accumulation pass produced, ready for serialization.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    pub vocabulary: HashMap<String, Vec<Posting>>,
    pub doc_lengths: Vec<u32>,
    pub doc_nos: Vec<String>,
}

impl InMemoryIndex {
    pub fn num_postings(&self) -> usize {
        self.vocabulary.values().map(Vec::len).sum()
    }

    /// Terms in byte order, the order they are written to disk.
    pub fn sorted_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.vocabulary.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }
}

impl IndexView for InMemoryIndex {
    fn num_docs(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    fn average_document_length(&self) -> f64 {
        average(&self.doc_lengths)
    }

    fn document_length(&self, doc_id: DocId) -> u32 {
        lookup(&self.doc_lengths, doc_id).copied().unwrap_or(0)
    }

    fn document_identifier(&self, doc_id: DocId) -> Result<&str> {
        lookup(&self.doc_nos, doc_id)
            .map(String::as_str)
            .ok_or(IndexError::DocIdOutOfRange { doc_id, num_docs: self.num_docs() })
    }

    fn postings(&self, term: &str) -> Result<Vec<Posting>> {
        Ok(self.vocabulary.get(term).cloned().unwrap_or_default())
    }
}

pub(crate) fn lookup<T>(items: &[T], doc_id: DocId) -> Option<&T> {
    (doc_id as usize).checked_sub(1).and_then(|i| items.get(i))
}

pub(crate) fn average(doc_lengths: &[u32]) -> f64 {
    if doc_lengths.is_empty() {
        return 0.0;
    }
    let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
    total as f64 / doc_lengths.len() as f64
}
