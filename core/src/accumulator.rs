use crate::error::{IndexError, Result};
use crate::normalize::{normalize, MAX_TERM_BYTES};
use crate::{DocId, InMemoryIndex, Posting};
use std::collections::HashMap;

/// What the corpus scanner reports while walking the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusEvent {
    BeginDocument,
    DocNo(String),
    Text(String),
    EndDocument,
}

#[derive(Debug)]
struct OpenDocument {
    doc_id: DocId,
    length: u32,
    doc_no: Option<String>,
}

/// Single forward pass builder for the inverted index.
///
/// Documents are numbered from 1 as they begin, so every postings list is
/// appended to in ascending docId order and never needs sorting.
#[derive(Debug, Default)]
pub struct Accumulator {
    vocabulary: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    doc_nos: Vec<String>,
    current: Option<OpenDocument>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents fully processed so far.
    pub fn num_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn apply(&mut self, event: CorpusEvent) -> Result<()> {
        match event {
            CorpusEvent::BeginDocument => self.begin_document().map(|_| ()),
            CorpusEvent::DocNo(doc_no) => self.set_doc_no(doc_no),
            CorpusEvent::Text(text) => self.add_text(&text),
            CorpusEvent::EndDocument => self.end_document(),
        }
    }

    pub fn begin_document(&mut self) -> Result<DocId> {
        if let Some(open) = &self.current {
            return Err(IndexError::malformed(format!(
                "document start while docId {} is still open",
                open.doc_id
            )));
        }
        let doc_id = DocId::try_from(self.doc_lengths.len() + 1)
            .map_err(|_| IndexError::Overflow("document count"))?;
        self.current = Some(OpenDocument { doc_id, length: 0, doc_no: None });
        Ok(doc_id)
    }

    pub fn set_doc_no(&mut self, doc_no: impl Into<String>) -> Result<()> {
        let doc_no = doc_no.into();
        let open = self.current.as_mut().ok_or_else(|| {
            IndexError::malformed(format!("identifier {doc_no:?} outside of any document"))
        })?;
        if doc_no.contains('\0') {
            return Err(IndexError::malformed(format!(
                "identifier of docId {} contains a NUL byte",
                open.doc_id
            )));
        }
        if let Some(existing) = &open.doc_no {
            return Err(IndexError::malformed(format!(
                "docId {} has two identifiers: {existing:?} and {doc_no:?}",
                open.doc_id
            )));
        }
        open.doc_no = Some(doc_no);
        Ok(())
    }

    /// Normalize body text and record each token against the open document.
    /// Text without tokens is accepted anywhere, so whitespace between
    /// documents is harmless.
    pub fn add_text(&mut self, text: &str) -> Result<()> {
        for token in normalize(text) {
            self.add_token(&token)?;
        }
        Ok(())
    }

    /// Record one already-normalized token.
    pub fn add_token(&mut self, term: &str) -> Result<()> {
        let open = self.current.as_mut().ok_or_else(|| {
            IndexError::malformed(format!("token {term:?} outside of any document"))
        })?;
        if term.len() > MAX_TERM_BYTES {
            return Err(IndexError::TermTooLong(term.len()));
        }
        let doc_id = open.doc_id;
        open.length += 1;

        if let Some(postings) = self.vocabulary.get_mut(term) {
            match postings.last_mut() {
                Some(last) if last.doc_id == doc_id => last.term_freq += 1,
                _ => postings.push(Posting { doc_id, term_freq: 1 }),
            }
        } else {
            self.vocabulary.insert(term.to_string(), vec![Posting { doc_id, term_freq: 1 }]);
        }
        Ok(())
    }

    pub fn end_document(&mut self) -> Result<()> {
        let open = self
            .current
            .take()
            .ok_or_else(|| IndexError::malformed("document end without a matching start"))?;
        let doc_no = open.doc_no.ok_or_else(|| {
            IndexError::malformed(format!("docId {} ended without an identifier", open.doc_id))
        })?;
        self.doc_lengths.push(open.length);
        self.doc_nos.push(doc_no);
        Ok(())
    }

    /// Begin, identify, fill and end one document in a single call.
    pub fn add_document(&mut self, doc_no: &str, body: &str) -> Result<DocId> {
        let doc_id = self.begin_document()?;
        self.set_doc_no(doc_no)?;
        self.add_text(body)?;
        self.end_document()?;
        Ok(doc_id)
    }

    pub fn finish(self) -> Result<InMemoryIndex> {
        if let Some(open) = self.current {
            return Err(IndexError::malformed(format!(
                "corpus ended inside docId {}",
                open.doc_id
            )));
        }
        Ok(InMemoryIndex {
            vocabulary: self.vocabulary,
            doc_lengths: self.doc_lengths,
            doc_nos: self.doc_nos,
        })
    }
}
