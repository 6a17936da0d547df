//! Word-level inverted index with Okapi BM25 ranking.
//!
//! Build side: [`Accumulator`] turns a stream of [`CorpusEvent`]s into an
//! [`InMemoryIndex`], which [`persist::save_index`] writes as four flat
//! artifacts. Query side: [`IndexReader`] loads the dictionary and document
//! metadata and [`bm25::Scorer`] ranks documents for a free-text query.
//! Both sides tokenize through [`normalize::normalize`].

pub mod accumulator;
pub mod bm25;
pub mod error;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod reader;

pub use accumulator::{Accumulator, CorpusEvent};
pub use bm25::{Bm25Params, ScoredDoc, Scorer};
pub use error::{IndexError, Result};
pub use index::{DocId, InMemoryIndex, IndexView, Posting, TermEntry, TermFreq};
pub use reader::IndexReader;
