//! On-disk layout of a built index.
//!
//! Four flat artifacts, all integers 4-byte little-endian:
//!
//! * `index_docLengths.bin`: one length per document, in docId order.
//! * `index_docNo.bin`: document identifiers, each followed by a `0x00`.
//! * `index_words.bin`: term count, then per term a 1-byte length, the term
//!   bytes, the postings offset and the postings count.
//! * `index_wordPostings.bin`: `(docId, termFreq)` pairs, grouped per term in
//!   vocabulary order. Offsets count pairs, not bytes.
//!
//! `index_meta.json` is a human-readable manifest written next to them.

use crate::error::{IndexError, Result};
use crate::InMemoryIndex;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DOC_LENGTHS_FILE: &str = "index_docLengths.bin";
pub const DOC_NO_FILE: &str = "index_docNo.bin";
pub const WORDS_FILE: &str = "index_words.bin";
pub const POSTINGS_FILE: &str = "index_wordPostings.bin";
pub const META_FILE: &str = "index_meta.json";

pub const FORMAT_VERSION: u32 = 1;
/// Bytes per `(docId, termFreq)` pair in the postings artifact.
pub const POSTING_BYTES: u64 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_postings: u64,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_postings: u64,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn doc_lengths(&self) -> PathBuf { self.root.join(DOC_LENGTHS_FILE) }
    pub fn doc_nos(&self) -> PathBuf { self.root.join(DOC_NO_FILE) }
    pub fn words(&self) -> PathBuf { self.root.join(WORDS_FILE) }
    pub fn postings(&self) -> PathBuf { self.root.join(POSTINGS_FILE) }
    pub fn meta(&self) -> PathBuf { self.root.join(META_FILE) }
}

/// Buffered writer over a temporary file that only takes the artifact's
/// real name once [`commit`] runs.
struct ArtifactWriter {
    path: PathBuf,
    out: BufWriter<NamedTempFile>,
}

struct Staged {
    path: PathBuf,
    temp: NamedTempFile,
}

impl ArtifactWriter {
    fn create(root: &Path, path: PathBuf) -> Result<Self> {
        let temp = NamedTempFile::new_in(root).map_err(|e| IndexError::io(&path, e))?;
        Ok(Self { path, out: BufWriter::new(temp) })
    }

    fn put_u8(&mut self, value: u8) -> Result<()> {
        self.out.write_u8(value).map_err(|e| IndexError::io(&self.path, e))
    }

    fn put_u32(&mut self, value: u32) -> Result<()> {
        self.out.write_u32::<LittleEndian>(value).map_err(|e| IndexError::io(&self.path, e))
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes).map_err(|e| IndexError::io(&self.path, e))
    }

    fn finish(self) -> Result<Staged> {
        let path = self.path;
        let temp = self.out.into_inner().map_err(|e| IndexError::io(&path, e.into_error()))?;
        temp.as_file().sync_all().map_err(|e| IndexError::io(&path, e))?;
        Ok(Staged { path, temp })
    }
}

/// Rename every staged artifact into place. Each rename is atomic on its
/// own; a crash part way through can leave artifacts from two builds.
fn commit(staged: Vec<Staged>) -> Result<()> {
    for Staged { path, temp } in staged {
        temp.persist(&path).map_err(|e| IndexError::io(&path, e.error))?;
    }
    Ok(())
}

fn to_u32(value: u64, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| IndexError::Overflow(what))
}

/// Write the four index artifacts under `paths.root`. Nothing is replaced
/// unless all four were written completely.
pub fn save_index(paths: &IndexPaths, index: &InMemoryIndex) -> Result<IndexSummary> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;

    let mut lengths = ArtifactWriter::create(&paths.root, paths.doc_lengths())?;
    for &length in &index.doc_lengths {
        lengths.put_u32(length)?;
    }

    let mut doc_nos = ArtifactWriter::create(&paths.root, paths.doc_nos())?;
    for doc_no in &index.doc_nos {
        if doc_no.contains('\0') {
            return Err(IndexError::malformed(format!("identifier {doc_no:?} contains a NUL byte")));
        }
        doc_nos.put_bytes(doc_no.as_bytes())?;
        doc_nos.put_u8(0)?;
    }

    let mut words = ArtifactWriter::create(&paths.root, paths.words())?;
    let mut postings = ArtifactWriter::create(&paths.root, paths.postings())?;
    let terms = index.sorted_terms();
    let num_terms = to_u32(terms.len() as u64, "vocabulary size")?;
    words.put_u32(num_terms)?;

    // Running count of pairs already written: the next term's offset.
    let mut written: u64 = 0;
    for term in terms {
        let list = &index.vocabulary[term];
        let term_len = u8::try_from(term.len()).map_err(|_| IndexError::TermTooLong(term.len()))?;
        words.put_u8(term_len)?;
        words.put_bytes(term.as_bytes())?;
        words.put_u32(to_u32(written, "postings offset")?)?;
        words.put_u32(to_u32(list.len() as u64, "postings count")?)?;
        for posting in list {
            postings.put_u32(posting.doc_id)?;
            postings.put_u32(posting.term_freq)?;
        }
        written += list.len() as u64;
    }

    let summary = IndexSummary {
        num_docs: to_u32(index.doc_lengths.len() as u64, "document count")?,
        num_terms,
        num_postings: written,
    };
    let staged = vec![lengths.finish()?, doc_nos.finish()?, words.finish()?, postings.finish()?];
    commit(staged)?;
    tracing::debug!(root = %paths.root.display(), ?summary, "index artifacts written");
    Ok(summary)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let path = paths.meta();
    let mut f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    serde_json::to_writer_pretty(&mut f, meta).map_err(|e| IndexError::io(&path, e.into()))?;
    f.write_all(b"\n").map_err(|e| IndexError::io(&path, e))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| IndexError::Corrupt { artifact: META_FILE, detail: e.to_string() })
}
