use crate::error::{IndexError, Result};
use crate::index::{average, lookup};
use crate::persist::{
    IndexPaths, IndexSummary, DOC_LENGTHS_FILE, DOC_NO_FILE, POSTINGS_FILE, POSTING_BYTES, WORDS_FILE,
};
use crate::{DocId, IndexView, Posting, TermEntry};
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A built index opened for querying.
///
/// The dictionary and per-document metadata are held in memory. Postings
/// stay on disk and are fetched with a seek per term through one shared
/// handle, so the reader can sit behind an `Arc` and serve concurrent
/// queries.
pub struct IndexReader {
    words: HashMap<String, TermEntry>,
    doc_lengths: Vec<u32>,
    doc_nos: Vec<String>,
    average_length: f64,
    postings_path: PathBuf,
    postings: Mutex<File>,
}

impl IndexReader {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let words = decode_words(&read_artifact(&paths.words())?)?;
        let doc_nos = decode_doc_nos(&read_artifact(&paths.doc_nos())?)?;
        let doc_lengths = decode_doc_lengths(&read_artifact(&paths.doc_lengths())?)?;
        if doc_lengths.len() != doc_nos.len() {
            return Err(IndexError::Corrupt {
                artifact: DOC_NO_FILE,
                detail: format!(
                    "{} identifiers but {} document lengths",
                    doc_nos.len(),
                    doc_lengths.len()
                ),
            });
        }

        let postings_path = paths.postings();
        let file = File::open(&postings_path).map_err(|e| IndexError::io(&postings_path, e))?;
        let size = file.metadata().map_err(|e| IndexError::io(&postings_path, e))?.len();
        if size % POSTING_BYTES != 0 {
            return Err(IndexError::Truncated {
                artifact: POSTINGS_FILE,
                detail: format!("{size} bytes is not a whole number of postings"),
            });
        }
        let total_pairs = size / POSTING_BYTES;
        for (term, entry) in &words {
            let end = entry.offset as u64 + entry.count as u64;
            if end > total_pairs {
                return Err(IndexError::Truncated {
                    artifact: POSTINGS_FILE,
                    detail: format!("postings of {term:?} end at pair {end}, file holds {total_pairs}"),
                });
            }
        }

        let average_length = average(&doc_lengths);
        tracing::info!(
            root = %paths.root.display(),
            num_docs = doc_lengths.len(),
            num_terms = words.len(),
            "index loaded"
        );
        Ok(Self { words, doc_lengths, doc_nos, average_length, postings_path, postings: Mutex::new(file) })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.words.len()
    }

    pub fn term_entry(&self, term: &str) -> Option<TermEntry> {
        self.words.get(term).copied()
    }

    /// Every term with its postings location, in no particular order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, TermEntry)> + '_ {
        self.words.iter().map(|(term, entry)| (term.as_str(), *entry))
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            num_docs: self.num_docs(),
            num_terms: self.words.len() as u32,
            num_postings: self.words.values().map(|e| e.count as u64).sum(),
        }
    }

    fn read_postings(&self, entry: TermEntry) -> Result<Vec<Posting>> {
        let mut buf = vec![0u8; entry.count as usize * POSTING_BYTES as usize];
        {
            let mut file = self.postings.lock();
            file.seek(SeekFrom::Start(entry.offset as u64 * POSTING_BYTES))
                .map_err(|e| IndexError::io(&self.postings_path, e))?;
            file.read_exact(&mut buf).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => IndexError::Truncated {
                    artifact: POSTINGS_FILE,
                    detail: format!("{} postings at pair {} run past the end", entry.count, entry.offset),
                },
                _ => IndexError::io(&self.postings_path, e),
            })?;
        }
        Ok(buf
            .chunks_exact(POSTING_BYTES as usize)
            .map(|pair| Posting {
                doc_id: LittleEndian::read_u32(&pair[..4]),
                term_freq: LittleEndian::read_u32(&pair[4..]),
            })
            .collect())
    }
}

impl IndexView for IndexReader {
    fn num_docs(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    fn average_document_length(&self) -> f64 {
        self.average_length
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
        match self.words.get(term) {
            Some(&entry) => self.read_postings(entry),
            None => Ok(Vec::new()),
        }
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| IndexError::io(path, e))
}

/// Bounds-checked cursor over a fully loaded artifact.
struct Decoder<'a> {
    artifact: &'static str,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(artifact: &'static str, buf: &'a [u8]) -> Self {
        Self { artifact, buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(IndexError::Truncated {
                artifact: self.artifact,
                detail: format!(
                    "{what} needs {n} bytes at offset {}, only {} left",
                    self.pos,
                    self.remaining()
                ),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, what)?))
    }

    fn corrupt(&self, detail: String) -> IndexError {
        IndexError::Corrupt { artifact: self.artifact, detail }
    }
}

fn decode_words(buf: &[u8]) -> Result<HashMap<String, TermEntry>> {
    let mut d = Decoder::new(WORDS_FILE, buf);
    let count = d.u32("vocabulary size")?;
    // Each record is at least nine bytes, which bounds a sane preallocation.
    let mut words = HashMap::with_capacity((count as usize).min(d.remaining() / 9));
    for _ in 0..count {
        let len = d.u8("term length")? as usize;
        let bytes = d.take(len, "term")?;
        let term = std::str::from_utf8(bytes)
            .map_err(|_| d.corrupt(format!("term at offset {} is not UTF-8", d.pos - len)))?
            .to_string();
        let entry = TermEntry { offset: d.u32("postings offset")?, count: d.u32("postings count")? };
        if words.insert(term, entry).is_some() {
            return Err(d.corrupt(format!("duplicate term ending at offset {}", d.pos)));
        }
    }
    if d.remaining() != 0 {
        return Err(d.corrupt(format!("{} trailing bytes after {count} terms", d.remaining())));
    }
    Ok(words)
}

fn decode_doc_nos(buf: &[u8]) -> Result<Vec<String>> {
    let body = match buf.split_last() {
        None => return Ok(Vec::new()),
        Some((&0, body)) => body,
        Some(_) => {
            return Err(IndexError::Truncated {
                artifact: DOC_NO_FILE,
                detail: "last identifier is not NUL-terminated".into(),
            })
        }
    };
    body.split(|&b| b == 0)
        .enumerate()
        .map(|(i, raw)| {
            String::from_utf8(raw.to_vec()).map_err(|_| IndexError::Corrupt {
                artifact: DOC_NO_FILE,
                detail: format!("identifier of docId {} is not UTF-8", i + 1),
            })
        })
        .collect()
}

fn decode_doc_lengths(buf: &[u8]) -> Result<Vec<u32>> {
    if buf.len() % 4 != 0 {
        return Err(IndexError::Truncated {
            artifact: DOC_LENGTHS_FILE,
            detail: format!("{} bytes is not a whole number of lengths", buf.len()),
        });
    }
    Ok(buf.chunks_exact(4).map(LittleEndian::read_u32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_word_records() {
        let mut buf = vec![2, 0, 0, 0];
        buf.extend_from_slice(&[2, b'h', b'i', 0, 0, 0, 0, 3, 0, 0, 0]);
        buf.extend_from_slice(&[1, b'a', 3, 0, 0, 0, 1, 0, 0, 0]);
        let words = decode_words(&buf).unwrap();
        assert_eq!(words["hi"], TermEntry { offset: 0, count: 3 });
        assert_eq!(words["a"], TermEntry { offset: 3, count: 1 });
    }

    #[test]
    fn short_word_record_is_truncated() {
        let buf = [1, 0, 0, 0, 5, b'a', b'b'];
        assert!(matches!(
            decode_words(&buf),
            Err(IndexError::Truncated { artifact: WORDS_FILE, .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let buf = [0, 0, 0, 0, 7];
        assert!(matches!(decode_words(&buf), Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn doc_nos_split_on_nul() {
        assert_eq!(decode_doc_nos(b"WSJ-1\0WSJ-2\0").unwrap(), vec!["WSJ-1", "WSJ-2"]);
        assert!(decode_doc_nos(b"").unwrap().is_empty());
        assert!(matches!(decode_doc_nos(b"WSJ-1\0WSJ"), Err(IndexError::Truncated { .. })));
    }

    #[test]
    fn doc_lengths_need_whole_words() {
        assert_eq!(decode_doc_lengths(&[3, 0, 0, 0, 1, 1, 0, 0]).unwrap(), vec![3, 257]);
        assert!(decode_doc_lengths(&[3, 0, 0]).is_err());
    }
}
