use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The corpus event stream broke the begin/docno/end protocol.
    #[error("malformed corpus: {0}")]
    MalformedCorpus(String),

    #[error("cannot access index artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index artifact {artifact} is truncated: {detail}")]
    Truncated { artifact: &'static str, detail: String },

    #[error("index artifact {artifact} is corrupt: {detail}")]
    Corrupt { artifact: &'static str, detail: String },

    /// A well-formed index never hands out such an id, so this means corruption.
    #[error("docId {doc_id} is out of range (index holds {num_docs} documents)")]
    DocIdOutOfRange { doc_id: DocId, num_docs: u32 },

    #[error("term of {0} bytes does not fit the one-byte length field")]
    TermTooLong(usize),

    #[error("{0} does not fit in a 4-byte field")]
    Overflow(&'static str),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        IndexError::MalformedCorpus(msg.into())
    }
}
