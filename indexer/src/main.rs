mod corpus;

use anyhow::{bail, Context, Result};
use clap::Parser;
use corpus::TrecScanner;
use okapi_core::persist::{save_index, save_meta, IndexPaths, IndexSummary, MetaFile, FORMAT_VERSION};
use okapi_core::{Accumulator, CorpusEvent};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const PROGRESS_EVERY: usize = 1000;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a BM25 inverted index from a TREC-style tagged corpus", long_about = None)]
struct Cli {
    /// Corpus file, or a directory whose files are indexed in path order
    corpus: PathBuf,
    /// Directory that receives the index artifacts
    #[arg(long, default_value = ".")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    build_index(&cli.corpus, &cli.output)?;
    Ok(())
}

fn build_index(corpus: &Path, output: &Path) -> Result<IndexSummary> {
    let files = corpus_files(corpus)?;
    if files.is_empty() {
        bail!("no corpus files found at {}", corpus.display());
    }

    let mut acc = Accumulator::new();
    for file in &files {
        tracing::info!(file = %file.display(), "scanning corpus file");
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("failed to open {}", file.display()))?,
        );
        for event in TrecScanner::new(reader) {
            let event = event.with_context(|| format!("failed to read {}", file.display()))?;
            let ends_document = event == CorpusEvent::EndDocument;
            acc.apply(event)
                .with_context(|| format!("cannot index {}", file.display()))?;
            if ends_document && acc.num_docs() % PROGRESS_EVERY == 0 {
                tracing::info!(num_docs = acc.num_docs(), "documents processed");
            }
        }
    }

    let index = acc.finish().context("corpus is incomplete")?;
    tracing::info!(
        num_docs = index.doc_lengths.len(),
        num_terms = index.vocabulary.len(),
        "ingested documents"
    );

    let paths = IndexPaths::new(output);
    let summary = save_index(&paths, &index)
        .with_context(|| format!("failed to write index to {}", output.display()))?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format build timestamp")?;
    let meta = MetaFile {
        num_docs: summary.num_docs,
        num_terms: summary.num_terms,
        num_postings: summary.num_postings,
        created_at,
        version: FORMAT_VERSION,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(output = %output.display(), num_postings = summary.num_postings, "index build complete");
    Ok(summary)
}

fn corpus_files(corpus: &Path) -> Result<Vec<PathBuf>> {
    if corpus.is_file() {
        return Ok(vec![corpus.to_path_buf()]);
    }
    if !corpus.is_dir() {
        bail!("corpus path {} does not exist", corpus.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(corpus).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", corpus.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use okapi_core::persist::load_meta;
    use okapi_core::{IndexReader, IndexView, Scorer};
    use std::fs;
    use tempfile::tempdir;

    const WSJ: &str = "\
<DOC>
<DOCNO> WSJ870323-0139 </DOCNO>
<HL> Italy's Commercial Bank </HL>
<TEXT>
Rosenfield said the commercial bank would seek unilateral representation.
</TEXT>
</DOC>
<DOC>
<DOCNO> WSJ870323-0140 </DOCNO>
<TEXT>
Wall Street traders were wary.
</TEXT>
</DOC>
";

    #[test]
    fn builds_a_searchable_index() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("wsj.xml");
        fs::write(&corpus, WSJ).unwrap();
        let out = dir.path().join("index");

        let summary = build_index(&corpus, &out).unwrap();
        assert_eq!(summary.num_docs, 2);

        let paths = IndexPaths::new(&out);
        let reader = IndexReader::open(&paths).unwrap();
        assert_eq!(reader.document_identifier(2).unwrap(), "WSJ870323-0140");
        assert_eq!(reader.document_length(1), 13);
        assert_eq!(reader.document_length(2), 5);

        let results = Scorer::new(&reader).search("rosenfield wall street").unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.doc_no.as_str()).collect();
        assert_eq!(ids, vec!["WSJ870323-0140", "WSJ870323-0139"]);

        let meta = load_meta(&paths).unwrap();
        assert_eq!(meta.num_docs, 2);
        time::OffsetDateTime::parse(&meta.created_at, &time::format_description::well_known::Rfc3339).unwrap();
    }

    #[test]
    fn directory_corpus_is_read_in_path_order() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        fs::create_dir_all(corpus.join("b")).unwrap();
        fs::write(corpus.join("a.xml"), "<DOC><DOCNO>A</DOCNO>alpha</DOC>").unwrap();
        fs::write(corpus.join("b/c.xml"), "<DOC><DOCNO>C</DOCNO>gamma</DOC>").unwrap();
        let out = dir.path().join("index");

        build_index(&corpus, &out).unwrap();
        let reader = IndexReader::open(&IndexPaths::new(&out)).unwrap();
        assert_eq!(reader.document_identifier(1).unwrap(), "A");
        assert_eq!(reader.document_identifier(2).unwrap(), "C");
    }

    #[test]
    fn unbalanced_corpus_aborts_without_artifacts() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("bad.xml");
        fs::write(&corpus, "<DOC><DOCNO>A</DOCNO>alpha</DOC></DOC>").unwrap();
        let out = dir.path().join("index");

        let err = build_index(&corpus, &out).unwrap_err();
        assert!(format!("{err:#}").contains("malformed corpus"));
        assert!(!out.join("index_words.bin").exists());
    }

    #[test]
    fn missing_corpus_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(build_index(&dir.path().join("nope"), dir.path()).is_err());
    }
}
