use okapi_core::CorpusEvent;
use std::collections::VecDeque;
use std::io::{self, BufRead};

/// Streams a TREC-style collection (`<DOC>`, `<DOCNO>`, free text and other
/// tags) as corpus events, without holding more than one text run in memory.
pub struct TrecScanner<R> {
    reader: R,
    state: ScanState,
    done: bool,
}

#[derive(Default)]
struct ScanState {
    pending: VecDeque<CorpusEvent>,
    text: Vec<u8>,
    tag: Vec<u8>,
    in_tag: bool,
    in_docno: bool,
}

impl<R: BufRead> TrecScanner<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, state: ScanState::default(), done: false }
    }
}

impl<R: BufRead> Iterator for TrecScanner<R> {
    type Item = io::Result<CorpusEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.state.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            if buf.is_empty() {
                self.done = true;
                self.state.finish();
                continue;
            }
            for &b in buf {
                self.state.feed(b);
            }
            let n = buf.len();
            self.reader.consume(n);
        }
    }
}

impl ScanState {
    fn feed(&mut self, b: u8) {
        if self.in_tag {
            if b == b'>' {
                self.in_tag = false;
                self.close_tag();
            } else {
                self.tag.push(b);
            }
        } else if b == b'<' {
            self.flush_text();
            self.in_tag = true;
            self.tag.clear();
        } else {
            self.text.push(b);
        }
    }

    // DOCNO content is held back until its closing tag.
    fn flush_text(&mut self) {
        if self.in_docno || self.text.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.text).into_owned();
        self.pending.push_back(CorpusEvent::Text(text));
        self.text.clear();
    }

    fn close_tag(&mut self) {
        let tag = String::from_utf8_lossy(&self.tag);
        let name = tag.split_whitespace().next().unwrap_or("");
        if name.eq_ignore_ascii_case("DOC") {
            self.pending.push_back(CorpusEvent::BeginDocument);
        } else if name.eq_ignore_ascii_case("/DOC") {
            self.pending.push_back(CorpusEvent::EndDocument);
        } else if name.eq_ignore_ascii_case("DOCNO") {
            self.in_docno = true;
        } else if name.eq_ignore_ascii_case("/DOCNO") {
            if self.in_docno {
                let doc_no = String::from_utf8_lossy(&self.text).trim().to_string();
                self.pending.push_back(CorpusEvent::DocNo(doc_no));
                self.text.clear();
                self.in_docno = false;
            } else {
                tracing::warn!("ignoring </DOCNO> without an opening tag");
            }
        }
    }

    fn finish(&mut self) {
        if self.in_tag {
            tracing::warn!(tag = %String::from_utf8_lossy(&self.tag), "corpus ends inside a tag");
        }
        if self.in_docno {
            tracing::warn!("corpus ends inside <DOCNO>");
            self.in_docno = false;
            self.text.clear();
        }
        self.flush_text();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn scan(input: &str) -> Vec<CorpusEvent> {
        TrecScanner::new(input.as_bytes()).collect::<io::Result<_>>().unwrap()
    }

    fn text(s: &str) -> CorpusEvent {
        CorpusEvent::Text(s.to_string())
    }

    #[test]
    fn emits_document_boundaries_and_identifier() {
        let events = scan("<DOC>\n<DOCNO> WSJ870324-0001 </DOCNO>\n<HL>Stocks rally</HL>\n</DOC>\n");
        assert_eq!(
            events,
            vec![
                CorpusEvent::BeginDocument,
                text("\n"),
                CorpusEvent::DocNo("WSJ870324-0001".into()),
                text("\n"),
                text("Stocks rally"),
                text("\n"),
                CorpusEvent::EndDocument,
                text("\n"),
            ]
        );
    }

    #[test]
    fn tags_with_attributes_and_lowercase_names() {
        let events = scan("<doc id=\"7\"><docno>X-7</docno>body</doc>");
        assert_eq!(
            events,
            vec![
                CorpusEvent::BeginDocument,
                CorpusEvent::DocNo("X-7".into()),
                text("body"),
                CorpusEvent::EndDocument,
            ]
        );
    }

    #[test]
    fn text_survives_small_read_buffers() {
        let input = "<DOC><DOCNO>D1</DOCNO><TEXT>interest rates rose</TEXT></DOC>";
        let reader = BufReader::with_capacity(3, input.as_bytes());
        let events: Vec<CorpusEvent> = TrecScanner::new(reader).collect::<io::Result<_>>().unwrap();
        assert!(events.contains(&CorpusEvent::DocNo("D1".into())));
        assert!(events.contains(&text("interest rates rose")));
    }

    #[test]
    fn trailing_text_is_flushed() {
        assert_eq!(scan("</DOC>tail"), vec![CorpusEvent::EndDocument, text("tail")]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes: &[u8] = b"<DOC>caf\xe9</DOC>";
        let events: Vec<CorpusEvent> = TrecScanner::new(bytes).collect::<io::Result<_>>().unwrap();
        assert_eq!(events[1], text("caf\u{fffd}"));
    }
}
