use std::str::Chars;

/// Longest term the on-disk vocabulary can hold: its length prefix is a
/// single byte. Truncation exists because of the format, so changing one
/// means revisiting the other.
pub const MAX_TERM_BYTES: usize = u8::MAX as usize;

/// Lazy token stream over a piece of text. A clone is an independent cursor;
/// calling [`normalize`] again starts over.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    chars: Chars<'a>,
    prev_alnum: bool,
}

/// Split text into lowercase alphanumeric terms, keeping inner hyphens
/// ("well-being") and dropping leading ones ("-being" -> "being"). A dash
/// run keeps only its first hyphen ("well--being" -> "well-being").
///
/// Indexing and querying both go through this function; any divergence
/// between the two paths costs recall.
pub fn normalize(text: &str) -> Tokens<'_> {
    Tokens { chars: text.chars(), prev_alnum: false }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut token = String::new();
        for c in self.chars.by_ref() {
            let prev_alnum = self.prev_alnum;
            self.prev_alnum = c.is_ascii_alphanumeric();
            if c.is_ascii_alphabetic() {
                token.push(c.to_ascii_lowercase());
            } else if c.is_ascii_digit() || (c == '-' && prev_alnum) {
                token.push(c);
            } else if c == '-' {
                // A hyphen after a non-alphanumeric is dropped without ending the token.
            } else if !token.is_empty() {
                return Some(truncate(token));
            }
        }
        if token.is_empty() {
            None
        } else {
            Some(truncate(token))
        }
    }
}

// Tokens are pure ASCII, so any byte index is a char boundary.
fn truncate(mut token: String) -> String {
    token.truncate(MAX_TERM_BYTES);
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        normalize(text).collect()
    }

    #[test]
    fn lowercases_and_splits() {
        assert_eq!(terms("Rosenfield, Wall-Street 1987!"), vec!["rosenfield", "wall-street", "1987"]);
    }

    #[test]
    fn tags_are_separators() {
        assert_eq!(terms("<TEXT>stocks</TEXT>"), vec!["text", "stocks", "text"]);
    }

    #[test]
    fn hyphen_needs_alnum_predecessor() {
        assert_eq!(terms("well-being"), vec!["well-being"]);
        assert_eq!(terms("-being"), vec!["being"]);
        assert_eq!(terms("a--b"), vec!["a-b"]);
        assert_eq!(terms("well--being"), vec!["well-being"]);
        assert_eq!(terms("x -- y"), vec!["x", "y"]);
    }

    #[test]
    fn non_ascii_letters_separate_tokens() {
        assert_eq!(terms("café au lait"), vec!["caf", "au", "lait"]);
    }

    #[test]
    fn no_empty_tokens() {
        assert!(terms("  ,,, -- !!").is_empty());
        assert!(terms("").is_empty());
    }

    #[test]
    fn restarting_yields_same_sequence() {
        let tokens = normalize("one two three");
        let first: Vec<String> = tokens.clone().collect();
        let second: Vec<String> = tokens.collect();
        assert_eq!(first, second);
    }
}
