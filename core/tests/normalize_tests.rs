use okapi_core::normalize::{normalize, MAX_TERM_BYTES};

fn terms(text: &str) -> Vec<String> {
    normalize(text).collect()
}

#[test]
fn normalized_token_is_unchanged() {
    for token in ["apple", "wsj870323", "well-being", "1987"] {
        assert_eq!(terms(token), vec![token.to_string()]);
    }
}

#[test]
fn hyphen_rule() {
    assert_eq!(terms("well-being"), vec!["well-being"]);
    assert_eq!(terms("-being"), vec!["being"]);
    assert_eq!(terms("pre- and post-war"), vec!["pre-", "and", "post-war"]);
}

#[test]
fn dash_runs_do_not_split_words() {
    assert_eq!(terms("well--being a--b"), vec!["well-being", "a-b"]);
    assert_eq!(terms("rates---again"), vec!["rates-again"]);
    assert_eq!(terms("end -- start"), vec!["end", "start"]);
}

#[test]
fn long_runs_are_truncated_to_the_length_field() {
    let text = "a".repeat(300);
    let toks = terms(&text);
    assert_eq!(toks.len(), 1);
    assert_eq!(toks[0].len(), MAX_TERM_BYTES);
    assert_eq!(MAX_TERM_BYTES, 255);
}

#[test]
fn truncation_matches_at_query_time() {
    let long = format!("{}tail", "x".repeat(260));
    assert_eq!(terms(&long), terms(&long.to_uppercase()));
}

#[test]
fn markup_and_punctuation_split_tokens() {
    assert_eq!(
        terms("<HL>Stocks Rally</HL> Dow +2.5%"),
        vec!["hl", "stocks", "rally", "hl", "dow", "2", "5"]
    );
}
