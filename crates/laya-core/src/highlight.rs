//! Query-term highlighting for rendered hits.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
        }
    }

    fn marked(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: true,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive matcher for the whitespace-separated tokens of `query`.
///
/// Tokens are escaped, so punctuation is matched literally. A word boundary is
/// required on each side of a token that starts or ends with a word character,
/// which makes `cat` match in "The cat sat" but not in "category".
pub fn build_matcher(query: &str) -> Option<Regex> {
    let mut tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    // Longest first so "cats" wins over "cat" at the same position.
    tokens.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    tokens.dedup();

    let alternatives: Vec<String> = tokens
        .iter()
        .map(|token| {
            let mut pattern = String::new();
            if token.chars().next().is_some_and(is_word_char) {
                pattern.push_str(r"\b");
            }
            pattern.push_str(&regex::escape(token));
            if token.chars().last().is_some_and(is_word_char) {
                pattern.push_str(r"\b");
            }
            pattern
        })
        .collect();

    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Split `text` into plain and highlighted segments.
pub fn highlight(text: &str, query: &str) -> Vec<Segment> {
    match build_matcher(query) {
        Some(re) => highlight_with(text, &re),
        None => vec![Segment::plain(text)],
    }
}

pub fn highlight_with(text: &str, re: &Regex) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in re.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::plain(&text[last..m.start()]));
        }
        segments.push(Segment::marked(m.as_str()));
        last = m.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[last..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(segments: &[Segment]) -> Vec<&str> {
        segments.iter().filter(|s| s.highlighted).map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_marks_only_matching_token() {
        let segments = highlight("The cat sat", "cat dog");
        assert_eq!(marked(&segments), vec!["cat"]);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, "The cat sat");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(marked(&highlight("CAT and Cat", "cat")), vec!["CAT", "Cat"]);
    }

    #[test]
    fn test_whole_tokens_only() {
        assert!(marked(&highlight("category", "cat")).is_empty());
    }

    #[test]
    fn test_punctuation_is_literal() {
        assert_eq!(marked(&highlight("use c++ or c", "c++")), vec!["c++"]);
        assert!(marked(&highlight("a.b", "(a")).is_empty());
    }

    #[test]
    fn test_blank_query_returns_text() {
        assert_eq!(highlight("plain", "   "), vec![Segment::plain("plain")]);
        assert_eq!(highlight("", "x"), vec![Segment::plain("")]);
    }
}
