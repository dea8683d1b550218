//! Recipe search query parsing and matching.
//!
//! Queries are free text plus `label:<name>` terms. Double quotes group words,
//! so `label:"Viande rouge"` is one label. Matching ignores case and accents.

use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Default, PartialEq)]
pub struct ParsedQuery {
    /// Normalized text terms; every one must appear in the title.
    pub text: Vec<String>,
    /// Normalized label names; the recipe must carry all of them.
    pub labels: Vec<String>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.labels.is_empty()
    }

    pub fn matches<'a, I>(&self, title: &str, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let title = normalize(title);
        if !self.text.iter().all(|term| title.contains(term.as_str())) {
            return false;
        }
        if self.labels.is_empty() {
            return true;
        }
        let recipe_labels: Vec<String> = labels.into_iter().map(normalize).collect();
        self.labels
            .iter()
            .all(|wanted| recipe_labels.iter().any(|l| l == wanted))
    }
}

/// Lowercases and strips combining accents (NFD, then drop U+0300..U+036F).
pub fn normalize(s: &str) -> String {
    s.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
}

pub fn parse_query(q: &str) -> ParsedQuery {
    let mut result = ParsedQuery::default();

    for token in tokenize(q) {
        if let Some(label) = token.strip_prefix("label:") {
            let label = normalize(label.trim());
            if !label.is_empty() {
                result.labels.push(label);
            }
        } else {
            let term = normalize(token.trim());
            if !term.is_empty() {
                result.text.push(term);
            }
        }
    }

    result
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
