//! Keyword normalization of record cells
//!
//! Descriptive cells are reduced to comma-separated lemma keywords and then
//! every cell goes through a final pass that yields the persisted form: a
//! space-separated list of distinct tokens without `nan` placeholders.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::domain::record::CanonicalRecord;

/// Standard English stopword list (NLTK corpus).
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Irregular plural nouns. No value is itself a key.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("people", "person"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("mice", "mouse"),
    ("leaves", "leaf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("halves", "half"),
    ("shelves", "shelf"),
    ("scarves", "scarf"),
    ("wolves", "wolf"),
    ("loaves", "loaf"),
    ("thieves", "thief"),
];

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

static IRREGULAR: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| IRREGULAR_PLURALS.iter().copied().collect());

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Noun lemma of a lowercase word.
///
/// Irregular plurals come from a fixed table; regular plurals lose their
/// suffix (`-ies` to `-y`, `-sses`, `-xes`, `-ches`, `-shes`, `-zzes` lose
/// `-es`, otherwise a final `-s`). Lemmatizing a lemma returns it unchanged.
pub fn lemmatize(word: &str) -> String {
    if let Some(lemma) = IRREGULAR.get(word) {
        return (*lemma).to_string();
    }
    let stem = strip_plural_suffix(word);
    match IRREGULAR.get(stem.as_str()) {
        Some(lemma) => (*lemma).to_string(),
        None => stem,
    }
}

fn strip_plural_suffix(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    if len > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{stem}y");
        }
    }
    if ["sses", "xes", "ches", "shes", "zzes"].iter().any(|suffix| word.ends_with(suffix)) {
        // the suffixes are ASCII, so the cut stays on a char boundary
        return word[..word.len() - 2].to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Words of a phrase: runs of alphanumerics, apostrophes and hyphens, with
/// leading and trailing punctuation stripped.
fn tokenize(phrase: &str) -> impl Iterator<Item = &str> {
    phrase
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|token| token.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|token| !token.is_empty())
}

/// Reduce a comma-separated cell to comma-separated lemma keywords.
///
/// Tokens that are not purely alphabetic or are stopwords are discarded.
pub fn extract_keywords(cell: &str) -> String {
    let mut keywords = Vec::new();
    for phrase in cell.split(',') {
        for token in tokenize(phrase) {
            let token = token.to_lowercase();
            if !token.chars().all(char::is_alphabetic) || is_stopword(&token) {
                continue;
            }
            let lemma = lemmatize(&token);
            if !is_stopword(&lemma) {
                keywords.push(lemma);
            }
        }
    }
    keywords.join(", ")
}

/// Final pass: split on commas, drop blanks and `nan`, keep the first
/// occurrence of each token and join with single spaces.
///
/// Tokens are the comma-separated items, so repeats inside one item
/// (`"M M"`) are kept as written.
pub fn clean_cell(cell: &str) -> String {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for token in cell.split(',').map(str::trim) {
        if token.is_empty() || token.eq_ignore_ascii_case("nan") {
            continue;
        }
        if seen.insert(token) {
            tokens.push(token);
        }
    }
    tokens.join(" ")
}

/// Persisted form of a descriptive cell. Absent or `NaN` input gives `""`.
pub fn normalize_cell(value: &str) -> String {
    clean_cell(&extract_keywords(value))
}

/// Normalize every cell of a record.
///
/// Descriptive attribute columns get keyword extraction; size codes, the
/// name and the price only get the final pass. Link and code are
/// identifiers and are left as they are. Cells that end up empty are
/// removed from the record.
pub fn normalize_record(mut record: CanonicalRecord) -> CanonicalRecord {
    let columns: Vec<_> = record.attributes.keys().copied().collect();
    for column in columns {
        let Some(value) = record.attributes.get(&column) else {
            continue;
        };
        let normalized = if column.is_descriptive() {
            normalize_cell(value)
        } else {
            clean_cell(value)
        };
        record.set(column, normalized);
    }
    record.name = clean_cell(&record.name);
    record.price = clean_cell(&record.price);
    record
}
