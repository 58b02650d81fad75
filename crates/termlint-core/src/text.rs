//! Text processing utilities.
//!
//! Provides sentence splitting, paragraph splitting, and offset-preserving
//! tokenization for the default segmentation service.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::Token;

/// Regex for decimal numbers (3.14, 2.5, etc.).
static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("valid regex"));

/// Regex for URLs.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)\S+").expect("valid regex"));

/// Regex for email addresses.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// Regex for initials (J.K., U.S.A., etc.).
static INITIALS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]\.(?:[A-Z]\.)*").expect("valid regex"));

/// Abbreviations that do not end a sentence when followed by a period.
static ABBREVIATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Titles
        "mr", "mrs", "ms", "dr", "prof", "rev", "sr", "jr", "st", "hon", "capt", "col", "gen",
        "lt", "maj", "sgt", "gov", "pres",
        // Latin and reference forms
        "etc", "vs", "e.g", "i.e", "cf", "viz", "al", "approx", "n.b", "p.s",
        // Business and document references
        "inc", "ltd", "corp", "llc", "dept", "div", "vol", "pp", "fig", "figs", "sec", "ch",
        "eq", "refs",
        // Dates and times (omitting ones that are also common words)
        "a.m", "p.m", "jan", "feb", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
        "dec", "tue", "thu", "fri",
        // Places
        "ave", "blvd", "mt",
    ]
    .into_iter()
    .collect()
});

/// Split text into sentences with abbreviation, decimal, URL, and email awareness.
///
/// Uses a character-by-character scan with context-based boundary detection.
/// Sentences shorter than three bytes after trimming are dropped.
#[tracing::instrument(skip_all, fields(text_len = text.len()))]
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let min_length = 3;
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        current.push(ch);

        if is_sentence_terminator(ch) {
            let context = extract_context(&chars, i);

            if is_sentence_boundary(&context, &current) {
                let sentence = current.trim().to_string();
                if sentence.len() >= min_length {
                    sentences.push(sentence);
                }
                current.clear();
            }
        }
    }

    let sentence = current.trim().to_string();
    if sentence.len() >= min_length {
        sentences.push(sentence);
    }

    sentences
}

/// Split text into paragraphs (separated by blank lines).
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split text into word and punctuation tokens with byte offsets.
///
/// Words are runs of alphanumeric characters. An apostrophe or hyphen
/// between two alphanumerics stays inside the word ("don't", "follow-up"),
/// as does a period between two digits ("3.14"). Every other
/// non-whitespace character becomes a single-character token.
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, ch) = chars[i];

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if !ch.is_alphanumeric() {
            let end = start + ch.len_utf8();
            tokens.push(Token {
                text: text[start..end].to_string(),
                start,
                end,
            });
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() {
            let c = chars[j].1;
            if c.is_alphanumeric() {
                j += 1;
                continue;
            }
            let next = chars.get(j + 1).map(|&(_, n)| n);
            let joins = match c {
                '\'' | '’' | '-' => next.is_some_and(char::is_alphanumeric),
                '.' => {
                    chars[j - 1].1.is_ascii_digit() && next.is_some_and(|n| n.is_ascii_digit())
                }
                _ => false,
            };
            if !joins {
                break;
            }
            j += 1;
        }

        let end = chars.get(j).map_or(text.len(), |&(offset, _)| offset);
        tokens.push(Token {
            text: text[start..end].to_string(),
            start,
            end,
        });
        i = j;
    }

    tokens
}

const fn is_sentence_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Context around a potential sentence boundary.
struct SentenceContext {
    punctuation: char,
    word_before: String,
    char_after: Option<char>,
    text_after: String,
    is_end_of_text: bool,
}

fn extract_context(chars: &[char], pos: usize) -> SentenceContext {
    let before = get_word_before(chars, pos);

    let mut after_start = pos + 1;
    while after_start < chars.len() && chars[after_start].is_whitespace() {
        after_start += 1;
    }

    SentenceContext {
        punctuation: chars[pos],
        word_before: before,
        char_after: chars.get(after_start).copied(),
        text_after: chars[after_start..].iter().take(20).collect(),
        is_end_of_text: pos == chars.len() - 1,
    }
}

fn get_word_before(chars: &[char], pos: usize) -> String {
    let mut i = pos;

    // Skip back past punctuation and whitespace
    while i > 0 {
        i -= 1;
        if !chars[i].is_whitespace() && chars[i] != '.' {
            break;
        }
    }

    let mut word_chars = Vec::new();
    loop {
        if chars[i].is_alphanumeric() || chars[i] == '.' {
            word_chars.push(chars[i]);
        } else {
            break;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    word_chars.reverse();
    word_chars.iter().collect()
}

fn is_sentence_boundary(context: &SentenceContext, current_sentence: &str) -> bool {
    if context.is_end_of_text {
        return true;
    }

    if context.punctuation == '!' || context.punctuation == '?' {
        return check_next_char_capitalization(context);
    }

    if is_likely_abbreviation(&context.word_before) || is_likely_initial(&context.word_before) {
        return false;
    }

    if current_sentence.ends_with("...") || ends_with_url_or_email(current_sentence) {
        return false;
    }

    // Digit after period following a digit = decimal number (e.g., "3.14")
    if let Some(next_char) = context.char_after
        && next_char.is_ascii_digit()
        && context
            .word_before
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_digit())
    {
        return false;
    }

    if let Some(next_char) = context.char_after {
        if next_char.is_uppercase() {
            return true;
        }
        if next_char.is_lowercase() {
            return false;
        }
    }

    !ends_with_decimal(current_sentence)
}

fn check_next_char_capitalization(context: &SentenceContext) -> bool {
    match context.char_after {
        Some(c) if c == '"' || c == '\'' => context
            .text_after
            .chars()
            .nth(1)
            .is_none_or(char::is_uppercase),
        Some(c) if c.is_lowercase() => false,
        _ => true,
    }
}

fn is_likely_abbreviation(word: &str) -> bool {
    let word_clean = word.trim_end_matches('.');
    if word_clean.is_empty() {
        return false;
    }
    if ABBREVIATIONS.contains(word_clean.to_lowercase().as_str()) {
        return true;
    }
    // Single uppercase letter = likely initial
    word_clean.len() == 1 && word_clean.chars().next().is_some_and(char::is_uppercase)
}

fn is_likely_initial(word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    if word.len() == 2
        && word.chars().next().is_some_and(char::is_uppercase)
        && word.ends_with('.')
    {
        return true;
    }
    INITIALS_PATTERN.is_match(word)
}

fn tail(sentence: &str, n: usize) -> &str {
    let start = sentence
        .char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    &sentence[start..]
}

fn ends_with_decimal(sentence: &str) -> bool {
    DECIMAL_PATTERN.is_match(tail(sentence, 10))
}

fn ends_with_url_or_email(sentence: &str) -> bool {
    let last_part = tail(sentence, 50);
    URL_PATTERN.is_match(last_part) || EMAIL_PATTERN.is_match(last_part)
}
