//! Splits raw typed text into a book search string and a chapter/verse pair.
//!
//! Parsing is deliberately lenient: anything that is not a usable number
//! falls back to 1 so the display always has something plausible to show
//! while the user is mid-word.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::abbreviations::AbbreviationTable;

/// Optional leading 1-3 followed by space separated words.
static BOOK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[1-3]\s*)?[A-Z]+(?:\s+[A-Z]+)*").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{P}\s]+").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    /// `None` when the input holds no book token yet.
    pub book_search: Option<String>,
    pub chapter: usize,
    pub verse: usize,
}

/// Parses the whole input line.
pub fn parse(input: &str, abbreviations: &AbbreviationTable) -> ParsedReference {
    let upper = input.to_uppercase();
    let raw_book = BOOK_TOKEN.find(&upper).map_or("", |m| m.as_str());
    let remainder = upper[raw_book.len()..].trim();

    let book_search = normalize_book(raw_book.trim(), abbreviations);
    let (chapter, verse) = parse_chapter_verse(remainder);

    ParsedReference {
        book_search,
        chapter,
        verse,
    }
}

/// Turns an extracted book token into the string handed to the ranker.
///
/// Abbreviations are looked up first, then `1`/`2`/`3` become ordinal words
/// in whichever string resulted, then the result is uppercased.
pub fn normalize_book(token: &str, abbreviations: &AbbreviationTable) -> Option<String> {
    let token = token.trim().to_uppercase();
    if token.is_empty() {
        return None;
    }

    let base = abbreviations.get(&token).unwrap_or(&token);
    let spelled = base
        .replace('1', "FIRST")
        .replace('2', "SECOND")
        .replace('3', "THIRD");
    Some(spelled.to_uppercase())
}

/// Reads `chapter[sep verse]`. Empty input means chapter 1 verse 1.
pub fn parse_chapter_verse(reference: &str) -> (usize, usize) {
    let reference = reference.trim();
    if reference.is_empty() {
        return (1, 1);
    }

    let parts: Vec<&str> = SEPARATORS.split(reference).collect();
    match parts.as_slice() {
        [only] => match leading_number(only) {
            chapter if chapter > 0 => (chapter, 1),
            _ => (1, 1),
        },
        [chapter, verse, ..] => (leading_number(chapter), leading_number(verse).max(1)),
        [] => (1, 1),
    }
}

/// First run of digits in `token`, 0 when there is none or it overflows.
fn leading_number(token: &str) -> usize {
    DIGITS
        .find(token)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
