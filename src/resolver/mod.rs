use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::corpus::{ChapterLabel, Corpus};
use crate::reference::ParsedReference;

/// Ranks candidate strings against a query.
///
/// Returns indices into `candidates`, best first. Non-matching candidates
/// are left out, so an empty result means nothing matched.
pub trait BookRanker {
    fn rank(&self, query: &str, candidates: &[String]) -> Vec<usize>;
}

/// Skim-style subsequence scoring.
pub struct SkimRanker {
    matcher: SkimMatcherV2,
}

impl SkimRanker {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
        }
    }
}

impl Default for SkimRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl BookRanker for SkimRanker {
    fn rank(&self, query: &str, candidates: &[String]) -> Vec<usize> {
        let mut scored: Vec<(usize, i64)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, candidate)| {
                self.matcher
                    .fuzzy_match(candidate, query)
                    .map(|score| (idx, score))
            })
            .collect();
        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().map(|(idx, _)| idx).collect()
    }
}

/// A bounds-checked reference with its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVerse {
    pub book: String,
    pub chapter: usize,
    pub verse: usize,
    pub text: String,
}

impl ResolvedVerse {
    /// `book chapter:verse text`, the form shown and saved.
    pub fn display_text(&self) -> String {
        format!("{} {}:{} {}", self.book, self.chapter, self.verse, self.text)
    }

    pub fn citation(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// Outcome of resolving one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No book token typed yet.
    Idle,
    BookUnresolved {
        search: String,
    },
    ChapterOutOfRange {
        book: String,
        label: ChapterLabel,
        chapter: usize,
    },
    VerseOutOfRange {
        book: String,
        label: ChapterLabel,
        chapter: usize,
        verse: usize,
    },
    Resolved(ResolvedVerse),
}

impl Lookup {
    pub fn resolved(&self) -> Option<&ResolvedVerse> {
        match self {
            Lookup::Resolved(verse) => Some(verse),
            _ => None,
        }
    }

    /// The single feedback line for non-resolved states.
    pub fn message(&self) -> Option<String> {
        match self {
            Lookup::Idle | Lookup::Resolved(_) => None,
            Lookup::BookUnresolved { search } => {
                Some(format!("{} does not exist in the Bible.", search))
            }
            Lookup::ChapterOutOfRange {
                book,
                label,
                chapter,
            } => Some(format!(
                "{} {} does not exist in {}",
                label.as_str(),
                chapter,
                book
            )),
            Lookup::VerseOutOfRange {
                book,
                label,
                chapter,
                verse,
            } => Some(format!(
                "Verse {} does not exist in {} {} {}",
                verse,
                book,
                label.as_str().to_lowercase(),
                chapter
            )),
        }
    }
}

/// Resolves a parsed reference against the corpus. Only the ranker's top
/// result is considered.
pub fn resolve(parsed: &ParsedReference, corpus: &Corpus, ranker: &dyn BookRanker) -> Lookup {
    let Some(search) = parsed.book_search.as_deref() else {
        return Lookup::Idle;
    };

    let names = corpus.book_names();
    let Some(book) = ranker
        .rank(search, names)
        .first()
        .and_then(|&idx| corpus.book(names.get(idx)?))
    else {
        return Lookup::BookUnresolved {
            search: search.to_string(),
        };
    };

    let (chapter, verse) = (parsed.chapter, parsed.verse);
    if chapter == 0 || chapter > book.chapters.len() {
        return Lookup::ChapterOutOfRange {
            book: book.name.clone(),
            label: book.label,
            chapter,
        };
    }

    match corpus.verse(&book.name, chapter, verse) {
        Some(text) => Lookup::Resolved(ResolvedVerse {
            book: book.name.clone(),
            chapter,
            verse,
            text: text.to_string(),
        }),
        None => Lookup::VerseOutOfRange {
            book: book.name.clone(),
            label: book.label,
            chapter,
            verse,
        },
    }
}
