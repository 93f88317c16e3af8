//! In-memory scripture index: book -> chapters -> verses.
//!
//! The source document is line oriented. `THE BOOK OF <name>` opens a book,
//! `CHAPTER <n>` or `PSALM <n>` opens a chapter, and every other non-blank
//! line is a verse of the current chapter.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const BOOK_MARKER: &str = "THE BOOK OF ";
const CHAPTER_MARKER: &str = "CHAPTER ";
const PSALM_MARKER: &str = "PSALM ";

/// How a book labels its chapters in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterLabel {
    Chapter,
    Psalm,
}

impl ChapterLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterLabel::Chapter => "Chapter",
            ChapterLabel::Psalm => "Psalm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    pub name: String,
    pub label: ChapterLabel,
    /// Slot `i` holds chapter `i + 1`; verse `j` of a chapter is verse `j + 1`.
    pub chapters: Vec<Vec<String>>,
}

impl Book {
    fn new(name: String) -> Self {
        Self {
            name,
            label: ChapterLabel::Chapter,
            chapters: Vec::new(),
        }
    }
}

/// Read-only once built. Books keep the order they first appeared in.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    books: Vec<Book>,
    by_name: HashMap<String, usize>,
    names: Vec<String>,
}

impl Corpus {
    /// Loads the corpus from `path`. A missing or unreadable file yields an
    /// empty corpus so the session can still run.
    pub fn load(path: &Path) -> Self {
        match File::open(path) {
            Ok(file) => {
                let corpus = Self::parse(BufReader::new(file));
                log::info!(
                    "Loaded {} books from {}",
                    corpus.len(),
                    path.display()
                );
                corpus
            }
            Err(e) => {
                log::warn!("Could not open corpus {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Builds the index from any line source. A read error stops parsing and
    /// keeps whatever was indexed up to that point.
    pub fn parse<R: BufRead>(reader: R) -> Self {
        let mut builder = CorpusBuilder::default();
        for line in reader.lines() {
            match line {
                Ok(line) => builder.feed(&line),
                Err(e) => {
                    log::warn!("Stopped reading corpus: {}", e);
                    break;
                }
            }
        }
        builder.corpus
    }

    /// Book names in corpus order; this is the candidate list for ranking.
    pub fn book_names(&self) -> &[String] {
        &self.names
    }

    pub fn book(&self, name: &str) -> Option<&Book> {
        self.by_name.get(name).map(|&idx| &self.books[idx])
    }

    pub fn chapter_count(&self, book: &str) -> usize {
        self.book(book).map_or(0, |b| b.chapters.len())
    }

    /// Number of verses in a 1-based chapter, 0 when the chapter is absent.
    pub fn verse_count(&self, book: &str, chapter: usize) -> usize {
        self.chapter(book, chapter).map_or(0, |verses| verses.len())
    }

    /// Looks up a verse by 1-based chapter and verse numbers.
    pub fn verse(&self, book: &str, chapter: usize, verse: usize) -> Option<&str> {
        let verses = self.chapter(book, chapter)?;
        verses.get(verse.checked_sub(1)?).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    fn chapter(&self, book: &str, chapter: usize) -> Option<&Vec<String>> {
        self.book(book)?.chapters.get(chapter.checked_sub(1)?)
    }
}

#[derive(Default)]
struct CorpusBuilder {
    corpus: Corpus,
    current_book: Option<usize>,
    current_chapter: Option<usize>,
}

impl CorpusBuilder {
    fn feed(&mut self, line: &str) {
        if let Some(name) = line.strip_prefix(BOOK_MARKER) {
            self.open_book(name);
        } else if let Some(number) = line.strip_prefix(CHAPTER_MARKER) {
            self.open_chapter(number, ChapterLabel::Chapter);
        } else if let Some(number) = line.strip_prefix(PSALM_MARKER) {
            self.open_chapter(number, ChapterLabel::Psalm);
        } else {
            self.push_verse(line);
        }
    }

    fn open_book(&mut self, name: &str) {
        let name = name.trim().to_uppercase();
        let corpus = &mut self.corpus;
        let idx = match corpus.by_name.get(&name).copied() {
            Some(idx) => idx,
            None => {
                corpus.books.push(Book::new(name.clone()));
                corpus.names.push(name.clone());
                corpus.by_name.insert(name, corpus.books.len() - 1);
                corpus.books.len() - 1
            }
        };
        self.current_book = Some(idx);
        self.current_chapter = None;
    }

    fn open_chapter(&mut self, number: &str, label: ChapterLabel) {
        match number.trim().parse::<usize>() {
            Ok(n) if n >= 1 => {
                self.current_chapter = Some(n - 1);
                if let Some(book) = self.current_book {
                    let book = &mut self.corpus.books[book];
                    book.label = label;
                    if book.chapters.len() < n {
                        book.chapters.resize_with(n, Vec::new);
                    }
                }
            }
            _ => {
                log::warn!("Ignoring chapter marker with bad number: {:?}", number);
                self.current_chapter = None;
            }
        }
    }

    fn push_verse(&mut self, line: &str) {
        let (Some(book), Some(chapter)) = (self.current_book, self.current_chapter) else {
            return;
        };

        let mut words = line.split_whitespace().peekable();
        let Some(first) = words.peek() else {
            return;
        };
        if first.bytes().all(|b| b.is_ascii_digit()) {
            words.next();
        }
        let text = words.collect::<Vec<_>>().join(" ");

        let chapters = &mut self.corpus.books[book].chapters;
        if chapters.len() <= chapter {
            chapters.resize_with(chapter + 1, Vec::new);
        }
        chapters[chapter].push(text);
    }
}
