//! The interactive search session: one keystroke in, one frame out.

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::abbreviations::AbbreviationTable;
use crate::corpus::Corpus;
use crate::reference;
use crate::resolver::{self, BookRanker, Lookup, ResolvedVerse};
use crate::terminal::{
    self, RenderOp, Screen, KEY_BACKSPACE, KEY_DELETE, KEY_ENTER, KEY_ESCAPE, KEY_INTERRUPT,
};
use crate::verse_log::{VerseLog, VerseLogError};

const HEADER: &str = "Enter the reference (ctrl + c to quit)";
const PROMPT: &str = "> ";
const INPUT_ROW: u16 = 1;
const FEEDBACK_ROW: u16 = 3;
const DEFAULT_COLUMNS: u16 = 80;

/// Parses and resolves one line of typed text.
pub fn evaluate(
    text: &str,
    corpus: &Corpus,
    abbreviations: &AbbreviationTable,
    ranker: &dyn BookRanker,
) -> Lookup {
    let parsed = reference::parse(text, abbreviations);
    resolver::resolve(&parsed, corpus, ranker)
}

/// What a one-shot lookup prints, and whether it found a verse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupReport {
    pub lines: Vec<String>,
    pub resolved: bool,
}

/// Resolves `reference` outside the interactive loop, optionally saving
/// the verse. Only a failed save is an error.
pub fn lookup_once(
    reference: &str,
    save: bool,
    corpus: &Corpus,
    abbreviations: &AbbreviationTable,
    ranker: &dyn BookRanker,
    verse_log: &VerseLog,
    wrap_width: usize,
) -> Result<LookupReport, VerseLogError> {
    let result = evaluate(reference, corpus, abbreviations, ranker);
    let Some(verse) = result.resolved() else {
        let message = result
            .message()
            .unwrap_or_else(|| format!("{:?} does not name a book.", reference));
        return Ok(LookupReport {
            lines: vec![message],
            resolved: false,
        });
    };

    let mut lines = terminal::wrap_text(&verse.display_text(), wrap_width);
    if save {
        verse_log.append(verse)?;
        lines.push(format!(
            "Saved {} to {}",
            verse.citation(),
            verse_log.path().display()
        ));
    }
    Ok(LookupReport {
        lines,
        resolved: true,
    })
}

/// Tail of the typed text that fits on the input row after the prompt.
/// Typed text is printable ASCII, so byte offsets are char offsets.
fn visible_input(text: &str, columns: u16) -> &str {
    let room = (columns as usize).saturating_sub(PROMPT.len() + 1).max(1);
    if text.len() <= room {
        text
    } else {
        &text[text.len() - room..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

/// Mutable state of one session. Discarded when the loop exits.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub typed_text: String,
    pub last_evaluated_text: String,
    pub lookup: Lookup,
    pub pending_save_notice: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            typed_text: String::new(),
            last_evaluated_text: String::new(),
            lookup: Lookup::Idle,
            pending_save_notice: false,
        }
    }
}

impl SessionState {
    pub fn resolved_verse(&self) -> Option<&ResolvedVerse> {
        self.lookup.resolved()
    }
}

pub struct Session<'a> {
    corpus: &'a Corpus,
    abbreviations: &'a AbbreviationTable,
    ranker: &'a dyn BookRanker,
    verse_log: VerseLog,
    wrap_width: usize,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(
        corpus: &'a Corpus,
        abbreviations: &'a AbbreviationTable,
        ranker: &'a dyn BookRanker,
        verse_log: VerseLog,
        wrap_width: usize,
    ) -> Self {
        Self {
            corpus,
            abbreviations,
            ranker,
            verse_log,
            wrap_width,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Applies one input byte. Only a failed save is an error.
    pub fn handle_byte(&mut self, byte: u8) -> Result<Step, VerseLogError> {
        match byte {
            KEY_INTERRUPT | KEY_ESCAPE => return Ok(Step::Quit),
            KEY_DELETE | KEY_BACKSPACE => {
                self.state.typed_text.pop();
            }
            32..=126 => self.state.typed_text.push(byte as char),
            KEY_ENTER => self.commit()?,
            _ => {}
        }
        self.refresh();
        Ok(Step::Continue)
    }

    /// Re-derives the lookup when the typed text changed since the last
    /// evaluation. Returns whether any work was done.
    pub fn refresh(&mut self) -> bool {
        if self.state.typed_text == self.state.last_evaluated_text {
            return false;
        }
        self.state.lookup = evaluate(
            &self.state.typed_text,
            self.corpus,
            self.abbreviations,
            self.ranker,
        );
        self.state.last_evaluated_text.clone_from(&self.state.typed_text);
        log::debug!("{:?} -> {:?}", self.state.typed_text, self.state.lookup);
        true
    }

    fn commit(&mut self) -> Result<(), VerseLogError> {
        let Some(verse) = self.state.resolved_verse() else {
            return Ok(());
        };
        if let Err(e) = self.verse_log.append(verse) {
            log::error!("{}", e);
            return Err(e);
        }
        self.state.pending_save_notice = true;
        self.state.typed_text.clear();
        Ok(())
    }

    /// Builds the next frame for a terminal `columns` wide. Shows the save
    /// notice at most once.
    pub fn frame(&mut self, columns: u16) -> Vec<RenderOp> {
        let shown = visible_input(&self.state.typed_text, columns);
        let cursor_col = (PROMPT.len() + shown.len()) as u16;
        let mut ops = vec![
            RenderOp::HideCursor,
            RenderOp::MoveTo(0, 0),
            RenderOp::Print(HEADER.to_string()),
            RenderOp::ClearLine,
            RenderOp::MoveTo(0, INPUT_ROW),
            RenderOp::Print(format!("{}{}", PROMPT, shown)),
            RenderOp::ClearLine,
            RenderOp::MoveTo(0, FEEDBACK_ROW),
            RenderOp::ClearBelow,
        ];

        match &self.state.lookup {
            Lookup::Idle => {}
            Lookup::Resolved(verse) => {
                ops.push(RenderOp::Print(format!(
                    "Pressing <Enter> will save {} to the verses file.",
                    verse.citation()
                )));
                ops.push(RenderOp::NewLine);
                ops.push(RenderOp::NewLine);
                for line in terminal::wrap_text(&verse.display_text(), self.wrap_width) {
                    ops.push(RenderOp::Print(line));
                    ops.push(RenderOp::NewLine);
                }
            }
            other => {
                if let Some(message) = other.message() {
                    ops.push(RenderOp::Print(message));
                    ops.push(RenderOp::NewLine);
                }
            }
        }

        if self.state.pending_save_notice {
            let file_name = self
                .verse_log
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.verse_log.path().display().to_string());
            ops.push(RenderOp::NewLine);
            ops.push(RenderOp::Print(format!("Your verse was saved to {}!", file_name)));
            self.state.pending_save_notice = false;
        }

        ops.push(RenderOp::MoveTo(cursor_col, INPUT_ROW));
        ops.push(RenderOp::ShowCursor);
        ops
    }

    /// Runs until a quit key. `next_key` blocks for one key; `None` means the
    /// key has no byte form and is ignored.
    pub fn run<W, K>(&mut self, screen: &mut Screen<W>, mut next_key: K) -> Result<()>
    where
        W: Write,
        K: FnMut() -> io::Result<Option<u8>>,
    {
        screen.draw(&[RenderOp::ClearScreen])?;
        loop {
            let frame = self.frame(terminal::columns_or(DEFAULT_COLUMNS));
            screen.draw(&frame).context("Failed to draw frame")?;

            let Some(byte) = next_key().context("Failed to read input")? else {
                continue;
            };
            if self.handle_byte(byte)? == Step::Quit {
                log::info!("Session ended by user");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{three_chapter_corpus, CountingRanker};

    struct Fixture {
        corpus: Corpus,
        abbreviations: AbbreviationTable,
        ranker: CountingRanker,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                corpus: three_chapter_corpus(),
                abbreviations: [("OB", "OBADIAH")].into_iter().collect(),
                ranker: CountingRanker::default(),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn log_path(&self) -> std::path::PathBuf {
            self.dir.path().join("verses.txt")
        }

        fn session(&self) -> Session<'_> {
            Session::new(
                &self.corpus,
                &self.abbreviations,
                &self.ranker,
                VerseLog::new(self.log_path()),
                80,
            )
        }
    }

    fn type_text(session: &mut Session<'_>, text: &str) {
        for byte in text.bytes() {
            assert_eq!(session.handle_byte(byte).unwrap(), Step::Continue);
        }
    }

    fn printed(ops: &[RenderOp]) -> Vec<String> {
        ops.iter()
            .filter_map(|op| match op {
                RenderOp::Print(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn log_lines(path: &std::path::Path) -> usize {
        std::fs::read_to_string(path).map_or(0, |s| s.lines().count())
    }

    #[test]
    fn test_typing_resolves() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "obadiah 3:10");

        let verse = session.state().resolved_verse().unwrap();
        assert_eq!(verse.display_text(), "OBADIAH 3:10 verse 10 of three");
    }

    #[test]
    fn test_states_while_typing() {
        let fixture = Fixture::new();
        let mut session = fixture.session();

        assert_eq!(session.state().lookup, Lookup::Idle);
        type_text(&mut session, "ZZ");
        assert!(matches!(session.state().lookup, Lookup::BookUnresolved { .. }));

        let mut session = fixture.session();
        type_text(&mut session, "ob 4");
        assert!(matches!(session.state().lookup, Lookup::ChapterOutOfRange { chapter: 4, .. }));

        let mut session = fixture.session();
        type_text(&mut session, "ob 3:11");
        assert!(matches!(session.state().lookup, Lookup::VerseOutOfRange { verse: 11, .. }));
    }

    #[test]
    fn test_erase_and_ignored_bytes() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OBADIAH 2");
        session.handle_byte(KEY_DELETE).unwrap();
        session.handle_byte(KEY_BACKSPACE).unwrap();
        assert_eq!(session.state().typed_text, "OBADIAH");

        session.handle_byte(0).unwrap();
        session.handle_byte(200).unwrap();
        assert_eq!(session.state().typed_text, "OBADIAH");
    }

    #[test]
    fn test_unchanged_text_skips_recompute() {
        let fixture = Fixture::new();
        let mut session = fixture.session();

        session.handle_byte(KEY_DELETE).unwrap();
        assert_eq!(fixture.ranker.calls.get(), 0);
        assert_eq!(session.state().lookup, Lookup::Idle);

        type_text(&mut session, "ZZ");
        let calls = fixture.ranker.calls.get();
        assert_eq!(calls, 2);
        session.handle_byte(9).unwrap();
        session.handle_byte(KEY_ENTER).unwrap();
        assert!(!session.refresh());
        assert_eq!(fixture.ranker.calls.get(), calls);
    }

    #[test]
    fn test_commit_saves_and_resets() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OB 3:10");

        session.handle_byte(KEY_ENTER).unwrap();
        assert_eq!(session.state().typed_text, "");
        assert!(session.state().resolved_verse().is_none());
        assert_eq!(session.state().lookup, Lookup::Idle);
        assert!(session.state().pending_save_notice);
        assert_eq!(log_lines(&fixture.log_path()), 1);

        // Nothing resolved now, so a second Enter does nothing.
        session.handle_byte(KEY_ENTER).unwrap();
        assert_eq!(log_lines(&fixture.log_path()), 1);

        type_text(&mut session, "OB 1");
        session.handle_byte(KEY_ENTER).unwrap();
        let saved = std::fs::read_to_string(fixture.log_path()).unwrap();
        assert_eq!(saved, "OBADIAH 3:10 verse 10 of three\nOBADIAH 1:1 one\n");
    }

    #[test]
    fn test_commit_ignored_when_not_resolved() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OB 9");
        session.handle_byte(KEY_ENTER).unwrap();
        assert_eq!(session.state().typed_text, "OB 9");
        assert!(!fixture.log_path().exists());
    }

    #[test]
    fn test_commit_failure_is_fatal() {
        let fixture = Fixture::new();
        let mut session = Session::new(
            &fixture.corpus,
            &fixture.abbreviations,
            &fixture.ranker,
            VerseLog::new(fixture.dir.path().join("no_such_dir").join("verses.txt")),
            80,
        );
        type_text(&mut session, "OB 1");
        assert!(session.handle_byte(KEY_ENTER).is_err());
        assert!(!session.state().pending_save_notice);
    }

    #[test]
    fn test_quit_keys() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        assert_eq!(session.handle_byte(KEY_INTERRUPT).unwrap(), Step::Quit);
        assert_eq!(session.handle_byte(KEY_ESCAPE).unwrap(), Step::Quit);
    }

    #[test]
    fn test_frame_contents() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OB 2");

        let ops = session.frame(80);
        let text = printed(&ops);
        assert_eq!(text[0], HEADER);
        assert_eq!(text[1], "> OB 2");
        assert_eq!(text[2], "Pressing <Enter> will save OBADIAH 2:1 to the verses file.");
        assert_eq!(text[3], "OBADIAH 2:1 two");
        assert_eq!(ops.last(), Some(&RenderOp::ShowCursor));
        assert_eq!(ops[ops.len() - 2], RenderOp::MoveTo(6, INPUT_ROW));
    }

    #[test]
    fn test_frame_keeps_long_input_on_one_row() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "obadiah 3:10 x");

        let ops = session.frame(12);
        let text = printed(&ops);
        assert_eq!(text[1], "> ah 3:10 x");
        assert!(text[1].len() < 12);
        assert_eq!(ops[ops.len() - 2], RenderOp::MoveTo(11, INPUT_ROW));
        assert_eq!(session.state().typed_text, "obadiah 3:10 x");
    }

    #[test]
    fn test_frame_shows_error_line() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OB 7");
        let text = printed(&session.frame(80));
        assert_eq!(text[2], "Chapter 7 does not exist in OBADIAH");
    }

    #[test]
    fn test_save_notice_shown_once() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        type_text(&mut session, "OB 1");
        session.handle_byte(KEY_ENTER).unwrap();

        let first = printed(&session.frame(80));
        assert!(first.iter().any(|line| line == "Your verse was saved to verses.txt!"));
        assert!(!session.state().pending_save_notice);

        let second = printed(&session.frame(80));
        assert!(!second.iter().any(|line| line.starts_with("Your verse was saved")));
    }

    #[test]
    fn test_frame_wraps_long_verses() {
        let fixture = Fixture::new();
        let mut session = Session::new(
            &fixture.corpus,
            &fixture.abbreviations,
            &fixture.ranker,
            VerseLog::new(fixture.log_path()),
            12,
        );
        type_text(&mut session, "OB 3:10");
        let text = printed(&session.frame(80));
        assert_eq!(&text[3..], &["OBADIAH 3:10", "verse 10 of", "three"]);
    }

    #[test]
    fn test_run_until_quit() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        let mut keys = b"OB 1\r".iter().copied().map(Some).chain([None, Some(KEY_ESCAPE)]);
        let mut screen = Screen::new(Vec::new());

        session
            .run(&mut screen, || Ok(keys.next().flatten()))
            .unwrap();

        assert_eq!(log_lines(&fixture.log_path()), 1);
        let out = String::from_utf8(screen.into_inner()).unwrap();
        assert!(out.contains("Your verse was saved to verses.txt!"));
    }

    #[test]
    fn test_lookup_once_resolved() {
        let fixture = Fixture::new();
        let log = VerseLog::new(fixture.log_path());
        let report = lookup_once(
            "obadiah 3:10",
            false,
            &fixture.corpus,
            &fixture.abbreviations,
            &fixture.ranker,
            &log,
            80,
        )
        .unwrap();

        assert!(report.resolved);
        assert_eq!(report.lines, vec!["OBADIAH 3:10 verse 10 of three"]);
        assert!(!fixture.log_path().exists());
    }

    #[test]
    fn test_lookup_once_unresolved() {
        let fixture = Fixture::new();
        let log = VerseLog::new(fixture.log_path());
        let report = lookup_once(
            "ob 9",
            true,
            &fixture.corpus,
            &fixture.abbreviations,
            &fixture.ranker,
            &log,
            80,
        )
        .unwrap();

        assert!(!report.resolved);
        assert_eq!(report.lines, vec!["Chapter 9 does not exist in OBADIAH"]);
        assert!(!fixture.log_path().exists());

        let report = lookup_once("3", false, &fixture.corpus, &fixture.abbreviations, &fixture.ranker, &log, 80)
            .unwrap();
        assert!(!report.resolved);
        assert_eq!(report.lines, vec!["\"3\" does not name a book."]);
    }

    #[test]
    fn test_lookup_once_save_appends_one_line() {
        let fixture = Fixture::new();
        let log = VerseLog::new(fixture.log_path());
        let report = lookup_once(
            "ob 2",
            true,
            &fixture.corpus,
            &fixture.abbreviations,
            &fixture.ranker,
            &log,
            80,
        )
        .unwrap();

        assert!(report.resolved);
        assert_eq!(report.lines[0], "OBADIAH 2:1 two");
        assert!(report.lines[1].starts_with("Saved OBADIAH 2:1 to "));
        assert_eq!(
            std::fs::read_to_string(fixture.log_path()).unwrap(),
            "OBADIAH 2:1 two\n"
        );
    }

    #[test]
    fn test_evaluate_uses_abbreviations() {
        let fixture = Fixture::new();
        let lookup = evaluate("ob 2", &fixture.corpus, &fixture.abbreviations, &fixture.ranker);
        assert_eq!(lookup.resolved().unwrap().citation(), "OBADIAH 2:1");
    }
}
