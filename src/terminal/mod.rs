//! Terminal plumbing for the interactive session: raw-mode guard, key
//! decoding and a small set of render operations applied through crossterm.

use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
    tty::IsTty,
};
use signal_hook::consts::{SIGHUP, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};

pub const KEY_INTERRUPT: u8 = 3;
pub const KEY_BACKSPACE: u8 = 8;
pub const KEY_ENTER: u8 = 13;
pub const KEY_ESCAPE: u8 = 27;
pub const KEY_DELETE: u8 = 127;

/// One screen mutation. Sessions describe frames with these and never emit
/// escape codes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    MoveTo(u16, u16),
    ClearLine,
    ClearBelow,
    ClearScreen,
    HideCursor,
    ShowCursor,
    Print(String),
    NewLine,
}

/// Applies render ops to a writer, flushing once per frame.
pub struct Screen<W: Write> {
    out: W,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn draw(&mut self, ops: &[RenderOp]) -> io::Result<()> {
        for op in ops {
            match op {
                RenderOp::MoveTo(col, row) => queue!(self.out, MoveTo(*col, *row))?,
                RenderOp::ClearLine => queue!(self.out, Clear(ClearType::UntilNewLine))?,
                RenderOp::ClearBelow => queue!(self.out, Clear(ClearType::FromCursorDown))?,
                RenderOp::ClearScreen => queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?,
                RenderOp::HideCursor => queue!(self.out, Hide)?,
                RenderOp::ShowCursor => queue!(self.out, Show)?,
                RenderOp::Print(text) => queue!(self.out, Print(text))?,
                // Raw mode does no output translation.
                RenderOp::NewLine => queue!(self.out, Print("\r\n"))?,
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn stdin_is_terminal() -> bool {
    io::stdin().is_tty()
}

/// Terminal width in columns, or `fallback` when it cannot be queried.
pub fn columns_or(fallback: u16) -> u16 {
    terminal::size().map_or(fallback, |(cols, _)| cols)
}

/// Signals that end the process while the session holds raw mode. Ctrl+C
/// is not among them: raw mode delivers it as a key.
pub const TEARDOWN_SIGNALS: [i32; 3] = [SIGTERM, SIGHUP, SIGQUIT];

/// Shell convention for a process ended by `signal`.
pub fn signal_exit_code(signal: i32) -> i32 {
    128 + signal
}

/// Holds the terminal in raw mode; dropping it restores the previous mode,
/// shows the cursor and clears the screen. Teardown signals received while
/// the guard is alive restore the terminal before the process exits.
pub struct TerminalGuard {
    signals: Handle,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        install_panic_hook();
        let signals = Signals::new(TEARDOWN_SIGNALS).context("Failed to register signal handlers")?;
        let (signals, _) = spawn_signal_watcher(signals, |signal| {
            log::warn!("Received signal {}, restoring terminal", signal);
            restore();
            std::process::exit(signal_exit_code(signal));
        });
        if let Err(e) = terminal::enable_raw_mode() {
            signals.close();
            return Err(e).context("Failed to enable raw mode");
        }
        log::debug!("Raw mode enabled");
        Ok(Self { signals })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.signals.close();
        restore();
        log::debug!("Terminal restored");
    }
}

/// Waits on `signals` in a thread of its own and hands the first one to
/// `on_signal`. Closing the returned handle ends the thread without a call.
fn spawn_signal_watcher<F>(mut signals: Signals, on_signal: F) -> (Handle, JoinHandle<()>)
where
    F: FnOnce(i32) + Send + 'static,
{
    let handle = signals.handle();
    let watcher = thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            on_signal(signal);
        }
    });
    (handle, watcher)
}

fn restore() {
    let _ = terminal::disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = queue!(stdout, Clear(ClearType::All), MoveTo(0, 0), Show);
    let _ = stdout.flush();
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        previous(info);
    }));
}

/// Blocks until the next key press and returns it as a control/ASCII byte.
/// Keys outside that vocabulary, and non-key events, come back as `None`.
pub fn read_key() -> io::Result<Option<u8>> {
    match event::read()? {
        Event::Key(key) => Ok(key_to_byte(&key)),
        _ => Ok(None),
    }
}

pub fn key_to_byte(key: &KeyEvent) -> Option<u8> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KEY_INTERRUPT)
        }
        KeyCode::Char('h') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KEY_BACKSPACE),
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            log::debug!("Ignoring control chord for {:?}", c);
            None
        }
        KeyCode::Char(c) if c.is_ascii() && !c.is_ascii_control() => Some(c as u8),
        KeyCode::Esc => Some(KEY_ESCAPE),
        KeyCode::Backspace => Some(KEY_DELETE),
        KeyCode::Enter => Some(KEY_ENTER),
        _ => None,
    }
}

/// Greedy word wrap. Words are never split; one longer than `width` gets a
/// line to itself.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
