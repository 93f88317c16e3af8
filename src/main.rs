use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod abbreviations;
mod cli;
mod config;
mod corpus;
mod reference;
mod resolver;
mod session;
mod terminal;
mod verse_log;

use abbreviations::AbbreviationTable;
use cli::{Cli, Commands};
use config::AppConfig;
use corpus::Corpus;
use resolver::{BookRanker, SkimRanker};
use session::Session;
use terminal::{Screen, TerminalGuard};
use verse_log::VerseLog;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(&cli)?;
    init_logging(&config, cli.verbose);
    log::debug!("Using config {:?}", config);

    let corpus = Corpus::load(&config.bible_path);
    let abbreviations = AbbreviationTable::load(&config.abbreviations_path);
    let ranker = SkimRanker::new();
    let verse_log = VerseLog::new(config.verses_path.clone());

    match cli.command {
        Some(Commands::Lookup { reference, save }) => lookup(
            &reference.join(" "),
            save,
            &corpus,
            &abbreviations,
            &ranker,
            &verse_log,
            config.wrap_width,
        ),
        None => interactive(&corpus, &abbreviations, &ranker, verse_log, config.wrap_width),
    }
}

/// Sends log records to a file, since the session owns the terminal.
/// Logging stays off if the file cannot be opened.
fn init_logging(config: &AppConfig, verbose: bool) {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::new().filter_or("VERSEFIND_LOG", default_level),
    )
    .target(env_logger::Target::Pipe(Box::new(file)))
    .try_init();
}

fn interactive(
    corpus: &Corpus,
    abbreviations: &AbbreviationTable,
    ranker: &dyn BookRanker,
    verse_log: VerseLog,
    wrap_width: usize,
) -> Result<ExitCode> {
    if !terminal::stdin_is_terminal() {
        println!("Please run versefind in a terminal.");
        return Ok(ExitCode::SUCCESS);
    }

    let guard = TerminalGuard::enter()?;
    let mut screen = Screen::new(io::stdout().lock());
    let mut session = Session::new(corpus, abbreviations, ranker, verse_log, wrap_width);
    let result = session.run(&mut screen, terminal::read_key);

    // Restore the terminal before any error is printed.
    drop(screen);
    drop(guard);
    result?;
    Ok(ExitCode::SUCCESS)
}

fn lookup(
    reference: &str,
    save: bool,
    corpus: &Corpus,
    abbreviations: &AbbreviationTable,
    ranker: &dyn BookRanker,
    verse_log: &VerseLog,
    wrap_width: usize,
) -> Result<ExitCode> {
    let report = session::lookup_once(
        reference,
        save,
        corpus,
        abbreviations,
        ranker,
        verse_log,
        wrap_width,
    )?;
    for line in &report.lines {
        println!("{}", line);
    }
    Ok(if report.resolved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
