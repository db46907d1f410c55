//! Command-line reader for the bundled scripture corpus.
//!
//! ```bash
//! scripture books
//! scripture chapter genesis 1
//! scripture verse john 3 16
//! scripture search --limit 10 in the beginning
//! ```

use clap::{ArgAction, Parser, Subcommand};
use scripture_config::Config;
use scripture_store::BibleStore;
use scripture_store::error::{ErrorKind, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scripture")]
#[command(about = "Read and search the bundled scripture corpus")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML, JSON or TOML). Defaults to the per-user file, if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Corpus asset, overriding the configured path
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the books in the corpus
    Books,
    /// Print a chapter
    Chapter { book: String, chapter: u32 },
    /// Print a single verse
    Verse { book: String, chapter: u32, verse: u32 },
    /// Search verse text (accents and case are ignored)
    Search {
        /// Maximum number of hits
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Search query; multiple words are joined with spaces
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // Log to stderr to keep stdout for verses.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(cli.verbose))))
        .init();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).map_err(|err| err.raise(ErrorKind::InvalidConfig))?;
    if let Some(corpus) = cli.corpus {
        config.corpus.path = corpus;
    }
    if let Command::Search { limit: Some(limit), .. } = &cli.command {
        config.search.max_results = *limit;
    }
    let store = BibleStore::from_config(&config)?;
    store.initialize_bible_data().await?;
    let code = execute(&store, cli.command).await;
    store.close_bible_database().await;
    code
}

async fn execute(store: &BibleStore, command: Command) -> Result<ExitCode> {
    match command {
        Command::Books => {
            for book in store.books().await? {
                println!("{:>2}. {} ({} chapters)", book.ordinal, book.name(), book.chapter_count);
            }
        },
        Command::Chapter { book, chapter } => {
            let verses = store.get_chapter(&book, chapter).await?;
            if verses.is_empty() {
                eprintln!("No such chapter: {book} {chapter}");
                return Ok(ExitCode::FAILURE);
            }
            for verse in verses {
                println!("{:>3} {}", verse.number, verse.text);
            }
        },
        Command::Verse { book, chapter, verse } => match store.get_verse(&book, chapter, verse).await? {
            Some(verse) => println!("{}", verse.text),
            None => {
                eprintln!("No such verse: {book} {chapter}:{verse}");
                return Ok(ExitCode::FAILURE);
            },
        },
        Command::Search { query, .. } => {
            let hits = store.search(&query.join(" ")).await?.into_hits();
            for hit in &hits {
                println!("{} {}:{}  {}", hit.book.name(), hit.chapter, hit.verse, hit.text);
            }
            tracing::info!(hits = hits.len(), "Search complete");
        },
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(0, "warn")]
    #[case(1, "info")]
    #[case(2, "debug")]
    #[case(7, "trace")]
    fn test_verbosity_levels(#[case] verbose: u8, #[case] expected: &str) {
        assert_eq!(level(verbose), expected);
    }

    #[test]
    fn test_search_joins_words() {
        let cli = Cli::try_parse_from(["scripture", "-v", "search", "-n", "3", "in", "the", "beginning"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Search { limit, query } => {
                assert_eq!(limit, Some(3));
                assert_eq!(query.join(" "), "in the beginning");
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
