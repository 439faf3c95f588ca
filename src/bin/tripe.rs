//! CLI entry point. External collaborator per spec §1/§6: thin argument
//! parsing and formatting around the `tripe` library's `Store`/`Index`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tripe::{Index, Store, TripeError};

#[derive(Parser)]
#[command(name = "tripe", about = "a persistent full-text phrase index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a document from stdin and add it to the index
    Add {
        file: PathBuf,
        doc_id: u64,
    },
    /// Search the index for a phrase
    Search {
        file: PathBuf,
        #[arg(long)]
        exact: bool,
        phrase: Vec<String>,
    },
    /// Print a Graphviz rendering of the trie and term chains
    Dot {
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TripeError>() {
        Some(TripeError::EmptyPhrase) => 1,
        Some(
            TripeError::BadMagic
            | TripeError::Io(_)
            | TripeError::BadText(_)
            | TripeError::Corrupt(_)
            | TripeError::SizeMismatch { .. },
        ) => 2,
        None => 2,
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Add { file, doc_id } => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading document text from stdin")?;
            let mut store = Store::open(&file, true).context("opening index file")?;
            let index = Index::open(&mut store).context("opening index")?;
            index
                .add(&mut store, &text, doc_id)
                .context("adding document")?;
            store.sync().context("flushing index file")?;
        }
        Commands::Search {
            file,
            exact,
            phrase,
        } => {
            let phrase = phrase.join(" ");
            let mut store = Store::open(&file, true).context("opening index file")?;
            let index = Index::open(&mut store).context("opening index")?;
            for result in index
                .search(&store, &phrase, exact)
                .context("searching index")?
            {
                println!(
                    "matched in document {} at {}",
                    result.doc_id, result.offset
                );
            }
        }
        Commands::Dot { file } => {
            let mut store = Store::open(&file, false).context("opening index file")?;
            let index = Index::open(&mut store).context("opening index")?;
            print!("{}", tripe::render_dot(&store, index.root())?);
        }
    }
    Ok(())
}
