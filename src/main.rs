//! Relstore CLI - Command-line interface for the event relationship store

use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::PathBuf;
use relstore::config::{self, ConnectionString, DatabaseOptions, RelstoreConfig};
use relstore::ui::{self, theme};
use relstore::{ingest_events, open_store};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "relstore")]
#[command(version)]
#[command(about = "Event relationship graph store - typed parent/child edges between events")]
#[command(long_about = r#"
Relstore records the parent/child relations events declare in their
`m.relationship` content and answers child lookups by relation type.

Example usage:
  relstore init
  relstore ingest --input events.jsonl --workers 8
  relstore children --parent '$root:example.org' --rel-type m.reference
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to relstore.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection string, overrides the config file
    #[arg(short, long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Store the relations declared by newline-delimited event JSON
    Ingest {
        /// Input file, or `-` for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Number of worker threads writing to the store
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },

    /// List the children of an event for one relation type
    Children {
        /// Parent event ID
        #[arg(short, long)]
        parent: String,

        /// Relation type, e.g. m.reference
        #[arg(short = 't', long)]
        rel_type: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the cached metadata of an event
    Node {
        /// Event ID
        #[arg(short, long)]
        event_id: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show statistics about the store
    Stats,
}

fn database_options(cli: &Cli) -> anyhow::Result<DatabaseOptions> {
    let mut options = config::load_config(cli.config.as_deref())?
        .map(|config| config.database)
        .unwrap_or_default();
    if let Some(database) = &cli.database {
        options.connection_string = ConnectionString(database.clone());
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match &cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            let mut relstore_config = RelstoreConfig::default();
            if let Some(database) = &cli.database {
                relstore_config.database.connection_string = ConnectionString(database.clone());
            }
            config::write_config(&path, &relstore_config, *force)?;
            ui::done(&format!("Wrote {}", path.display()));
        }

        Commands::Ingest { input, workers } => {
            let options = database_options(&cli)?;
            let store = open_store(&options)?;
            ui::banner(&format!("Ingesting {} into {}", input.display(), options.connection_string));

            let summary = if input.as_os_str() == "-" {
                ingest_events(store.as_ref(), std::io::stdin().lock(), *workers)?
            } else {
                let file = std::fs::File::open(input)?;
                ingest_events(store.as_ref(), BufReader::new(file), *workers)?
            };

            println!("{}", ui::ingest_report(theme(), &summary));
            if summary.invalid > 0 {
                ui::caution(&format!("{} line(s) were not valid events", summary.invalid));
            }
            if summary.failed > 0 {
                anyhow::bail!("{} event(s) could not be stored", summary.failed);
            }
            ui::done("Ingest complete");
        }

        Commands::Children { parent, rel_type, json } => {
            let store = open_store(&database_options(&cli)?)?;
            let children = store.children_for_parent(parent, rel_type)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&children)?);
            } else {
                println!("{}", ui::children_list(theme(), parent, rel_type, &children));
            }
        }

        Commands::Node { event_id, json } => {
            let store = open_store(&database_options(&cli)?)?;
            let node = store.node(event_id)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&node)?);
            } else {
                println!("{}", ui::node_card(theme(), event_id, node.as_ref()));
            }
        }

        Commands::Stats => {
            let options = database_options(&cli)?;
            let store = open_store(&options)?;
            let stats = store.stats()?;

            println!(
                "{}",
                ui::stats_block(theme(), store.backend(), options.connection_string.as_str(), &stats)
            );
        }
    }

    Ok(())
}
