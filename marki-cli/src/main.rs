//! # marki CLI
//!
//! Command-line interface for converting Markdown trees into HTML.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marki")]
#[command(author, version, about = "Convert .md into .html, and keep it converted", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./marki.yml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown file or directory into HTML
    #[command(after_help = "EXAMPLES:\n    \
        marki convert ./README.md ./README.html dracula\n    \
        marki convert ./markdown ./html dracula --watch")]
    Convert {
        /// Markdown file or directory (falls back to `source` in the config file)
        src: Option<PathBuf>,

        /// Destination file or directory (falls back to `output` in the config file)
        out: Option<PathBuf>,

        /// Code highlight theme (see `marki themes`)
        theme: Option<String>,

        /// Watch <SRC> and rebuild on change
        #[arg(short, long)]
        watch: bool,
    },

    /// List the available code highlight themes
    Themes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Convert {
            src,
            out,
            theme,
            watch,
        } => {
            let args = commands::ConvertArgs {
                src,
                out,
                theme,
                watch,
            };
            commands::convert(cli.config.as_deref(), args).await
        }
        Commands::Themes => commands::list_themes(cli.config.as_deref()),
    }
}
