//! twowaykv Command Line Interface
//!
//! Serves the HTTP API and runs maintenance tasks against a data directory.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use twowaykv::config::DEFAULT_MAX_VALUE;
use twowaykv::BidirectionalIndex;
use twowaykv_server::config::{resolve_port, ServerConfig, DEFAULT_HOST, DEFAULT_PORT, MIN_PORT};

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "twowaykv=info,twowaykv_server=info,tower_http=debug";

/// twowaykv: a key <-> random identifier store.
#[derive(Parser, Debug)]
#[command(name = "twowaykv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Storage root holding the k2v and v2k engines
    #[arg(short, long, env = "GRAPH_DB_STORE_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (PORT overrides it when set)
        #[arg(
            short,
            long,
            env = "GRAPH_DB_STORE_PORT",
            default_value_t = DEFAULT_PORT,
            value_parser = clap::value_parser!(u16).range(i64::from(MIN_PORT)..)
        )]
        port: u16,

        /// Host to bind to
        #[arg(long, env = "GRAPH_DB_STORE_HOST", default_value = DEFAULT_HOST)]
        host: String,

        /// Exclusive upper bound of allocated values
        #[arg(
            long,
            env = "TWOWAYKV_MAX_VALUE",
            default_value_t = DEFAULT_MAX_VALUE,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        max_value: u64,
    },

    /// Write every entry as JSON lines
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify that both directions of the index agree
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .context("no data directory specified. Use --data-dir or set GRAPH_DB_STORE_DIR")?;

    match cli.command {
        Commands::Serve { port, host, max_value } => {
            let port = resolve_port(port, std::env::var("PORT").ok().as_deref())?;
            let config = ServerConfig { data_dir, host, port, max_value };
            twowaykv_server::server::run(config).await
        }
        Commands::Export { output } => export(&data_dir, &output),
        Commands::Check => check(&data_dir),
    }
}

fn export(data_dir: &Path, output: &Path) -> Result<()> {
    let index = BidirectionalIndex::open(data_dir)?;
    let file = File::create(output)
        .with_context(|| format!("could not create {}", output.display()))?;

    let stats = index.export_jsonl(BufWriter::new(file))?;
    println!("Exported {} entries ({} bytes) to {}", stats.entries, stats.bytes, output.display());
    Ok(())
}

fn check(data_dir: &Path) -> Result<()> {
    let index = BidirectionalIndex::open(data_dir)?;
    let report = index.check_consistency()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_consistent() {
        bail!(
            "index is inconsistent: {} forward entries without reverse, {} orphaned reverse entries",
            report.missing_reverse.len(),
            report.orphaned_reverse.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["twowaykv", "--data-dir", "/data", "serve"]).expect("parse");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/data")));
        match cli.command {
            Commands::Serve { port, host, max_value } => {
                assert_eq!(port, 8080);
                assert_eq!(host, "0.0.0.0");
                assert_eq!(max_value, 9_223_372_036_854_775_807);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_serve_alias_and_port_range() {
        let cli = Cli::try_parse_from(["twowaykv", "s", "--port", "4000"]).expect("parse");
        assert!(matches!(cli.command, Commands::Serve { port: 4000, .. }));

        assert!(Cli::try_parse_from(["twowaykv", "serve", "--port", "80"]).is_err());
        assert!(Cli::try_parse_from(["twowaykv", "serve", "--max-value", "0"]).is_err());
    }

    #[test]
    fn test_export_requires_output() {
        assert!(Cli::try_parse_from(["twowaykv", "export"]).is_err());
        let cli = Cli::try_parse_from(["twowaykv", "export", "-o", "out.jsonl"]).expect("parse");
        assert!(matches!(cli.command, Commands::Export { .. }));
    }
}
