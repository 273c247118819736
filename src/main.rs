use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use cb_export::{DatasetConfig, ExportOptions, Exporter};

#[derive(Parser)]
#[command(name = "cb_export")]
#[command(about = "Streams a Crunchbase CSV dump into a JSON-lines file of company records")]
#[command(version)]
struct Cli {
    /// Directory holding the dump CSV files (overrides config.toml)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract qualifying companies into a JSON-line file
    Export {
        /// The JSON-line file where the companies will be written
        #[arg(long, default_value = "companies.json")]
        out_file: PathBuf,
        /// Continue on the same file from the latest company instead of
        /// restarting from the first
        #[arg(long)]
        keep_going: bool,
        /// The number of companies to output (unset = unbounded)
        #[arg(long)]
        num_companies: Option<usize>,
        /// Acceptable category_codes; if none are given, all are accepted
        #[arg(short = 'c', long = "category-codes")]
        category_codes: Vec<String>,
        /// Minimum total USD investment in a company (the sum of the
        /// disclosed amounts in its funding rounds)
        #[arg(long)]
        min_investments: i64,
    },
    /// Print a single company's entity-table row as JSON
    Lookup {
        /// Numeric part of the company id (`10` looks up `c:10`)
        id: String,
    },
}

fn main() -> Result<()> {
    cb_export::logging::init_logging();

    let cli = Cli::parse();

    let mut config = DatasetConfig::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Export {
            out_file,
            keep_going,
            num_companies,
            category_codes,
            min_investments,
        } => {
            anyhow::ensure!(min_investments >= 0, "--min-investments must be >= 0");
            let exporter = Exporter::new(
                config,
                ExportOptions {
                    min_investments_usd: min_investments,
                    num_companies_cap: num_companies,
                    category_codes,
                },
            );
            let found = exporter.run(&out_file, keep_going)?;
            info!(companies = found, out_file = %out_file.display(), "export finished");
            println!("{} companies written to {}", found, out_file.display());
        }
        Commands::Lookup { id } => {
            let exporter = Exporter::new(config, ExportOptions::default());
            let company = exporter.company(&id)?;
            println!("{}", serde_json::to_string(&company)?);
        }
    }

    Ok(())
}
