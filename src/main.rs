use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matrikkel::config::{AmbiguityPolicy, Config};

mod commands;

#[derive(Parser)]
#[command(
    name = "matrikkel",
    version,
    about = "Harvest Norwegian parcel area and position for every street address in a municipality",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults and MATRIKKEL_* environment otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full harvest and write the output table
    Collect {
        /// Municipality name; repeat for several
        #[arg(short, long = "municipality")]
        municipalities: Vec<String>,

        /// Postal-code reference table
        #[arg(short, long)]
        postal_table: Option<PathBuf>,

        /// Full output table
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the table deduplicated by cadastral identifier
        #[arg(long)]
        dedup_output: Option<PathBuf>,

        /// Process only the first N addresses
        #[arg(short, long)]
        limit: Option<usize>,

        /// WebDriver endpoint
        #[arg(long)]
        webdriver: Option<String>,

        /// Ambiguous cadastral matches: first or reject
        #[arg(long)]
        ambiguity: Option<String>,

        /// Do not report individual failed addresses
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the postal areas a harvest would query
    Areas {
        /// Municipality name; repeat for several
        #[arg(short, long = "municipality")]
        municipalities: Vec<String>,

        /// Postal-code reference table
        #[arg(short, long)]
        postal_table: Option<PathBuf>,
    },

    /// Convert one projected coordinate to latitude/longitude
    Reproject {
        /// Easting in meters
        easting: f64,

        /// Northing in meters
        northing: f64,

        /// Source EPSG code, e.g. 25832
        #[arg(default_value = "25833")]
        epsg: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    setup_tracing(&cli.log_format, cli.verbose, &config.logging.level)?;

    tracing::info!("matrikkel starting");

    match cli.command {
        Commands::Collect {
            municipalities,
            postal_table,
            output,
            dedup_output,
            limit,
            webdriver,
            ambiguity,
            quiet,
        } => {
            apply_scope(&mut config, municipalities, postal_table);
            if let Some(output) = output {
                config.harvest.output = output;
            }
            if dedup_output.is_some() {
                config.harvest.dedup_output = dedup_output;
            }
            if limit.is_some() {
                config.harvest.limit = limit;
            }
            if let Some(url) = webdriver {
                config.browser.webdriver_url = url;
            }
            if let Some(policy) = ambiguity {
                config.harvest.ambiguity = AmbiguityPolicy::parse(&policy)
                    .with_context(|| format!("Unknown ambiguity policy: {policy}"))?;
            }
            if quiet {
                config.harvest.verbose = false;
            }
            config.validate().context("Invalid configuration")?;

            tracing::info!(
                municipalities = ?config.harvest.municipalities,
                limit = ?config.harvest.limit,
                output = %config.harvest.output.display(),
                "Starting collect command"
            );
            commands::collect(config).await?;
        }

        Commands::Areas {
            municipalities,
            postal_table,
        } => {
            apply_scope(&mut config, municipalities, postal_table);
            commands::areas(&config)?;
        }

        Commands::Reproject {
            easting,
            northing,
            epsg,
        } => {
            commands::reproject(&config, easting, northing, epsg)?;
        }
    }

    Ok(())
}

fn apply_scope(config: &mut Config, municipalities: Vec<String>, postal_table: Option<PathBuf>) {
    if !municipalities.is_empty() {
        config.harvest.municipalities = municipalities;
    }
    if let Some(path) = postal_table {
        config.harvest.postal_table = path;
    }
}

fn setup_tracing(format: &str, verbose: bool, level: &str) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("matrikkel=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("matrikkel={level},warn")))
            .context("Invalid log level")?
    };

    // Logs go to stderr so the progress line on stdout stays intact
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
