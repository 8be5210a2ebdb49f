mod config;
mod loader;
mod model;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::model::train_partner_model;
use crate::models::CountryCode;
use crate::pipeline::Pipeline;
use crate::storage::Repository;
use crate::storage::dataset::read_dataset;

#[derive(Parser)]
#[command(name = "agency-scout", about = "Web agency partner discovery", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the directory for every configured country and write the dataset
    Scrape {
        /// Listing pages per country
        #[arg(short = 'p', long)]
        max_pages: Option<u32>,

        /// Directory category slug, e.g. web-developers
        #[arg(short, long)]
        category: Option<String>,

        /// Only these countries, comma separated (US,UK,AU,SA)
        #[arg(long, value_delimiter = ',')]
        countries: Vec<CountryCode>,

        /// Where to write the CSV dataset
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the partnership model and segment partners from the enriched CSV
    Model {
        /// Enriched CSV (dataset plus kaycore_fit_score and revenue_usd)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Import a previously written dataset CSV into DuckDB
    LoadCsv {
        /// Dataset CSV (default: the configured scrape output)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show database statistics
    Stats,

    /// Apply schema migrations without scraping
    Migrate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "agency_scout=info,warn",
        1 => "agency_scout=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { max_pages, category, countries, output } => {
            if let Some(n) = max_pages {
                config.scraper.max_pages = n;
            }
            if let Some(c) = category {
                config.scraper.category = c;
            }
            if !countries.is_empty() {
                config.retain_countries(&countries);
            }
            if let Some(path) = output {
                config.storage.output_csv = path;
            }

            let _t = utils::Timer::start("Directory scrape");
            let stats = Pipeline::new(config).run().await?;
            info!(
                "Done: {} countries, {} unique agencies, {} failed pages",
                stats.countries, stats.agencies_unique, stats.pages_failed
            );
        }

        Command::Model { input } => {
            if let Some(path) = input {
                config.model.enriched_csv = path;
            }
            let _t = utils::Timer::start("Partner model");
            let report = train_partner_model(&config.model)?;
            let accuracy = report
                .holdout_accuracy
                .map(|a| format!("{:.1}%", a * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            info!(
                "Done: {} partners, {} successes, holdout accuracy {}, clusters {:?}",
                report.rows, report.positives, accuracy, report.cluster_sizes
            );
        }

        Command::LoadCsv { file } => {
            let path = file.unwrap_or_else(|| config.storage.output_csv.clone());
            let _t = utils::Timer::start("Dataset import");
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let records = read_dataset(&path)?;
            let n = repo.upsert_agencies(&records)?;
            info!("Done: {} agencies imported from {:?}", n, path);
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let total = repo.agency_count()?;
            let wp = repo.wp_specialist_count()?;
            println!("─────────────────────────────────");
            println!("  Agency Scout — Database Stats");
            println!("─────────────────────────────────");
            println!("  Agencies : {}", utils::fmt_number(total));
            println!("  WordPress: {} ({})", utils::fmt_number(wp), utils::fmt_share(wp, total));
            for (country, n) in repo.counts_by_country()? {
                println!("    {:<6} : {}", country, utils::fmt_number(n));
            }
            match repo.last_run()? {
                Some((status, found)) => println!("  Last run : {} ({} agencies)", status, found),
                None => println!("  Last run : —"),
            }
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
