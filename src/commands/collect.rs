use anyhow::{Context, Result};
use std::io::Write;
use tokio::sync::watch;

use matrikkel::browser::WebDriverSession;
use matrikkel::config::Config;
use matrikkel::crawler::fetcher::ApiFetcher;
use matrikkel::crawler::pipeline::{HarvestPipeline, HarvestReport, PipelineConfig};
use matrikkel::postal::resolve_postal_areas;

pub async fn collect(config: Config) -> Result<()> {
    println!("Matrikkel Harvest");
    println!("=================");

    // Reference data problems abort before any network traffic
    let areas = resolve_postal_areas(
        &config.harvest.postal_table,
        &config.harvest.municipalities,
        &config.harvest.category,
    )
    .with_context(|| {
        format!(
            "Failed to load postal areas from {}",
            config.harvest.postal_table.display()
        )
    })?;

    if areas.is_empty() {
        println!(
            "No postal areas of category {} for {}",
            config.harvest.category,
            config.harvest.municipalities.join(", ")
        );
        return Ok(());
    }
    println!("Postal areas: {}", areas.len());

    let fetcher = ApiFetcher::from_config(&config.http).context("Failed to create fetcher")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current address");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = HarvestPipeline::new(PipelineConfig::from_config(&config), fetcher)
        .with_cancellation(cancel_rx);

    let mut session = WebDriverSession::connect(&config.browser)
        .await
        .context("Failed to start browser session")?;

    let report = pipeline
        .harvest(&areas, &mut session, |progress| {
            print!(
                "\r[{}/{}] {} {}",
                progress.index, progress.total, progress.state, progress.address
            );
            let _ = std::io::stdout().flush();
        })
        .await?;
    println!(); // New line after progress

    print_summary(&config, &report);

    Ok(())
}

fn print_summary(config: &Config, report: &HarvestReport) {
    let stats = &report.stats;

    println!("\nHarvest Summary");
    println!("===============");
    if report.cancelled {
        println!("Interrupted: partial results written");
    }
    println!("Addresses: {}", stats.total_addresses);
    println!("Recorded: {}", stats.recorded);
    println!("Failed: {} ({:.1}%)", stats.failed, stats.failure_rate());
    println!("Duplicate parcels: {}", stats.duplicates);
    println!("Failed postal areas: {}", stats.failed_areas);
    println!("Rate: {:.1} addresses/min", stats.rate_per_minute());
    println!(
        "Output: {} ({} rows)",
        config.harvest.output.display(),
        report.total_rows
    );
    if let Some(path) = &config.harvest.dedup_output {
        println!(
            "Deduplicated: {} ({} rows)",
            path.display(),
            report.records.len()
        );
    }

    if !config.harvest.verbose {
        return;
    }

    if !report.failed_areas.is_empty() {
        println!("\nFailed Postal Areas");
        println!("-------------------");
        for failed in &report.failed_areas {
            println!("{}: {}", failed.area, failed.message);
        }
    }

    if !report.failures.is_empty() {
        println!("\nFailed Addresses");
        println!("----------------");
        for failure in &report.failures {
            println!(
                "{} [{} / {}, reached {}]: {}",
                failure.address,
                failure.stage,
                failure.category,
                failure.last_state,
                failure.message
            );
        }
    }
}
