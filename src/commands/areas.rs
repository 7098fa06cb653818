use anyhow::{Context, Result};

use matrikkel::config::Config;
use matrikkel::postal::resolve_postal_areas;

pub fn areas(config: &Config) -> Result<()> {
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

    println!(
        "Postal areas for {} (category {})",
        config.harvest.municipalities.join(", "),
        config.harvest.category
    );
    println!("{}", "-".repeat(40));

    for area in &areas {
        println!("{:<6} {}", area.postal_code, area.postal_place);
    }

    println!("\nTotal: {}", areas.len());
    Ok(())
}
