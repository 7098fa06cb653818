use anyhow::{Context, Result};

use matrikkel::config::Config;
use matrikkel::crawler::url::map_viewer_url;
use matrikkel::models::RawCoordinates;
use matrikkel::transform::CoordinateTransformer;

pub fn reproject(config: &Config, easting: f64, northing: f64, source_epsg: u32) -> Result<()> {
    let target_epsg = config.harvest.target_epsg;
    let transformer = CoordinateTransformer::new();
    let (latitude, longitude) = transformer
        .transform(easting, northing, source_epsg, target_epsg)
        .with_context(|| format!("Cannot convert ({easting}, {northing}) from EPSG:{source_epsg}"))?;

    let coordinates = RawCoordinates {
        easting,
        northing,
        epsg: source_epsg,
    };

    println!("EPSG:{source_epsg} {easting} {northing}");
    println!("Latitude:  {latitude:.7}");
    println!("Longitude: {longitude:.7}");
    println!(
        "Norgeskart: {}",
        map_viewer_url(&config.sources.map_viewer_url, &coordinates)
    );

    Ok(())
}
