#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the field map core.
//!
//! `field_map measure` prints the readout of a line or area given as
//! coordinates. `field_map session` (the default when no subcommand is
//! given) runs an interactive annotation session against an in-memory
//! map, printing overlays as `GeoJSON` on request.

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use field_map_cli_utils::parse_point;
use field_map_config::AppConfig;
use field_map_geometry::{SphericalMath, geo_json};
use field_map_geometry_models::{Geometry, Point};
use field_map_measure::MeasurementEngine;

#[derive(Parser)]
#[command(name = "field_map", about = "Draw, measure and annotate map features")]
struct Cli {
    /// TOML file merged over the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a line or an area
    Measure {
        /// Print the shape and its labels as a `GeoJSON` feature
        #[arg(long)]
        geojson: bool,

        #[command(subcommand)]
        shape: Shape,
    },
    /// Run an interactive annotation session
    Session,
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum Shape {
    /// Segment distances and total length of a path
    Line {
        /// Vertices as `longitude,latitude`
        #[arg(
            required = true,
            num_args = 2..,
            allow_hyphen_values = true,
            value_parser = parse_point
        )]
        points: Vec<Point>,
    },
    /// Edge distances, perimeter and enclosed area of a polygon
    Area {
        /// Ring vertices as `longitude,latitude`; the ring is closed
        /// automatically
        #[arg(
            required = true,
            num_args = 3..,
            allow_hyphen_values = true,
            value_parser = parse_point
        )]
        points: Vec<Point>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    field_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = field_map_config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Session) {
        Commands::Measure { geojson, shape } => {
            let geometry = match shape {
                Shape::Line { points } => Geometry::LineString(points),
                Shape::Area { points } => Geometry::polygon(points),
            };
            measure(&config, &geometry, geojson)?;
        }
        Commands::Session => session::run(&config)?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

/// Prints the readout of one geometry.
fn measure(
    config: &AppConfig,
    geometry: &Geometry,
    as_geojson: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = MeasurementEngine::new(Arc::new(SphericalMath), config.measurement);
    let snapshot = engine.try_measure(Some(geometry))?;

    if as_geojson {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "segments".to_string(),
            serde_json::Value::from(snapshot.segment_labels()),
        );
        properties.insert("total".to_string(), snapshot.total_label().into());
        if let Some(perimeter) = snapshot.perimeter_label() {
            properties.insert("perimeter".to_string(), perimeter.into());
        }

        let feature = geo_json::feature(geometry, None, properties);
        println!("{}", serde_json::to_string_pretty(&feature)?);
        return Ok(());
    }

    for (i, (segment, label)) in snapshot
        .segments
        .iter()
        .zip(snapshot.segment_labels())
        .enumerate()
    {
        println!("{:>3}  {} -> {}  {label}", i + 1, segment.from, segment.to);
    }
    println!();
    println!("{snapshot}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "field_map",
            "measure",
            "--geojson",
            "area",
            "-74.5,40",
            "-74.4,40",
            "-74.4,40.1",
        ])
        .unwrap();

        let Some(Commands::Measure {
            geojson: true,
            shape: Shape::Area { points },
        }) = cli.command
        else {
            panic!("expected measure area");
        };
        assert_eq!(points[0], Point::new(-74.5, 40.0));
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn line_needs_two_points() {
        assert!(Cli::try_parse_from(["field_map", "measure", "line", "0,0"]).is_err());
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["field_map", "--config", "custom.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
