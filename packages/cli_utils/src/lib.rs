#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the field map toolchain.
//!
//! Provides [`init_logger`], which sets up `pretty_env_logger` from
//! `RUST_LOG`, and the coordinate parsing and prompting helpers used by
//! both the argument parser and the interactive session.

use dialoguer::{Confirm, Input};
use field_map_geometry_models::Point;
use thiserror::Error;

/// Error returned by [`parse_point`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointParseError {
    #[error("expected `longitude,latitude`, got {0:?}")]
    Format(String),
    #[error("{0:?} is not a number")]
    Number(String),
    #[error("{0} is outside the valid coordinate range")]
    Range(String),
}

/// Parses `longitude,latitude` (whitespace around either number is
/// allowed) into a valid WGS84 point.
///
/// # Errors
///
/// * [`PointParseError`] if the input is malformed or out of range
pub fn parse_point(value: &str) -> Result<Point, PointParseError> {
    let (lon, lat) = value
        .split_once(',')
        .ok_or_else(|| PointParseError::Format(value.to_string()))?;

    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| PointParseError::Number(s.trim().to_string()))
    };

    let point = Point::new(number(lon)?, number(lat)?);
    if !point.is_valid() {
        return Err(PointParseError::Range(point.to_string()));
    }

    Ok(point)
}

/// Prompts for a coordinate until a valid one is entered.
///
/// # Errors
///
/// Returns an error if the terminal interaction fails.
pub fn prompt_point(prompt: &str, default: Point) -> Result<Point, dialoguer::Error> {
    let input: String = Input::new()
        .with_prompt(format!("{prompt} (longitude,latitude)"))
        .default(format!("{},{}", default.longitude, default.latitude))
        .validate_with(|input: &String| parse_point(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?;

    // Validated above.
    Ok(parse_point(&input).unwrap_or(default))
}

/// Prompts for free text, returning an empty string when skipped.
///
/// # Errors
///
/// Returns an error if the terminal interaction fails.
pub fn prompt_text(prompt: &str, initial: &str) -> Result<String, dialoguer::Error> {
    Input::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
}

/// Asks a yes/no question.
///
/// # Errors
///
/// Returns an error if the terminal interaction fails.
pub fn confirm(prompt: &str) -> Result<bool, dialoguer::Error> {
    Confirm::new().with_prompt(prompt).default(false).interact()
}

/// Initializes the global `pretty_env_logger` logger from `RUST_LOG`.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_logger() {
    if pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lon_lat_pairs() {
        assert_eq!(parse_point("-74.5,40").unwrap(), Point::new(-74.5, 40.0));
        assert_eq!(parse_point(" 10.25 , -3.5 ").unwrap(), Point::new(10.25, -3.5));
    }

    #[test]
    fn rejects_malformed_and_out_of_range_input() {
        assert!(matches!(parse_point("40"), Err(PointParseError::Format(_))));
        assert!(matches!(parse_point("a,1"), Err(PointParseError::Number(_))));
        assert!(matches!(parse_point("0,95"), Err(PointParseError::Range(_))));
    }
}
