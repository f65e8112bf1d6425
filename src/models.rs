// Core data models for windrose

use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Planar Euclidean distance in raw degree space.
    ///
    /// Not a geodesic distance: valid only for comparing candidates
    /// that sit geographically close to each other, which is the
    /// case for answers to the same address.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        ((self.latitude - other.latitude).powi(2) + (self.longitude - other.longitude).powi(2))
            .sqrt()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// A postal address split into its textual components.
///
/// Only used to build the canonical request string; providers never
/// see the components individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub number: String,
    pub quadrant: String,
    pub street: String,
    pub street_class: String,
    pub city: String,
    pub postal: String,
    pub state: String,
    pub country: String,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            number: String::new(),
            quadrant: String::new(),
            street: String::new(),
            street_class: String::new(),
            city: String::new(),
            postal: String::new(),
            state: String::new(),
            country: String::from("United States"),
        }
    }
}

impl fmt::Display for Address {
    /// Renders `"{number} {quadrant} {street} {street_class}, {city},
    /// {state} {postal}"`, skipping empty leading components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leading: Vec<&str> = [
            self.number.as_str(),
            self.quadrant.as_str(),
            self.street.as_str(),
            self.street_class.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();

        write!(
            f,
            "{}, {}, {} {}",
            leading.join(" "),
            self.city,
            self.state,
            self.postal
        )
    }
}

/// A provider's answer tied to the address text that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub address: String,
    pub coordinate: Coordinate,
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate)
    }
}
