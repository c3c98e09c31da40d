//! Wire types for prediction requests and responses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Neighbourhood class of a house.
///
/// Unlisted values are kept verbatim and priced with the neutral multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    A,
    B,
    D,
    Other(String),
}

impl Location {
    /// Price multiplier applied for this location
    pub fn multiplier(&self) -> f64 {
        match self {
            Location::A => 1.06,
            Location::B => 1.02,
            Location::D => 0.98,
            Location::Other(_) => 1.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Location::A => "A",
            Location::B => "B",
            Location::D => "D",
            Location::Other(raw) => raw,
        }
    }
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "A" => Location::A,
            "B" => Location::B,
            "D" => Location::D,
            _ => Location::Other(raw),
        }
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Location::from(raw.to_string())
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        match location {
            Location::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// House features used by the price model.
///
/// Field names are PascalCase on the wire; lowercase names are accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct House {
    #[serde(alias = "size")]
    pub size: f64,
    #[serde(alias = "bedrooms")]
    pub bedrooms: f64,
    #[serde(alias = "age")]
    pub age: f64,
    #[serde(alias = "location")]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredictionRequest {
    #[serde(alias = "house")]
    pub house: House,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredictionResponse {
    pub price: f64,
}
