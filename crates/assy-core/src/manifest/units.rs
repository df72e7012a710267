//! Assembly length units

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::MM_PER_INCH;

/// Length unit of every translation, anchor and geometry file in a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Units {
    #[default]
    Millimeters,
    Inches,
}

impl Units {
    /// Millimetres per unit
    pub fn mm_per_unit(&self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Inches => MM_PER_INCH,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Units::Millimeters => "mm",
            Units::Inches => "inch",
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(Units::Millimeters),
            "in" | "inch" | "inches" => Ok(Units::Inches),
            other => Err(format!("unsupported units: {other}")),
        }
    }
}

impl TryFrom<String> for Units {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Units> for String {
    fn from(units: Units) -> Self {
        units.name().to_string()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
