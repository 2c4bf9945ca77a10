//! Scalar measurements tagged with their unit.

use serde::{Deserialize, Serialize};

/// Unit of measurement for a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kcal")]
    Kilocalories,
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "count/min")]
    BeatsPerMinute,
}

impl Unit {
    pub fn identifier(&self) -> &'static str {
        match self {
            Unit::Kilocalories => "kcal",
            Unit::Meters => "m",
            Unit::BeatsPerMinute => "count/min",
        }
    }
}

/// A scalar value tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A zero total in the given unit, the starting point for accumulation.
    pub fn zero(unit: Unit) -> Self {
        Self { value: 0.0, unit }
    }

    /// Returns a new quantity with `amount` added, in the same unit.
    pub fn adding(&self, amount: f64) -> Self {
        Self {
            value: self.value + amount,
            unit: self.unit,
        }
    }
}

/// One measured sample: a quantity plus the interval it covers.
///
/// Timestamps are epoch seconds, matching the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(flatten)]
    pub quantity: Quantity,
    pub start: f64,
    pub end: f64,
}

impl Sample {
    pub fn new(value: f64, unit: Unit, start: f64, end: f64) -> Self {
        Self {
            quantity: Quantity::new(value, unit),
            start,
            end,
        }
    }
}
