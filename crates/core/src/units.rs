//! Measurement units and quantity conversion.
//!
//! Mass, volume and count units convert freely within their dimension. Crossing
//! between mass and volume needs an ingredient density (grams per millilitre);
//! counts never convert to anything else.

use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("cannot convert a negative quantity ({0})")]
    NegativeValue(Decimal),

    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: MeasureUnit, to: MeasureUnit },

    #[error("density must be positive, got {0}")]
    InvalidDensity(Decimal),

    #[error("{value} {from} does not fit when converted to {to}")]
    Overflow {
        value: Decimal,
        from: MeasureUnit,
        to: MeasureUnit,
    },
}

/// Physical dimension of a unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    Gram,
    Kilogram,
    Ounce,
    Pound,
    Milliliter,
    Liter,
    Teaspoon,
    Tablespoon,
    FluidOunce,
    Cup,
    Each,
}

impl MeasureUnit {
    pub fn dimension(self) -> Dimension {
        match self {
            MeasureUnit::Gram | MeasureUnit::Kilogram | MeasureUnit::Ounce | MeasureUnit::Pound => {
                Dimension::Mass
            }
            MeasureUnit::Milliliter
            | MeasureUnit::Liter
            | MeasureUnit::Teaspoon
            | MeasureUnit::Tablespoon
            | MeasureUnit::FluidOunce
            | MeasureUnit::Cup => Dimension::Volume,
            MeasureUnit::Each => Dimension::Count,
        }
    }

    /// Size of one unit expressed in the dimension's base unit (g, ml, each).
    fn base_factor(self) -> Decimal {
        match self {
            MeasureUnit::Gram => dec!(1),
            MeasureUnit::Kilogram => dec!(1000),
            MeasureUnit::Ounce => dec!(28.349523125),
            MeasureUnit::Pound => dec!(453.59237),
            MeasureUnit::Milliliter => dec!(1),
            MeasureUnit::Liter => dec!(1000),
            MeasureUnit::Teaspoon => dec!(4.92892159375),
            MeasureUnit::Tablespoon => dec!(14.78676478125),
            MeasureUnit::FluidOunce => dec!(29.5735295625),
            MeasureUnit::Cup => dec!(236.5882365),
            MeasureUnit::Each => dec!(1),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            MeasureUnit::Gram => "g",
            MeasureUnit::Kilogram => "kg",
            MeasureUnit::Ounce => "oz",
            MeasureUnit::Pound => "lb",
            MeasureUnit::Milliliter => "ml",
            MeasureUnit::Liter => "l",
            MeasureUnit::Teaspoon => "tsp",
            MeasureUnit::Tablespoon => "tbsp",
            MeasureUnit::FluidOunce => "fl oz",
            MeasureUnit::Cup => "cup",
            MeasureUnit::Each => "each",
        }
    }
}

impl core::fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for MeasureUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "g" | "gram" | "grams" => MeasureUnit::Gram,
            "kg" | "kilogram" | "kilograms" => MeasureUnit::Kilogram,
            "oz" | "ounce" | "ounces" => MeasureUnit::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => MeasureUnit::Pound,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                MeasureUnit::Milliliter
            }
            "l" | "liter" | "liters" | "litre" | "litres" => MeasureUnit::Liter,
            "tsp" | "teaspoon" | "teaspoons" => MeasureUnit::Teaspoon,
            "tbsp" | "tablespoon" | "tablespoons" => MeasureUnit::Tablespoon,
            "fl oz" | "floz" | "fluid ounce" | "fluid ounces" => MeasureUnit::FluidOunce,
            "c" | "cup" | "cups" => MeasureUnit::Cup,
            "each" | "ea" | "count" | "piece" | "pieces" => MeasureUnit::Each,
            _ => return Err(ConversionError::UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

/// Convert `value` between units of the same dimension.
pub fn convert(value: Decimal, from: MeasureUnit, to: MeasureUnit) -> Result<Decimal, ConversionError> {
    convert_with_density(value, from, to, None)
}

/// Convert `value`, crossing mass/volume through `density_g_per_ml` when given.
pub fn convert_with_density(
    value: Decimal,
    from: MeasureUnit,
    to: MeasureUnit,
    density_g_per_ml: Option<Decimal>,
) -> Result<Decimal, ConversionError> {
    if value < Decimal::ZERO {
        return Err(ConversionError::NegativeValue(value));
    }
    if from == to {
        return Ok(value);
    }

    let overflow = || ConversionError::Overflow { value, from, to };
    let base = value.checked_mul(from.base_factor()).ok_or_else(overflow)?;
    let converted = match (from.dimension(), to.dimension()) {
        (a, b) if a == b => Some(base),
        (Dimension::Volume, Dimension::Mass) => {
            base.checked_mul(positive_density(density_g_per_ml, from, to)?)
        }
        (Dimension::Mass, Dimension::Volume) => {
            base.checked_div(positive_density(density_g_per_ml, from, to)?)
        }
        _ => return Err(ConversionError::IncompatibleUnits { from, to }),
    }
    .ok_or_else(overflow)?;

    converted
        .checked_div(to.base_factor())
        .map(|v| v.normalize())
        .ok_or_else(overflow)
}

/// Parse both unit names and convert; the string form used at external boundaries.
pub fn convert_named(value: Decimal, from: &str, to: &str) -> Result<Decimal, ConversionError> {
    convert(value, from.parse()?, to.parse()?)
}

fn positive_density(
    density: Option<Decimal>,
    from: MeasureUnit,
    to: MeasureUnit,
) -> Result<Decimal, ConversionError> {
    match density {
        Some(d) if d > Decimal::ZERO => Ok(d),
        Some(d) => Err(ConversionError::InvalidDensity(d)),
        None => Err(ConversionError::IncompatibleUnits { from, to }),
    }
}
