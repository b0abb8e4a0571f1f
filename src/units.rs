// 📏 Units - Physical quantities with explicit units
//
// Every parameter value carries its unit. Arithmetic happens in SI after
// `Quantity::si()`, never on raw numbers of unknown unit.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// DIMENSION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Dimensionless,
    Length,
    Angle,
    Mass,
    Density,
    Temperature,
    Time,
    /// Soil reaction per unit area per unit penetration
    SubgradeModulus,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Dimensionless => "dimensionless",
            Dimension::Length => "length",
            Dimension::Angle => "angle",
            Dimension::Mass => "mass",
            Dimension::Density => "density",
            Dimension::Temperature => "temperature",
            Dimension::Time => "time",
            Dimension::SubgradeModulus => "subgrade modulus",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// UNIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Dimensionless,
    Percent,
    Meter,
    Millimeter,
    Degree,
    Kilogram,
    Tonne,
    KilogramPerCubicMeter,
    TonnePerCubicMeter,
    DegreeCelsius,
    Second,
    KiloNewtonPerCubicMeter,
}

impl Unit {
    const ALL: [Unit; 12] = [
        Unit::Dimensionless,
        Unit::Percent,
        Unit::Meter,
        Unit::Millimeter,
        Unit::Degree,
        Unit::Kilogram,
        Unit::Tonne,
        Unit::KilogramPerCubicMeter,
        Unit::TonnePerCubicMeter,
        Unit::DegreeCelsius,
        Unit::Second,
        Unit::KiloNewtonPerCubicMeter,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Dimensionless => "-",
            Unit::Percent => "%",
            Unit::Meter => "m",
            Unit::Millimeter => "mm",
            Unit::Degree => "deg",
            Unit::Kilogram => "kg",
            Unit::Tonne => "t",
            Unit::KilogramPerCubicMeter => "kg/m^3",
            Unit::TonnePerCubicMeter => "t/m^3",
            Unit::DegreeCelsius => "degC",
            Unit::Second => "s",
            Unit::KiloNewtonPerCubicMeter => "kN/m^3",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Dimensionless | Unit::Percent => Dimension::Dimensionless,
            Unit::Meter | Unit::Millimeter => Dimension::Length,
            Unit::Degree => Dimension::Angle,
            Unit::Kilogram | Unit::Tonne => Dimension::Mass,
            Unit::KilogramPerCubicMeter | Unit::TonnePerCubicMeter => Dimension::Density,
            Unit::DegreeCelsius => Dimension::Temperature,
            Unit::Second => Dimension::Time,
            Unit::KiloNewtonPerCubicMeter => Dimension::SubgradeModulus,
        }
    }

    /// Multiplier from this unit to the SI unit of its dimension.
    ///
    /// Angles go to radians, percentages to fractions. Temperatures stay in
    /// degrees Celsius (no offset conversion is ever needed here).
    pub fn si_factor(&self) -> f64 {
        match self {
            Unit::Dimensionless => 1.0,
            Unit::Percent => 0.01,
            Unit::Meter => 1.0,
            Unit::Millimeter => 1.0e-3,
            Unit::Degree => std::f64::consts::PI / 180.0,
            Unit::Kilogram => 1.0,
            Unit::Tonne => 1.0e3,
            Unit::KilogramPerCubicMeter => 1.0,
            Unit::TonnePerCubicMeter => 1.0e3,
            Unit::DegreeCelsius => 1.0,
            Unit::Second => 1.0,
            Unit::KiloNewtonPerCubicMeter => 1.0e3,
        }
    }

    /// Parse a unit symbol as written in parameter files ("m", "t/m^3", ...)
    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Some(Unit::Dimensionless);
        }
        Unit::ALL.iter().copied().find(|u| u.symbol() == trimmed)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// QUANTITY
// ============================================================================

/// A value together with the unit it was given in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Quantity { value, unit }
    }

    pub fn dimensionless(value: f64) -> Self {
        Quantity::new(value, Unit::Dimensionless)
    }

    pub fn meters(value: f64) -> Self {
        Quantity::new(value, Unit::Meter)
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Value in the SI unit of this quantity's dimension
    pub fn si(&self) -> f64 {
        self.value * self.unit.si_factor()
    }

    /// Value expressed in another unit of the same dimension
    pub fn in_unit(&self, target: Unit) -> Option<f64> {
        if target.dimension() != self.dimension() {
            return None;
        }
        Some(self.si() / target.si_factor())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

// ============================================================================
// TESTS
// ============================================================================
