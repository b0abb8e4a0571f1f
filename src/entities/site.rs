// 🌊 Site Entity - the metocean location a structure is installed at
//
// State = the still-water level being considered (MSL, HAT or LAT).
// The site itself does not change; the water level it is evaluated at does.

use crate::entities::checked_parameters;
use crate::entity::{EntityCore, Stateful};
use crate::error::ParameterError;
use crate::parameters::{ParameterDefinition, ParameterSet, ValidationRule};
use crate::schema::ParameterSchema;
use crate::state::{State, StateMachine};
use crate::units::{Dimension, Unit};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const KIND: &str = "site";

// ============================================================================
// SITE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteState {
    /// Mean sea level
    Msl,

    /// Highest astronomical tide
    Hat,

    /// Lowest astronomical tide
    Lat,
}

impl State for SiteState {
    fn name(&self) -> &'static str {
        match self {
            SiteState::Msl => "MSL",
            SiteState::Hat => "HAT",
            SiteState::Lat => "LAT",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            SiteState::Msl => "Mean sea level",
            SiteState::Hat => "Highest astronomical tide",
            SiteState::Lat => "Lowest astronomical tide",
        }
    }
}

impl SiteState {
    pub fn all() -> Vec<SiteState> {
        vec![SiteState::Msl, SiteState::Hat, SiteState::Lat]
    }

    /// Still-water level relative to MSL
    pub fn tide_offset(&self, parameters: &ParameterSet) -> Result<f64, ParameterError> {
        match self {
            SiteState::Msl => Ok(0.0),
            SiteState::Hat => parameters.si("HighestAstronomicalTide"),
            SiteState::Lat => parameters.si("LowestAstronomicalTide"),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn schema() -> ParameterSchema {
    ParameterSchema::new(KIND)
        .with(
            ParameterDefinition::new("MeanSeaLevel", Dimension::Length)
                .with_description("Water depth at mean sea level")
                .with_default(100.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("HighestAstronomicalTide", Dimension::Length)
                .with_description("HAT above MSL")
                .with_default(2.0, Unit::Meter)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("LowestAstronomicalTide", Dimension::Length)
                .with_description("LAT relative to MSL (negative below)")
                .with_default(-2.0, Unit::Meter)
                .with_validation(ValidationRule::Range { min: -50.0, max: 0.0 }),
        )
        .with(
            ParameterDefinition::new("WaterDensity", Dimension::Density)
                .with_default(1.025, Unit::TonnePerCubicMeter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("WaterTemperature", Dimension::Temperature)
                .with_default(10.0, Unit::DegreeCelsius)
                .with_validation(ValidationRule::Range { min: -2.0, max: 40.0 }),
        )
        .with(
            ParameterDefinition::new("MarineGrowthFactor", Dimension::Dimensionless)
                .with_description("Scaling of design marine growth at this site")
                .with_default(100.0, Unit::Percent)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("SoilStiffness", Dimension::SubgradeModulus)
                .with_description("Seabed normal stiffness")
                .with_default(50.0, Unit::KiloNewtonPerCubicMeter)
                .with_validation(ValidationRule::Positive),
        )
}

// ============================================================================
// SITE ENTITY
// ============================================================================

#[derive(Debug, Clone)]
pub struct Site {
    core: EntityCore<SiteState>,
}

impl Site {
    /// Site evaluated at MSL; any level may follow any other
    pub fn new(name: impl Into<String>, parameters: ParameterSet) -> Result<Self> {
        let parameters = checked_parameters(&schema(), parameters)?;
        let machine = StateMachine::new(KIND, SiteState::all(), SiteState::Msl)?;

        Ok(Site {
            core: EntityCore::new(name, parameters, machine),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Site::new("Site", schema().defaults()?)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.core = self.core.with_id(id);
        self
    }

    /// Water depth at the current still-water level
    pub fn water_depth(&self) -> Result<f64> {
        let params = self.core.parameters();
        let depth = params.si("MeanSeaLevel")? + self.state().tide_offset(params)?;
        if depth <= 0.0 {
            bail!("Site dries out at {} (depth {:.2} m)", self.state().name(), depth);
        }
        Ok(depth)
    }

    /// kg/m^3
    pub fn water_density(&self) -> Result<f64> {
        Ok(self.core.parameters().si("WaterDensity")?)
    }

    /// Fraction applied to design marine growth thickness
    pub fn marine_growth_factor(&self) -> Result<f64> {
        Ok(self.core.parameters().si("MarineGrowthFactor")?)
    }
}

impl Stateful for Site {
    type State = SiteState;
    const KIND: &'static str = KIND;

    fn core(&self) -> &EntityCore<SiteState> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore<SiteState> {
        &mut self.core
    }
}

// ============================================================================
// TESTS
// ============================================================================
