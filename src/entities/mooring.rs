// ⚓ Mooring System Entity
//
// Same lines, same anchors, different life stage:
// - LayDown:   pre-laid on the seabed, awaiting hook-up
// - InSitu:    hooked up and tensioned
// - Weathered: after years in service (corrosion, marine growth)

use crate::entities::checked_parameters;
use crate::entity::{EntityCore, Stateful};
use crate::ofx::{LineSpec, ModelBuilder};
use crate::parameters::{ParameterDefinition, ParameterSet, ValidationRule};
use crate::schema::ParameterSchema;
use crate::state::{State, StateMachine, TransitionTable};
use crate::units::{Dimension, Unit};
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::info;

pub const KIND: &str = "mooring_system";

/// Upper bound on bundles and on lines per bundle
pub const MAX_COUNT: f64 = 64.0;

/// Studless chain mass per length is 19.9 d^2 t/m with d in metres
const CHAIN_MASS_COEFFICIENT: f64 = 19.9e3;

/// Studless chain equivalent hydrodynamic diameter over nominal diameter
const CHAIN_HYDRODYNAMIC_RATIO: f64 = 1.8;

// ============================================================================
// MOORING STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MooringState {
    LayDown,
    InSitu,
    Weathered,
}

impl State for MooringState {
    fn name(&self) -> &'static str {
        match self {
            MooringState::LayDown => "LayDown",
            MooringState::InSitu => "InSitu",
            MooringState::Weathered => "Weathered",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MooringState::LayDown => "Mooring system as it awaits hook-up",
            MooringState::InSitu => "Mooring system after hook-up and tensioning",
            MooringState::Weathered => {
                "Mooring system after a considerable time in service (marine growth, corrosion)"
            }
        }
    }
}

/// Line properties that depend on the life stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineCondition {
    pub connected: bool,
    pub nominal_diameter: f64,
    pub hydrodynamic_diameter: f64,
    pub mass_per_length: f64,
}

impl MooringState {
    pub fn all() -> Vec<MooringState> {
        vec![MooringState::LayDown, MooringState::InSitu, MooringState::Weathered]
    }

    /// Hook-up, disconnection and ageing; ageing is one way
    pub fn transitions() -> TransitionTable {
        TransitionTable::new()
            .allow("LayDown", "InSitu")
            .allow("InSitu", "LayDown")
            .allow("InSitu", "Weathered")
            .allow("Weathered", "LayDown")
    }

    pub fn line_condition(&self, parameters: &ParameterSet) -> Result<LineCondition> {
        let nominal = parameters.si("ChainDiameter")?;

        match self {
            MooringState::LayDown | MooringState::InSitu => Ok(LineCondition {
                connected: *self == MooringState::InSitu,
                nominal_diameter: nominal,
                hydrodynamic_diameter: CHAIN_HYDRODYNAMIC_RATIO * nominal,
                mass_per_length: chain_mass_per_length(nominal),
            }),
            MooringState::Weathered => {
                let corroded = nominal - parameters.si("CorrosionAllowance")?;
                if corroded <= 0.0 {
                    bail!(
                        "Corrosion allowance consumes the whole chain diameter ({:.3} m)",
                        nominal
                    );
                }

                let growth = parameters.si("MarineGrowthThickness")?;
                let growth_density = parameters.si("MarineGrowthDensity")?;
                let bare = CHAIN_HYDRODYNAMIC_RATIO * corroded;
                let fouled = bare + 2.0 * growth;
                let growth_mass = growth_density * PI / 4.0 * (fouled * fouled - bare * bare);

                Ok(LineCondition {
                    connected: true,
                    nominal_diameter: corroded,
                    hydrodynamic_diameter: fouled,
                    mass_per_length: chain_mass_per_length(corroded) + growth_mass,
                })
            }
        }
    }
}

/// kg/m for a studless chain of nominal diameter `d` (m)
pub fn chain_mass_per_length(d: f64) -> f64 {
    CHAIN_MASS_COEFFICIENT * d * d
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn schema() -> ParameterSchema {
    ParameterSchema::new(KIND)
        .with(
            ParameterDefinition::new("AnchorRadius", Dimension::Length)
                .with_description("Horizontal distance from the platform centre to the anchors")
                .with_default(200.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("NumberOfLinesPerBundle", Dimension::Dimensionless)
                .with_default(4.0, Unit::Dimensionless)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive)
                .with_validation(ValidationRule::Integer)
                .with_validation(ValidationRule::Range { min: 1.0, max: MAX_COUNT }),
        )
        .with(
            ParameterDefinition::new("NumberOfBundles", Dimension::Dimensionless)
                .with_default(3.0, Unit::Dimensionless)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive)
                .with_validation(ValidationRule::Integer)
                .with_validation(ValidationRule::Range { min: 1.0, max: MAX_COUNT }),
        )
        .with(
            ParameterDefinition::new("BundleSpread", Dimension::Angle)
                .with_description("Heading difference between adjacent lines of a bundle")
                .with_default(5.0, Unit::Degree)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("FairleadRadius", Dimension::Length)
                .with_default(30.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("FairleadDepth", Dimension::Length)
                .with_description("Fairlead depth below MSL")
                .with_default(15.0, Unit::Meter)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("WaterDepth", Dimension::Length)
                .with_default(100.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("LineLength", Dimension::Length)
                .with_default(250.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("ChainDiameter", Dimension::Length)
                .with_description("Nominal chain diameter")
                .with_default(120.0, Unit::Millimeter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("CorrosionAllowance", Dimension::Length)
                .with_description("Diameter loss over the service life")
                .with_default(10.0, Unit::Millimeter)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("MarineGrowthThickness", Dimension::Length)
                .with_default(100.0, Unit::Millimeter)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("MarineGrowthDensity", Dimension::Density)
                .with_default(1.325, Unit::TonnePerCubicMeter)
                .with_validation(ValidationRule::Positive),
        )
}

// ============================================================================
// MOORING SYSTEM ENTITY
// ============================================================================

#[derive(Debug, Clone)]
pub struct MooringSystem {
    core: EntityCore<MooringState>,
}

impl MooringSystem {
    /// New mooring system, in situ
    pub fn new(name: impl Into<String>, parameters: ParameterSet) -> Result<Self> {
        let parameters = checked_parameters(&schema(), parameters)?;
        let machine = StateMachine::new(KIND, MooringState::all(), MooringState::InSitu)?
            .with_transitions(MooringState::transitions());

        Ok(MooringSystem {
            core: EntityCore::new(name, parameters, machine),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        MooringSystem::new("Mooring System", schema().defaults()?)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.core = self.core.with_id(id);
        self
    }

    pub fn line_count(&self) -> Result<usize> {
        let params = self.core.parameters();
        let bundles = params.count("NumberOfBundles")?;
        let per_bundle = params.count("NumberOfLinesPerBundle")?;

        bundles
            .checked_mul(per_bundle)
            .ok_or_else(|| anyhow!("{} bundles of {} lines overflow the line count", bundles, per_bundle))
    }

    /// Line geometry and properties for the current state
    ///
    /// Bundles are spread evenly over 360 degrees starting at heading 0;
    /// the lines of one bundle fan out symmetrically about its heading.
    pub fn line_layout(&self) -> Result<Vec<LineSpec>> {
        let params = self.core.parameters();
        let bundles = params.count("NumberOfBundles")?;
        let per_bundle = params.count("NumberOfLinesPerBundle")?;
        let spread = params.si("BundleSpread")?;
        let anchor_radius = params.si("AnchorRadius")?;
        let fairlead_radius = params.si("FairleadRadius")?;
        let fairlead_depth = params.si("FairleadDepth")?;
        let water_depth = params.si("WaterDepth")?;
        let length = params.si("LineLength")?;

        if anchor_radius <= fairlead_radius {
            bail!(
                "Anchor radius {:.1} m must exceed fairlead radius {:.1} m",
                anchor_radius,
                fairlead_radius
            );
        }
        if fairlead_depth >= water_depth {
            bail!("Fairleads at {:.1} m are below the seabed ({:.1} m)", fairlead_depth, water_depth);
        }

        let condition = self.state().line_condition(params)?;

        if condition.connected {
            let horizontal = anchor_radius - fairlead_radius;
            let vertical = water_depth - fairlead_depth;
            let span = (horizontal * horizontal + vertical * vertical).sqrt();
            if length < span {
                bail!("Line length {:.1} m cannot reach the fairlead ({:.1} m away)", length, span);
            }
        }

        let total = bundles
            .checked_mul(per_bundle)
            .ok_or_else(|| anyhow!("{} bundles of {} lines overflow the line count", bundles, per_bundle))?;
        let mut lines = Vec::with_capacity(total);
        for b in 0..bundles {
            let bundle_heading = 2.0 * PI * b as f64 / bundles as f64;

            for l in 0..per_bundle {
                let offset = (l as f64 - (per_bundle as f64 - 1.0) / 2.0) * spread;
                let heading = bundle_heading + offset;
                let (sin, cos) = heading.sin_cos();

                lines.push(LineSpec {
                    name: format!("Line {}.{}", b + 1, l + 1),
                    anchor: [anchor_radius * cos, anchor_radius * sin, -water_depth],
                    fairlead: condition
                        .connected
                        .then(|| [fairlead_radius * cos, fairlead_radius * sin, -fairlead_depth]),
                    length,
                    nominal_diameter: condition.nominal_diameter,
                    hydrodynamic_diameter: condition.hydrodynamic_diameter,
                    mass_per_length: condition.mass_per_length,
                    connected: condition.connected,
                });
            }
        }

        Ok(lines)
    }

    /// Total line mass in air (kg) for the current state
    pub fn total_line_mass(&self) -> Result<f64> {
        Ok(self
            .line_layout()?
            .iter()
            .map(|l| l.mass_per_length * l.length)
            .sum())
    }

    /// Push the lines, as the current state sees them, into an analysis model
    pub fn create_in_ofx(&self, model: &mut dyn ModelBuilder) -> Result<usize> {
        let lines = self.line_layout()?;
        let count = lines.len();

        for line in lines {
            model.add_line(line)?;
        }

        info!(state = self.state().name(), lines = count, "mooring lines added to model");
        Ok(count)
    }
}

impl Stateful for MooringSystem {
    type State = MooringState;
    const KIND: &'static str = KIND;

    fn core(&self) -> &EntityCore<MooringState> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore<MooringState> {
        &mut self.core
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::error::{ParameterError, StateError};
    use crate::ofx::RecordingModel;
    use crate::units::Quantity;

    #[test]
    fn test_mooring_starts_in_situ() {
        let ms = MooringSystem::with_defaults().unwrap();

        assert_eq!(ms.state(), &MooringState::InSitu);
        assert!(ms.previous_state().is_none());
        assert_eq!(ms.line_count().unwrap(), 12);
    }

    #[test]
    fn test_change_state_rejects_unknown_name() {
        let mut ms = MooringSystem::with_defaults().unwrap();

        let err = ms.change_state("Sunk").unwrap_err();
        assert!(matches!(err, StateError::UnknownState { .. }));
        assert_eq!(ms.state(), &MooringState::InSitu);
    }

    #[test]
    fn test_ageing_is_one_way() {
        let mut ms = MooringSystem::with_defaults().unwrap();

        assert!(ms.change_state("Weathered").unwrap());
        let err = ms.change_state("InSitu").unwrap_err();
        assert!(matches!(err, StateError::TransitionNotAllowed { .. }));

        // disconnecting is still possible
        assert!(ms.change_state("LayDown").unwrap());
        assert_eq!(ms.previous_state(), Some(&MooringState::Weathered));
    }

    #[test]
    fn test_laydown_lines_are_not_connected() {
        let mut ms = MooringSystem::with_defaults().unwrap();
        ms.change_state("LayDown").unwrap();

        let lines = ms.line_layout().unwrap();
        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|l| !l.connected && l.fairlead.is_none()));
    }

    #[test]
    fn test_in_situ_layout_geometry() {
        let ms = MooringSystem::with_defaults().unwrap();
        let lines = ms.line_layout().unwrap();

        for line in &lines {
            let r = (line.anchor[0].powi(2) + line.anchor[1].powi(2)).sqrt();
            assert!((r - 200.0).abs() < 1e-9);
            assert_eq!(line.anchor[2], -100.0);

            let fairlead = line.fairlead.unwrap();
            assert!((fairlead[2] + 15.0).abs() < 1e-12);
        }

        // bundle 1 fans out symmetrically around heading 0
        let first = lines[0].heading_deg();
        let last = lines[3].heading_deg();
        assert!((first + 7.5).abs() < 1e-9);
        assert!((last - 7.5).abs() < 1e-9);

        // bundle 2 is centred on 120 degrees
        let centre = (lines[5].heading_deg() + lines[6].heading_deg()) / 2.0;
        assert!((centre - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_weathered_lines_are_heavier_and_thicker() {
        let mut ms = MooringSystem::with_defaults().unwrap();
        let fresh = ms.line_layout().unwrap()[0].clone();
        let fresh_mass = ms.total_line_mass().unwrap();

        ms.change_state("Weathered").unwrap();
        let aged = ms.line_layout().unwrap()[0].clone();

        assert!((aged.nominal_diameter - 0.110).abs() < 1e-12);
        assert!(aged.hydrodynamic_diameter > fresh.hydrodynamic_diameter);
        assert!(aged.mass_per_length > fresh.mass_per_length);
        assert!(ms.total_line_mass().unwrap() > fresh_mass);

        // growth mass alone: 1325 * pi/4 * ((0.198 + 0.2)^2 - 0.198^2)
        let expected_growth = 1325.0 * PI / 4.0 * (0.398_f64.powi(2) - 0.198_f64.powi(2));
        let expected = chain_mass_per_length(0.110) + expected_growth;
        assert!((aged.mass_per_length - expected).abs() < 1e-6);
    }

    #[test]
    fn test_create_in_ofx_depends_on_state() {
        let mut ms = MooringSystem::with_defaults().unwrap();

        let mut in_situ = RecordingModel::new();
        assert_eq!(ms.create_in_ofx(&mut in_situ).unwrap(), 12);
        assert!(in_situ.lines().iter().all(|l| l.connected));

        ms.change_state("LayDown").unwrap();
        let mut laid = RecordingModel::new();
        ms.create_in_ofx(&mut laid).unwrap();
        assert!(laid.lines().iter().all(|l| !l.connected));

        // geometry of the anchors does not depend on the state
        assert_eq!(in_situ.lines()[4].anchor, laid.lines()[4].anchor);
    }

    #[test]
    fn test_anchor_inside_fairlead_circle_rejected() {
        let schema = schema();
        let params = schema
            .builder()
            .set("AnchorRadius", Quantity::meters(20.0))
            .build()
            .unwrap();

        let ms = MooringSystem::new("Too tight", params).unwrap();
        assert!(ms.line_layout().is_err());
    }

    #[test]
    fn test_short_line_rejected_only_when_connected() {
        let schema = schema();
        let params = schema
            .builder()
            .set("LineLength", Quantity::meters(50.0))
            .build()
            .unwrap();

        let mut ms = MooringSystem::new("Short", params).unwrap();
        assert!(ms.line_layout().is_err());

        ms.change_state("LayDown").unwrap();
        assert!(ms.line_layout().is_ok());
    }

    #[test]
    fn test_line_counts_are_bounded() {
        let schema = schema();

        let err = schema
            .builder()
            .set("NumberOfBundles", Quantity::dimensionless(1e19))
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::Invalid { .. }));

        assert!(schema
            .builder()
            .set("NumberOfLinesPerBundle", Quantity::dimensionless(65.0))
            .build()
            .is_err());

        let params = schema
            .builder()
            .set("NumberOfBundles", Quantity::dimensionless(64.0))
            .set("NumberOfLinesPerBundle", Quantity::dimensionless(64.0))
            .build()
            .unwrap();
        let ms = MooringSystem::new("Dense", params).unwrap();
        assert_eq!(ms.line_count().unwrap(), 4096);
    }
}
