// 🏗️ Structure Entity - anything with mass and a hull shape
//
// A structure that has been in the water for twenty years is the same
// structure with different properties: the inertia depends on the state.

use crate::entities::checked_parameters;
use crate::entity::{Entity, EntityCore, Stateful};
use crate::inertia::Inertia;
use crate::parameters::{ParameterDefinition, ParameterSet, ValidationRule};
use crate::schema::ParameterSchema;
use crate::state::{State, StateMachine, TransitionTable};
use crate::units::{Dimension, Unit};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const KIND: &str = "structure";

// ============================================================================
// STRUCTURE CONTRACT
// ============================================================================

/// Hydrostatic properties of the hull below a given waterline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hydrostatics {
    pub draft: f64,
    pub submerged_volume: f64,
    pub waterplane_area: f64,

    /// Height of the centre of buoyancy above the keel (KB)
    pub centre_of_buoyancy_z: f64,

    /// Second moment of the waterplane about the longitudinal axis
    pub waterplane_inertia_transverse: f64,

    /// Second moment of the waterplane about the transverse axis
    pub waterplane_inertia_longitudinal: f64,
}

/// A structural entity: has mass and a hull that can be cut at a waterline
pub trait Structure: Entity {
    /// Mass and centre of gravity for the current state (keel = z 0)
    fn inertia(&self) -> Result<Inertia>;

    /// Submerged part of the hull at `draft` (m above keel)
    fn waterline_cut(&self, draft: f64) -> Result<Hydrostatics>;

    /// Keel to top of hull
    fn hull_depth(&self) -> Result<f64>;
}

// ============================================================================
// STRUCTURE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureState {
    AsBuilt,
    Installed,
    Weathered,
}

impl State for StructureState {
    fn name(&self) -> &'static str {
        match self {
            StructureState::AsBuilt => "AsBuilt",
            StructureState::Installed => "Installed",
            StructureState::Weathered => "Weathered",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            StructureState::AsBuilt => "Lightship hull as delivered by the yard",
            StructureState::Installed => "Hull with topside equipment installed",
            StructureState::Weathered => "Installed hull after corrosion and marine growth",
        }
    }
}

impl StructureState {
    pub fn all() -> Vec<StructureState> {
        vec![StructureState::AsBuilt, StructureState::Installed, StructureState::Weathered]
    }

    pub fn transitions() -> TransitionTable {
        TransitionTable::new()
            .allow("AsBuilt", "Installed")
            .allow("Installed", "Weathered")
    }

    /// Point masses making up the structure in this state
    pub fn inertia_parts(&self, parameters: &ParameterSet) -> Result<Vec<Inertia>> {
        let lightship = parameters.si("LightshipMass")?;
        let kg = parameters.si("CentreOfGravityHeight")?;
        let depth = parameters.si("Depth")?;

        let mut parts = vec![Inertia::new(lightship, (0.0, 0.0, kg))];

        if matches!(self, StructureState::Installed | StructureState::Weathered) {
            parts.push(Inertia::new(parameters.si("EquipmentMass")?, (0.0, 0.0, depth)));
        }

        if *self == StructureState::Weathered {
            let corrosion = parameters.si("CorrosionMassLoss")?;
            parts.push(Inertia::new(-lightship * corrosion, (0.0, 0.0, kg)));

            let length = parameters.si("Length")?;
            let width = parameters.si("Width")?;
            let draft = parameters.si("DesignDraft")?.min(depth);
            let areal_mass = parameters.si("MarineGrowthThickness")? * parameters.si("MarineGrowthDensity")?;

            // bottom plate at the keel, side shell centred on half the wetted height
            parts.push(Inertia::new(areal_mass * length * width, (0.0, 0.0, 0.0)));
            parts.push(Inertia::new(
                areal_mass * 2.0 * (length + width) * draft,
                (0.0, 0.0, draft / 2.0),
            ));
        }

        Ok(parts)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn schema() -> ParameterSchema {
    let length = |name: &str, default: f64| {
        ParameterDefinition::new(name, Dimension::Length)
            .with_default(default, Unit::Meter)
            .with_validation(ValidationRule::Required)
            .with_validation(ValidationRule::Positive)
    };

    ParameterSchema::new(KIND)
        .with(length("Length", 100.0))
        .with(length("Width", 40.0))
        .with(length("Depth", 40.0))
        .with(
            ParameterDefinition::new("LightshipMass", Dimension::Mass)
                .with_default(40_000.0, Unit::Tonne)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("CentreOfGravityHeight", Dimension::Length)
                .with_description("Lightship KG above keel")
                .with_default(16.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("EquipmentMass", Dimension::Mass)
                .with_description("Topside equipment, placed at deck level")
                .with_default(2_000.0, Unit::Tonne)
                .with_validation(ValidationRule::NonNegative),
        )
        .with(
            ParameterDefinition::new("DesignDraft", Dimension::Length)
                .with_description("Draft up to which marine growth is assumed")
                .with_default(12.0, Unit::Meter)
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
        .with(
            ParameterDefinition::new("CorrosionMassLoss", Dimension::Dimensionless)
                .with_description("Fraction of lightship steel lost to corrosion")
                .with_default(2.0, Unit::Percent)
                .with_validation(ValidationRule::Range { min: 0.0, max: 1.0 }),
        )
}

// ============================================================================
// BOX STRUCTURE
// ============================================================================

/// Rectangular hull (length along x, width along y, keel at z = 0)
#[derive(Debug, Clone)]
pub struct BoxStructure {
    core: EntityCore<StructureState>,
}

impl BoxStructure {
    pub fn new(name: impl Into<String>, parameters: ParameterSet) -> Result<Self> {
        let parameters = checked_parameters(&schema(), parameters)?;
        let machine = StateMachine::new(KIND, StructureState::all(), StructureState::AsBuilt)?
            .with_transitions(StructureState::transitions());

        Ok(BoxStructure {
            core: EntityCore::new(name, parameters, machine),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        BoxStructure::new("Structure", schema().defaults()?)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.core = self.core.with_id(id);
        self
    }

    /// (length, width, depth) in metres
    pub fn dimensions(&self) -> Result<(f64, f64, f64)> {
        let p = self.core.parameters();
        Ok((p.si("Length")?, p.si("Width")?, p.si("Depth")?))
    }
}

impl Stateful for BoxStructure {
    type State = StructureState;
    const KIND: &'static str = KIND;

    fn core(&self) -> &EntityCore<StructureState> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore<StructureState> {
        &mut self.core
    }
}

impl Structure for BoxStructure {
    fn inertia(&self) -> Result<Inertia> {
        let parts = self.state().inertia_parts(self.core.parameters())?;
        Ok(Inertia::combine(&parts))
    }

    fn waterline_cut(&self, draft: f64) -> Result<Hydrostatics> {
        if !draft.is_finite() || draft < 0.0 {
            bail!("Draft must be a non-negative number, got {}", draft);
        }

        let (length, width, depth) = self.dimensions()?;

        // above the deck the hull is fully submerged and has no waterplane
        if draft > depth {
            return Ok(Hydrostatics {
                draft,
                submerged_volume: length * width * depth,
                waterplane_area: 0.0,
                centre_of_buoyancy_z: depth / 2.0,
                waterplane_inertia_transverse: 0.0,
                waterplane_inertia_longitudinal: 0.0,
            });
        }

        Ok(Hydrostatics {
            draft,
            submerged_volume: length * width * draft,
            waterplane_area: length * width,
            centre_of_buoyancy_z: draft / 2.0,
            waterplane_inertia_transverse: length * width.powi(3) / 12.0,
            waterplane_inertia_longitudinal: width * length.powi(3) / 12.0,
        })
    }

    fn hull_depth(&self) -> Result<f64> {
        Ok(self.core.parameters().si("Depth")?)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Quantity;

    fn unit_cube() -> BoxStructure {
        let schema = schema();
        let params = schema
            .builder()
            .set("Length", Quantity::meters(1.0))
            .set("Width", Quantity::meters(1.0))
            .set("Depth", Quantity::meters(1.0))
            .set("LightshipMass", Quantity::new(0.5, Unit::Tonne))
            .set("CentreOfGravityHeight", Quantity::meters(0.5))
            .set("DesignDraft", Quantity::meters(0.5))
            .build()
            .unwrap();

        BoxStructure::new("Cube", params).unwrap()
    }

    #[test]
    fn test_cut() {
        let cube = unit_cube();
        let cut = cube.waterline_cut(0.5).unwrap();

        assert!((cut.submerged_volume - 0.5).abs() < 1e-12);
        assert!((cut.waterplane_area - 1.0).abs() < 1e-12);
        assert!((cut.centre_of_buoyancy_z - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_cut_above_deck_and_below_keel() {
        let cube = unit_cube();

        let submerged = cube.waterline_cut(2.0).unwrap();
        assert!((submerged.submerged_volume - 1.0).abs() < 1e-12);
        assert_eq!(submerged.waterplane_area, 0.0);

        assert!(cube.waterline_cut(-0.1).is_err());
        assert!(cube.waterline_cut(f64::NAN).is_err());
    }

    #[test]
    fn test_as_built_inertia_is_lightship() {
        let hull = BoxStructure::with_defaults().unwrap();
        let inertia = hull.inertia().unwrap();

        assert!((inertia.mass() - 40.0e6).abs() < 1e-3);
        assert!((inertia.location_z() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_installed_inertia_adds_equipment_at_deck() {
        let mut hull = BoxStructure::with_defaults().unwrap();
        hull.change_state("Installed").unwrap();
        let inertia = hull.inertia().unwrap();

        assert!((inertia.mass() - 42.0e6).abs() < 1e-3);
        let expected_kg = (40.0e6 * 16.0 + 2.0e6 * 40.0) / 42.0e6;
        assert!((inertia.location_z() - expected_kg).abs() < 1e-9);
    }

    #[test]
    fn test_weathered_inertia() {
        let mut hull = BoxStructure::with_defaults().unwrap();
        hull.change_state("Installed").unwrap();
        hull.change_state("Weathered").unwrap();
        let inertia = hull.inertia().unwrap();

        let corrosion = -0.02 * 40.0e6;
        let bottom = 0.1 * 1325.0 * 100.0 * 40.0;
        let sides = 0.1 * 1325.0 * 2.0 * 140.0 * 12.0;
        let expected = 42.0e6 + corrosion + bottom + sides;

        assert!((inertia.mass() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_structure_cannot_skip_installation() {
        let mut hull = BoxStructure::with_defaults().unwrap();
        assert!(hull.change_state("Weathered").is_err());
        assert_eq!(hull.state(), &StructureState::AsBuilt);
    }

    #[test]
    fn test_hydrostatics_do_not_depend_on_state() {
        let mut hull = BoxStructure::with_defaults().unwrap();
        let before = hull.waterline_cut(10.0).unwrap();
        hull.change_state("Installed").unwrap();

        assert_eq!(hull.waterline_cut(10.0).unwrap(), before);
    }
}
