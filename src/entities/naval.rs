// 🚢 Naval Entity - a structure afloat
//
// Owns the structure it floats and answers stability, hydrostatic stiffness
// and natural period questions for the structure's current state. Its own
// state is the hull integrity: Intact or Damaged.

use crate::entities::checked_parameters;
use crate::entities::structure::{Hydrostatics, Structure};
use crate::entity::{EntityCore, Stateful};
use crate::parameters::{ParameterDefinition, ParameterSet, ValidationRule};
use crate::schema::ParameterSchema;
use crate::state::{State, StateMachine, TransitionTable};
use crate::units::{Dimension, Unit};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

pub const KIND: &str = "naval";

/// Standard gravity (m/s^2)
pub const GRAVITY: f64 = 9.80665;

const DRAFT_TOLERANCE: f64 = 1e-9;

// ============================================================================
// NAVAL STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavalState {
    Intact,
    Damaged,
}

impl State for NavalState {
    fn name(&self) -> &'static str {
        match self {
            NavalState::Intact => "Intact",
            NavalState::Damaged => "Damaged",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            NavalState::Intact => "All compartments watertight",
            NavalState::Damaged => "Compartment open to sea at the waterline",
        }
    }
}

impl NavalState {
    pub fn all() -> Vec<NavalState> {
        vec![NavalState::Intact, NavalState::Damaged]
    }

    /// Fraction of the intact waterplane still effective
    ///
    /// Lost-waterplane approximation: displacement and draft are unchanged,
    /// the flooded compartment only removes waterplane area and inertia.
    pub fn waterplane_factor(&self, parameters: &ParameterSet) -> Result<f64> {
        match self {
            NavalState::Intact => Ok(1.0),
            NavalState::Damaged => Ok(1.0 - parameters.si("DamagedWaterplaneLoss")?),
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stability {
    pub draft: f64,
    pub kb: f64,
    pub bm_transverse: f64,
    pub bm_longitudinal: f64,
    pub kg: f64,
    pub gm_transverse: f64,
    pub gm_longitudinal: f64,
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        self.gm_transverse > 0.0 && self.gm_longitudinal > 0.0
    }
}

/// Restoring coefficients: heave (N/m), roll and pitch (N m/rad)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HydrostaticStiffness {
    pub heave: f64,
    pub roll: f64,
    pub pitch: f64,
}

/// Undamped natural periods (s); None where there is no positive restoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NaturalPeriods {
    pub heave: f64,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn schema() -> ParameterSchema {
    let fraction = |name: &str, default: f64| {
        ParameterDefinition::new(name, Dimension::Dimensionless)
            .with_default(default, Unit::Percent)
            .with_validation(ValidationRule::Range { min: 0.0, max: 1.0 })
    };

    ParameterSchema::new(KIND)
        .with(
            ParameterDefinition::new("WaterDepth", Dimension::Length)
                .with_default(100.0, Unit::Meter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("WaterDensity", Dimension::Density)
                .with_default(1025.0, Unit::KilogramPerCubicMeter)
                .with_validation(ValidationRule::Required)
                .with_validation(ValidationRule::Positive),
        )
        .with(fraction("DamagedWaterplaneLoss", 10.0).with_description("Waterplane lost when damaged"))
        .with(
            ParameterDefinition::new("RollRadiusOfGyration", Dimension::Length)
                .with_default(14.0, Unit::Meter)
                .with_validation(ValidationRule::Positive),
        )
        .with(
            ParameterDefinition::new("PitchRadiusOfGyration", Dimension::Length)
                .with_default(25.0, Unit::Meter)
                .with_validation(ValidationRule::Positive),
        )
        .with(fraction("HeaveAddedMassFraction", 80.0))
        .with(fraction("RotationalAddedInertiaFraction", 20.0))
}

// ============================================================================
// NAVAL MODEL
// ============================================================================

#[derive(Debug, Clone)]
pub struct NavalModel<T: Structure> {
    core: EntityCore<NavalState>,
    structure: T,
}

impl<T: Structure> NavalModel<T> {
    pub fn new(name: impl Into<String>, parameters: ParameterSet, structure: T) -> Result<Self> {
        let parameters = checked_parameters(&schema(), parameters)?;
        let machine = StateMachine::new(KIND, NavalState::all(), NavalState::Intact)?
            .with_transitions(TransitionTable::new().allow_both("Intact", "Damaged"));

        Ok(NavalModel {
            core: EntityCore::new(name, parameters, machine),
            structure,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.core = self.core.with_id(id);
        self
    }

    pub fn structure(&self) -> &T {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut T {
        &mut self.structure
    }

    fn water_density(&self) -> Result<f64> {
        Ok(self.core.parameters().si("WaterDensity")?)
    }

    /// Hydrostatics at the draft where buoyancy carries the structure's mass
    pub fn equilibrium(&self) -> Result<Hydrostatics> {
        let mass = self.structure.inertia()?.mass();
        if mass <= 0.0 {
            bail!("Structure has no positive mass ({} kg)", mass);
        }

        let displacement = mass / self.water_density()?;
        let depth = self.structure.hull_depth()?;
        let full = self.structure.waterline_cut(depth)?;
        if displacement > full.submerged_volume {
            bail!(
                "Structure sinks: needs {:.1} m^3 of displacement, hull offers {:.1} m^3",
                displacement,
                full.submerged_volume
            );
        }

        // submerged volume grows monotonically with draft
        let (mut low, mut high) = (0.0_f64, depth);
        while high - low > DRAFT_TOLERANCE {
            let mid = 0.5 * (low + high);
            if self.structure.waterline_cut(mid)?.submerged_volume < displacement {
                low = mid;
            } else {
                high = mid;
            }
        }

        let draft = 0.5 * (low + high);
        let water_depth = self.core.parameters().si("WaterDepth")?;
        if draft >= water_depth {
            bail!("Structure grounds: draft {:.2} m in {:.2} m of water", draft, water_depth);
        }

        debug!(draft, displacement, "equilibrium found");
        self.structure
            .waterline_cut(draft)
            .context("Failed to cut hull at equilibrium draft")
    }

    pub fn get_stability(&self) -> Result<Stability> {
        let hydro = self.equilibrium()?;
        self.stability_at(&hydro)
    }

    pub fn get_hydrostatic_stiffness(&self) -> Result<HydrostaticStiffness> {
        let hydro = self.equilibrium()?;
        let stability = self.stability_at(&hydro)?;
        self.stiffness_at(&hydro, &stability)
    }

    pub fn get_natural_periods(&self) -> Result<NaturalPeriods> {
        let params = self.core.parameters();
        let hydro = self.equilibrium()?;
        let stability = self.stability_at(&hydro)?;
        let stiffness = self.stiffness_at(&hydro, &stability)?;
        let mass = self.structure.inertia()?.mass();

        if stiffness.heave <= 0.0 {
            bail!("No heave restoring: the waterplane is fully submerged");
        }

        let heave_mass = mass * (1.0 + params.si("HeaveAddedMassFraction")?);
        let rotational_added = 1.0 + params.si("RotationalAddedInertiaFraction")?;
        let roll_inertia = mass * params.si("RollRadiusOfGyration")?.powi(2) * rotational_added;
        let pitch_inertia = mass * params.si("PitchRadiusOfGyration")?.powi(2) * rotational_added;

        Ok(NaturalPeriods {
            heave: 2.0 * PI * (heave_mass / stiffness.heave).sqrt(),
            roll: period(roll_inertia, stiffness.roll),
            pitch: period(pitch_inertia, stiffness.pitch),
        })
    }

    fn stability_at(&self, hydro: &Hydrostatics) -> Result<Stability> {
        let factor = self.state().waterplane_factor(self.core.parameters())?;
        let kg = self.structure.inertia()?.location_z();

        let volume = hydro.submerged_volume;
        let kb = hydro.centre_of_buoyancy_z;
        let bm_transverse = factor * hydro.waterplane_inertia_transverse / volume;
        let bm_longitudinal = factor * hydro.waterplane_inertia_longitudinal / volume;

        Ok(Stability {
            draft: hydro.draft,
            kb,
            bm_transverse,
            bm_longitudinal,
            kg,
            gm_transverse: kb + bm_transverse - kg,
            gm_longitudinal: kb + bm_longitudinal - kg,
        })
    }

    fn stiffness_at(&self, hydro: &Hydrostatics, stability: &Stability) -> Result<HydrostaticStiffness> {
        let factor = self.state().waterplane_factor(self.core.parameters())?;
        let rho_g = self.water_density()? * GRAVITY;

        Ok(HydrostaticStiffness {
            heave: rho_g * hydro.waterplane_area * factor,
            roll: rho_g * hydro.submerged_volume * stability.gm_transverse,
            pitch: rho_g * hydro.submerged_volume * stability.gm_longitudinal,
        })
    }
}

fn period(inertia: f64, stiffness: f64) -> Option<f64> {
    (stiffness > 0.0).then(|| 2.0 * PI * (inertia / stiffness).sqrt())
}

impl<T: Structure> Stateful for NavalModel<T> {
    type State = NavalState;
    const KIND: &'static str = KIND;

    fn core(&self) -> &EntityCore<NavalState> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore<NavalState> {
        &mut self.core
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::structure::BoxStructure;
    use crate::entity::Entity;
    use crate::units::Quantity;

    fn naval() -> NavalModel<BoxStructure> {
        NavalModel::new(
            "Naval",
            schema().defaults().unwrap(),
            BoxStructure::with_defaults().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_equilibrium_draft() {
        let nav = naval();
        let hydro = nav.equilibrium().unwrap();

        let expected = 40.0e6 / 1025.0 / (100.0 * 40.0);
        assert!((hydro.draft - expected).abs() < 1e-6);
        assert!((hydro.submerged_volume - 40.0e6 / 1025.0).abs() < 1e-2);
    }

    #[test]
    fn test_intact_stability() {
        let nav = naval();
        let s = nav.get_stability().unwrap();

        let volume = 40.0e6 / 1025.0;
        let draft = volume / 4000.0;
        let bm = (100.0 * 40.0_f64.powi(3) / 12.0) / volume;
        let gm = draft / 2.0 + bm - 16.0;

        assert!((s.gm_transverse - gm).abs() < 1e-4);
        assert!(s.is_stable());
    }

    #[test]
    fn test_damage_reduces_stiffness() {
        let mut nav = naval();
        let intact = nav.get_hydrostatic_stiffness().unwrap();

        nav.change_state("Damaged").unwrap();
        let damaged = nav.get_hydrostatic_stiffness().unwrap();

        assert!((damaged.heave - 0.9 * intact.heave).abs() < 1e-3 * intact.heave);
        assert!(damaged.roll < intact.roll);
        assert!(damaged.pitch < intact.pitch);

        // repair is allowed
        assert!(nav.change_state("Intact").unwrap());
    }

    #[test]
    fn test_structure_state_drives_naval_results() {
        let mut nav = naval();
        let as_built = nav.get_stability().unwrap();

        nav.structure_mut().change_state("Installed").unwrap();
        let installed = nav.get_stability().unwrap();

        assert!(installed.draft > as_built.draft);
        assert!(installed.kg > as_built.kg);
        assert!(installed.gm_transverse < as_built.gm_transverse);
        assert_eq!(nav.state_name(), "Intact");
    }

    #[test]
    fn test_unstable_roll_has_no_period() {
        let mut nav = naval();
        nav.structure_mut().change_state("Installed").unwrap();
        nav.change_state("Damaged").unwrap();

        let stability = nav.get_stability().unwrap();
        assert!(stability.gm_transverse < 0.0);

        let periods = nav.get_natural_periods().unwrap();
        assert!(periods.roll.is_none());
        assert!(periods.pitch.is_some());
        assert!(periods.heave.is_finite());
    }

    #[test]
    fn test_heave_period() {
        let nav = naval();
        let periods = nav.get_natural_periods().unwrap();

        let mass = 40.0e6;
        let c33 = 1025.0 * GRAVITY * 4000.0;
        let expected = 2.0 * PI * (mass * 1.8 / c33).sqrt();
        assert!((periods.heave - expected).abs() < 1e-6);
        assert!(periods.roll.is_some());
    }

    #[test]
    fn test_sinking_structure_rejected() {
        let hull_schema = crate::entities::structure::schema();
        let params = hull_schema
            .builder()
            .set("LightshipMass", Quantity::new(200_000.0, Unit::Tonne))
            .build()
            .unwrap();
        let hull = BoxStructure::new("Anvil", params).unwrap();
        let nav = NavalModel::new("Naval", schema().defaults().unwrap(), hull).unwrap();

        assert!(nav.equilibrium().is_err());
    }

    #[test]
    fn test_grounding_rejected() {
        let params = schema()
            .builder()
            .set("WaterDepth", Quantity::meters(5.0))
            .build()
            .unwrap();
        let nav = NavalModel::new("Shallow", params, BoxStructure::with_defaults().unwrap()).unwrap();

        assert!(nav.equilibrium().is_err());
    }

    #[test]
    fn test_stiffness_consistent_with_stability() {
        let nav = naval();
        let hydro = nav.equilibrium().unwrap();
        let stability = nav.get_stability().unwrap();
        let stiffness = nav.get_hydrostatic_stiffness().unwrap();

        let rho_g = 1025.0 * GRAVITY;
        assert!((stiffness.heave - rho_g * hydro.waterplane_area).abs() < 1e-6 * stiffness.heave);
        let roll = rho_g * hydro.submerged_volume * stability.gm_transverse;
        assert!((stiffness.roll - roll).abs() < 1e-6 * roll.abs());

        let periods = nav.get_natural_periods().unwrap();
        let heave_mass = 40.0e6 * 1.8;
        assert!((periods.heave - 2.0 * PI * (heave_mass / stiffness.heave).sqrt()).abs() < 1e-9);
    }
}
