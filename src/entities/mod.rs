// Offshore entities
//
// Each entity has:
// - Stable identity (UUID) that NEVER changes
// - One immutable ParameterSet validated against its kind's schema
// - A current state from a finite declared set, with its transition log

pub mod mooring;
pub mod naval;
pub mod site;
pub mod structure;

pub use mooring::{LineCondition, MooringState, MooringSystem};
pub use naval::{HydrostaticStiffness, NavalModel, NavalState, NaturalPeriods, Stability, GRAVITY};
pub use site::{Site, SiteState};
pub use structure::{BoxStructure, Hydrostatics, Structure, StructureState};

use crate::error::ParameterError;
use crate::parameters::ParameterSet;
use crate::schema::ParameterSchema;

/// Accept `parameters` only if they are for `schema`'s kind and pass it
pub(crate) fn checked_parameters(
    schema: &ParameterSchema,
    parameters: ParameterSet,
) -> Result<ParameterSet, ParameterError> {
    if parameters.kind() != schema.kind() {
        return Err(ParameterError::WrongKind {
            expected: schema.kind().to_string(),
            found: parameters.kind().to_string(),
        });
    }

    schema.ensure_valid(&parameters)?;
    Ok(parameters)
}
