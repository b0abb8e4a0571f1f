// Hivemind - Core Library
// Parametric offshore entities (site, mooring, structure, naval) whose
// behavior follows their current state. Exposes all modules for use in
// CLI, API server, and tests.

pub mod units;
pub mod error;
pub mod parameters;     // Immutable, unit-tagged ParameterSets
pub mod schema;         // Parameter schemas + validation
pub mod state;          // States, transition tables, state machines
pub mod history;        // Append-only transition log
pub mod entity;         // Entity trait + shared core
pub mod inertia;
pub mod ofx;            // OrcaFlex-style model seam
pub mod entities;       // Site, MooringSystem, Structure, NavalModel
pub mod presets;        // Ready-made designs
pub mod config;
pub mod db;
pub mod fleet;

// Re-export commonly used types
pub use units::{Dimension, Quantity, Unit};
pub use error::{ParameterError, StateError};
pub use parameters::{
    load_parameter_csv, ParameterDefinition, ParameterSet, ParameterSetBuilder, ValidationRule,
};
pub use schema::{ParameterSchema, SchemaRegistry, ValidationError, ValidationResult};
pub use state::{State, StateMachine, TransitionContext, TransitionTable};
pub use history::{StatePeriod, TransitionLog, TransitionRecord};
pub use entity::{Entity, EntityCore, EntitySnapshot, Stateful};
pub use inertia::Inertia;
pub use ofx::{LineSpec, ModelBuilder, RecordingModel};
pub use entities::{
    BoxStructure, HydrostaticStiffness, Hydrostatics, LineCondition,
    MooringState, MooringSystem, NaturalPeriods, NavalModel, NavalState,
    Site, SiteState, Stability, Structure, StructureState,
};
pub use config::Config;
pub use db::{
    EntityRow, Event,
    setup_database, upsert_entity, get_entity_row, insert_event,
    get_events_for_entity, record_transition, load_transitions,
};
pub use fleet::{Fleet, KINDS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
