// 🧱 Entity Layer - identity + parameters + state
//
// Identity (UUID) never changes. Parameters never change. The state moves
// within the finite set the entity declared, and every move is logged.
//
// Concrete entities own an `EntityCore` and implement `Stateful`; the
// object-safe `Entity` contract comes for free from the blanket impl below.

use crate::error::StateError;
use crate::history::{TransitionLog, TransitionRecord};
use crate::parameters::ParameterSet;
use crate::state::{State, StateMachine, TransitionContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// ENTITY CORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct EntityCore<S: State> {
    id: String,
    name: String,
    parameters: ParameterSet,
    machine: StateMachine<S>,
}

impl<S: State> EntityCore<S> {
    /// New entity with a fresh UUID
    pub fn new(name: impl Into<String>, parameters: ParameterSet, machine: StateMachine<S>) -> Self {
        EntityCore {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            parameters,
            machine,
        }
    }

    /// Builder: reuse a known identity (e.g. one loaded from storage)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn machine(&self) -> &StateMachine<S> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine<S> {
        &mut self.machine
    }
}

// ============================================================================
// STATEFUL (typed side)
// ============================================================================

/// Typed access to an entity's core and its concrete state enum
pub trait Stateful {
    type State: State;

    /// Entity kind, also the key of its parameter schema
    const KIND: &'static str;

    fn core(&self) -> &EntityCore<Self::State>;

    fn core_mut(&mut self) -> &mut EntityCore<Self::State>;

    fn state(&self) -> &Self::State {
        self.core().machine().state()
    }

    fn previous_state(&self) -> Option<&Self::State> {
        self.core().machine().previous_state()
    }
}

// ============================================================================
// ENTITY (object-safe side)
// ============================================================================

/// The contract every parametric entity offers, usable as `dyn Entity`
pub trait Entity {
    fn id(&self) -> &str;

    fn kind(&self) -> &'static str;

    fn name(&self) -> &str;

    fn parameters(&self) -> &ParameterSet;

    fn state_name(&self) -> &'static str;

    fn previous_state_name(&self) -> Option<&'static str>;

    /// Names of the declared finite state set, in declaration order
    fn possible_states(&self) -> Vec<&'static str>;

    fn change_state_with(&mut self, name: &str, ctx: &TransitionContext) -> Result<bool, StateError>;

    /// `Ok(true)` changed, `Ok(false)` already there, `Err` rejected
    fn change_state(&mut self, name: &str) -> Result<bool, StateError> {
        self.change_state_with(name, &TransitionContext::default())
    }

    /// Record of the move to `name`, not yet applied; `None` if already there
    fn prepare_transition(&self, name: &str, ctx: &TransitionContext) -> Result<Option<TransitionRecord>, StateError>;

    fn replay(&mut self, record: &TransitionRecord) -> Result<bool, StateError>;

    fn history(&self) -> &TransitionLog;

    /// Align the start of the history with a stored creation time
    fn set_created_at(&mut self, created_at: DateTime<Utc>);

    fn created_at(&self) -> DateTime<Utc> {
        self.history().started_at()
    }

    fn state_at(&self, time: DateTime<Utc>) -> Option<String> {
        self.history().state_at(time)
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id().to_string(),
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            state: self.state_name().to_string(),
            previous_state: self.previous_state_name().map(str::to_string),
            possible_states: self.possible_states().into_iter().map(str::to_string).collect(),
            fingerprint: self.parameters().fingerprint(),
            parameters: self.parameters().clone(),
            transitions: self.history().len(),
            created_at: self.created_at(),
        }
    }
}

impl<T: Stateful> Entity for T {
    fn id(&self) -> &str {
        self.core().id()
    }

    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn parameters(&self) -> &ParameterSet {
        self.core().parameters()
    }

    fn state_name(&self) -> &'static str {
        Stateful::state(self).name()
    }

    fn previous_state_name(&self) -> Option<&'static str> {
        Stateful::previous_state(self).map(State::name)
    }

    fn possible_states(&self) -> Vec<&'static str> {
        self.core().machine().state_names()
    }

    fn change_state_with(&mut self, name: &str, ctx: &TransitionContext) -> Result<bool, StateError> {
        let changed = self.core_mut().machine_mut().change_state(name, ctx)?;
        if changed {
            info!(kind = T::KIND, id = %self.core().id(), state = name, actor = %ctx.actor, "entity changed state");
        }
        Ok(changed)
    }

    fn prepare_transition(&self, name: &str, ctx: &TransitionContext) -> Result<Option<TransitionRecord>, StateError> {
        self.core().machine().prepare(name, ctx)
    }

    fn replay(&mut self, record: &TransitionRecord) -> Result<bool, StateError> {
        self.core_mut().machine_mut().replay(record)
    }

    fn history(&self) -> &TransitionLog {
        self.core().machine().history()
    }

    fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.core_mut().machine_mut().history_mut().set_started_at(created_at);
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Serializable view of an entity at one moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub state: String,
    pub previous_state: Option<String>,
    pub possible_states: Vec<String>,
    pub parameters: ParameterSet,
    pub fingerprint: String,
    pub transitions: usize,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MooringState, MooringSystem};

    #[test]
    fn test_entity_through_dyn() {
        let mut mooring = MooringSystem::with_defaults().unwrap();
        let entity: &mut dyn Entity = &mut mooring;

        assert_eq!(entity.kind(), "mooring_system");
        assert_eq!(entity.state_name(), "InSitu");
        assert_eq!(entity.possible_states(), vec!["LayDown", "InSitu", "Weathered"]);

        assert!(entity.change_state("Weathered").unwrap());
        assert_eq!(entity.previous_state_name(), Some("InSitu"));
        assert_eq!(mooring.state(), &MooringState::Weathered);
    }

    #[test]
    fn test_snapshot() {
        let mut mooring = MooringSystem::with_defaults().unwrap();
        mooring.change_state("LayDown").unwrap();

        let snapshot = mooring.snapshot();
        assert_eq!(snapshot.id, mooring.id());
        assert_eq!(snapshot.state, "LayDown");
        assert_eq!(snapshot.previous_state.as_deref(), Some("InSitu"));
        assert_eq!(snapshot.transitions, 1);
        assert_eq!(snapshot.fingerprint, mooring.parameters().fingerprint());

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: EntitySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_identity_and_parameters_survive_transitions() {
        let mut mooring = MooringSystem::with_defaults().unwrap();
        let id = mooring.id().to_string();
        let fingerprint = mooring.parameters().fingerprint();

        mooring.change_state("Weathered").unwrap();
        mooring.change_state("LayDown").unwrap();

        assert_eq!(mooring.id(), id);
        assert_eq!(mooring.parameters().fingerprint(), fingerprint);
        assert_eq!(mooring.history().len(), 2);
    }

    #[test]
    fn test_set_created_at_moves_history_start() {
        let mut mooring = MooringSystem::with_defaults().unwrap();
        let earlier = Utc::now() - chrono::Duration::days(30);

        mooring.set_created_at(earlier);

        assert_eq!(mooring.created_at(), earlier);
        assert_eq!(mooring.state_at(earlier).as_deref(), Some("InSitu"));
    }
}
