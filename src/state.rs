// 🔀 State Layer - finite states over a parametric entity
//
// The same structure, in a different state: a mooring laid down on the
// seabed and the same mooring after twenty years of marine growth share one
// identity and one parameter set. Only the current state moves, and only to
// states the entity declared up front.

use crate::error::StateError;
use crate::history::{TransitionLog, TransitionRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// STATE TRAIT
// ============================================================================

/// One discrete mode of an entity's lifecycle
pub trait State: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Stable name used for lookups, storage and display
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }
}

// ============================================================================
// TRANSITION TABLE
// ============================================================================

/// Allowed (from, to) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    allowed: HashSet<(&'static str, &'static str)>,
}

impl TransitionTable {
    pub fn new() -> Self {
        TransitionTable::default()
    }

    /// Builder: allow `from -> to`
    pub fn allow(mut self, from: &'static str, to: &'static str) -> Self {
        self.allowed.insert((from, to));
        self
    }

    /// Builder: allow both directions
    pub fn allow_both(self, a: &'static str, b: &'static str) -> Self {
        self.allow(a, b).allow(b, a)
    }

    pub fn allows(&self, from: &str, to: &str) -> bool {
        self.allowed.iter().any(|(f, t)| *f == from && *t == to)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

// ============================================================================
// TRANSITION CONTEXT
// ============================================================================

/// Who asks for a change, and why
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionContext {
    pub actor: String,
    pub reason: Option<String>,
}

impl TransitionContext {
    pub fn new(actor: impl Into<String>) -> Self {
        TransitionContext {
            actor: actor.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Default for TransitionContext {
    fn default() -> Self {
        TransitionContext::new("system")
    }
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Current state drawn from a declared finite set, plus its history
///
/// Invariant: the current state is always one of `possible_states()`.
#[derive(Debug, Clone)]
pub struct StateMachine<S: State> {
    owner: String,
    states: Vec<S>,
    current: usize,
    previous: Option<usize>,
    transitions: Option<TransitionTable>,
    log: TransitionLog,
}

impl<S: State> StateMachine<S> {
    /// Declare the finite state set and the state the entity starts in
    pub fn new(owner: impl Into<String>, states: Vec<S>, initial: S) -> Result<Self, StateError> {
        let owner = owner.into();

        if states.is_empty() {
            return Err(StateError::NoStates { owner });
        }

        let mut seen = HashSet::new();
        for state in &states {
            if !seen.insert(state.name()) {
                return Err(StateError::DuplicateState {
                    owner,
                    name: state.name().to_string(),
                });
            }
        }

        let current = states
            .iter()
            .position(|s| *s == initial)
            .ok_or_else(|| StateError::InvalidInitialState {
                owner: owner.clone(),
                initial: initial.name().to_string(),
            })?;

        Ok(StateMachine {
            owner,
            states,
            current,
            previous: None,
            transitions: None,
            log: TransitionLog::new(initial.name(), Utc::now()),
        })
    }

    /// Restrict changes to the pairs in `table`
    pub fn with_transitions(mut self, table: TransitionTable) -> Self {
        self.transitions = Some(table);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> &S {
        &self.states[self.current]
    }

    pub fn previous_state(&self) -> Option<&S> {
        self.previous.map(|i| &self.states[i])
    }

    pub fn possible_states(&self) -> &[S] {
        &self.states
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.iter().map(State::name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&S> {
        self.states.iter().find(|s| s.name() == name)
    }

    pub fn transitions(&self) -> Option<&TransitionTable> {
        self.transitions.as_ref()
    }

    pub fn history(&self) -> &TransitionLog {
        &self.log
    }

    pub(crate) fn history_mut(&mut self) -> &mut TransitionLog {
        &mut self.log
    }

    /// Whether `change_state(name)` would move the entity
    pub fn can_transition(&self, name: &str) -> bool {
        matches!(self.resolve(name), Ok(Some(_)))
    }

    /// Move to the state called `name`
    ///
    /// Returns `Ok(true)` when the state changed and `Ok(false)` when the
    /// entity already is in that state. Unknown names and disallowed pairs
    /// are errors and leave the entity unchanged.
    pub fn change_state(&mut self, name: &str, ctx: &TransitionContext) -> Result<bool, StateError> {
        match self.resolve(name)? {
            None => {
                debug!(owner = %self.owner, state = name, "already in requested state");
                Ok(false)
            }
            Some(target) => {
                self.apply(target, Utc::now(), ctx.actor.clone(), ctx.reason.clone());
                Ok(true)
            }
        }
    }

    /// The record `change_state(name)` would append, without moving
    ///
    /// `None` when the entity already is in that state. Passing the record
    /// to `replay` afterwards applies it unchanged.
    pub fn prepare(&self, name: &str, ctx: &TransitionContext) -> Result<Option<TransitionRecord>, StateError> {
        Ok(self.resolve(name)?.map(|target| TransitionRecord {
            sequence: self.log.next_sequence(),
            from: self.state().name().to_string(),
            to: self.states[target].name().to_string(),
            at: Utc::now(),
            actor: ctx.actor.clone(),
            reason: ctx.reason.clone(),
        }))
    }

    /// Re-apply a stored transition, keeping its timestamp and actor
    pub fn replay(&mut self, record: &TransitionRecord) -> Result<bool, StateError> {
        if record.from != self.state().name() {
            warn!(owner = %self.owner, from = %record.from, to = %record.to, "stored transition out of order");
            return Err(StateError::ReplayMismatch {
                from: record.from.clone(),
                to: record.to.clone(),
                current: self.state().name().to_string(),
            });
        }

        match self.resolve(&record.to)? {
            None => Ok(false),
            Some(target) => {
                self.apply(target, record.at, record.actor.clone(), record.reason.clone());
                Ok(true)
            }
        }
    }

    /// Index of the target state, None if it is the current one
    fn resolve(&self, name: &str) -> Result<Option<usize>, StateError> {
        let target = self
            .states
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| StateError::UnknownState {
                owner: self.owner.clone(),
                requested: name.to_string(),
                known: self.state_names().iter().map(|s| s.to_string()).collect(),
            })?;

        if target == self.current {
            return Ok(None);
        }

        let from = self.state().name();
        if let Some(table) = &self.transitions {
            if !table.allows(from, name) {
                return Err(StateError::TransitionNotAllowed {
                    owner: self.owner.clone(),
                    from: from.to_string(),
                    to: name.to_string(),
                });
            }
        }

        Ok(Some(target))
    }

    fn apply(&mut self, target: usize, at: DateTime<Utc>, actor: String, reason: Option<String>) {
        let from = self.state().name();
        let to = self.states[target].name();

        let record = TransitionRecord {
            sequence: self.log.next_sequence(),
            from: from.to_string(),
            to: to.to_string(),
            at,
            actor,
            reason,
        };

        self.previous = Some(self.current);
        self.current = target;
        self.log.push(record);

        debug!(owner = %self.owner, from, to, "state changed");
    }
}

// ============================================================================
// TESTS
// ============================================================================
