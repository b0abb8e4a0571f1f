// ⏰ Transition History - explicit time for state changes
//
// An entity keeps its identity and parameters; only its state changes.
// Every change is appended to a log that is never rewritten, so the state at
// any past instant can be answered from the log alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSITION RECORD
// ============================================================================

/// One accepted state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Position in the log, starting at 1
    pub sequence: u64,

    pub from: String,
    pub to: String,

    /// When the new state became true
    pub at: DateTime<Utc>,

    /// Who requested the change
    pub actor: String,

    /// Why (e.g. "hook-up completed")
    pub reason: Option<String>,
}

// ============================================================================
// STATE PERIOD
// ============================================================================

/// Interval during which one state was current
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePeriod {
    pub state: String,
    pub valid_from: DateTime<Utc>,

    /// None = still current
    pub valid_until: Option<DateTime<Utc>>,
}

impl StatePeriod {
    pub fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }

    pub fn was_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.valid_from <= time && self.valid_until.map_or(true, |until| until > time)
    }
}

// ============================================================================
// TRANSITION LOG
// ============================================================================

/// Append-only timeline of state changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionLog {
    initial_state: String,
    started_at: DateTime<Utc>,
    records: Vec<TransitionRecord>,
}

impl TransitionLog {
    pub fn new(initial_state: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        TransitionLog {
            initial_state: initial_state.into(),
            started_at,
            records: Vec::new(),
        }
    }

    /// State the entity was created in
    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    /// When the entity (and its first period) came into existence
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn set_started_at(&mut self, started_at: DateTime<Utc>) {
        self.started_at = started_at;
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64 + 1
    }

    pub(crate) fn push(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    /// Validity intervals, oldest first; the last one is open
    pub fn periods(&self) -> Vec<StatePeriod> {
        let mut periods = Vec::with_capacity(self.records.len() + 1);
        let mut state = self.initial_state.clone();
        let mut valid_from = self.started_at;

        for record in &self.records {
            periods.push(StatePeriod {
                state,
                valid_from,
                valid_until: Some(record.at),
            });
            state = record.to.clone();
            valid_from = record.at;
        }

        periods.push(StatePeriod {
            state,
            valid_from,
            valid_until: None,
        });
        periods
    }

    /// Which state was current at `time` (None before the entity existed)
    pub fn state_at(&self, time: DateTime<Utc>) -> Option<String> {
        self.periods()
            .into_iter()
            .find(|p| p.was_valid_at(time))
            .map(|p| p.state)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(sequence: u64, from: &str, to: &str, at: DateTime<Utc>) -> TransitionRecord {
        TransitionRecord {
            sequence,
            from: from.to_string(),
            to: to.to_string(),
            at,
            actor: "test".to_string(),
            reason: None,
        }
    }

    #[test]
    fn test_new_log_has_single_open_period() {
        let start = Utc::now();
        let log = TransitionLog::new("InSitu", start);

        let periods = log.periods();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].state, "InSitu");
        assert!(periods[0].is_current());
        assert_eq!(log.next_sequence(), 1);
    }

    #[test]
    fn test_periods_follow_records() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(10);
        let t2 = t0 + Duration::days(3650);

        let mut log = TransitionLog::new("LayDown", t0);
        log.push(record(1, "LayDown", "InSitu", t1));
        log.push(record(2, "InSitu", "Weathered", t2));

        let periods = log.periods();
        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].valid_until, Some(t1));
        assert_eq!(periods[1].state, "InSitu");
        assert_eq!(periods[1].valid_from, t1);
        assert_eq!(periods[2].state, "Weathered");
        assert!(periods[2].is_current());
    }

    #[test]
    fn test_state_at() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(10);

        let mut log = TransitionLog::new("LayDown", t0);
        log.push(record(1, "LayDown", "InSitu", t1));

        assert_eq!(log.state_at(t0 - Duration::seconds(1)), None);
        assert_eq!(log.state_at(t0).as_deref(), Some("LayDown"));
        assert_eq!(log.state_at(t1 - Duration::seconds(1)).as_deref(), Some("LayDown"));
        assert_eq!(log.state_at(t1).as_deref(), Some("InSitu"));
        assert_eq!(log.state_at(t1 + Duration::days(400)).as_deref(), Some("InSitu"));
    }
}
