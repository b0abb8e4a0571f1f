use crate::entity::Entity;
use crate::history::TransitionRecord;
use crate::parameters::ParameterSet;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Event type of state changes in the events table
pub const TRANSITION_EVENT: &str = "state_changed";

/// Stored identity and parameters of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub parameters: ParameterSet,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// Event for audit trail ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    /// Event for one transition of `entity`, stamped with the transition time
    pub fn transition(entity: &dyn Entity, record: &TransitionRecord) -> Result<Self> {
        let mut event = Event::new(
            TRANSITION_EVENT,
            entity.kind(),
            entity.id(),
            serde_json::to_value(record)?,
            &record.actor,
        );
        event.timestamp = record.at;
        Ok(event)
    }

    pub fn to_transition(&self) -> Result<TransitionRecord> {
        serde_json::from_value(self.data.clone())
            .with_context(|| format!("Event {} does not hold a transition", self.event_id))
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Entities Table (identity + immutable parameters)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            parameters TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail / event sourcing)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// Store identity, name and parameters of an entity (idempotent)
pub fn upsert_entity(conn: &Connection, entity: &dyn Entity) -> Result<()> {
    let parameters_json = serde_json::to_string(entity.parameters())?;

    conn.execute(
        "INSERT INTO entities (id, kind, name, parameters, fingerprint, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            parameters = excluded.parameters,
            fingerprint = excluded.fingerprint",
        params![
            entity.id(),
            entity.kind(),
            entity.name(),
            parameters_json,
            entity.parameters().fingerprint(),
            entity.created_at().to_rfc3339(),
        ],
    )?;

    debug!(kind = entity.kind(), id = entity.id(), "entity stored");
    Ok(())
}

/// First stored entity of `kind`, if any
pub fn get_entity_row(conn: &Connection, kind: &str) -> Result<Option<EntityRow>> {
    let row = conn
        .query_row(
            "SELECT id, kind, name, parameters, fingerprint, created_at
             FROM entities
             WHERE kind = ?1
             ORDER BY rowid
             LIMIT 1",
            params![kind],
            |row| {
                let parameters_json: String = row.get(3)?;
                let created_at: String = row.get(5)?;

                Ok(EntityRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    name: row.get(2)?,
                    parameters: serde_json::from_str(&parameters_json)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
                    fingerprint: row.get(4)?,
                    created_at: parse_time(&created_at, 5)?,
                })
            },
        )
        .optional()?;

    Ok(row)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for a specific entity, in insertion order
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id ASC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_time(&timestamp_str, 1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Persist the most recent transition of `entity`
pub fn record_transition(conn: &Connection, entity: &dyn Entity) -> Result<()> {
    let record = entity
        .history()
        .last()
        .ok_or_else(|| anyhow!("{} {} has no transition to record", entity.kind(), entity.id()))?;

    insert_event(conn, &Event::transition(entity, record)?)
}

/// Stored transitions of one entity, oldest first
pub fn load_transitions(conn: &Connection, entity_type: &str, entity_id: &str) -> Result<Vec<TransitionRecord>> {
    get_events_for_entity(conn, entity_type, entity_id)?
        .iter()
        .filter(|e| e.event_type == TRANSITION_EVENT)
        .map(Event::to_transition)
        .collect()
}

pub fn count_events(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(count)
}

fn parse_time(text: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
