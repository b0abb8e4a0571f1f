// 🚢 Fleet - the live entities behind the CLI and the server
//
// One site, one mooring system and one naval model (which owns the
// structure). Identity and parameters live in the entities table; states
// are rebuilt by replaying stored transition events.

use crate::config::Config;
use crate::db::{self, EntityRow};
use crate::entities::{mooring, naval, site, structure};
use crate::entities::{BoxStructure, MooringSystem, NavalModel, Site};
use crate::entity::Entity;
use crate::parameters::{load_parameter_csv, ParameterSet};
use crate::schema::SchemaRegistry;
use crate::state::TransitionContext;
use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

/// Kinds addressable through the fleet, in display order
pub const KINDS: [&str; 4] = [site::KIND, mooring::KIND, structure::KIND, naval::KIND];

#[derive(Debug, Clone)]
pub struct Fleet {
    site: Site,
    mooring: MooringSystem,
    naval: NavalModel<BoxStructure>,
}

impl Fleet {
    pub fn new(site: Site, mooring: MooringSystem, naval: NavalModel<BoxStructure>) -> Self {
        Fleet { site, mooring, naval }
    }

    /// Every entity built from its schema defaults
    pub fn with_defaults() -> Result<Self> {
        Fleet::from_config(&Config::default())
    }

    /// Fresh entities from schema defaults plus configured CSV overrides
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = SchemaRegistry::new();
        let param = |kind: &str| configured_parameters(&registry, config, kind);

        let hull = BoxStructure::new("Structure", param(structure::KIND)?)?;
        Ok(Fleet {
            site: Site::new("Site", param(site::KIND)?)?,
            mooring: MooringSystem::new("Mooring System", param(mooring::KIND)?)?,
            naval: NavalModel::new("Naval", param(naval::KIND)?, hull)?,
        })
    }

    /// Load the fleet stored in `conn`, storing any entity not there yet
    ///
    /// Stored ids and parameters win over the configuration; stored
    /// transitions are replayed oldest first.
    pub fn open(conn: &Connection, config: &Config) -> Result<Self> {
        let registry = SchemaRegistry::new();
        let mut rows = Vec::with_capacity(KINDS.len());
        for kind in KINDS {
            rows.push(db::get_entity_row(conn, kind)?);
        }

        let resolve = |index: usize, kind: &str, default_name: &str| -> Result<(String, ParameterSet)> {
            match &rows[index] {
                Some(row) => {
                    check_fingerprint(row);
                    Ok((row.name.clone(), row.parameters.clone()))
                }
                None => Ok((default_name.to_string(), configured_parameters(&registry, config, kind)?)),
            }
        };

        let (name, params) = resolve(0, site::KIND, "Site")?;
        let mut site = Site::new(name, params)?;
        let (name, params) = resolve(1, mooring::KIND, "Mooring System")?;
        let mut mooring = MooringSystem::new(name, params)?;
        let (name, params) = resolve(2, structure::KIND, "Structure")?;
        let mut hull = BoxStructure::new(name, params)?;
        let (name, params) = resolve(3, naval::KIND, "Naval")?;

        if let Some(row) = &rows[0] {
            site = site.with_id(&row.id);
        }
        if let Some(row) = &rows[1] {
            mooring = mooring.with_id(&row.id);
        }
        if let Some(row) = &rows[2] {
            hull = hull.with_id(&row.id);
        }
        let mut naval = NavalModel::new(name, params, hull)?;
        if let Some(row) = &rows[3] {
            naval = naval.with_id(&row.id);
        }

        let mut fleet = Fleet { site, mooring, naval };

        for (kind, row) in KINDS.iter().zip(rows.iter()) {
            let entity = fleet
                .entity_mut(kind)
                .ok_or_else(|| anyhow!("Unknown entity kind '{}'", kind))?;

            match row {
                Some(row) => restore(conn, entity, row)?,
                None => {
                    db::upsert_entity(conn, &*entity)?;
                    info!(kind = *kind, id = entity.id(), "new entity stored");
                }
            }
        }

        for warning in fleet.consistency_warnings() {
            warn!("{}", warning);
        }

        Ok(fleet)
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn mooring(&self) -> &MooringSystem {
        &self.mooring
    }

    pub fn naval(&self) -> &NavalModel<BoxStructure> {
        &self.naval
    }

    pub fn structure(&self) -> &BoxStructure {
        self.naval.structure()
    }

    pub fn entity(&self, kind: &str) -> Option<&dyn Entity> {
        match kind {
            site::KIND => Some(&self.site),
            mooring::KIND => Some(&self.mooring),
            structure::KIND => Some(self.naval.structure()),
            naval::KIND => Some(&self.naval),
            _ => None,
        }
    }

    pub fn entity_mut(&mut self, kind: &str) -> Option<&mut dyn Entity> {
        match kind {
            site::KIND => Some(&mut self.site),
            mooring::KIND => Some(&mut self.mooring),
            structure::KIND => Some(self.naval.structure_mut()),
            naval::KIND => Some(&mut self.naval),
            _ => None,
        }
    }

    pub fn entities(&self) -> Vec<&dyn Entity> {
        KINDS.iter().filter_map(|kind| self.entity(kind)).collect()
    }

    /// Environment parameters declared by more than one entity that disagree
    ///
    /// Each entity computes with its own parameters: the site answers for
    /// tides, the mooring system for line geometry and the naval model for
    /// hydrostatics. Nothing is reconciled; disagreements are reported.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let site = self.site.parameters();
        let pairs = [
            ("site MeanSeaLevel", site.si("MeanSeaLevel"), "naval WaterDepth", self.naval.parameters().si("WaterDepth")),
            ("site MeanSeaLevel", site.si("MeanSeaLevel"), "mooring_system WaterDepth", self.mooring.parameters().si("WaterDepth")),
            ("site WaterDensity", site.si("WaterDensity"), "naval WaterDensity", self.naval.parameters().si("WaterDensity")),
        ];

        pairs
            .into_iter()
            .filter_map(|(left, a, right, b)| match (a, b) {
                (Ok(a), Ok(b)) if (a - b).abs() > 1e-9 * a.abs().max(b.abs()) => {
                    Some(format!("{} ({}) differs from {} ({})", left, a, right, b))
                }
                _ => None,
            })
            .collect()
    }

    /// Change the state of `kind` and store the event if it moved
    ///
    /// The event is stored before the entity moves, so a failed insert
    /// leaves memory and database in step.
    pub fn transition(
        &mut self,
        conn: &Connection,
        kind: &str,
        state: &str,
        ctx: &TransitionContext,
    ) -> Result<bool> {
        let entity = self
            .entity_mut(kind)
            .ok_or_else(|| anyhow!("Unknown entity kind '{}'", kind))?;

        let Some(record) = entity.prepare_transition(state, ctx)? else {
            return Ok(false);
        };

        let event = db::Event::transition(&*entity, &record)?;
        db::insert_event(conn, &event)
            .with_context(|| format!("Failed to store transition of {} to {}", kind, state))?;

        entity.replay(&record)?;
        info!(kind, id = entity.id(), state, actor = %ctx.actor, "entity changed state");

        Ok(true)
    }
}

/// Schema defaults for `kind`, overridden by the configured CSV if any
fn configured_parameters(registry: &SchemaRegistry, config: &Config, kind: &str) -> Result<ParameterSet> {
    let schema = registry.require(kind)?;
    let mut builder = schema.builder();

    if let Some(path) = config.parameter_file(kind) {
        let overrides = load_parameter_csv(path)?;
        info!(kind, file = %path.display(), count = overrides.len(), "parameter overrides loaded");
        builder = builder.apply(overrides);
    }

    builder
        .build()
        .with_context(|| format!("Invalid parameters for {}", kind))
}

fn check_fingerprint(row: &EntityRow) {
    let actual = row.parameters.fingerprint();
    if actual != row.fingerprint {
        warn!(
            kind = row.kind.as_str(),
            id = row.id.as_str(),
            stored = row.fingerprint.as_str(),
            actual = actual.as_str(),
            "stored parameters do not match their fingerprint"
        );
    }
}

fn restore(conn: &Connection, entity: &mut dyn Entity, row: &EntityRow) -> Result<()> {
    entity.set_created_at(row.created_at);

    let records = db::load_transitions(conn, &row.kind, &row.id)
        .with_context(|| format!("Failed to load transitions of {}", row.kind))?;
    for record in &records {
        entity
            .replay(record)
            .with_context(|| format!("Failed to replay transition {} of {}", record.sequence, row.kind))?;
    }

    info!(
        kind = row.kind.as_str(),
        id = row.id.as_str(),
        replayed = records.len(),
        state = entity.state_name(),
        "entity restored"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TransitionRecord;
    use chrono::Utc;
    use std::collections::HashMap;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_kinds_addressable() {
        let fleet = Fleet::with_defaults().unwrap();

        for kind in KINDS {
            assert_eq!(fleet.entity(kind).unwrap().kind(), kind);
        }
        assert!(fleet.entity("bank").is_none());
        assert_eq!(fleet.entities().len(), 4);
    }

    #[test]
    fn test_structure_is_the_naval_hull() {
        let fleet = Fleet::with_defaults().unwrap();
        assert_eq!(fleet.entity("structure").unwrap().id(), fleet.naval().structure().id());
    }

    #[test]
    fn test_open_stores_new_entities() {
        let conn = test_db();
        let fleet = Fleet::open(&conn, &Config::default()).unwrap();

        for kind in KINDS {
            let row = db::get_entity_row(&conn, kind).unwrap().unwrap();
            assert_eq!(row.id, fleet.entity(kind).unwrap().id());
        }
    }

    #[test]
    fn test_reopen_replays_transitions() {
        let conn = test_db();
        let ctx = TransitionContext::new("ops").with_reason("retrieval");

        let mut fleet = Fleet::open(&conn, &Config::default()).unwrap();
        assert!(fleet.transition(&conn, "mooring_system", "LayDown", &ctx).unwrap());
        assert!(fleet.transition(&conn, "naval", "Damaged", &ctx).unwrap());
        assert!(fleet.transition(&conn, "structure", "Installed", &ctx).unwrap());

        let reopened = Fleet::open(&conn, &Config::default()).unwrap();

        for kind in KINDS {
            let before = fleet.entity(kind).unwrap();
            let after = reopened.entity(kind).unwrap();
            assert_eq!(after.id(), before.id());
            assert_eq!(after.state_name(), before.state_name());
            assert_eq!(after.previous_state_name(), before.previous_state_name());
            assert_eq!(after.history().records(), before.history().records());
        }
        assert_eq!(reopened.mooring().state_name(), "LayDown");
    }

    #[test]
    fn test_same_state_stores_nothing() {
        let conn = test_db();
        let mut fleet = Fleet::open(&conn, &Config::default()).unwrap();

        let changed = fleet
            .transition(&conn, "mooring_system", "InSitu", &TransitionContext::default())
            .unwrap();

        assert!(!changed);
        assert_eq!(db::count_events(&conn).unwrap(), 0);
    }

    #[test]
    fn test_rejected_transition_stores_nothing() {
        let conn = test_db();
        let mut fleet = Fleet::open(&conn, &Config::default()).unwrap();
        let ctx = TransitionContext::default();

        assert!(fleet.transition(&conn, "mooring_system", "Sunk", &ctx).is_err());
        assert!(fleet.transition(&conn, "structure", "Weathered", &ctx).is_err());
        assert!(fleet.transition(&conn, "bank", "Open", &ctx).is_err());
        assert_eq!(db::count_events(&conn).unwrap(), 0);
        assert_eq!(fleet.structure().state_name(), "AsBuilt");
    }

    #[test]
    fn test_config_overrides_and_stored_parameters_win() {
        let path = std::env::temp_dir().join(format!("hivemind-fleet-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, "Name,Value,Unit\nAnchorRadius,150,m\n").unwrap();

        let mut files = HashMap::new();
        files.insert("mooring_system".to_string(), path.clone());
        let config = Config { parameter_files: files, ..Config::default() };

        let conn = test_db();
        let fleet = Fleet::open(&conn, &config).unwrap();
        assert_eq!(fleet.mooring().parameters().si("AnchorRadius").unwrap(), 150.0);

        // Once stored, the configuration no longer changes the entity
        let reopened = Fleet::open(&conn, &Config::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reopened.mooring().parameters().si("AnchorRadius").unwrap(), 150.0);
    }

    #[test]
    fn test_failed_store_leaves_state_unchanged() {
        let conn = test_db();
        let ctx = TransitionContext::new("ops");
        let mut fleet = Fleet::open(&conn, &Config::default()).unwrap();

        conn.execute_batch("ALTER TABLE events RENAME TO events_moved").unwrap();
        let err = fleet.transition(&conn, "mooring_system", "LayDown", &ctx).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to store transition"));
        assert_eq!(fleet.mooring().state_name(), "InSitu");
        assert!(fleet.mooring().previous_state_name().is_none());
        assert!(fleet.mooring().history().is_empty());

        conn.execute_batch("ALTER TABLE events_moved RENAME TO events").unwrap();
        assert!(fleet.transition(&conn, "mooring_system", "LayDown", &ctx).unwrap());
        assert_eq!(fleet.mooring().history().len(), 1);

        let reopened = Fleet::open(&conn, &Config::default()).unwrap();
        assert_eq!(reopened.mooring().state_name(), "LayDown");
        assert_eq!(reopened.mooring().history().records(), fleet.mooring().history().records());
    }

    #[test]
    fn test_open_rejects_corrupt_transition_event() {
        let conn = test_db();
        let fleet = Fleet::open(&conn, &Config::default()).unwrap();

        let event = db::Event::new(
            db::TRANSITION_EVENT,
            "mooring_system",
            fleet.mooring().id(),
            serde_json::json!({ "bogus": 1 }),
            "ops",
        );
        db::insert_event(&conn, &event).unwrap();

        let err = Fleet::open(&conn, &Config::default()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to load transitions of mooring_system"));
        assert!(message.contains("does not hold a transition"));
    }

    #[test]
    fn test_open_rejects_out_of_order_transition() {
        let conn = test_db();
        let fleet = Fleet::open(&conn, &Config::default()).unwrap();

        let record = TransitionRecord {
            sequence: 1,
            from: "LayDown".to_string(),
            to: "InSitu".to_string(),
            at: Utc::now(),
            actor: "ops".to_string(),
            reason: None,
        };
        db::insert_event(&conn, &db::Event::transition(fleet.mooring(), &record).unwrap()).unwrap();

        let err = Fleet::open(&conn, &Config::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to replay transition 1 of mooring_system"));
    }

    #[test]
    fn test_consistency_warnings() {
        let fleet = Fleet::with_defaults().unwrap();
        assert!(fleet.consistency_warnings().is_empty());

        let path = std::env::temp_dir().join(format!("hivemind-depth-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, "Name,Value,Unit\nWaterDepth,150,m\nAnchorRadius,300,m\nLineLength,400,m\n").unwrap();

        let mut files = HashMap::new();
        files.insert("mooring_system".to_string(), path.clone());
        let config = Config { parameter_files: files, ..Config::default() };

        let fleet = Fleet::from_config(&config);
        std::fs::remove_file(&path).ok();

        let warnings = fleet.unwrap().consistency_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mooring_system WaterDepth"));
    }
}
