//! In-process exchange for tests and simulation.

use std::collections::BTreeMap;

use slurmd_types::{AppName, PeerRecord, RelationId, RemoteView, UnitName};

use crate::{Exchange, ExchangeError};

/// Databags for one relation.
#[derive(Debug, Default, Clone)]
struct RelationBags {
    /// Application-scoped bags, keyed by application name.
    apps: BTreeMap<String, BTreeMap<String, String>>,
    /// Unit-scoped bags, keyed by unit name.
    units: BTreeMap<String, BTreeMap<String, String>>,
}

/// An exchange that keeps all databags in memory.
///
/// Reads observe completed writes immediately and the last write per key
/// wins, matching the consistency the agent is written against. Every
/// publication is also appended to a log so tests can assert on how often
/// the agent wrote, not just what it wrote last.
#[derive(Debug, Default)]
pub struct MemoryExchange {
    relations: BTreeMap<RelationId, RelationBags>,
    publish_log: Vec<(RelationId, UnitName)>,
}

impl MemoryExchange {
    /// Creates an exchange with no relations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a relation with empty databags.
    pub fn add_relation(&mut self, relation: RelationId) {
        self.relations.entry(relation).or_default();
    }

    /// Removes a relation and all its databags.
    pub fn remove_relation(&mut self, relation: RelationId) {
        self.relations.remove(&relation);
    }

    /// Writes one key into a remote application's databag, creating the
    /// relation if needed. This is the test stand-in for the remote side.
    pub fn set_remote(&mut self, relation: RelationId, app: &AppName, key: &str, value: &str) {
        self.relations
            .entry(relation)
            .or_default()
            .apps
            .entry(app.as_str().to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Removes one key from a remote application's databag.
    pub fn clear_remote(&mut self, relation: RelationId, app: &AppName, key: &str) {
        if let Some(bags) = self.relations.get_mut(&relation) {
            if let Some(bag) = bags.apps.get_mut(app.as_str()) {
                bag.remove(key);
            }
        }
    }

    /// Returns the current unit-scoped bag for inspection.
    pub fn unit_bag(
        &self,
        relation: RelationId,
        unit: &UnitName,
    ) -> Option<&BTreeMap<String, String>> {
        self.relations
            .get(&relation)?
            .units
            .get(unit.as_str())
    }

    /// All publications performed so far, in order.
    pub fn publish_log(&self) -> &[(RelationId, UnitName)] {
        &self.publish_log
    }
}

impl Exchange for MemoryExchange {
    fn remote_app_view(
        &self,
        relation: RelationId,
        app: &AppName,
    ) -> Result<Option<RemoteView>, ExchangeError> {
        let Some(bags) = self.relations.get(&relation) else {
            return Ok(None);
        };
        let bag = bags.apps.get(app.as_str()).cloned().unwrap_or_default();
        Ok(Some(RemoteView::from(bag)))
    }

    fn publish_unit_record(
        &mut self,
        relation: RelationId,
        unit: &UnitName,
        record: &PeerRecord,
    ) -> Result<(), ExchangeError> {
        self.relations
            .entry(relation)
            .or_default()
            .units
            .insert(unit.as_str().to_string(), record.to_bag());
        self.publish_log.push((relation, unit.clone()));
        Ok(())
    }
}
