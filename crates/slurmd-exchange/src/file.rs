//! Directory-backed exchange.
//!
//! Each relation gets its own directory with one JSON file per databag:
//!
//! ```text
//! {root}/
//! └── {relation_id}/
//!     ├── app-slurmctld.json   <- remote application databag (read)
//!     └── unit-slurmd-0.json   <- local unit databag (written)
//! ```
//!
//! Writes go through a temporary file and a rename so a crash never leaves
//! a half-written databag behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use slurmd_types::{AppName, PeerRecord, RelationId, RemoteView, UnitName};

use crate::{Exchange, ExchangeError};

/// An exchange backed by JSON databag files under a root directory.
#[derive(Debug, Clone)]
pub struct FileExchange {
    root: PathBuf,
}

impl FileExchange {
    /// Creates an exchange rooted at the given directory.
    ///
    /// Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn relation_dir(&self, relation: RelationId) -> PathBuf {
        self.root.join(relation.to_string())
    }

    fn app_bag_path(&self, relation: RelationId, app: &AppName) -> PathBuf {
        self.relation_dir(relation)
            .join(format!("app-{}.json", app.as_str()))
    }

    fn unit_bag_path(&self, relation: RelationId, unit: &UnitName) -> PathBuf {
        // Unit names carry a slash (slurmd/0); encode it for the filesystem.
        let encoded = unit.as_str().replace('/', "-");
        self.relation_dir(relation)
            .join(format!("unit-{encoded}.json"))
    }

    /// Writes one key into a remote application's databag file.
    ///
    /// The agent itself never writes application scope; this is a
    /// development helper standing in for the remote side of the exchange.
    pub fn seed_remote_app(
        &self,
        relation: RelationId,
        app: &AppName,
        key: &str,
        value: &str,
    ) -> Result<(), ExchangeError> {
        let path = self.app_bag_path(relation, app);
        let mut bag = match read_bag(&path)? {
            Some(bag) => bag,
            None => BTreeMap::new(),
        };
        bag.insert(key.to_string(), value.to_string());
        write_bag(&path, &bag)?;
        tracing::debug!(relation = %relation, app = %app, key, "seeded remote databag value");
        Ok(())
    }
}

impl Exchange for FileExchange {
    fn remote_app_view(
        &self,
        relation: RelationId,
        app: &AppName,
    ) -> Result<Option<RemoteView>, ExchangeError> {
        let path = self.app_bag_path(relation, app);
        Ok(read_bag(&path)?.map(RemoteView::from))
    }

    fn publish_unit_record(
        &mut self,
        relation: RelationId,
        unit: &UnitName,
        record: &PeerRecord,
    ) -> Result<(), ExchangeError> {
        let path = self.unit_bag_path(relation, unit);
        write_bag(&path, &record.to_bag())?;
        tracing::debug!(relation = %relation, unit = %unit, "published unit record");
        Ok(())
    }
}

/// Reads a databag file, distinguishing "absent" from "unreadable".
fn read_bag(path: &Path) -> Result<Option<BTreeMap<String, String>>, ExchangeError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let bag = serde_json::from_str(&contents).map_err(|source| ExchangeError::MalformedBag {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(bag))
}

/// Writes a databag file atomically (temp file, then rename).
fn write_bag(path: &Path, bag: &BTreeMap<String, String>) -> Result<(), ExchangeError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let contents = serde_json::to_string_pretty(bag).map_err(|source| ExchangeError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}
