//! Snapshot serialization — the full ordered population to/from JSON.
//!
//! A snapshot holds entities only. Aggregate counters are never
//! persisted; they are re-derived on load by folding over the entities.

use crate::{
    error::{RegistryError, RegistryResult},
    resource::CityResource,
    types::Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub version: u32,
    pub saved_at: Timestamp,
    pub resources: Vec<CityResource>,
}

impl CitySnapshot {
    pub fn capture(resources: &[CityResource]) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            resources: resources.to_vec(),
        }
    }
}

/// Write the population to `path`, replacing any previous file.
pub fn write_snapshot(path: &Path, resources: &[CityResource]) -> RegistryResult<()> {
    let json = serde_json::to_string_pretty(&CitySnapshot::capture(resources))
        .map_err(|e| RegistryError::Other(e.into()))?;
    fs::write(path, json)?;
    log::debug!("Snapshot of {} resources written to {}", resources.len(), path.display());
    Ok(())
}

/// Read a population back. A missing file is `SnapshotNotFound`;
/// undecodable content, an unknown version, or an entity that breaks a
/// constructor rule is `Deserialization`.
pub fn read_snapshot(path: &Path) -> RegistryResult<Vec<CityResource>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RegistryError::SnapshotNotFound { path: path.display().to_string() });
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot: CitySnapshot = serde_json::from_str(&content)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(decode_error(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }
    for (index, resource) in snapshot.resources.iter().enumerate() {
        resource
            .validate()
            .map_err(|e| decode_error(format!("resource #{index} ({:?}): {e}", resource.id())))?;
    }
    Ok(snapshot.resources)
}

fn decode_error(message: String) -> RegistryError {
    RegistryError::Deserialization(serde::de::Error::custom(message))
}
