use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use super::MemoryStore;
use crate::identity::PrincipalRecord;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Duplicate principal id in fixture: {0}")]
    DuplicateId(Uuid),
}

/// Principal seed data for a [`MemoryStore`]
///
/// ```yaml
/// principals:
///   - id: 00000000-0000-0000-0000-000000000001
///     identifier: head@clinic.example
///     role: SUPERVISOR
///     secret: correct horse
///   - id: 00000000-0000-0000-0000-000000000002
///     identifier: pro@clinic.example
///     role: PROFESSIONAL
///     supervisor_id: 00000000-0000-0000-0000-000000000001
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub principals: Vec<FixtureEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntry {
    pub id: Uuid,
    pub identifier: String,
    pub role: String,
    #[serde(default)]
    pub supervisor_id: Option<Uuid>,
    #[serde(default)]
    pub professional_id: Option<Uuid>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl FixtureEntry {
    pub fn record(&self) -> PrincipalRecord {
        PrincipalRecord {
            id: self.id,
            identifier: self.identifier.clone(),
            role: self.role.clone(),
            supervisor_id: self.supervisor_id,
            professional_id: self.professional_id,
        }
    }
}

impl Fixture {
    pub fn from_yaml(source: &str) -> Result<Self, FixtureError> {
        let fixture: Fixture = serde_yaml::from_str(source)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &fixture.principals {
            if !seen.insert(entry.id) {
                return Err(FixtureError::DuplicateId(entry.id));
            }
        }

        Ok(fixture)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    /// Build a store holding every entry as-is; malformed rows are kept
    pub fn into_store(self) -> MemoryStore {
        let store = MemoryStore::new();
        for entry in self.principals {
            store.insert(entry.record(), entry.secret.as_deref());
        }
        store
    }
}
