use sqlx::FromRow;
use uuid::Uuid;

use super::{Principal, PrincipalId, Role, RoleKind, StructuralError};

/// Flat principal row as stored by the backing store
///
/// The store keeps the role as a tag plus optional references. Converting to
/// [`Principal`] checks that the references match the role.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PrincipalRecord {
    pub id: Uuid,
    pub identifier: String,
    pub role: String,
    pub supervisor_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
}

impl PrincipalRecord {
    pub fn supervisor(id: Uuid, identifier: impl Into<String>) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            role: RoleKind::Supervisor.as_str().to_string(),
            supervisor_id: None,
            professional_id: None,
        }
    }

    pub fn professional(id: Uuid, identifier: impl Into<String>, supervisor: Uuid) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            role: RoleKind::Professional.as_str().to_string(),
            supervisor_id: Some(supervisor),
            professional_id: None,
        }
    }

    pub fn patient(
        id: Uuid,
        identifier: impl Into<String>,
        supervisor: Uuid,
        professional: Option<Uuid>,
    ) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            role: RoleKind::Patient.as_str().to_string(),
            supervisor_id: Some(supervisor),
            professional_id: professional,
        }
    }
}

impl TryFrom<PrincipalRecord> for Principal {
    type Error = StructuralError;

    fn try_from(record: PrincipalRecord) -> Result<Self, Self::Error> {
        let id = PrincipalId(record.id);
        let kind: RoleKind = record.role.parse().map_err(|_| StructuralError::UnknownRole {
            principal: id,
            role: record.role.clone(),
        })?;

        let inconsistent = || StructuralError::InconsistentRole {
            principal: id,
            role: record.role.clone(),
        };

        let role = match (kind, record.supervisor_id, record.professional_id) {
            (RoleKind::Supervisor, None, None) => Role::Supervisor,
            (RoleKind::Professional, Some(supervisor), None) => Role::Professional {
                supervisor: PrincipalId(supervisor),
            },
            (RoleKind::Patient, Some(supervisor), professional) => Role::Patient {
                supervisor: PrincipalId(supervisor),
                professional: professional.map(PrincipalId),
            },
            _ => return Err(inconsistent()),
        };

        Ok(Principal {
            id,
            identifier: record.identifier,
            role,
        })
    }
}
