//! Supervisor / professional / patient ownership graph.
//!
//! Every principal other than a supervisor points at exactly one supervisor,
//! and that supervisor must itself be a root. The graph is therefore a forest
//! of depth at most two. The role type enforces this for the principal being
//! resolved; references read back from the store are checked on every call,
//! because the store is an external collaborator and may hold bad rows.
//!
//! Nothing is cached. Each call recomputes from the store.

pub mod error;
pub mod record;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{PrincipalStore, StoreError};

pub use error::{GraphError, StructuralError};
pub use record::PrincipalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Role tag without references, as carried in tokens and stored rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKind {
    Supervisor,
    Professional,
    Patient,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Supervisor => "SUPERVISOR",
            RoleKind::Professional => "PROFESSIONAL",
            RoleKind::Patient => "PATIENT",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPERVISOR" => Ok(RoleKind::Supervisor),
            "PROFESSIONAL" => Ok(RoleKind::Professional),
            "PATIENT" => Ok(RoleKind::Patient),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Role with its ownership references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Supervisor,
    Professional {
        supervisor: PrincipalId,
    },
    Patient {
        supervisor: PrincipalId,
        #[serde(skip_serializing_if = "Option::is_none")]
        professional: Option<PrincipalId>,
    },
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Supervisor => RoleKind::Supervisor,
            Role::Professional { .. } => RoleKind::Professional,
            Role::Patient { .. } => RoleKind::Patient,
        }
    }

    /// The supervising principal, `None` for roots
    pub fn supervisor(&self) -> Option<PrincipalId> {
        match self {
            Role::Supervisor => None,
            Role::Professional { supervisor } | Role::Patient { supervisor, .. } => Some(*supervisor),
        }
    }
}

/// An authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub identifier: String,
    #[serde(flatten)]
    pub role: Role,
}

/// Set of principals an actor may act upon, always including itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub principal: PrincipalId,
    pub members: BTreeSet<PrincipalId>,
}

impl Scope {
    pub fn contains(&self, id: PrincipalId) -> bool {
        self.members.contains(&id)
    }

    /// `Ok` when `target` is a member, otherwise [`GraphError::OutOfScope`]
    pub fn permits(&self, target: PrincipalId) -> Result<(), GraphError> {
        if self.contains(target) {
            Ok(())
        } else {
            Err(GraphError::OutOfScope {
                actor: self.principal,
                target,
            })
        }
    }
}

/// Resolves scopes against a [`PrincipalStore`]
#[derive(Clone)]
pub struct IdentityGraph {
    store: Arc<dyn PrincipalStore>,
}

impl IdentityGraph {
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }

    /// Check the depth-two, acyclic invariant for `principal`'s references
    pub async fn validate(&self, principal: &Principal) -> Result<(), GraphError> {
        match principal.role {
            Role::Supervisor => Ok(()),
            Role::Professional { supervisor } => self.check_supervisor(principal.id, supervisor).await,
            Role::Patient {
                supervisor,
                professional,
            } => {
                self.check_supervisor(principal.id, supervisor).await?;
                if let Some(professional) = professional {
                    self.check_assignment(principal.id, supervisor, professional)
                        .await?;
                }
                Ok(())
            }
        }
    }

    /// Principals `principal` may act upon
    pub async fn scope_of(&self, principal: &Principal) -> Result<Scope, GraphError> {
        let result = self.compute_scope(principal).await;

        match &result {
            Ok(scope) => {
                debug!(principal = %principal.id, role = %principal.role.kind(), members = scope.members.len(), "Resolved scope");
            }
            Err(GraphError::Structural(err)) => {
                warn!(principal = %principal.id, "Ownership graph violation: {}", err);
            }
            Err(err) => {
                warn!(principal = %principal.id, "Scope resolution failed: {}", err);
            }
        }

        result
    }

    /// Look up `id` and resolve its scope
    pub async fn resolve(&self, id: PrincipalId) -> Result<(Principal, Scope), GraphError> {
        let principal = self.store.lookup_principal(id).await?;
        let scope = self.scope_of(&principal).await?;
        Ok((principal, scope))
    }

    /// Succeeds with the actor's scope when `target` is inside it
    pub async fn authorize(&self, actor: &Principal, target: PrincipalId) -> Result<Scope, GraphError> {
        let scope = self.scope_of(actor).await?;
        scope.permits(target)?;
        Ok(scope)
    }

    async fn compute_scope(&self, principal: &Principal) -> Result<Scope, GraphError> {
        self.validate(principal).await?;

        let mut members = BTreeSet::new();
        members.insert(principal.id);

        match principal.role {
            Role::Supervisor => {
                for child in self.store.list_by_supervisor(principal.id).await? {
                    ensure_child_of(principal.id, &child)?;
                    members.insert(child.id);
                }
            }
            Role::Professional { supervisor } => {
                for child in self.store.list_by_supervisor(supervisor).await? {
                    ensure_child_of(supervisor, &child)?;
                    if let Role::Patient {
                        professional: Some(assigned),
                        ..
                    } = child.role
                    {
                        if assigned == principal.id {
                            members.insert(child.id);
                        }
                    }
                }
            }
            Role::Patient { .. } => {}
        }

        Ok(Scope {
            principal: principal.id,
            members,
        })
    }

    async fn check_supervisor(
        &self,
        principal: PrincipalId,
        supervisor: PrincipalId,
    ) -> Result<(), GraphError> {
        if supervisor == principal {
            return Err(StructuralError::SelfReference(principal).into());
        }

        let referenced = self.lookup_reference(principal, supervisor).await?;
        match referenced.role.supervisor() {
            None => Ok(()),
            Some(upper) if upper == principal => Err(StructuralError::Cycle {
                principal,
                supervisor,
            }
            .into()),
            Some(_) => Err(StructuralError::DepthExceeded {
                principal,
                supervisor,
            }
            .into()),
        }
    }

    async fn check_assignment(
        &self,
        patient: PrincipalId,
        supervisor: PrincipalId,
        professional: PrincipalId,
    ) -> Result<(), GraphError> {
        if professional == patient {
            return Err(StructuralError::SelfReference(patient).into());
        }

        let referenced = self.lookup_reference(patient, professional).await?;
        match referenced.role {
            Role::Professional { supervisor: upper } if upper == supervisor => Ok(()),
            _ => Err(StructuralError::InvalidAssignment {
                patient,
                professional,
            }
            .into()),
        }
    }

    /// A reference that does not resolve is an orphan, not a lookup miss
    async fn lookup_reference(
        &self,
        principal: PrincipalId,
        referenced: PrincipalId,
    ) -> Result<Principal, GraphError> {
        match self.store.lookup_principal(referenced).await {
            Ok(found) => Ok(found),
            Err(StoreError::NotFound(_)) => Err(StructuralError::Orphaned {
                principal,
                missing: referenced,
            }
            .into()),
            Err(other) => Err(other.into()),
        }
    }
}

fn ensure_child_of(supervisor: PrincipalId, child: &Principal) -> Result<(), StructuralError> {
    if child.role.supervisor() == Some(supervisor) && child.id != supervisor {
        Ok(())
    } else {
        Err(StructuralError::MisplacedChild {
            supervisor,
            child: child.id,
        })
    }
}
