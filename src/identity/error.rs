use thiserror::Error;

use super::PrincipalId;
use crate::store::StoreError;

/// Violation of the ownership forest invariant in stored data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("principal {0} references itself")]
    SelfReference(PrincipalId),

    #[error("principal {principal} and {supervisor} reference each other")]
    Cycle {
        principal: PrincipalId,
        supervisor: PrincipalId,
    },

    #[error("principal {principal} references missing principal {missing}")]
    Orphaned {
        principal: PrincipalId,
        missing: PrincipalId,
    },

    #[error("principal {principal} is supervised by {supervisor}, which is not a root supervisor")]
    DepthExceeded {
        principal: PrincipalId,
        supervisor: PrincipalId,
    },

    #[error("principal {child} listed under {supervisor} does not reference it")]
    MisplacedChild {
        supervisor: PrincipalId,
        child: PrincipalId,
    },

    #[error("patient {patient} is assigned to {professional}, which is not a professional under the same supervisor")]
    InvalidAssignment {
        patient: PrincipalId,
        professional: PrincipalId,
    },

    #[error("principal {principal} has role '{role}' with inconsistent references")]
    InconsistentRole { principal: PrincipalId, role: String },

    #[error("principal {principal} has unknown role '{role}'")]
    UnknownRole { principal: PrincipalId, role: String },
}

/// Failure to resolve a principal's scope
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("principal not found: {0}")]
    NotFound(PrincipalId),

    #[error("principal {actor} may not act on {target}")]
    OutOfScope {
        actor: PrincipalId,
        target: PrincipalId,
    },

    #[error("principal store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GraphError::NotFound(id),
            StoreError::Malformed(structural) => GraphError::Structural(structural),
            StoreError::Unavailable(msg) => GraphError::Unavailable(msg),
        }
    }
}
