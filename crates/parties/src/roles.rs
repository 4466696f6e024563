//! Role assignment for new shipment requests.
//!
//! Only importers and foreign exporters may originate a request. The
//! authenticated actor takes its own side of the declaration and the
//! counterparty takes the other; a customs broker cannot originate at all.

use serde::{Deserialize, Serialize};

use aciport_core::{DomainError, DomainResult};

use crate::party::{PartyId, PartyRole};

/// Resolved importer/exporter pair for a new shipment request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub importer: PartyId,
    pub exporter: PartyId,
}

/// Resolve which party plays which role in a new request.
///
/// A foreign-exporter actor becomes the exporter and the counterparty the
/// importer; an importer actor the reverse.
pub fn assign_roles(
    actor: PartyId,
    actor_role: PartyRole,
    counterparty: PartyId,
) -> DomainResult<RoleAssignment> {
    if actor == counterparty {
        return Err(DomainError::validation(
            "a party cannot be both importer and exporter of the same request",
        ));
    }

    match actor_role {
        PartyRole::ForeignExporter => Ok(RoleAssignment {
            importer: counterparty,
            exporter: actor,
        }),
        PartyRole::Importer => Ok(RoleAssignment {
            importer: actor,
            exporter: counterparty,
        }),
        PartyRole::CustomsBroker => Err(DomainError::unauthorized_role(
            "only importers and foreign exporters may originate a shipment request",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> PartyId {
        PartyId::from_u64(n)
    }

    #[test]
    fn importer_actor_takes_importer_side() {
        let assignment = assign_roles(pid(1), PartyRole::Importer, pid(2)).unwrap();
        assert_eq!(assignment.importer, pid(1));
        assert_eq!(assignment.exporter, pid(2));
    }

    #[test]
    fn exporter_actor_takes_exporter_side() {
        let assignment = assign_roles(pid(1), PartyRole::ForeignExporter, pid(2)).unwrap();
        assert_eq!(assignment.importer, pid(2));
        assert_eq!(assignment.exporter, pid(1));
    }

    #[test]
    fn broker_cannot_originate() {
        let err = assign_roles(pid(1), PartyRole::CustomsBroker, pid(2)).unwrap_err();
        assert!(matches!(err, DomainError::UnauthorizedRole(_)));
    }

    #[test]
    fn self_dealing_is_rejected() {
        let err = assign_roles(pid(1), PartyRole::Importer, pid(1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
