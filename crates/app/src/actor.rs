use serde::{Deserialize, Serialize};

use aciport_parties::{PartyId, PartyRole};

/// The authenticated party on whose behalf an operation runs.
///
/// Produced by the platform's auth boundary after credential verification.
/// Services never infer the caller from context; it is always passed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub party_id: PartyId,
    pub role: PartyRole,
}

impl Actor {
    pub fn new(party_id: PartyId, role: PartyRole) -> Self {
        Self { party_id, role }
    }
}
