use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aciport_core::{impl_id_newtype, Aggregate, AggregateId, AggregateRoot, DomainError};
use aciport_events::Event;

/// Minimum length for a party's credential secret.
pub const MIN_CREDENTIAL_LEN: usize = 6;

/// Party identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl_id_newtype!(PartyId, "PartyId");

/// The role a party plays in trade declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// Domestic company receiving goods. Must carry a tax id.
    Importer,
    /// International company shipping goods. Must carry a CargoX id.
    ForeignExporter,
    /// Clearance agent. No role identifier.
    CustomsBroker,
}

/// Aggregate root: Party.
///
/// Identity fields are immutable after registration; only the credential
/// secret can be set afterwards, and exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    role: PartyRole,
    name: String,
    email: String,
    tax_id: Option<String>,
    cargox_id: Option<String>,
    credential: Option<String>,
    version: u64,
    created: bool,
}

impl Party {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            role: PartyRole::Importer,
            name: String::new(),
            email: String::new(),
            tax_id: None,
            cargox_id: None,
            credential: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn role(&self) -> PartyRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }

    pub fn cargox_id(&self) -> Option<&str> {
        self.cargox_id.as_deref()
    }

    /// The role-specific external identifier, whichever the role carries.
    pub fn role_identifier(&self) -> Option<&str> {
        self.tax_id.as_deref().or(self.cargox_id.as_deref())
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterParty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub party_id: PartyId,
    pub name: String,
    pub role: PartyRole,
    pub email: String,
    /// Tax id for importers, CargoX id for foreign exporters, ignored for
    /// customs brokers.
    pub role_identifier: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetCredential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCredential {
    pub party_id: PartyId,
    /// Already hashed/derived by the platform's auth boundary; the domain
    /// only enforces presence and minimum length.
    pub secret: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    SetCredential(SetCredential),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub party_id: PartyId,
    pub name: String,
    pub role: PartyRole,
    pub email: String,
    pub tax_id: Option<String>,
    pub cargox_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CredentialSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub party_id: PartyId,
    pub secret: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    CredentialSet(CredentialSet),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::CredentialSet(_) => "parties.party.credential_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::CredentialSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.role = e.role;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.tax_id = e.tax_id.clone();
                self.cargox_id = e.cargox_id.clone();
                self.created = true;
            }
            PartyEvent::CredentialSet(e) => {
                self.credential = Some(e.secret.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::SetCredential(cmd) => self.handle_set_credential(cmd),
        }
    }
}

impl Party {
    fn ensure_party_id(&self, party_id: PartyId) -> Result<(), DomainError> {
        if self.id != party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already registered"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::invalid_identity("party name is required"));
        }

        let identifier = cmd
            .role_identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (tax_id, cargox_id) = match cmd.role {
            PartyRole::Importer => {
                let tax_id = identifier.ok_or_else(|| {
                    DomainError::invalid_identity("importers must register a tax id")
                })?;
                (Some(tax_id.to_string()), None)
            }
            PartyRole::ForeignExporter => {
                let cargox_id = identifier.ok_or_else(|| {
                    DomainError::invalid_identity("foreign exporters must register a CargoX id")
                })?;
                (None, Some(cargox_id.to_string()))
            }
            PartyRole::CustomsBroker => (None, None),
        };

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            party_id: cmd.party_id,
            name: cmd.name.trim().to_string(),
            role: cmd.role,
            email: cmd.email.clone(),
            tax_id,
            cargox_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_credential(&self, cmd: &SetCredential) -> Result<Vec<PartyEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_party_id(cmd.party_id)?;

        if self.credential.is_some() {
            return Err(DomainError::invalid_state(
                "credential is already set and cannot be replaced",
            ));
        }

        if cmd.secret.trim().is_empty() || cmd.secret.len() < MIN_CREDENTIAL_LEN {
            return Err(DomainError::validation(format!(
                "credential secret must be at least {MIN_CREDENTIAL_LEN} characters"
            )));
        }

        Ok(vec![PartyEvent::CredentialSet(CredentialSet {
            party_id: cmd.party_id,
            secret: cmd.secret.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_party_id() -> PartyId {
        PartyId::from_u64(1)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_cmd(role: PartyRole, identifier: Option<&str>) -> RegisterParty {
        RegisterParty {
            party_id: test_party_id(),
            name: "Delta Trading".to_string(),
            role,
            email: "ops@delta.example".to_string(),
            role_identifier: identifier.map(str::to_string),
            occurred_at: test_time(),
        }
    }

    fn registered(role: PartyRole, identifier: Option<&str>) -> Party {
        let mut party = Party::empty(test_party_id());
        let events = party
            .handle(&PartyCommand::RegisterParty(register_cmd(role, identifier)))
            .unwrap();
        party.apply(&events[0]);
        party
    }

    #[test]
    fn importer_registration_records_tax_id() {
        let party = registered(PartyRole::Importer, Some("123-456-789"));
        assert_eq!(party.role(), PartyRole::Importer);
        assert_eq!(party.tax_id(), Some("123-456-789"));
        assert_eq!(party.cargox_id(), None);
        assert_eq!(party.role_identifier(), Some("123-456-789"));
        assert_eq!(party.version(), 1);
    }

    #[test]
    fn exporter_registration_records_cargox_id() {
        let party = registered(PartyRole::ForeignExporter, Some("CX-9001"));
        assert_eq!(party.tax_id(), None);
        assert_eq!(party.cargox_id(), Some("CX-9001"));
    }

    #[test]
    fn broker_registers_without_identifier() {
        let party = registered(PartyRole::CustomsBroker, None);
        assert_eq!(party.role_identifier(), None);
    }

    #[test]
    fn blank_name_is_invalid_identity() {
        let party = Party::empty(test_party_id());
        let mut cmd = register_cmd(PartyRole::Importer, Some("123"));
        cmd.name = "   ".to_string();
        let err = party
            .handle(&PartyCommand::RegisterParty(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdentity(_)));
    }

    #[test]
    fn importer_without_tax_id_is_rejected() {
        let party = Party::empty(test_party_id());
        for identifier in [None, Some("  ")] {
            let err = party
                .handle(&PartyCommand::RegisterParty(register_cmd(
                    PartyRole::Importer,
                    identifier,
                )))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidIdentity(_)));
        }
    }

    #[test]
    fn exporter_without_cargox_id_is_rejected() {
        let party = Party::empty(test_party_id());
        let err = party
            .handle(&PartyCommand::RegisterParty(register_cmd(
                PartyRole::ForeignExporter,
                None,
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdentity(_)));
    }

    #[test]
    fn double_registration_conflicts() {
        let party = registered(PartyRole::Importer, Some("123"));
        let err = party
            .handle(&PartyCommand::RegisterParty(register_cmd(
                PartyRole::Importer,
                Some("123"),
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn credential_can_be_set_exactly_once() {
        let mut party = registered(PartyRole::Importer, Some("123"));

        let cmd = SetCredential {
            party_id: test_party_id(),
            secret: "s3cret-enough".to_string(),
            occurred_at: test_time(),
        };
        let events = party
            .handle(&PartyCommand::SetCredential(cmd.clone()))
            .unwrap();
        party.apply(&events[0]);
        assert!(party.has_credential());

        let err = party
            .handle(&PartyCommand::SetCredential(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn short_credential_is_rejected() {
        let party = registered(PartyRole::Importer, Some("123"));
        let err = party
            .handle(&PartyCommand::SetCredential(SetCredential {
                party_id: test_party_id(),
                secret: "abc".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn credential_before_registration_is_not_found() {
        let party = Party::empty(test_party_id());
        let err = party
            .handle(&PartyCommand::SetCredential(SetCredential {
                party_id: test_party_id(),
                secret: "s3cret-enough".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn registration_trims_name_and_identifier() {
        let mut party = Party::empty(test_party_id());
        let mut cmd = register_cmd(PartyRole::Importer, Some("  123-456  "));
        cmd.name = "  Delta Trading  ".to_string();
        let events = party
            .handle(&PartyCommand::RegisterParty(cmd))
            .unwrap();
        party.apply(&events[0]);
        assert_eq!(party.name(), "Delta Trading");
        assert_eq!(party.tax_id(), Some("123-456"));
    }
}
