//! `aciport-parties`: registered trade parties and role assignment.
//!
//! A party is an importer, a foreign exporter, or a customs broker. Importers
//! carry a tax id, foreign exporters a CargoX id; the identifier is validated
//! at registration and immutable afterwards.

pub mod party;
pub mod roles;

pub use party::{
    CredentialSet, Party, PartyCommand, PartyEvent, PartyId, PartyRegistered, PartyRole,
    RegisterParty, SetCredential, MIN_CREDENTIAL_LEN,
};
pub use roles::{assign_roles, RoleAssignment};
