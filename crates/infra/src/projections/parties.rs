use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use aciport_core::AggregateId;
use aciport_events::EventEnvelope;
use aciport_parties::{PartyEvent, PartyId, PartyRole};

use super::ProjectionError;
use crate::read_model::ReadModelStore;

/// Queryable party directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyRecord {
    pub party_id: PartyId,
    pub role: PartyRole,
    pub name: String,
    pub email: String,
    pub tax_id: Option<String>,
    pub cargox_id: Option<String>,
    pub has_credential: bool,
}

impl PartyRecord {
    /// Role-specific external identifier, when the role carries one.
    pub fn role_identifier(&self) -> Option<&str> {
        match self.role {
            PartyRole::Importer => self.tax_id.as_deref(),
            PartyRole::ForeignExporter => self.cargox_id.as_deref(),
            PartyRole::CustomsBroker => None,
        }
    }
}

/// Party directory projection.
///
/// Consumes published envelopes and maintains a read model for parties,
/// serving registration uniqueness checks and counterparty search.
#[derive(Debug)]
pub struct PartiesProjection<S>
where
    S: ReadModelStore<PartyId, PartyRecord>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> PartiesProjection<S>
where
    S: ReadModelStore<PartyId, PartyRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn advance_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    pub fn get(&self, party_id: &PartyId) -> Option<PartyRecord> {
        self.store.get(party_id)
    }

    pub fn list(&self) -> Vec<PartyRecord> {
        self.store.list()
    }

    pub fn list_by_role(&self, role: PartyRole) -> Vec<PartyRecord> {
        let mut records: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|rm| rm.role == role)
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    pub fn find_by_tax_id(&self, tax_id: &str) -> Option<PartyRecord> {
        self.store
            .list()
            .into_iter()
            .find(|rm| rm.tax_id.as_deref() == Some(tax_id))
    }

    pub fn find_by_cargox_id(&self, cargox_id: &str) -> Option<PartyRecord> {
        self.store
            .list()
            .into_iter()
            .find(|rm| rm.cargox_id.as_deref() == Some(cargox_id))
    }

    pub fn find_by_email(&self, email: &str) -> Option<PartyRecord> {
        let needle = email.to_lowercase();
        self.store
            .list()
            .into_iter()
            .find(|rm| rm.email.to_lowercase() == needle)
    }

    /// Case-insensitive substring search over name and role identifier,
    /// filtered by role, capped at `limit` results, ordered by name.
    pub fn search(&self, role: PartyRole, query: &str, limit: usize) -> Vec<PartyRecord> {
        let q = query.trim().to_lowercase();
        let mut matches: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|rm| rm.role == role)
            .filter(|rm| {
                q.is_empty()
                    || rm.name.to_lowercase().contains(&q)
                    || rm
                        .role_identifier()
                        .is_some_and(|id| id.to_lowercase().contains(&q))
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(limit);
        matches
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Ignores non-party aggregates (allows sharing a bus across modules).
    /// - Enforces monotonic sequence per aggregate stream.
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "parties.party" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }

        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: PartyEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let party_id = match &event {
            PartyEvent::PartyRegistered(e) => e.party_id,
            PartyEvent::CredentialSet(e) => e.party_id,
        };

        if AggregateId::from(party_id) != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event party_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            PartyEvent::PartyRegistered(e) => {
                self.store.upsert(
                    e.party_id,
                    PartyRecord {
                        party_id: e.party_id,
                        role: e.role,
                        name: e.name,
                        email: e.email,
                        tax_id: e.tax_id,
                        cargox_id: e.cargox_id,
                        has_credential: false,
                    },
                );
            }
            PartyEvent::CredentialSet(e) => {
                if let Some(mut rm) = self.store.get(&e.party_id) {
                    rm.has_credential = true;
                    self.store.upsert(e.party_id, rm);
                }
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        // Deterministic replay order: aggregate, then sequence.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (e.aggregate_id().value(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
