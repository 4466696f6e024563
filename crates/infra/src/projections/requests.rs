use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use aciport_core::AggregateId;
use aciport_events::EventEnvelope;
use aciport_parties::PartyId;
use aciport_shipments::{RequestId, RequestStatus, ShipmentRequestEvent};

use super::ProjectionError;
use crate::read_model::ReadModelStore;

/// Queryable shipment request record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub importer: PartyId,
    pub exporter: PartyId,
    pub status: RequestStatus,
    pub certificate_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    pub total_value: Decimal,
}

/// Shipment requests projection.
///
/// Maintains one record per request plus a certificate-number index for the
/// public validation lookup.
#[derive(Debug)]
pub struct RequestsProjection<S>
where
    S: ReadModelStore<RequestId, RequestRecord>,
{
    store: S,
    certificate_index: RwLock<HashMap<String, RequestId>>,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> RequestsProjection<S>
where
    S: ReadModelStore<RequestId, RequestRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            certificate_index: RwLock::new(HashMap::new()),
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

    pub fn get(&self, request_id: &RequestId) -> Option<RequestRecord> {
        self.store.get(request_id)
    }

    /// Requests where the given party is importer or exporter, newest first.
    pub fn list_for(&self, party_id: PartyId) -> Vec<RequestRecord> {
        let mut records: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|rm| rm.importer == party_id || rm.exporter == party_id)
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.request_id.value().cmp(&a.request_id.value()))
        });
        records
    }

    /// Certificate-number lookup for the public validation endpoint.
    pub fn find_by_certificate(&self, certificate_number: &str) -> Option<RequestRecord> {
        let request_id = {
            let index = self.certificate_index.read().ok()?;
            *index.get(certificate_number)?
        };
        self.store.get(&request_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "shipments.request" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            return Ok(());
        }

        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: ShipmentRequestEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let request_id = match &event {
            ShipmentRequestEvent::DraftOpened(e) => e.request_id,
            ShipmentRequestEvent::LineAttached(e) => e.request_id,
            ShipmentRequestEvent::RequestSubmitted(e) => e.request_id,
            ShipmentRequestEvent::DocsUploadRecorded(e) => e.request_id,
            ShipmentRequestEvent::RequestApproved(e) => e.request_id,
            ShipmentRequestEvent::RequestRejected(e) => e.request_id,
            ShipmentRequestEvent::RequestCancelled(e) => e.request_id,
        };

        if AggregateId::from(request_id) != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event request_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            ShipmentRequestEvent::DraftOpened(e) => {
                self.store.upsert(
                    e.request_id,
                    RequestRecord {
                        request_id: e.request_id,
                        importer: e.importer,
                        exporter: e.exporter,
                        status: RequestStatus::Draft,
                        certificate_number: None,
                        expires_at: None,
                        created_at: e.occurred_at,
                        item_count: 0,
                        total_value: Decimal::ZERO,
                    },
                );
            }
            ShipmentRequestEvent::LineAttached(e) => {
                if let Some(mut rm) = self.store.get(&e.request_id) {
                    rm.item_count += 1;
                    rm.total_value += e.line.total_value();
                    self.store.upsert(e.request_id, rm);
                }
            }
            ShipmentRequestEvent::RequestSubmitted(e) => {
                self.set_status(e.request_id, RequestStatus::Submitted);
            }
            ShipmentRequestEvent::DocsUploadRecorded(e) => {
                self.set_status(e.request_id, RequestStatus::DocsUploaded);
            }
            ShipmentRequestEvent::RequestApproved(e) => {
                if let Some(mut rm) = self.store.get(&e.request_id) {
                    rm.status = RequestStatus::Approved;
                    rm.certificate_number = Some(e.certificate_number.as_str().to_string());
                    rm.expires_at = Some(e.expires_at);
                    self.store.upsert(e.request_id, rm);
                }
                if let Ok(mut index) = self.certificate_index.write() {
                    index.insert(e.certificate_number.as_str().to_string(), e.request_id);
                }
            }
            ShipmentRequestEvent::RequestRejected(e) => {
                self.set_status(e.request_id, RequestStatus::Rejected);
            }
            ShipmentRequestEvent::RequestCancelled(e) => {
                self.set_status(e.request_id, RequestStatus::Cancelled);
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    fn set_status(&self, request_id: RequestId, status: RequestStatus) {
        if let Some(mut rm) = self.store.get(&request_id) {
            rm.status = status;
            self.store.upsert(request_id, rm);
        }
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.store.clear();
        if let Ok(mut index) = self.certificate_index.write() {
            index.clear();
        }
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (e.aggregate_id().value(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
