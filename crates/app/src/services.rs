use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use aciport_core::{DomainError, ExpectedVersion};
use aciport_events::{EventEnvelope, InMemoryEventBus};
use aciport_gate::{DocumentRef, GateError, IdentityGate, StubCargoXGate, Verification};
use aciport_ingestion::parse_invoice_grid;
use aciport_parties::{
    assign_roles, Party, PartyCommand, PartyId, PartyRole, RegisterParty, SetCredential,
};
use aciport_shipments::{
    ApproveRequest, AttachLine, AttachLines, CancelRequest, CertificateNumber, InvoiceLine,
    OpenDraft, RecordDocsUploaded, RejectRequest, RequestId, ShipmentRequest,
    ShipmentRequestCommand, SubmitRequest,
};
use aciport_infra::{
    CommandDispatcher, DispatchError, EventStore, IdSequence, InMemoryEventStore, InMemoryStore,
    PartiesProjection, PartyRecord, RequestRecord, RequestsProjection, StoredEvent,
};

use crate::actor::Actor;
use crate::views::{CertificateCheck, IngestionOutcome, LineSummary, RequestSummary};

const PARTY_AGGREGATE: &str = "parties.party";
const REQUEST_AGGREGATE: &str = "shipments.request";
const SEARCH_LIMIT: usize = 10;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type PartiesView = PartiesProjection<Arc<InMemoryStore<PartyId, PartyRecord>>>;
type RequestsView = RequestsProjection<Arc<InMemoryStore<RequestId, RequestRecord>>>;

/// The wired application: dispatcher, projections, gate, id allocation.
///
/// Projections are applied synchronously from the committed events of each
/// dispatch, so reads issued after a successful call observe that call's
/// writes. The bus additionally publishes every committed event for external
/// consumers (at-least-once).
pub struct AppServices {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    event_store: Arc<InMemoryEventStore>,
    event_bus: Bus,
    parties: PartiesView,
    requests: RequestsView,
    gate: Arc<dyn IdentityGate>,
    party_ids: IdSequence,
    request_ids: IdSequence,
}

impl AppServices {
    /// Fully in-memory wiring with the stub gate. Tests and dev.
    pub fn in_memory() -> Self {
        Self::with_gate(Arc::new(StubCargoXGate::new()))
    }

    /// In-memory wiring with a caller-supplied gate implementation.
    pub fn with_gate(gate: Arc<dyn IdentityGate>) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        Self {
            dispatcher: CommandDispatcher::new(store.clone(), bus.clone()),
            event_store: store,
            event_bus: bus,
            parties: PartiesProjection::new(Arc::new(InMemoryStore::new())),
            requests: RequestsProjection::new(Arc::new(InMemoryStore::new())),
            gate,
            party_ids: IdSequence::starting_at(1),
            request_ids: IdSequence::starting_at(1),
        }
    }

    pub fn event_bus(&self) -> &Bus {
        &self.event_bus
    }

    pub fn parties(&self) -> &PartiesView {
        &self.parties
    }

    pub fn requests(&self) -> &RequestsView {
        &self.requests
    }

    /// Current stream version of a request, for building version tokens.
    pub fn request_version(&self, request_id: RequestId) -> Result<u64, DispatchError> {
        let stream = self.event_store.load_stream(request_id.into())?;
        Ok(stream.last().map(|e| e.sequence_number).unwrap_or(0))
    }

    // ---- party directory ----

    /// Register a new party and return its id.
    pub fn register_party(
        &self,
        name: &str,
        role: PartyRole,
        email: &str,
        role_identifier: Option<&str>,
    ) -> Result<PartyId, DispatchError> {
        // Uniqueness is checked against the directory read model before the
        // command runs; the aggregate only knows its own stream.
        if role == PartyRole::Importer {
            if let Some(tax_id) = role_identifier {
                if self.parties.find_by_tax_id(tax_id.trim()).is_some() {
                    return Err(DomainError::duplicate_identity(format!(
                        "tax id '{}' is already registered",
                        tax_id.trim()
                    ))
                    .into());
                }
            }
        }
        if self.parties.find_by_email(email).is_some() {
            return Err(
                DomainError::duplicate_identity(format!("email '{email}' is already registered"))
                    .into(),
            );
        }

        let party_id = PartyId::new(self.party_ids.next_id());
        let committed = self.dispatcher.dispatch(
            party_id.into(),
            PARTY_AGGREGATE,
            ExpectedVersion::Exact(0),
            PartyCommand::RegisterParty(RegisterParty {
                party_id,
                name: name.to_string(),
                role,
                email: email.to_string(),
                role_identifier: role_identifier.map(str::to_string),
                occurred_at: Utc::now(),
            }),
            |id| Party::empty(PartyId::new(id)),
        )?;
        self.project(&committed);

        info!(party_id = party_id.value(), ?role, "party registered");
        Ok(party_id)
    }

    /// Set the party's credential secret. Allowed exactly once.
    pub fn set_credential(&self, party_id: PartyId, secret: &str) -> Result<(), DispatchError> {
        let committed = self.dispatcher.dispatch(
            party_id.into(),
            PARTY_AGGREGATE,
            ExpectedVersion::Any,
            PartyCommand::SetCredential(SetCredential {
                party_id,
                secret: secret.to_string(),
                occurred_at: Utc::now(),
            }),
            |id| Party::empty(PartyId::new(id)),
        )?;
        self.project(&committed);
        Ok(())
    }

    pub fn search_exporters(&self, query: &str) -> Vec<PartyRecord> {
        self.parties
            .search(PartyRole::ForeignExporter, query, SEARCH_LIMIT)
    }

    pub fn search_importers(&self, query: &str) -> Vec<PartyRecord> {
        self.parties.search(PartyRole::Importer, query, SEARCH_LIMIT)
    }

    // ---- shipment request lifecycle ----

    /// Open a new draft request between the actor and a counterparty.
    ///
    /// The exporter's platform identity is checked through the gate unless
    /// the exporter is the actor (a party does not verify itself) or carries
    /// no platform identifier.
    pub fn open_draft(
        &self,
        actor: &Actor,
        counterparty: PartyId,
    ) -> Result<RequestId, DispatchError> {
        let assignment = assign_roles(actor.party_id, actor.role, counterparty)?;

        let importer = self
            .parties
            .get(&assignment.importer)
            .ok_or(DomainError::NotFound)?;
        let exporter = self
            .parties
            .get(&assignment.exporter)
            .ok_or(DomainError::NotFound)?;

        if importer.role != PartyRole::Importer {
            return Err(DomainError::validation(
                "the importer side of a request must be a registered importer",
            )
            .into());
        }
        if exporter.role != PartyRole::ForeignExporter {
            return Err(DomainError::validation(
                "the exporter side of a request must be a registered foreign exporter",
            )
            .into());
        }

        if exporter.party_id != actor.party_id {
            if let Some(cargox_id) = exporter.cargox_id.as_deref().filter(|id| !id.is_empty()) {
                match self.gate.validate_exporter_identity(cargox_id) {
                    Verification::Verified => {}
                    Verification::Denied => {
                        return Err(
                            DomainError::UnverifiedCounterparty(cargox_id.to_string()).into()
                        );
                    }
                    Verification::Unavailable => {
                        warn!(cargox_id, "identity gate unavailable during draft open");
                        return Err(DomainError::CounterpartyUnavailable(
                            "identity gate did not answer".to_string(),
                        )
                        .into());
                    }
                }
            }
        }

        let request_id = RequestId::new(self.request_ids.next_id());
        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            ExpectedVersion::Exact(0),
            ShipmentRequestCommand::OpenDraft(OpenDraft {
                request_id,
                importer: assignment.importer,
                exporter: assignment.exporter,
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(
            request_id = request_id.value(),
            importer = assignment.importer.value(),
            exporter = assignment.exporter.value(),
            "draft opened"
        );
        Ok(request_id)
    }

    /// Attach a single invoice line to a draft.
    pub fn attach_item(
        &self,
        actor: &Actor,
        request_id: RequestId,
        expected: ExpectedVersion,
        hs_code: &str,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        net_weight: Decimal,
    ) -> Result<(), DispatchError> {
        self.ensure_involved(actor, request_id)?;

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::AttachLine(AttachLine {
                request_id,
                hs_code: hs_code.to_string(),
                description: description.to_string(),
                quantity,
                unit_price,
                net_weight,
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);
        Ok(())
    }

    /// Ingest a decoded invoice grid and attach the valid lines as one batch.
    ///
    /// Partial success is success: the outcome carries the committed lines
    /// and every rejected row. Only a grid with zero usable rows fails.
    pub fn ingest_invoice(
        &self,
        actor: &Actor,
        request_id: RequestId,
        expected: ExpectedVersion,
        grid: &[Vec<String>],
    ) -> Result<IngestionOutcome, DispatchError> {
        self.ensure_involved(actor, request_id)?;

        let report = parse_invoice_grid(grid).map_err(DispatchError::Domain)?;

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::AttachLines(AttachLines {
                request_id,
                lines: report.lines.clone(),
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(
            request_id = request_id.value(),
            attached = report.lines.len(),
            rejected = report.row_errors.len(),
            "invoice grid ingested"
        );

        Ok(IngestionOutcome {
            total_value: report.total_value(),
            attached: report.lines.iter().map(line_summary).collect(),
            row_errors: report.row_errors,
        })
    }

    /// Submit a draft for processing. Importer or exporter only.
    pub fn submit(
        &self,
        actor: &Actor,
        request_id: RequestId,
        expected: ExpectedVersion,
    ) -> Result<(), DispatchError> {
        self.ensure_involved(actor, request_id)?;

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::SubmitRequest(SubmitRequest {
                request_id,
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(request_id = request_id.value(), "request submitted");
        Ok(())
    }

    /// Push shipment documents to the external platform and record the fact.
    pub fn record_docs_uploaded(
        &self,
        actor: &Actor,
        request_id: RequestId,
        expected: ExpectedVersion,
        document: &[u8],
        filename: &str,
    ) -> Result<DocumentRef, DispatchError> {
        self.ensure_involved(actor, request_id)?;

        let document_ref = self
            .gate
            .upload_document(document, filename)
            .map_err(|err| match err {
                GateError::Rejected(msg) => {
                    DispatchError::Domain(DomainError::validation(msg))
                }
                GateError::Unavailable(msg) => {
                    DispatchError::Domain(DomainError::CounterpartyUnavailable(msg))
                }
            })?;

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::RecordDocsUploaded(RecordDocsUploaded {
                request_id,
                document_ref: document_ref.as_str().to_string(),
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(
            request_id = request_id.value(),
            document_ref = document_ref.as_str(),
            "shipment documents recorded"
        );
        Ok(document_ref)
    }

    /// Approve a request, issuing its certificate. Platform action.
    pub fn approve(
        &self,
        request_id: RequestId,
        expected: ExpectedVersion,
    ) -> Result<CertificateNumber, DispatchError> {
        let occurred_at = Utc::now();
        let certificate = CertificateNumber::issue(occurred_at.year(), request_id);

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::ApproveRequest(ApproveRequest {
                request_id,
                certificate_number: certificate.clone(),
                occurred_at,
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(
            request_id = request_id.value(),
            certificate = certificate.as_str(),
            "request approved"
        );
        Ok(certificate)
    }

    /// Reject a request with an optional reason. Platform action.
    pub fn reject(
        &self,
        request_id: RequestId,
        reason: Option<&str>,
        expected: ExpectedVersion,
    ) -> Result<(), DispatchError> {
        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::RejectRequest(RejectRequest {
                request_id,
                reason: reason.map(str::to_string),
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(request_id = request_id.value(), "request rejected");
        Ok(())
    }

    /// Cancel a pre-approval request. Importer or exporter only.
    pub fn cancel(
        &self,
        actor: &Actor,
        request_id: RequestId,
        expected: ExpectedVersion,
    ) -> Result<(), DispatchError> {
        self.ensure_involved(actor, request_id)?;

        let committed = self.dispatcher.dispatch(
            request_id.into(),
            REQUEST_AGGREGATE,
            expected,
            ShipmentRequestCommand::CancelRequest(CancelRequest {
                request_id,
                occurred_at: Utc::now(),
            }),
            |id| ShipmentRequest::empty(RequestId::new(id)),
        )?;
        self.project(&committed);

        info!(request_id = request_id.value(), "request cancelled");
        Ok(())
    }

    /// The actor's requests, newest first.
    pub fn list_requests_for(&self, actor: &Actor) -> Vec<RequestSummary> {
        self.requests
            .list_for(actor.party_id)
            .into_iter()
            .map(|record| RequestSummary {
                request_id: record.request_id,
                certificate_number: record
                    .certificate_number
                    .clone()
                    .unwrap_or_else(|| "---".to_string()),
                importer_name: self.party_name(record.importer),
                exporter_name: self.party_name(record.exporter),
                status: record.status,
                created_at: record.created_at,
                item_count: record.item_count,
            })
            .collect()
    }

    // ---- public certificate validation ----

    /// Public, unauthenticated certificate check. Never errors; a bad
    /// certificate or tax id is a negative answer, not a failure.
    pub fn validate_certificate(
        &self,
        certificate_number: &str,
        claimed_tax_id: &str,
    ) -> CertificateCheck {
        let Some(record) = self.requests.find_by_certificate(certificate_number.trim()) else {
            return CertificateCheck::invalid("certificate number does not exist");
        };

        let importer = self.parties.get(&record.importer);
        let importer_tax_id = importer.as_ref().and_then(|p| p.tax_id.as_deref());
        if importer_tax_id != Some(claimed_tax_id) {
            return CertificateCheck::invalid("importer tax id does not match this shipment");
        }

        CertificateCheck {
            valid: true,
            message: "shipment data is correct and active".to_string(),
            importer_name: importer.map(|p| p.name),
            exporter_name: self.parties.get(&record.exporter).map(|p| p.name),
            status: Some(record.status),
        }
    }

    // ---- internals ----

    fn party_name(&self, party_id: PartyId) -> String {
        self.parties
            .get(&party_id)
            .map(|p| p.name)
            .unwrap_or_else(|| format!("party {}", party_id.value()))
    }

    fn ensure_involved(
        &self,
        actor: &Actor,
        request_id: RequestId,
    ) -> Result<RequestRecord, DispatchError> {
        let record = self
            .requests
            .get(&request_id)
            .ok_or(DomainError::NotFound)?;
        if record.importer != actor.party_id && record.exporter != actor.party_id {
            return Err(DomainError::Forbidden.into());
        }
        Ok(record)
    }

    /// Apply committed events to the read models.
    ///
    /// The events are already durable; a projection failure here is an infra
    /// bug, logged and left to a rebuild rather than failing the call.
    fn project(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let envelope = stored.to_envelope();
            if let Err(err) = self.parties.apply_envelope(&envelope) {
                error!(?err, "party projection failed to apply envelope");
            }
            if let Err(err) = self.requests.apply_envelope(&envelope) {
                error!(?err, "requests projection failed to apply envelope");
            }
        }
    }
}

fn line_summary(line: &InvoiceLine) -> LineSummary {
    LineSummary {
        hs_code: line.hs_code().to_string(),
        description: line.description().to_string(),
        quantity: line.quantity(),
        total_value: line.total_value(),
    }
}
