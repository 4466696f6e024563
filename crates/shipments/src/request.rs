use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aciport_core::{impl_id_newtype, Aggregate, AggregateId, AggregateRoot, DomainError};
use aciport_events::Event;
use aciport_parties::PartyId;

use crate::certificate::{CertificateNumber, CERTIFICATE_VALIDITY_MONTHS};
use crate::invoice_line::InvoiceLine;

/// Shipment request identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub AggregateId);

impl_id_newtype!(RequestId, "RequestId");

/// Shipment request status lifecycle.
///
/// `Rejected` and `Cancelled` are reachable only through the explicit
/// `RejectRequest` / `CancelRequest` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    DocsUploaded,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RequestStatus::Draft => "Draft",
            RequestStatus::Submitted => "Submitted",
            RequestStatus::DocsUploaded => "DocsUploaded",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Aggregate root: ShipmentRequest (ACI declaration).
///
/// Importer and exporter are fixed at creation. Invoice lines may only be
/// attached while the request is a draft. The certificate number is set
/// exactly once, at approval, and never reassigned. Requests are never
/// deleted (audit record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRequest {
    id: RequestId,
    importer: Option<PartyId>,
    exporter: Option<PartyId>,
    status: RequestStatus,
    certificate: Option<CertificateNumber>,
    expires_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    lines: Vec<InvoiceLine>,
    version: u64,
    created: bool,
}

impl ShipmentRequest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RequestId) -> Self {
        Self {
            id,
            importer: None,
            exporter: None,
            status: RequestStatus::Draft,
            certificate: None,
            expires_at: None,
            created_at: None,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RequestId {
        self.id
    }

    pub fn importer(&self) -> Option<PartyId> {
        self.importer
    }

    pub fn exporter(&self) -> Option<PartyId> {
        self.exporter
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn certificate(&self) -> Option<&CertificateNumber> {
        self.certificate.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn total_value(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::total_value).sum()
    }

    /// Whether the given party is a side of this request.
    pub fn involves(&self, party: PartyId) -> bool {
        self.importer == Some(party) || self.exporter == Some(party)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, RequestStatus::Draft)
    }

    pub fn is_approvable(&self) -> bool {
        matches!(
            self.status,
            RequestStatus::Submitted | RequestStatus::DocsUploaded
        )
    }
}

impl AggregateRoot for ShipmentRequest {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenDraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDraft {
    pub request_id: RequestId,
    pub importer: PartyId,
    pub exporter: PartyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachLine (single direct attach).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachLine {
    pub request_id: RequestId,
    pub hs_code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub net_weight: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachLines (atomic batch from ingestion; lines are already
/// validated value objects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachLines {
    pub request_id: RequestId,
    pub lines: Vec<InvoiceLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDocsUploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDocsUploaded {
    pub request_id: RequestId,
    /// Opaque reference returned by the external gate's document upload.
    pub document_ref: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub request_id: RequestId,
    pub certificate_number: CertificateNumber,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    pub request_id: RequestId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentRequestCommand {
    OpenDraft(OpenDraft),
    AttachLine(AttachLine),
    AttachLines(AttachLines),
    SubmitRequest(SubmitRequest),
    RecordDocsUploaded(RecordDocsUploaded),
    ApproveRequest(ApproveRequest),
    RejectRequest(RejectRequest),
    CancelRequest(CancelRequest),
}

/// Event: DraftOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOpened {
    pub request_id: RequestId,
    pub importer: PartyId,
    pub exporter: PartyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAttached {
    pub request_id: RequestId,
    pub line: InvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmitted {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocsUploadRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsUploadRecorded {
    pub request_id: RequestId,
    pub document_ref: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestApproved {
    pub request_id: RequestId,
    pub certificate_number: CertificateNumber,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRejected {
    pub request_id: RequestId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelled {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentRequestEvent {
    DraftOpened(DraftOpened),
    LineAttached(LineAttached),
    RequestSubmitted(RequestSubmitted),
    DocsUploadRecorded(DocsUploadRecorded),
    RequestApproved(RequestApproved),
    RequestRejected(RequestRejected),
    RequestCancelled(RequestCancelled),
}

impl Event for ShipmentRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentRequestEvent::DraftOpened(_) => "shipments.request.draft_opened",
            ShipmentRequestEvent::LineAttached(_) => "shipments.request.line_attached",
            ShipmentRequestEvent::RequestSubmitted(_) => "shipments.request.submitted",
            ShipmentRequestEvent::DocsUploadRecorded(_) => "shipments.request.docs_uploaded",
            ShipmentRequestEvent::RequestApproved(_) => "shipments.request.approved",
            ShipmentRequestEvent::RequestRejected(_) => "shipments.request.rejected",
            ShipmentRequestEvent::RequestCancelled(_) => "shipments.request.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentRequestEvent::DraftOpened(e) => e.occurred_at,
            ShipmentRequestEvent::LineAttached(e) => e.occurred_at,
            ShipmentRequestEvent::RequestSubmitted(e) => e.occurred_at,
            ShipmentRequestEvent::DocsUploadRecorded(e) => e.occurred_at,
            ShipmentRequestEvent::RequestApproved(e) => e.occurred_at,
            ShipmentRequestEvent::RequestRejected(e) => e.occurred_at,
            ShipmentRequestEvent::RequestCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ShipmentRequest {
    type Command = ShipmentRequestCommand;
    type Event = ShipmentRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentRequestEvent::DraftOpened(e) => {
                self.id = e.request_id;
                self.importer = Some(e.importer);
                self.exporter = Some(e.exporter);
                self.status = RequestStatus::Draft;
                self.created_at = Some(e.occurred_at);
                self.lines.clear();
                self.created = true;
            }
            ShipmentRequestEvent::LineAttached(e) => {
                self.lines.push(e.line.clone());
            }
            ShipmentRequestEvent::RequestSubmitted(_) => {
                self.status = RequestStatus::Submitted;
            }
            ShipmentRequestEvent::DocsUploadRecorded(_) => {
                self.status = RequestStatus::DocsUploaded;
            }
            ShipmentRequestEvent::RequestApproved(e) => {
                self.status = RequestStatus::Approved;
                self.certificate = Some(e.certificate_number.clone());
                self.expires_at = Some(e.expires_at);
            }
            ShipmentRequestEvent::RequestRejected(_) => {
                self.status = RequestStatus::Rejected;
            }
            ShipmentRequestEvent::RequestCancelled(_) => {
                self.status = RequestStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentRequestCommand::OpenDraft(cmd) => self.handle_open(cmd),
            ShipmentRequestCommand::AttachLine(cmd) => self.handle_attach_line(cmd),
            ShipmentRequestCommand::AttachLines(cmd) => self.handle_attach_lines(cmd),
            ShipmentRequestCommand::SubmitRequest(cmd) => self.handle_submit(cmd),
            ShipmentRequestCommand::RecordDocsUploaded(cmd) => self.handle_docs_uploaded(cmd),
            ShipmentRequestCommand::ApproveRequest(cmd) => self.handle_approve(cmd),
            ShipmentRequestCommand::RejectRequest(cmd) => self.handle_reject(cmd),
            ShipmentRequestCommand::CancelRequest(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ShipmentRequest {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_request_id(&self, request_id: RequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invalid_state(format!(
                "invoice lines can only be attached while the request is a draft (status: {})",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenDraft) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("shipment request already exists"));
        }

        Ok(vec![ShipmentRequestEvent::DraftOpened(DraftOpened {
            request_id: cmd.request_id,
            importer: cmd.importer,
            exporter: cmd.exporter,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_line(
        &self,
        cmd: &AttachLine,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_draft()?;

        let line = InvoiceLine::new(
            &cmd.hs_code,
            &cmd.description,
            cmd.quantity,
            cmd.unit_price,
            cmd.net_weight,
        )?;

        Ok(vec![ShipmentRequestEvent::LineAttached(LineAttached {
            request_id: cmd.request_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_lines(
        &self,
        cmd: &AttachLines,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_draft()?;

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("line batch is empty"));
        }

        Ok(cmd
            .lines
            .iter()
            .map(|line| {
                ShipmentRequestEvent::LineAttached(LineAttached {
                    request_id: cmd.request_id,
                    line: line.clone(),
                    occurred_at: cmd.occurred_at,
                })
            })
            .collect())
    }

    fn handle_submit(
        &self,
        cmd: &SubmitRequest,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        if self.lines.is_empty() {
            return Err(DomainError::EmptyShipment);
        }

        if self.status != RequestStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "request is already {}; it cannot be submitted again",
                self.status
            )));
        }

        Ok(vec![ShipmentRequestEvent::RequestSubmitted(
            RequestSubmitted {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_docs_uploaded(
        &self,
        cmd: &RecordDocsUploaded,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        if self.status != RequestStatus::Submitted {
            return Err(DomainError::invalid_state(format!(
                "documents can only be recorded on a submitted request (status: {})",
                self.status
            )));
        }

        Ok(vec![ShipmentRequestEvent::DocsUploadRecorded(
            DocsUploadRecorded {
                request_id: cmd.request_id,
                document_ref: cmd.document_ref.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_approve(
        &self,
        cmd: &ApproveRequest,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        if !self.is_approvable() {
            return Err(DomainError::invalid_state(format!(
                "only submitted or docs-uploaded requests can be approved (status: {})",
                self.status
            )));
        }

        let expires_at = cmd
            .occurred_at
            .checked_add_months(Months::new(CERTIFICATE_VALIDITY_MONTHS))
            .ok_or_else(|| DomainError::validation("certificate expiry out of range"))?;

        Ok(vec![ShipmentRequestEvent::RequestApproved(
            RequestApproved {
                request_id: cmd.request_id,
                certificate_number: cmd.certificate_number.clone(),
                expires_at,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reject(
        &self,
        cmd: &RejectRequest,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        if !self.is_approvable() {
            return Err(DomainError::invalid_state(format!(
                "only submitted or docs-uploaded requests can be rejected (status: {})",
                self.status
            )));
        }

        Ok(vec![ShipmentRequestEvent::RequestRejected(
            RequestRejected {
                request_id: cmd.request_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelRequest,
    ) -> Result<Vec<ShipmentRequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "a {} request cannot be cancelled",
                self.status
            )));
        }

        Ok(vec![ShipmentRequestEvent::RequestCancelled(
            RequestCancelled {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_request_id() -> RequestId {
        RequestId::from_u64(7)
    }

    fn importer() -> PartyId {
        PartyId::from_u64(1)
    }

    fn exporter() -> PartyId {
        PartyId::from_u64(2)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn drive(request: &mut ShipmentRequest, cmd: ShipmentRequestCommand) {
        let events = request.handle(&cmd).unwrap();
        for event in &events {
            request.apply(event);
        }
    }

    fn draft() -> ShipmentRequest {
        let mut request = ShipmentRequest::empty(test_request_id());
        drive(
            &mut request,
            ShipmentRequestCommand::OpenDraft(OpenDraft {
                request_id: test_request_id(),
                importer: importer(),
                exporter: exporter(),
                occurred_at: test_time(),
            }),
        );
        request
    }

    fn attach_cmd() -> ShipmentRequestCommand {
        ShipmentRequestCommand::AttachLine(AttachLine {
            request_id: test_request_id(),
            hs_code: "851713".to_string(),
            description: "Smartphones".to_string(),
            quantity: dec!(2),
            unit_price: dec!(100),
            net_weight: dec!(5),
            occurred_at: test_time(),
        })
    }

    fn submitted() -> ShipmentRequest {
        let mut request = draft();
        drive(&mut request, attach_cmd());
        drive(
            &mut request,
            ShipmentRequestCommand::SubmitRequest(SubmitRequest {
                request_id: test_request_id(),
                occurred_at: test_time(),
            }),
        );
        request
    }

    fn approve_cmd(at: DateTime<Utc>) -> ShipmentRequestCommand {
        ShipmentRequestCommand::ApproveRequest(ApproveRequest {
            request_id: test_request_id(),
            certificate_number: CertificateNumber::issue(2025, test_request_id()),
            occurred_at: at,
        })
    }

    #[test]
    fn open_draft_fixes_both_parties() {
        let request = draft();
        assert_eq!(request.status(), RequestStatus::Draft);
        assert_eq!(request.importer(), Some(importer()));
        assert_eq!(request.exporter(), Some(exporter()));
        assert!(request.involves(importer()));
        assert!(request.involves(exporter()));
        assert!(!request.involves(PartyId::from_u64(99)));
    }

    #[test]
    fn reopening_an_existing_request_conflicts() {
        let request = draft();
        let err = request
            .handle(&ShipmentRequestCommand::OpenDraft(OpenDraft {
                request_id: test_request_id(),
                importer: importer(),
                exporter: exporter(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn full_lifecycle_draft_to_approved() {
        let mut request = draft();

        drive(&mut request, attach_cmd());
        assert_eq!(request.lines().len(), 1);
        assert_eq!(request.lines()[0].total_value(), dec!(200));
        assert_eq!(request.lines()[0].gross_weight(), dec!(5.5));

        drive(
            &mut request,
            ShipmentRequestCommand::SubmitRequest(SubmitRequest {
                request_id: test_request_id(),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(request.status(), RequestStatus::Submitted);

        let approved_at = test_time();
        drive(&mut request, approve_cmd(approved_at));
        assert_eq!(request.status(), RequestStatus::Approved);
        assert_eq!(
            request.certificate().map(CertificateNumber::as_str),
            Some("2025-EG-000000000007")
        );
        assert_eq!(
            request.expires_at(),
            approved_at.checked_add_months(Months::new(6))
        );
    }

    #[test]
    fn attach_fails_for_every_non_draft_status() {
        // Submitted
        let request = submitted();
        let err = request.handle(&attach_cmd()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(request.lines().len(), 1);

        // DocsUploaded
        let mut request = submitted();
        drive(
            &mut request,
            ShipmentRequestCommand::RecordDocsUploaded(RecordDocsUploaded {
                request_id: test_request_id(),
                document_ref: "HASH-1234".to_string(),
                occurred_at: test_time(),
            }),
        );
        assert!(request.handle(&attach_cmd()).is_err());

        // Approved
        drive(&mut request, approve_cmd(test_time()));
        assert!(request.handle(&attach_cmd()).is_err());

        // Rejected
        let mut request = submitted();
        drive(
            &mut request,
            ShipmentRequestCommand::RejectRequest(RejectRequest {
                request_id: test_request_id(),
                reason: Some("high-risk origin".to_string()),
                occurred_at: test_time(),
            }),
        );
        assert!(request.handle(&attach_cmd()).is_err());

        // Cancelled
        let mut request = draft();
        drive(
            &mut request,
            ShipmentRequestCommand::CancelRequest(CancelRequest {
                request_id: test_request_id(),
                occurred_at: test_time(),
            }),
        );
        assert!(request.handle(&attach_cmd()).is_err());
    }

    #[test]
    fn submit_of_empty_shipment_is_rejected() {
        let request = draft();
        let err = request
            .handle(&ShipmentRequestCommand::SubmitRequest(SubmitRequest {
                request_id: test_request_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::EmptyShipment);
    }

    #[test]
    fn submit_twice_is_invalid_state() {
        let request = submitted();
        let err = request
            .handle(&ShipmentRequestCommand::SubmitRequest(SubmitRequest {
                request_id: test_request_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn approve_requires_submission() {
        let mut request = draft();
        drive(&mut request, attach_cmd());
        let err = request.handle(&approve_cmd(test_time())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn approve_after_docs_uploaded_is_allowed() {
        let mut request = submitted();
        drive(
            &mut request,
            ShipmentRequestCommand::RecordDocsUploaded(RecordDocsUploaded {
                request_id: test_request_id(),
                document_ref: "HASH-abcd".to_string(),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(request.status(), RequestStatus::DocsUploaded);

        drive(&mut request, approve_cmd(test_time()));
        assert_eq!(request.status(), RequestStatus::Approved);
    }

    #[test]
    fn second_approve_fails_and_keeps_first_certificate() {
        let mut request = submitted();
        drive(&mut request, approve_cmd(test_time()));
        let first = request.certificate().cloned();

        let err = request
            .handle(&ShipmentRequestCommand::ApproveRequest(ApproveRequest {
                request_id: test_request_id(),
                certificate_number: CertificateNumber::issue(2026, test_request_id()),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(request.certificate().cloned(), first);
    }

    #[test]
    fn docs_upload_requires_submitted() {
        let request = draft();
        let err = request
            .handle(&ShipmentRequestCommand::RecordDocsUploaded(
                RecordDocsUploaded {
                    request_id: test_request_id(),
                    document_ref: "HASH-0".to_string(),
                    occurred_at: test_time(),
                },
            ))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn reject_requires_submission_and_is_terminal() {
        let request = draft();
        let reject = ShipmentRequestCommand::RejectRequest(RejectRequest {
            request_id: test_request_id(),
            reason: None,
            occurred_at: test_time(),
        });
        assert!(request.handle(&reject).is_err());

        let mut request = submitted();
        drive(&mut request, reject.clone());
        assert_eq!(request.status(), RequestStatus::Rejected);
        assert!(request.handle(&reject).is_err());
    }

    #[test]
    fn cancel_is_allowed_from_all_pre_approval_states() {
        let cancel = ShipmentRequestCommand::CancelRequest(CancelRequest {
            request_id: test_request_id(),
            occurred_at: test_time(),
        });

        let mut request = draft();
        drive(&mut request, cancel.clone());
        assert_eq!(request.status(), RequestStatus::Cancelled);

        let mut request = submitted();
        drive(&mut request, cancel.clone());
        assert_eq!(request.status(), RequestStatus::Cancelled);

        let mut request = submitted();
        drive(&mut request, approve_cmd(test_time()));
        assert!(request.handle(&cancel).is_err());
    }

    #[test]
    fn batch_attach_emits_one_event_per_line_atomically() {
        let request = draft();
        let lines = vec![
            InvoiceLine::new("851713", "Phones", dec!(2), dec!(100), dec!(5)).unwrap(),
            InvoiceLine::new("640399", "Shoes", dec!(10), dec!(25), dec!(8)).unwrap(),
        ];
        let events = request
            .handle(&ShipmentRequestCommand::AttachLines(AttachLines {
                request_id: test_request_id(),
                lines,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 2);

        let mut request = request;
        for event in &events {
            request.apply(event);
        }
        assert_eq!(request.lines().len(), 2);
        assert_eq!(request.total_value(), dec!(450));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let request = draft();
        let before = request.clone();
        let _ = request.handle(&attach_cmd()).unwrap();
        assert_eq!(request, before);
    }

    #[test]
    fn version_increments_once_per_applied_event() {
        let request = submitted();
        // DraftOpened + LineAttached + RequestSubmitted
        assert_eq!(request.version(), 3);
    }
}
