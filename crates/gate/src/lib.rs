//! `aciport-gate`: the external identity gate contract.
//!
//! The national single-window platform defers exporter identity checks to an
//! external blockchain document platform (CargoX). That system is outside our
//! control: calls block, may be slow, and carry no availability guarantee.
//! The contract therefore distinguishes an authoritative denial from a mere
//! outage, and callers decide which failures are retryable.

pub mod identity;
pub mod stub;

pub use identity::{DocumentRef, GateError, IdentityGate, Verification};
pub use stub::{StubCargoXGate, UnavailableGate};
