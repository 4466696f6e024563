use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use aciport_core::{DomainError, DomainResult, ValueObject};

/// Fixed packaging-overhead factor applied when no gross weight is supplied:
/// gross weight = net weight × 1.10.
pub const GROSS_WEIGHT_FACTOR: Decimal = dec!(1.10);

/// One line item of a shipment's invoice.
///
/// Total value and gross weight are derived at construction and never
/// supplied directly; a line that fails validation is never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    hs_code: String,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    total_value: Decimal,
    net_weight: Decimal,
    gross_weight: Decimal,
}

impl InvoiceLine {
    /// Validate and construct a line, computing the derived fields.
    pub fn new(
        hs_code: &str,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        net_weight: Decimal,
    ) -> DomainResult<Self> {
        let hs_code = hs_code.trim();
        if hs_code.len() < 4 {
            return Err(DomainError::validation(format!(
                "HS code must be at least 4 characters (got '{hs_code}')"
            )));
        }

        if quantity <= Decimal::ZERO {
            return Err(DomainError::validation(
                "quantity must be greater than zero",
            ));
        }

        if unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit price cannot be negative"));
        }

        if net_weight < Decimal::ZERO {
            return Err(DomainError::validation("net weight cannot be negative"));
        }

        Ok(Self {
            hs_code: hs_code.to_string(),
            description: description.trim().to_string(),
            quantity,
            unit_price,
            total_value: quantity * unit_price,
            net_weight,
            gross_weight: net_weight * GROSS_WEIGHT_FACTOR,
        })
    }

    pub fn hs_code(&self) -> &str {
        &self.hs_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn net_weight(&self) -> Decimal {
        self.net_weight
    }

    pub fn gross_weight(&self) -> Decimal {
        self.gross_weight
    }
}

impl ValueObject for InvoiceLine {}
