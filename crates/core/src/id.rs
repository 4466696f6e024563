//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are plain sequential numbers (certificate numbers embed the
//! zero-padded request id, so ids must be numeric). Allocation is the
//! infrastructure layer's job; domain code only carries them.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an aggregate root.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(u64);

impl AggregateId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for AggregateId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<AggregateId> for u64 {
    fn from(value: AggregateId) -> Self {
        value.0
    }
}

impl FromStr for AggregateId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = u64::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("AggregateId: {e}")))?;
        Ok(Self(value))
    }
}

/// Implements the standard conversions for a domain id newtype wrapping
/// [`AggregateId`]. Domain crates use this for their typed ids.
#[macro_export]
macro_rules! impl_id_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(id: $crate::AggregateId) -> Self {
                Self(id)
            }

            pub fn from_u64(value: u64) -> Self {
                Self($crate::AggregateId::new(value))
            }

            pub fn value(&self) -> u64 {
                self.0.value()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::AggregateId> for $t {
            fn from(value: $crate::AggregateId) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::AggregateId {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = s.parse::<$crate::AggregateId>().map_err(|_| {
                    $crate::DomainError::invalid_id(format!("{}: '{}'", $name, s))
                })?;
                Ok(Self(id))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ids() {
        let id: AggregateId = "42".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = "abc".parse::<AggregateId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}
