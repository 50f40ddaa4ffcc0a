//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an account.
///
/// Ids are handed out sequentially by the registry starting at zero, so an
/// id doubles as the account's position in creation order. The derived
/// `Ord` is the global lock order used by transfers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u32);

impl AccountId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Position of this account in the registry's sequence.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for AccountId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<AccountId> for u32 {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl FromStr for AccountId {
    type Err = DomainError;

    /// Parses an unsigned decimal id. Signs are rejected, including `+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!("AccountId: '{s}' is not an unsigned integer")));
        }
        let raw = s
            .parse::<u32>()
            .map_err(|e| DomainError::invalid_id(format!("AccountId: {e}")))?;
        Ok(Self(raw))
    }
}
