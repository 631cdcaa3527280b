//! Identity handle shared across the credential and authorization engines.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque numeric identity handle.
///
/// Identities are owned by the external user store; the engines only reference
/// them. The zero value is never a valid identity and every operation that
/// accepts a [`UserId`] rejects it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a new identity handle from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` if this handle may refer to an identity (nonzero).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}
