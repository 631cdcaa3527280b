use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

/// Default values for configuration options.
mod defaults {
    use jiff::SignedDuration;

    /// Default lifetime of a password-reset code (15 minutes).
    pub const RESET_CODE_TTL: SignedDuration = SignedDuration::from_mins(15);

    /// Required invitation code length.
    pub const INVITATION_CODE_LEN: usize = 8;
}

/// Account flow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// How long an issued reset code stays redeemable.
    #[serde(default = "AccountConfig::default_reset_code_ttl")]
    pub reset_code_ttl: SignedDuration,

    /// Exact length an invitation code must have.
    #[serde(default = "AccountConfig::default_invitation_code_len")]
    pub invitation_code_len: usize,
}

impl AccountConfig {
    fn default_reset_code_ttl() -> SignedDuration {
        defaults::RESET_CODE_TTL
    }

    fn default_invitation_code_len() -> usize {
        defaults::INVITATION_CODE_LEN
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            reset_code_ttl: defaults::RESET_CODE_TTL,
            invitation_code_len: defaults::INVITATION_CODE_LEN,
        }
    }
}
