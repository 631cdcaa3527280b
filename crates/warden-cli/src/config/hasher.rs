//! Password hashing parameters.

use clap::Args;
use warden_password::{HasherConfig, PasswordHasher};

/// Argon2id parameters for the password commands.
///
/// Verification must use the parameters the hash was created with.
#[derive(Debug, Clone, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct HasherArgs {
    /// Iteration count (cost), clamped to 1..=32.
    #[arg(long, env = "WARDEN_HASH_COST", default_value_t = HasherConfig::default().iterations)]
    pub cost: u32,

    /// Memory cost in KiB.
    #[arg(long, env = "WARDEN_HASH_MEMORY_KIB", default_value_t = HasherConfig::default().memory_kib)]
    pub memory_kib: u32,
}

impl HasherArgs {
    /// Builds a hasher with these parameters.
    pub fn build(&self) -> PasswordHasher {
        PasswordHasher::new(HasherConfig {
            memory_kib: self.memory_kib,
            iterations: HasherConfig::clamp_cost(self.cost),
            ..HasherConfig::default()
        })
    }
}
