//! Password hashing and verification using Argon2id.
//!
//! Hashes are stored as `base64(salt)$base64(hash)` (standard alphabet, no
//! padding). The decoded salt segment starts with a fixed-size parameter
//! header followed by the random salt:
//!
//! ```text
//! [version: u8][memory_kib: u32 BE][iterations: u8][parallelism: u8][salt ...]
//! ```
//!
//! Verification derives with the parameters recorded in the header, so hashes
//! keep verifying after the hasher's cost changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use warden_core::CredentialHasher;

use crate::TRACING_TARGET_HASHER;
use crate::error::{PasswordError, Result};

/// Separator between the encoded salt and the encoded hash.
const SEPARATOR: char = '$';

/// Version byte of the parameter header.
const FORMAT_VERSION: u8 = 1;

/// Size of the parameter header in bytes.
const HEADER_LEN: usize = 7;

/// Largest memory cost accepted from a stored hash (1 GiB).
const MAX_STORED_MEMORY_KIB: u32 = 1024 * 1024;

/// Tunable Argon2id parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Iteration count, exposed as the hasher's cost.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
    /// Length of the derived hash in bytes.
    pub output_len: usize,
    /// Length of the random salt in bytes.
    pub salt_len: usize,
}

impl HasherConfig {
    /// Smallest accepted cost.
    pub const MIN_COST: u32 = 1;
    /// Largest accepted cost.
    pub const MAX_COST: u32 = 32;
    /// Smallest accepted salt length.
    pub const MIN_SALT_LEN: usize = 16;

    /// Clamps a requested cost into `[MIN_COST, MAX_COST]`.
    #[must_use]
    pub fn clamp_cost(cost: u32) -> u32 {
        cost.clamp(Self::MIN_COST, Self::MAX_COST)
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            output_len: 32,
            salt_len: Self::MIN_SALT_LEN,
        }
    }
}

#[derive(Debug)]
struct HasherInner {
    memory_kib: u32,
    parallelism: u32,
    output_len: usize,
    salt_len: usize,
    cost: AtomicU32,
}

/// Salts, hashes and verifies passwords with Argon2id.
///
/// Cheap to clone; clones share the cost setting.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    inner: Arc<HasherInner>,
}

impl PasswordHasher {
    /// Creates a hasher from the given configuration.
    ///
    /// The cost is clamped into the valid range and the salt length is raised
    /// to at least 16 bytes. Memory and parallelism are capped so that they fit
    /// the parameter header of the encoded hash.
    pub fn new(config: HasherConfig) -> Self {
        let inner = HasherInner {
            memory_kib: config.memory_kib.min(MAX_STORED_MEMORY_KIB),
            parallelism: config.parallelism.clamp(1, u32::from(u8::MAX)),
            output_len: config.output_len,
            salt_len: config.salt_len.max(HasherConfig::MIN_SALT_LEN),
            cost: AtomicU32::new(HasherConfig::clamp_cost(config.iterations)),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates a hasher with default parameters and the given cost.
    pub fn with_cost(cost: u32) -> Self {
        Self::new(HasherConfig {
            iterations: cost,
            ..HasherConfig::default()
        })
    }

    /// Returns the current cost (Argon2 iteration count).
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.inner.cost.load(Ordering::Relaxed)
    }

    /// Sets the cost, clamped into the valid range, and returns the applied value.
    pub fn set_cost(&self, cost: u32) -> u32 {
        let applied = HasherConfig::clamp_cost(cost);
        self.inner.cost.store(applied, Ordering::Relaxed);

        tracing::debug!(
            target: TRACING_TARGET_HASHER,
            requested = cost,
            applied,
            "hasher cost updated"
        );

        applied
    }

    /// Parameters new hashes are derived with.
    fn current_params(&self) -> HashParams {
        HashParams {
            memory_kib: self.inner.memory_kib,
            iterations: self.cost(),
            parallelism: self.inner.parallelism,
        }
    }

    /// Hashes a password with a freshly generated random salt.
    ///
    /// # Arguments
    ///
    /// * `password` - The plaintext password to hash
    ///
    /// # Returns
    ///
    /// The encoded hash. Its salt segment records the Argon2id parameters in
    /// effect at the time of the call.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::EmptyInput`] for an empty password and
    /// [`PasswordError::Hashing`] if the key-derivation function fails.
    ///
    /// # Security
    ///
    /// The salt is drawn from the thread-local CSPRNG for every call, so equal
    /// passwords never produce equal hashes.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(PasswordError::EmptyInput);
        }

        let params = self.current_params();
        let mut salt = vec![0_u8; self.inner.salt_len];
        rand::rng().fill_bytes(&mut salt);

        let mut hash = vec![0_u8; self.inner.output_len];
        params
            .argon2(self.inner.output_len)?
            .hash_password_into(password.as_bytes(), &salt, &mut hash)
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET_HASHER,
                    error = %e,
                    "password hashing operation failed"
                );
                PasswordError::Hashing(e)
            })?;

        Ok(encode(params, &salt, &hash))
    }

    /// Verifies a password against an encoded hash.
    ///
    /// Derivation uses the parameters recorded in the hash, not the hasher's
    /// current cost. The comparison runs in constant time with respect to the
    /// position of the first differing byte.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::InvalidHashFormat`] if the encoding is
    /// malformed and [`PasswordError::Hashing`] if derivation fails.
    pub fn try_verify(&self, password: &str, encoded: &str) -> Result<bool> {
        let decoded = decode(encoded)?;

        let mut computed = vec![0_u8; decoded.hash.len()];
        decoded
            .params
            .argon2(decoded.hash.len())?
            .hash_password_into(password.as_bytes(), &decoded.salt, &mut computed)?;

        Ok(computed.as_slice().ct_eq(decoded.hash.as_slice()).into())
    }

    /// Verifies a password against an encoded hash.
    ///
    /// # Arguments
    ///
    /// * `password` - The plaintext password to verify
    /// * `encoded` - A hash previously returned by [`hash_password`]
    ///
    /// # Returns
    ///
    /// `true` if the password matches. Malformed encodings and derivation
    /// failures yield `false`.
    ///
    /// # Security
    ///
    /// Hashes produced under an earlier cost still verify, since each one
    /// carries its own parameters. The final comparison is constant-time.
    ///
    /// [`hash_password`]: PasswordHasher::hash_password
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        match self.try_verify(password, encoded) {
            Ok(matches) => {
                tracing::debug!(
                    target: TRACING_TARGET_HASHER,
                    matches,
                    "password verification completed"
                );
                matches
            }
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_HASHER,
                    error = %e,
                    "password verification failed"
                );
                false
            }
        }
    }

    /// Performs a throwaway verification to keep timing uniform.
    ///
    /// Used when an account does not exist, so that lookups for unknown and
    /// known usernames take comparable time. Always returns `false`.
    pub fn verify_dummy_password(&self, password: &str) -> bool {
        let password_len = rand::random_range(16..32);
        let dummy_password: String = (0..password_len)
            .map(|_| rand::rng().sample(rand::distr::Alphanumeric) as char)
            .collect();

        if let Ok(dummy_hash) = self.hash_password(&dummy_password) {
            let _ = self.try_verify(password, &dummy_hash);
        }

        false
    }

    /// Returns `true` if the string decodes as `base64(salt)$base64(hash)`
    /// with a supported parameter header.
    #[must_use]
    pub fn is_well_formed(encoded: &str) -> bool {
        decode(encoded).is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HasherConfig::default())
    }
}

impl CredentialHasher for PasswordHasher {
    fn hash(&self, plaintext: &str) -> warden_core::Result<String> {
        Ok(self.hash_password(plaintext)?)
    }

    fn verify(&self, plaintext: &str, encoded: &str) -> bool {
        self.verify_password(plaintext, encoded)
    }
}

/// Argon2id parameters recorded in every encoded hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HashParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl HashParams {
    fn argon2(self, output_len: usize) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(output_len),
        )?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn header(self) -> [u8; HEADER_LEN] {
        let memory = self.memory_kib.to_be_bytes();
        [
            FORMAT_VERSION,
            memory[0],
            memory[1],
            memory[2],
            memory[3],
            u8::try_from(self.iterations).unwrap_or(u8::MAX),
            u8::try_from(self.parallelism).unwrap_or(u8::MAX),
        ]
    }

    fn from_header(header: &[u8]) -> Result<Self> {
        let &[version, m0, m1, m2, m3, iterations, parallelism] = header else {
            return Err(PasswordError::InvalidHashFormat);
        };

        let params = Self {
            memory_kib: u32::from_be_bytes([m0, m1, m2, m3]),
            iterations: u32::from(iterations),
            parallelism: u32::from(parallelism),
        };

        let supported = version == FORMAT_VERSION
            && params.memory_kib <= MAX_STORED_MEMORY_KIB
            && (HasherConfig::MIN_COST..=HasherConfig::MAX_COST).contains(&params.iterations)
            && params.parallelism > 0;

        if !supported {
            return Err(PasswordError::InvalidHashFormat);
        }

        Ok(params)
    }
}

#[derive(Debug)]
struct DecodedHash {
    params: HashParams,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn encode(params: HashParams, salt: &[u8], hash: &[u8]) -> String {
    let mut salt_segment = Vec::with_capacity(HEADER_LEN + salt.len());
    salt_segment.extend_from_slice(&params.header());
    salt_segment.extend_from_slice(salt);

    format!(
        "{}{SEPARATOR}{}",
        STANDARD_NO_PAD.encode(&salt_segment),
        STANDARD_NO_PAD.encode(hash)
    )
}

/// Splits and decodes an encoded hash into its parameters, salt and hash bytes.
fn decode(encoded: &str) -> Result<DecodedHash> {
    let (salt, hash) = encoded
        .split_once(SEPARATOR)
        .ok_or(PasswordError::InvalidHashFormat)?;

    if hash.contains(SEPARATOR) {
        return Err(PasswordError::InvalidHashFormat);
    }

    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| PasswordError::InvalidHashFormat)?;
    let hash = STANDARD_NO_PAD
        .decode(hash)
        .map_err(|_| PasswordError::InvalidHashFormat)?;

    if salt.len() <= HEADER_LEN || hash.is_empty() {
        return Err(PasswordError::InvalidHashFormat);
    }

    let (header, salt) = salt.split_at(HEADER_LEN);

    Ok(DecodedHash {
        params: HashParams::from_header(header)?,
        salt: salt.to_vec(),
        hash,
    })
}
