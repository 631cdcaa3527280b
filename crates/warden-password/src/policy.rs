//! Declarative password policies.

use serde::{Deserialize, Serialize};

use crate::charset::{CharClass, count_unique_chars, longest_run};

const MIN_LENGTH_WEIGHT: u8 = 20;
const MAX_LENGTH_WEIGHT: u8 = 10;
const REQUIRED_CLASS_WEIGHT: u8 = 15;
const MIN_UNIQUE_WEIGHT: u8 = 10;
const MAX_REPEATED_WEIGHT: u8 = 15;
const FORBIDDEN_PATTERN_WEIGHT: u8 = 20;

/// Independent predicates a password must satisfy.
///
/// Numeric bounds of zero disable the corresponding check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
    /// Maximum number of characters.
    pub max_length: usize,
    /// Require at least one lowercase letter.
    pub require_lowercase: bool,
    /// Require at least one uppercase letter.
    pub require_uppercase: bool,
    /// Require at least one digit.
    pub require_digits: bool,
    /// Require at least one symbol.
    pub require_symbols: bool,
    /// Minimum number of distinct characters.
    pub min_unique_chars: usize,
    /// Longest allowed run of one repeated character.
    pub max_repeated_chars: usize,
    /// Substrings that may not appear, compared case-insensitively.
    pub forbidden_patterns: Vec<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: false,
            min_unique_chars: 6,
            max_repeated_chars: 3,
            forbidden_patterns: ["password", "123456", "qwerty", "admin"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// `true` iff `violations` is empty.
    pub valid: bool,
    /// Human-readable descriptions of every failed predicate.
    pub violations: Vec<String>,
    /// Advisory score from 100 down, reduced by a fixed weight per violation.
    pub score: u8,
}

/// Checks passwords against a [`PasswordPolicy`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordPolicyValidator;

impl PasswordPolicyValidator {
    /// Creates a new validator.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a password, collecting every violated predicate.
    pub fn validate(&self, password: &str, policy: &PasswordPolicy) -> PolicyResult {
        let mut violations = Vec::new();
        let mut penalty: u32 = 0;
        let mut violate = |message: String, weight: u8| {
            violations.push(message);
            penalty += u32::from(weight);
        };

        let length = password.chars().count();
        if length < policy.min_length {
            violate(
                format!("must be at least {} characters long", policy.min_length),
                MIN_LENGTH_WEIGHT,
            );
        }
        if policy.max_length > 0 && length > policy.max_length {
            violate(
                format!("must be at most {} characters long", policy.max_length),
                MAX_LENGTH_WEIGHT,
            );
        }

        for (required, class, message) in [
            (policy.require_lowercase, CharClass::Lower, "must contain a lowercase letter"),
            (policy.require_uppercase, CharClass::Upper, "must contain an uppercase letter"),
            (policy.require_digits, CharClass::Digit, "must contain a digit"),
            (policy.require_symbols, CharClass::Symbol, "must contain a symbol"),
        ] {
            if required && !class.is_present_in(password) {
                violate(message.to_owned(), REQUIRED_CLASS_WEIGHT);
            }
        }

        if policy.min_unique_chars > 0 && count_unique_chars(password) < policy.min_unique_chars {
            violate(
                format!(
                    "must contain at least {} different characters",
                    policy.min_unique_chars
                ),
                MIN_UNIQUE_WEIGHT,
            );
        }

        if policy.max_repeated_chars > 0 && longest_run(password) > policy.max_repeated_chars {
            violate(
                format!(
                    "must not repeat a character more than {} times in a row",
                    policy.max_repeated_chars
                ),
                MAX_REPEATED_WEIGHT,
            );
        }

        let lowered = password.to_lowercase();
        for pattern in &policy.forbidden_patterns {
            if !pattern.is_empty() && lowered.contains(&pattern.to_lowercase()) {
                violate(
                    format!("must not contain \"{pattern}\""),
                    FORBIDDEN_PATTERN_WEIGHT,
                );
            }
        }

        let score = 100_u32.saturating_sub(penalty) as u8;
        PolicyResult {
            valid: violations.is_empty(),
            violations,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliant_password_passes() {
        let result = PasswordPolicyValidator::new().validate("Blue7Harbor", &PasswordPolicy::default());

        assert!(result.valid);
        assert!(result.violations.is_empty());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn every_violation_is_itemized() {
        let result = PasswordPolicyValidator::new().validate("aaaa", &PasswordPolicy::default());

        // Too short, missing upper and digit, too few unique, run of four.
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 5);
        assert_eq!(result.score, 100 - 20 - 15 - 15 - 10 - 15);
    }

    #[test]
    fn forbidden_patterns_ignore_case() {
        let result =
            PasswordPolicyValidator::new().validate("MyPassWord9x", &PasswordPolicy::default());

        assert!(!result.valid);
        assert_eq!(result.violations, vec!["must not contain \"password\"".to_owned()]);
        assert_eq!(result.score, 80);
    }

    #[test]
    fn score_is_clamped_at_zero() {
        let policy = PasswordPolicy {
            require_symbols: true,
            forbidden_patterns: vec!["a".into(), "aa".into(), "aaa".into()],
            ..PasswordPolicy::default()
        };
        let result = PasswordPolicyValidator::new().validate("aaaa", &policy);

        assert_eq!(result.score, 0);
        assert!(!result.valid);
    }

    #[test]
    fn zero_bounds_disable_checks() {
        let policy = PasswordPolicy {
            min_length: 0,
            max_length: 0,
            require_lowercase: false,
            require_uppercase: false,
            require_digits: false,
            require_symbols: false,
            min_unique_chars: 0,
            max_repeated_chars: 0,
            forbidden_patterns: Vec::new(),
        };

        let result = PasswordPolicyValidator::new().validate("", &policy);
        assert!(result.valid);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn validity_matches_violations() {
        let validator = PasswordPolicyValidator::new();
        let policy = PasswordPolicy::default();

        for password in ["", "Short1", "Blue7Harbor", "adminAdmin1", "Abc1111111", "x".repeat(200).as_str()] {
            let result = validator.validate(password, &policy);
            assert_eq!(result.valid, result.violations.is_empty(), "{password}");
        }
    }
}
