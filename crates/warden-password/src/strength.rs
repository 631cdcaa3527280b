//! Rule-based password strength evaluation.
//!
//! The score starts from length and character-class diversity and is reduced
//! by penalties for predictable structure (ascending runs, keyboard rows,
//! repeated characters) and for well-known passwords. Entropy and the
//! crack-time label are user-facing estimates, not cryptographic guarantees.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::TRACING_TARGET_STRENGTH;
use crate::charset::{CharClass, count_unique_chars, longest_run};

/// Passwords rejected outright when the dictionary check is enabled.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "123456789",
    "qwerty",
    "abc123",
    "password123",
    "admin",
    "letmein",
    "welcome",
    "monkey",
    "dragon",
    "master",
    "shadow",
    "superman",
    "michael",
    "football",
    "baseball",
    "liverpool",
];

/// Physical keyboard rows scanned for adjacent-key trigrams.
const KEYBOARD_ROWS: &[&str] = &["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Coarse strength classification derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StrengthLevel {
    /// Score below 30.
    Weak,
    /// Score in `[30, 60)`.
    Medium,
    /// Score in `[60, 80)`.
    Strong,
    /// Score of 80 or more.
    VeryStrong,
}

impl StrengthLevel {
    /// Classifies a score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            0..30 => Self::Weak,
            30..60 => Self::Medium,
            60..80 => Self::Strong,
            _ => Self::VeryStrong,
        }
    }
}

/// Order-of-magnitude estimate of how long a brute-force attack would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrackTime {
    Instant,
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
    Centuries,
}

impl CrackTime {
    /// Maps entropy bits onto the label, monotonically.
    #[must_use]
    pub fn from_entropy(bits: f64) -> Self {
        match bits {
            b if b <= 0.0 => Self::Instant,
            b if b < 20.0 => Self::Seconds,
            b if b < 30.0 => Self::Minutes,
            b if b < 40.0 => Self::Hours,
            b if b < 50.0 => Self::Days,
            b if b < 60.0 => Self::Months,
            b if b < 70.0 => Self::Years,
            _ => Self::Centuries,
        }
    }
}

/// Outcome of a strength evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordStrengthResult {
    /// Score from 0 (weakest) to 100 (strongest).
    pub score: u8,
    /// Classification of the score.
    pub level: StrengthLevel,
    /// Suggestions for improving the password.
    pub feedback: Vec<String>,
    /// Estimated entropy in bits.
    pub entropy_bits: f64,
    /// Coarse crack-time estimate.
    pub crack_time: CrackTime,
}

/// Scores passwords and suggests improvements.
#[derive(Debug, Clone, Copy)]
pub struct PasswordStrengthChecker {
    dictionary_check: bool,
}

impl PasswordStrengthChecker {
    /// Creates a checker, optionally penalizing common passwords.
    #[inline]
    #[must_use]
    pub const fn new(dictionary_check: bool) -> Self {
        Self { dictionary_check }
    }

    /// Returns `true` if the common-password penalty is applied.
    #[inline]
    #[must_use]
    pub const fn dictionary_check(&self) -> bool {
        self.dictionary_check
    }

    /// Evaluates the strength of a password.
    pub fn check(&self, password: &str) -> PasswordStrengthResult {
        if password.is_empty() {
            return PasswordStrengthResult {
                score: 0,
                level: StrengthLevel::Weak,
                feedback: vec!["password must not be empty".to_owned()],
                entropy_bits: 0.0,
                crack_time: CrackTime::Instant,
            };
        }

        let mut score: i32 = 0;
        let mut feedback = Vec::new();
        let length = password.chars().count();

        match length {
            0..8 => feedback.push("use at least 8 characters".to_owned()),
            8..12 => score += 20,
            12..16 => score += 30,
            _ => score += 40,
        }

        for (class, hint) in [
            (CharClass::Lower, "add lowercase letters"),
            (CharClass::Upper, "add uppercase letters"),
            (CharClass::Digit, "add digits"),
            (CharClass::Symbol, "add symbols"),
        ] {
            if class.is_present_in(password) {
                score += 10;
            } else {
                feedback.push(hint.to_owned());
            }
        }

        if count_unique_chars(password) < length / 2 {
            feedback.push("too many repeated characters".to_owned());
        } else {
            score += 10;
        }

        let lowered = password.to_lowercase();

        if has_sequential_run(&lowered) {
            score -= 10;
            feedback.push("avoid sequences such as abc or 123".to_owned());
        }

        if longest_run(password) >= 3 {
            score -= 10;
            feedback.push("avoid repeating the same character".to_owned());
        }

        if has_keyboard_pattern(&lowered) {
            score -= 10;
            feedback.push("avoid keyboard patterns such as qwe or asd".to_owned());
        }

        if self.dictionary_check && is_common_password(&lowered) {
            score -= 20;
            feedback.push("avoid commonly used passwords".to_owned());
        }

        let score = score.clamp(0, 100) as u8;
        let entropy_bits = entropy(password);
        let result = PasswordStrengthResult {
            score,
            level: StrengthLevel::from_score(score),
            feedback,
            entropy_bits,
            crack_time: CrackTime::from_entropy(entropy_bits),
        };

        tracing::trace!(
            target: TRACING_TARGET_STRENGTH,
            score = result.score,
            level = %result.level,
            entropy = result.entropy_bits,
            "password strength evaluated"
        );

        result
    }

    /// Returns `true` if the password scores at least `min_score`.
    pub fn meets(&self, password: &str, min_score: u8) -> bool {
        self.check(password).score >= min_score
    }
}

impl Default for PasswordStrengthChecker {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Estimates entropy as `length * log2(size of the classes present)`.
fn entropy(password: &str) -> f64 {
    let charset_size: usize = CharClass::present_in(password).map(CharClass::size).sum();
    if charset_size == 0 {
        return 0.0;
    }

    password.chars().count() as f64 * (charset_size as f64).log2()
}

/// Detects three consecutive ascending letters or digits.
fn has_sequential_run(lowered: &str) -> bool {
    let chars: Vec<char> = lowered.chars().collect();
    chars.windows(3).any(|w| {
        let same_class = w.iter().all(char::is_ascii_lowercase)
            || w.iter().all(char::is_ascii_digit);
        same_class && w[1] as u32 == w[0] as u32 + 1 && w[2] as u32 == w[1] as u32 + 1
    })
}

/// Detects three adjacent keys from a single keyboard row.
fn has_keyboard_pattern(lowered: &str) -> bool {
    let chars: Vec<char> = lowered.chars().collect();
    chars.windows(3).any(|w| {
        let trigram: String = w.iter().collect();
        KEYBOARD_ROWS.iter().any(|row| row.contains(&trigram))
    })
}

fn is_common_password(lowered: &str) -> bool {
    COMMON_PASSWORDS.contains(&lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_is_weakest() {
        let result = PasswordStrengthChecker::default().check("");

        assert_eq!(result.score, 0);
        assert_eq!(result.level, StrengthLevel::Weak);
        assert_eq!(result.feedback.len(), 1);
        assert_eq!(result.entropy_bits, 0.0);
        assert_eq!(result.crack_time, CrackTime::Instant);
    }

    #[test]
    fn short_password_with_sequence() {
        // 0 (length) + 30 (three classes) + 10 (unique) - 10 (sequence "123")
        let result = PasswordStrengthChecker::default().check("Test123");

        assert_eq!(result.score, 30);
        assert_eq!(result.level, StrengthLevel::Medium);
        assert!(result.feedback.iter().any(|f| f.contains("8 characters")));
        assert!(result.feedback.iter().any(|f| f.contains("symbols")));
    }

    #[test]
    fn long_diverse_password_is_very_strong() {
        let result = PasswordStrengthChecker::default().check("Zr9!mK2#vL8@pQ4$");

        assert_eq!(result.score, 90);
        assert_eq!(result.level, StrengthLevel::VeryStrong);
        assert!(result.feedback.is_empty());
        assert_eq!(result.crack_time, CrackTime::Centuries);
    }

    #[test]
    fn common_password_is_penalized_only_with_dictionary() {
        let with_dictionary = PasswordStrengthChecker::new(true).check("Password");
        let without_dictionary = PasswordStrengthChecker::new(false).check("Password");

        assert_eq!(without_dictionary.score - with_dictionary.score, 20);
        assert!(with_dictionary.feedback.iter().any(|f| f.contains("commonly")));
    }

    #[test]
    fn penalties_are_cumulative() {
        let checker = PasswordStrengthChecker::new(false);

        // abc (sequence), aaa (repeat), qwe (keyboard) on top of 20 + 10 + 10.
        let result = checker.check("abcaaaqwe");
        assert_eq!(result.score, 10);
        assert_eq!(result.level, StrengthLevel::Weak);
        assert!(result.feedback.len() >= 3);
    }

    #[test]
    fn detects_patterns() {
        assert!(has_sequential_run("xabcx"));
        assert!(has_sequential_run("a789"));
        assert!(!has_sequential_run("9ab"));
        assert!(!has_sequential_run("cba"));
        assert!(has_keyboard_pattern("1asd1"));
        assert!(has_keyboard_pattern("bnm"));
        assert!(!has_keyboard_pattern("qaz"));
    }

    #[test]
    fn more_classes_never_score_lower() {
        let checker = PasswordStrengthChecker::new(true);
        let one_class = checker.check("mvrtkzlp");
        let four_classes = checker.check("mV7!tKz#");

        assert!(four_classes.score >= one_class.score);
    }

    #[test]
    fn longer_never_scores_lower() {
        let checker = PasswordStrengthChecker::new(true);
        let short = checker.check("mVt7!kZp");
        let long = checker.check("mVt7!kZpR2#wXn9@");

        assert!(long.score >= short.score);
        assert!(long.entropy_bits > short.entropy_bits);
    }

    #[test]
    fn entropy_counts_present_classes_only() {
        let bits = entropy("abcd");
        assert!((bits - 4.0 * 26_f64.log2()).abs() < 1e-9);

        let bits = entropy("aB1!");
        assert!((bits - 4.0 * 88_f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn crack_time_is_monotonic() {
        let labels: Vec<_> = [0.0, 10.0, 25.0, 35.0, 45.0, 55.0, 65.0, 90.0]
            .into_iter()
            .map(CrackTime::from_entropy)
            .collect();

        assert!(labels.windows(2).all(|w| w[0] < w[1]));
    }
}
