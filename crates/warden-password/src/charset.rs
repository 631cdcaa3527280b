//! Character classes shared by the strength checker, generator and policy.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Lowercase ASCII letters.
pub(crate) const LOWER_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";
/// Uppercase ASCII letters.
pub(crate) const UPPER_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// ASCII digits.
pub(crate) const DIGIT_CHARS: &str = "0123456789";
/// Recognized symbol characters.
pub(crate) const SYMBOL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
/// Characters that are easily confused with one another when read.
pub(crate) const AMBIGUOUS_CHARS: &str = "0O1lI|`";

/// A class of characters a password may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CharClass {
    /// `a-z`.
    Lower,
    /// `A-Z`.
    Upper,
    /// `0-9`.
    Digit,
    /// Punctuation from the recognized symbol set.
    Symbol,
}

impl CharClass {
    /// Returns every character belonging to this class.
    #[must_use]
    pub const fn alphabet(self) -> &'static str {
        match self {
            Self::Lower => LOWER_CHARS,
            Self::Upper => UPPER_CHARS,
            Self::Digit => DIGIT_CHARS,
            Self::Symbol => SYMBOL_CHARS,
        }
    }

    /// Returns the number of characters in this class.
    #[must_use]
    pub const fn size(self) -> usize {
        self.alphabet().len()
    }

    /// Returns the class a character belongs to, if any.
    #[must_use]
    pub fn of(c: char) -> Option<Self> {
        match c {
            'a'..='z' => Some(Self::Lower),
            'A'..='Z' => Some(Self::Upper),
            '0'..='9' => Some(Self::Digit),
            c if SYMBOL_CHARS.contains(c) => Some(Self::Symbol),
            _ => None,
        }
    }

    /// Returns `true` if any character of `password` belongs to this class.
    #[must_use]
    pub fn is_present_in(self, password: &str) -> bool {
        password.chars().any(|c| Self::of(c) == Some(self))
    }

    /// Returns the classes that occur at least once in `password`.
    pub fn present_in(password: &str) -> impl Iterator<Item = Self> + '_ {
        Self::iter().filter(move |class| class.is_present_in(password))
    }
}

/// Returns `true` if the character is in the ambiguous set.
#[inline]
pub(crate) fn is_ambiguous(c: char) -> bool {
    AMBIGUOUS_CHARS.contains(c)
}

/// Counts distinct characters.
pub(crate) fn count_unique_chars(password: &str) -> usize {
    let mut seen: Vec<char> = password.chars().collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Returns the length of the longest run of identical consecutive characters.
pub(crate) fn longest_run(password: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for c in password.chars() {
        if previous == Some(c) {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        longest = longest.max(current);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_characters() {
        assert_eq!(CharClass::of('q'), Some(CharClass::Lower));
        assert_eq!(CharClass::of('Q'), Some(CharClass::Upper));
        assert_eq!(CharClass::of('7'), Some(CharClass::Digit));
        assert_eq!(CharClass::of('#'), Some(CharClass::Symbol));
        assert_eq!(CharClass::of('~'), None);
        assert_eq!(CharClass::of('é'), None);
    }

    #[test]
    fn reports_present_classes() {
        let classes: Vec<_> = CharClass::present_in("abc!").collect();
        assert_eq!(classes, vec![CharClass::Lower, CharClass::Symbol]);
    }

    #[test]
    fn alphabet_sizes() {
        assert_eq!(CharClass::Lower.size(), 26);
        assert_eq!(CharClass::Upper.size(), 26);
        assert_eq!(CharClass::Digit.size(), 10);
        assert_eq!(CharClass::Symbol.size(), 26);
    }

    #[test]
    fn counts_unique_and_runs() {
        assert_eq!(count_unique_chars("aabbcc"), 3);
        assert_eq!(count_unique_chars(""), 0);
        assert_eq!(longest_run("abbbcdd"), 3);
        assert_eq!(longest_run("a"), 1);
        assert_eq!(longest_run(""), 0);
    }
}
