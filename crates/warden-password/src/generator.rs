//! Cryptographically random password generation.

use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_GENERATOR;
use crate::charset::{CharClass, is_ambiguous};
use crate::error::{PasswordError, Result};

/// Options controlling [`PasswordGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Number of characters to produce.
    pub length: usize,
    /// Draw from `a-z`.
    pub lowercase: bool,
    /// Draw from `A-Z`.
    pub uppercase: bool,
    /// Draw from `0-9`.
    pub digits: bool,
    /// Draw from the symbol set.
    pub symbols: bool,
    /// Remove look-alike characters such as `0`, `O`, `1`, `l` and `I`.
    pub exclude_ambiguous: bool,
    /// Replaces the class flags entirely when set.
    pub custom_charset: Option<String>,
}

impl GenerateOptions {
    /// All four classes, ambiguous characters excluded.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Draws only from the given characters.
    #[must_use]
    pub fn custom(length: usize, charset: impl Into<String>) -> Self {
        Self {
            length,
            custom_charset: Some(charset.into()),
            ..Self::default()
        }
    }

    /// Returns the classes selected by the flags, ignoring any custom charset.
    fn requested_classes(&self) -> Vec<CharClass> {
        [
            (self.lowercase, CharClass::Lower),
            (self.uppercase, CharClass::Upper),
            (self.digits, CharClass::Digit),
            (self.symbols, CharClass::Symbol),
        ]
        .into_iter()
        .filter_map(|(selected, class)| selected.then_some(class))
        .collect()
    }

    fn has_custom_charset(&self) -> bool {
        self.custom_charset.as_deref().is_some_and(|c| !c.is_empty())
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            length: 12,
            lowercase: true,
            uppercase: true,
            digits: true,
            symbols: true,
            exclude_ambiguous: true,
            custom_charset: None,
        }
    }
}

/// Generates random passwords that contain every requested character class.
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordGenerator;

impl PasswordGenerator {
    /// Longest password the generator will produce.
    pub const MAX_LENGTH: usize = 256;

    /// Regeneration attempts before missing classes are patched in.
    const MAX_ATTEMPTS: usize = 10;

    /// Creates a new generator.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates a password.
    ///
    /// Characters are drawn uniformly from the resolved character set. If a
    /// requested class is missing after the bounded retries, one character of
    /// each missing class is patched in near the front, never overwriting the
    /// only representative of another requested class.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::InvalidOptions`] when the length is zero or
    /// above [`Self::MAX_LENGTH`], or the resolved character set is empty.
    pub fn generate(&self, options: &GenerateOptions) -> Result<String> {
        if options.length == 0 {
            return Err(PasswordError::InvalidOptions("length must be positive"));
        }
        if options.length > Self::MAX_LENGTH {
            return Err(PasswordError::InvalidOptions("length exceeds 256 characters"));
        }

        let charset = resolve_charset(options);
        if charset.is_empty() {
            return Err(PasswordError::InvalidOptions("character set is empty"));
        }

        let mut rng = rand::rng();
        let mut password = sample(&mut rng, &charset, options.length);

        if options.has_custom_charset() {
            return Ok(password.into_iter().collect());
        }

        let requested = options.requested_classes();
        let mut attempts = 0;
        while !satisfies(&password, &requested) && attempts < Self::MAX_ATTEMPTS {
            password = sample(&mut rng, &charset, options.length);
            attempts += 1;
        }

        if !satisfies(&password, &requested) {
            tracing::debug!(
                target: TRACING_TARGET_GENERATOR,
                attempts,
                length = options.length,
                "patching missing character classes"
            );
            patch_missing_classes(&mut rng, &mut password, &requested, options.exclude_ambiguous);
        }

        Ok(password.into_iter().collect())
    }
}

/// Builds the character set the password is drawn from.
fn resolve_charset(options: &GenerateOptions) -> Vec<char> {
    let chars: Vec<char> = match options.custom_charset.as_deref() {
        Some(custom) if !custom.is_empty() => custom.chars().collect(),
        _ => options
            .requested_classes()
            .into_iter()
            .flat_map(|class| class.alphabet().chars())
            .collect(),
    };

    if options.exclude_ambiguous {
        chars.into_iter().filter(|&c| !is_ambiguous(c)).collect()
    } else {
        chars
    }
}

fn sample(rng: &mut ThreadRng, charset: &[char], length: usize) -> Vec<char> {
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())])
        .collect()
}

fn satisfies(password: &[char], requested: &[CharClass]) -> bool {
    requested
        .iter()
        .all(|&class| password.iter().any(|&c| CharClass::of(c) == Some(class)))
}

/// Overwrites one position per missing class with a character of that class.
///
/// Positions are chosen front to back, skipping any character that is the sole
/// representative of a requested class and any position already patched.
fn patch_missing_classes(
    rng: &mut ThreadRng,
    password: &mut [char],
    requested: &[CharClass],
    exclude_ambiguous: bool,
) {
    let mut patched = vec![false; password.len()];

    for &class in requested {
        if password.iter().any(|&c| CharClass::of(c) == Some(class)) {
            continue;
        }

        let is_sole_representative = |c: char| match CharClass::of(c) {
            Some(owner) if requested.contains(&owner) => {
                password.iter().filter(|&&o| CharClass::of(o) == Some(owner)).count() == 1
            }
            _ => false,
        };

        let Some(position) = (0..password.len())
            .find(|&i| !patched[i] && !is_sole_representative(password[i]))
        else {
            // Fewer positions than requested classes.
            break;
        };

        let alphabet: Vec<char> = class
            .alphabet()
            .chars()
            .filter(|&c| !(exclude_ambiguous && is_ambiguous(c)))
            .collect();

        password[position] = alphabet[rng.random_range(0..alphabet.len())];
        patched[position] = true;
    }
}
