//! Password subcommands.

use std::fmt;
use std::process::ExitCode;

use clap::Args;
use serde::Serialize;
use warden_password::{
    GenerateOptions, PasswordGenerator, PasswordPolicy, PasswordPolicyValidator,
    PasswordStrengthChecker, PasswordStrengthResult, PolicyResult,
};

use crate::TRACING_TARGET_COMMAND;
use crate::config::HasherArgs;
use crate::output::{Output, secret_or_stdin};

/// Arguments for `warden hash`.
#[derive(Debug, Clone, Args)]
pub struct HashArgs {
    /// Password to hash. Read from stdin when omitted.
    pub password: Option<String>,

    #[clap(flatten)]
    pub hasher: HasherArgs,
}

#[derive(Serialize)]
struct HashReport {
    hash: String,
}

impl fmt::Display for HashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

impl HashArgs {
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let password = secret_or_stdin(self.password, "password")?;
        let hash = self.hasher.build().hash_password(&password)?;

        output.emit(&HashReport { hash })?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Arguments for `warden verify`.
#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Encoded hash, `base64(salt)$base64(hash)`.
    pub hash: String,

    /// Candidate password. Read from stdin when omitted.
    pub password: Option<String>,

    #[clap(flatten)]
    pub hasher: HasherArgs,
}

#[derive(Serialize)]
struct VerifyReport {
    valid: bool,
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.valid { "valid" } else { "invalid" })
    }
}

impl VerifyArgs {
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let password = secret_or_stdin(self.password, "password")?;
        let valid = self.hasher.build().verify_password(&password, &self.hash);

        output.emit_outcome(&VerifyReport { valid }, valid)
    }
}

/// Arguments for `warden strength`.
#[derive(Debug, Clone, Args)]
pub struct StrengthArgs {
    /// Password to evaluate. Read from stdin when omitted.
    pub password: Option<String>,

    /// Skip the common-password dictionary penalty.
    #[arg(long)]
    pub no_dictionary: bool,
}

#[derive(Serialize)]
#[serde(transparent)]
struct StrengthReport(PasswordStrengthResult);

impl fmt::Display for StrengthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.0;
        writeln!(f, "score:      {}/100 ({})", result.score, result.level)?;
        writeln!(f, "entropy:    {:.1} bits", result.entropy_bits)?;
        write!(f, "crack time: {}", result.crack_time)?;
        for hint in &result.feedback {
            write!(f, "\n  - {hint}")?;
        }
        Ok(())
    }
}

impl StrengthArgs {
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let password = secret_or_stdin(self.password, "password")?;
        let result = PasswordStrengthChecker::new(!self.no_dictionary).check(&password);

        output.emit(&StrengthReport(result))?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Arguments for `warden policy`.
///
/// Unset options keep the default policy's values.
#[derive(Debug, Clone, Args)]
pub struct PolicyArgs {
    /// Password to validate. Read from stdin when omitted.
    pub password: Option<String>,

    /// Minimum length.
    #[arg(long)]
    pub min_length: Option<usize>,

    /// Maximum length.
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Require at least one symbol.
    #[arg(long)]
    pub require_symbols: bool,

    /// Do not require lowercase letters.
    #[arg(long)]
    pub allow_no_lowercase: bool,

    /// Do not require uppercase letters.
    #[arg(long)]
    pub allow_no_uppercase: bool,

    /// Do not require digits.
    #[arg(long)]
    pub allow_no_digits: bool,

    /// Minimum number of distinct characters.
    #[arg(long)]
    pub min_unique: Option<usize>,

    /// Longest allowed run of one repeated character.
    #[arg(long)]
    pub max_repeated: Option<usize>,

    /// Forbidden substring (repeatable). Replaces the default list.
    #[arg(long = "forbid")]
    pub forbidden: Vec<String>,
}

impl PolicyArgs {
    fn policy(&self) -> PasswordPolicy {
        let mut policy = PasswordPolicy::default();

        if let Some(min_length) = self.min_length {
            policy.min_length = min_length;
        }
        if let Some(max_length) = self.max_length {
            policy.max_length = max_length;
        }
        if let Some(min_unique) = self.min_unique {
            policy.min_unique_chars = min_unique;
        }
        if let Some(max_repeated) = self.max_repeated {
            policy.max_repeated_chars = max_repeated;
        }
        if !self.forbidden.is_empty() {
            policy.forbidden_patterns = self.forbidden.clone();
        }

        policy.require_symbols |= self.require_symbols;
        policy.require_lowercase &= !self.allow_no_lowercase;
        policy.require_uppercase &= !self.allow_no_uppercase;
        policy.require_digits &= !self.allow_no_digits;

        policy
    }

    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let policy = self.policy();
        let password = secret_or_stdin(self.password, "password")?;
        let result = PasswordPolicyValidator::new().validate(&password, &policy);
        let valid = result.valid;

        output.emit_outcome(&PolicyReport(result), valid)
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct PolicyReport(PolicyResult);

impl fmt::Display for PolicyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.0;
        let verdict = if result.valid { "valid" } else { "invalid" };
        write!(f, "{verdict} (score {}/100)", result.score)?;
        for violation in &result.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

/// Arguments for `warden generate`.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Password length.
    #[arg(short, long, default_value_t = 12)]
    pub length: usize,

    /// Number of passwords to generate.
    #[arg(short, long, default_value_t = 1)]
    pub count: usize,

    /// Leave out lowercase letters.
    #[arg(long)]
    pub no_lowercase: bool,

    /// Leave out uppercase letters.
    #[arg(long)]
    pub no_uppercase: bool,

    /// Leave out digits.
    #[arg(long)]
    pub no_digits: bool,

    /// Leave out symbols.
    #[arg(long)]
    pub no_symbols: bool,

    /// Allow look-alike characters such as `0`, `O`, `l` and `1`.
    #[arg(long)]
    pub allow_ambiguous: bool,

    /// Draw only from these characters.
    #[arg(long, conflicts_with_all = ["no_lowercase", "no_uppercase", "no_digits", "no_symbols"])]
    pub charset: Option<String>,
}

impl GenerateArgs {
    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            length: self.length,
            lowercase: !self.no_lowercase,
            uppercase: !self.no_uppercase,
            digits: !self.no_digits,
            symbols: !self.no_symbols,
            exclude_ambiguous: !self.allow_ambiguous,
            custom_charset: self.charset.clone(),
        }
    }

    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let options = self.options();
        let generator = PasswordGenerator::new();
        let passwords = (0..self.count)
            .map(|_| generator.generate(&options))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            count = passwords.len(),
            length = options.length,
            "passwords generated"
        );

        output.emit(&GenerateReport { passwords })?;
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Serialize)]
struct GenerateReport {
    passwords: Vec<String>,
}

impl fmt::Display for GenerateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.passwords.join("\n"))
    }
}
