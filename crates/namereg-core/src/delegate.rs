//! Delegate name synthesis for auto-registration.
//!
//! A primary name in `d/` or `id/` can be registered together with a
//! delegate in `dd/` or `idd/`. The primary's value then points at the
//! delegate, and the caller's real value lives on the delegate.
//!
//! Candidates come from two stages, each its own iterator:
//!
//! 1. [`DigitSuffixCandidates`]: `dd/label`, then one random decimal digit
//!    appended per step while the candidate fits the length bound.
//! 2. [`HexSuffixCandidates`]: `dd/` plus 8 random hex digits, forever.

use rand::Rng;

use crate::error::ValidationError;
use crate::types::{Name, Value};

/// Namespaces that support delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateNamespace {
    /// `d/` names, delegated to `dd/`.
    Domain,
    /// `id/` names, delegated to `idd/`.
    Identity,
}

impl DelegateNamespace {
    /// Split a primary name into its namespace and label.
    pub fn split(name: &Name) -> Result<(Self, &str), ValidationError> {
        let s = name.as_str().ok_or(ValidationError::NonUtf8Name)?;
        if let Some(label) = s.strip_prefix("d/") {
            Ok((Self::Domain, label))
        } else if let Some(label) = s.strip_prefix("id/") {
            Ok((Self::Identity, label))
        } else {
            Err(ValidationError::UnsupportedNamespace)
        }
    }

    pub fn primary_prefix(self) -> &'static str {
        match self {
            Self::Domain => "d",
            Self::Identity => "id",
        }
    }

    pub fn delegate_prefix(self) -> &'static str {
        match self {
            Self::Domain => "dd",
            Self::Identity => "idd",
        }
    }
}

/// Stage 1: the mapped name, then ever longer random digit suffixes.
pub struct DigitSuffixCandidates<'r, R: Rng + ?Sized> {
    next: Option<String>,
    max_len: usize,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> DigitSuffixCandidates<'r, R> {
    pub fn new(base: String, max_len: usize, rng: &'r mut R) -> Self {
        Self {
            next: Some(base),
            max_len,
            rng,
        }
    }
}

impl<R: Rng + ?Sized> Iterator for DigitSuffixCandidates<'_, R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let current = self.next.take()?;
        if current.len() > self.max_len {
            return None;
        }
        let digit = self.rng.gen_range(0..10u8);
        let mut longer = current.clone();
        longer.push(char::from(b'0' + digit));
        self.next = Some(longer);
        Some(current)
    }
}

/// Stage 2: `prefix/` plus 4 random bytes in hex.
pub struct HexSuffixCandidates<'r, R: Rng + ?Sized> {
    prefix: &'static str,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> HexSuffixCandidates<'r, R> {
    pub fn new(prefix: &'static str, rng: &'r mut R) -> Self {
        Self { prefix, rng }
    }

    /// Length of every candidate this stage yields.
    pub fn candidate_len(&self) -> usize {
        self.prefix.len() + 1 + 8
    }

    pub fn next_candidate(&mut self) -> String {
        let suffix: [u8; 4] = self.rng.gen();
        format!("{}/{}", self.prefix, hex::encode(suffix))
    }
}

impl<R: Rng + ?Sized> Iterator for HexSuffixCandidates<'_, R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_candidate())
    }
}

/// Pick the first delegate candidate for `primary` that `exists` reports free.
///
/// Every candidate is at most `max_len` bytes. `exists` is expected to answer
/// whether an active record holds the candidate.
pub fn synthesize_delegate_name<R, E, F>(
    primary: &Name,
    max_len: usize,
    rng: &mut R,
    mut exists: F,
) -> Result<Name, E>
where
    R: Rng + ?Sized,
    E: From<ValidationError>,
    F: FnMut(&Name) -> Result<bool, E>,
{
    let (namespace, label) = DelegateNamespace::split(primary)?;
    let base = format!("{}/{}", namespace.delegate_prefix(), label);

    for candidate in DigitSuffixCandidates::new(base, max_len, &mut *rng) {
        let candidate = Name::from(candidate);
        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }

    let mut hex = HexSuffixCandidates::new(namespace.delegate_prefix(), &mut *rng);
    if hex.candidate_len() > max_len {
        return Err(ValidationError::DelegateNameUnavailable { max: max_len }.into());
    }
    loop {
        let candidate = Name::from(hex.next_candidate());
        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }
}

/// The value written on the primary name: `{"import":"<delegate>"}`.
pub fn delegation_value(delegate: &Name) -> Result<Value, ValidationError> {
    let target = delegate.as_str().ok_or(ValidationError::NonUtf8Name)?;
    Ok(Value::from(serde_json::json!({ "import": target }).to_string()))
}
