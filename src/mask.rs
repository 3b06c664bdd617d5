//! Redaction of sensitive substrings before records leave the process.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Name of the built-in credit card mask.
pub const MASK_CREDITCARD: &str = "CREDITCARD";
/// Name of the built-in US social security number mask.
pub const MASK_SSN: &str = "SSN";
/// Name of the built-in IPv4 address mask.
pub const MASK_IP: &str = "IP";

/// Replacement for every masked match.
pub const MASKED: &str = "**masked**";

static CREDITCARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:4\d{3}|5[1-5]\d{2}|6011|3[47]\d{2})(?:[ -]?\d{4}){2}[ -]?\d{1,4}\b").unwrap()
});
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap()
});

fn builtin(name: &str) -> Option<&'static Lazy<Regex>> {
    match name {
        MASK_CREDITCARD => Some(&CREDITCARD_RE),
        MASK_SSN => Some(&SSN_RE),
        MASK_IP => Some(&IP_RE),
        _ => None,
    }
}

/// Error returned when a custom mask is not a valid regular expression.
#[derive(thiserror::Error, Debug)]
#[error("invalid mask pattern {pattern:?}")]
pub struct MaskError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Set of active masks, keyed by name (built-in) or by pattern (custom).
#[derive(Debug, Clone, Default)]
pub struct Masker {
    masks: BTreeMap<String, Regex>,
}

impl Masker {
    /// A masker with no active masks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a mask. `mask` is either a built-in name
    /// ([`MASK_CREDITCARD`], [`MASK_SSN`], [`MASK_IP`]) or a custom regex.
    pub fn add_mask(&mut self, mask: &str) -> Result<(), MaskError> {
        let regex = match builtin(mask) {
            Some(re) => Regex::clone(re),
            None => Regex::new(mask).map_err(|source| MaskError {
                pattern: mask.to_string(),
                source,
            })?,
        };
        self.masks.insert(mask.to_string(), regex);
        Ok(())
    }

    pub fn remove_mask(&mut self, mask: &str) {
        self.masks.remove(mask);
    }

    pub fn clear_masks(&mut self) {
        self.masks.clear();
    }

    pub fn has_mask(&self, mask: &str) -> bool {
        self.masks.contains_key(mask)
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Replace every match of every active mask with [`MASKED`].
    pub fn mask(&self, input: &str) -> String {
        let mut out = input.to_string();
        for re in self.masks.values() {
            if re.is_match(&out) {
                out = re.replace_all(&out, MASKED).into_owned();
            }
        }
        out
    }

    /// Build the masker described by appender settings: credit card and
    /// SSN on by default (each can be turned off), IP opt-in, optional
    /// custom pattern. With masking disabled no mask is active.
    pub fn from_flags(
        enabled: bool,
        credit_card: Option<bool>,
        ssn: Option<bool>,
        ip: bool,
        custom: Option<&str>,
    ) -> Result<Self, MaskError> {
        let mut masker = Masker::new();
        if !enabled {
            masker.clear_masks();
            return Ok(masker);
        }

        masker.add_mask(MASK_CREDITCARD)?;
        masker.add_mask(MASK_SSN)?;

        if credit_card == Some(false) {
            masker.remove_mask(MASK_CREDITCARD);
        }
        if ssn == Some(false) {
            masker.remove_mask(MASK_SSN);
        }
        if ip {
            masker.add_mask(MASK_IP)?;
        }
        if let Some(pattern) = custom {
            masker.add_mask(pattern)?;
        }

        Ok(masker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_builtin_patterns() {
        let mut masker = Masker::new();
        masker.add_mask(MASK_CREDITCARD).unwrap();
        masker.add_mask(MASK_SSN).unwrap();
        masker.add_mask(MASK_IP).unwrap();

        let out = masker.mask("card 4111 1111 1111 1111 ssn 123-45-6789 from 10.0.0.12");
        assert_eq!(out, "card **masked** ssn **masked** from **masked**");
    }

    #[test]
    fn empty_masker_leaves_input_alone() {
        let masker = Masker::new();
        assert_eq!(masker.mask("ssn 123-45-6789"), "ssn 123-45-6789");
    }

    #[test]
    fn defaults_cover_card_and_ssn_but_not_ip() {
        let masker = Masker::from_flags(true, None, None, false, None).unwrap();
        assert!(masker.has_mask(MASK_CREDITCARD));
        assert!(masker.has_mask(MASK_SSN));
        assert!(!masker.has_mask(MASK_IP));
        assert_eq!(masker.mask("from 10.0.0.12"), "from 10.0.0.12");
    }

    #[test]
    fn defaults_can_be_turned_off_and_extended() {
        let masker = Masker::from_flags(true, Some(false), Some(false), true, Some(r"order-\d+")).unwrap();
        assert!(!masker.has_mask(MASK_CREDITCARD));
        assert!(!masker.has_mask(MASK_SSN));
        assert_eq!(masker.mask("order-991 from 192.168.1.1"), "**masked** from **masked**");
    }

    #[test]
    fn disabled_masking_clears_everything() {
        let masker = Masker::from_flags(false, Some(true), Some(true), true, Some("x")).unwrap();
        assert!(masker.is_empty());
    }

    #[test]
    fn invalid_custom_pattern_is_an_error() {
        let err = Masker::from_flags(true, None, None, false, Some("(unclosed")).unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
    }
}
