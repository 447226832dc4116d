//! Challenge record computation
//!
//! Derives the TXT record an ACME server looks up for a DNS-01 challenge
//! (RFC 8555 §8.4): the record lives at `_acme-challenge.<domain>.` and holds
//! the base64url SHA-256 digest of the key authorization.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Error, Result};

/// Label prepended to the validated domain
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// A DNS-01 challenge as handed over by the ACME layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Domain being validated (e.g., "example.com" or "*.example.com")
    pub domain: String,
    /// Challenge token (not part of the DNS record, kept for the ACME layer)
    pub token: String,
    /// Key authorization (`token || '.' || thumbprint`)
    pub key_authorization: String,
}

impl Challenge {
    pub fn new(
        domain: impl Into<String>,
        token: impl Into<String>,
        key_authorization: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            token: token.into(),
            key_authorization: key_authorization.into(),
        }
    }

    /// Compute the TXT record for this challenge
    pub fn record(&self) -> Result<DnsRecord> {
        compute_record(&self.domain, &self.key_authorization)
    }
}

/// DNS record type published for a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record to publish for a challenge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully-qualified name, always with exactly one trailing dot
    pub fqdn: String,
    /// Record type (always TXT)
    pub record_type: RecordType,
    /// Record value (43-character base64url digest)
    pub value: String,
}

impl DnsRecord {
    /// The fqdn without its trailing dot, as most vendor APIs expect it
    pub fn name_without_dot(&self) -> &str {
        self.fqdn.strip_suffix('.').unwrap_or(&self.fqdn)
    }
}

/// Compute the DNS-01 record name and value
///
/// The domain is case-preserved. Trailing dots are normalised so the fqdn
/// ends with exactly one, and a leading wildcard label is dropped because
/// wildcard authorizations are validated at the base name.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if the domain is empty.
pub fn compute_record(domain: &str, key_authorization: &str) -> Result<DnsRecord> {
    let base = domain.strip_prefix("*.").unwrap_or(domain);
    let base = base.trim_end_matches('.');

    if base.is_empty() {
        return Err(Error::invalid_argument(format!(
            "challenge domain cannot be empty (got {:?})",
            domain
        )));
    }

    Ok(DnsRecord {
        fqdn: format!("{}.{}.", ACME_CHALLENGE_LABEL, base),
        record_type: RecordType::Txt,
        value: challenge_value(key_authorization),
    })
}

/// base64url (no padding) of SHA-256 over the key authorization
pub fn challenge_value(key_authorization: &str) -> String {
    let digest = Sha256::digest(key_authorization.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let record = compute_record("example.com", "abc123==").unwrap();
        assert_eq!(record.fqdn, "_acme-challenge.example.com.");
        assert_eq!(record.value, "olHC0U_jM-d52-0vth5mXb4a0TRf2kEEXyh4JNZno8c");
        assert_eq!(record.record_type, RecordType::Txt);
    }

    #[test]
    fn test_trailing_dot_normalised() {
        let plain = compute_record("example.com", "k").unwrap();
        let dotted = compute_record("example.com.", "k").unwrap();
        let doubled = compute_record("example.com..", "k").unwrap();
        assert_eq!(plain.fqdn, dotted.fqdn);
        assert_eq!(plain.fqdn, doubled.fqdn);
        assert!(!plain.fqdn.ends_with(".."));
    }

    #[test]
    fn test_case_preserved() {
        let record = compute_record("Example.COM", "k").unwrap();
        assert_eq!(record.fqdn, "_acme-challenge.Example.COM.");
    }

    #[test]
    fn test_wildcard_stripped() {
        let record = compute_record("*.example.com", "k").unwrap();
        assert_eq!(record.fqdn, "_acme-challenge.example.com.");
    }

    #[test]
    fn test_empty_domain_rejected() {
        for domain in ["", ".", "*."] {
            let err = compute_record(domain, "k").unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{domain:?}: {err}");
        }
    }

    #[test]
    fn test_name_without_dot() {
        let record = compute_record("example.com", "k").unwrap();
        assert_eq!(record.name_without_dot(), "_acme-challenge.example.com");
    }

    #[test]
    fn test_value_shape() {
        for key_auth in ["", "a", "token.thumbprint", &"x".repeat(4096)] {
            let value = challenge_value(key_auth);
            assert_eq!(value.len(), 43);
            assert!(
                value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[test]
    fn test_record_type_display() {
        assert_eq!(RecordType::Txt.to_string(), "TXT");
    }
}
