// ABOUTME: Parser and checks for Sign-In-With-Farcaster (EIP-4361 style) messages
// ABOUTME: Verifies domain, nonce, fid resource and validity window of a sign-in message
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Sign-In-With-Farcaster messages
//!
//! The client signs a plain-text message of the form:
//!
//! ```text
//! app.nora.health wants you to sign in with your Ethereum account:
//! 0x2d3b...
//!
//! Farcaster Auth
//!
//! URI: https://app.nora.health/login
//! Version: 1
//! Chain ID: 10
//! Nonce: Xy7...
//! Issued At: 2025-01-01T00:00:00.000Z
//! Resources:
//! - farcaster://fid/1234
//! ```
//!
//! Signature recovery is not performed here; the signer lookup through Neynar
//! is what ties the request to the fid.

use chrono::{DateTime, Utc};

use crate::crypto::constant_time_eq;
use crate::errors::{AppError, AppResult};

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const FID_RESOURCE_PREFIX: &str = "farcaster://fid/";

/// Parsed sign-in message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiwfMessage {
    /// Domain requesting the sign-in
    pub domain: String,
    /// Custody address that signed the message
    pub address: String,
    /// Human-readable statement
    pub statement: Option<String>,
    /// URI the sign-in is for
    pub uri: String,
    /// Message version
    pub version: String,
    /// Chain id
    pub chain_id: u64,
    /// Server-issued nonce
    pub nonce: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry time
    pub expiration_time: Option<DateTime<Utc>>,
    /// Start of validity
    pub not_before: Option<DateTime<Utc>>,
    /// Client request id
    pub request_id: Option<String>,
    /// Resource URIs
    pub resources: Vec<String>,
}

fn malformed(reason: &str) -> AppError {
    AppError::auth_invalid(format!("Malformed sign-in message: {reason}"))
}

fn parse_time(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| malformed(&format!("invalid {field}")))
}

impl SiwfMessage {
    /// Parse the message text
    ///
    /// # Errors
    ///
    /// Returns an authentication error describing the first malformed part
    pub fn parse(text: &str) -> AppResult<Self> {
        let normalized = text.replace("\r\n", "\n");
        let mut lines = normalized.lines();

        let domain = lines
            .next()
            .and_then(|l| l.strip_suffix(HEADER_SUFFIX))
            .filter(|d| !d.is_empty())
            .ok_or_else(|| malformed("missing header"))?
            .to_owned();

        let address = lines
            .next()
            .map(str::trim)
            .filter(|a| {
                a.len() == 42
                    && a.starts_with("0x")
                    && a[2..].chars().all(|c| c.is_ascii_hexdigit())
            })
            .ok_or_else(|| malformed("missing or invalid address"))?
            .to_owned();

        let mut statement = None;
        let mut uri = None;
        let mut version = None;
        let mut chain_id = None;
        let mut nonce = None;
        let mut issued_at = None;
        let mut expiration_time = None;
        let mut not_before = None;
        let mut request_id = None;
        let mut resources = Vec::new();
        let mut in_resources = false;

        for line in lines {
            if in_resources {
                if let Some(resource) = line.strip_prefix("- ") {
                    resources.push(resource.trim().to_owned());
                    continue;
                }
                in_resources = false;
            }

            if line.is_empty() {
                continue;
            }
            if line == "Resources:" {
                in_resources = true;
            } else if let Some(v) = line.strip_prefix("URI: ") {
                uri = Some(v.trim().to_owned());
            } else if let Some(v) = line.strip_prefix("Version: ") {
                version = Some(v.trim().to_owned());
            } else if let Some(v) = line.strip_prefix("Chain ID: ") {
                chain_id = Some(
                    v.trim()
                        .parse::<u64>()
                        .map_err(|_| malformed("invalid chain id"))?,
                );
            } else if let Some(v) = line.strip_prefix("Nonce: ") {
                nonce = Some(v.trim().to_owned());
            } else if let Some(v) = line.strip_prefix("Issued At: ") {
                issued_at = Some(parse_time("issued at", v.trim())?);
            } else if let Some(v) = line.strip_prefix("Expiration Time: ") {
                expiration_time = Some(parse_time("expiration time", v.trim())?);
            } else if let Some(v) = line.strip_prefix("Not Before: ") {
                not_before = Some(parse_time("not before", v.trim())?);
            } else if let Some(v) = line.strip_prefix("Request ID: ") {
                request_id = Some(v.trim().to_owned());
            } else if uri.is_none() && statement.is_none() {
                statement = Some(line.trim().to_owned());
            } else {
                return Err(malformed(&format!("unexpected line '{line}'")));
            }
        }

        Ok(Self {
            domain,
            address,
            statement,
            uri: uri.ok_or_else(|| malformed("missing URI"))?,
            version: version.ok_or_else(|| malformed("missing version"))?,
            chain_id: chain_id.ok_or_else(|| malformed("missing chain id"))?,
            nonce: nonce.ok_or_else(|| malformed("missing nonce"))?,
            issued_at: issued_at.ok_or_else(|| malformed("missing issued at"))?,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }

    /// The fid named by the `farcaster://fid/<fid>` resource
    #[must_use]
    pub fn fid(&self) -> Option<i64> {
        self.resources
            .iter()
            .find_map(|r| r.strip_prefix(FID_RESOURCE_PREFIX))
            .and_then(|fid| fid.parse().ok())
    }

    /// Check the message against the expected domain, nonce and fid at `now`
    ///
    /// # Errors
    ///
    /// Returns an authentication error naming the failed check
    pub fn verify(
        &self,
        expected_domain: &str,
        expected_nonce: &str,
        expected_fid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if !self.domain.eq_ignore_ascii_case(expected_domain) {
            return Err(AppError::auth_invalid(format!(
                "Sign-in message was issued for {}",
                self.domain
            )));
        }
        if !constant_time_eq(&self.nonce, expected_nonce) {
            return Err(AppError::auth_invalid("Sign-in message nonce does not match"));
        }
        if self.fid() != Some(expected_fid) {
            return Err(AppError::auth_invalid(
                "Sign-in message does not name this fid",
            ));
        }
        if self.expiration_time.is_some_and(|t| t <= now) {
            return Err(AppError::auth_invalid("Sign-in message has expired"));
        }
        if self.not_before.is_some_and(|t| t > now) {
            return Err(AppError::auth_invalid("Sign-in message is not yet valid"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn message(expiration: Option<&str>) -> String {
        let mut text = String::from(
            "app.nora.health wants you to sign in with your Ethereum account:\n\
             0x8ba1f109551bD432803012645Ac136ddd64DBA72\n\
             \n\
             Farcaster Auth\n\
             \n\
             URI: https://app.nora.health/login\n\
             Version: 1\n\
             Chain ID: 10\n\
             Nonce: abc123XYZ\n\
             Issued At: 2025-03-01T12:00:00.000Z\n",
        );
        if let Some(exp) = expiration {
            text.push_str(&format!("Expiration Time: {exp}\n"));
        }
        text.push_str("Resources:\n- farcaster://fid/4242");
        text
    }

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_full_message() {
        let parsed = SiwfMessage::parse(&message(None)).unwrap();
        assert_eq!(parsed.domain, "app.nora.health");
        assert_eq!(parsed.statement.as_deref(), Some("Farcaster Auth"));
        assert_eq!(parsed.uri, "https://app.nora.health/login");
        assert_eq!(parsed.chain_id, 10);
        assert_eq!(parsed.nonce, "abc123XYZ");
        assert_eq!(parsed.fid(), Some(4242));
    }

    #[test]
    fn test_verify_accepts_matching_message() {
        let parsed = SiwfMessage::parse(&message(Some("2025-03-01T13:00:00Z"))).unwrap();
        let now = at("2025-03-01T12:30:00Z");
        assert!(parsed.verify("app.nora.health", "abc123XYZ", 4242, now).is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatches() {
        let parsed = SiwfMessage::parse(&message(Some("2025-03-01T13:00:00Z"))).unwrap();
        let now = at("2025-03-01T12:30:00Z");

        assert!(parsed.verify("evil.example", "abc123XYZ", 4242, now).is_err());
        assert!(parsed.verify("app.nora.health", "other", 4242, now).is_err());
        assert!(parsed.verify("app.nora.health", "abc123XYZ", 1, now).is_err());
        assert!(parsed
            .verify("app.nora.health", "abc123XYZ", 4242, now + Duration::hours(1))
            .is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SiwfMessage::parse("hello").is_err());
        let no_nonce = message(None).replace("Nonce: abc123XYZ\n", "");
        assert!(SiwfMessage::parse(&no_nonce).is_err());
        let bad_address = message(None).replace("0x8ba1f109551bD432803012645Ac136ddd64DBA72", "0x12");
        assert!(SiwfMessage::parse(&bad_address).is_err());
    }
}
