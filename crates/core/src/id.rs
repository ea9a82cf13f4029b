//! Business identifiers used across the domain.
//!
//! Both identifiers are human-readable strings derived from the issuance clock:
//! `PRD-<token>-<ms>` for products and `GP-<ms>` for gate passes, where `<ms>` is
//! the last six digits of the epoch-millisecond timestamp.

use core::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stable business key of a product (distinct from any storage-assigned id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

/// Unique number of an issued gate pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GatePassNumber(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build an identifier from a compile-time literal (seed data, fixtures).
            pub fn from_static(value: &'static str) -> Self {
                Self(value.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: cannot be blank", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(ProductId, "ProductId");
impl_string_newtype!(GatePassNumber, "GatePassNumber");

const TOKEN_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Last six digits of an epoch-millisecond timestamp, zero padded.
fn millis_suffix(millis: i64) -> String {
    format!("{:06}", millis.rem_euclid(1_000_000))
}

/// Short uppercase alphanumeric token drawn from a v4 UUID's random bytes.
fn random_token(len: usize) -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(len)
        .map(|b| TOKEN_ALPHABET[usize::from(*b) % TOKEN_ALPHABET.len()] as char)
        .collect()
}

impl ProductId {
    /// Generate a fresh product id (`PRD-XXX-NNNNNN`).
    ///
    /// Not unique by construction; stores reject duplicates and callers retry
    /// with a new candidate.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!(
            "PRD-{}-{}",
            random_token(3),
            millis_suffix(now.timestamp_millis())
        ))
    }
}

impl GatePassNumber {
    /// Build the gate pass number for an epoch-millisecond instant (`GP-NNNNNN`).
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("GP-{}", millis_suffix(millis)))
    }
}

/// Monotonic gate pass number source.
///
/// Never hands out the same millisecond twice within a process, so rapid
/// issuance does not collide. The six-digit suffix still wraps every ~16 minutes,
/// which is why stores also enforce uniqueness.
#[derive(Debug, Default)]
pub struct GatePassNumberGenerator {
    last_millis: AtomicI64,
}

impl GatePassNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now: DateTime<Utc>) -> GatePassNumber {
        let now_millis = now.timestamp_millis();
        let previous = match self.last_millis.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |last| Some(now_millis.max(last + 1)),
        ) {
            Ok(prev) | Err(prev) => prev,
        };
        GatePassNumber::from_millis(now_millis.max(previous + 1))
    }
}
