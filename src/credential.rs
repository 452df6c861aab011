//! Credential verification against stored password hashes.
//!
//! Two families of schemes are supported, selected once at configuration
//! load time:
//!
//! - **Adaptive salted** (bcrypt-family): the stored hash embeds its own salt
//!   and cost factor, and verification recomputes the hash rather than
//!   comparing digests.
//! - **Fixed digest**: a named cryptographic digest of the password's UTF-8
//!   bytes, hex-encoded and compared against the stored value.
//!
//! Verification never panics on malformed stored hashes; it logs and
//! rejects the credentials.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::UserStoreError;

/// Fixed digest algorithms available to the digest scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Computes the lowercase hex digest of `data`.
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(data)),
            Self::Sha1 => hex::encode(Sha1::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA-1"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Sha512 => write!(f, "SHA-512"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UserStoreError;

    /// Parses the JCA-style algorithm names used by deployment configuration
    /// (`MD5`, `SHA-1`, `SHA-256`, `SHA-512`; case-insensitive, hyphen
    /// optional). Unknown names fail at configuration time.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(UserStoreError::configuration(format!(
                "unknown digest algorithm '{name}'"
            ))),
        }
    }
}

/// How stored password hashes are verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// bcrypt-family hash with salt and cost embedded in the stored value
    AdaptiveSalted,
    /// Fixed digest of the password bytes, stored hex-encoded
    Digest(DigestAlgorithm),
}

impl HashScheme {
    /// Resolves a scheme from the adaptive flag / digest name pair found in
    /// deployment configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the digest scheme is selected without
    /// a digest name, or the name is unknown.
    pub fn from_settings(adaptive: bool, digest_name: Option<&str>) -> crate::Result<Self> {
        if adaptive {
            return Ok(Self::AdaptiveSalted);
        }
        let name = digest_name.ok_or_else(|| {
            UserStoreError::configuration("digest scheme requires a digest algorithm name")
        })?;
        Ok(Self::Digest(name.parse()?))
    }

    /// Checks `password` against `stored_hash`.
    ///
    /// Deterministic for a given pair of inputs. A stored hash that does not
    /// fit the scheme (e.g. a truncated bcrypt string) rejects the
    /// credentials rather than erroring.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match self {
            Self::AdaptiveSalted => match bcrypt::verify(password, stored_hash) {
                Ok(matched) => matched,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "stored value is not a valid adaptive hash; rejecting credentials"
                    );
                    false
                }
            },
            Self::Digest(algorithm) => {
                let computed = algorithm.hex_digest(password.as_bytes());
                // Hex case carries no information, so uppercase stored
                // digests verify too.
                computed.eq_ignore_ascii_case(stored_hash)
            }
        }
    }
}
