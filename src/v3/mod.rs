//! SNMPv3 User-based Security Model (RFC 3414, RFC 3826).
//!
//! - USM security parameters encoding/decoding ([`UsmSecurityParams`])
//! - Key localization and HMAC authentication ([`auth`])
//! - DES-CBC / AES-128-CFB privacy ([`privacy`])
//! - Engine state, time window, and Report classification ([`engine`])

pub mod auth;
pub mod engine;
pub mod privacy;
pub mod usm;

pub use auth::LocalizedKey;
pub use engine::{EngineState, MAX_ENGINE_TIME, ReportStatus, TIME_WINDOW};
pub use privacy::{PrivKey, SaltCounter};
pub use usm::UsmSecurityParams;

use crate::error::{Error, Result};
use crate::util::{decode_hex, strip_hex_prefix};
use bytes::Bytes;

/// Minimum engine ID length in octets (RFC 3411 SnmpEngineID).
pub const ENGINE_ID_MIN_LEN: usize = 5;

/// Maximum engine ID length in octets (RFC 3411 SnmpEngineID).
pub const ENGINE_ID_MAX_LEN: usize = 32;

/// Authentication protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    /// HMAC-MD5-96 (RFC 3414)
    Md5,
    /// HMAC-SHA-96 (RFC 3414)
    Sha1,
}

impl AuthProtocol {
    /// Digest output length in bytes; also the localized key length.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
        }
    }

    /// Truncated MAC length carried in msgAuthenticationParameters.
    pub fn mac_len(self) -> usize {
        12 // HMAC-96 for both protocols
    }
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA"),
        }
    }
}

/// Privacy protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivProtocol {
    /// DES-CBC (RFC 3414 Section 8)
    Des,
    /// AES-128-CFB (RFC 3826)
    Aes,
}

impl PrivProtocol {
    /// Required localized key length in bytes.
    ///
    /// DES uses 8 key octets plus an 8-octet pre-IV; AES-128 uses 16 key
    /// octets.
    pub fn key_len(self) -> usize {
        16
    }
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Des => write!(f, "DES"),
            Self::Aes => write!(f, "AES"),
        }
    }
}

/// Parse an engine ID from its hex string form.
///
/// Accepts an optional `0x` prefix. The decoded value must be 5 to 32
/// octets (RFC 3411).
///
/// ```
/// use snmp_session::v3::parse_engine_id;
///
/// let id = parse_engine_id("0x8000000001020304").unwrap();
/// assert_eq!(id.len(), 8);
/// assert!(parse_engine_id("0x0102").is_err());    // too short
/// assert!(parse_engine_id("not-hex").is_err());
/// ```
pub fn parse_engine_id(s: &str) -> Result<Bytes> {
    let hex = strip_hex_prefix(s);
    let bytes = decode_hex(hex)
        .ok_or_else(|| Error::argument(format!("engine ID is not valid hex: {:?}", s)))?;

    if bytes.len() < ENGINE_ID_MIN_LEN || bytes.len() > ENGINE_ID_MAX_LEN {
        return Err(Error::argument(format!(
            "engine ID length is range {}..{} octets, got {}",
            ENGINE_ID_MIN_LEN,
            ENGINE_ID_MAX_LEN,
            bytes.len()
        )));
    }

    Ok(Bytes::from(bytes))
}
