//! Session configuration.
//!
//! A plain record with an explicit [`apply_defaults`](SessionConfig::apply_defaults)
//! / [`validate`](SessionConfig::validate) pair; no process-wide state.
//! [`Session::new`](crate::client::Session::new) runs both, so an invalid
//! configuration fails before any socket is opened.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::message::SecurityLevel;
use crate::v3::{AuthProtocol, PrivProtocol, parse_engine_id};
use crate::version::Version;

/// Default per-attempt deadline.
pub const TIMEOUT_DEFAULT: Duration = Duration::from_secs(5);

/// Default maximum message size (RFC 3412 calls this msgMaxSize).
pub const MSG_SIZE_DEFAULT: i32 = 1400;

/// Minimum legal msgMaxSize (RFC 3412 Section 6).
pub const MSG_SIZE_MINIMUM: i32 = 484;

/// Session configuration.
///
/// `version` and `address` are required; everything else has a usable
/// default. String options left empty pick up their defaults in
/// [`apply_defaults`](Self::apply_defaults).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SNMP version to speak.
    pub version: Version,
    /// Transport family; only "udp" is supported.
    pub network: String,
    /// Peer `host:port`.
    pub address: String,
    /// Per-attempt deadline for connect/send/receive.
    pub timeout: Duration,
    /// Extra attempts after a failed one.
    pub retries: u32,
    /// Maximum SNMP message size; bounds the receive buffer.
    pub message_max_size: i32,
    /// Community string (v1/v2c).
    pub community: Bytes,
    /// USM principal (v3), 1..=32 bytes.
    pub username: String,
    /// USM security level (v3).
    pub security_level: SecurityLevel,
    /// Authentication passphrase (v3), at least 8 bytes when auth is on.
    pub auth_password: String,
    /// HMAC choice (v3).
    pub auth_protocol: Option<AuthProtocol>,
    /// Privacy passphrase (v3), at least 8 bytes when privacy is on.
    pub priv_password: String,
    /// Cipher choice (v3).
    pub priv_protocol: Option<PrivProtocol>,
    /// Pre-seeds engine discovery (hex, optional `0x` prefix).
    pub security_engine_id: Option<String>,
    /// Context engine ID override (hex); defaults to the authoritative
    /// engine ID.
    pub context_engine_id: Option<String>,
    /// Per-ScopedPDU context name.
    pub context_name: String,
}

impl SessionConfig {
    /// Create a configuration with the required fields and defaults for
    /// the rest.
    pub fn new(version: Version, address: impl Into<String>) -> Self {
        Self {
            version,
            network: String::new(),
            address: address.into(),
            timeout: Duration::ZERO,
            retries: 0,
            message_max_size: 0,
            community: Bytes::new(),
            username: String::new(),
            security_level: SecurityLevel::NoAuthNoPriv,
            auth_password: String::new(),
            auth_protocol: None,
            priv_password: String::new(),
            priv_protocol: None,
            security_engine_id: None,
            context_engine_id: None,
            context_name: String::new(),
        }
    }

    /// Fill in defaults for options left at their zero values.
    pub fn apply_defaults(&mut self) {
        if self.network.is_empty() {
            self.network = "udp".into();
        }
        if self.timeout.is_zero() {
            self.timeout = TIMEOUT_DEFAULT;
        }
        if self.message_max_size == 0 {
            self.message_max_size = MSG_SIZE_DEFAULT;
        }
    }

    /// Check the configuration against the option table.
    ///
    /// Violations are [`Error::Argument`]; no I/O happens here.
    pub fn validate(&self) -> Result<()> {
        if self.network != "udp" {
            return Err(Error::argument(format!(
                "unsupported network {:?}",
                self.network
            )));
        }
        if self.address.is_empty() {
            return Err(Error::argument("Address is required"));
        }
        if self.message_max_size < MSG_SIZE_MINIMUM {
            return Err(Error::argument(format!(
                "MessageMaxSize is range {}..{}",
                MSG_SIZE_MINIMUM,
                i32::MAX
            )));
        }

        if self.version == Version::V3 {
            // RFC 3414 Section 5
            if self.username.is_empty() || self.username.len() > 32 {
                return Err(Error::argument("UserName length is range 1..32"));
            }
            if self.security_level.requires_auth() {
                // RFC 3414 Section 11.2
                if self.auth_password.len() < 8 {
                    return Err(Error::argument(
                        "AuthPassword is at least 8 characters in length",
                    ));
                }
                if self.auth_protocol.is_none() {
                    return Err(Error::argument("AuthProtocol is required"));
                }
            }
            if self.security_level.requires_priv() {
                if self.priv_password.len() < 8 {
                    return Err(Error::argument(
                        "PrivPassword is at least 8 characters in length",
                    ));
                }
                if self.priv_protocol.is_none() {
                    return Err(Error::argument("PrivProtocol is required"));
                }
            }
            self.security_engine_id_bytes()?;
            self.context_engine_id_bytes()?;
        }

        Ok(())
    }

    /// Parsed SecurityEngineId, when configured.
    pub(crate) fn security_engine_id_bytes(&self) -> Result<Option<Bytes>> {
        self.security_engine_id
            .as_deref()
            .map(parse_engine_id)
            .transpose()
    }

    /// Parsed ContextEngineId, when configured.
    pub(crate) fn context_engine_id_bytes(&self) -> Result<Option<Bytes>> {
        self.context_engine_id
            .as_deref()
            .map(parse_engine_id)
            .transpose()
    }
}
