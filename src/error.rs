//! Error types for snmp-session.
//!
//! One [`Error`] enum covers every failure surface of the crate:
//!
//! - configuration and argument validation ([`Error::Argument`])
//! - BER encode/decode failures ([`Error::Encode`], [`Error::Decode`])
//! - network I/O and deadline expiry ([`Error::Io`], [`Error::Timeout`])
//! - SNMPv3 security failures ([`Error::AuthenticationFailed`],
//!   [`Error::DecryptionFailed`], [`Error::NotInTimeWindow`])
//! - agent Report PDUs ([`Error::Report`])
//! - correlation failures ([`Error::RequestIdMismatch`], [`Error::MsgIdMismatch`])
//!
//! All errors are `#[non_exhaustive]` so variants can be added without a
//! breaking release. [`Error::is_retriable`] encodes the retry policy: the
//! session's retry wrapper re-issues an attempt on any error except local
//! argument, OID, and codec faults, which resending cannot fix.

use std::time::Duration;

use crate::oid::Oid;
use crate::pdu::PduType;
use crate::v3::ReportStatus;
use crate::version::Version;

/// Result type alias using the library's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error kinds (SNMPv3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No authentication key available (level requires auth, keys not derived).
    NoAuthKey,
    /// HMAC verification failed.
    HmacMismatch,
    /// Authentication parameters have the wrong length.
    WrongMacLength { expected: usize, actual: usize },
    /// Could not locate the auth params field in the serialized message.
    AuthParamsNotFound,
    /// Response was not authenticated but the security level requires it.
    UnauthenticatedResponse,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthKey => write!(f, "no authentication key available"),
            Self::HmacMismatch => write!(f, "HMAC verification failed"),
            Self::WrongMacLength { expected, actual } => {
                write!(f, "wrong MAC length: expected {}, got {}", expected, actual)
            }
            Self::AuthParamsNotFound => write!(f, "could not locate auth params in message"),
            Self::UnauthenticatedResponse => {
                write!(f, "unauthenticated response at an authenticated level")
            }
        }
    }
}

/// Cryptographic error kinds (encryption/decryption).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoErrorKind {
    /// No privacy key available.
    NoPrivKey,
    /// Invalid key length for the cipher.
    InvalidKeyLength,
    /// Cipher operation failed.
    CipherError,
    /// privParameters field has the wrong length.
    InvalidPrivParamsLength { expected: usize, actual: usize },
    /// Ciphertext length is not a multiple of the cipher block size.
    InvalidCiphertextLength { length: usize, block_size: usize },
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPrivKey => write!(f, "no privacy key available"),
            Self::InvalidKeyLength => write!(f, "invalid key length"),
            Self::CipherError => write!(f, "cipher operation failed"),
            Self::InvalidPrivParamsLength { expected, actual } => {
                write!(
                    f,
                    "invalid privParameters length: expected {}, got {}",
                    expected, actual
                )
            }
            Self::InvalidCiphertextLength { length, block_size } => {
                write!(
                    f,
                    "ciphertext length {} not multiple of block size {}",
                    length, block_size
                )
            }
        }
    }
}

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Expected a different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data ended unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length form is not used by SNMP.
    IndefiniteLength,
    /// Definite-long length with a leading zero octet.
    NonMinimalLength,
    /// Length field uses too many octets.
    LengthTooLong { octets: usize },
    /// Length exceeds the decoder's sanity cap.
    LengthExceedsMax { length: usize, max: usize },
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Integer content does not fit the target type.
    IntegerOverflow { length: usize },
    /// OID sub-identifier overflowed 32 bits.
    SubidentifierOverflow,
    /// OID has more arcs than RFC 2578 allows.
    OidTooLong { count: usize, max: usize },
    /// Unknown SNMP version number.
    UnknownVersion(i32),
    /// Unknown PDU type tag.
    UnknownPduType(u8),
    /// Unknown tag where an SNMP value was expected.
    UnknownValueTag(u8),
    /// NULL with non-zero length.
    InvalidNull,
    /// IpAddress with a length other than 4.
    InvalidIpAddressLength { length: usize },
    /// msgFlags with privacy but without authentication.
    InvalidMsgFlags,
    /// Unknown msgSecurityModel.
    UnknownSecurityModel(i32),
    /// msgMaxSize below the RFC 3412 minimum (484 octets).
    MsgMaxSizeTooSmall { value: i32, minimum: i32 },
    /// Engine boots/time outside the RFC 3414 range.
    InvalidEngineCounter { value: i32 },
    /// Discovery response carried an engine ID outside 5..=32 octets.
    InvalidEngineId { length: usize },
    /// Response carried no data at all.
    EmptyResponse,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::NonMinimalLength => write!(f, "non-minimal length encoding"),
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::IntegerOverflow { length } => {
                write!(f, "integer too long: {} bytes", length)
            }
            Self::SubidentifierOverflow => write!(f, "OID subidentifier overflow"),
            Self::OidTooLong { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {}", v),
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{:02X}", t),
            Self::UnknownValueTag(t) => write!(f, "unknown value tag: 0x{:02X}", t),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {}", length)
            }
            Self::InvalidMsgFlags => write!(f, "invalid msgFlags: privacy without authentication"),
            Self::UnknownSecurityModel(m) => write!(f, "unknown security model: {}", m),
            Self::MsgMaxSizeTooSmall { value, minimum } => {
                write!(f, "msgMaxSize {} below RFC 3412 minimum {}", value, minimum)
            }
            Self::InvalidEngineCounter { value } => {
                write!(f, "engine boots/time out of range: {}", value)
            }
            Self::InvalidEngineId { length } => {
                write!(f, "engine ID length {} outside 5..=32 octets", length)
            }
            Self::EmptyResponse => write!(f, "empty response"),
        }
    }
}

/// Encode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// Engine has not been discovered yet.
    EngineNotDiscovered,
    /// Auth key not available for an authenticated message.
    MissingAuthKey,
    /// Privacy key not available for an encrypted message.
    MissingPrivKey,
    /// Could not locate the auth params position in the encoded message.
    MissingAuthParams,
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EngineNotDiscovered => write!(f, "engine not discovered"),
            Self::MissingAuthKey => write!(f, "auth key not available for encoding"),
            Self::MissingPrivKey => write!(f, "privacy key not available for encoding"),
            Self::MissingAuthParams => {
                write!(f, "could not find auth params position in encoded message")
            }
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty OID.
    Empty,
    /// Invalid arc value in a dotted string.
    InvalidArc,
    /// OID has too many arcs.
    TooManyArcs { count: usize, max: usize },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidArc => write!(f, "invalid arc value"),
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
        }
    }
}

/// SNMP protocol error status codes (RFC 3416).
///
/// Returned by agents in the error-status field of a Response PDU. Values
/// 0-5 are the SNMPv1 set; 6-18 were added by SNMPv2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown or future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from a raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to the raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// The main error type for all snmp-session operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration or operation parameter. Surfaced before any
    /// network I/O.
    #[error("invalid argument: {message}")]
    Argument { message: String },

    /// I/O error during network communication.
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    /// A per-attempt deadline expired (after retries if configured).
    #[error("timeout after {elapsed:?} (retries={retries})")]
    Timeout { elapsed: Duration, retries: u32 },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// Message assembly error.
    #[error("encode error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// Invalid OID format.
    #[error("invalid OID: {kind}")]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>,
    },

    /// HMAC verification failed or auth state was inconsistent (SNMPv3).
    #[error("authentication failed: {kind}")]
    AuthenticationFailed { kind: AuthErrorKind },

    /// ScopedPDU decryption failed (SNMPv3).
    #[error("decryption failed: {kind}")]
    DecryptionFailed { kind: CryptoErrorKind },

    /// ScopedPDU encryption failed (SNMPv3).
    #[error("encryption failed: {kind}")]
    EncryptionFailed { kind: CryptoErrorKind },

    /// Agent answered with a Report PDU (SNMPv3 out-of-band signaling).
    /// Carries the usmStats OID from the first varbind.
    #[error("received a report from the agent: {status}")]
    Report {
        status: ReportStatus,
        oid: Option<Oid>,
    },

    /// Message outside the 150-second engine time window (SNMPv3). The
    /// retry layer re-runs engine discovery before the next attempt.
    #[error("message not in time window")]
    NotInTimeWindow,

    /// Response request-id does not match the outstanding request.
    #[error("request ID mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Response msgID does not match the sent message (SNMPv3).
    #[error("msgID mismatch: expected {expected}, got {actual}")]
    MsgIdMismatch { expected: i32, actual: i32 },

    /// Response version does not match the session version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: Version, actual: Version },

    /// Response community does not match the request community (v1/v2c).
    #[error("community mismatch in response")]
    CommunityMismatch,

    /// Response carried a PDU type that is not valid in this context.
    #[error("unexpected PDU type: {pdu_type}")]
    UnexpectedPduType { pdu_type: PduType },

    /// Inbound engine ID differs from the discovered/configured one (SNMPv3).
    #[error("unknown engine ID")]
    UnknownEngineId,
}

impl Error {
    /// Create an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an encode error.
    pub fn encode(kind: EncodeErrorKind) -> Self {
        Self::Encode { kind }
    }

    /// Create an authentication error.
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self::AuthenticationFailed { kind }
    }

    /// Create a decryption error.
    pub fn decrypt(kind: CryptoErrorKind) -> Self {
        Self::DecryptionFailed { kind }
    }

    /// Create an encryption error.
    pub fn encrypt(kind: CryptoErrorKind) -> Self {
        Self::EncryptionFailed { kind }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Whether the retry wrapper should re-issue the attempt after this
    /// error.
    ///
    /// Argument, OID, and codec faults are local: resending the same request
    /// cannot change the outcome, so they terminate the retry loop. Every
    /// other error (network, timeout, security, reports, correlation
    /// mismatches) gets another attempt while the budget lasts.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::Argument { .. }
                | Self::Decode { .. }
                | Self::Encode { .. }
                | Self::InvalidOid { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_roundtrip() {
        for code in 0..=18 {
            let status = ErrorStatus::from_i32(code);
            assert_eq!(status.as_i32(), code);
        }
        assert_eq!(ErrorStatus::from_i32(2), ErrorStatus::NoSuchName);
        assert_eq!(ErrorStatus::from_i32(99), ErrorStatus::Unknown(99));
        assert_eq!(ErrorStatus::Unknown(99).as_i32(), 99);
    }

    #[test]
    fn test_retry_classification() {
        assert!(!Error::argument("bad").is_retriable());
        assert!(!Error::decode(0, DecodeErrorKind::TruncatedData).is_retriable());
        assert!(!Error::encode(EncodeErrorKind::EngineNotDiscovered).is_retriable());
        assert!(!Error::invalid_oid(OidErrorKind::Empty).is_retriable());

        assert!(
            Error::Timeout {
                elapsed: Duration::from_secs(5),
                retries: 0,
            }
            .is_retriable()
        );
        assert!(Error::NotInTimeWindow.is_retriable());
        assert!(
            Error::RequestIdMismatch {
                expected: 1,
                actual: 2,
            }
            .is_retriable()
        );
        assert!(Error::auth(AuthErrorKind::HmacMismatch).is_retriable());
    }
}
