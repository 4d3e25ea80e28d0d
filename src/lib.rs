//! # snmp-session
//!
//! Session-oriented async SNMP client for Rust, speaking SNMPv1, v2c, and
//! v3 (USM) over connected datagram sockets.
//!
//! ## Features
//!
//! - GetRequest / GetNextRequest / GetBulkRequest / traps / informs
//! - Multi-root `GetBulkWalk` with non-repeaters and result deduplication
//! - SNMPv3 USM: engine discovery, HMAC-MD5-96/SHA-96 authentication,
//!   DES-CBC and AES-128-CFB privacy, 150-second time-window handling
//! - Per-attempt deadlines with a configurable retry budget
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use snmp_session::{Session, SessionConfig, Version, oid};
//!
//! #[tokio::main]
//! async fn main() -> snmp_session::Result<()> {
//!     let mut config = SessionConfig::new(Version::V2c, "192.0.2.1:161");
//!     config.community = "public".into();
//!
//!     let mut session = Session::new(config)?;
//!     session.open().await?;
//!
//!     let response = session.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await?;
//!     println!("sysDescr: {}", response.varbinds[0]);
//!     Ok(())
//! }
//! ```
//!
//! ## SNMPv3
//!
//! ```rust,no_run
//! use snmp_session::v3::{AuthProtocol, PrivProtocol};
//! use snmp_session::{SecurityLevel, Session, SessionConfig, Version, oid};
//!
//! #[tokio::main]
//! async fn main() -> snmp_session::Result<()> {
//!     let mut config = SessionConfig::new(Version::V3, "192.0.2.1:161");
//!     config.username = "alice".into();
//!     config.security_level = SecurityLevel::AuthPriv;
//!     config.auth_protocol = Some(AuthProtocol::Sha1);
//!     config.auth_password = "authpass123".into();
//!     config.priv_protocol = Some(PrivProtocol::Aes);
//!     config.priv_password = "privpass123".into();
//!
//!     let mut session = Session::new(config)?;
//!     session.open().await?; // engine discovery happens here
//!
//!     let walk = session
//!         .get_bulk_walk(&[oid!(1, 3, 6, 1, 2, 1, 1)], 0, 10)
//!         .await?;
//!     for vb in &walk.varbinds {
//!         println!("{}", vb);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod client;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod transport;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

// Re-exports for convenience
pub use client::{Session, SessionConfig};
pub use error::{
    AuthErrorKind, CryptoErrorKind, DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus,
    OidErrorKind, Result,
};
pub use message::{MessageProcessing, SecurityLevel, SentMessage};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
pub use transport::{Transport, UdpTransport};
pub use v3::{AuthProtocol, PrivProtocol, ReportStatus};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
