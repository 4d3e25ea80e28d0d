//! SNMP client session.
//!
//! A [`Session`] owns one connected datagram transport and the
//! version-specific message processing state. Operations are strictly
//! serial: callers needing parallelism open one session per target.
//!
//! # Lifecycle
//!
//! A session is created closed. [`open`](Session::open) dials the socket
//! and, for SNMPv3, performs engine discovery; [`close`](Session::close)
//! releases the socket and forgets the USM state.
//!
//! ```no_run
//! use snmp_session::{Session, SessionConfig, Version, oid};
//!
//! # async fn example() -> snmp_session::Result<()> {
//! let mut config = SessionConfig::new(Version::V2c, "192.0.2.1:161");
//! config.community = "public".into();
//!
//! let mut session = Session::new(config)?;
//! session.open().await?;
//!
//! let response = session.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await?;
//! for vb in &response.varbinds {
//!     println!("{}", vb);
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```

mod config;
mod retry;
mod walk;

pub use config::{MSG_SIZE_DEFAULT, MSG_SIZE_MINIMUM, SessionConfig, TIMEOUT_DEFAULT};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::message::MessageProcessing;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::{Transport, UdpTransport};
use crate::v3::ReportStatus;
use crate::varbind::VarBind;
use crate::version::Version;

/// Floor for the receive buffer, independent of the configured
/// MessageMaxSize.
const RECV_BUFFER_SIZE: usize = 1500;

/// SNMP client session.
///
/// Generic over the transport; [`UdpTransport`] is the default. Tests and
/// simulator harnesses inject a scripted transport via
/// [`with_transport`](Session::with_transport).
#[derive(Debug)]
pub struct Session<T: Transport = UdpTransport> {
    config: SessionConfig,
    mp: Option<MessageProcessing>,
    transport: Option<T>,
}

impl Session<UdpTransport> {
    /// Create a closed session over UDP.
    ///
    /// The configuration is defaulted and validated here; a bad
    /// configuration fails without any socket being opened.
    pub fn new(mut config: SessionConfig) -> Result<Self> {
        config.apply_defaults();
        config.validate()?;
        Ok(Self {
            config,
            mp: None,
            transport: None,
        })
    }

    /// Dial the peer and, for SNMPv3, run engine discovery.
    ///
    /// Both steps run under the retry budget. If discovery keeps failing
    /// the socket is closed again and the error surfaces. Opening an open
    /// session is a no-op.
    pub async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }

        let transport = retry::run(self.config.retries, async |_| {
            match tokio::time::timeout(self.config.timeout, UdpTransport::connect(&self.config.address))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(self.timeout_error()),
            }
        })
        .await?;

        self.transport = Some(transport);
        self.handshake().await
    }
}

impl<T: Transport> Session<T> {
    /// Create an open session over an injected transport and run the
    /// handshake (v3 discovery) on it.
    pub async fn with_transport(mut config: SessionConfig, transport: T) -> Result<Self> {
        config.apply_defaults();
        config.validate()?;

        let mut session = Self {
            config,
            mp: None,
            transport: Some(transport),
        };
        session.handshake().await?;
        Ok(session)
    }

    /// Whether the session is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Release the socket and forget discovered USM state.
    pub fn close(&mut self) {
        self.transport = None;
        self.mp = None;
    }

    /// GetRequest for the OIDs (values are Null placeholders).
    pub async fn get(&mut self, oids: &[Oid]) -> Result<Pdu> {
        self.request(Pdu::with_oids(PduType::GetRequest, oids)).await
    }

    /// GetNextRequest for the OIDs.
    pub async fn get_next(&mut self, oids: &[Oid]) -> Result<Pdu> {
        self.request(Pdu::with_oids(PduType::GetNextRequest, oids))
            .await
    }

    /// GetBulkRequest (RFC 3416 Section 3). Requires SNMPv2c or later.
    pub async fn get_bulk(
        &mut self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> Result<Pdu> {
        self.check_bulk_args(non_repeaters, max_repetitions)?;

        let mut pdu = Pdu::with_oids(PduType::GetBulkRequest, oids);
        pdu.set_bulk_fields(non_repeaters, max_repetitions);
        self.request(pdu).await
    }

    /// Send an SNMPv2 trap. Unconfirmed; success means the datagram was
    /// written. Requires SNMPv2c or later.
    pub async fn v2_trap(&mut self, varbinds: Vec<VarBind>) -> Result<()> {
        self.notify(PduType::TrapV2, varbinds).await
    }

    /// Send an InformRequest. Confirmed: the agent's acknowledgement is
    /// awaited and verified, then discarded. Requires SNMPv2c or later.
    pub async fn inform(&mut self, varbinds: Vec<VarBind>) -> Result<()> {
        self.notify(PduType::InformRequest, varbinds).await
    }

    /// Issue a confirmed request under the retry budget.
    async fn request(&mut self, pdu: Pdu) -> Result<Pdu> {
        let mut resync = false;
        retry::run(self.config.retries, async |_| {
            match self.attempt(&pdu, &mut resync).await? {
                Some(response) => Ok(response),
                None => Err(Error::UnexpectedPduType {
                    pdu_type: pdu.pdu_type,
                }),
            }
        })
        .await
    }

    /// Send a notification (trap or inform) under the retry budget.
    async fn notify(&mut self, pdu_type: PduType, varbinds: Vec<VarBind>) -> Result<()> {
        if self.config.version < Version::V2c {
            return Err(Error::argument(format!(
                "{} requires SNMPv2c or later",
                pdu_type
            )));
        }

        let pdu = Pdu::with_varbinds(pdu_type, varbinds);
        let mut resync = false;
        retry::run(self.config.retries, async |_| {
            self.attempt(&pdu, &mut resync).await.map(|_| ())
        })
        .await
    }

    /// One attempt: re-run discovery if the previous attempt hit the time
    /// window, then send.
    async fn attempt(&mut self, pdu: &Pdu, resync: &mut bool) -> Result<Option<Pdu>> {
        if std::mem::take(resync) {
            tracing::debug!(
                target: "snmp_session::client",
                "re-running engine discovery after notInTimeWindow"
            );
            self.discover().await?;
        }

        match self.send_pdu(pdu).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if matches!(err, Error::NotInTimeWindow) {
                    *resync = true;
                }
                Err(err)
            }
        }
    }

    /// The send/receive cycle for one PDU.
    ///
    /// Returns `None` for unconfirmed PDU types (traps), which complete as
    /// soon as the datagram is written.
    async fn send_pdu(&mut self, pdu: &Pdu) -> Result<Option<Pdu>> {
        let (config, mp, transport) = self.parts()?;

        let sent = mp.prepare_outgoing_message(pdu.clone())?;

        transmit(config, transport, &sent.bytes).await?;
        if !sent.pdu_type.is_confirmed() {
            return Ok(None);
        }

        let data = receive(config, transport).await?;
        let response = mp.prepare_data_elements(&sent, data)?;

        // The varbind-less discovery probe must see its Report as data;
        // every real request carries varbinds and gets the Report check.
        if !pdu.varbinds.is_empty() {
            check_pdu(config.version, &response)?;
        }

        Ok(Some(response))
    }

    /// Create message processing state and run v3 engine discovery.
    ///
    /// On persistent discovery failure the session is closed again.
    async fn handshake(&mut self) -> Result<()> {
        self.mp = Some(MessageProcessing::new(&self.config)?);

        if self.config.version == Version::V3 {
            let result = retry::run(self.config.retries, async |_| self.discover().await).await;
            if let Err(err) = result {
                self.close();
                return Err(err);
            }
        }

        Ok(())
    }

    /// One engine discovery exchange (v3).
    async fn discover(&mut self) -> Result<()> {
        let (config, mp, transport) = self.parts()?;

        let sent = mp.prepare_discovery_message()?;
        transmit(config, transport, &sent.bytes).await?;
        let data = receive(config, transport).await?;
        mp.process_discovery(&sent, data)
    }

    /// Split borrows for the send path; fails when the session is closed.
    fn parts(&mut self) -> Result<(&SessionConfig, &mut MessageProcessing, &mut T)> {
        match (&mut self.mp, &mut self.transport) {
            (Some(mp), Some(transport)) => Ok((&self.config, mp, transport)),
            _ => Err(Error::argument("session is not open")),
        }
    }

    fn check_bulk_args(&self, non_repeaters: i32, max_repetitions: i32) -> Result<()> {
        if self.config.version < Version::V2c {
            return Err(Error::argument("GetBulkRequest requires SNMPv2c or later"));
        }
        // RFC 3416 Section 3
        if non_repeaters < 0 {
            return Err(Error::argument(format!(
                "NonRepeaters is range 0..{}",
                i32::MAX
            )));
        }
        if max_repetitions < 0 {
            return Err(Error::argument(format!(
                "MaxRepetitions is range 0..{}",
                i32::MAX
            )));
        }
        Ok(())
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            elapsed: self.config.timeout,
            retries: self.config.retries,
        }
    }
}

/// Write one datagram under the per-attempt deadline.
async fn transmit<T: Transport>(
    config: &SessionConfig,
    transport: &mut T,
    bytes: &Bytes,
) -> Result<()> {
    match tokio::time::timeout(config.timeout, transport.send(bytes)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            elapsed: config.timeout,
            retries: config.retries,
        }),
    }
}

/// Read one datagram under the per-attempt deadline.
///
/// The buffer is sized `max(MessageMaxSize, 1500)`.
async fn receive<T: Transport>(config: &SessionConfig, transport: &mut T) -> Result<Bytes> {
    let size = (config.message_max_size as usize).max(RECV_BUFFER_SIZE);
    let mut buf = vec![0u8; size];

    let len = match tokio::time::timeout(config.timeout, transport.recv(&mut buf)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(Error::Timeout {
                elapsed: config.timeout,
                retries: config.retries,
            });
        }
    };

    buf.truncate(len);
    Ok(Bytes::from(buf))
}

/// Convert a v3 Report PDU into its typed error.
///
/// `usmStatsNotInTimeWindows` becomes the distinguished
/// [`Error::NotInTimeWindow`] that the retry layer answers with a
/// re-discovery.
fn check_pdu(version: Version, pdu: &Pdu) -> Result<()> {
    if version != Version::V3 {
        return Ok(());
    }
    match ReportStatus::from_pdu(pdu) {
        Some(ReportStatus::NotInTimeWindows) => Err(Error::NotInTimeWindow),
        Some(status) => {
            let oid = pdu.varbinds.first().map(|vb| vb.oid.clone());
            tracing::debug!(
                target: "snmp_session::client",
                %status,
                "received a report from the agent"
            );
            Err(Error::Report { status, oid })
        }
        None => Ok(()),
    }
}
