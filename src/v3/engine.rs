//! Engine state, time window, and Report classification (RFC 3414).
//!
//! A non-authoritative engine (this client) tracks the authoritative
//! engine's boots and time counters and the local instant at which they
//! were learned. Authenticated messages outside the 150-second window are
//! rejected; Report PDUs carry USM error signaling out of band.

use std::time::Instant;

use bytes::Bytes;

use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};

/// Time window in seconds (RFC 3414 Section 2.2.3).
pub const TIME_WINDOW: u32 = 150;

/// Maximum snmpEngineTime value (RFC 3414 Section 2.2.1, 31-bit counter).
pub const MAX_ENGINE_TIME: u32 = 2_147_483_647;

/// Discovered authoritative engine state.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Authoritative engine ID
    pub engine_id: Bytes,
    /// Engine boot count
    pub engine_boots: u32,
    /// Engine time at last sync
    pub engine_time: u32,
    /// Local time when engine_time was learned
    pub synced_at: Instant,
    /// Highest engine time seen (anti-replay, RFC 3414 Section 2.3)
    pub latest_received_engine_time: u32,
}

impl EngineState {
    /// Create engine state from a discovery response.
    pub fn new(engine_id: Bytes, engine_boots: u32, engine_time: u32) -> Self {
        Self {
            engine_id,
            engine_boots,
            engine_time,
            synced_at: Instant::now(),
            latest_received_engine_time: engine_time,
        }
    }

    /// Estimate the authoritative engine's current time.
    ///
    /// Adds elapsed local time to the synced value; the 31-bit counter
    /// pins at [`MAX_ENGINE_TIME`] rather than wrapping.
    pub fn estimated_time(&self) -> u32 {
        let elapsed = u32::try_from(self.synced_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        match self.engine_time.checked_add(elapsed) {
            Some(time) if time <= MAX_ENGINE_TIME => time,
            _ => MAX_ENGINE_TIME,
        }
    }

    /// Update boots/time from an inbound authenticated message.
    ///
    /// Per RFC 3414 Section 3.2 step 7b, state only moves forward:
    /// a higher boots value, or an equal boots value with a time above the
    /// highest seen so far. Returns whether the state changed.
    pub fn update_time(&mut self, msg_boots: u32, msg_time: u32) -> bool {
        use std::cmp::Ordering;

        let advances = match msg_boots.cmp(&self.engine_boots) {
            Ordering::Greater => true,
            Ordering::Equal => msg_time > self.latest_received_engine_time,
            Ordering::Less => false,
        };

        if advances {
            self.engine_boots = msg_boots;
            self.engine_time = msg_time;
            self.latest_received_engine_time = msg_time;
            self.synced_at = Instant::now();
        }
        advances
    }

    /// Check an inbound message against the time window.
    ///
    /// RFC 3414 Section 2.2.3: outside the window when local boots is
    /// latched at its maximum, when the boots values differ, or when the
    /// times diverge by more than [`TIME_WINDOW`] seconds.
    pub fn is_in_time_window(&self, msg_boots: u32, msg_time: u32) -> bool {
        let latched = self.engine_boots == MAX_ENGINE_TIME;
        msg_boots == self.engine_boots
            && !latched
            && msg_time.abs_diff(self.estimated_time()) <= TIME_WINDOW
    }
}

/// usmStats instance OIDs carried by Report PDUs (RFC 3414 Section 5).
pub mod report_oids {
    use crate::oid;
    use crate::oid::Oid;

    /// 1.3.6.1.6.3.15.1.1.1.0
    pub fn unsupported_sec_levels() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0)
    }

    /// 1.3.6.1.6.3.15.1.1.2.0
    pub fn not_in_time_windows() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0)
    }

    /// 1.3.6.1.6.3.15.1.1.3.0
    pub fn unknown_user_names() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0)
    }

    /// 1.3.6.1.6.3.15.1.1.4.0
    pub fn unknown_engine_ids() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0)
    }

    /// 1.3.6.1.6.3.15.1.1.5.0
    pub fn wrong_digests() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0)
    }

    /// 1.3.6.1.6.3.15.1.1.6.0
    pub fn decryption_errors() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0)
    }
}

/// USM condition signaled by a Report PDU, identified by the first
/// varbind's OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportStatus {
    UnsupportedSecLevels,
    NotInTimeWindows,
    UnknownUserNames,
    UnknownEngineIds,
    WrongDigests,
    DecryptionErrors,
    /// Report with an empty varbind list.
    Unspecified,
    /// Report with a varbind outside the usmStats table.
    Other,
}

impl ReportStatus {
    /// Classify a Report varbind OID.
    pub fn from_oid(oid: &Oid) -> Self {
        if *oid == report_oids::unsupported_sec_levels() {
            Self::UnsupportedSecLevels
        } else if *oid == report_oids::not_in_time_windows() {
            Self::NotInTimeWindows
        } else if *oid == report_oids::unknown_user_names() {
            Self::UnknownUserNames
        } else if *oid == report_oids::unknown_engine_ids() {
            Self::UnknownEngineIds
        } else if *oid == report_oids::wrong_digests() {
            Self::WrongDigests
        } else if *oid == report_oids::decryption_errors() {
            Self::DecryptionErrors
        } else {
            Self::Other
        }
    }

    /// Classify a Report PDU by its first varbind.
    ///
    /// Returns `None` when the PDU is not a Report.
    pub fn from_pdu(pdu: &Pdu) -> Option<Self> {
        if pdu.pdu_type != PduType::Report {
            return None;
        }
        Some(match pdu.varbinds.first() {
            Some(vb) => Self::from_oid(&vb.oid),
            None => Self::Unspecified,
        })
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UnsupportedSecLevels => "usmStatsUnsupportedSecLevels",
            Self::NotInTimeWindows => "usmStatsNotInTimeWindows",
            Self::UnknownUserNames => "usmStatsUnknownUserNames",
            Self::UnknownEngineIds => "usmStatsUnknownEngineIDs",
            Self::WrongDigests => "usmStatsWrongDigests",
            Self::DecryptionErrors => "usmStatsDecryptionErrors",
            Self::Unspecified => "unspecified report",
            Self::Other => "unrecognized report",
        };
        write!(f, "{}", name)
    }
}
