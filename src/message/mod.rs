//! SNMP message envelopes and version-dispatched processing.
//!
//! - [`CommunityMessage`] - v1/v2c messages with community string auth
//! - [`V3Message`] - v3 messages with USM security
//! - [`MessageProcessing`] - assembly/verification seam used by the session
//!   (and by external multi-target probers)

mod community;
mod processing;
mod v3;

pub use community::CommunityMessage;
pub use processing::{MessageProcessing, SentMessage};
pub use v3::{
    MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, SecurityModel, V3Message, V3MessageData,
};
