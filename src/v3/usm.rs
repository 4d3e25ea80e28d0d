//! USM security parameters (RFC 3414 Section 2.4).
//!
//! Carried as an OCTET STRING inside the v3 message header, containing a
//! BER-encoded SEQUENCE:
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};

/// USM security parameters.
#[derive(Debug, Clone)]
pub struct UsmSecurityParams {
    /// Authoritative engine ID
    pub engine_id: Bytes,
    /// Engine boot count
    pub engine_boots: u32,
    /// Engine time (seconds since last boot)
    pub engine_time: u32,
    /// Username
    pub username: Bytes,
    /// Authentication parameters (truncated HMAC, or empty)
    pub auth_params: Bytes,
    /// Privacy parameters (salt, or empty)
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Create new USM security parameters.
    pub fn new(
        engine_id: impl Into<Bytes>,
        engine_boots: u32,
        engine_time: u32,
        username: impl Into<Bytes>,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            engine_time,
            username: username.into(),
            auth_params: Bytes::new(),
            priv_params: Bytes::new(),
        }
    }

    /// Create the empty parameters used by engine discovery.
    pub fn empty() -> Self {
        Self {
            engine_id: Bytes::new(),
            engine_boots: 0,
            engine_time: 0,
            username: Bytes::new(),
            auth_params: Bytes::new(),
            priv_params: Bytes::new(),
        }
    }

    /// Set authentication parameters.
    pub fn with_auth_params(mut self, auth_params: impl Into<Bytes>) -> Self {
        self.auth_params = auth_params.into();
        self
    }

    /// Set privacy parameters.
    pub fn with_priv_params(mut self, priv_params: impl Into<Bytes>) -> Self {
        self.priv_params = priv_params.into();
        self
    }

    /// Fill the auth params field with placeholder zeros.
    ///
    /// Authenticated messages are serialized with zeros in this field, the
    /// HMAC is computed over the whole message, and the zeros are then
    /// overwritten with the MAC.
    pub fn with_auth_placeholder(mut self, mac_len: usize) -> Self {
        self.auth_params = Bytes::from(vec![0u8; mac_len]);
        self
    }

    /// Encode to BER bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_time);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_boots);
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    /// Decode from BER bytes.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;

        let raw_boots = seq.read_integer()?;
        if raw_boots < 0 {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::InvalidEngineCounter { value: raw_boots },
            ));
        }

        let raw_time = seq.read_integer()?;
        if raw_time < 0 {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::InvalidEngineCounter { value: raw_time },
            ));
        }

        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots: raw_boots as u32,
            engine_time: raw_time as u32,
            username,
            auth_params,
            priv_params,
        })
    }

    /// Locate the msgAuthenticationParameters content octets within a
    /// serialized v3 message, returning (offset, length).
    ///
    /// HMAC handling zeroes and later overwrites this field in place, so
    /// the position must be resolved against the raw message rather than a
    /// parsed structure. A [`Decoder`] over the whole message walks the
    /// enclosing headers without slicing, which keeps its offsets absolute:
    /// message SEQUENCE, version, msgGlobalData (skipped whole),
    /// msgSecurityParameters header, USM SEQUENCE header, then the fifth
    /// USM field is the target.
    pub fn find_auth_params_offset(encoded_msg: &[u8]) -> Option<(usize, usize)> {
        let mut dec = Decoder::from_slice(encoded_msg);

        // headers only; their contents continue inline in the same buffer
        dec.expect_tag(tag::universal::SEQUENCE).ok()?;
        dec.read_integer().ok()?;

        let global_len = dec.expect_tag(tag::universal::SEQUENCE).ok()?;
        dec.read_bytes(global_len).ok()?;

        dec.expect_tag(tag::universal::OCTET_STRING).ok()?;
        dec.expect_tag(tag::universal::SEQUENCE).ok()?;

        // engineID, boots, time, username
        for _ in 0..4 {
            dec.read_tag().ok()?;
            let len = dec.read_length().ok()?;
            dec.read_bytes(len).ok()?;
        }

        let len = dec.expect_tag(tag::universal::OCTET_STRING).ok()?;
        let start = dec.offset();
        dec.read_bytes(len).ok()?;

        Some((start, len))
    }
}
