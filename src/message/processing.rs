//! Version-dispatched message assembly and verification.
//!
//! [`MessageProcessing`] is the seam between the session and the wire. It
//! owns the per-session security state (community string, or USM
//! credentials plus the discovered engine state, localized keys, and the
//! privacy salt counter) and exposes two operations:
//!
//! - [`prepare_outgoing_message`](MessageProcessing::prepare_outgoing_message):
//!   assign a fresh random request-id (and msgID for v3), wrap the PDU in
//!   the version's envelope, apply privacy then authentication, and
//!   serialize.
//! - [`prepare_data_elements`](MessageProcessing::prepare_data_elements):
//!   decode an inbound datagram, verify authentication and the engine time
//!   window, decrypt, and correlate against the sent message.
//!
//! The discovery probe helpers build and consume the engineID discovery
//! exchange (RFC 3414 Section 4). External callers that multiplex many
//! targets (e.g. a parallel scanner) drive these methods directly without
//! a session.

use bytes::Bytes;

use crate::ber::Decoder;
use crate::client::SessionConfig;
use crate::error::{
    AuthErrorKind, CryptoErrorKind, DecodeErrorKind, EncodeErrorKind, Error, Result,
};
use crate::message::{
    CommunityMessage, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData,
};
use crate::pdu::{Pdu, PduType};
use crate::util::HexBytes;
use crate::v3::auth::{authenticate_message, verify_message};
use crate::v3::{
    AuthProtocol, ENGINE_ID_MAX_LEN, ENGINE_ID_MIN_LEN, EngineState, LocalizedKey, PrivKey,
    PrivProtocol, SaltCounter, UsmSecurityParams,
};
use crate::version::Version;

/// A serialized outgoing message with its correlation state.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// The serialized message, ready for the wire.
    pub bytes: Bytes,
    /// Request-id assigned to the PDU.
    pub request_id: i32,
    /// msgID assigned to the v3 header (None for v1/v2c).
    pub msg_id: Option<i32>,
    /// PDU type of the request.
    pub pdu_type: PduType,
}

/// Version-dispatched message processing state.
#[derive(Debug)]
pub enum MessageProcessing {
    /// v1/v2c community processing
    Community(CommunityProcessing),
    /// v3 USM processing
    Usm(Box<UsmProcessing>),
}

impl MessageProcessing {
    /// Build message processing state from a validated session config.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        match config.version {
            Version::V1 | Version::V2c => Ok(Self::Community(CommunityProcessing {
                version: config.version,
                community: config.community.clone(),
            })),
            Version::V3 => Ok(Self::Usm(Box::new(UsmProcessing::new(config)?))),
        }
    }

    /// Assemble and serialize an outgoing message for the PDU.
    ///
    /// Assigns a cryptographically random non-zero request-id; for v3 also
    /// a fresh msgID, and applies privacy then authentication.
    pub fn prepare_outgoing_message(&mut self, pdu: Pdu) -> Result<SentMessage> {
        match self {
            Self::Community(community) => community.prepare_outgoing_message(pdu),
            Self::Usm(usm) => usm.prepare_outgoing_message(pdu),
        }
    }

    /// Decode and verify an inbound datagram against the sent message.
    pub fn prepare_data_elements(&mut self, sent: &SentMessage, data: Bytes) -> Result<Pdu> {
        match self {
            Self::Community(community) => community.prepare_data_elements(sent, data),
            Self::Usm(usm) => usm.prepare_data_elements(sent, data),
        }
    }

    /// Whether v3 engine discovery has completed.
    ///
    /// Always true for v1/v2c, which have no engine state.
    pub fn is_discovered(&self) -> bool {
        match self {
            Self::Community(_) => true,
            Self::Usm(usm) => usm.engine.is_some(),
        }
    }

    /// Build the engine discovery probe (v3 only).
    pub fn prepare_discovery_message(&mut self) -> Result<SentMessage> {
        match self {
            Self::Community(_) => Err(Error::argument(
                "engine discovery is only meaningful for SNMPv3",
            )),
            Self::Usm(usm) => Ok(usm.prepare_discovery_message()),
        }
    }

    /// Consume the discovery Report and cache the engine state (v3 only).
    pub fn process_discovery(&mut self, sent: &SentMessage, data: Bytes) -> Result<()> {
        match self {
            Self::Community(_) => Err(Error::argument(
                "engine discovery is only meaningful for SNMPv3",
            )),
            Self::Usm(usm) => usm.process_discovery(sent, data),
        }
    }
}

/// v1/v2c message processing: community attach on send, community echo
/// check on receive.
#[derive(Debug)]
pub struct CommunityProcessing {
    version: Version,
    community: Bytes,
}

impl CommunityProcessing {
    fn prepare_outgoing_message(&mut self, mut pdu: Pdu) -> Result<SentMessage> {
        pdu.request_id = random_request_id();
        let pdu_type = pdu.pdu_type;
        let request_id = pdu.request_id;

        let message = CommunityMessage::new(self.version, self.community.clone(), pdu);

        Ok(SentMessage {
            bytes: message.encode(),
            request_id,
            msg_id: None,
            pdu_type,
        })
    }

    fn prepare_data_elements(&mut self, sent: &SentMessage, data: Bytes) -> Result<Pdu> {
        let message = CommunityMessage::decode(data)?;

        if message.version != self.version {
            return Err(Error::VersionMismatch {
                expected: self.version,
                actual: message.version,
            });
        }
        if message.community != self.community {
            tracing::debug!(
                target: "snmp_session::message",
                expected = %String::from_utf8_lossy(&self.community),
                "community mismatch in response"
            );
            return Err(Error::CommunityMismatch);
        }

        let pdu = message.into_pdu();

        if pdu.pdu_type != PduType::Response {
            return Err(Error::UnexpectedPduType {
                pdu_type: pdu.pdu_type,
            });
        }
        if pdu.request_id != sent.request_id {
            return Err(Error::RequestIdMismatch {
                expected: sent.request_id,
                actual: pdu.request_id,
            });
        }

        Ok(pdu)
    }
}

/// v3 USM message processing: engine state, localized keys, privacy salt.
#[derive(Debug)]
pub struct UsmProcessing {
    username: Bytes,
    security_level: SecurityLevel,
    auth: Option<(AuthProtocol, String)>,
    privacy: Option<(PrivProtocol, String)>,
    /// Pre-seeded engine ID from configuration; cross-checked at discovery.
    configured_engine_id: Option<Bytes>,
    /// Context engine ID override; defaults to the authoritative engine ID.
    context_engine_id: Option<Bytes>,
    context_name: Bytes,
    message_max_size: i32,
    engine: Option<EngineState>,
    auth_key: Option<LocalizedKey>,
    priv_key: Option<PrivKey>,
    salt: SaltCounter,
}

impl UsmProcessing {
    fn new(config: &SessionConfig) -> Result<Self> {
        let auth = if config.security_level.requires_auth() {
            let protocol = config
                .auth_protocol
                .ok_or_else(|| Error::argument("AuthProtocol is required for this level"))?;
            Some((protocol, config.auth_password.clone()))
        } else {
            None
        };

        let privacy = if config.security_level.requires_priv() {
            let protocol = config
                .priv_protocol
                .ok_or_else(|| Error::argument("PrivProtocol is required for this level"))?;
            Some((protocol, config.priv_password.clone()))
        } else {
            None
        };

        let mut usm = Self {
            username: Bytes::copy_from_slice(config.username.as_bytes()),
            security_level: config.security_level,
            auth,
            privacy,
            configured_engine_id: config.security_engine_id_bytes()?,
            context_engine_id: config.context_engine_id_bytes()?,
            context_name: Bytes::copy_from_slice(config.context_name.as_bytes()),
            message_max_size: config.message_max_size,
            engine: None,
            auth_key: None,
            priv_key: None,
            salt: SaltCounter::new(),
        };

        // A configured engine ID lets keys be derived before discovery;
        // boots/time still come from the discovery exchange.
        if let Some(engine_id) = usm.configured_engine_id.clone() {
            usm.derive_keys(&engine_id);
        }

        Ok(usm)
    }

    /// Localize keys for the engine ID.
    fn derive_keys(&mut self, engine_id: &[u8]) {
        if let Some((protocol, password)) = &self.auth {
            self.auth_key = Some(LocalizedKey::from_password(
                *protocol,
                password.as_bytes(),
                engine_id,
            ));
        }
        if let Some((priv_protocol, password)) = &self.privacy {
            // privacy keys localize with the auth protocol (RFC 3414 8.2)
            if let Some((auth_protocol, _)) = &self.auth {
                self.priv_key = Some(PrivKey::from_password(
                    *auth_protocol,
                    *priv_protocol,
                    password.as_bytes(),
                    engine_id,
                ));
            }
        }
    }

    fn prepare_outgoing_message(&mut self, mut pdu: Pdu) -> Result<SentMessage> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::encode(EncodeErrorKind::EngineNotDiscovered))?;

        pdu.request_id = random_request_id();
        let request_id = pdu.request_id;
        let pdu_type = pdu.pdu_type;
        let msg_id = random_request_id();

        let engine_boots = engine.engine_boots;
        let engine_time = engine.estimated_time();
        let engine_id = engine.engine_id.clone();

        let context_engine_id = self
            .context_engine_id
            .clone()
            .unwrap_or_else(|| engine_id.clone());
        let scoped = ScopedPdu::new(context_engine_id, self.context_name.clone(), pdu);

        // privacy first, then authentication (RFC 3412 Section 7.1)
        let (data, priv_params) = if self.security_level.requires_priv() {
            let priv_key = self
                .priv_key
                .as_ref()
                .ok_or_else(|| Error::encode(EncodeErrorKind::MissingPrivKey))?;

            let plaintext = scoped.encode_to_bytes();
            let (ciphertext, priv_params) =
                priv_key.encrypt(&plaintext, engine_boots, engine_time, self.salt.next())?;

            (V3MessageData::Encrypted(ciphertext), priv_params)
        } else {
            (V3MessageData::Plaintext(scoped), Bytes::new())
        };

        let mut usm_params =
            UsmSecurityParams::new(engine_id, engine_boots, engine_time, self.username.clone());
        if self.security_level.requires_auth() {
            let mac_len = self
                .auth_key
                .as_ref()
                .map(|k| k.mac_len())
                .unwrap_or(AuthProtocol::Md5.mac_len());
            usm_params = usm_params.with_auth_placeholder(mac_len);
        }
        if self.security_level.requires_priv() {
            usm_params = usm_params.with_priv_params(priv_params);
        }

        let msg_flags = MsgFlags::new(self.security_level, pdu_type.is_confirmed());
        let global_data = MsgGlobalData::new(msg_id, self.message_max_size, msg_flags);

        let message = V3Message {
            global_data,
            security_params: usm_params.encode(),
            data,
        };

        let mut encoded = message.encode().to_vec();

        if self.security_level.requires_auth() {
            let auth_key = self
                .auth_key
                .as_ref()
                .ok_or_else(|| Error::encode(EncodeErrorKind::MissingAuthKey))?;

            let (offset, len) = UsmSecurityParams::find_auth_params_offset(&encoded)
                .ok_or_else(|| Error::encode(EncodeErrorKind::MissingAuthParams))?;
            authenticate_message(auth_key, &mut encoded, offset, len);
        }

        Ok(SentMessage {
            bytes: Bytes::from(encoded),
            request_id,
            msg_id: Some(msg_id),
            pdu_type,
        })
    }

    fn prepare_data_elements(&mut self, sent: &SentMessage, data: Bytes) -> Result<Pdu> {
        let message = V3Message::decode(data.clone())?;

        if let Some(expected) = sent.msg_id
            && message.msg_id() != expected
        {
            return Err(Error::MsgIdMismatch {
                expected,
                actual: message.msg_id(),
            });
        }

        let params = UsmSecurityParams::decode(message.security_params.clone())?;
        let received_level = message.security_level();

        if received_level.requires_auth() {
            self.verify_inbound_auth(&data, &params)?;
        }

        if let Some(engine) = &self.engine
            && !params.engine_id.is_empty()
            && params.engine_id != engine.engine_id
        {
            tracing::debug!(
                target: "snmp_session::usm",
                received = %HexBytes(&params.engine_id),
                expected = %HexBytes(&engine.engine_id),
                "engine ID mismatch in response"
            );
            return Err(Error::UnknownEngineId);
        }

        let scoped = match message.data {
            V3MessageData::Plaintext(scoped) => scoped,
            V3MessageData::Encrypted(ciphertext) => {
                let priv_key = self
                    .priv_key
                    .as_ref()
                    .ok_or_else(|| Error::decrypt(CryptoErrorKind::NoPrivKey))?;

                let plaintext = priv_key.decrypt(
                    &ciphertext,
                    params.engine_boots,
                    params.engine_time,
                    &params.priv_params,
                )?;

                let mut decoder = Decoder::new(plaintext);
                ScopedPdu::decode(&mut decoder)?
            }
        };

        let pdu = scoped.pdu;

        // Reports are legitimately unauthenticated USM signaling; anything
        // else must match the session's security level.
        if pdu.pdu_type == PduType::Report {
            return Ok(pdu);
        }

        if self.security_level.requires_auth() && !received_level.requires_auth() {
            return Err(Error::auth(AuthErrorKind::UnauthenticatedResponse));
        }

        if pdu.pdu_type != PduType::Response {
            return Err(Error::UnexpectedPduType {
                pdu_type: pdu.pdu_type,
            });
        }
        if pdu.request_id != sent.request_id {
            return Err(Error::RequestIdMismatch {
                expected: sent.request_id,
                actual: pdu.request_id,
            });
        }

        Ok(pdu)
    }

    /// HMAC and time-window checks for an authenticated inbound message.
    fn verify_inbound_auth(&mut self, raw: &[u8], params: &UsmSecurityParams) -> Result<()> {
        let auth_key = self
            .auth_key
            .as_ref()
            .ok_or_else(|| Error::auth(AuthErrorKind::NoAuthKey))?;

        let (offset, len) = UsmSecurityParams::find_auth_params_offset(raw)
            .ok_or_else(|| Error::auth(AuthErrorKind::AuthParamsNotFound))?;

        if len != auth_key.mac_len() {
            return Err(Error::auth(AuthErrorKind::WrongMacLength {
                expected: auth_key.mac_len(),
                actual: len,
            }));
        }

        if !verify_message(auth_key, raw, offset, len) {
            tracing::debug!(target: "snmp_session::usm", "inbound HMAC verification failed");
            return Err(Error::auth(AuthErrorKind::HmacMismatch));
        }

        if let Some(engine) = &mut self.engine {
            if !engine.is_in_time_window(params.engine_boots, params.engine_time) {
                tracing::debug!(
                    target: "snmp_session::usm",
                    msg_boots = params.engine_boots,
                    msg_time = params.engine_time,
                    local_boots = engine.engine_boots,
                    local_time = engine.estimated_time(),
                    "inbound message outside time window"
                );
                return Err(Error::NotInTimeWindow);
            }
            engine.update_time(params.engine_boots, params.engine_time);
        }

        Ok(())
    }

    /// Build the discovery probe: empty engine ID and username,
    /// noAuthNoPriv, reportable, varbind-less GetRequest.
    fn prepare_discovery_message(&mut self) -> SentMessage {
        let mut pdu = Pdu::with_oids(PduType::GetRequest, &[]);
        pdu.request_id = random_request_id();
        let request_id = pdu.request_id;
        let msg_id = random_request_id();

        let global_data = MsgGlobalData::new(
            msg_id,
            self.message_max_size,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, true),
        );
        let scoped = ScopedPdu::with_empty_context(pdu);
        let message = V3Message::new(global_data, UsmSecurityParams::empty().encode(), scoped);

        SentMessage {
            bytes: message.encode(),
            request_id,
            msg_id: Some(msg_id),
            pdu_type: PduType::GetRequest,
        }
    }

    /// Consume the discovery Report: cache engineID/boots/time, derive
    /// localized keys, reset the privacy salt on a boots change.
    fn process_discovery(&mut self, sent: &SentMessage, data: Bytes) -> Result<()> {
        let message = V3Message::decode(data)?;

        if let Some(expected) = sent.msg_id
            && message.msg_id() != expected
        {
            return Err(Error::MsgIdMismatch {
                expected,
                actual: message.msg_id(),
            });
        }

        let params = UsmSecurityParams::decode(message.security_params.clone())?;

        if params.engine_id.len() < ENGINE_ID_MIN_LEN || params.engine_id.len() > ENGINE_ID_MAX_LEN
        {
            return Err(Error::decode(
                0,
                DecodeErrorKind::InvalidEngineId {
                    length: params.engine_id.len(),
                },
            ));
        }

        if let Some(configured) = &self.configured_engine_id
            && *configured != params.engine_id
        {
            tracing::debug!(
                target: "snmp_session::usm",
                configured = %HexBytes(configured),
                discovered = %HexBytes(&params.engine_id),
                "discovered engine ID differs from configured SecurityEngineId"
            );
            return Err(Error::UnknownEngineId);
        }

        match message.pdu() {
            Some(pdu) if pdu.pdu_type == PduType::Report => {}
            Some(pdu) => {
                return Err(Error::UnexpectedPduType {
                    pdu_type: pdu.pdu_type,
                });
            }
            // encrypted discovery response makes no sense
            None => {
                return Err(Error::decode(0, DecodeErrorKind::EmptyResponse));
            }
        }

        let boots_changed = self
            .engine
            .as_ref()
            .is_some_and(|e| e.engine_boots != params.engine_boots);
        if boots_changed {
            self.salt.reset();
        }

        let engine_id_changed = self
            .engine
            .as_ref()
            .is_none_or(|e| e.engine_id != params.engine_id);

        tracing::debug!(
            target: "snmp_session::usm",
            engine_id = %HexBytes(&params.engine_id),
            engine_boots = params.engine_boots,
            engine_time = params.engine_time,
            "discovered engine"
        );

        self.engine = Some(EngineState::new(
            params.engine_id.clone(),
            params.engine_boots,
            params.engine_time,
        ));

        if engine_id_changed || self.auth_key.is_none() {
            self.derive_keys(&params.engine_id);
        }

        Ok(())
    }
}

/// Generate a cryptographically random, non-zero, positive request-id.
fn random_request_id() -> i32 {
    let mut buf = [0u8; 4];
    loop {
        getrandom::fill(&mut buf).expect("getrandom failed");
        let id = i32::from_be_bytes(buf) & 0x7FFF_FFFF;
        if id != 0 {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn v2c_config() -> SessionConfig {
        let mut config = SessionConfig::new(Version::V2c, "127.0.0.1:161");
        config.community = Bytes::from_static(b"public");
        config.apply_defaults();
        config
    }

    fn v3_config() -> SessionConfig {
        let mut config = SessionConfig::new(Version::V3, "127.0.0.1:161");
        config.username = "alice".into();
        config.security_level = SecurityLevel::AuthNoPriv;
        config.auth_protocol = Some(AuthProtocol::Sha1);
        config.auth_password = "maplesyrup".into();
        config.apply_defaults();
        config
    }

    #[test]
    fn test_random_request_id_is_positive_nonzero() {
        for _ in 0..100 {
            let id = random_request_id();
            assert!(id > 0);
        }
    }

    #[test]
    fn test_community_assigns_fresh_request_ids() {
        let mut mp = MessageProcessing::new(&v2c_config()).unwrap();

        let pdu = Pdu::with_oids(PduType::GetRequest, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let first = mp.prepare_outgoing_message(pdu.clone()).unwrap();
        let second = mp.prepare_outgoing_message(pdu).unwrap();

        assert_ne!(first.request_id, 0);
        assert_ne!(first.request_id, second.request_id);
        assert!(first.msg_id.is_none());
        assert_eq!(first.pdu_type, PduType::GetRequest);
    }

    #[test]
    fn test_community_roundtrip_and_correlation() {
        let mut mp = MessageProcessing::new(&v2c_config()).unwrap();
        let sent = mp
            .prepare_outgoing_message(Pdu::with_oids(
                PduType::GetRequest,
                &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)],
            ))
            .unwrap();

        // agent echoes the request-id in a Response
        let mut response = Pdu::response(vec![crate::varbind::VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            crate::value::Value::from("linux"),
        )]);
        response.request_id = sent.request_id;
        let reply =
            CommunityMessage::new(Version::V2c, Bytes::from_static(b"public"), response).encode();

        let pdu = mp.prepare_data_elements(&sent, reply).unwrap();
        assert_eq!(pdu.request_id, sent.request_id);
        assert_eq!(pdu.varbinds.len(), 1);
    }

    #[test]
    fn test_community_rejects_request_id_mismatch() {
        let mut mp = MessageProcessing::new(&v2c_config()).unwrap();
        let sent = mp
            .prepare_outgoing_message(Pdu::with_oids(
                PduType::GetRequest,
                &[oid!(1, 3, 6, 1)],
            ))
            .unwrap();

        let mut response = Pdu::response(vec![]);
        response.request_id = sent.request_id.wrapping_add(1);
        let reply =
            CommunityMessage::new(Version::V2c, Bytes::from_static(b"public"), response).encode();

        assert!(matches!(
            mp.prepare_data_elements(&sent, reply).unwrap_err(),
            Error::RequestIdMismatch { .. }
        ));
    }

    #[test]
    fn test_community_rejects_wrong_community() {
        let mut mp = MessageProcessing::new(&v2c_config()).unwrap();
        let sent = mp
            .prepare_outgoing_message(Pdu::with_oids(PduType::GetRequest, &[oid!(1, 3, 6)]))
            .unwrap();

        let mut response = Pdu::response(vec![]);
        response.request_id = sent.request_id;
        let reply =
            CommunityMessage::new(Version::V2c, Bytes::from_static(b"other"), response).encode();

        assert!(matches!(
            mp.prepare_data_elements(&sent, reply).unwrap_err(),
            Error::CommunityMismatch
        ));
    }

    #[test]
    fn test_community_rejects_version_mismatch() {
        let mut mp = MessageProcessing::new(&v2c_config()).unwrap();
        let sent = mp
            .prepare_outgoing_message(Pdu::with_oids(PduType::GetRequest, &[oid!(1, 3, 6)]))
            .unwrap();

        let mut response = Pdu::response(vec![]);
        response.request_id = sent.request_id;
        let reply =
            CommunityMessage::new(Version::V1, Bytes::from_static(b"public"), response).encode();

        assert!(matches!(
            mp.prepare_data_elements(&sent, reply).unwrap_err(),
            Error::VersionMismatch { .. }
        ));
    }

    #[test]
    fn test_usm_requires_discovery_before_send() {
        let mut mp = MessageProcessing::new(&v3_config()).unwrap();
        let err = mp
            .prepare_outgoing_message(Pdu::with_oids(PduType::GetRequest, &[oid!(1, 3, 6)]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Encode {
                kind: EncodeErrorKind::EngineNotDiscovered,
            }
        ));
    }

    #[test]
    fn test_discovery_probe_shape() {
        let mut mp = MessageProcessing::new(&v3_config()).unwrap();
        assert!(!mp.is_discovered());

        let sent = mp.prepare_discovery_message().unwrap();
        let probe = V3Message::decode(sent.bytes.clone()).unwrap();

        assert_eq!(probe.security_level(), SecurityLevel::NoAuthNoPriv);
        assert!(probe.global_data.msg_flags.reportable);
        let params = UsmSecurityParams::decode(probe.security_params.clone()).unwrap();
        assert!(params.engine_id.is_empty());
        assert!(params.username.is_empty());
        let pdu = probe.pdu().unwrap();
        assert!(pdu.varbinds.is_empty());
    }

    #[test]
    fn test_discovery_caches_engine_and_derives_keys() {
        let mut mp = MessageProcessing::new(&v3_config()).unwrap();
        let sent = mp.prepare_discovery_message().unwrap();

        let reply = discovery_report(&sent, b"\x80\x00\x1f\x88\x04engine", 7, 4242);
        mp.process_discovery(&sent, reply).unwrap();
        assert!(mp.is_discovered());

        // outgoing messages can now be authenticated
        let out = mp
            .prepare_outgoing_message(Pdu::with_oids(PduType::GetRequest, &[oid!(1, 3, 6)]))
            .unwrap();
        let message = V3Message::decode(out.bytes.clone()).unwrap();
        assert_eq!(message.security_level(), SecurityLevel::AuthNoPriv);
        let params = UsmSecurityParams::decode(message.security_params.clone()).unwrap();
        assert_eq!(params.engine_boots, 7);
        assert_eq!(params.username.as_ref(), b"alice");
        assert_eq!(params.auth_params.len(), 12);
        // the MAC is not the placeholder zeros
        assert!(params.auth_params.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_discovery_rejects_short_engine_id() {
        let mut mp = MessageProcessing::new(&v3_config()).unwrap();
        let sent = mp.prepare_discovery_message().unwrap();

        let reply = discovery_report(&sent, b"abc", 1, 1);
        assert!(matches!(
            mp.process_discovery(&sent, reply).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::InvalidEngineId { length: 3 },
                ..
            }
        ));
    }

    /// Build a discovery Report the way an agent would.
    fn discovery_report(sent: &SentMessage, engine_id: &[u8], boots: u32, time: u32) -> Bytes {
        let report = Pdu::with_varbinds(
            PduType::Report,
            vec![crate::varbind::VarBind::new(
                crate::v3::engine::report_oids::unknown_engine_ids(),
                crate::value::Value::Counter32(1),
            )],
        );
        let params = UsmSecurityParams::new(
            Bytes::copy_from_slice(engine_id),
            boots,
            time,
            Bytes::new(),
        );
        let global = MsgGlobalData::new(
            sent.msg_id.unwrap(),
            65507,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, false),
        );
        V3Message::new(global, params.encode(), ScopedPdu::with_empty_context(report)).encode()
    }
}
