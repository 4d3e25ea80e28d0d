//! Shared test fixtures: an in-memory MIB and scripted v2c/v3 agents that
//! answer through the mock transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use snmp_session::message::{
    CommunityMessage, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData,
};
use snmp_session::oid::Oid;
use snmp_session::pdu::{Pdu, PduType};
use snmp_session::transport::MockReply;
use snmp_session::v3::auth::{authenticate_message, verify_message};
use snmp_session::v3::engine::report_oids;
use snmp_session::v3::{AuthProtocol, LocalizedKey, PrivKey, PrivProtocol, UsmSecurityParams};
use snmp_session::value::Value;
use snmp_session::varbind::VarBind;
use snmp_session::version::Version;

/// Sorted in-memory MIB.
pub struct MemoryMib {
    entries: Vec<(Oid, Value)>,
}

impl MemoryMib {
    pub fn new(mut entries: Vec<(Oid, Value)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// The standard system-group fixture used across tests.
    pub fn system_group() -> Self {
        Self::new(vec![
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                Value::from("linux"),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
                Value::TimeTicks(123456),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
                Value::from("router1"),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 1),
                Value::Integer(1),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 2),
                Value::Integer(2),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1),
                Value::from("eth0"),
            ),
            (
                snmp_session::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2),
                Value::from("eth1"),
            ),
        ])
    }

    pub fn get(&self, oid: &Oid) -> Option<Value> {
        self.entries
            .iter()
            .find(|(o, _)| o == oid)
            .map(|(_, v)| v.clone())
    }

    /// First entry lexicographically greater than `oid`.
    pub fn next_after(&self, oid: &Oid) -> Option<(Oid, Value)> {
        self.entries.iter().find(|(o, _)| o > oid).cloned()
    }

    /// Answer a request PDU the way a well-behaved v2c agent would.
    pub fn respond(&self, request: &Pdu) -> Pdu {
        let mut response = match request.pdu_type {
            PduType::GetRequest => Pdu::response(
                request
                    .varbinds
                    .iter()
                    .map(|vb| {
                        let value = self.get(&vb.oid).unwrap_or(Value::NoSuchObject);
                        VarBind::new(vb.oid.clone(), value)
                    })
                    .collect(),
            ),
            PduType::GetNextRequest => Pdu::response(
                request
                    .varbinds
                    .iter()
                    .map(|vb| match self.next_after(&vb.oid) {
                        Some((oid, value)) => VarBind::new(oid, value),
                        None => VarBind::new(vb.oid.clone(), Value::EndOfMibView),
                    })
                    .collect(),
            ),
            PduType::GetBulkRequest => self.respond_bulk(request),
            PduType::InformRequest => {
                // acknowledge with the same varbinds
                Pdu::response(request.varbinds.clone())
            }
            _ => Pdu::response(vec![]),
        };
        response.request_id = request.request_id;
        response
    }

    /// RFC 3416 Section 4.2.3 GetBulk semantics: one GETNEXT per
    /// non-repeater, then `max_repetitions` interleaved rounds over the
    /// repeaters, repeating endOfMibView once a repeater runs off the end.
    fn respond_bulk(&self, request: &Pdu) -> Pdu {
        let n = (request.non_repeaters().max(0) as usize).min(request.varbinds.len());
        let reps = request.max_repetitions().max(0) as usize;

        let mut varbinds = Vec::new();

        for vb in &request.varbinds[..n] {
            match self.next_after(&vb.oid) {
                Some((oid, value)) => varbinds.push(VarBind::new(oid, value)),
                None => varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
            }
        }

        let mut cursors: Vec<Oid> = request.varbinds[n..]
            .iter()
            .map(|vb| vb.oid.clone())
            .collect();
        let mut exhausted = vec![false; cursors.len()];

        for _ in 0..reps {
            for (i, cursor) in cursors.iter_mut().enumerate() {
                if exhausted[i] {
                    varbinds.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                    continue;
                }
                match self.next_after(cursor) {
                    Some((oid, value)) => {
                        varbinds.push(VarBind::new(oid.clone(), value));
                        *cursor = oid;
                    }
                    None => {
                        exhausted[i] = true;
                        varbinds.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                    }
                }
            }
        }

        Pdu::response(varbinds)
    }
}

/// A v2c agent closure over a MIB.
pub fn v2c_agent(
    mib: MemoryMib,
    community: &'static str,
) -> impl FnMut(&[u8]) -> MockReply + Send + 'static {
    move |datagram| {
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(datagram))
            .expect("agent received malformed message");
        let response = mib.respond(&msg.pdu);
        let reply = CommunityMessage::new(Version::V2c, community.as_bytes().to_vec(), response);
        MockReply::Data(reply.encode().to_vec())
    }
}

/// Credentials shared by the v3 agent and the sessions that talk to it.
pub const ENGINE_ID: &[u8] = &[0x80, 0x00, 0x1f, 0x88, 0x04, 0x61, 0x62, 0x63];
pub const USER: &str = "alice";
pub const AUTH_PASSWORD: &str = "maplesyrup";
pub const PRIV_PASSWORD: &str = "privsyrup";

/// Scripted v3 agent state.
pub struct V3Agent {
    pub engine_id: Bytes,
    pub boots: u32,
    pub time: u32,
    pub auth_key: Option<LocalizedKey>,
    pub priv_key: Option<PrivKey>,
    pub mib: MemoryMib,
    /// Reports to serve instead of the next data responses (plaintext,
    /// unauthenticated, like real agents send them).
    pub pending_reports: VecDeque<Oid>,
    /// Counts discovery probes answered.
    pub discoveries: usize,
    /// Verify inbound HMACs; negative tests disable this so a wrongly
    /// keyed agent still signs its responses.
    pub verify_inbound: bool,
    salt: u64,
}

impl V3Agent {
    /// Agent with authentication only.
    pub fn auth_only(mib: MemoryMib) -> Self {
        Self::build(mib, AUTH_PASSWORD, None)
    }

    /// Agent with authentication and privacy.
    pub fn auth_priv(mib: MemoryMib, priv_protocol: PrivProtocol) -> Self {
        Self::build(mib, AUTH_PASSWORD, Some(priv_protocol))
    }

    /// Agent whose auth key comes from a different password, for negative
    /// tests. Inbound verification is off so the agent still answers.
    pub fn wrong_auth_key(mib: MemoryMib) -> Self {
        let mut agent = Self::build(mib, "wrongwrongwrong", None);
        agent.verify_inbound = false;
        agent
    }

    fn build(mib: MemoryMib, auth_password: &str, priv_protocol: Option<PrivProtocol>) -> Self {
        let engine_id = Bytes::from_static(ENGINE_ID);
        let auth_key = Some(LocalizedKey::from_password(
            AuthProtocol::Sha1,
            auth_password.as_bytes(),
            &engine_id,
        ));
        let priv_key = priv_protocol.map(|protocol| {
            PrivKey::from_password(
                AuthProtocol::Sha1,
                protocol,
                PRIV_PASSWORD.as_bytes(),
                &engine_id,
            )
        });
        Self {
            engine_id,
            boots: 3,
            time: 10_000,
            auth_key,
            priv_key,
            mib,
            pending_reports: VecDeque::new(),
            discoveries: 0,
            verify_inbound: true,
            salt: 1,
        }
    }

    /// Handle one request datagram.
    pub fn handle(&mut self, datagram: &[u8]) -> MockReply {
        let msg =
            V3Message::decode(Bytes::copy_from_slice(datagram)).expect("malformed v3 request");
        let params =
            UsmSecurityParams::decode(msg.security_params.clone()).expect("malformed USM params");

        // discovery probe: empty engine ID
        if params.engine_id.is_empty() {
            self.discoveries += 1;
            return MockReply::Data(self.report(
                msg.msg_id(),
                report_oids::unknown_engine_ids(),
                0,
            ));
        }

        // scripted out-of-band report
        if let Some(oid) = self.pending_reports.pop_front() {
            return MockReply::Data(self.report(msg.msg_id(), oid, 0));
        }

        // verify inbound authentication like a real USM engine
        if msg.security_level().requires_auth() && self.verify_inbound {
            let key = self.auth_key.as_ref().expect("agent has no auth key");
            let (offset, len) = UsmSecurityParams::find_auth_params_offset(datagram)
                .expect("no auth params in request");
            if !verify_message(key, datagram, offset, len) {
                return MockReply::Data(self.report(
                    msg.msg_id(),
                    report_oids::wrong_digests(),
                    0,
                ));
            }
        }

        let request = match &msg.data {
            V3MessageData::Plaintext(scoped) => scoped.pdu.clone(),
            V3MessageData::Encrypted(ciphertext) => {
                let key = self.priv_key.as_ref().expect("agent has no priv key");
                let plaintext = key
                    .decrypt(ciphertext, params.engine_boots, params.engine_time, &params.priv_params)
                    .expect("agent decrypt failed");
                let mut decoder = snmp_session::ber::Decoder::new(plaintext);
                ScopedPdu::decode(&mut decoder).expect("bad scoped pdu").pdu
            }
        };

        let response = self.mib.respond(&request);
        MockReply::Data(self.data_response(msg.msg_id(), msg.security_level(), response))
    }

    /// Build a plaintext, unauthenticated Report message.
    fn report(&self, msg_id: i32, status_oid: Oid, request_id: i32) -> Vec<u8> {
        let mut report = Pdu::with_varbinds(
            PduType::Report,
            vec![VarBind::new(status_oid, Value::Counter32(1))],
        );
        report.request_id = request_id;

        let params = UsmSecurityParams::new(
            self.engine_id.clone(),
            self.boots,
            self.time,
            Bytes::new(),
        );
        let global = MsgGlobalData::new(
            msg_id,
            65507,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, false),
        );
        let msg = V3Message::new(global, params.encode(), ScopedPdu::with_empty_context(report));
        msg.encode().to_vec()
    }

    /// Build a data response at the request's security level.
    fn data_response(&mut self, msg_id: i32, level: SecurityLevel, pdu: Pdu) -> Vec<u8> {
        let scoped = ScopedPdu::new(self.engine_id.clone(), Bytes::new(), pdu);

        let mut params = UsmSecurityParams::new(
            self.engine_id.clone(),
            self.boots,
            self.time,
            Bytes::copy_from_slice(USER.as_bytes()),
        );

        let data = if level.requires_priv() {
            let key = self.priv_key.as_ref().expect("agent has no priv key");
            self.salt += 1;
            let (ciphertext, priv_params) = key
                .encrypt(&scoped.encode_to_bytes(), self.boots, self.time, self.salt)
                .expect("agent encrypt failed");
            params = params.with_priv_params(priv_params);
            V3MessageData::Encrypted(ciphertext)
        } else {
            V3MessageData::Plaintext(scoped)
        };

        if level.requires_auth() {
            params = params.with_auth_placeholder(12);
        }

        let global = MsgGlobalData::new(msg_id, 65507, MsgFlags::new(level, false));
        let msg = V3Message {
            global_data: global,
            security_params: params.encode(),
            data,
        };

        let mut encoded = msg.encode().to_vec();
        if level.requires_auth() {
            let key = self.auth_key.as_ref().expect("agent has no auth key");
            let (offset, len) = UsmSecurityParams::find_auth_params_offset(&encoded)
                .expect("no auth params in response");
            authenticate_message(key, &mut encoded, offset, len);
        }
        encoded
    }
}

/// Wrap a shared agent into a transport handler.
pub fn v3_agent_handler(
    agent: Arc<Mutex<V3Agent>>,
) -> impl FnMut(&[u8]) -> MockReply + Send + 'static {
    move |datagram| agent.lock().unwrap().handle(datagram)
}
