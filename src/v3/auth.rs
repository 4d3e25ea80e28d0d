//! Authentication key derivation and HMAC operations (RFC 3414).
//!
//! - Password-to-key derivation (1 MiB expansion + digest)
//! - Key localization (binding the key to an engine ID)
//! - HMAC-MD5-96 / HMAC-SHA-96 message authentication

use digest::{Digest, KeyInit, Mac};
use hmac::Hmac;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;

/// Localized authentication key.
///
/// Derived from a password and bound to a specific engine ID. Key material
/// is zeroed from memory on drop via the `zeroize` crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    /// Derive a localized key from a password and engine ID.
    ///
    /// RFC 3414 Section A.2:
    /// 1. Expand the password to 1 MiB by repetition and digest it,
    ///    yielding the master key `Ku`.
    /// 2. Localized key `Kul = H(Ku || engineID || Ku)`.
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        let key = match protocol {
            AuthProtocol::Md5 => {
                let ku = password_to_key::<md5::Md5>(password);
                localize_key::<md5::Md5>(&ku, engine_id)
            }
            AuthProtocol::Sha1 => {
                let ku = password_to_key::<sha1::Sha1>(password);
                localize_key::<sha1::Sha1>(&ku, engine_id)
            }
        };
        Self { key, protocol }
    }

    /// Create a localized key from raw bytes (e.g. from configuration).
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// The protocol this key is for.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Truncated MAC length for this key's protocol.
    pub fn mac_len(&self) -> usize {
        self.protocol.mac_len()
    }

    /// Compute the truncated HMAC over a serialized message.
    pub fn compute_hmac(&self, data: &[u8]) -> Vec<u8> {
        match self.protocol {
            AuthProtocol::Md5 => compute_hmac_md5(&self.key, data, self.mac_len()),
            AuthProtocol::Sha1 => compute_hmac_sha1(&self.key, data, self.mac_len()),
        }
    }

    /// Verify a truncated HMAC in constant time.
    pub fn verify_hmac(&self, data: &[u8], expected: &[u8]) -> bool {
        let computed = self.compute_hmac(data);
        if computed.len() != expected.len() {
            return false;
        }
        let mut diff = 0u8;
        for (a, b) in computed.iter().zip(expected.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Password to master key transformation (RFC 3414 Section A.2.1).
///
/// Forms a 1 MiB stream by repeating the password and digests it in
/// 64-byte blocks, matching net-snmp's implementation.
fn password_to_key<D: Digest>(password: &[u8]) -> Vec<u8> {
    const EXPANSION_SIZE: usize = 1_048_576;

    if password.is_empty() {
        // validated away at the session layer; kept total here
        return vec![0u8; <D as Digest>::output_size()];
    }

    let mut hasher = D::new();
    let mut block = [0u8; 64];
    let mut index = 0;
    let mut count = 0;

    while count < EXPANSION_SIZE {
        for byte in &mut block {
            *byte = password[index];
            index = (index + 1) % password.len();
        }
        hasher.update(block);
        count += 64;
    }

    hasher.finalize().to_vec()
}

/// Key localization (RFC 3414 Section A.2.2): `Kul = H(Ku || engineID || Ku)`.
fn localize_key<D: Digest>(master_key: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(master_key);
    hasher.update(engine_id);
    hasher.update(master_key);
    hasher.finalize().to_vec()
}

/// Compute HMAC-MD5 and truncate.
fn compute_hmac_md5(key: &[u8], data: &[u8], truncate_len: usize) -> Vec<u8> {
    type HmacMd5 = Hmac<md5::Md5>;

    let mut mac =
        <HmacMd5 as KeyInit>::new_from_slice(key).expect("HMAC can take key of any size");
    Mac::update(&mut mac, data);
    let result = mac.finalize().into_bytes();
    result[..truncate_len].to_vec()
}

/// Compute HMAC-SHA1 and truncate.
fn compute_hmac_sha1(key: &[u8], data: &[u8], truncate_len: usize) -> Vec<u8> {
    type HmacSha1 = Hmac<sha1::Sha1>;

    let mut mac =
        <HmacSha1 as KeyInit>::new_from_slice(key).expect("HMAC can take key of any size");
    Mac::update(&mut mac, data);
    let result = mac.finalize().into_bytes();
    result[..truncate_len].to_vec()
}

/// Authenticate an outgoing message in place.
///
/// The message must carry placeholder zeros in the auth params field; the
/// HMAC is computed over the full message and written back into the field.
pub fn authenticate_message(key: &LocalizedKey, message: &mut [u8], offset: usize, len: usize) {
    let mac = key.compute_hmac(message);
    message[offset..offset + len].copy_from_slice(&mac);
}

/// Verify the authentication of an incoming message.
///
/// Zeroes the auth params field in a copy, recomputes the HMAC over the
/// whole message, and compares in constant time.
pub fn verify_message(key: &LocalizedKey, message: &[u8], offset: usize, len: usize) -> bool {
    let received_mac = &message[offset..offset + len];

    let mut copy = message.to_vec();
    copy[offset..offset + len].fill(0);

    key.verify_hmac(&copy, received_mac)
}
