//! Privacy (encryption) protocols for SNMPv3 (RFC 3414, RFC 3826).
//!
//! # Salt/IV construction
//!
//! ## DES-CBC (RFC 3414 Section 8)
//! - Salt (privParameters): engineBoots(4) || counter(4), 8 octets
//! - IV: pre-IV XOR salt (pre-IV is the last 8 octets of the 16-octet key)
//!
//! ## AES-128-CFB (RFC 3826)
//! - Salt (privParameters): 64-bit counter, 8 octets
//! - IV: engineBoots(4) || engineTime(4) || salt(8), 16 octets
//!   (concatenation, NOT XOR)

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{AuthProtocol, PrivProtocol};
use crate::error::{CryptoErrorKind, Error, Result};

/// Generate a random non-zero u64 from the OS cryptographic source.
fn random_nonzero_u64() -> u64 {
    let mut buf = [0u8; 8];
    loop {
        getrandom::fill(&mut buf).expect("getrandom failed");
        let val = u64::from_ne_bytes(buf);
        if val != 0 {
            return val;
        }
    }
}

/// Monotone salt counter for outbound privacy parameters.
///
/// Initialized from cryptographic randomness, incremented once per
/// encrypted send, and reset when discovery observes an engine-boots
/// change. Never yields zero.
pub struct SaltCounter(AtomicU64);

impl SaltCounter {
    /// Create a counter seeded from cryptographic randomness.
    pub fn new() -> Self {
        Self(AtomicU64::new(random_nonzero_u64()))
    }

    /// Create a counter at a specific value (tests).
    pub fn from_value(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Get the next salt value and advance the counter.
    ///
    /// Zero is skipped on wraparound so the salt never repeats the
    /// all-zero value.
    pub fn next(&self) -> u64 {
        let val = self.0.fetch_add(1, Ordering::SeqCst);
        if val == 0 {
            self.0.fetch_add(1, Ordering::SeqCst)
        } else {
            val
        }
    }

    /// Reseed the counter (engine-boots change).
    pub fn reset(&self) {
        self.0.store(random_nonzero_u64(), Ordering::SeqCst);
    }
}

impl Default for SaltCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SaltCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SaltCounter").field(&"..").finish()
    }
}

/// Privacy key for scopedPDU encryption/decryption.
///
/// Derived with the same localization algorithm as authentication keys;
/// the privacy protocol decides how the 16 octets are split. Key material
/// is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    /// Derive a privacy key from a password and engine ID.
    ///
    /// RFC 3414 Section 8.2: the privacy key is localized with the
    /// session's *authentication* protocol; DES then uses the first 8
    /// octets as the key and the last 8 as the pre-IV, AES-128 uses the
    /// first 16 octets.
    pub fn from_password(
        auth_protocol: AuthProtocol,
        priv_protocol: PrivProtocol,
        password: &[u8],
        engine_id: &[u8],
    ) -> Self {
        let localized =
            super::LocalizedKey::from_password(auth_protocol, password, engine_id);
        Self {
            key: localized.as_bytes().to_vec(),
            protocol: priv_protocol,
        }
    }

    /// Create a privacy key from raw localized key bytes.
    pub fn from_bytes(protocol: PrivProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// The privacy protocol.
    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    /// Encrypt a serialized scopedPDU, returning (ciphertext, privParameters).
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: u64,
    ) -> Result<(Bytes, Bytes)> {
        match self.protocol {
            PrivProtocol::Des => self.encrypt_des(plaintext, engine_boots, salt),
            PrivProtocol::Aes => self.encrypt_aes(plaintext, engine_boots, engine_time, salt),
        }
    }

    /// Decrypt a ciphertext using the privParameters from the message.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        if priv_params.len() != 8 {
            return Err(Error::decrypt(CryptoErrorKind::InvalidPrivParamsLength {
                expected: 8,
                actual: priv_params.len(),
            }));
        }

        match self.protocol {
            PrivProtocol::Des => self.decrypt_des(ciphertext, priv_params),
            PrivProtocol::Aes => {
                self.decrypt_aes(ciphertext, engine_boots, engine_time, priv_params)
            }
        }
    }

    /// DES-CBC encryption (RFC 3414 Section 8.1.1.1).
    fn encrypt_des(&self, plaintext: &[u8], engine_boots: u32, salt_int: u64) -> Result<(Bytes, Bytes)> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
        type DesCbc = cbc::Encryptor<des::Des>;

        if self.key.len() < 16 {
            return Err(Error::encrypt(CryptoErrorKind::InvalidKeyLength));
        }
        let key = &self.key[..8];
        let pre_iv = &self.key[8..16];

        // Salt = engineBoots(4, MSB first) || counter(4)
        let mut salt = [0u8; 8];
        salt[..4].copy_from_slice(&engine_boots.to_be_bytes());
        salt[4..].copy_from_slice(&(salt_int as u32).to_be_bytes());

        let mut iv = [0u8; 8];
        for i in 0..8 {
            iv[i] = pre_iv[i] ^ salt[i];
        }

        // Zero-pad the plaintext to an 8-octet boundary
        let padded_len = plaintext.len().div_ceil(8) * 8;
        let mut buffer = vec![0u8; padded_len];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let cipher = DesCbc::new_from_slices(key, &iv)
            .map_err(|_| Error::encrypt(CryptoErrorKind::InvalidKeyLength))?;
        let ciphertext = cipher
            .encrypt_padded_mut::<NoPadding>(&mut buffer, padded_len)
            .map_err(|_| Error::encrypt(CryptoErrorKind::CipherError))?;

        Ok((
            Bytes::copy_from_slice(ciphertext),
            Bytes::copy_from_slice(&salt),
        ))
    }

    /// DES-CBC decryption (RFC 3414 Section 8.1.1.3).
    fn decrypt_des(&self, ciphertext: &[u8], priv_params: &[u8]) -> Result<Bytes> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};
        type DesCbc = cbc::Decryptor<des::Des>;

        if !ciphertext.len().is_multiple_of(8) || ciphertext.is_empty() {
            return Err(Error::decrypt(CryptoErrorKind::InvalidCiphertextLength {
                length: ciphertext.len(),
                block_size: 8,
            }));
        }
        if self.key.len() < 16 {
            return Err(Error::decrypt(CryptoErrorKind::InvalidKeyLength));
        }

        let key = &self.key[..8];
        let pre_iv = &self.key[8..16];

        let mut iv = [0u8; 8];
        for i in 0..8 {
            iv[i] = pre_iv[i] ^ priv_params[i];
        }

        let cipher = DesCbc::new_from_slices(key, &iv)
            .map_err(|_| Error::decrypt(CryptoErrorKind::InvalidKeyLength))?;

        let mut buffer = ciphertext.to_vec();
        let len = {
            let plaintext = cipher
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map_err(|_| Error::decrypt(CryptoErrorKind::CipherError))?;
            plaintext.len()
        };
        buffer.truncate(len);

        Ok(Bytes::from(buffer))
    }

    /// AES-128-CFB encryption (RFC 3826 Section 3.1.3).
    fn encrypt_aes(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: u64,
    ) -> Result<(Bytes, Bytes)> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Encryptor<aes::Aes128>;

        if self.key.len() < 16 {
            return Err(Error::encrypt(CryptoErrorKind::InvalidKeyLength));
        }
        let key = &self.key[..16];

        let salt_bytes = salt.to_be_bytes();

        // IV = engineBoots(4) || engineTime(4) || salt(8); concatenation,
        // not XOR
        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..].copy_from_slice(&salt_bytes);

        let mut buffer = plaintext.to_vec();
        let cipher = Aes128Cfb::new_from_slices(key, &iv)
            .map_err(|_| Error::encrypt(CryptoErrorKind::InvalidKeyLength))?;
        cipher.encrypt(&mut buffer);

        Ok((Bytes::from(buffer), Bytes::copy_from_slice(&salt_bytes)))
    }

    /// AES-128-CFB decryption (RFC 3826 Section 3.1.4).
    fn decrypt_aes(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Decryptor<aes::Aes128>;

        if self.key.len() < 16 {
            return Err(Error::decrypt(CryptoErrorKind::InvalidKeyLength));
        }
        let key = &self.key[..16];

        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..].copy_from_slice(priv_params);

        let mut buffer = ciphertext.to_vec();
        let cipher = Aes128Cfb::new_from_slices(key, &iv)
            .map_err(|_| Error::decrypt(CryptoErrorKind::InvalidKeyLength))?;
        cipher.decrypt(&mut buffer);

        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
