//! BER encoding.
//!
//! Uses a reverse buffer: content is written back-to-front, so constructed
//! types can prepend their length and tag after the content length is known
//! without a second pass.

use super::length::encode_length;
use super::tag;
use bytes::Bytes;

/// Buffer for BER encoding that writes backwards.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a new encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a new encode buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Push a single byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Push bytes that are in wire order (stored reversed).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Push a BER length encoding.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, count) = encode_length(len);
        // encode_length returns octets already reversed
        self.buf.extend_from_slice(&bytes[..count]);
    }

    /// Push a BER tag.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Current length of the encoded data.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a constructed type (SEQUENCE, PDU, ...).
    ///
    /// The closure encodes the contents; because the buffer is reversed,
    /// contents must be pushed in reverse field order.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let start_len = self.len();
        f(self);
        let content_len = self.len() - start_len;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER in minimal two's-complement form.
    pub fn push_integer(&mut self, value: i32) {
        let (arr, len) = encode_integer_content(value);
        self.push_bytes(&arr[4 - len..]);
        self.push_length(len);
        self.push_tag(tag::universal::INTEGER);
    }

    /// Encode an unsigned 64-bit integer as Counter64.
    pub fn push_counter64(&mut self, value: u64) {
        let (arr, len) = encode_unsigned64_content(value);
        self.push_bytes(&arr[9 - len..]);
        self.push_length(len);
        self.push_tag(tag::application::COUNTER64);
    }

    /// Encode an unsigned 32-bit integer with a specific tag.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let (arr, len) = encode_unsigned32_content(value);
        self.push_bytes(&arr[5 - len..]);
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag::universal::OCTET_STRING);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &crate::oid::Oid) {
        let ber = oid.to_ber_smallvec();
        self.push_bytes(&ber);
        self.push_length(ber.len());
        self.push_tag(tag::universal::OBJECT_IDENTIFIER);
    }

    /// Encode an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_bytes(&addr);
        self.push_length(4);
        self.push_tag(tag::application::IP_ADDRESS);
    }

    /// Finalize and return the encoded bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }

    /// Finalize and return as `Vec<u8>`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a signed 32-bit integer in minimal BER form.
///
/// The valid bytes are at the END of the returned array.
#[inline]
fn encode_integer_content(value: i32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();

    let mut start = 0;
    if value >= 0 {
        // Skip leading 0x00 bytes, keeping one when needed for the sign bit
        while start < 3 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        // Skip leading 0xFF bytes, keeping one when needed for the sign bit
        while start < 3 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }

    (bytes, 4 - start)
}

/// Encode an unsigned 32-bit integer, with a 0x00 prefix when the top bit
/// is set.
#[inline]
fn encode_unsigned32_content(value: u32) -> ([u8; 5], usize) {
    if value == 0 {
        return ([0; 5], 1);
    }

    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 3 && bytes[start] == 0 {
        start += 1;
    }

    let mut result = [0u8; 5];
    result[1..].copy_from_slice(&bytes);
    if bytes[start] & 0x80 != 0 {
        (result, 5 - start)
    } else {
        (result, 4 - start)
    }
}

/// Encode an unsigned 64-bit integer, with a 0x00 prefix when the top bit
/// is set.
#[inline]
fn encode_unsigned64_content(value: u64) -> ([u8; 9], usize) {
    if value == 0 {
        return ([0; 9], 1);
    }

    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 && bytes[start] == 0 {
        start += 1;
    }

    let mut result = [0u8; 9];
    result[1..].copy_from_slice(&bytes);
    if bytes[start] & 0x80 != 0 {
        (result, 9 - start)
    } else {
        (result, 8 - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer_content(value: i32) -> Vec<u8> {
        let (arr, len) = encode_integer_content(value);
        arr[4 - len..].to_vec()
    }

    fn unsigned32_content(value: u32) -> Vec<u8> {
        let (arr, len) = encode_unsigned32_content(value);
        arr[5 - len..].to_vec()
    }

    #[test]
    fn test_integer_content_minimal() {
        assert_eq!(integer_content(0), vec![0]);
        assert_eq!(integer_content(1), vec![1]);
        assert_eq!(integer_content(127), vec![127]);
        assert_eq!(integer_content(128), vec![0, 128]);
        assert_eq!(integer_content(-1), vec![0xFF]);
        assert_eq!(integer_content(-128), vec![0x80]);
        assert_eq!(integer_content(-129), vec![0xFF, 0x7F]);
    }

    #[test]
    fn test_unsigned32_content() {
        assert_eq!(unsigned32_content(0), vec![0]);
        assert_eq!(unsigned32_content(127), vec![127]);
        assert_eq!(unsigned32_content(128), vec![0, 128]);
        assert_eq!(unsigned32_content(255), vec![0, 255]);
        assert_eq!(unsigned32_content(256), vec![1, 0]);
        assert_eq!(unsigned32_content(u32::MAX), vec![0, 255, 255, 255, 255]);
    }

    #[test]
    fn test_encode_null() {
        let mut buf = EncodeBuf::new();
        buf.push_null();
        assert_eq!(&buf.finish()[..], &[0x05, 0x00]);
    }

    #[test]
    fn test_encode_integer_tlv() {
        let mut buf = EncodeBuf::new();
        buf.push_integer(42);
        assert_eq!(&buf.finish()[..], &[0x02, 0x01, 0x2A]);
    }

    #[test]
    fn test_encode_octet_string() {
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(b"hi");
        assert_eq!(&buf.finish()[..], &[0x04, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_encode_sequence() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            // reverse buffer: push in reverse field order
            buf.push_integer(2);
            buf.push_integer(1);
        });
        assert_eq!(
            &buf.finish()[..],
            &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn test_encode_counter64() {
        let mut buf = EncodeBuf::new();
        buf.push_counter64(0xDEAD_BEEF_u64);
        // 0xDEADBEEF has its top bit set in the first content byte,
        // so a zero prefix is added
        assert_eq!(
            &buf.finish()[..],
            &[0x46, 0x05, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn test_encode_long_content_uses_long_length() {
        let data = vec![0xAB; 200];
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(&data);
        let out = buf.finish();
        assert_eq!(&out[..3], &[0x04, 0x81, 200]);
        assert_eq!(out.len(), 203);
    }
}
