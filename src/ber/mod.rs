//! ASN.1 BER codec for SNMP.
//!
//! Split into tag constants ([`tag`]), length forms ([`length`]), a
//! reverse-buffer encoder ([`EncodeBuf`]) and a zero-copy decoder
//! ([`Decoder`]).

mod decode;
mod encode;
pub mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::EncodeBuf;
pub use length::{decode_length, encode_length};
