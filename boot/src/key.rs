//! key.rs — description of the modeled verifier key
//!
//! No key material exists in this crate. The summary only names what the
//! modeled bootROM would hold in mask ROM.

use serde::Serialize;

use crate::block::BLOCK_SIZE;

/// Public exponent F4.
pub const PUBLIC_EXPONENT: u32 = 65537;
pub const MODULUS_BITS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    pub algorithm: &'static str,
    pub hash: &'static str,
    pub padding: &'static str,
    pub exponent: u32,
    pub bits: usize,
    pub modulus_len: usize,
    /// Placeholder tag standing in for the modulus; not a real key.
    pub modulus_tag: &'static str,
    /// Portion of the decrypted message the simulator models.
    pub modeled_block_len: usize,
    pub note: &'static str,
}

pub fn key_summary() -> KeySummary {
    KeySummary {
        algorithm: "RSA-2048",
        hash: "SHA-256",
        padding: "PKCS#1 v1.5",
        exponent: PUBLIC_EXPONENT,
        bits: MODULUS_BITS,
        modulus_len: MODULUS_BITS / 8,
        modulus_tag: "0xDEADBEEFCAFEBABE1337",
        modeled_block_len: BLOCK_SIZE,
        note: "private exponent d is known only to the signer; never present here",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_consistent() {
        let k = key_summary();
        assert_eq!(k.modulus_len * 8, k.bits);
        assert_eq!(k.exponent, 0x10001);
        assert!(k.modeled_block_len <= k.modulus_len);
    }
}
