//! digest.rs — SHA-256 helpers shared by the builder and both traces

use sha2::{Digest, Sha256};

use crate::block::HASH_LEN;

/// Hash utility — returns 32-byte SHA-256 digest
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(data).into()
}

/// Uppercase hex, the form every step observation uses for digests.
pub fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Serde adapter: byte buffers serialise as uppercase hex strings.
pub(crate) fn serialize_hex<S, T>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex_upper(bytes.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            hex_upper(&sha256(b"")),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn hex_is_uppercase_two_chars_per_byte() {
        assert_eq!(hex_upper(&[0x0a, 0xff, 0x00]), "0AFF00");
    }
}
