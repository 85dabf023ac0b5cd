//! sighax_boot — SIGHAX bootROM Signature Parser Model
//!
//! Byte-accurate model of a fixed-function RSA/PKCS#1 v1.5 signature parser
//! and of the logic flaw that lets a forged block pass it. The crate:
//! - Lays out the decrypted 128-byte signature block (`block`)
//! - Replays the parser's decision sequence as inspectable steps (`verify`)
//! - Forges a block that steers the parser onto its own hash (`forge`)
//! - Formats raw bytes for display (`hexdump`)
//!
//! Everything here is pure and in-memory: no key material, no I/O. The
//! presentation of steps (pacing, colours, widgets) belongs to callers.

pub mod block;
pub mod digest;
pub mod error;
pub mod forge;
pub mod hexdump;
pub mod key;
pub mod logger;
pub mod region;
pub mod step;
pub mod verify;

pub use block::{Offsets, PaddingType, SignatureBlock, BLOCK_SIZE, HASH_LEN, INNER_BLOCK_LEN};
pub use error::{BlockError, SimError};
pub use forge::{forge, forge_and_trace_exploit, trace_exploited, ForgeInfo};
pub use hexdump::hex_dump;
pub use key::{key_summary, KeySummary};
pub use region::Region;
pub use step::{Observation, ParseStep, Verdict};
pub use verify::{trace_block, trace_legitimate};

/// Build a signature block; see [`SignatureBlock::build`].
pub fn build_block(
    firmware: &[u8],
    padding: PaddingType,
    skip_override: Option<u8>,
) -> SignatureBlock {
    SignatureBlock::build(firmware, padding, skip_override)
}
