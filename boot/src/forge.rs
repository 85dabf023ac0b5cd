//! forge.rs — SIGHAX Forged Block + Adversarial Parse Trace
//!
//! The forged block exploits both flaws at once:
//! - padding type 0x02, so there is no 0xFF run to brute-force around
//! - a skip-length byte that jumps the cursor from the start of the
//!   algorithm identifier straight onto the expected-hash field
//!
//! The parser then reads the expected hash from the right place under the
//! wrong belief, steps 32 bytes further to where it expects its own
//! calculated hash, and lands past the block in the memory it writes its
//! fresh SHA-256 into. Both sides of the final comparison are the same
//! digest of the same firmware, so it succeeds for any payload.
//!
//! The skip value is measured from a probe block's offset map, never
//! hard-coded, so it tracks any change to the fixed layout.

use serde::Serialize;

use crate::block::{PaddingType, SignatureBlock, HASH_LEN, INNER_BLOCK_LEN};
use crate::digest::{hex_upper, serialize_hex, sha256};
use crate::error::{BlockError, SimError};
use crate::logger::{log_debug, log_info};
use crate::region::Region;
use crate::step::{ParseStep, Trace};

/// Padding type every forged block uses.
pub const FORGED_PADDING: PaddingType = PaddingType::Unpadded;

/// What the forging pass derived, for the adversarial trace to narrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgeInfo {
    pub original_skip: u8,
    pub forged_skip: u8,
    pub skip_offset: usize,
    pub inner_start: usize,
    pub correct_hash_offset: usize,
    pub calc_hash_offset: usize,
    pub lands_at: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub evil_hash: [u8; HASH_LEN],
}

impl ForgeInfo {
    /// Cursor position after the parser consumes 32 bytes at `lands_at`.
    #[inline]
    pub fn outside(&self) -> usize {
        self.lands_at + HASH_LEN
    }
}

/// Skip value that moves the cursor from the identifier onto the expected hash
/// for blocks of `padding`. Depends only on layout, never on firmware content.
pub fn needed_skip(padding: PaddingType) -> Result<u8, BlockError> {
    skip_to_hash(&SignatureBlock::build(&[], padding, Some(INNER_BLOCK_LEN)))
}

/// Distance from where an honest skip starts to where the expected hash begins.
fn skip_to_hash(probe: &SignatureBlock) -> Result<u8, BlockError> {
    let o = probe.offsets();
    let distance = o.correct_hash - o.inner_start;
    u8::try_from(distance).map_err(|_| BlockError::SkipOverflow(distance))
}

/// Two-pass forge: probe the layout, then build the block with the derived skip.
pub fn forge(evil_firmware: &[u8]) -> Result<(SignatureBlock, ForgeInfo), BlockError> {
    let probe = SignatureBlock::build(evil_firmware, FORGED_PADDING, Some(INNER_BLOCK_LEN));
    let skip = skip_to_hash(&probe)?;

    let forged = SignatureBlock::build(evil_firmware, FORGED_PADDING, Some(skip));
    let o = forged.offsets();
    let info = ForgeInfo {
        original_skip: INNER_BLOCK_LEN,
        forged_skip: skip,
        skip_offset: o.skip_len,
        inner_start: o.inner_start,
        correct_hash_offset: o.correct_hash,
        calc_hash_offset: o.calc_hash,
        lands_at: o.inner_start + skip as usize,
        evil_hash: sha256(evil_firmware),
    };

    log_info(
        "forge",
        &format!(
            "forged skip 0x{:02X} ({}), cursor lands at {} (correct_hash at {})",
            skip, skip, info.lands_at, info.correct_hash_offset
        ),
    );
    Ok((forged, info))
}

/// Replay the parser over a forged block. Never halts: no check fails.
pub fn trace_exploited(
    blk: &SignatureBlock,
    evil_firmware: &[u8],
    info: &ForgeInfo,
) -> Result<Vec<ParseStep>, SimError> {
    let o = *blk.offsets();
    let od_val = blk.byte(o.skip_len)?;
    if od_val != info.forged_skip {
        return Err(SimError::SkipMismatch { expected: info.forged_skip, found: od_val });
    }

    let lands_at = o.inner_start + od_val as usize;
    let outside = lands_at + HASH_LEN;
    let extent = blk.extent();
    if outside < extent {
        return Err(SimError::CursorInsideBlock { outside, extent });
    }
    let confused = blk.hash_at(lands_at)?;
    // Digest computed once, by `forge`.
    let evil_hex = hex_upper(&info.evil_hash);
    log_debug(
        "forge",
        &format!("tracing exploit: lands_at={} outside={} extent={}", lands_at, outside, extent),
    );

    let b0 = blk.byte(o.block_start)?;
    let b1 = blk.byte(o.padding_type)?;

    let mut trace = Trace::new();
    let steps = [
        ParseStep::info("Boot with malicious firmware")
            .narrative(
                "The bootROM loads the modified firmware image. From the outside it looks \
                 like any other. The attacker has found a signature S whose decryption \
                 under the real public key yields the crafted block.",
            )
            .observe("payload", format!("attacker ARM9 code, {} bytes", evil_firmware.len()))
            .observe("evil_sha256", evil_hex.clone()),
        ParseStep::exploited("Decrypt signature: manipulated block")
            .narrative(format!(
                "byte[1] = 0x{:02X}: no padding (Vulnerability 1). Without a long 0xFF run \
                 far fewer decrypted values qualify, which makes brute-forcing such a \
                 signature feasible.",
                b1
            ))
            .observe("byte[1]", format!("0x{:02X}, unpadded (Vulnerability 1)", b1))
            .observe("effect", "signature brute-force becomes viable")
            .highlight(o.padding_type, Region::Vulnerable),
        ParseStep::vulnerable(format!("byte[0]=0x{:02X}, byte[1]=0x{:02X}: no padding", b0, b1))
            .narrative(
                "byte[0] is 0x00 as required. byte[1] = 0x02 is accepted, so the parser \
                 jumps straight to the separator. The padding check is skipped, not passed: \
                 there are no padding bytes to look at.",
            )
            .observe(format!("byte[0]=0x{:02X}", b0), "ok")
            .observe(format!("byte[1]=0x{:02X}", b1), "unpadded, accepted anyway")
            .observe("padding", "skipped, zero bytes checked")
            .highlight(o.block_start, Region::Header)
            .highlight(o.padding_type, Region::Vulnerable)
            .cursor_at(o.block_start),
        ParseStep::info("Separator, 0x30, 0x31 (ignored), 0x30")
            .narrative(
                "The DER prefix parses as usual and the 0x31 is ignored as always. Next is \
                 the byte that matters: the modified skip length.",
            )
            .observe(format!("[{}] separator", o.separator), format!("0x{:02X}", blk.byte(o.separator)?))
            .observe(format!("[{}] 0x30", o.der_outer), "checked")
            .observe(format!("[{}] 0x31", o.der_set), "ignored")
            .observe(format!("[{}] 0x30", o.der_inner), "checked")
            .observe("next", format!("byte 0x{:02X} at offset {}", od_val, o.skip_len))
            .highlight(o.separator, Region::Separator)
            .highlight(o.der_outer, Region::Der)
            .highlight(o.der_set, Region::Ignored)
            .highlight(o.der_inner, Region::Der)
            .cursor_at(o.separator),
        ParseStep::vulnerable(format!(
            "byte[{}] = 0x{:02X} ({}): forged skip length",
            o.skip_len, od_val, od_val
        ))
        .narrative(format!(
            "In a genuine block this byte is 0x{:02X} ({}). The attacker set it to 0x{:02X} \
             ({}) (Vulnerability 2). The parser skips {} bytes from offset {} and lands at \
             offset {}. It believes it is reading correct_hash, but it is actually positioned \
             at what it will treat as calculated_hash.",
            info.original_skip,
            info.original_skip,
            od_val,
            od_val,
            od_val,
            o.inner_start,
            lands_at
        ))
        .observe("genuine_value", format!("0x{:02X} = {} bytes", info.original_skip, info.original_skip))
        .observe("forged_value", format!("0x{:02X} = {} bytes", od_val, od_val))
        .observe("skips_from", format!("offset {}", o.inner_start))
        .observe("lands_at", format!("offset {} = start of correct_hash", lands_at))
        .observe("deception", "parser believes it is at correct_hash; it is actually at calculated_hash")
        .highlight(o.skip_len, Region::SkipLength)
        .highlight_range(o.inner_start..lands_at, Region::Skipped)
        .cursor_at(o.skip_len)
        .landing_at(lands_at),
        ParseStep::exploited(format!("Cursor at offset {}: taken for correct_hash", lands_at))
            .narrative(format!(
                "The parser reads the 32 bytes at offset {} as correct_hash, then advances \
                 32 bytes to find calculated_hash and arrives at offset {}, past the \
                 signature block (populated extent {}).",
                lands_at, outside, extent
            ))
            .observe("\"correct_hash\" read", hex_upper(&confused))
            .observe("next_offset", format!("{}, outside the signature block", outside))
            .observe("write_zone", "memory adjacent to the signature block")
            .highlight_range(lands_at..lands_at + HASH_LEN, Region::HashConfused)
            .cursor_at(lands_at),
        ParseStep::exploited(format!("bootROM writes calculated_hash at offset {}", outside))
            .narrative(format!(
                "The bootROM computes SHA-256 of the malicious firmware and writes it at \
                 offset {}, outside the signature block.",
                outside
            ))
            .observe("sha256_evil_firmware", evil_hex.clone())
            .observe("written_at", format!("offset {} (outside the block)", outside))
            .observe("affected", "memory contiguous with the signature block"),
        ParseStep::compromised("Comparison always matches", evil_hex.clone(), evil_hex)
            .narrative(format!(
                "The bootROM compares \"correct_hash\" (offset {}) with \"calculated_hash\" \
                 (offset {}). Both are SHA-256 of the same malicious firmware, so the check \
                 passes for any payload and the firmware runs with full ARM9 privileges.",
                lands_at, outside
            ))
            .observe("match", "always, for any firmware")
            .observe("result", "malicious firmware accepted: system compromised")
            .highlight_range(lands_at..lands_at + HASH_LEN, Region::Hash),
    ];
    for step in steps {
        let sequence = trace.len();
        trace
            .record(step)
            .map_err(|_| SimError::TraceHalted { sequence })?;
    }

    let steps = trace.into_steps();
    log_info("forge", &format!("exploit trace: {} steps, system compromised", steps.len()));
    Ok(steps)
}

/// `forge` followed by `trace_exploited`.
pub fn forge_and_trace_exploit(
    evil_firmware: &[u8],
) -> Result<(SignatureBlock, Vec<ParseStep>), SimError> {
    let (blk, info) = forge(evil_firmware)?;
    let steps = trace_exploited(&blk, evil_firmware, &info)?;
    Ok((blk, steps))
}
