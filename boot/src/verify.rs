//! verify.rs — bootROM Signature Parse Trace (legitimate path)
//!
//! Replays the fixed-function parser over a decrypted block, one step per
//! decision point:
//! - byte 0 must be 0x00
//! - byte 1 is the padding type; 0x01 and 0x02 are both accepted
//! - the 0xFF padding run (padded blocks only)
//! - the 0x00 separator
//! - 0x30 / 0x31 / 0x30, where the 0x31 is never checked
//! - the skip-length byte, read and trusted as-is
//! - 0x04 0x20, read and ignored
//! - the expected hash against a fresh SHA-256 of the firmware
//!
//! A failed check is fatal: the trace ends with that step.

use crate::block::{
    PaddingType, SignatureBlock, BLOCK_START, DER_SEQUENCE, HASH_LEN, PADDING_BYTE, SEPARATOR,
};
use crate::digest::{hex_upper, sha256};
use crate::error::BlockError;
use crate::key::key_summary;
use crate::logger::{log_info, log_warn};
use crate::region::Region;
use crate::step::{Halted, ParseStep, Trace};

/// Build a padded block for `firmware` and trace it.
pub fn trace_legitimate(firmware: &[u8]) -> Vec<ParseStep> {
    let blk = SignatureBlock::build(firmware, PaddingType::Padded, None);
    trace_block(&blk, firmware)
}

/// Trace an arbitrary (possibly tampered) block against `firmware`.
pub fn trace_block(blk: &SignatureBlock, firmware: &[u8]) -> Vec<ParseStep> {
    let mut trace = Trace::new();
    match run(&mut trace, blk, firmware) {
        Ok(()) => {}
        Err(Stop::Halted) => log_warn("verify", "fatal step, parser rejects the firmware"),
        Err(Stop::Broken(e)) => {
            // Offsets come from the builder and stay in bounds; a read error
            // here means the layout itself is broken.
            log_warn("verify", &format!("trace aborted: {}", e));
            let _ = trace.record(
                ParseStep::fail("Parser read outside the signature block").observe("error", e.to_string()),
            );
        }
    }
    let steps = trace.into_steps();
    if let Some(last) = steps.last() {
        log_info(
            "verify",
            &format!("legitimate trace: {} steps, final verdict {}", steps.len(), last.verdict()),
        );
    }
    steps
}

enum Stop {
    Halted,
    Broken(BlockError),
}

impl From<Halted> for Stop {
    fn from(_: Halted) -> Self {
        Stop::Halted
    }
}

impl From<BlockError> for Stop {
    fn from(e: BlockError) -> Self {
        Stop::Broken(e)
    }
}

fn run(trace: &mut Trace, blk: &SignatureBlock, firmware: &[u8]) -> Result<(), Stop> {
    let o = *blk.offsets();
    let key = key_summary();
    let firmware_hash = sha256(firmware);

    trace.record(ParseStep::info("bootROM start: load firmware image")
        .narrative(
            "The bootROM runs first at power-on. It reads the firmware image, locates \
             the RSA signature and decrypts it with the public key burned into ROM, \
             then parses the result byte by byte.",
        )
        .observe("signature", format!("{} bytes ({})", key.modulus_len, key.algorithm))
        .observe("public_key", "fixed in mask ROM")
        .observe("firmware_sha256", hex_upper(&firmware_hash)))?;

    trace.record(ParseStep::info("Decrypt signature: M = S^e mod N")
        .narrative("M is the signature block the parser walks through, field by field.")
        .observe("operation", "M = S^e mod N")
        .observe("e", format!("{} (0x{:X})", key.exponent, key.exponent))
        .observe("modeled_block", format!("{} bytes", key.modeled_block_len)))?;

    // byte[0]
    let b0 = blk.byte(o.block_start)?;
    let b0_ok = b0 == BLOCK_START;
    trace.record(ParseStep::check(b0_ok, format!("byte[0] = 0x{:02X}: block start", b0))
        .narrative("Must be 0x00; marks the start of an RSA signature block.")
        .observe("expected", "0x00")
        .observe("received", format!("0x{:02X}", b0))
        .observe("result", if b0_ok { "ok" } else { "firmware rejected" })
        .highlight(o.block_start, Region::Header)
        .cursor_at(o.block_start))?;

    // byte[1]
    let b1 = blk.byte(o.padding_type)?;
    let b1_ok = PaddingType::try_from(b1).is_ok();
    let b1_meaning = match PaddingType::try_from(b1) {
        Ok(PaddingType::Padded) => "padded with 0xFF",
        Ok(PaddingType::Unpadded) => "no padding, accepted anyway",
        Err(_) => "unknown padding type",
    };
    trace.record(ParseStep::check(b1_ok, format!("byte[1] = 0x{:02X}: padding type", b1))
        .narrative(
            "0x01 means the block carries 0xFF padding. The parser would silently accept \
             0x02 (no padding) as well: Vulnerability 1.",
        )
        .observe("received", format!("0x{:02X} ({})", b1, b1_meaning))
        .observe("note", "0x02 is also accepted (Vulnerability 1)")
        .highlight(o.padding_type, Region::Header)
        .cursor_at(o.padding_type))?;

    // padding run
    if b1 == PaddingType::Padded.as_byte() && o.padding_start < o.separator {
        let pad = blk.span(o.padding())?;
        let pad_ok = pad.iter().all(|&b| b == PADDING_BYTE);
        trace.record(ParseStep::check(
            pad_ok,
            format!("bytes[{}..{}]: 0xFF padding", o.padding_start, o.separator - 1),
        )
        .narrative(format!(
            "{} padding bytes. Each must be 0xFF; the parser advances to the separator.",
            pad.len()
        ))
        .observe("padding_bytes", pad.len().to_string())
        .observe("all_0xFF", if pad_ok { "yes" } else { "no" })
        .highlight_range(o.padding(), Region::Padding)
        .cursor_at(o.padding_start))?;
    }

    // separator
    let sep = blk.byte(o.separator)?;
    trace.record(ParseStep::check(sep == SEPARATOR, format!("byte[{}] = 0x{:02X}: separator", o.separator, sep))
        .narrative("0x00 ends the padding and opens the DER structure.")
        .observe("expected", "0x00")
        .observe("received", format!("0x{:02X}", sep))
        .highlight(o.separator, Region::Separator)
        .cursor_at(o.separator))?;

    // DER markers; the middle one is never validated
    let d0 = blk.byte(o.der_outer)?;
    let d1 = blk.byte(o.der_set)?;
    let d2 = blk.byte(o.der_inner)?;
    let der_ok = d0 == DER_SEQUENCE && d2 == DER_SEQUENCE;
    let mark = |b: u8| if b == DER_SEQUENCE { "checked, ok" } else { "checked, expected 0x30" };
    trace.record(ParseStep::check(der_ok, "0x30, 0x31, 0x30: DER structure")
        .narrative("First 0x30 checked, 0x31 ignored by the bootROM, second 0x30 checked.")
        .observe(format!("[{}]=0x{:02X}", o.der_outer, d0), mark(d0))
        .observe(format!("[{}]=0x{:02X}", o.der_set, d1), "ignored by the bootROM")
        .observe(format!("[{}]=0x{:02X}", o.der_inner, d2), mark(d2))
        .highlight(o.der_outer, Region::Der)
        .highlight(o.der_set, Region::Ignored)
        .highlight(o.der_inner, Region::Der)
        .cursor_at(o.der_outer))?;

    // skip length: read, trusted, never bounded
    let skip = blk.byte(o.skip_len)?;
    let lands = o.inner_start + skip as usize;
    trace.record(ParseStep::info(format!(
        "byte[{}] = 0x{:02X} ({}): inner block length",
        o.skip_len, skip, skip
    ))
    .narrative(format!(
        "This byte tells the parser how many bytes to skip unread. Value {} means it \
         jumps {} bytes from offset {}. Nothing bounds it: whoever controls this byte \
         controls where the parser resumes.",
        skip, skip, o.inner_start
    ))
    .observe("value", format!("0x{:02X} = {} bytes", skip, skip))
    .observe("inner_block", "SHA-256 algorithm identifier, skipped unread")
    .observe("cursor_after_skip", format!("offset {}", lands))
    .highlight(o.skip_len, Region::SkipLength)
    .highlight_range(o.inner(), Region::Inner)
    .cursor_at(o.skip_len)
    .landing_at(lands))?;

    // trailing markers
    let t0 = blk.byte(o.octet_tag)?;
    let t1 = blk.byte(o.digest_len)?;
    trace.record(ParseStep::info("0x04, 0x20: ignored as well")
        .narrative("Both bytes are read and never validated. Next comes the expected hash.")
        .observe(format!("[{}]=0x{:02X}", o.octet_tag, t0), "ignored")
        .observe(format!("[{}]=0x{:02X}", o.digest_len, t1), "ignored")
        .observe("next", format!("correct_hash at offset {}", o.correct_hash))
        .highlight(o.octet_tag, Region::Ignored)
        .highlight(o.digest_len, Region::Ignored)
        .cursor_at(o.octet_tag))?;

    // hash comparison
    let expected = blk.hash_at(o.correct_hash)?;
    let matched = expected == firmware_hash;
    trace.record(ParseStep::comparison(
        "Compare correct_hash with calculated_hash",
        hex_upper(&expected),
        hex_upper(&firmware_hash),
    )
        .narrative(
            "The bootROM hashes the firmware itself (calculated_hash) and compares it \
             with the correct_hash carried in the signature block.",
        )
        .observe("result", if matched { "identical, firmware authentic" } else { "mismatch, firmware rejected" })
        .highlight_range(o.correct_hash..o.correct_hash + HASH_LEN, Region::Hash)
        .cursor_at(o.correct_hash))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;
    use crate::step::Verdict;
    use pretty_assertions::assert_eq;

    const FIRM: &[u8] = b"NATIVE_FIRM v11.17 ARM9=0x08006000 ARM11=0x1FF80000";

    fn corpus() -> Vec<Vec<u8>> {
        vec![
            Vec::new(),
            vec![0x00],
            FIRM.to_vec(),
            b"SAFE_MODE_FIRM".to_vec(),
            (0..4096).map(|i| (i % 253) as u8).collect(),
        ]
    }

    #[test]
    fn native_firm_verifies_in_ten_steps() {
        let steps = trace_legitimate(FIRM);
        assert_eq!(steps.len(), 10);
        let last = steps.last().unwrap();
        assert_eq!(last.verdict(), Verdict::Verified);
        let correct = last.observed("correct_hash").unwrap();
        let calculated = last.observed("calculated_hash").unwrap();
        assert_eq!(correct, calculated);
        assert_eq!(correct.len(), 64);
        assert!(correct.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn every_firmware_verifies_without_fatal_steps() {
        for fw in corpus() {
            let steps = trace_legitimate(&fw);
            assert!(steps.iter().all(|s| !s.is_fatal()));
            assert_eq!(steps.last().unwrap().verdict(), Verdict::Verified);
        }
    }

    #[test]
    fn sequence_numbers_are_ordinal() {
        let steps = trace_legitimate(FIRM);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.sequence(), i);
        }
    }

    #[test]
    fn flipped_hash_byte_fails_at_comparison() {
        for fw in corpus() {
            let blk = SignatureBlock::build(&fw, PaddingType::Padded, None);
            let hash = blk.offsets().correct_hash;
            for i in [0, 13, HASH_LEN - 1] {
                let off = hash + i;
                let bad = blk.with_byte(off, blk.raw()[off] ^ 0x01).unwrap();
                let steps = trace_block(&bad, &fw);
                assert_eq!(steps.len(), 10);
                let last = steps.last().unwrap();
                assert_eq!(last.verdict(), Verdict::Fail);
                assert!(last.is_fatal());
                assert_eq!(last.title(), "Compare correct_hash with calculated_hash");
                assert!(steps[..9].iter().all(|s| !s.is_fatal()));
            }
        }
    }

    #[test]
    fn bad_block_start_stops_at_first_check() {
        for fw in corpus() {
            let blk = SignatureBlock::build(&fw, PaddingType::Padded, None);
            for value in [0x01u8, 0x7F, 0xFF] {
                let steps = trace_block(&blk.with_byte(0, value).unwrap(), &fw);
                // Two boot preamble steps, then the single failing check.
                assert_eq!(steps.len(), 3);
                let checks: Vec<&ParseStep> =
                    steps.iter().filter(|s| s.verdict() != Verdict::Info).collect();
                assert_eq!(checks.len(), 1);
                assert_eq!(checks[0].verdict(), Verdict::Fail);
                assert!(checks[0].is_fatal());
                assert_eq!(checks[0].cursor(), Some(0));
            }
        }
    }

    #[test]
    fn bad_padding_byte_is_fatal() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let bad = blk.with_byte(10, 0xFE).unwrap();
        let steps = trace_block(&bad, FIRM);
        assert_eq!(steps.len(), 5);
        assert!(steps[4].is_fatal());
        assert_eq!(steps[4].observed("all_0xFF"), Some("no"));
    }

    #[test]
    fn unknown_padding_type_is_fatal() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let steps = trace_block(&blk.with_byte(1, 0x05).unwrap(), FIRM);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[3].verdict(), Verdict::Fail);
    }

    #[test]
    fn bad_separator_is_fatal() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let sep = blk.offsets().separator;
        let steps = trace_block(&blk.with_byte(sep, 0x42).unwrap(), FIRM);
        assert_eq!(steps.len(), 6);
        assert!(steps.last().unwrap().is_fatal());
    }

    #[test]
    fn ignored_der_byte_does_not_halt() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let set = blk.offsets().der_set;
        let steps = trace_block(&blk.with_byte(set, 0xAA).unwrap(), FIRM);
        assert_eq!(steps.len(), 10);
        assert_eq!(steps.last().unwrap().verdict(), Verdict::Verified);
        assert_eq!(steps[6].observed(&format!("[{}]=0xAA", set)), Some("ignored by the bootROM"));
    }

    #[test]
    fn checked_der_byte_is_fatal() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let inner = blk.offsets().der_inner;
        let steps = trace_block(&blk.with_byte(inner, 0x31).unwrap(), FIRM);
        assert_eq!(steps.len(), 7);
        assert!(steps[6].is_fatal());
    }

    #[test]
    fn skip_byte_is_reported_never_fatal() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, Some(0xFF));
        let steps = trace_block(&blk, FIRM);
        assert_eq!(steps.len(), 10);
        let skip = &steps[7];
        assert_eq!(skip.verdict(), Verdict::Info);
        assert_eq!(skip.lands_at(), Some(blk.offsets().inner_start + 0xFF));
        assert!(skip.lands_at().unwrap() > BLOCK_SIZE);
    }

    #[test]
    fn hash_of_other_firmware_is_rejected() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let steps = trace_block(&blk, b"EVIL_FIRM");
        assert_eq!(steps.last().unwrap().verdict(), Verdict::Fail);
    }

    #[test]
    fn unpadded_block_skips_padding_step() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Unpadded, None);
        let steps = trace_block(&blk, FIRM);
        assert_eq!(steps.len(), 9);
        assert_eq!(steps.last().unwrap().verdict(), Verdict::Verified);
    }
}
