//! block.rs — SIGHAX Signature Block Builder (decrypted PKCS#1 v1.5 layout)
//!
//! Builds the 128-byte block the bootROM parser sees after `M = S^e mod N`,
//! recording the absolute offset of every field as it is emitted.
//!
//! Layout (PADDED, 0x01):
//!   +----------------------+ 0
//!   | 00                   | 1   block start
//!   | 01 / 02              | 1   padding type
//!   | FF .. FF             | 74  padding run (absent when UNPADDED)
//!   | 00                   | 1   separator
//!   | 30 31 30             | 3   DER markers (0x31 never checked)
//!   | 0D                   | 1   skip length
//!   | 06 09 60 .. 05 00    | 13  SHA-256 algorithm identifier
//!   | 04 20                | 2   trailing markers (never checked)
//!   | SHA-256(firmware)    | 32  expected hash
//!   +----------------------+ 128 calculated hash lands here (adjacent memory)
//!
//! An UNPADDED block populates 54 bytes; the rest of the buffer is zero fill
//! standing in for the memory after the block.

use std::ops::Range;

use serde::Serialize;

use crate::digest::{serialize_hex, sha256};
use crate::error::BlockError;
use crate::logger::log_debug;
use crate::region::Region;

/// Fixed size of the decrypted block buffer.
pub const BLOCK_SIZE: usize = 128;
/// SHA-256 digest length.
pub const HASH_LEN: usize = 32;
/// True length of the algorithm identifier; the honest skip-length value.
pub const INNER_BLOCK_LEN: u8 = 13;
/// The padding run is never shorter than this.
pub const MIN_PADDING_LEN: usize = 8;

pub const BLOCK_START: u8 = 0x00;
pub const SEPARATOR: u8 = 0x00;
pub const PADDING_BYTE: u8 = 0xFF;
pub const DER_SEQUENCE: u8 = 0x30;
pub const DER_SET: u8 = 0x31;
pub const OCTET_STRING: u8 = 0x04;
pub const DIGEST_LEN_MARKER: u8 = 0x20;

/// DER AlgorithmIdentifier for SHA-256 (OID 2.16.840.1.101.3.4.2.1 + NULL).
pub const SHA256_ALGORITHM_ID: [u8; INNER_BLOCK_LEN as usize] = [
    0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00,
];

/// Bytes emitted after the separator, independent of padding type.
const FIXED_TAIL_LEN: usize = 3 + 1 + SHA256_ALGORITHM_ID.len() + 2 + HASH_LEN;
const HEADER_LEN: usize = 2;

// The padding clamp must never push the expected hash past the buffer.
const _: () = assert!(HEADER_LEN + MIN_PADDING_LEN + 1 + FIXED_TAIL_LEN <= BLOCK_SIZE);

/// Byte 1 of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PaddingType {
    Padded = 0x01,
    Unpadded = 0x02,
}

impl PaddingType {
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Length of the 0xFF run this padding type produces.
    pub fn padding_len(self) -> usize {
        match self {
            PaddingType::Padded => {
                let computed = BLOCK_SIZE.saturating_sub(HEADER_LEN + 1 + FIXED_TAIL_LEN);
                computed.max(MIN_PADDING_LEN)
            }
            PaddingType::Unpadded => 0,
        }
    }
}

impl TryFrom<u8> for PaddingType {
    type Error = BlockError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PaddingType::Padded),
            0x02 => Ok(PaddingType::Unpadded),
            other => Err(BlockError::InvalidPaddingType(other)),
        }
    }
}

/// Absolute offset of every field, recorded in emission order.
///
/// `padding_end` is exclusive and always equals `separator`; `calc_hash`
/// is the first byte after the expected hash and marks the populated extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Offsets {
    pub block_start: usize,
    pub padding_type: usize,
    pub padding_start: usize,
    pub padding_end: usize,
    pub separator: usize,
    pub der_outer: usize,
    pub der_set: usize,
    pub der_inner: usize,
    pub skip_len: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub octet_tag: usize,
    pub digest_len: usize,
    pub correct_hash: usize,
    pub calc_hash: usize,
}

impl Offsets {
    /// All offsets in layout order, labelled.
    pub fn ordered(&self) -> [(&'static str, usize); 15] {
        [
            ("block_start", self.block_start),
            ("padding_type", self.padding_type),
            ("padding_start", self.padding_start),
            ("padding_end", self.padding_end),
            ("separator", self.separator),
            ("der_outer", self.der_outer),
            ("der_set", self.der_set),
            ("der_inner", self.der_inner),
            ("skip_len", self.skip_len),
            ("inner_start", self.inner_start),
            ("inner_end", self.inner_end),
            ("octet_tag", self.octet_tag),
            ("digest_len", self.digest_len),
            ("correct_hash", self.correct_hash),
            ("calc_hash", self.calc_hash),
        ]
    }

    #[inline]
    pub fn padding(&self) -> Range<usize> {
        self.padding_start..self.padding_end
    }

    #[inline]
    pub fn inner(&self) -> Range<usize> {
        self.inner_start..self.inner_end
    }

    #[inline]
    pub fn correct_hash_span(&self) -> Range<usize> {
        self.correct_hash..self.correct_hash + HASH_LEN
    }
}

/// The decrypted signature block as the parser sees it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureBlock {
    #[serde(serialize_with = "serialize_hex")]
    raw: [u8; BLOCK_SIZE],
    padding: PaddingType,
    skip_len: u8,
    offsets: Offsets,
    #[serde(serialize_with = "serialize_hex")]
    embedded_hash: [u8; HASH_LEN],
}

impl SignatureBlock {
    /// Lay out a block for `firmware`.
    ///
    /// The skip-length byte holds `skip_override` when given, else 13. The
    /// identifier is always emitted at full length whatever that byte claims;
    /// only the parser misreads it. Any firmware and padding type is accepted.
    pub fn build(firmware: &[u8], padding: PaddingType, skip_override: Option<u8>) -> Self {
        let skip_len = skip_override.unwrap_or(INNER_BLOCK_LEN);
        let embedded_hash = sha256(firmware);

        let mut buf: Vec<u8> = Vec::with_capacity(BLOCK_SIZE + MIN_PADDING_LEN);
        let block_start = buf.len();
        buf.push(BLOCK_START);
        let padding_type = buf.len();
        buf.push(padding.as_byte());

        let padding_start = buf.len();
        buf.resize(padding_start + padding.padding_len(), PADDING_BYTE);
        let padding_end = buf.len();

        let separator = buf.len();
        buf.push(SEPARATOR);
        let der_outer = buf.len();
        buf.push(DER_SEQUENCE);
        let der_set = buf.len();
        buf.push(DER_SET);
        let der_inner = buf.len();
        buf.push(DER_SEQUENCE);
        let skip_off = buf.len();
        buf.push(skip_len);

        let inner_start = buf.len();
        buf.extend_from_slice(&SHA256_ALGORITHM_ID);
        let inner_end = buf.len();

        let octet_tag = buf.len();
        buf.push(OCTET_STRING);
        let digest_len = buf.len();
        buf.push(DIGEST_LEN_MARKER);

        let correct_hash = buf.len();
        buf.extend_from_slice(&embedded_hash);
        let calc_hash = correct_hash + HASH_LEN;

        // Truncate or zero-fill to the fixed buffer size.
        buf.resize(BLOCK_SIZE, 0x00);
        let mut raw = [0u8; BLOCK_SIZE];
        raw.copy_from_slice(&buf);

        let offsets = Offsets {
            block_start,
            padding_type,
            padding_start,
            padding_end,
            separator,
            der_outer,
            der_set,
            der_inner,
            skip_len: skip_off,
            inner_start,
            inner_end,
            octet_tag,
            digest_len,
            correct_hash,
            calc_hash,
        };

        log_debug(
            "block",
            &format!(
                "built {:?} block: skip=0x{:02X} separator@{} hash@{} extent={}",
                padding, skip_len, separator, correct_hash, calc_hash
            ),
        );

        Self { raw, padding, skip_len, offsets, embedded_hash }
    }

    /// Build from a raw padding-type byte, rejecting anything but 0x01/0x02.
    pub fn try_build(firmware: &[u8], padding: u8, skip_override: Option<u8>) -> Result<Self, BlockError> {
        let padding = PaddingType::try_from(padding)?;
        Ok(Self::build(firmware, padding, skip_override))
    }

    #[inline]
    pub fn raw(&self) -> &[u8; BLOCK_SIZE] {
        &self.raw
    }

    #[inline]
    pub fn padding_type(&self) -> PaddingType {
        self.padding
    }

    /// Value written into the skip-length byte at build time.
    #[inline]
    pub fn skip_len(&self) -> u8 {
        self.skip_len
    }

    #[inline]
    pub fn offsets(&self) -> &Offsets {
        &self.offsets
    }

    #[inline]
    pub fn embedded_hash(&self) -> &[u8; HASH_LEN] {
        &self.embedded_hash
    }

    /// First byte past the populated structure (`off_calc_hash`, capped at the buffer).
    #[inline]
    pub fn extent(&self) -> usize {
        self.offsets.calc_hash.min(BLOCK_SIZE)
    }

    /// Bounds-checked single byte read.
    pub fn byte(&self, offset: usize) -> Result<u8, BlockError> {
        self.raw
            .get(offset)
            .copied()
            .ok_or(BlockError::OutOfBounds { offset, len: BLOCK_SIZE })
    }

    /// Bounds-checked span read.
    pub fn span(&self, range: Range<usize>) -> Result<&[u8], BlockError> {
        let end = range.end;
        self.raw
            .get(range)
            .ok_or(BlockError::OutOfBounds { offset: end, len: BLOCK_SIZE })
    }

    /// The 32 bytes a parser reads as "the hash" when its cursor sits at `offset`.
    pub fn hash_at(&self, offset: usize) -> Result<[u8; HASH_LEN], BlockError> {
        let end = offset.checked_add(HASH_LEN).ok_or(BlockError::OutOfBounds {
            offset,
            len: BLOCK_SIZE,
        })?;
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(self.span(offset..end)?);
        Ok(out)
    }

    /// Copy of this block with one byte patched. Offsets and the recorded
    /// hash are carried over, so the parser judges the corrupted bytes against
    /// the original layout.
    pub fn with_byte(&self, offset: usize, value: u8) -> Result<Self, BlockError> {
        if offset >= BLOCK_SIZE {
            return Err(BlockError::OutOfBounds { offset, len: BLOCK_SIZE });
        }
        let mut patched = self.clone();
        patched.raw[offset] = value;
        log_debug("block", &format!("patched byte {} = 0x{:02X}", offset, value));
        Ok(patched)
    }

    /// Populated fields in layout order. Empty spans (the padding run of an
    /// UNPADDED block) are omitted; the calculated-hash span lies past the
    /// populated extent.
    pub fn regions(&self) -> Vec<(Region, Range<usize>)> {
        let o = &self.offsets;
        let all = [
            (Region::Header, o.block_start..o.block_start + 1),
            (Region::PaddingType, o.padding_type..o.padding_type + 1),
            (Region::Padding, o.padding()),
            (Region::Separator, o.separator..o.separator + 1),
            (Region::Der, o.der_outer..o.der_outer + 1),
            (Region::Ignored, o.der_set..o.der_set + 1),
            (Region::Der, o.der_inner..o.der_inner + 1),
            (Region::SkipLength, o.skip_len..o.skip_len + 1),
            (Region::Inner, o.inner()),
            (Region::Ignored, o.octet_tag..o.digest_len + 1),
            (Region::Hash, o.correct_hash_span()),
            (Region::CalculatedHash, o.calc_hash..o.calc_hash + HASH_LEN),
        ];
        all.into_iter().filter(|(_, r)| !r.is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIRM: &[u8] = b"NATIVE_FIRM v11.17 ARM9=0x08006000 ARM11=0x1FF80000";

    #[test]
    fn padded_layout_fills_block_exactly() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let o = blk.offsets();
        assert_eq!(blk.raw().len(), BLOCK_SIZE);
        assert_eq!(o.padding_end - o.padding_start, 74);
        assert_eq!(o.separator, 76);
        assert_eq!(o.skip_len, 80);
        assert_eq!(o.inner_start, 81);
        assert_eq!(o.inner_end, 94);
        assert_eq!(o.correct_hash, 96);
        assert_eq!(o.calc_hash, BLOCK_SIZE);
        assert_eq!(blk.extent(), BLOCK_SIZE);
        assert!(blk.raw()[o.padding()].iter().all(|&b| b == 0xFF));
        assert_eq!(blk.raw()[o.skip_len], INNER_BLOCK_LEN);
    }

    #[test]
    fn unpadded_layout_has_empty_padding_and_zero_fill() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Unpadded, None);
        let o = blk.offsets();
        assert_eq!(o.padding_start, o.padding_end);
        assert_eq!(o.separator, 2);
        assert_eq!(o.der_outer, 3);
        assert_eq!(o.der_set, 4);
        assert_eq!(o.der_inner, 5);
        assert_eq!(o.skip_len, 6);
        assert_eq!(o.inner_start, 7);
        assert_eq!(o.correct_hash, 22);
        assert_eq!(o.calc_hash, 54);
        assert_eq!(blk.raw()[1], 0x02);
        assert!(blk.raw()[54..].iter().all(|&b| b == 0));
    }

    #[test]
    fn offsets_are_non_decreasing() {
        for padding in [PaddingType::Padded, PaddingType::Unpadded] {
            let blk = SignatureBlock::build(FIRM, padding, None);
            let ordered = blk.offsets().ordered();
            for pair in ordered.windows(2) {
                assert!(pair[0].1 <= pair[1].1, "{:?} > {:?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn fixed_markers_and_identifier_in_place() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let o = blk.offsets();
        let raw = blk.raw();
        assert_eq!(raw[o.block_start], 0x00);
        assert_eq!(raw[o.padding_type], 0x01);
        assert_eq!(raw[o.separator], 0x00);
        assert_eq!(&raw[o.der_outer..=o.der_inner], &[0x30, 0x31, 0x30]);
        assert_eq!(&raw[o.inner()], &SHA256_ALGORITHM_ID);
        assert_eq!(&raw[o.octet_tag..=o.digest_len], &[0x04, 0x20]);
    }

    #[test]
    fn embedded_hash_is_sha256_of_firmware() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        assert_eq!(blk.embedded_hash(), &sha256(FIRM));
        assert_eq!(&blk.raw()[blk.offsets().correct_hash_span()], &sha256(FIRM));
    }

    #[test]
    fn skip_override_changes_only_the_skip_byte() {
        let honest = SignatureBlock::build(FIRM, PaddingType::Unpadded, None);
        let forged = SignatureBlock::build(FIRM, PaddingType::Unpadded, Some(0x0F));
        assert_eq!(honest.offsets(), forged.offsets());
        let diff: Vec<usize> = (0..BLOCK_SIZE)
            .filter(|&i| honest.raw()[i] != forged.raw()[i])
            .collect();
        assert_eq!(diff, vec![honest.offsets().skip_len]);
        assert_eq!(forged.skip_len(), 0x0F);
    }

    #[test]
    fn build_is_deterministic() {
        let a = SignatureBlock::build(FIRM, PaddingType::Padded, Some(7));
        let b = SignatureBlock::build(FIRM, PaddingType::Padded, Some(7));
        assert_eq!(a, b);
    }

    #[test]
    fn padding_clamp_never_truncates_hash() {
        // Layout does not depend on firmware length; hash must survive intact.
        for len in [0usize, 1, 50, 127, 128, 129, 1024, 65536] {
            let firmware: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let blk = SignatureBlock::build(&firmware, PaddingType::Padded, None);
            assert!(blk.offsets().calc_hash <= BLOCK_SIZE);
            assert_eq!(blk.hash_at(blk.offsets().correct_hash).unwrap(), sha256(&firmware));
        }
        assert!(PaddingType::Padded.padding_len() >= MIN_PADDING_LEN);
    }

    #[test]
    fn invalid_padding_byte_fails_fast() {
        assert_eq!(
            SignatureBlock::try_build(FIRM, 0x03, None).unwrap_err(),
            BlockError::InvalidPaddingType(0x03)
        );
        assert!(SignatureBlock::try_build(FIRM, 0x02, None).is_ok());
    }

    #[test]
    fn reads_outside_buffer_are_errors() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        assert!(blk.byte(BLOCK_SIZE).is_err());
        assert!(blk.hash_at(BLOCK_SIZE - 8).is_err());
        assert!(blk.with_byte(BLOCK_SIZE, 0).is_err());
    }

    #[test]
    fn with_byte_leaves_original_untouched() {
        let blk = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let bad = blk.with_byte(0, 0x01).unwrap();
        assert_eq!(blk.raw()[0], 0x00);
        assert_eq!(bad.raw()[0], 0x01);
        assert_eq!(bad.offsets(), blk.offsets());
    }

    #[test]
    fn regions_skip_empty_padding() {
        let padded = SignatureBlock::build(FIRM, PaddingType::Padded, None);
        let unpadded = SignatureBlock::build(FIRM, PaddingType::Unpadded, None);
        assert!(padded.regions().iter().any(|(r, _)| *r == Region::Padding));
        assert!(!unpadded.regions().iter().any(|(r, _)| *r == Region::Padding));
        let (last, span) = unpadded.regions().pop().unwrap();
        assert_eq!(last, Region::CalculatedHash);
        assert_eq!(span, 54..86);
    }
}
