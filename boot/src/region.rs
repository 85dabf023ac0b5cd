//! region.rs — semantic region tags for highlighted bytes
//!
//! Steps tag byte offsets with a `Region`; mapping a tag to any visual
//! treatment is left to the presentation layer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Header,
    PaddingType,
    Padding,
    Separator,
    Der,
    Ignored,
    SkipLength,
    Inner,
    Hash,
    CalculatedHash,
    /// A byte whose accepted value is one of the two flaws.
    Vulnerable,
    /// Bytes the forged skip jumps over.
    Skipped,
    /// Expected-hash bytes the parser is reading under the wrong identity.
    HashConfused,
}

impl Region {
    pub const ALL: [Region; 13] = [
        Region::Header,
        Region::PaddingType,
        Region::Padding,
        Region::Separator,
        Region::Der,
        Region::Ignored,
        Region::SkipLength,
        Region::Inner,
        Region::Hash,
        Region::CalculatedHash,
        Region::Vulnerable,
        Region::Skipped,
        Region::HashConfused,
    ];

    /// Stable tag string, identical to the serialised form.
    pub fn tag(self) -> &'static str {
        match self {
            Region::Header => "header",
            Region::PaddingType => "padding_type",
            Region::Padding => "padding",
            Region::Separator => "separator",
            Region::Der => "der",
            Region::Ignored => "ignored",
            Region::SkipLength => "skip_length",
            Region::Inner => "inner",
            Region::Hash => "hash",
            Region::CalculatedHash => "calculated_hash",
            Region::Vulnerable => "vulnerable",
            Region::Skipped => "skipped",
            Region::HashConfused => "hash_confused",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Header => "Block start",
            Region::PaddingType => "Padding type",
            Region::Padding => "Padding 0xFF",
            Region::Separator => "Separator",
            Region::Der => "DER marker",
            Region::Ignored => "Ignored marker",
            Region::SkipLength => "Skip-length byte",
            Region::Inner => "Algorithm identifier",
            Region::Hash => "correct_hash",
            Region::CalculatedHash => "calculated_hash",
            Region::Vulnerable => "Vulnerable byte",
            Region::Skipped => "Skipped bytes",
            Region::HashConfused => "Confused hash",
        }
    }

    /// Learner-facing explanation of the field.
    pub fn description(self) -> &'static str {
        match self {
            Region::Header => {
                "Always 0x00. Marks the start of a signature block; any other value \
                 rejects the firmware immediately."
            }
            Region::PaddingType => {
                "0x01 = padded with 0xFF, 0x02 = no padding. The bootROM accepts both; \
                 accepting 0x02 is Vulnerability 1 and shrinks the brute-force search \
                 for a forged signature."
            }
            Region::Padding => {
                "Run of 0xFF bytes up to the separator, checked byte by byte. Absent \
                 when the padding type is 0x02."
            }
            Region::Separator => "0x00 ending the padding and starting the DER structure.",
            Region::Der => "0x30 DER SEQUENCE tag. Checked by the bootROM.",
            Region::Ignored => {
                "Read by the parser but never validated (the 0x31 marker and the \
                 trailing 0x04 0x20)."
            }
            Region::SkipLength => {
                "Tells the parser how many bytes to skip without reading them. Honest \
                 value 0x0D (13). Never bounds-checked: Vulnerability 2, the core of \
                 the exploit."
            }
            Region::Inner => {
                "13-byte SHA-256 algorithm identifier \
                 (06 09 60 86 48 01 65 03 04 02 01 05 00), skipped unread."
            }
            Region::Hash => {
                "The 32-byte SHA-256 of the firmware the signer vouches for. In the \
                 exploit the cursor lands here believing it is somewhere else."
            }
            Region::CalculatedHash => {
                "Memory just past the signature block where the bootROM writes its own \
                 SHA-256 of the firmware before comparing."
            }
            Region::Vulnerable => "A byte whose value is accepted although it should not be.",
            Region::Skipped => "Bytes stepped over by the forged skip length.",
            Region::HashConfused => {
                "Bytes the parser reads as the expected hash, though its cursor was \
                 steered there by the forged skip."
            }
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.tag())
    }
}
