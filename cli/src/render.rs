// cli/src/render.rs — text and JSON views over core records
//
// Pure formatting: every function returns a String and the caller prints it.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::ops::Range;

use serde::Serialize;
use sighax_boot::digest::{hex_upper, sha256};
use sighax_boot::{hex_dump, ForgeInfo, KeySummary, ParseStep, Region, SignatureBlock, Verdict};

/// Firmware identity shown in reports; the raw bytes are never echoed.
#[derive(Debug, Serialize)]
pub struct FirmwareInfo {
    pub len: usize,
    pub sha256: String,
}

impl FirmwareInfo {
    pub fn of(firmware: &[u8]) -> Self {
        Self { len: firmware.len(), sha256: hex_upper(&sha256(firmware)) }
    }
}

#[derive(Debug, Serialize)]
pub struct RegionSpan {
    pub region: Region,
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Serialize)]
pub struct AnatomyEntry {
    pub region: Region,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TraceReport<'a> {
    pub firmware: FirmwareInfo,
    pub block: &'a SignatureBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge: Option<&'a ForgeInfo>,
    pub steps: &'a [ParseStep],
    pub result: Option<Verdict>,
}

#[derive(Debug, Serialize)]
pub struct BlockReport<'a> {
    pub firmware: FirmwareInfo,
    pub block: &'a SignatureBlock,
    pub regions: Vec<RegionSpan>,
}

pub fn region_spans(blk: &SignatureBlock) -> Vec<RegionSpan> {
    blk.regions()
        .into_iter()
        .map(|(region, r)| RegionSpan { region, name: region.name(), start: r.start, end: r.end })
        .collect()
}

pub fn anatomy() -> Vec<AnatomyEntry> {
    Region::ALL
        .iter()
        .map(|&region| AnatomyEntry {
            region,
            name: region.name(),
            description: region.description(),
        })
        .collect()
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Collapse per-byte tags into contiguous same-region runs.
fn highlight_runs(highlights: &BTreeMap<usize, Region>) -> Vec<(Range<usize>, Region)> {
    let mut runs: Vec<(Range<usize>, Region)> = Vec::new();
    for (&offset, &region) in highlights {
        match runs.last_mut() {
            Some((range, last)) if *last == region && range.end == offset => range.end += 1,
            _ => runs.push((offset..offset + 1, region)),
        }
    }
    runs
}

pub fn step_text(step: &ParseStep) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{:02}] {:<11} {}", step.sequence(), step.verdict().as_str(), step.title());
    for line in step.narrative_text().lines() {
        let _ = writeln!(out, "     {}", line);
    }
    for obs in step.observations() {
        let _ = writeln!(out, "     {} = {}", obs.label, obs.value);
    }
    match (step.cursor(), step.lands_at()) {
        (Some(c), Some(l)) => {
            let _ = writeln!(out, "     cursor {} -> lands at {}", c, l);
        }
        (Some(c), None) => {
            let _ = writeln!(out, "     cursor {}", c);
        }
        (None, Some(l)) => {
            let _ = writeln!(out, "     lands at {}", l);
        }
        (None, None) => {}
    }
    let runs = highlight_runs(step.highlights());
    if !runs.is_empty() {
        let spans: Vec<String> = runs
            .iter()
            .map(|(r, region)| format!("{}..{} {}", r.start, r.end, region))
            .collect();
        let _ = writeln!(out, "     highlight {}", spans.join(", "));
    }
    out
}

pub fn trace_text(heading: &str, blk: &SignatureBlock, steps: &[ParseStep], columns: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", heading);
    let _ = writeln!(out, "{}", hex_dump(blk.raw(), columns));
    let _ = writeln!(out);
    for step in steps {
        out.push_str(&step_text(step));
    }
    match steps.last() {
        Some(last) if last.is_fatal() => {
            let _ = writeln!(out, "result: {} (halted at step {})", last.verdict(), last.sequence());
        }
        Some(last) => {
            let _ = writeln!(out, "result: {}", last.verdict());
        }
        None => {
            let _ = writeln!(out, "result: no steps");
        }
    }
    out
}

pub fn forge_text(info: &ForgeInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "skip byte at {}: 0x{:02X} -> 0x{:02X}", info.skip_offset, info.original_skip, info.forged_skip);
    let _ = writeln!(
        out,
        "cursor {} + {} lands at {} (expected hash at {}); after the read it sits at {}, past calculated hash at {}",
        info.inner_start,
        info.forged_skip,
        info.lands_at,
        info.correct_hash_offset,
        info.outside(),
        info.calc_hash_offset,
    );
    let _ = writeln!(out, "evil firmware hash {}", hex_upper(&info.evil_hash));
    out
}

pub fn block_text(blk: &SignatureBlock, columns: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "padding type 0x{:02X} ({:?}), skip length 0x{:02X}, populated extent {}",
        blk.padding_type().as_byte(),
        blk.padding_type(),
        blk.skip_len(),
        blk.extent(),
    );
    let _ = writeln!(out, "offsets:");
    for (label, offset) in blk.offsets().ordered() {
        let _ = writeln!(out, "  {:<14} {}", label, offset);
    }
    let _ = writeln!(out, "regions:");
    for span in region_spans(blk) {
        let _ = writeln!(
            out,
            "  {:>3}..{:<3} {:<16} {}",
            span.start,
            span.end,
            span.region.tag(),
            span.name,
        );
    }
    let _ = writeln!(out, "{}", hex_dump(blk.raw(), columns));
    out
}

pub fn anatomy_text() -> String {
    let mut out = String::new();
    for entry in anatomy() {
        let _ = writeln!(out, "{:<16} {}", entry.region.tag(), entry.name);
        let _ = writeln!(out, "                 {}", entry.description);
    }
    out
}

pub fn key_text(key: &KeySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "algorithm    {}", key.algorithm);
    let _ = writeln!(out, "hash         {}", key.hash);
    let _ = writeln!(out, "padding      {}", key.padding);
    let _ = writeln!(out, "exponent     {}", key.exponent);
    let _ = writeln!(out, "modulus      {} bits ({} bytes), tag {}", key.bits, key.modulus_len, key.modulus_tag);
    let _ = writeln!(out, "modeled      {} bytes of the decrypted message", key.modeled_block_len);
    let _ = writeln!(out, "note         {}", key.note);
    out
}
