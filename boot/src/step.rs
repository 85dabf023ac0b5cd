//! step.rs — parser step records and the trace recorder
//!
//! A `ParseStep` is created through a verdict-specific constructor, so
//! fatality follows from the verdict: only a FAIL step is fatal. The
//! comparison verdicts (VERIFIED, COMPROMISED) cannot be built without both
//! digests. Steps are appended to a `Trace`, which numbers them and drops
//! every step offered after the first fatal one.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::block::BLOCK_SIZE;
use crate::region::Region;

/// Classification of a parser decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Info,
    Pass,
    Fail,
    Vulnerable,
    Exploited,
    Compromised,
    Verified,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Info => "INFO",
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Vulnerable => "VULNERABLE",
            Verdict::Exploited => "EXPLOITED",
            Verdict::Compromised => "COMPROMISED",
            Verdict::Verified => "VERIFIED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One labelled value shown alongside a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStep {
    sequence: usize,
    title: String,
    narrative: String,
    verdict: Verdict,
    fatal: bool,
    observed: Vec<Observation>,
    highlights: BTreeMap<usize, Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lands_at: Option<usize>,
}

impl ParseStep {
    fn new(verdict: Verdict, title: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            title: title.into(),
            narrative: String::new(),
            verdict,
            fatal: verdict == Verdict::Fail,
            observed: Vec::new(),
            highlights: BTreeMap::new(),
            cursor: None,
            lands_at: None,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(Verdict::Info, title)
    }

    pub fn pass(title: impl Into<String>) -> Self {
        Self::new(Verdict::Pass, title)
    }

    /// A rejected check. Always fatal.
    pub fn fail(title: impl Into<String>) -> Self {
        Self::new(Verdict::Fail, title)
    }

    /// PASS when `ok`, otherwise a fatal FAIL.
    pub fn check(ok: bool, title: impl Into<String>) -> Self {
        if ok {
            Self::pass(title)
        } else {
            Self::fail(title)
        }
    }

    pub fn vulnerable(title: impl Into<String>) -> Self {
        Self::new(Verdict::Vulnerable, title)
    }

    pub fn exploited(title: impl Into<String>) -> Self {
        Self::new(Verdict::Exploited, title)
    }

    /// Final comparison of the exploited parser; both sides hold the same digest.
    pub fn compromised(
        title: impl Into<String>,
        correct_hash: impl Into<String>,
        calculated_hash: impl Into<String>,
    ) -> Self {
        Self::new(Verdict::Compromised, title).with_hashes(correct_hash, calculated_hash)
    }

    pub fn verified(
        title: impl Into<String>,
        correct_hash: impl Into<String>,
        calculated_hash: impl Into<String>,
    ) -> Self {
        Self::new(Verdict::Verified, title).with_hashes(correct_hash, calculated_hash)
    }

    /// Hash comparison of the legitimate parser: VERIFIED when the digests
    /// are equal, otherwise a fatal FAIL. Both digests are recorded either way.
    pub fn comparison(
        title: impl Into<String>,
        correct_hash: impl Into<String>,
        calculated_hash: impl Into<String>,
    ) -> Self {
        let (correct, calculated) = (correct_hash.into(), calculated_hash.into());
        if correct == calculated {
            Self::verified(title, correct, calculated)
        } else {
            Self::fail(title).with_hashes(correct, calculated)
        }
    }

    fn with_hashes(self, correct_hash: impl Into<String>, calculated_hash: impl Into<String>) -> Self {
        self.observe("correct_hash", correct_hash).observe("calculated_hash", calculated_hash)
    }

    pub fn narrative(mut self, text: impl Into<String>) -> Self {
        self.narrative = text.into();
        self
    }

    pub fn observe(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.observed.push(Observation { label: label.into(), value: value.into() });
        self
    }

    /// Tag a single byte. Offsets past the block are dropped.
    pub fn highlight(mut self, offset: usize, region: Region) -> Self {
        if offset < BLOCK_SIZE {
            self.highlights.insert(offset, region);
        }
        self
    }

    /// Tag every byte in `range`, clipped to the block.
    pub fn highlight_range(mut self, range: Range<usize>, region: Region) -> Self {
        for offset in range.start..range.end.min(BLOCK_SIZE) {
            self.highlights.insert(offset, region);
        }
        self
    }

    pub fn cursor_at(mut self, offset: usize) -> Self {
        self.cursor = Some(offset);
        self
    }

    /// Where the cursor will land once the skip this step reads is applied.
    pub fn landing_at(mut self, offset: usize) -> Self {
        self.lands_at = Some(offset);
        self
    }

    #[inline]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn narrative_text(&self) -> &str {
        &self.narrative
    }

    #[inline]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    #[inline]
    pub fn observations(&self) -> &[Observation] {
        &self.observed
    }

    /// First observation with `label`.
    pub fn observed(&self, label: &str) -> Option<&str> {
        self.observed
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.value.as_str())
    }

    #[inline]
    pub fn highlights(&self) -> &BTreeMap<usize, Region> {
        &self.highlights
    }

    #[inline]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[inline]
    pub fn lands_at(&self) -> Option<usize> {
        self.lands_at
    }
}

/// Marker returned once a fatal step has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Halted;

/// Append-only step collector.
#[derive(Debug, Default)]
pub(crate) struct Trace {
    steps: Vec<ParseStep>,
    halted: bool,
}

impl Trace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number and append `step`; `Err(Halted)` if it was fatal. Once halted,
    /// further steps are dropped and every call returns `Err(Halted)`.
    pub(crate) fn record(&mut self, mut step: ParseStep) -> Result<(), Halted> {
        if self.halted {
            return Err(Halted);
        }
        step.sequence = self.steps.len();
        self.halted = step.fatal;
        self.steps.push(step);
        if self.halted {
            Err(Halted)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn into_steps(self) -> Vec<ParseStep> {
        self.steps
    }
}
