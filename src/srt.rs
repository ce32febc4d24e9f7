//! SRT subtitle codec.
//!
//! A minimal parser/formatter for the SubRip format, grounded on the
//! reference implementation's `parse_srt`/`format_srt`. Kept dependency
//! free (plain `str` splitting) since the grammar is simple and fixed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One subtitle cue: an index, a timing range, and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrtCue {
    pub index: u32,
    pub start: String,
    pub end: String,
    pub text: String,
}

static TIMESTAMP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})").unwrap());

/// Heuristic: does this text contain at least one SRT timestamp line?
pub fn looks_like_srt(text: &str) -> bool {
    crate::chunk::has_srt_timestamp(text)
}

/// Parse SRT-formatted text into cues. Malformed blocks (missing index
/// or timestamp) are skipped rather than aborting the whole parse.
pub fn parse_srt(text: &str) -> Vec<SrtCue> {
    let normalized = text.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in normalized.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        let mut lines = block.lines();
        let Some(index_line) = lines.next() else { continue };
        let Ok(index) = index_line.trim().parse::<u32>() else { continue };
        let Some(time_line) = lines.next() else { continue };
        let Some(caps) = TIMESTAMP_LINE.captures(time_line.trim()) else { continue };
        let start = caps[1].to_string();
        let end = caps[2].to_string();
        let body: String = lines.collect::<Vec<_>>().join("\n");
        cues.push(SrtCue {
            index,
            start,
            end,
            text: body,
        });
    }
    cues
}

/// Serialize cues back to SRT text, renumbering sequentially.
pub fn format_srt(cues: &[SrtCue]) -> String {
    cues.iter()
        .enumerate()
        .map(|(i, cue)| format!("{}\n{} --> {}\n{}", i + 1, cue.start, cue.end, cue.text))
        .collect::<Vec<_>>()
        .join("\n\n")
        + if cues.is_empty() { "" } else { "\n" }
}
