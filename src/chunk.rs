//! Text chunking strategies.
//!
//! Splits a document into `Chunk`s before translation. The
//! character-with-sentence-fallback strategy is the default; paragraph
//! and domain-aware (patent/subtitle) strategies are selected by
//! `detect_content_type` or requested explicitly.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::{ChunkPlan, ChunkSelectionStrategy};

/// A single unit of source text to be translated independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, start_offset: usize, end_offset: usize, text: String) -> Self {
        Self {
            index,
            start_offset,
            end_offset,
            text,
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Document content type, used to pick a chunking strategy and a
/// default preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Subtitle,
    Patent,
    Paper,
    Plain,
}

/// Strategy for splitting a document into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Character budget with sentence/paragraph-boundary snapping.
    Character,
    /// Never splits inside a paragraph unless the paragraph itself
    /// exceeds the budget, in which case it falls back to sentences.
    Paragraph,
    /// Splits on patent claim markers ("1.", "2.", ...).
    Patent,
    /// Batches SRT cues up to the character budget.
    Subtitle,
}

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?][\"')\]]?\s+").unwrap());
static PARAGRAPH_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static CLAIM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(\d+)\.\s").unwrap());
static SRT_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}").unwrap());

/// Heuristically classify a document so the caller can pick a default
/// chunking strategy and preset.
pub fn detect_content_type(text: &str) -> ContentType {
    if crate::srt::looks_like_srt(text) {
        ContentType::Subtitle
    } else if CLAIM_MARKER.is_match(text) && text.to_lowercase().contains("claim") {
        ContentType::Patent
    } else if text.to_lowercase().contains("abstract") && text.to_lowercase().contains("references") {
        ContentType::Paper
    } else {
        ContentType::Plain
    }
}

/// Splits documents into `Chunk`s and builds the initial `ChunkPlan`.
#[derive(Debug, Clone)]
pub struct TextChunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            overlap: 100,
        }
    }
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    /// Dispatch to the strategy-specific splitter and assign indices.
    pub fn chunk_text(&self, text: &str, strategy: ChunkingStrategy) -> Vec<Chunk> {
        let pieces = match strategy {
            ChunkingStrategy::Character => self.chunk_by_character(text),
            ChunkingStrategy::Paragraph => self.chunk_by_paragraph(text),
            ChunkingStrategy::Patent => self.chunk_by_patent(text),
            ChunkingStrategy::Subtitle => self.chunk_by_subtitle(text),
        };
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, (start, end, body))| Chunk::new(i, start, end, body))
            .collect()
    }

    pub fn build_plan(&self, text: &str, strategy: ChunkingStrategy, selection: ChunkSelectionStrategy) -> ChunkPlan {
        ChunkPlan {
            chunks: self.chunk_text(text, strategy),
            current_index: 0,
            overlap: self.overlap,
            strategy: selection,
        }
    }

    /// Default strategy: walk forward in `chunk_size`-character windows,
    /// snapping the boundary back to the nearest sentence end (or, if
    /// none is found within the window, the nearest paragraph break),
    /// then stepping back `overlap` characters for the next window's
    /// start so adjacent chunks share trailing context.
    fn chunk_by_character(&self, text: &str) -> Vec<(usize, usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        if n == 0 {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        let mut start = 0usize;
        while start < n {
            let ideal_end = (start + self.chunk_size).min(n);
            let end = if ideal_end >= n {
                n
            } else {
                self.find_break_point(&chars, start, ideal_end)
            };
            let body: String = chars[start..end].iter().collect();
            pieces.push((start, end, body));
            if end >= n {
                break;
            }
            start = end.saturating_sub(self.overlap).max(start + 1);
        }
        pieces
    }

    /// Search backward from `ideal_end` for a sentence boundary; fall
    /// back to a paragraph boundary; fall back to the hard limit.
    fn find_break_point(&self, chars: &[char], window_start: usize, ideal_end: usize) -> usize {
        let window: String = chars[window_start..ideal_end].iter().collect();
        if let Some(pos) = self.last_match_end(&SENTENCE_BOUNDARY, &window) {
            return window_start + pos;
        }
        if let Some(pos) = self.last_match_end(&PARAGRAPH_BOUNDARY, &window) {
            return window_start + pos;
        }
        ideal_end
    }

    fn last_match_end(&self, re: &Regex, haystack: &str) -> Option<usize> {
        re.find_iter(haystack)
            .last()
            .map(|m| haystack[..m.end()].chars().count())
    }

    /// Never splits inside a paragraph unless it alone exceeds the
    /// budget, in which case that paragraph is sentence-split and a
    /// warning is reported via the progress observer.
    fn chunk_by_paragraph(&self, text: &str) -> Vec<(usize, usize, String)> {
        let mut pieces = Vec::new();
        let mut offset = 0usize;
        let mut buffer = String::new();
        let mut buffer_start = 0usize;

        let paragraphs: Vec<&str> = PARAGRAPH_BOUNDARY.split(text).collect();
        for para in paragraphs {
            let para_len = para.chars().count();
            if para_len > self.chunk_size {
                if !buffer.is_empty() {
                    pieces.push((buffer_start, buffer_start + buffer.chars().count(), std::mem::take(&mut buffer)));
                }
                crate::progress_info!(
                    "paragraph of {} chars exceeds chunk_size {}, splitting by sentence",
                    para_len,
                    self.chunk_size
                );
                for (s, e, body) in self.split_paragraph_by_sentences(para, offset) {
                    pieces.push((s, e, body));
                }
                offset += para_len + 2;
                buffer_start = offset;
                continue;
            }
            if buffer.chars().count() + para_len > self.chunk_size && !buffer.is_empty() {
                pieces.push((buffer_start, buffer_start + buffer.chars().count(), std::mem::take(&mut buffer)));
                buffer_start = offset;
            }
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(para);
            offset += para_len + 2;
        }
        if !buffer.is_empty() {
            pieces.push((buffer_start, buffer_start + buffer.chars().count(), buffer));
        }
        pieces
    }

    fn split_paragraph_by_sentences(&self, para: &str, base_offset: usize) -> Vec<(usize, usize, String)> {
        let mut pieces = Vec::new();
        let mut start = 0usize;
        let chars: Vec<char> = para.chars().collect();
        let n = chars.len();
        while start < n {
            let ideal_end = (start + self.chunk_size).min(n);
            let end = if ideal_end >= n {
                n
            } else {
                self.find_break_point(&chars, start, ideal_end)
            };
            let body: String = chars[start..end].iter().collect();
            pieces.push((base_offset + start, base_offset + end, body));
            start = end;
        }
        pieces
    }

    /// Splits on numbered claim markers, keeping each claim as its own
    /// chunk (merging forward if a claim is small enough to share a
    /// budget with the next).
    fn chunk_by_patent(&self, text: &str) -> Vec<(usize, usize, String)> {
        let marker_starts: Vec<usize> = CLAIM_MARKER
            .find_iter(text)
            .map(|m| text[..m.start()].chars().count())
            .collect();
        if marker_starts.is_empty() {
            return self.chunk_by_character(text);
        }
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut bounds = marker_starts.clone();
        bounds.push(n);

        let mut pieces = Vec::new();
        let mut buffer = String::new();
        let mut buffer_start = bounds[0];
        for w in bounds.windows(2) {
            let (s, e) = (w[0], w[1]);
            let claim: String = chars[s..e].iter().collect();
            if buffer.chars().count() + claim.chars().count() > self.chunk_size && !buffer.is_empty() {
                pieces.push((buffer_start, buffer_start + buffer.chars().count(), std::mem::take(&mut buffer)));
                buffer_start = s;
            }
            buffer.push_str(&claim);
        }
        if !buffer.is_empty() {
            pieces.push((buffer_start, buffer_start + buffer.chars().count(), buffer));
        }
        if bounds[0] > 0 {
            let preamble: String = chars[..bounds[0]].iter().collect();
            pieces.insert(0, (0, bounds[0], preamble));
        }
        pieces
    }

    /// Batches whole SRT cues up to the character budget, never
    /// splitting a cue across chunks.
    fn chunk_by_subtitle(&self, text: &str) -> Vec<(usize, usize, String)> {
        let cues = crate::srt::parse_srt(text);
        if cues.is_empty() {
            return self.chunk_by_character(text);
        }
        let mut pieces = Vec::new();
        let mut buffer_cues: Vec<&crate::srt::SrtCue> = Vec::new();
        let mut buffer_len = 0usize;
        let mut offset = 0usize;
        let mut buffer_start = 0usize;

        for cue in &cues {
            let cue_len = cue.text.chars().count();
            if buffer_len + cue_len > self.chunk_size && !buffer_cues.is_empty() {
                let body = crate::srt::format_srt(&buffer_cues.iter().map(|c| (*c).clone()).collect::<Vec<_>>());
                pieces.push((buffer_start, offset, body));
                buffer_cues.clear();
                buffer_len = 0;
                buffer_start = offset;
            }
            buffer_cues.push(cue);
            buffer_len += cue_len;
            offset += cue_len;
        }
        if !buffer_cues.is_empty() {
            let body = crate::srt::format_srt(&buffer_cues.iter().map(|c| (*c).clone()).collect::<Vec<_>>());
            pieces.push((buffer_start, offset, body));
        }
        pieces
    }
}

/// Whether `text` looks like SRT subtitle content (used by
/// `detect_content_type` and kept separate so `srt.rs` stays the single
/// source of truth for the format's grammar).
pub(crate) fn has_srt_timestamp(text: &str) -> bool {
    SRT_TIMESTAMP.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_chunking_respects_budget_and_overlap() {
        let chunker = TextChunker::new(50, 10);
        let text = "Sentence one is here. Sentence two is here. Sentence three is here. Sentence four is here.";
        let chunks = chunker.chunk_by_character(text);
        assert!(chunks.len() > 1);
        for (_, _, body) in &chunks {
            assert!(body.chars().count() <= 60);
        }
    }

    #[test]
    fn character_chunking_covers_whole_text_without_gaps() {
        let chunker = TextChunker::new(20, 0);
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let chunks = chunker.chunk_text(text, ChunkingStrategy::Character);
        let joined: String = chunks.iter().map(|c| c.text.clone()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn paragraph_chunking_keeps_paragraphs_intact() {
        let chunker = TextChunker::new(1000, 0);
        let text = "Para one.\n\nPara two.\n\nPara three.";
        let chunks = chunker.chunk_text(text, ChunkingStrategy::Paragraph);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Para one."));
        assert!(chunks[0].text.contains("Para three."));
    }

    #[test]
    fn paragraph_chunking_splits_oversized_paragraph() {
        let chunker = TextChunker::new(20, 0);
        let long_para = "This one paragraph by itself is much longer than the budget allows here.";
        let chunks = chunker.chunk_text(long_para, ChunkingStrategy::Paragraph);
        assert!(chunks.len() > 1);
    }

    #[test]
    fn patent_chunking_splits_on_claim_markers() {
        let chunker = TextChunker::new(1000, 0);
        let text = "A patent for a widget.\n\n1. A device comprising a frame.\n2. The device of claim 1, further comprising a latch.\n";
        let chunks = chunker.chunk_text(text, ChunkingStrategy::Patent);
        assert!(chunks.len() >= 1);
        let joined: String = chunks.iter().map(|c| c.text.clone()).collect();
        assert!(joined.contains("claim 1"));
    }

    #[test]
    fn detect_content_type_recognizes_patent() {
        let text = "Claims\n\n1. A device comprising a frame.\n2. The device of claim 1.";
        assert_eq!(detect_content_type(text), ContentType::Patent);
    }

    #[test]
    fn detect_content_type_defaults_to_plain() {
        assert_eq!(detect_content_type("Just an ordinary paragraph of prose."), ContentType::Plain);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk_text("", ChunkingStrategy::Character).is_empty());
    }
}
