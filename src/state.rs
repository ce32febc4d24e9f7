//! Translation project memory.
//!
//! `TranslationState` is the single shared mutable resource in the
//! engine (see the concurrency model): it is exclusively owned and
//! mutated by `RootOrchestrator`, while the context packager and
//! verifier only ever see read-only snapshots produced by
//! `get_context_package`.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;

/// Document-class preset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetType {
    Subtitle,
    Patent,
    Paper,
    Novel,
    Technical,
    General,
}

impl PresetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtitle => "subtitle",
            Self::Patent => "patent",
            Self::Paper => "paper",
            Self::Novel => "novel",
            Self::Technical => "technical",
            Self::General => "general",
        }
    }
}

impl Default for PresetType {
    fn default() -> Self {
        Self::General
    }
}

/// Chunk plan cursor + strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub current_index: usize,
    pub overlap: usize,
    pub strategy: ChunkSelectionStrategy,
}

/// Strategy used by PLAN to select the next chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSelectionStrategy {
    Sequential,
    Adaptive,
    Priority,
}

impl Default for ChunkSelectionStrategy {
    fn default() -> Self {
        Self::Sequential
    }
}

/// A single glossary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntry {
    pub source: String,
    pub target: String,
    pub confidence: f32,
    pub source_chunk_indices: Vec<usize>,
    pub is_hard: bool,
    pub usage_count: u32,
}

impl TermEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            confidence: 0.0,
            source_chunk_indices: Vec::new(),
            is_hard: false,
            usage_count: 0,
        }
    }
}

/// Entity type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Place,
    Organization,
    Product,
}

/// A named entity mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    pub name: String,
    pub translation: String,
    pub entity_type: EntityType,
    pub context: String,
    pub usage_count: u32,
}

/// Translation style guide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleGuide {
    pub tone: String,
    pub politeness: String,
    pub sentence_length: String,
    pub forbidden_words: Vec<String>,
    pub forbidden_phrases: Vec<String>,
    pub custom_rules: Vec<String>,
}

/// Kind of quality issue recorded against a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlagType {
    FormatError,
    MissingContent,
    ForbiddenWord,
    TerminologyMismatch,
    TooLong,
    MeaningLost,
    ToneMismatch,
    DuplicateContent,
}

/// Repair action recommended/taken after a verifier hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairType {
    TemplateReinforce,
    GlossaryUpdate,
    SplitChunk,
    ReTranslate,
    ContextAdjust,
}

/// Per-chunk terminal quality flag surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkOutcome {
    Fresh,
    Repaired,
    Failed,
}

/// Quality tracking for the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityFlags {
    pub total_chunks: usize,
    pub completed_chunks: usize,
    pub failed_chunks: usize,
    pub retry_count: HashMap<String, u32>,
    pub error_chunks: Vec<(usize, QualityFlagType, String)>,
    pub quality_score: f32,
}

/// Cost and performance tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostStats {
    pub root_calls: u32,
    pub sub_calls: u32,
    pub verifier_calls: u32,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_time: f64,
}

/// Read-only snapshot handed to the context packager and verifier.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub hard_glossary: BTreeMap<String, String>,
    pub soft_glossary: BTreeMap<String, String>,
    pub proper_nouns: BTreeMap<String, String>,
    pub reference_signs: BTreeMap<String, String>,
    pub technical_terms: BTreeMap<String, String>,
    pub confirmed_terms: BTreeMap<String, String>,
    pub style_guide: StyleGuide,
    pub history_summaries: Vec<String>,
}

/// The complete translation project memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationState {
    pub preset_id: PresetType,
    pub document_type: String,

    pub chunk_plan: ChunkPlan,
    pub chunk_history: Vec<String>,
    /// Indexed by chunk index; `None` until that chunk is committed.
    /// Pre-allocated to `total_chunks` at session start so that
    /// `adaptive` selection can commit out of order via `update_chunk`.
    pub translation_history: Vec<Option<String>>,

    pub glossary: HashMap<String, TermEntry>,
    pub hard_glossary: BTreeMap<String, String>,
    pub soft_glossary: BTreeMap<String, String>,
    pub proper_nouns: BTreeMap<String, String>,
    pub reference_signs: BTreeMap<String, String>,
    pub technical_terms: BTreeMap<String, String>,

    pub term_candidates: HashMap<String, String>,
    pub confirmed_terms: HashMap<String, String>,

    pub entities: HashMap<String, EntityEntry>,

    pub history_summaries: VecDeque<String>,
    pub max_history_summaries: usize,

    pub style_guide: StyleGuide,
    pub quality_flags: QualityFlags,
    pub cost_stats: CostStats,

    pub total_chunks: usize,
    pub completed_chunks: usize,
    pub current_chunk_index: usize,
}

impl Default for TranslationState {
    fn default() -> Self {
        Self {
            preset_id: PresetType::default(),
            document_type: "general".to_string(),
            chunk_plan: ChunkPlan::default(),
            chunk_history: Vec::new(),
            translation_history: Vec::new(),
            glossary: HashMap::new(),
            hard_glossary: BTreeMap::new(),
            soft_glossary: BTreeMap::new(),
            proper_nouns: BTreeMap::new(),
            reference_signs: BTreeMap::new(),
            technical_terms: BTreeMap::new(),
            term_candidates: HashMap::new(),
            confirmed_terms: HashMap::new(),
            entities: HashMap::new(),
            history_summaries: VecDeque::new(),
            max_history_summaries: 5,
            style_guide: StyleGuide::default(),
            quality_flags: QualityFlags::default(),
            cost_stats: CostStats::default(),
            total_chunks: 0,
            completed_chunks: 0,
            current_chunk_index: 0,
        }
    }
}

impl TranslationState {
    pub fn new(preset_id: PresetType) -> Self {
        Self {
            preset_id,
            document_type: preset_id.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Seed the chunk plan and pre-allocate `translation_history` to
    /// `total_chunks`, resolving the adaptive-vs-append tension noted
    /// in the design document: commits always go through
    /// `update_chunk`, never `Vec::push`.
    pub fn seed_chunks(&mut self, chunks: Vec<Chunk>) {
        self.total_chunks = chunks.len();
        self.quality_flags.total_chunks = chunks.len();
        self.chunk_history = chunks.iter().map(|c| c.text.clone()).collect();
        self.translation_history = vec![None; chunks.len()];
        self.chunk_plan.chunks = chunks;
    }

    /// Append a chunk as it enters the pipeline for the first time and
    /// advance the cursor. Used for sequential bookkeeping; it does not
    /// itself record a translation (see `update_chunk`).
    pub fn add_chunk(&mut self) {
        self.current_chunk_index += 1;
    }

    /// In-place replacement of a chunk's translation (initial commit or
    /// repair). The only mutator of `translation_history`.
    pub fn update_chunk(&mut self, chunk_index: usize, translation: String) {
        if chunk_index < self.translation_history.len() {
            let was_empty = self.translation_history[chunk_index].is_none();
            self.translation_history[chunk_index] = Some(translation);
            if was_empty {
                self.completed_chunks += 1;
                self.quality_flags.completed_chunks += 1;
            }
        }
    }

    pub fn add_glossary_entry(
        &mut self,
        source: &str,
        target: &str,
        confidence: f32,
        source_chunk_indices: &[usize],
        is_hard: bool,
    ) {
        match self.glossary.get_mut(source) {
            Some(entry) => {
                entry.target = target.to_string();
                entry.confidence = entry.confidence.max(confidence);
                entry.source_chunk_indices.extend(source_chunk_indices);
                entry.usage_count += 1;
            }
            None => {
                let mut entry = TermEntry::new(source, target);
                entry.confidence = confidence;
                entry.source_chunk_indices = source_chunk_indices.to_vec();
                entry.is_hard = is_hard;
                self.glossary.insert(source.to_string(), entry);
            }
        }
    }

    pub fn add_entity(&mut self, name: &str, translation: &str, entity_type: EntityType, context: &str) {
        match self.entities.get_mut(name) {
            Some(entry) => {
                entry.translation = translation.to_string();
                entry.entity_type = entity_type;
                entry.context = context.to_string();
                entry.usage_count += 1;
            }
            None => {
                self.entities.insert(
                    name.to_string(),
                    EntityEntry {
                        name: name.to_string(),
                        translation: translation.to_string(),
                        entity_type,
                        context: context.to_string(),
                        usage_count: 1,
                    },
                );
            }
        }
    }

    /// Insert proposed term candidates, skipping any key already
    /// confirmed (invariant 6: candidates and confirmed are disjoint).
    pub fn propose_terms(&mut self, candidates: &HashMap<String, String>) {
        for (source, target) in candidates {
            if !self.confirmed_terms.contains_key(source) {
                self.term_candidates.insert(source.clone(), target.clone());
            }
        }
    }

    /// Promote a candidate (or any source/target pair) to confirmed,
    /// removing it from `term_candidates`.
    pub fn update_glossary(&mut self, source: &str, target: &str, force: bool) {
        if force || !self.confirmed_terms.contains_key(source) {
            self.confirmed_terms.insert(source.to_string(), target.to_string());
            self.term_candidates.remove(source);
        }
    }

    pub fn add_hard_term(&mut self, source: &str, target: &str) {
        self.hard_glossary.insert(source.to_string(), target.to_string());
        self.confirmed_terms.insert(source.to_string(), target.to_string());
    }

    pub fn add_soft_term(&mut self, source: &str, target: &str) {
        self.soft_glossary.insert(source.to_string(), target.to_string());
    }

    pub fn add_proper_noun(&mut self, source: &str, target: &str) {
        self.proper_nouns.insert(source.to_string(), target.to_string());
        self.add_hard_term(source, target);
    }

    /// Reference signs are always hard (invariant 4).
    pub fn add_reference_sign(&mut self, sign: &str, meaning: &str) {
        self.reference_signs.insert(sign.to_string(), meaning.to_string());
        self.add_hard_term(sign, meaning);
    }

    pub fn add_technical_term(&mut self, source: &str, target: &str, is_hard: bool) {
        self.technical_terms.insert(source.to_string(), target.to_string());
        if is_hard {
            self.add_hard_term(source, target);
        } else {
            self.add_soft_term(source, target);
        }
    }

    /// Append a context summary, truncating from the front on overflow
    /// (sliding window, invariant 5).
    pub fn add_history_summary(&mut self, summary: String) {
        self.history_summaries.push_back(summary);
        while self.history_summaries.len() > self.max_history_summaries {
            self.history_summaries.pop_front();
        }
    }

    pub fn record_error(&mut self, chunk_index: usize, kind: QualityFlagType, message: impl Into<String>) {
        self.quality_flags
            .error_chunks
            .push((chunk_index, kind, message.into()));
        self.quality_flags.failed_chunks += 1;
    }

    pub fn increment_retry_count(&mut self, kind: QualityFlagType) {
        *self
            .quality_flags
            .retry_count
            .entry(format!("{:?}", kind))
            .or_insert(0) += 1;
    }

    /// Existing mapping if `source` is already confirmed with a
    /// different `new_target`; used by candidate intake.
    pub fn check_term_conflict(&self, source: &str, new_target: &str) -> Option<String> {
        self.confirmed_terms.get(source).and_then(|existing| {
            if existing != new_target {
                Some(existing.clone())
            } else {
                None
            }
        })
    }

    /// Read-only snapshot consumed by the context packager.
    pub fn get_context_package(&self) -> ContextSnapshot {
        ContextSnapshot {
            hard_glossary: self.hard_glossary.clone(),
            soft_glossary: self.soft_glossary.clone(),
            proper_nouns: self.proper_nouns.clone(),
            reference_signs: self.reference_signs.clone(),
            technical_terms: self.technical_terms.clone(),
            confirmed_terms: self.confirmed_terms.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            style_guide: self.style_guide.clone(),
            history_summaries: self.history_summaries.iter().cloned().collect(),
        }
    }

    /// Entity translations ordered by usage, most used first.
    pub fn entity_translations(&self, top_n: usize) -> Vec<(String, String)> {
        let mut entities: Vec<&EntityEntry> = self.entities.values().collect();
        entities.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.name.cmp(&b.name)));
        entities
            .into_iter()
            .take(top_n)
            .map(|e| (e.name.clone(), e.translation.clone()))
            .collect()
    }

    /// Final translated text: the concatenation of committed
    /// translations in index order. Uncommitted (failed-before-any-
    /// attempt) slots contribute nothing.
    pub fn translated_text(&self) -> String {
        self.translation_history
            .iter()
            .filter_map(|t| t.as_ref())
            .cloned()
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn reset(&mut self) {
        let preset_id = self.preset_id;
        *self = Self::new(preset_id);
    }

    /// Validate the documented structural invariants; used by tests and
    /// as a defensive check before producing a final result.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.completed_chunks > self.total_chunks {
            return Err("completed_chunks exceeds total_chunks".to_string());
        }
        if self.current_chunk_index > self.total_chunks {
            return Err("current_chunk_index exceeds total_chunks".to_string());
        }
        for source in self.hard_glossary.keys() {
            if self.confirmed_terms.get(source) != self.hard_glossary.get(source) {
                return Err(format!("hard glossary term '{source}' not mirrored in confirmed_terms"));
            }
        }
        for (sign, target) in &self.reference_signs {
            if self.hard_glossary.get(sign) != Some(target) {
                return Err(format!("reference sign '{sign}' is not hard"));
            }
        }
        if self.history_summaries.len() > self.max_history_summaries {
            return Err("history_summaries exceeds sliding window".to_string());
        }
        for key in self.term_candidates.keys() {
            if self.confirmed_terms.contains_key(key) {
                return Err(format!("'{key}' present in both term_candidates and confirmed_terms"));
            }
        }
        for entry in self.glossary.values() {
            for idx in &entry.source_chunk_indices {
                if *idx >= self.total_chunks {
                    return Err(format!("glossary entry '{}' references out-of-range chunk {idx}", entry.source));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(|i| Chunk::new(i, 0, 0, format!("chunk {i}"))).collect()
    }

    #[test]
    fn seed_preallocates_translation_history() {
        let mut state = TranslationState::new(PresetType::General);
        state.seed_chunks(chunks(5));
        assert_eq!(state.translation_history.len(), 5);
        assert!(state.translation_history.iter().all(Option::is_none));
    }

    #[test]
    fn update_chunk_commits_out_of_order() {
        let mut state = TranslationState::new(PresetType::General);
        state.seed_chunks(chunks(3));
        state.update_chunk(2, "third".to_string());
        state.update_chunk(0, "first".to_string());
        assert_eq!(state.completed_chunks, 2);
        assert_eq!(state.translation_history[0].as_deref(), Some("first"));
        assert_eq!(state.translation_history[1], None);
        assert_eq!(state.translation_history[2].as_deref(), Some("third"));
        assert_eq!(state.translated_text(), "firstthird");
    }

    #[test]
    fn hard_term_mirrors_confirmed_terms() {
        let mut state = TranslationState::new(PresetType::Patent);
        state.add_hard_term("widget", "장치");
        assert_eq!(state.confirmed_terms.get("widget"), Some(&"장치".to_string()));
        state.check_invariants().unwrap();
    }

    #[test]
    fn reference_sign_is_always_hard() {
        let mut state = TranslationState::new(PresetType::Patent);
        state.add_reference_sign("100", "control unit");
        assert_eq!(state.hard_glossary.get("100"), Some(&"control unit".to_string()));
        state.check_invariants().unwrap();
    }

    #[test]
    fn propose_terms_skips_confirmed_keys() {
        let mut state = TranslationState::new(PresetType::General);
        state.update_glossary("A", "alpha", true);
        let mut candidates = HashMap::new();
        candidates.insert("A".to_string(), "alt-alpha".to_string());
        candidates.insert("B".to_string(), "beta".to_string());
        state.propose_terms(&candidates);
        assert!(!state.term_candidates.contains_key("A"));
        assert_eq!(state.term_candidates.get("B"), Some(&"beta".to_string()));
        state.check_invariants().unwrap();
    }

    #[test]
    fn update_glossary_promotes_and_clears_candidate() {
        let mut state = TranslationState::new(PresetType::General);
        let mut candidates = HashMap::new();
        candidates.insert("A".to_string(), "alpha".to_string());
        candidates.insert("B".to_string(), "beta".to_string());
        state.propose_terms(&candidates);
        state.update_glossary("A", "alpha", true);
        assert_eq!(state.confirmed_terms.get("A"), Some(&"alpha".to_string()));
        assert!(!state.term_candidates.contains_key("A"));
        assert!(state.term_candidates.contains_key("B"));
    }

    #[test]
    fn history_summary_sliding_window() {
        let mut state = TranslationState::new(PresetType::General);
        state.max_history_summaries = 2;
        state.add_history_summary("one".to_string());
        state.add_history_summary("two".to_string());
        state.add_history_summary("three".to_string());
        assert_eq!(state.history_summaries.len(), 2);
        assert_eq!(state.history_summaries.front().unwrap(), "two");
    }

    #[test]
    fn check_term_conflict_detects_mismatch() {
        let mut state = TranslationState::new(PresetType::General);
        state.update_glossary("A", "alpha", true);
        assert_eq!(state.check_term_conflict("A", "alpha"), None);
        assert_eq!(state.check_term_conflict("A", "not-alpha"), Some("alpha".to_string()));
        assert_eq!(state.check_term_conflict("unknown", "x"), None);
    }

    #[test]
    fn reset_clears_all_collections() {
        let mut state = TranslationState::new(PresetType::Patent);
        state.seed_chunks(chunks(3));
        state.add_hard_term("a", "b");
        state.add_history_summary("s".to_string());
        state.record_error(0, QualityFlagType::FormatError, "oops");
        state.reset();
        assert_eq!(state.total_chunks, 0);
        assert!(state.hard_glossary.is_empty());
        assert!(state.history_summaries.is_empty());
        assert!(state.quality_flags.error_chunks.is_empty());
        assert_eq!(state.preset_id, PresetType::Patent);
    }

    #[test]
    fn invariant_catches_out_of_range_glossary_index() {
        let mut state = TranslationState::new(PresetType::General);
        state.seed_chunks(chunks(2));
        state.add_glossary_entry("a", "b", 0.5, &[5], false);
        assert!(state.check_invariants().is_err());
    }
}
