//! Deterministic glossary conflict resolution.
//!
//! `GlossaryManager` owns its own term table (distinct from the
//! lightweight tiered maps on `TranslationState`) and applies one of
//! four resolution rules whenever a term is proposed with a target
//! that differs from what's already recorded. The reference
//! implementation left `_find_existing_term`/`_get_all_terms` as stubs
//! returning nothing; here they're backed by a real map so the rule
//! table actually has conflicts to resolve.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::TermEntry;

/// Deterministic rule used to decide which translation wins a
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolutionRule {
    /// Preset-sourced terms always override document-derived ones.
    PresetFirst,
    /// The first occurrence in the document wins; later proposals for
    /// the same source term are dropped.
    DocumentInitial,
    /// The option backed by more occurrences (chunk count vs. a
    /// confidence-derived estimate) wins.
    Majority,
    /// The most recently proposed translation wins.
    MostRecent,
}

impl Default for ConflictResolutionRule {
    fn default() -> Self {
        Self::Majority
    }
}

/// A recorded conflict between an existing and a proposed translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryConflict {
    pub term: String,
    pub existing_target: String,
    pub proposed_target: String,
    pub rule_applied: ConflictResolutionRule,
    pub kept_existing: bool,
}

/// Manages a glossary with deterministic, rule-based conflict
/// resolution.
#[derive(Debug, Clone)]
pub struct GlossaryManager {
    pub conflict_rule: ConflictResolutionRule,
    terms: HashMap<String, TermEntry>,
    conflict_history: Vec<GlossaryConflict>,
}

impl GlossaryManager {
    pub fn new(conflict_rule: ConflictResolutionRule) -> Self {
        Self {
            conflict_rule,
            terms: HashMap::new(),
            conflict_history: Vec::new(),
        }
    }

    /// Add or update a term. Returns `true` if the proposal was
    /// accepted (new term, or an existing one updated by the rule),
    /// `false` if the existing translation was kept.
    pub fn add_term(
        &mut self,
        source: &str,
        target: &str,
        confidence: f32,
        source_chunks: &[usize],
        is_hard: bool,
        from_preset: bool,
    ) -> bool {
        match self.terms.get(source).cloned() {
            None => {
                let mut entry = TermEntry::new(source, target);
                entry.confidence = confidence;
                entry.source_chunk_indices = source_chunks.to_vec();
                entry.is_hard = is_hard;
                self.terms.insert(source.to_string(), entry);
                true
            }
            Some(existing) if existing.target == target => {
                if let Some(entry) = self.terms.get_mut(source) {
                    entry.source_chunk_indices.extend(source_chunks);
                    entry.usage_count += 1;
                }
                true
            }
            Some(existing) => self.resolve_conflict(source, &existing, target, confidence, source_chunks, from_preset),
        }
    }

    fn resolve_conflict(
        &mut self,
        source: &str,
        existing: &TermEntry,
        proposed_target: &str,
        proposed_confidence: f32,
        new_chunks: &[usize],
        from_preset: bool,
    ) -> bool {
        let keep_existing = self.decide(existing, proposed_confidence, from_preset);

        self.conflict_history.push(GlossaryConflict {
            term: source.to_string(),
            existing_target: existing.target.clone(),
            proposed_target: proposed_target.to_string(),
            rule_applied: self.conflict_rule,
            kept_existing: keep_existing,
        });

        if keep_existing {
            return false;
        }

        if let Some(entry) = self.terms.get_mut(source) {
            entry.target = proposed_target.to_string();
            entry.confidence = entry.confidence.max(proposed_confidence);
            entry.source_chunk_indices.extend(new_chunks);
            entry.usage_count += 1;
        }
        true
    }

    /// `true` means keep the existing translation, `false` means adopt
    /// the proposed one.
    fn decide(&self, existing: &TermEntry, proposed_confidence: f32, from_preset: bool) -> bool {
        match self.conflict_rule {
            ConflictResolutionRule::PresetFirst => !from_preset,
            ConflictResolutionRule::DocumentInitial => !existing.source_chunk_indices.is_empty(),
            ConflictResolutionRule::Majority => {
                let existing_count = existing.source_chunk_indices.len() as f32;
                let proposed_count = proposed_confidence * 10.0;
                existing_count >= proposed_count
            }
            ConflictResolutionRule::MostRecent => false,
        }
    }

    pub fn conflicts(&self) -> &[GlossaryConflict] {
        &self.conflict_history
    }

    pub fn clear_conflicts(&mut self) {
        self.conflict_history.clear();
    }

    pub fn term(&self, source: &str) -> Option<&TermEntry> {
        self.terms.get(source)
    }

    /// Export the resolved glossary as a plain source -> target map,
    /// sorted for deterministic serialization.
    pub fn glossary_dict(&self) -> std::collections::BTreeMap<String, String> {
        self.terms.iter().map(|(k, v)| (k.clone(), v.target.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_term_is_always_accepted() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::Majority);
        assert!(mgr.add_term("widget", "장치", 0.8, &[0], false, false));
        assert_eq!(mgr.term("widget").unwrap().target, "장치");
    }

    #[test]
    fn majority_rule_favors_more_occurrences() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::Majority);
        mgr.add_term("widget", "장치", 0.9, &[0, 1, 2], false, false);
        let updated = mgr.add_term("widget", "기기", 0.3, &[3], false, false);
        assert!(!updated);
        assert_eq!(mgr.term("widget").unwrap().target, "장치");
        assert_eq!(mgr.conflicts().len(), 1);
        assert!(mgr.conflicts()[0].kept_existing);
    }

    #[test]
    fn majority_rule_accepts_higher_confidence_challenger() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::Majority);
        mgr.add_term("widget", "장치", 0.1, &[0], false, false);
        let updated = mgr.add_term("widget", "기기", 0.95, &[1], false, false);
        assert!(updated);
        assert_eq!(mgr.term("widget").unwrap().target, "기기");
    }

    #[test]
    fn preset_first_prefers_preset_sourced_terms() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::PresetFirst);
        mgr.add_term("widget", "장치", 0.5, &[0], false, false);
        let updated = mgr.add_term("widget", "기기", 0.5, &[1], false, true);
        assert!(updated);
        assert_eq!(mgr.term("widget").unwrap().target, "기기");
    }

    #[test]
    fn document_initial_keeps_first_occurrence() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::DocumentInitial);
        mgr.add_term("widget", "장치", 0.5, &[0], false, false);
        let updated = mgr.add_term("widget", "기기", 0.99, &[1], false, false);
        assert!(!updated);
        assert_eq!(mgr.term("widget").unwrap().target, "장치");
    }

    #[test]
    fn most_recent_always_adopts_new_proposal() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::MostRecent);
        mgr.add_term("widget", "장치", 0.9, &[0], false, false);
        let updated = mgr.add_term("widget", "기기", 0.1, &[1], false, false);
        assert!(updated);
        assert_eq!(mgr.term("widget").unwrap().target, "기기");
    }

    #[test]
    fn identical_proposal_is_not_a_conflict() {
        let mut mgr = GlossaryManager::new(ConflictResolutionRule::Majority);
        mgr.add_term("widget", "장치", 0.5, &[0], false, false);
        mgr.add_term("widget", "장치", 0.5, &[1], false, false);
        assert!(mgr.conflicts().is_empty());
        assert_eq!(mgr.term("widget").unwrap().usage_count, 1);
    }
}
