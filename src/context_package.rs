//! Context package assembly for the sub-translator.
//!
//! Bundles the glossary, style guide, preset rules, and recent
//! translation history into one structure and renders it
//! deterministically for embedding into a prompt. Glossary maps use
//! `BTreeMap` throughout (via `ContextSnapshot`) so the rendered string
//! is stable across runs, which is what makes golden-file prompt tests
//! possible.

use serde::Serialize;

use crate::chunk::Chunk;
use crate::state::{ContextSnapshot, PresetType, TranslationState};

/// Local (recent-history) context handed alongside the glossary.
#[derive(Debug, Clone, Serialize)]
pub struct LocalContext {
    pub recent_translations: Vec<String>,
    pub recent_originals: Vec<String>,
    pub context_summaries: Vec<String>,
    pub entity_translations: Vec<(String, String)>,
}

/// Complete context package for one sub-translator call.
#[derive(Debug, Clone, Serialize)]
pub struct ContextPackage {
    pub rules: Vec<String>,
    pub glossary: ContextSnapshot,
    pub local_context: LocalContext,
    pub chunk_text: String,
    pub chunk_index: usize,
    pub document_type: String,
}

const BASE_RULES: &[&str] = &[
    "Translate preserving meaning and intent",
    "Use natural expressions in target language",
    "Maintain consistent terminology throughout",
];

fn preset_rules(preset: PresetType) -> Vec<String> {
    let extra: &[&str] = match preset {
        PresetType::Subtitle => &[
            "Keep translations SHORT and natural for spoken dialogue",
            "Match timing constraints of subtitles",
            "Use colloquial expressions appropriate for speech",
            "Avoid overly formal language",
            "Keep line breaks where they make sense for readability",
        ],
        PresetType::Patent => &[
            "Use EXACT legal terminology - precision is critical",
            "Maintain claim structure and numbering",
            "Preserve all technical specifications exactly",
            "Keep patent-specific phrases (comprising, wherein)",
            "Do not paraphrase - translate literally as appropriate",
            "Maintain reference numbers and figure references",
        ],
        PresetType::Paper => &[
            "Use precise academic terminology",
            "Maintain formal, objective tone",
            "Preserve technical terms (transliterate if no standard translation)",
            "Keep citation formats intact",
            "Translate figure/table captions accurately",
            "Maintain logical flow and argumentation structure",
        ],
        PresetType::Novel => &[
            "Preserve author's unique voice and style",
            "Maintain narrative flow and pacing",
            "Translate idioms naturally, not literally",
            "Keep character voice distinctions",
            "Preserve metaphors and literary devices when possible",
            "Adapt cultural references appropriately",
            "Maintain emotional impact and atmosphere",
        ],
        PresetType::Technical => &[
            "Use clear, unambiguous language",
            "Maintain consistent terminology",
            "Preserve code snippets and commands exactly",
            "Keep formatting (lists, headings, tables)",
            "Translate UI text according to localization standards",
            "Keep placeholder text unchanged",
        ],
        PresetType::General => &[],
    };
    BASE_RULES.iter().chain(extra).map(|s| s.to_string()).collect()
}

/// Builds context packages from translation state.
pub struct ContextPackager;

impl ContextPackager {
    /// Assemble the package for translating `chunk`. `extra_hard_glossary`
    /// lets a caller inject additional hard terms (e.g. during a
    /// `glossary_update` repair) without mutating the state itself.
    pub fn build(
        state: &TranslationState,
        chunk: &Chunk,
        extra_hard_glossary: Option<&std::collections::BTreeMap<String, String>>,
    ) -> ContextPackage {
        let mut snapshot = state.get_context_package();
        if let Some(extra) = extra_hard_glossary {
            for (k, v) in extra {
                snapshot.hard_glossary.insert(k.clone(), v.clone());
            }
        }

        ContextPackage {
            rules: preset_rules(state.preset_id),
            glossary: snapshot,
            local_context: Self::build_local_context(state),
            chunk_text: chunk.text.clone(),
            chunk_index: chunk.index,
            document_type: state.document_type.clone(),
        }
    }

    fn build_local_context(state: &TranslationState) -> LocalContext {
        let recent_translations: Vec<String> = state
            .translation_history
            .iter()
            .rev()
            .filter_map(|t| t.clone())
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let recent_originals: Vec<String> = state.chunk_history.iter().rev().take(3).cloned().collect::<Vec<_>>().into_iter().rev().collect();

        LocalContext {
            recent_translations,
            recent_originals,
            context_summaries: state.history_summaries.iter().cloned().collect(),
            entity_translations: state.entity_translations(20),
        }
    }
}

/// Render a package as a deterministic string suitable for embedding in
/// a prompt.
pub fn package_to_prompt_string(package: &ContextPackage) -> String {
    let mut lines = Vec::new();
    lines.push("=== CONTEXT PACKAGE ===".to_string());
    lines.push(String::new());

    lines.push("RULES:".to_string());
    for rule in &package.rules {
        lines.push(format!("  - {rule}"));
    }
    lines.push(String::new());

    lines.push("GLOSSARY (Hard - Must Use):".to_string());
    for (src, target) in &package.glossary.hard_glossary {
        lines.push(format!("  - {src} -> {target}"));
    }
    lines.push(String::new());

    lines.push("STYLE GUIDE:".to_string());
    let style = &package.glossary.style_guide;
    let tone = if style.tone.is_empty() { "neutral" } else { &style.tone };
    let politeness = if style.politeness.is_empty() { "default" } else { &style.politeness };
    let sentence_length = if style.sentence_length.is_empty() { "balanced" } else { &style.sentence_length };
    lines.push(format!("  - Tone: {tone}"));
    lines.push(format!("  - Politeness: {politeness}"));
    lines.push(format!("  - Sentence Length: {sentence_length}"));
    lines.push(String::new());

    lines.push("LOCAL CONTEXT:".to_string());
    lines.push(format!("  - Document Type: {}", package.document_type));
    lines.push(format!("  - Recent Translations: {} chunks", package.local_context.recent_translations.len()));
    lines.push(format!("  - Entity Mappings: {} entities", package.local_context.entity_translations.len()));
    lines.push(String::new());

    lines.push("CURRENT CHUNK TO TRANSLATE:".to_string());
    lines.push(format!("  - Index: {}", package.chunk_index));
    let preview: String = package.chunk_text.chars().take(500).collect();
    lines.push(format!("  - Text: {preview}"));
    lines.push(String::new());

    lines.push("=== END OF CONTEXT PACKAGE ===".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Fixed instructions appended after the context package in a prompt.
pub fn translation_instructions() -> &'static str {
    concat!(
        "=== TRANSLATION INSTRUCTIONS ===\n\n",
        "Please translate the CURRENT CHUNK using the context and rules above.\n\n",
        "Requirements:\n",
        "1. Follow all rules specified above\n",
        "2. Use the glossary entries where applicable\n",
        "3. Match the style guide (tone, politeness, sentence length)\n",
        "4. Consider the local context (previous translations, entities)\n",
        "5. Maintain consistency with existing translations\n\n",
        "Output format: Provide ONLY the translated text, no explanations.\n\n",
        "=== END ==="
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_preset_adds_subtitle_rules() {
        let mut state = TranslationState::new(PresetType::Subtitle);
        state.seed_chunks(vec![Chunk::new(0, 0, 5, "hello".to_string())]);
        let pkg = ContextPackager::build(&state, &state.chunk_plan.chunks[0], None);
        assert!(pkg.rules.iter().any(|r| r.contains("SHORT")));
    }

    #[test]
    fn local_context_keeps_last_three_in_order() {
        let mut state = TranslationState::new(PresetType::General);
        state.seed_chunks(vec![
            Chunk::new(0, 0, 1, "a".to_string()),
            Chunk::new(1, 0, 1, "b".to_string()),
            Chunk::new(2, 0, 1, "c".to_string()),
            Chunk::new(3, 0, 1, "d".to_string()),
        ]);
        state.update_chunk(0, "A".to_string());
        state.update_chunk(1, "B".to_string());
        state.update_chunk(2, "C".to_string());
        let pkg = ContextPackager::build(&state, &state.chunk_plan.chunks[3], None);
        assert_eq!(pkg.local_context.recent_translations, vec!["A", "B", "C"]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut state = TranslationState::new(PresetType::Patent);
        state.add_hard_term("widget", "zanzi");
        state.add_hard_term("apparatus", "gigi");
        state.seed_chunks(vec![Chunk::new(0, 0, 5, "hello".to_string())]);
        let pkg = ContextPackager::build(&state, &state.chunk_plan.chunks[0], None);
        let first = package_to_prompt_string(&pkg);
        let second = package_to_prompt_string(&pkg);
        assert_eq!(first, second);
        let idx_a = first.find("apparatus").unwrap();
        let idx_w = first.find("widget").unwrap();
        assert!(idx_a < idx_w);
    }

    #[test]
    fn extra_hard_glossary_is_merged_without_mutating_state() {
        let mut state = TranslationState::new(PresetType::General);
        state.seed_chunks(vec![Chunk::new(0, 0, 5, "hello".to_string())]);
        let mut extra = std::collections::BTreeMap::new();
        extra.insert("foo".to_string(), "bar".to_string());
        let pkg = ContextPackager::build(&state, &state.chunk_plan.chunks[0], Some(&extra));
        assert_eq!(pkg.glossary.hard_glossary.get("foo"), Some(&"bar".to_string()));
        assert!(state.hard_glossary.get("foo").is_none());
    }
}
