//! Document-class translation presets.
//!
//! Each preset bundles LLM sampling parameters, a chunk-size default,
//! and the system prompt handed to the sub-translator. The six
//! built-ins are constructed on demand (`Preset::default_for`) rather
//! than stored in a mutable registry; an embedding application that
//! wants custom presets can build its own `Preset` value and persist it
//! since the type is `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

use crate::state::{PresetType, StyleGuide};

/// LLM sampling parameters for a preset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LlmParameters {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for LlmParameters {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
            top_p: 0.9,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// Complete translation preset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetType,
    pub name: String,
    pub description: String,
    pub document_type: String,
    pub llm_params: LlmParameters,
    pub chunk_size: usize,
    pub preserve_formatting: bool,
    pub use_glossary: bool,
    pub system_prompt: String,
    pub context_instructions: String,
    pub style_guide: StyleGuide,
}

impl Preset {
    /// Construct the built-in default for a preset id. Always returns
    /// an owned value, never a reference into a shared registry, so
    /// callers can freely customize a copy without affecting anything
    /// else.
    pub fn default_for(id: PresetType) -> Self {
        match id {
            PresetType::Subtitle => Self {
                id,
                name: "Subtitle".to_string(),
                description: "Optimized for video subtitle translation: short, natural spoken phrasing.".to_string(),
                document_type: "subtitle".to_string(),
                llm_params: LlmParameters {
                    temperature: 0.3,
                    max_tokens: 2048,
                    top_p: 0.9,
                    ..Default::default()
                },
                chunk_size: 1500,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are a professional subtitle translator.\n\n",
                    "RULES:\n",
                    "- Keep translations SHORT and natural for spoken dialogue\n",
                    "- Match the timing constraints of subtitles\n",
                    "- Preserve speaker's tone and emotion\n",
                    "- Use colloquial expressions appropriate for speech\n",
                    "- Avoid overly formal or literary language\n",
                    "- Keep line breaks where they make sense for readability"
                )
                .to_string(),
                context_instructions: "Consider natural speech patterns and subtitle timing.".to_string(),
                style_guide: StyleGuide {
                    tone: "colloquial".to_string(),
                    sentence_length: "short".to_string(),
                    ..Default::default()
                },
            },
            PresetType::Paper => Self {
                id,
                name: "Academic Paper".to_string(),
                description: "Optimized for academic paper translation: precise, scholarly phrasing.".to_string(),
                document_type: "paper".to_string(),
                llm_params: LlmParameters {
                    temperature: 0.2,
                    max_tokens: 4096,
                    top_p: 0.85,
                    ..Default::default()
                },
                chunk_size: 2500,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are an expert academic translator specializing in research papers.\n\n",
                    "RULES:\n",
                    "- Use precise academic terminology\n",
                    "- Maintain formal, objective tone\n",
                    "- Preserve technical terms (transliterate if no standard translation exists)\n",
                    "- Keep citation formats intact\n",
                    "- Translate figure/table captions accurately\n",
                    "- Maintain logical flow and argumentation structure"
                )
                .to_string(),
                context_instructions: "Preserve academic rigor and citation formats.".to_string(),
                style_guide: StyleGuide {
                    tone: "formal".to_string(),
                    sentence_length: "long".to_string(),
                    ..Default::default()
                },
            },
            PresetType::Patent => Self {
                id,
                name: "Patent".to_string(),
                description: "Optimized for patent translation: legal precision and technical consistency.".to_string(),
                document_type: "patent".to_string(),
                llm_params: LlmParameters {
                    temperature: 0.1,
                    max_tokens: 4096,
                    top_p: 0.8,
                    ..Default::default()
                },
                chunk_size: 2000,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are a specialized patent translator with legal and technical expertise.\n\n",
                    "RULES:\n",
                    "- Use EXACT legal terminology - precision is critical\n",
                    "- Maintain claim structure and numbering\n",
                    "- Preserve all technical specifications exactly\n",
                    "- Keep patent-specific phrases (e.g., \"comprising\", \"wherein\")\n",
                    "- Do not paraphrase - translate as literally as legally appropriate\n",
                    "- Maintain reference numbers and figure references"
                )
                .to_string(),
                context_instructions: "Legal precision is paramount. Technical terms must be consistent.".to_string(),
                style_guide: StyleGuide {
                    tone: "formal".to_string(),
                    sentence_length: "long".to_string(),
                    ..Default::default()
                },
            },
            PresetType::Novel => Self {
                id,
                name: "Novel / Fiction".to_string(),
                description: "Optimized for literary translation: voice and emotional register preserved.".to_string(),
                document_type: "novel".to_string(),
                llm_params: LlmParameters {
                    temperature: 0.5,
                    max_tokens: 4096,
                    top_p: 0.95,
                    ..Default::default()
                },
                chunk_size: 3000,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are a literary translator specializing in fiction.\n\n",
                    "RULES:\n",
                    "- Preserve the author's unique voice and style\n",
                    "- Maintain narrative flow and pacing\n",
                    "- Translate idioms naturally, not literally\n",
                    "- Keep character voice distinctions\n",
                    "- Preserve metaphors and literary devices when possible\n",
                    "- Adapt cultural references appropriately\n",
                    "- Maintain emotional impact and atmosphere"
                )
                .to_string(),
                context_instructions: "Focus on literary quality and emotional resonance.".to_string(),
                style_guide: StyleGuide {
                    tone: "literary".to_string(),
                    sentence_length: "varied".to_string(),
                    ..Default::default()
                },
            },
            PresetType::Technical => Self {
                id,
                name: "Technical Documentation".to_string(),
                description: "Optimized for manuals and technical documentation: clarity and consistency.".to_string(),
                document_type: "technical".to_string(),
                llm_params: LlmParameters {
                    temperature: 0.2,
                    max_tokens: 4096,
                    top_p: 0.85,
                    ..Default::default()
                },
                chunk_size: 2000,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are a technical documentation translator.\n\n",
                    "RULES:\n",
                    "- Use clear, unambiguous language\n",
                    "- Maintain consistent terminology throughout\n",
                    "- Preserve code snippets and commands exactly\n",
                    "- Keep formatting (lists, headings, tables)\n",
                    "- Translate UI text according to localization standards\n",
                    "- Keep placeholder text and variables unchanged"
                )
                .to_string(),
                context_instructions: "Clarity and consistency are essential.".to_string(),
                style_guide: StyleGuide {
                    tone: "neutral".to_string(),
                    sentence_length: "medium".to_string(),
                    ..Default::default()
                },
            },
            PresetType::General => Self {
                id,
                name: "General".to_string(),
                description: "General-purpose translation settings suitable for most documents.".to_string(),
                document_type: "general".to_string(),
                llm_params: LlmParameters::default(),
                chunk_size: 2000,
                preserve_formatting: true,
                use_glossary: true,
                system_prompt: concat!(
                    "You are a professional translator.\n\n",
                    "RULES:\n",
                    "- Produce natural, fluent translations\n",
                    "- Preserve the meaning and intent of the original\n",
                    "- Maintain appropriate formality level\n",
                    "- Keep formatting and structure intact"
                )
                .to_string(),
                context_instructions: "Balance accuracy with natural expression.".to_string(),
                style_guide: StyleGuide {
                    tone: "neutral".to_string(),
                    sentence_length: "medium".to_string(),
                    ..Default::default()
                },
            },
        }
    }

    pub fn all_defaults() -> Vec<Self> {
        [
            PresetType::Subtitle,
            PresetType::Paper,
            PresetType::Patent,
            PresetType::Novel,
            PresetType::Technical,
            PresetType::General,
        ]
        .into_iter()
        .map(Self::default_for)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_preset_has_short_chunk_budget() {
        let preset = Preset::default_for(PresetType::Subtitle);
        assert_eq!(preset.chunk_size, 1500);
        assert!(preset.system_prompt.contains("SHORT"));
    }

    #[test]
    fn patent_preset_uses_low_temperature() {
        let preset = Preset::default_for(PresetType::Patent);
        assert!(preset.llm_params.temperature <= 0.1);
    }

    #[test]
    fn all_defaults_returns_six_distinct_presets() {
        let presets = Preset::all_defaults();
        assert_eq!(presets.len(), 6);
        let ids: std::collections::HashSet<_> = presets.iter().map(|p| p.document_type.clone()).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn default_for_returns_owned_independent_copies() {
        let mut a = Preset::default_for(PresetType::General);
        let b = Preset::default_for(PresetType::General);
        a.chunk_size = 999;
        assert_ne!(a.chunk_size, b.chunk_size);
    }
}
