//! Sub-translator: translates a single chunk against a context package.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context_package::{package_to_prompt_string, ContextPackage};
use crate::provider::{ChatMessage, CompletionParams, ProviderGateway};
use crate::state::PresetType;

/// Outcome of translating one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTranslationResult {
    pub translation: String,
    pub term_candidates: HashMap<String, String>,
    pub warnings: Vec<String>,
    pub success: bool,
    pub duration_secs: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub error: Option<String>,
}

fn language_name(code: &str) -> &str {
    match code {
        "ko" => "Korean",
        "ja" => "Japanese",
        "en" => "English",
        "auto" => "detected language",
        other => other,
    }
}

/// Translates individual chunks using a shared provider gateway.
pub struct SubTranslator {
    gateway: Arc<dyn ProviderGateway>,
    pub preset_type: PresetType,
    pub source_lang: String,
    pub target_lang: String,
    pub model: String,
    pub params: CompletionParams,
}

impl SubTranslator {
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        preset_type: PresetType,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        model: impl Into<String>,
        params: CompletionParams,
    ) -> Self {
        Self {
            gateway,
            preset_type,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            model: model.into(),
            params,
        }
    }

    pub async fn translate_chunk(&self, package: &ContextPackage) -> SubTranslationResult {
        let start = Instant::now();
        let messages = self.build_messages(package);

        let response = match self.gateway.complete(&messages, &self.model, self.params).await {
            Ok(response) => response,
            Err(err) => {
                return SubTranslationResult {
                    translation: String::new(),
                    term_candidates: HashMap::new(),
                    warnings: vec![format!("translation failed: {err}")],
                    success: false,
                    duration_secs: start.elapsed().as_secs_f64(),
                    input_tokens: 0,
                    output_tokens: 0,
                    error: Some(err.to_string()),
                };
            }
        };

        let parsed = parse_llm_response(&response.content);

        SubTranslationResult {
            translation: parsed.translation,
            term_candidates: parsed.term_candidates,
            warnings: parsed.warnings,
            success: true,
            duration_secs: start.elapsed().as_secs_f64(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            error: None,
        }
    }

    fn build_messages(&self, package: &ContextPackage) -> Vec<ChatMessage> {
        let system_prompt = format!("{}\n\n{}", self.system_prompt(), package_to_prompt_string(package));
        let user_message = format!("Translate the following chunk:\n\n{}", package.chunk_text);
        vec![ChatMessage::system(system_prompt), ChatMessage::user(user_message)]
    }

    /// Critical directives shared by every preset, with a preset-
    /// specific framing sentence prepended.
    fn system_prompt(&self) -> String {
        let target_name = language_name(&self.target_lang);
        let critical = format!(
            "You MUST translate into {target_name}.\n\
CRITICAL RULES:\n\
- Output ONLY the translated text\n\
- Translate the COMPLETE text, do not skip or summarize any part\n\
- NEVER add '...' or ellipsis or any truncation markers\n\
- Do NOT add explanations or notes\n\
- Preserve all original content fully"
        );

        let framing = match self.preset_type {
            PresetType::Subtitle => "You are a professional subtitle translator.".to_string(),
            PresetType::Patent => "You are a specialized patent translator with legal and technical expertise.".to_string(),
            PresetType::Paper => "You are an expert academic translator specializing in research papers.".to_string(),
            PresetType::Novel => "You are a literary translator specializing in fiction.".to_string(),
            PresetType::Technical => "You are a technical documentation translator.".to_string(),
            PresetType::General => "You are a professional translator.".to_string(),
        };

        format!("{framing} {critical}")
    }

    pub async fn test_connection(&self) -> bool {
        self.gateway.test_connection().await
    }
}

struct ParsedResponse {
    translation: String,
    term_candidates: HashMap<String, String>,
    warnings: Vec<String>,
}

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

/// Parse a sub-translator response: fenced JSON block, then the first
/// balanced `{...}` span, then plain-text passthrough.
fn parse_llm_response(content: &str) -> ParsedResponse {
    let content = content.trim();

    if let Some(caps) = FENCED_JSON.captures(content) {
        if let Some(parsed) = try_parse_json(&caps[1]) {
            return parsed;
        }
    }

    if let Some(span) = find_balanced_braces(content) {
        if let Some(parsed) = try_parse_json(span) {
            return parsed;
        }
    }

    ParsedResponse {
        translation: content.to_string(),
        term_candidates: HashMap::new(),
        warnings: vec!["JSON parsing failed, used raw output".to_string()],
    }
}

fn try_parse_json(json_str: &str) -> Option<ParsedResponse> {
    let value: serde_json::Value = serde_json::from_str(json_str).ok()?;
    let translation = value.get("translated_text").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
    let term_candidates = value
        .get("term_candidates")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();
    Some(ParsedResponse {
        translation,
        term_candidates,
        warnings: Vec::new(),
    })
}

/// Find the first top-level balanced `{...}` span, scanning for a
/// matching close brace that accounts for nesting (a plain greedy regex
/// would over-match across sibling objects).
fn find_balanced_braces(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_block() {
        let content = "Here you go:\n```json\n{\"translated_text\": \"hello\", \"term_candidates\": {\"a\": \"b\"}}\n```";
        let parsed = parse_llm_response(content);
        assert_eq!(parsed.translation, "hello");
        assert_eq!(parsed.term_candidates.get("a"), Some(&"b".to_string()));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn parses_raw_json_without_fence() {
        let content = "{\"translated_text\": \"world\", \"term_candidates\": {}}";
        let parsed = parse_llm_response(content);
        assert_eq!(parsed.translation, "world");
    }

    #[test]
    fn falls_back_to_plain_text_when_no_json() {
        let content = "just a plain translated sentence.";
        let parsed = parse_llm_response(content);
        assert_eq!(parsed.translation, content);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn balanced_brace_search_skips_nested_objects_correctly() {
        let content = "noise {\"translated_text\": \"x\", \"term_candidates\": {\"y\": \"z\"}} trailing";
        let span = find_balanced_braces(content).unwrap();
        assert!(span.ends_with('}'));
        let parsed = try_parse_json(span).unwrap();
        assert_eq!(parsed.translation, "x");
    }

    #[test]
    fn malformed_json_in_fence_falls_back_to_raw_output() {
        let content = "```json\n{not valid json at all\n```";
        let parsed = parse_llm_response(content);
        assert_eq!(parsed.translation, content);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn system_prompt_includes_target_language_and_critical_rules() {
        let gateway: Arc<dyn ProviderGateway> = Arc::new(crate::provider::ScriptedProviderGateway::new(vec![]));
        let translator = SubTranslator::new(gateway, PresetType::Patent, "auto", "ko", "m", CompletionParams::default());
        let prompt = translator.system_prompt();
        assert!(prompt.contains("Korean"));
        assert!(prompt.contains("NEVER add '...'"));
        assert!(prompt.contains("patent translator"));
    }
}
