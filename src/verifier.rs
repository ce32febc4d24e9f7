//! Rule-based translation verifier.
//!
//! Runs a fixed battery of checks against a sub-translator's output and
//! recommends a repair action when a hard error is found. An optional
//! LLM-backed pass can add soft warnings on top of the rule-based
//! result but never overturns it.

use serde::{Deserialize, Serialize};

use crate::chunk::ContentType;
use crate::state::{ContextSnapshot, RepairType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    Format,
    Completion,
    Forbidden,
    Terminology,
    Tone,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: ValidationType,
    pub message: String,
    pub severity: ErrorSeverity,
}

/// Outcome of a single `Verifier::validate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub repair_type: Option<RepairType>,
    pub repair_description: Option<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            repair_type: None,
            repair_description: None,
        }
    }
}

impl ValidationResult {
    fn add_error(&mut self, kind: ValidationType, message: impl Into<String>, severity: ErrorSeverity) {
        self.errors.push(ValidationIssue {
            kind,
            message: message.into(),
            severity,
        });
        self.valid = false;
    }

    fn add_warning(&mut self, kind: ValidationType, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            kind,
            message: message.into(),
            severity: ErrorSeverity::Soft,
        });
    }

    fn set_repair(&mut self, repair_type: RepairType, description: impl Into<String>) {
        self.repair_type = Some(repair_type);
        self.repair_description = Some(description.into());
    }

    pub fn is_hard_error(&self) -> bool {
        self.errors.iter().any(|e| e.severity == ErrorSeverity::Hard)
    }

    pub fn hard_error_types(&self) -> Vec<ValidationType> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Hard)
            .map(|e| e.kind)
            .collect()
    }

    pub fn summary(&self) -> String {
        if self.valid {
            return "translation passed all validations".to_string();
        }
        let mut lines = vec![
            format!("valid: {}", self.valid),
            format!("errors: {}", self.errors.len()),
            format!("warnings: {}", self.warnings.len()),
        ];
        if let Some(repair) = self.repair_type {
            lines.push(format!("recommended repair: {repair:?}"));
        }
        lines.join("\n")
    }
}

/// Rule-based validator with an optional LLM-backed soft pass.
pub struct Verifier {
    pub enable_llm_validation: bool,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            enable_llm_validation: false,
        }
    }
}

impl Verifier {
    pub fn new(enable_llm_validation: bool) -> Self {
        Self { enable_llm_validation }
    }

    pub fn should_use_llm(&self) -> bool {
        self.enable_llm_validation
    }

    pub fn set_llm_validation(&mut self, enabled: bool) {
        self.enable_llm_validation = enabled;
    }

    pub fn validate(
        &self,
        translation: &str,
        original_chunk: &str,
        context: &ContextSnapshot,
        content_type: ContentType,
        check_sentence: bool,
        check_length: bool,
    ) -> ValidationResult {
        let mut result = ValidationResult::default();
        self.rule_based_validation(
            &mut result,
            translation,
            original_chunk,
            context,
            content_type,
            check_sentence,
            check_length,
        );

        if !result.valid && self.enable_llm_validation {
            self.llm_validation(&mut result);
        }

        if !result.valid {
            self.determine_repair(&mut result);
        }
        result
    }

    fn rule_based_validation(
        &self,
        result: &mut ValidationResult,
        translation: &str,
        original_chunk: &str,
        context: &ContextSnapshot,
        content_type: ContentType,
        check_sentence: bool,
        check_length: bool,
    ) {
        if translation.trim().is_empty() {
            result.add_error(ValidationType::Completion, "translation is empty", ErrorSeverity::Hard);
            return;
        }

        let trimmed_end = translation.trim_end();
        if trimmed_end.ends_with("...") || trimmed_end.ends_with('\u{2026}') {
            result.add_error(
                ValidationType::Completion,
                "translation appears truncated (ends with '...')",
                ErrorSeverity::Hard,
            );
        }

        if check_sentence {
            const SENTENCE_ENDINGS: &[&str] =
                &[".", "!", "?", "\u{3002}", "\u{ff01}", "\u{ff1f}", "다.", "요.", "니다."];
            let ends_with_sentence = SENTENCE_ENDINGS.iter().any(|e| trimmed_end.ends_with(e));
            if !ends_with_sentence && trimmed_end.chars().count() > 50 {
                result.add_error(
                    ValidationType::Completion,
                    "translation does not end with a complete sentence",
                    ErrorSeverity::Hard,
                );
            }
        }

        if check_length {
            let orig_len = original_chunk.trim().chars().count();
            let trans_len = translation.trim().chars().count();
            if orig_len > 100 && (trans_len as f32) < (orig_len as f32) * 0.5 {
                result.add_error(
                    ValidationType::Completion,
                    format!("translation too short ({trans_len} chars vs original {orig_len} chars, <50%)"),
                    ErrorSeverity::Hard,
                );
            }
        }

        match content_type {
            ContentType::Subtitle => self.validate_subtitle_format(result, translation),
            ContentType::Patent => self.validate_patent_format(result, translation),
            ContentType::Paper => self.validate_paper_format(result, translation),
            ContentType::Plain => {}
        }

        self.check_forbidden_content(result, translation, context);
        self.check_length_constraints(result, translation, original_chunk);
        self.check_terminology(result, translation, context);
    }

    fn validate_subtitle_format(&self, result: &mut ValidationResult, translation: &str) {
        let lines: Vec<&str> = translation.trim().split('\n').collect();
        if lines.is_empty() || (lines.len() == 1 && lines[0].is_empty()) {
            result.add_error(ValidationType::Format, "subtitle has no lines", ErrorSeverity::Hard);
        }
    }

    fn validate_patent_format(&self, result: &mut ValidationResult, translation: &str) {
        if !translation.split_whitespace().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
            result.add_warning(ValidationType::Structure, "no claim numbers found (typical in patent translations)");
        }
        if !translation.to_lowercase().contains("wherein") {
            result.add_warning(ValidationType::Structure, "missing 'wherein' clause marker (optional)");
        }
    }

    fn validate_paper_format(&self, result: &mut ValidationResult, translation: &str) {
        if translation.matches('.').count() < 3 {
            result.add_warning(ValidationType::Structure, "paper may lack sufficient sentence structure");
        }
    }

    fn check_forbidden_content(&self, result: &mut ValidationResult, translation: &str, context: &ContextSnapshot) {
        let lower = translation.to_lowercase();
        for word in &context.style_guide.forbidden_words {
            if lower.contains(&word.to_lowercase()) {
                result.add_error(
                    ValidationType::Forbidden,
                    format!("contains forbidden word: '{word}'"),
                    ErrorSeverity::Hard,
                );
            }
        }
        for phrase in &context.style_guide.forbidden_phrases {
            if lower.contains(&phrase.to_lowercase()) {
                result.add_error(
                    ValidationType::Forbidden,
                    format!("contains forbidden phrase: '{phrase}'"),
                    ErrorSeverity::Hard,
                );
            }
        }
    }

    fn check_length_constraints(&self, result: &mut ValidationResult, translation: &str, original: &str) {
        let orig_len = original.chars().count();
        let trans_len = translation.chars().count();

        if trans_len as f32 > orig_len as f32 * 3.0 {
            result.add_warning(ValidationType::Completion, "translation is significantly longer than original (>3x)");
        }
    }

    fn check_terminology(&self, result: &mut ValidationResult, translation: &str, context: &ContextSnapshot) {
        if context.hard_glossary.is_empty() {
            return;
        }
        let lower = translation.to_lowercase();
        let terms: Vec<&String> = context.hard_glossary.keys().collect();
        for term in terms.into_iter().take(10) {
            if !lower.contains(&term.to_lowercase()) {
                result.add_warning(ValidationType::Terminology, format!("glossary term '{term}' not found in translation"));
            }
        }
    }

    fn llm_validation(&self, result: &mut ValidationResult) {
        if !result.valid && result.warnings.is_empty() {
            result.add_warning(ValidationType::Tone, "no specific quality issues detected, but could benefit from LLM validation");
        }
    }

    fn determine_repair(&self, result: &mut ValidationResult) {
        let hard = result.hard_error_types();
        if hard.is_empty() {
            return;
        }
        if hard.contains(&ValidationType::Forbidden) {
            result.set_repair(RepairType::TemplateReinforce, "remove forbidden content and re-translate");
        } else if hard.contains(&ValidationType::Format) {
            result.set_repair(RepairType::TemplateReinforce, "fix formatting errors and re-translate");
        } else if hard.contains(&ValidationType::Completion) {
            result.set_repair(RepairType::ReTranslate, "re-translate the chunk completely");
        } else {
            result.set_repair(RepairType::ReTranslate, "re-translate with corrections");
        }
    }
}
