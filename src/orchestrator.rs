//! Root orchestrator: the six-phase PLAN → RETRIEVE → TRANSLATE →
//! VERIFY → REPAIR → COMMIT loop over a `TranslationState`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use crate::chunk::{Chunk, ContentType};
use crate::config::EngineConfig;
use crate::context_package::ContextPackager;
use crate::logging::{report_progress, ProgressEvent};
use crate::preset::Preset;
use crate::provider::{CompletionParams, ProviderGateway};
use crate::state::{ChunkOutcome, PresetType, QualityFlagType, RepairType, TranslationState};
use crate::sub_translator::SubTranslator;
use crate::verifier::Verifier;

/// Outcome of one `execute_round` call.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Every chunk has a committed translation.
    AllCompleted,
    /// One chunk was processed this round.
    Chunk(ChunkRoundResult),
    /// Cancellation was observed at a phase boundary; nothing committed.
    Cancelled,
}

static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD_TOKEN.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Word-overlap similarity used by the adaptive chunk-selection
/// strategy: intersection over union of lowercase word tokens.
fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let words_a = tokenize(a);
    let words_b = tokenize(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

#[derive(Debug, Clone)]
pub struct ChunkRoundResult {
    pub chunk_index: usize,
    pub validation_passed: bool,
    pub outcome: ChunkOutcome,
    pub duration_secs: f64,
}

/// Final summary returned by `RootOrchestrator::run`.
#[derive(Debug, Clone, Serialize)]
pub struct FinalResult {
    pub translated_text: String,
    pub total_chunks: usize,
    pub success_chunks: usize,
    pub error_chunks: usize,
    pub quality_score: f32,
    pub total_duration_secs: f64,
    pub total_calls: u32,
    pub total_cost: f64,
}

/// Supervises translation of a document, one chunk at a time.
pub struct RootOrchestrator {
    state: TranslationState,
    sub_translator: SubTranslator,
    verifier: Verifier,
    config: EngineConfig,
    content_type: ContentType,
    cancel_flag: Arc<AtomicBool>,
    /// Index most recently passed to `TranslationState::update_chunk`,
    /// used as the similarity anchor for adaptive chunk selection.
    last_committed_index: Option<usize>,
}

impl RootOrchestrator {
    pub fn new(
        config: EngineConfig,
        gateway: Arc<dyn ProviderGateway>,
        chunks: Vec<Chunk>,
        content_type: ContentType,
    ) -> Self {
        let preset = Preset::default_for(config.preset);
        let mut state = TranslationState::new(config.preset);
        state.style_guide = preset.style_guide.clone();
        state.seed_chunks(chunks);

        let params = CompletionParams {
            temperature: preset.llm_params.temperature,
            max_tokens: preset.llm_params.max_tokens,
            top_p: preset.llm_params.top_p,
        };

        let sub_translator = SubTranslator::new(
            gateway,
            config.preset,
            config.source_lang.clone(),
            config.target_lang.clone(),
            config.provider.sub_model.clone(),
            params,
        );

        Self {
            state,
            sub_translator,
            verifier: Verifier::new(config.enable_llm_validation),
            config,
            content_type,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            last_committed_index: None,
        }
    }

    /// Handle used by an embedder to request cooperative cancellation;
    /// checked at phase boundaries, never preempts mid-call.
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &TranslationState {
        &self.state
    }

    /// Pre-seed the hard glossary with caller-supplied terms before the
    /// first round runs.
    pub fn seed_glossary(&mut self, glossary: &std::collections::HashMap<String, String>) {
        for (source, target) in glossary {
            self.state.add_hard_term(source, target);
        }
    }

    /// PLAN: pick the next chunk index under the configured strategy.
    fn plan_next_chunk(&self) -> Option<usize> {
        match self.state.chunk_plan.strategy {
            crate::state::ChunkSelectionStrategy::Sequential => {
                let idx = self.state.current_chunk_index;
                if idx < self.state.total_chunks {
                    Some(idx)
                } else {
                    None
                }
            }
            crate::state::ChunkSelectionStrategy::Adaptive | crate::state::ChunkSelectionStrategy::Priority => {
                let remaining: Vec<usize> =
                    (0..self.state.total_chunks).filter(|&i| self.state.translation_history[i].is_none()).collect();
                if remaining.len() < 2 {
                    return remaining.first().copied();
                }

                let prev_translation = self
                    .last_committed_index
                    .and_then(|i| self.state.translation_history[i].as_deref())
                    .unwrap_or("");

                let mut best_idx = remaining[0];
                let mut best_sim = 0.0f64;
                for &idx in &remaining {
                    let sim = jaccard_similarity(prev_translation, &self.state.chunk_history[idx]);
                    if sim > best_sim {
                        best_sim = sim;
                        best_idx = idx;
                    }
                }
                Some(best_idx)
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute_round(&mut self) -> RoundOutcome {
        let start = Instant::now();

        if self.is_cancelled() {
            return RoundOutcome::Cancelled;
        }
        report_progress(ProgressEvent::Step {
            chunk_index: self.state.current_chunk_index,
            phase: "plan",
        });
        let Some(chunk_index) = self.plan_next_chunk() else {
            return RoundOutcome::AllCompleted;
        };

        if self.is_cancelled() {
            return RoundOutcome::Cancelled;
        }
        report_progress(ProgressEvent::Step { chunk_index, phase: "retrieve" });
        let chunk = self.state.chunk_plan.chunks[chunk_index].clone();

        if self.is_cancelled() {
            return RoundOutcome::Cancelled;
        }
        report_progress(ProgressEvent::Step { chunk_index, phase: "translate" });
        let package = ContextPackager::build(&self.state, &chunk, None);
        let translation_result = self.sub_translator.translate_chunk(&package).await;
        self.record_call_stats(translation_result.input_tokens, translation_result.output_tokens);

        if !translation_result.success {
            self.state.record_error(
                chunk_index,
                QualityFlagType::MeaningLost,
                translation_result.error.clone().unwrap_or_else(|| "unknown provider error".to_string()),
            );
            self.state.add_chunk();
            report_progress(ProgressEvent::ChunkOutcome {
                chunk_index,
                outcome: ChunkOutcome::Failed,
                chars_out: 0,
            });
            return RoundOutcome::Chunk(ChunkRoundResult {
                chunk_index,
                validation_passed: false,
                outcome: ChunkOutcome::Failed,
                duration_secs: start.elapsed().as_secs_f64(),
            });
        }

        let mut translation = translation_result.translation;
        self.state.propose_terms(&translation_result.term_candidates);
        if self.config.check_conflicts_on_promote {
            for (source, target) in &translation_result.term_candidates {
                if self.state.check_term_conflict(source, target).is_none() {
                    self.state.update_glossary(source, target, false);
                }
            }
        }

        if self.is_cancelled() {
            return RoundOutcome::Cancelled;
        }
        report_progress(ProgressEvent::Step { chunk_index, phase: "verify" });
        let mut validation = self.verifier.validate(
            &translation,
            &chunk.text,
            &self.state.get_context_package(),
            self.content_type,
            self.config.check_sentence,
            self.config.check_length,
        );

        let outcome = if validation.valid {
            report_progress(ProgressEvent::Step { chunk_index, phase: "repair" });
            ChunkOutcome::Fresh
        } else {
            report_progress(ProgressEvent::Step { chunk_index, phase: "repair" });
            let mut retry_count = 0;
            while !validation.valid && retry_count < self.config.retry.max_retries {
                if self.is_cancelled() {
                    return RoundOutcome::Cancelled;
                }
                report_progress(ProgressEvent::RetryAttempt {
                    chunk_index,
                    attempt: retry_count + 1,
                    max_attempts: self.config.retry.max_retries,
                });
                translation = self.perform_repair(chunk_index, &chunk, &translation, &validation).await;
                validation = self.verifier.validate(
                    &translation,
                    &chunk.text,
                    &self.state.get_context_package(),
                    self.content_type,
                    self.config.check_sentence,
                    self.config.check_length,
                );
                retry_count += 1;
            }
            if validation.valid {
                ChunkOutcome::Repaired
            } else {
                self.state.record_error(chunk_index, QualityFlagType::FormatError, validation.summary());
                ChunkOutcome::Failed
            }
        };

        if self.is_cancelled() {
            return RoundOutcome::Cancelled;
        }
        report_progress(ProgressEvent::Step { chunk_index, phase: "commit" });
        self.state.update_chunk(chunk_index, translation.clone());
        self.last_committed_index = Some(chunk_index);
        self.state.add_chunk();
        self.state.add_history_summary(format!(
            "Chunk {}/{} completed ({:?})",
            chunk_index + 1,
            self.state.total_chunks,
            outcome
        ));

        report_progress(ProgressEvent::ChunkOutcome {
            chunk_index,
            outcome,
            chars_out: translation.chars().count(),
        });

        RoundOutcome::Chunk(ChunkRoundResult {
            chunk_index,
            validation_passed: validation.valid,
            outcome,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Dispatch to the repair action the verifier recommended.
    async fn perform_repair(
        &mut self,
        chunk_index: usize,
        chunk: &Chunk,
        translation: &str,
        validation: &crate::verifier::ValidationResult,
    ) -> String {
        let Some(repair_type) = validation.repair_type else {
            return translation.to_string();
        };

        if let Some(description) = &validation.repair_description {
            report_progress(ProgressEvent::Repair {
                chunk_index,
                repair_type,
                description: description.clone(),
            });
        }

        match repair_type {
            RepairType::TemplateReinforce => self.reinforce_formatting(chunk_index, translation).await,
            RepairType::GlossaryUpdate => self.retranslate_chunk(chunk_index, chunk).await,
            RepairType::ReTranslate | RepairType::ContextAdjust => self.retranslate_chunk(chunk_index, chunk).await,
            RepairType::SplitChunk => self.retranslate_chunk(chunk_index, chunk).await,
        }
    }

    /// Re-send the current (malformed) translation itself as the text
    /// to fix, asking the sub-translator to reinforce formatting rules.
    async fn reinforce_formatting(&mut self, chunk_index: usize, translation: &str) -> String {
        let synthetic = Chunk::new(chunk_index, 0, 0, translation.to_string());
        let package = ContextPackager::build(&self.state, &synthetic, None);
        let result = self.sub_translator.translate_chunk(&package).await;
        self.record_call_stats(result.input_tokens, result.output_tokens);
        if result.success {
            self.state.increment_retry_count(QualityFlagType::FormatError);
            result.translation
        } else {
            translation.to_string()
        }
    }

    fn record_call_stats(&mut self, input_tokens: u64, output_tokens: u64) {
        self.state.cost_stats.sub_calls += 1;
        self.state.cost_stats.total_tokens += input_tokens + output_tokens;
        report_progress(ProgressEvent::CostStats {
            total_calls: self.state.cost_stats.sub_calls + self.state.cost_stats.root_calls,
            total_cost: self.state.cost_stats.total_cost,
            total_tokens: self.state.cost_stats.total_tokens,
        });
    }

    async fn retranslate_chunk(&mut self, chunk_index: usize, chunk: &Chunk) -> String {
        let _ = chunk_index;
        let package = ContextPackager::build(&self.state, chunk, None);
        let result = self.sub_translator.translate_chunk(&package).await;
        self.record_call_stats(result.input_tokens, result.output_tokens);
        self.state.increment_retry_count(QualityFlagType::FormatError);
        result.translation
    }

    /// Run until every chunk is committed or the safety bound
    /// (`total_chunks + 10`) is reached.
    pub async fn run(&mut self) -> FinalResult {
        let start = Instant::now();
        report_progress(ProgressEvent::RunStarted {
            total_chunks: self.state.total_chunks,
            preset: self.state.preset_id.as_str().to_string(),
        });

        let max_iterations = self.state.total_chunks + 10;
        let mut iteration = 0usize;

        while iteration < max_iterations {
            if self.is_cancelled() {
                break;
            }
            iteration += 1;

            match self.execute_round().await {
                RoundOutcome::AllCompleted => break,
                RoundOutcome::Cancelled => break,
                RoundOutcome::Chunk(_) => {
                    report_progress(ProgressEvent::QualityFlags {
                        completed: self.state.quality_flags.completed_chunks,
                        failed: self.state.quality_flags.failed_chunks,
                        total: self.state.total_chunks,
                    });
                    if self.state.completed_chunks >= self.state.total_chunks {
                        break;
                    }
                }
            }
        }

        let total = self.state.total_chunks.max(1);
        let failed = self.state.quality_flags.failed_chunks;
        let success = self.state.quality_flags.completed_chunks.saturating_sub(failed);
        self.state.quality_flags.quality_score = (success as f32 / total as f32) - (failed as f32 / total as f32 * 0.5);

        let duration_secs = start.elapsed().as_secs_f64();
        report_progress(ProgressEvent::RunCompleted {
            success_chunks: success,
            error_chunks: failed,
            duration_ms: (duration_secs * 1000.0) as u64,
        });

        FinalResult {
            translated_text: self.state.translated_text(),
            total_chunks: self.state.total_chunks,
            success_chunks: success,
            error_chunks: failed,
            quality_score: self.state.quality_flags.quality_score,
            total_duration_secs: duration_secs,
            total_calls: self.state.cost_stats.sub_calls + self.state.cost_stats.root_calls,
            total_cost: self.state.cost_stats.total_cost,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.state.total_chunks == 0 {
            return 1.0;
        }
        self.state.completed_chunks as f32 / self.state.total_chunks as f32
    }

    pub async fn test_connection(&self) -> bool {
        self.sub_translator.test_connection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedProviderGateway;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().enumerate().map(|(i, t)| Chunk::new(i, 0, t.len(), t.to_string())).collect()
    }

    fn scripted(responses: Vec<&str>) -> Arc<dyn ProviderGateway> {
        Arc::new(ScriptedProviderGateway::new(responses.into_iter().map(String::from).collect()))
    }

    #[tokio::test]
    async fn run_completes_all_chunks_on_clean_translations() {
        let gateway = scripted(vec![
            "This is a perfectly reasonable translation that ends properly.",
            "Another perfectly reasonable translation that also ends properly.",
        ]);
        let config = EngineConfig::default();
        let chunks = chunks(&["First original sentence here.", "Second original sentence here."]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        let result = orchestrator.run().await;
        assert_eq!(result.success_chunks, 2);
        assert_eq!(result.error_chunks, 0);
        assert!(result.translated_text.contains("perfectly reasonable"));
    }

    #[tokio::test]
    async fn run_repairs_truncated_translation_then_commits() {
        let gateway = scripted(vec![
            "Truncated translation...",
            "Repaired translation that ends with a period.",
        ]);
        let config = EngineConfig::default();
        let chunks = chunks(&["Original sentence that is reasonably long for testing purposes."]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        let result = orchestrator.run().await;
        assert_eq!(result.success_chunks, 1);
        assert!(result.translated_text.contains("Repaired"));
    }

    #[tokio::test]
    async fn run_stays_within_safety_bound_when_repairs_never_succeed() {
        let gateway = scripted(vec!["still truncated..."]);
        let mut config = EngineConfig::default();
        config.retry.max_retries = 2;
        let chunks = chunks(&["Original sentence that is reasonably long for testing purposes here now."]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        let result = orchestrator.run().await;
        assert_eq!(result.error_chunks, 1);
        assert_eq!(result.success_chunks, 0);
    }

    #[tokio::test]
    async fn cancellation_stops_before_remaining_chunks_run() {
        let gateway = scripted(vec!["A fine translation that ends with punctuation."]);
        let config = EngineConfig::default();
        let chunks = chunks(&["one", "two", "three"]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        let handle = orchestrator.cancellation_handle();
        handle.store(true, Ordering::SeqCst);
        let result = orchestrator.run().await;
        assert_eq!(result.success_chunks, 0);
    }

    #[tokio::test]
    async fn plan_next_chunk_under_adaptive_strategy_picks_highest_jaccard_overlap() {
        let gateway = scripted(vec!["unused"]);
        let config = EngineConfig::default();
        let chunks = chunks(&[
            "the quick brown fox jumps over the lazy dog",
            "an entirely unrelated zephyr blows past the mountain peak",
            "the quick brown fox runs near the lazy dog again",
        ]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        orchestrator.state.update_chunk(0, "the quick brown fox jumps over the lazy dog".to_string());
        orchestrator.last_committed_index = Some(0);

        orchestrator.state.chunk_plan.strategy = crate::state::ChunkSelectionStrategy::Adaptive;
        let adaptive_pick = orchestrator.plan_next_chunk();
        assert_eq!(adaptive_pick, Some(2));

        orchestrator.state.chunk_plan.strategy = crate::state::ChunkSelectionStrategy::Sequential;
        let sequential_pick = orchestrator.plan_next_chunk();
        assert_eq!(sequential_pick, Some(0));
        assert_ne!(adaptive_pick, sequential_pick);
    }

    /// A gateway that flips a shared cancellation flag partway through a
    /// run, simulating cancellation arriving mid-retry-loop.
    struct CancelingGateway {
        flag: Arc<AtomicBool>,
        calls: std::sync::Mutex<u32>,
        cancel_on_call: u32,
    }

    #[async_trait::async_trait]
    impl ProviderGateway for CancelingGateway {
        async fn complete(
            &self,
            _messages: &[crate::provider::ChatMessage],
            model: &str,
            _params: CompletionParams,
        ) -> crate::error::TranslationResult<crate::provider::ProviderResponse> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == self.cancel_on_call {
                self.flag.store(true, Ordering::SeqCst);
            }
            Ok(crate::provider::ProviderResponse {
                content: "still truncated...".to_string(),
                model: model.to_string(),
                input_tokens: 0,
                output_tokens: 0,
                cost: 0.0,
            })
        }

        async fn list_models(&self) -> crate::error::TranslationResult<Vec<String>> {
            Ok(vec![])
        }

        async fn test_connection(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn cancellation_mid_retry_loop_skips_commit() {
        let flag = Arc::new(AtomicBool::new(false));
        let gateway: Arc<dyn ProviderGateway> = Arc::new(CancelingGateway {
            flag: flag.clone(),
            calls: std::sync::Mutex::new(0),
            cancel_on_call: 2,
        });
        let mut config = EngineConfig::default();
        config.retry.max_retries = 5;
        let chunks = chunks(&["Original sentence that is reasonably long for testing purposes here now."]);
        let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Plain);
        orchestrator.cancel_flag = flag;

        let outcome = orchestrator.execute_round().await;
        assert!(matches!(outcome, RoundOutcome::Cancelled));
        assert!(orchestrator.state().translation_history[0].is_none());
    }
}
