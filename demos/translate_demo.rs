use std::collections::HashMap;
use std::sync::Arc;

use rlm_translate::chunk::{ContentType, TextChunker};
use rlm_translate::config::EngineConfig;
use rlm_translate::orchestrator::RootOrchestrator;
use rlm_translate::provider::ScriptedProviderGateway;
use rlm_translate::state::PresetType;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    dotenvy::dotenv().ok();

    println!("Patent Translation Demo");
    println!("=======================\n");

    let source_text = r#"
1. An apparatus for adaptive signal processing, comprising:
a receiver configured to obtain an input signal;
a processor coupled to the receiver, wherein the processor applies a
transformation to the input signal to produce a filtered signal;
and an output interface configured to transmit the filtered signal.

2. The apparatus of claim 1, wherein the transformation comprises a
frequency-domain filter having a configurable cutoff parameter.

3. The apparatus of claim 1, further comprising a calibration unit that
adjusts the configurable cutoff parameter based on a measured noise floor.
"#
    .trim();

    println!("Source text preview:");
    println!("{}", &source_text[..source_text.len().min(200)]);
    println!("... ({} total characters)\n", source_text.len());

    let chunker = TextChunker::new(400, 40);
    let chunks = chunker.chunk_text(source_text, rlm_translate::chunk::ChunkingStrategy::Patent);
    println!("Split into {} chunk(s)\n", chunks.len());

    // A scripted gateway stands in for a real LM Studio / OpenAI-compatible
    // endpoint so this demo runs without any network access.
    let gateway: Arc<dyn rlm_translate::provider::ProviderGateway> = Arc::new(ScriptedProviderGateway::new(vec![
        "1. 적응형 신호 처리를 위한 장치로서, 입력 신호를 획득하도록 구성된 수신기; \
         상기 수신기에 결합되고, 필터링된 신호를 생성하기 위해 상기 입력 신호에 변환을 적용하는 프로세서; \
         및 상기 필터링된 신호를 전송하도록 구성된 출력 인터페이스를 포함하는, 장치."
            .to_string(),
        "2. 청구항 1에 있어서, 상기 변환은 구성 가능한 차단 파라미터를 갖는 주파수 영역 필터를 포함하는, 장치."
            .to_string(),
        "3. 청구항 1에 있어서, 측정된 노이즈 플로어에 기초하여 상기 구성 가능한 차단 파라미터를 조정하는 교정 유닛을 더 포함하는, 장치."
            .to_string(),
    ]));

    let mut config = EngineConfig::default();
    config.preset = PresetType::Patent;
    config.target_lang = "ko".to_string();

    let mut orchestrator = RootOrchestrator::new(config, gateway, chunks, ContentType::Patent);

    let mut seed_glossary = HashMap::new();
    seed_glossary.insert("apparatus".to_string(), "장치".to_string());
    seed_glossary.insert("processor".to_string(), "프로세서".to_string());
    orchestrator.seed_glossary(&seed_glossary);

    let result = orchestrator.run().await;

    println!("Run summary:");
    println!("  chunks:  {} total, {} succeeded, {} failed", result.total_chunks, result.success_chunks, result.error_chunks);
    println!("  quality score: {:.2}", result.quality_score);
    println!("  duration: {:.3}s\n", result.total_duration_secs);

    println!("Translated text:");
    println!("{}", result.translated_text);

    Ok(())
}
