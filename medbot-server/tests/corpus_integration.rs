//! Start-up integration tests: corpus layouts on disk through `Assistant::bootstrap`

use std::fs;
use std::path::Path;
use std::sync::Arc;

use medbot_core::config::CorpusFormat;
use medbot_core::{EntityKind, HashingEmbeddingClient, MedbotConfig};
use medbot_server::subsystems::providers::UnavailableGenerator;
use medbot_server::Assistant;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn config(root: &Path, format: CorpusFormat) -> MedbotConfig {
    let mut config = MedbotConfig::default();
    config.corpus.root = root.display().to_string();
    config.corpus.format = format;
    config.embedding.backend = "hashing".to_string();
    config
}

async fn bootstrap(config: MedbotConfig) -> Assistant {
    Assistant::bootstrap(
        config,
        Arc::new(HashingEmbeddingClient::default()),
        Arc::new(UnavailableGenerator::new("offline")),
    )
    .await
}

#[tokio::test]
async fn test_json_layout_with_every_file_shape() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    // array of objects
    write(
        root,
        "conditions/common_conditions.json",
        r#"[{"name": "Influenza", "symptoms": ["fever", "aches"], "treatment": "rest"}]"#,
    );
    // object wrapping one array
    write(
        root,
        "medications/drug_database.json",
        r#"{"medications": [{"drug_name": "Cetirizine", "class": "Antihistamine"}]}"#,
    );
    // object keyed by name
    write(
        root,
        "symptoms/common_symptoms.json",
        r#"{"Nausea": {"severity": "mild"}, "Dizziness": {"severity": "moderate"}}"#,
    );
    // single object
    write(
        root,
        "first_aid/emergency_procedure.json",
        r#"{"procedure": "Recovery position", "steps": ["roll onto side", "tilt head back"]}"#,
    );
    // unreadable file is skipped, not fatal
    write(root, "symptoms/emergency_symptoms.json", "{ not json");

    let assistant = bootstrap(config(root, CorpusFormat::Json)).await;
    let stats = assistant.stats();

    assert_eq!(stats.records, 5);
    assert_eq!(stats.indexed, 5);
    assert_eq!(stats.counts.get(&EntityKind::Symptom), Some(&2));

    let flu = assistant.lookup(EntityKind::Condition, "influenza").unwrap();
    assert_eq!(flu.fields.get("symptoms").map(String::as_str), Some("fever; aches"));

    let steps = assistant
        .lookup(EntityKind::Solution, "recovery")
        .and_then(|r| r.fields.get("steps"))
        .cloned();
    assert_eq!(steps.as_deref(), Some("roll onto side; tilt head back"));

    assert_eq!(
        assistant.topics(),
        &[
            "condition/common_conditions".to_string(),
            "symptom/common_symptoms".to_string(),
            "drug/drug_database".to_string(),
            "solution/emergency_procedure".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_csv_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "conditions.csv",
        "Name,Description,Symptoms\nAsthma,Chronic airway inflammation,\"wheezing, cough\"\nGERD,Acid reflux,heartburn\n",
    );
    write(
        root,
        "drugs.csv",
        "Drug Name,Class,Uses\nLoratadine,Antihistamine,allergies\n",
    );
    write(root, "solutions.csv", "Title,Steps\n,orphan row without a name\n");

    let assistant = bootstrap(config(root, CorpusFormat::Csv)).await;
    let stats = assistant.stats();

    assert_eq!(stats.records, 3);
    assert_eq!(stats.counts.get(&EntityKind::Condition), Some(&2));
    assert_eq!(stats.counts.get(&EntityKind::Solution), None);

    let asthma = assistant.lookup(EntityKind::Condition, "ASTHMA").unwrap();
    assert_eq!(asthma.field(&["symptoms"]), Some("wheezing, cough"));

    let loratadine = assistant.lookup(EntityKind::Drug, "loratadine").unwrap();
    assert_eq!(loratadine.source, "drugs");
}

#[tokio::test]
async fn test_stale_cache_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "medications/drug_database.json",
        r#"[{"name": "Aspirin", "class": "NSAID"}]"#,
    );
    let cache_file = "cache/embeddings.feature-hashing-v1-256.json";
    write(
        root,
        cache_file,
        r#"{"format_tag": "0000000000000000", "model": "feature-hashing-v1-256", "dimensions": 256, "vectors": {}}"#,
    );

    let mut config = config(root, CorpusFormat::Json);
    config.embedding.cache_path = Some(root.join("cache/embeddings.json").display().to_string());

    let assistant = bootstrap(config).await;
    let stats = assistant.stats();
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.indexed, 1);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join(cache_file)).unwrap()).unwrap();
    assert_eq!(saved["format_tag"], stats.format_tag);
    assert_eq!(saved["dimensions"], 256);
    assert_eq!(saved["vectors"].as_object().unwrap().len(), 1);
}

fn sample_data() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../data")
}

#[tokio::test]
async fn test_bundled_json_corpus_loads() {
    let assistant = bootstrap(config(&sample_data(), CorpusFormat::Json)).await;
    let stats = assistant.stats();

    assert_eq!(stats.records, stats.indexed);
    assert_eq!(assistant.topics().len(), 6);
    assert!(assistant.lookup(EntityKind::Drug, "ibuprofen").is_some());
    assert!(assistant.lookup(EntityKind::Symptom, "chest pain").is_some());
    assert!(assistant.lookup(EntityKind::Solution, "cpr").is_some());
}

#[tokio::test]
async fn test_bundled_csv_corpus_loads() {
    let assistant = bootstrap(config(&sample_data().join("csv"), CorpusFormat::Csv)).await;

    assert_eq!(assistant.topics().len(), 4);
    assert_eq!(
        assistant.lookup(EntityKind::Drug, "omeprazole").map(|r| r.source.as_str()),
        Some("drugs")
    );
}
