use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use insights_core::config::ModelConfig;
use insights_core::{
    create_model, Conversation, InsightsConfig, InsightsError, ModelError, OutputSchema,
    StructuredModel,
};
use insights_engine::{InsightsPipeline, OutputMode, UNKNOWN_USER_NAME};
use insights_ingest::ArchiveLoader;

// ============================================================================
// Fixtures
// ============================================================================

/// Answers `{name: "Alex"}` and a fixed suggestion list, counting calls.
#[derive(Default)]
struct AlexModel {
    calls: AtomicUsize,
}

#[async_trait]
impl StructuredModel for AlexModel {
    async fn generate_structured(
        &self,
        _prompt: &str,
        schema: OutputSchema,
    ) -> Result<Value, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match schema {
            OutputSchema::Name => json!({ "name": "Alex" }),
            OutputSchema::Suggestions => json!({
                "suggestions": ["Say where you are travelling from", "Give your budget"]
            }),
        })
    }

    fn name(&self) -> &str {
        "alex"
    }
}

/// Never answers within any reasonable timeout.
struct StalledModel;

#[async_trait]
impl StructuredModel for StalledModel {
    async fn generate_structured(
        &self,
        _prompt: &str,
        _schema: OutputSchema,
    ) -> Result<Value, ModelError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(json!({ "name": "too late" }))
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn alex_export() -> Value {
    json!([{
        "id": "conv-1",
        "title": "Trip planning",
        "create_time": 1710000000.0,
        "mapping": {
            "root": { "id": "root", "message": null, "parent": null, "children": ["u1"] },
            "u1": {
                "id": "u1",
                "message": {
                    "id": "u1",
                    "author": { "role": "user" },
                    "content": {
                        "content_type": "text",
                        "parts": ["Hi, I'm Alex, can you help me plan a trip?"]
                    }
                },
                "parent": "root",
                "children": ["a1"]
            },
            "a1": {
                "id": "a1",
                "message": {
                    "id": "a1",
                    "author": { "role": "assistant" },
                    "content": { "content_type": "text", "parts": ["Of course!"] }
                },
                "parent": "u1",
                "children": []
            }
        }
    }])
}

fn write_zip(path: &Path, entries: &[(&str, String)]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

struct Workspace {
    _root: tempfile::TempDir,
    scratch: PathBuf,
    archive: PathBuf,
    output: PathBuf,
}

impl Workspace {
    fn new(export: Option<Value>) -> Self {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();

        let archive = root.path().join("export.zip");
        let mut entries = vec![("chat.html", "<html></html>".to_string())];
        if let Some(export) = export {
            entries.push(("conversations.json", export.to_string()));
        }
        write_zip(&archive, &entries);

        Self {
            scratch,
            archive,
            output: root.path().join("out"),
            _root: root,
        }
    }

    fn pipeline(&self, model: Arc<dyn StructuredModel>) -> InsightsPipeline {
        self.pipeline_with(model, seeded_config())
    }

    fn pipeline_with(&self, model: Arc<dyn StructuredModel>, config: InsightsConfig) -> InsightsPipeline {
        InsightsPipeline::new(model, config).with_loader(ArchiveLoader::with_temp_root(&self.scratch))
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch).unwrap().next().is_none()
    }
}

fn seeded_config() -> InsightsConfig {
    let mut config = InsightsConfig::default();
    config.analysis.shuffle_seed = Some(1);
    config
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_alex_end_to_end() {
    let ws = Workspace::new(Some(alex_export()));
    let model = Arc::new(AlexModel::default());

    let output = ws
        .pipeline(model.clone())
        .run(&ws.archive, OutputMode::InMemory)
        .await
        .unwrap();

    assert_eq!(output.report.user_name, "Alex");
    assert_eq!(output.report.user_analysis.overview.total_chats, 1);
    assert_eq!(output.report.suggestions.len(), 2);
    // one chunk call, one selection call, one prompt call
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    assert!(output.written.is_none());
    assert!(output.artifacts.pdf.starts_with(b"%PDF-1.4"));
    assert!(String::from_utf8_lossy(&output.artifacts.html).contains("Hi Alex!"));
    assert!(ws.scratch_is_empty(), "extraction directory left behind");
}

#[tokio::test]
async fn test_run_writes_artifacts_to_directory() {
    let ws = Workspace::new(Some(alex_export()));

    let output = ws
        .pipeline(Arc::new(AlexModel::default()))
        .run(&ws.archive, OutputMode::Directory(ws.output.clone()))
        .await
        .unwrap();

    let written = output.written.expect("artifacts should be written");
    assert!(written.html_path.starts_with(&ws.output));
    assert!(written.html_path.file_name().unwrap().to_string_lossy().starts_with("chatgpt-insights-"));
    assert_eq!(std::fs::read(&written.pdf_path).unwrap(), output.artifacts.pdf);
}

#[tokio::test]
async fn test_missing_archive_reports_absolute_path() {
    let ws = Workspace::new(Some(alex_export()));
    let model = Arc::new(AlexModel::default());
    let missing = ws.scratch.join("nope.zip");

    let err = ws
        .pipeline(model.clone())
        .run(&missing, OutputMode::Directory(ws.output.clone()))
        .await
        .unwrap_err();

    match &err {
        InsightsError::FileNotFound { path } => assert_eq!(path, &missing),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
    assert!(err.to_string().starts_with("file not found: "));
    assert!(ws.scratch_is_empty());
    assert!(!ws.output.exists());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_zip_rejected_before_extraction() {
    let ws = Workspace::new(Some(alex_export()));
    let not_zip = ws.archive.with_extension("json");
    std::fs::write(&not_zip, alex_export().to_string()).unwrap();

    let err = ws
        .pipeline(Arc::new(AlexModel::default()))
        .run(&not_zip, OutputMode::InMemory)
        .await
        .unwrap_err();

    assert!(matches!(err, InsightsError::NotZipFile { .. }));
    assert!(err.to_string().contains("must be a zip file"));
    assert!(ws.scratch_is_empty());
}

#[tokio::test]
async fn test_archive_without_conversations_cleans_up() {
    let ws = Workspace::new(None);

    let err = ws
        .pipeline(Arc::new(AlexModel::default()))
        .run(&ws.archive, OutputMode::InMemory)
        .await
        .unwrap_err();

    assert!(matches!(err, InsightsError::MissingConversations { .. }));
    assert!(ws.scratch_is_empty(), "extraction directory left behind on failure");
}

#[tokio::test]
async fn test_export_without_user_messages() {
    let ws = Workspace::new(Some(json!([{ "id": "empty", "mapping": {} }])));
    let model = Arc::new(AlexModel::default());

    let output = ws
        .pipeline(model.clone())
        .run(&ws.archive, OutputMode::InMemory)
        .await
        .unwrap();

    assert_eq!(output.report.user_name, UNKNOWN_USER_NAME);
    assert_eq!(output.report.suggestions, insights_engine::DEFAULT_SUGGESTIONS.to_vec());
    assert_eq!(output.report.user_analysis.overview.total_chats, 1);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Timeouts
// ============================================================================

fn alex_conversations() -> Vec<Conversation> {
    serde_json::from_value(alex_export()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_call_timeout_fails_run() {
    let mut config = seeded_config();
    config.pipeline.call_timeout_secs = 5;
    config.pipeline.run_timeout_secs = 600;
    let pipeline = InsightsPipeline::new(Arc::new(StalledModel), config);

    let err = pipeline.generate_report(&alex_conversations()).await.unwrap_err();

    assert!(
        matches!(err, InsightsError::Model(ModelError::Timeout(d)) if d == Duration::from_secs(5)),
        "got {err:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_deadline_fails_run() {
    let mut config = seeded_config();
    config.pipeline.call_timeout_secs = 60;
    config.pipeline.run_timeout_secs = 2;
    let pipeline = InsightsPipeline::new(Arc::new(StalledModel), config);

    let err = pipeline.generate_report(&alex_conversations()).await.unwrap_err();

    match err {
        InsightsError::Timeout { stage, elapsed } => {
            assert_eq!(stage, "name detection");
            assert!(elapsed >= Duration::from_secs(2));
        }
        other => panic!("expected run timeout, got {other:?}"),
    }
}

// ============================================================================
// Against an OpenAI-compatible endpoint
// ============================================================================

fn completion(content: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content.to_string() },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_end_to_end_against_mock_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": { "json_schema": { "name": "name_response" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({ "name": "Alex" }))))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": { "json_schema": { "name": "suggestions_response" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "suggestions": ["Mention dates", "Mention budget", "Mention travel style"]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let model_config = ModelConfig {
        base_url: server.uri(),
        ..ModelConfig::default()
    };
    let model: Arc<dyn StructuredModel> = Arc::from(create_model(&model_config, "sk-test").unwrap());
    let ws = Workspace::new(Some(alex_export()));

    let output = ws.pipeline(model).run(&ws.archive, OutputMode::InMemory).await.unwrap();

    assert_eq!(output.report.user_name, "Alex");
    let mut suggestions = output.report.suggestions.clone();
    suggestions.sort();
    assert_eq!(suggestions, vec!["Mention budget", "Mention dates", "Mention travel style"]);
}
