#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Ollama client behaviour against a mock server

use std::time::Duration;

use docs_rag::RagError;
use docs_rag::commands::build_orchestrator;
use docs_rag::config::{Config, DocumentsConfig, OllamaConfig};
use docs_rag::embeddings::EmbeddingCache;
use docs_rag::embeddings::{EmbeddingProvider, GenerationProvider, OllamaClient};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_config_for(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        protocol: "http".to_string(),
        host: server.address().ip().to_string(),
        port: server.address().port(),
        embedding_model: "nomic-embed-text".to_string(),
        generation_model: "llama3.2".to_string(),
    }
}

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(&ollama_config_for(server)).expect("Failed to create Ollama client")
}

/// The client is blocking, so run it off the async runtime
async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task should not panic")
}

#[tokio::test]
async fn embed_batch_sends_all_texts_in_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_json(json!({
            "model": "nomic-embed-text",
            "input": ["first chunk", "second chunk"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let embeddings = blocking(move || {
        client.embed_batch(&["first chunk".to_string(), "second chunk".to_string()])
    })
    .await
    .expect("embedding succeeds");

    assert_eq!(embeddings, vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);
}

#[tokio::test]
async fn embed_one_returns_single_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["what does deploy need"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let embedding = blocking(move || client.embed_one("what does deploy need"))
        .await
        .expect("embedding succeeds");

    assert_eq!(embedding, vec![1.0, 0.0]);
}

#[tokio::test]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = blocking(move || client.embed_batch(&["a".to_string(), "b".to_string()])).await;

    assert!(matches!(result, Err(RagError::Embedding(_))), "{:?}", result);
}

#[tokio::test]
async fn server_error_is_reported_once_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = blocking(move || client.embed_one("anything")).await;

    match result {
        Err(RagError::Embedding(message)) => assert!(message.contains("500"), "{}", message),
        other => panic!("expected embedding error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "too late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_generation_timeout(Duration::from_millis(200));
    let result = blocking(move || client.generate("hello")).await;

    assert!(matches!(result, Err(RagError::Timeout(_))), "{:?}", result);
}

#[tokio::test]
async fn generate_posts_non_streaming_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": "llama3.2",
            "prompt": "What is rsk-cli?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "  rsk-cli is a command-line tool for Rootstock.\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = blocking(move || client.generate("What is rsk-cli?"))
        .await
        .expect("generation succeeds");

    assert_eq!(answer, "rsk-cli is a command-line tool for Rootstock.");
}

#[tokio::test]
async fn health_check_requires_both_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "nomic-embed-text:latest", "size": 274302450, "digest": "abc"},
                {"name": "llama3.2:latest", "size": 2019393189, "digest": "def"}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let models = blocking({
        let client = client.clone();
        move || client.list_models()
    })
    .await
    .expect("models listed");
    assert_eq!(models.len(), 2);

    blocking(move || client.health_check())
        .await
        .expect("both models are available");
}

#[tokio::test]
async fn health_check_reports_missing_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "nomic-embed-text:latest"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = blocking(move || client.health_check()).await;

    match result {
        Err(RagError::Config(message)) => assert!(message.contains("llama3.2"), "{}", message),
        other => panic!("expected missing model error, got {:?}", other),
    }
}

#[tokio::test]
async fn build_orchestrator_answers_through_ollama() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_json(json!({
            "model": "nomic-embed-text",
            "input": ["the deploy command requires an ABI file"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["what does deploy need"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.9, 0.1]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3.2", "stream": false})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": " It needs an ABI file. "})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = tempfile::TempDir::new().expect("should create TempDir successfully");
    let readme = temp_dir.path().join("README.md");
    std::fs::write(&readme, "the deploy command requires an ABI file").expect("write readme");

    let config = Config {
        ollama: ollama_config_for(&server),
        documents: DocumentsConfig {
            readme,
            ..DocumentsConfig::default()
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let cache_path = config.cache_path();

    let answer = blocking(move || {
        let orchestrator = build_orchestrator(&config)?;
        assert_eq!(orchestrator.index().len(), 1);
        orchestrator.ask("what does deploy need")
    })
    .await
    .expect("question answered");

    assert_eq!(answer.text, "It needs an ABI file.");
    assert!(!answer.is_instant());
    assert_eq!(EmbeddingCache::load_all(cache_path).len(), 2);
}
