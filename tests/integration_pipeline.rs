#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end question answering with in-process providers

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docs_rag::commands::{AskSummary, answer_questions};
use docs_rag::config::{DocumentsConfig, PerformanceMode};
use docs_rag::documents::{DocumentKind, load_documents};
use docs_rag::embeddings::{
    EmbeddingCache, EmbeddingProvider, GenerationProvider, query_key,
};
use docs_rag::faq::FaqMatcher;
use docs_rag::orchestrator::{AnswerSource, Orchestrator, Stage};
use docs_rag::{RagError, Result};
use serial_test::serial;
use tempfile::TempDir;

const KEYWORDS: &[&str] = &["deploy", "abi", "wallet", "balance", "network", "transfer"];

#[derive(Default)]
struct KeywordEmbedder {
    batch_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl EmbeddingProvider for KeywordEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("unreachable") {
            return Err(RagError::Embedding(
                "Could not reach Ollama at http://localhost:11434/".to_string(),
            ));
        }
        Ok(keyword_vector(text))
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|keyword| {
            lowered
                .split_whitespace()
                .filter(|word| word.starts_with(keyword))
                .count() as f32
        })
        .collect()
}

/// Echoes the first context line so tests can see what was retrieved
struct ContextEcho;

impl GenerationProvider for ContextEcho {
    fn generate(&self, prompt: &str) -> Result<String> {
        let context = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default();
        Ok(format!("From the docs: {}", context))
    }
}

const FAQ_TOML: &str = r#"
[[category]]
name = "balance"
questions = ["How do I check my wallet balance?"]
answer = "use rsk-cli balance"
command = "rsk-cli balance"
executable = true
"#;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dirs");
    }
    fs::write(path, content).expect("should write file");
}

fn workspace() -> (TempDir, DocumentsConfig) {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    write(
        &temp_dir.path().join("docs/README.md"),
        "the deploy command requires an ABI file",
    );
    write(
        &temp_dir.path().join("src/transfer.ts"),
        "export async function transfer(wallet: string, amount: bigint) { /* sends funds */ }",
    );
    write(
        &temp_dir.path().join("src/network.ts"),
        "export const network = process.env.NETWORK ?? 'testnet'; // mainnet or testnet",
    );

    let config = DocumentsConfig {
        readme: temp_dir.path().join("docs/README.md"),
        source_dirs: vec![temp_dir.path().join("src")],
        extensions: vec!["ts".to_string()],
        min_content_length: 20,
    };
    (temp_dir, config)
}

fn build(
    documents: &DocumentsConfig,
    faq: FaqMatcher,
    cache: EmbeddingCache,
    embedder: &Arc<KeywordEmbedder>,
) -> Orchestrator {
    let documents = load_documents(documents).expect("documents load");
    Orchestrator::build(
        PerformanceMode::Normal,
        faq,
        &documents,
        cache,
        Arc::clone(embedder) as Arc<dyn EmbeddingProvider>,
        Arc::new(ContextEcho),
    )
    .expect("orchestrator builds")
}

#[test]
fn faq_answer_bypasses_retrieval() {
    let (temp_dir, documents) = workspace();
    let faq_path = temp_dir.path().join("faq.toml");
    write(&faq_path, FAQ_TOML);
    let embedder = Arc::new(KeywordEmbedder::default());

    let orchestrator = build(
        &documents,
        FaqMatcher::load(&faq_path),
        EmbeddingCache::in_memory(),
        &embedder,
    );
    let answer = orchestrator
        .ask("how can I check wallet balance")
        .expect("answered");

    assert_eq!(answer.text, "use rsk-cli balance");
    let AnswerSource::Faq(instant) = &answer.source else {
        panic!("expected an FAQ answer, got {:?}", answer.source);
    };
    assert!(instant.score() >= 0.4);
    assert!(!answer.stages.contains(&Stage::EmbedQuery));
    assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_faq_falls_through_to_vector_search() {
    let (temp_dir, documents) = workspace();
    let embedder = Arc::new(KeywordEmbedder::default());

    let orchestrator = build(
        &documents,
        FaqMatcher::load(&temp_dir.path().join("no-such-faq.toml")),
        EmbeddingCache::in_memory(),
        &embedder,
    );
    let answer = orchestrator.ask("what does deploy need").expect("answered");

    let AnswerSource::Retrieval { context } = &answer.source else {
        panic!("expected retrieval, got {:?}", answer.source);
    };
    assert_eq!(
        context[0].record.text,
        "the deploy command requires an ABI file"
    );
    assert_eq!(context[0].record.kind, DocumentKind::Documentation);
    assert_eq!(
        answer.text,
        "From the docs: the deploy command requires an ABI file"
    );
    assert_eq!(answer.stages.last(), Some(&Stage::Done));
}

#[test]
fn embeddings_survive_restart() {
    let (temp_dir, documents) = workspace();
    let cache_path = temp_dir.path().join("cache/embeddings_cache.json");

    let first = Arc::new(KeywordEmbedder::default());
    build(
        &documents,
        FaqMatcher::empty(),
        EmbeddingCache::load_all(&cache_path),
        &first,
    )
    .retrieve("what does deploy need")
    .expect("retrieved");
    assert_eq!(first.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.single_calls.load(Ordering::SeqCst), 1);

    let reloaded = EmbeddingCache::load_all(&cache_path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(
        reloaded.get_single(&query_key("what does deploy need")),
        Some(keyword_vector("what does deploy need").as_slice())
    );

    let second = Arc::new(KeywordEmbedder::default());
    let results = build(&documents, FaqMatcher::empty(), reloaded, &second)
        .retrieve("what does deploy need")
        .expect("retrieved");
    assert_eq!(second.batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.single_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        results[0].record.text,
        "the deploy command requires an ABI file"
    );
}

#[test]
fn corrupt_cache_is_treated_as_empty() {
    let (temp_dir, documents) = workspace();
    let cache_path = temp_dir.path().join("embeddings_cache.json");
    write(&cache_path, "{ this is not json");
    let embedder = Arc::new(KeywordEmbedder::default());

    let orchestrator = build(
        &documents,
        FaqMatcher::empty(),
        EmbeddingCache::load_all(&cache_path),
        &embedder,
    );

    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.index().len(), 3);
    assert_eq!(EmbeddingCache::load_all(&cache_path).len(), 1);
}

#[test]
fn failed_question_does_not_stop_the_batch() {
    let (temp_dir, documents) = workspace();
    let faq_path = temp_dir.path().join("faq.toml");
    write(&faq_path, FAQ_TOML);
    let embedder = Arc::new(KeywordEmbedder::default());
    let orchestrator = build(
        &documents,
        FaqMatcher::load(&faq_path),
        EmbeddingCache::in_memory(),
        &embedder,
    );

    let summary = answer_questions(
        &orchestrator,
        &[
            "what does deploy need",
            "is the unreachable server up",
            "how can I check wallet balance",
        ],
    );

    assert_eq!(
        summary,
        AskSummary {
            answered: 2,
            failed: 1
        }
    );
}

#[test]
fn blank_questions_are_skipped() {
    let (temp_dir, documents) = workspace();
    let faq_path = temp_dir.path().join("faq.toml");
    write(&faq_path, FAQ_TOML);
    let embedder = Arc::new(KeywordEmbedder::default());
    let orchestrator = build(
        &documents,
        FaqMatcher::load(&faq_path),
        EmbeddingCache::in_memory(),
        &embedder,
    );

    let summary = answer_questions(&orchestrator, &["", "   ", "what does deploy need"]);

    assert_eq!(
        summary,
        AskSummary {
            answered: 1,
            failed: 0
        }
    );
    assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_readme_is_fatal() {
    let (_temp_dir, documents) = workspace();
    let documents = DocumentsConfig {
        readme: documents.readme.with_file_name("MISSING.md"),
        ..documents
    };

    match load_documents(&documents) {
        Err(RagError::RequiredDocument { path, .. }) => {
            assert!(path.ends_with("docs/MISSING.md"));
        }
        other => panic!("expected RequiredDocument, got {:?}", other),
    }
}

#[test]
#[serial]
fn default_readme_resolves_from_working_directory() {
    let (temp_dir, _) = workspace();
    let original_dir = std::env::current_dir().expect("current dir");
    std::env::set_current_dir(temp_dir.path()).expect("can change dir");

    let result = load_documents(&DocumentsConfig::default());

    std::env::set_current_dir(original_dir).expect("can restore dir");
    let documents = result.expect("documents load");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].text, "the deploy command requires an ABI file");
}
