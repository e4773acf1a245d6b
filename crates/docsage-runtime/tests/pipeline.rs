//! End-to-end ingest and query scenarios.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docsage_chat::{GenerationBackend, GenerationError, Generator, LocalSynthesizer};
use docsage_core::DocSageConfig;
use docsage_index::RetrievalBackend;
use docsage_ingest::DocumentExtractor;
use docsage_memory::Role;
use docsage_runtime::{Orchestrator, UPLOAD_PROMPT};

const PAGE_ONE: &str = "The annual report describes revenue growth across every regional office \
and explains how the budget was allocated this year. Staff training programs expanded \
significantly, with new courses covering leadership, communication, safety procedures and \
customer service standards for employees.";
const PAGE_TWO: &str = "Glaciers in the Alps retreated nearly forty meters during the measured \
period according to satellite surveys collected by researchers.";
const PAGE_THREE: &str = "Marketing campaigns focused on digital channels, social media \
outreach, partnerships with local businesses and sponsorship of community events. Future plans \
include opening two additional offices, hiring more engineers, upgrading software \
infrastructure and improving overall product quality.";

const GLACIER_QUERY: &str = "How fast did glaciers retreat in the Alps?";

/// Returns a fixed answer.
struct Canned(&'static str);

#[async_trait]
impl Generator for Canned {
    fn name(&self) -> String {
        "canned".into()
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.to_string())
    }
}

/// Always fails with the given error.
struct Failing(GenerationError);

#[async_trait]
impl Generator for Failing {
    fn name(&self) -> String {
        "failing".into()
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(self.0.clone())
    }
}

/// Never answers in time.
struct Slow;

#[async_trait]
impl Generator for Slow {
    fn name(&self) -> String {
        "slow".into()
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".into())
    }
}

fn config(dir: &Path) -> DocSageConfig {
    let mut config = DocSageConfig::with_defaults(dir).unwrap();
    config.chunk_size = 20;
    config.chunk_overlap = 0;
    config.generation_timeout = Duration::from_millis(50);
    config
}

fn orchestrator(dir: &Path, generation: GenerationBackend) -> Orchestrator {
    Orchestrator::new(
        config(dir),
        RetrievalBackend::Lexical,
        generation,
        Arc::new(DocumentExtractor),
    )
}

fn remote(generator: impl Generator + 'static) -> GenerationBackend {
    GenerationBackend::Remote(Arc::new(generator))
}

fn ingest_three_pages(orch: &Orchestrator, dir: &Path) {
    let path = dir.join("report.txt");
    std::fs::write(&path, format!("{PAGE_ONE}\x0C{PAGE_TWO}\x0C{PAGE_THREE}")).unwrap();
    let report = orch.ingest(&path, "report.txt").unwrap();
    assert_eq!(report.page_count, 3);
    assert_eq!(report.chunks_created, 5);
    assert!(report.total_tokens >= 5);
}

#[tokio::test]
async fn test_three_page_document_cites_page_two() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), GenerationBackend::Local(LocalSynthesizer));
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert!(result.retrieved_count >= 1);
    assert!(result.citations.iter().any(|c| c.page == 2));
    assert!(result.confidence >= 0.3);
    assert!(result.answer.contains("Glaciers in the Alps"));
}

#[tokio::test]
async fn test_empty_corpus_asks_for_upload() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), remote(Canned("This should never be used.")));

    let result = orch.query("What does the report say?", None).await;
    assert_eq!(result.answer, UPLOAD_PROMPT);
    assert!(result.citations.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.retrieved_count, 0);
}

#[tokio::test]
async fn test_cannot_find_scores_low_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        dir.path(),
        remote(Canned("I cannot find details about that topic in the files.")),
    );
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert_eq!(result.confidence, 0.4);
    assert!(result.citations.is_empty());
}

#[tokio::test]
async fn test_please_upload_answer_is_gated() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        dir.path(),
        remote(Canned(
            "Please upload the full survey so I can describe every page of the document in depth.",
        )),
    );
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert!(result.citations.is_empty());
    assert!(result.confidence <= 0.5);
}

#[tokio::test]
async fn test_rate_limit_falls_back_to_local_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        dir.path(),
        remote(Failing(GenerationError::RateLimited("429".into()))),
    );
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert!(result.answer.contains("Glaciers in the Alps"));
    assert!(result.confidence > 0.0);
    assert!(result.citations.iter().any(|c| c.page == 2));
}

#[tokio::test]
async fn test_timeout_falls_back_to_local_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), remote(Slow));
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert!(result.answer.contains("Glaciers in the Alps"));
    assert!(!result.answer.contains("too late"));
}

#[tokio::test]
async fn test_hard_failure_is_degraded_answer() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        dir.path(),
        remote(Failing(GenerationError::Failed("invalid credentials".into()))),
    );
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, None).await;
    assert!(result.answer.contains("Error generating answer"));
    assert!(result.citations.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert!(result.retrieved_count >= 1);
}

#[tokio::test]
async fn test_query_records_both_turns() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), GenerationBackend::Local(LocalSynthesizer));
    ingest_three_pages(&orch, dir.path());

    let result = orch.query(GLACIER_QUERY, Some("trip")).await;
    let history = orch.memory().get_context("trip", 10);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, GLACIER_QUERY);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, result.answer);
    assert_eq!(history[1].metadata["citations"], result.citations.len());

    assert!(orch.clear_conversation("trip"));
    assert!(orch.memory().get_context("trip", 10).is_empty());
}

#[tokio::test]
async fn test_missing_conversation_id_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(dir.path(), GenerationBackend::Local(LocalSynthesizer));
    orch.query("anything", Some("  ")).await;
    assert_eq!(orch.memory().conversation_ids(), vec!["default"]);
    assert_eq!(orch.status().conversations, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_during_reingest_see_a_complete_index() {
    let dir = tempfile::tempdir().unwrap();
    let orch = Arc::new(orchestrator(dir.path(), GenerationBackend::Local(LocalSynthesizer)));
    ingest_three_pages(&orch, dir.path());

    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "Glaciers shrink when summers grow warmer.").unwrap();
    let report = dir.path().join("report.txt");

    let writer = {
        let orch = orch.clone();
        tokio::task::spawn_blocking(move || {
            for round in 0..20 {
                let (path, name) = if round % 2 == 0 {
                    (&notes, "notes.txt")
                } else {
                    (&report, "report.txt")
                };
                orch.ingest(path, name).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|reader| {
            let orch = orch.clone();
            tokio::spawn(async move {
                let conversation = format!("reader{reader}");
                for _ in 0..15 {
                    let result = orch.query(GLACIER_QUERY, Some(&conversation)).await;
                    assert_ne!(result.answer, UPLOAD_PROMPT);
                    assert!(result.retrieved_count >= 1);

                    let status = orch.status();
                    assert!(status.index_fitted);
                    assert!(status.chunks == 1 || status.chunks == 5, "chunks = {}", status.chunks);
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(orch.status().chunks, 5);
    for reader in 0..4 {
        assert_eq!(orch.memory().history(&format!("reader{reader}")).len(), 30);
    }
}
