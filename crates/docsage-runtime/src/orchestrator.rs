//! Orchestrator — sequences ingestion and question answering.
//!
//! The index sits behind a single-writer lock. Ingestion with
//! `clear_on_ingest` builds a fresh index off-lock and publishes it in one
//! swap; queries hold the read lock only while searching.

use std::path::Path;
use std::sync::Arc;

use docsage_answer::{assess, sanitize};
use docsage_chat::{
    build_prompt, GenerationBackend, GenerationError, Generator, LLMConfig, LocalSynthesizer,
};
use docsage_core::{DocSageConfig, Result};
use docsage_index::{RetrievalBackend, SearchResult, SimilarityIndex};
use docsage_ingest::{DocumentExtractor, Ingester, TextExtractor};
use docsage_memory::{ConversationMemory, Role};
use docsage_rerank::{MmrReranker, Reranker};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::types::*;

pub struct Orchestrator {
    config: DocSageConfig,
    index: RwLock<SimilarityIndex>,
    backend: RetrievalBackend,
    reranker: MmrReranker,
    memory: ConversationMemory,
    ingester: Ingester,
    extractor: Arc<dyn TextExtractor>,
    generation: GenerationBackend,
}

impl Orchestrator {
    /// Assemble an orchestrator from explicit collaborators.
    pub fn new(
        config: DocSageConfig,
        backend: RetrievalBackend,
        generation: GenerationBackend,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let memory = ConversationMemory::open(
            &config.data_paths.conversation_file,
            config.max_short_term,
            config.max_long_term,
        );

        info!(
            "Orchestrator initialized: retrieval={}, generator={}, top_k={}, lambda={}",
            backend.mode(),
            generation.name(),
            config.top_k,
            config.mmr_lambda
        );

        Self {
            index: RwLock::new(SimilarityIndex::new(backend.clone())),
            reranker: MmrReranker::new(backend.clone(), config.mmr_lambda),
            ingester: Ingester::from_config(&config),
            backend,
            memory,
            extractor,
            generation,
            config,
        }
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: DocSageConfig) -> Result<Self> {
        let backend = RetrievalBackend::from_config(&config)?;
        let llm = LLMConfig::load(&config.data_paths.llm_config_file);
        let generation = GenerationBackend::from_config(&llm);
        Ok(Self::new(
            config,
            backend,
            generation,
            Arc::new(DocumentExtractor),
        ))
    }

    pub fn config(&self) -> &DocSageConfig {
        &self.config
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Extract, chunk and index a document.
    ///
    /// With `clear_on_ingest` the new document replaces the corpus. On error
    /// the index is left as it was.
    pub fn ingest(&self, path: &Path, document_name: &str) -> Result<IngestReport> {
        let output = self
            .ingester
            .ingest_file(self.extractor.as_ref(), path, document_name)?;
        let chunks_created = output.chunks.len();

        if self.config.clear_on_ingest {
            let mut fresh = SimilarityIndex::new(self.backend.clone());
            fresh.add_chunks(output.chunks)?;
            *self.index.write() = fresh;
        } else {
            self.index.write().add_chunks(output.chunks)?;
        }

        info!(
            "Ingestion complete for {}: {} chunks, ~{} tokens",
            document_name, chunks_created, output.total_tokens
        );

        Ok(IngestReport {
            document_name: document_name.to_string(),
            chunks_created,
            total_tokens: output.total_tokens,
            page_count: output.page_count,
            content_hash: output.content_hash,
        })
    }

    /// Answer `query` within a conversation. Never fails: every error becomes
    /// a degraded answer.
    pub async fn query(&self, query: &str, conversation_id: Option<&str>) -> AnswerResult {
        let conv_id = conversation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_ID);
        debug!("Processing query in conversation {}", conv_id);

        let history = self.memory.get_conversation_summary(conv_id);
        self.memory.add_message(conv_id, Role::User, query, None);

        let result = self.answer(query, &history).await;

        let mut metadata = Map::new();
        metadata.insert("confidence".into(), Value::from(result.confidence));
        metadata.insert("citations".into(), Value::from(result.citations.len()));
        self.memory
            .add_message(conv_id, Role::Assistant, &result.answer, Some(metadata));

        info!(
            "Query answered: retrieved={}, citations={}, confidence={:.2}",
            result.retrieved_count,
            result.citations.len(),
            result.confidence
        );
        result
    }

    async fn answer(&self, query: &str, history: &str) -> AnswerResult {
        let retrieved = {
            let index = self.index.read();
            if index.is_empty() {
                debug!("Empty corpus; asking for an upload");
                return AnswerResult::degraded(UPLOAD_PROMPT, 0);
            }
            index.search(query, self.config.top_k)
        };
        let retrieved = match retrieved {
            Ok(r) => r,
            Err(e) => {
                error!("Retrieval failed: {}", e);
                return AnswerResult::degraded("Error retrieving documents", 0);
            }
        };

        let passages = match self.reranker.rerank(query, retrieved.clone()) {
            Ok(reranked) => reranked,
            Err(e) => {
                warn!("Re-ranking failed, keeping search order: {}", e);
                retrieved
            }
        };

        let raw = match self.generate(query, &passages, history).await {
            Ok(text) => text,
            Err(e) => {
                error!("Generation failed: {}", e);
                let mut result = AnswerResult::degraded(
                    sanitize(&format!("Error generating answer: {e}")),
                    passages.len(),
                );
                self.apply_upload_floor(&mut result);
                return result;
            }
        };

        let answer = sanitize(&raw);
        let assessment = assess(&answer, &passages);
        let mut result = AnswerResult {
            answer,
            citations: assessment.citations,
            confidence: assessment.confidence,
            retrieved_count: passages.len(),
        };
        self.apply_upload_floor(&mut result);
        result
    }

    /// Produce raw answer text. Transient failures fall back to local
    /// synthesis; hard failures are returned.
    async fn generate(
        &self,
        query: &str,
        passages: &[SearchResult],
        history: &str,
    ) -> std::result::Result<String, GenerationError> {
        let generator = match &self.generation {
            GenerationBackend::Local(local) => return Ok(local.synthesize(passages)),
            GenerationBackend::Remote(generator) => generator,
        };

        let prompt = build_prompt(query, passages, history);
        let outcome =
            match tokio::time::timeout(self.config.generation_timeout, generator.generate(&prompt))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(GenerationError::Timeout(format!(
                    "no answer from {} within {:?}",
                    generator.name(),
                    self.config.generation_timeout
                ))),
            };

        match outcome {
            Err(e) if e.is_transient() => {
                warn!("{}; using local synthesis", e);
                Ok(LocalSynthesizer.synthesize(passages))
            }
            other => other,
        }
    }

    /// Zero passages and low confidence: replace the answer with the upload
    /// prompt.
    fn apply_upload_floor(&self, result: &mut AnswerResult) {
        if result.retrieved_count == 0 && result.confidence < self.config.confidence_threshold {
            result.answer = UPLOAD_PROMPT.to_string();
            result.citations.clear();
        }
    }

    /// Forget a conversation in both memory tiers.
    pub fn clear_conversation(&self, conversation_id: &str) -> bool {
        self.memory.clear_conversation(conversation_id)
    }

    pub fn status(&self) -> RuntimeStatus {
        let index = self.index.read();
        RuntimeStatus {
            chunks: index.len(),
            index_fitted: index.is_fitted(),
            retrieval_mode: index.mode().to_string(),
            generator: self.generation.name(),
            conversations: self.memory.conversation_ids().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator(dir: &Path) -> Orchestrator {
        let config = DocSageConfig::with_defaults(dir).unwrap();
        Orchestrator::new(
            config,
            RetrievalBackend::Lexical,
            GenerationBackend::Local(LocalSynthesizer),
            Arc::new(DocumentExtractor),
        )
    }

    #[test]
    fn test_status_before_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let status = orch.status();
        assert_eq!(status.chunks, 0);
        assert!(!status.index_fitted);
        assert_eq!(status.retrieval_mode, "lexical");
        assert_eq!(status.generator, "local");
    }

    #[test]
    fn test_failed_ingest_keeps_index() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "Bees pollinate flowering crops in spring.").unwrap();
        orch.ingest(&good, "good.txt").unwrap();

        let bad = dir.path().join("bad.docx");
        std::fs::write(&bad, "whatever").unwrap();
        assert!(orch.ingest(&bad, "bad.docx").is_err());
        assert_eq!(orch.status().chunks, 1);
    }

    #[test]
    fn test_reingest_replaces_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "Apples grow in orchards.").unwrap();
        std::fs::write(&b, "Bananas grow in plantations.").unwrap();
        orch.ingest(&a, "a.txt").unwrap();
        orch.ingest(&b, "b.txt").unwrap();
        let index = orch.index.read();
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunks()[0].document_name, "b.txt");
    }

    #[test]
    fn test_upload_floor_only_without_passages() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let mut empty = AnswerResult::degraded("Error generating answer: boom", 0);
        orch.apply_upload_floor(&mut empty);
        assert_eq!(empty.answer, UPLOAD_PROMPT);

        let mut with_passages = AnswerResult::degraded("Error generating answer: boom", 2);
        orch.apply_upload_floor(&mut with_passages);
        assert_ne!(with_passages.answer, UPLOAD_PROMPT);
    }
}
