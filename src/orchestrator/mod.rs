// Orchestrator module
// Tiered question answering: FAQ first, then embedding retrieval and generation


use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itertools::Itertools;
use tracing::{debug, info};

use crate::Result;
use crate::config::{
    DEFAULT_FAQ_ACCEPTANCE_THRESHOLD, ModeProfile, PerformanceMode, PromptStyle,
};
use crate::documents::Document;
use crate::embeddings::{
    CachedEmbedding, ChunkingConfig, EmbeddingCache, EmbeddingProvider, GenerationProvider,
    document_batch_key, query_key, split_documents,
};
use crate::faq::{FaqMatcher, InstantAnswer};
use crate::index::{SearchResult, VectorIndex};

/// Placed between retrieved chunks in the assembled context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Reply the model is told to give when the context lacks the answer
pub const NO_ANSWER_REPLY: &str = "I don't have that information.";

/// States a question passes through in [`Orchestrator::ask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FaqCheck,
    Answered,
    RetrievalNeeded,
    EmbedQuery,
    VectorSearch,
    ContextAssembled,
    Done,
}

impl fmt::Display for Stage {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where an [`Answer`] came from
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerSource {
    Faq(InstantAnswer),
    Retrieval {
        /// Retrieved chunks, best first
        context: Vec<SearchResult>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
    /// Every stage visited, in order
    pub stages: Vec<Stage>,
}

impl Answer {
    #[inline]
    pub fn is_instant(&self) -> bool {
        matches!(self.source, AnswerSource::Faq(_))
    }
}

/// Owns the answering pipeline for one process.
///
/// The index is read-only after [`Orchestrator::build`]; the embedding cache
/// sits behind a mutex so every get and put is serialized.
pub struct Orchestrator {
    mode: PerformanceMode,
    profile: ModeProfile,
    acceptance_threshold: f64,
    faq: FaqMatcher,
    index: VectorIndex,
    cache: Mutex<EmbeddingCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
}

impl fmt::Debug for Orchestrator {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.mode)
            .field("acceptance_threshold", &self.acceptance_threshold)
            .field("faq_categories", &self.faq.categories().len())
            .field("indexed_records", &self.index.len())
            .finish_non_exhaustive()
    }
}

/// Records stage transitions for one question
struct StageTrace(Vec<Stage>);

impl StageTrace {
    fn new() -> Self {
        debug!("Stage: {}", Stage::Start);
        Self(vec![Stage::Start])
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Stage: {}", stage);
        self.0.push(stage);
    }

    fn finish(mut self) -> Vec<Stage> {
        self.enter(Stage::Done);
        self.0
    }
}

impl Orchestrator {
    /// Chunk and embed the corpus, then build the index.
    ///
    /// Corpus vectors come from the cache when the chunk texts are unchanged;
    /// otherwise the whole corpus is embedded in one batch and cached.
    #[inline]
    pub fn build(
        mode: PerformanceMode,
        faq: FaqMatcher,
        documents: &[Document],
        mut cache: EmbeddingCache,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        let profile = mode.profile();
        let records = split_documents(documents, &ChunkingConfig::from(&profile));
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let key = document_batch_key(&texts)?;

        let vectors = match cache.get_batch(&key) {
            Some(vectors) if vectors.len() == texts.len() => {
                info!("Using cached embeddings for {} chunks", texts.len());
                vectors.to_vec()
            }
            _ => {
                info!("Embedding {} chunks", texts.len());
                let vectors = embedder.embed_batch(&texts)?;
                cache.put(key, CachedEmbedding::Batch(vectors.clone()));
                vectors
            }
        };

        let index = VectorIndex::build(records, vectors)?;
        info!(
            "Orchestrator ready in {} mode: {} FAQ categories, {} indexed chunks",
            mode,
            faq.categories().len(),
            index.len()
        );

        Ok(Self {
            mode,
            profile,
            acceptance_threshold: DEFAULT_FAQ_ACCEPTANCE_THRESHOLD,
            faq,
            index,
            cache: Mutex::new(cache),
            embedder,
            generator,
        })
    }

    /// FAQ matches must score strictly above this to be answered instantly
    #[inline]
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    #[inline]
    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// FAQ match that clears the acceptance threshold, if any
    #[inline]
    pub fn instant_answer(&self, question: &str) -> Option<InstantAnswer> {
        self.faq
            .instant_answer(question)
            .filter(|answer| answer.score() > self.acceptance_threshold)
    }

    /// Answer one question, trying the FAQ before retrieval.
    ///
    /// Provider failures are returned for this question only; nothing is retried.
    #[inline]
    pub fn ask(&self, question: &str) -> Result<Answer> {
        let mut trace = StageTrace::new();

        trace.enter(Stage::FaqCheck);
        if let Some(instant) = self.instant_answer(question) {
            trace.enter(Stage::Answered);
            info!(
                "Answered from FAQ category '{}' (score {:.3})",
                instant.result.category,
                instant.score()
            );
            return Ok(Answer {
                text: instant.result.answer.clone(),
                source: AnswerSource::Faq(instant),
                stages: trace.finish(),
            });
        }

        trace.enter(Stage::RetrievalNeeded);
        let context = self.retrieve_traced(question, &mut trace)?;

        let prompt = build_prompt(
            self.profile.prompt_style,
            &assemble_context(&context),
            question,
        );
        trace.enter(Stage::ContextAssembled);

        let text = self.generator.generate(&prompt)?;

        Ok(Answer {
            text,
            source: AnswerSource::Retrieval { context },
            stages: trace.finish(),
        })
    }

    /// Embed the question and return the top chunks for the active mode
    #[inline]
    pub fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let mut trace = StageTrace::new();
        self.retrieve_traced(question, &mut trace)
    }

    fn retrieve_traced(&self, question: &str, trace: &mut StageTrace) -> Result<Vec<SearchResult>> {
        trace.enter(Stage::EmbedQuery);
        let vector = self.embed_query(question)?;

        trace.enter(Stage::VectorSearch);
        Ok(self
            .index
            .query(&vector, self.profile.top_k, self.profile.strategy))
    }

    fn embed_query(&self, question: &str) -> Result<Vec<f32>> {
        let key = query_key(question);

        let cached = self.lock_cache().get_single(&key).map(<[f32]>::to_vec);
        if let Some(vector) = cached {
            debug!("Query embedding cache hit");
            return Ok(vector);
        }

        debug!("Query embedding cache miss");
        let vector = self.embedder.embed_one(question)?;
        self.lock_cache()
            .put(key, CachedEmbedding::Single(vector.clone()));
        Ok(vector)
    }

    fn lock_cache(&self) -> MutexGuard<'_, EmbeddingCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Chunk texts joined best first
#[inline]
pub fn assemble_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| result.record.text.as_str())
        .join(CONTEXT_SEPARATOR)
}

#[inline]
pub fn build_prompt(style: PromptStyle, context: &str, question: &str) -> String {
    match style {
        PromptStyle::Verbose => format!(
            "Answer the following question using ONLY the information in the context.\n\
             If the answer is not in the context, reply \"{NO_ANSWER_REPLY}\"\n\n\
             Context:\n{context}\n\n\
             Question: {question}\n\
             Answer:"
        ),
        PromptStyle::Terse => format!(
            "Context:\n{context}\n\n\
             Q: {question}\n\
             Answer briefly from the context only, otherwise \"{NO_ANSWER_REPLY}\"\n\
             A:"
        ),
    }
}
