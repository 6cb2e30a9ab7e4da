//! Retrieval-augmented answering.
//!
//! Per question: rewrite the query, embed it, fetch the top-k chunks from the
//! vector store, render the prompt and ask the LLM.

use crate::embedder::Embedder;
use crate::error::Result;
use crate::eval::dataset::{AnswerRecord, GroundTruthItem, PageRef, RetrievedChunk};
use crate::llm::{LlmClient, Prompts};
use crate::store::{QdrantStore, StoredPoint};
use std::time::Instant;
use tracing::{debug, info};

/// Result of answering one question with retrieval.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    /// Query actually used for the vector search.
    pub search_query: String,
    pub generated_answer: String,
    pub chunks: Vec<RetrievedChunk>,
}

impl From<&StoredPoint> for RetrievedChunk {
    fn from(point: &StoredPoint) -> Self {
        Self {
            page: point.page().as_ref().and_then(PageRef::from_value),
            source: point.source().map(str::to_string),
            text: Some(point.text().unwrap_or_default().to_string()),
        }
    }
}

/// Render the generator prompt: the question followed by every chunk text.
pub fn render_rag_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let chunk_lines: String = chunks
        .iter()
        .map(|c| format!("{}\n", c.text_or_empty()))
        .collect();

    let mut prompt = Prompts::fill(Prompts::rag_question(), &[("question", question)]);
    prompt.push_str(&Prompts::fill(
        Prompts::rag_context(),
        &[("chunks", &chunk_lines)],
    ));
    prompt
}

/// The RAG answering pipeline over one collection.
pub struct RagPipeline {
    llm: LlmClient,
    embedder: Embedder,
    store: QdrantStore,
    collection: String,
    vector_name: String,
    rewrite_queries: bool,
}

impl RagPipeline {
    pub fn new(
        llm: LlmClient,
        embedder: Embedder,
        store: QdrantStore,
        collection: impl Into<String>,
        vector_name: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            embedder,
            store,
            collection: collection.into(),
            vector_name: vector_name.into(),
            rewrite_queries: true,
        }
    }

    /// Search with the question as-is instead of an LLM-rewritten query.
    pub fn without_rewrite(mut self) -> Self {
        self.rewrite_queries = false;
        self
    }

    /// Rewrite a question into a concise standalone search query.
    pub async fn rewrite_query(&self, question: &str) -> Result<String> {
        let rewritten = self
            .llm
            .complete(Some(Prompts::query_rewriter()), question)
            .await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }

    /// Fetch the top-k chunks for a search query.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .store
            .search(&self.collection, &self.vector_name, &vector, k)
            .await?;
        Ok(hits.iter().map(RetrievedChunk::from).collect())
    }

    /// Answer one question using the top-k chunks.
    pub async fn answer(&self, question: &str, k: usize) -> Result<RagAnswer> {
        let search_query = if self.rewrite_queries {
            self.rewrite_query(question).await?
        } else {
            question.to_string()
        };
        debug!(question, search_query = %search_query, "rewritten query");

        let chunks = self.retrieve(&search_query, k).await?;
        let prompt = render_rag_prompt(question, &chunks);
        let generated_answer = self.llm.complete(None, &prompt).await?;

        Ok(RagAnswer {
            search_query,
            generated_answer,
            chunks,
        })
    }

    /// Answer every ground-truth question at depth `k`, in order.
    pub async fn answer_all(
        &self,
        items: &[GroundTruthItem],
        k: usize,
    ) -> Result<Vec<AnswerRecord>> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let answer = self.answer(&item.question, k).await?;
            info!(
                question_id = %item.question_id,
                k,
                chunks = answer.chunks.len(),
                "[{}/{}] answered",
                idx + 1,
                items.len()
            );

            records.push(AnswerRecord {
                question_id: item.question_id.clone(),
                question: item.question.clone(),
                expected_answer: item.expected_answer.clone(),
                generated_answer: answer.generated_answer,
                retrieved_chunks: answer.chunks,
            });
        }

        info!(k, questions = records.len(), elapsed = ?start.elapsed(), "answer run complete");
        Ok(records)
    }
}
