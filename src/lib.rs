//! RAG Eval - run and score Retrieval-Augmented Generation experiments.
//!
//! # Overview
//!
//! Every stage reads and writes JSON files, so each one can be run on its own:
//! 1. Ingest PDFs into a Qdrant collection (page-aware chunks + embeddings)
//! 2. Generate ground-truth questions from the ingested chunks
//! 3. Answer the questions with retrieval (one results file per k) and without
//! 4. Judge the answers with an LLM for correctness, hallucination and source drift
//! 5. Aggregate verdicts, compute hit rate and agreement with human labels
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_eval::{
//!     config::Config,
//!     embedder::Embedder,
//!     eval::{LlmJudge, load_ground_truth, load_judged, summarize},
//!     llm::LlmClient,
//!     persistence::save_json,
//!     retrieve::RagPipeline,
//!     store::QdrantStore,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let pipeline = RagPipeline::new(
//!         LlmClient::new(config.llm.clone()),
//!         Embedder::new(config.embedding.clone()),
//!         QdrantStore::new(&config.qdrant),
//!         &config.qdrant.collection,
//!         &config.qdrant.vector_name,
//!     );
//!
//!     let ground_truth = load_ground_truth(Path::new("ground_truth.json"))?;
//!     let records = pipeline.answer_all(&ground_truth, 5).await?;
//!     save_json(&records, Path::new("results_k5.json"))?;
//!
//!     let judge = LlmJudge::from_config(config.judge_llm());
//!     let verdicts = judge.judge_rag_run(&ground_truth, &records, false).await?;
//!     save_json(&verdicts, Path::new("judged_k5.json"))?;
//!
//!     let judged = load_judged(Path::new("judged_k5.json"))?;
//!     summarize(&judged).print_summary();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Document / chunker**: PDF pages and page-bounded chunks
//! - **Embedder / QdrantStore**: embedding API and vector store over HTTP
//! - **RagPipeline / DocumentBaseline**: answering with and without retrieval
//! - **eval**: judging, hit rate, aggregation and agreement

pub mod baseline;
pub mod chunker;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod eval;
pub mod ingest;
pub mod inspect;
pub mod llm;
pub mod persistence;
pub mod retrieve;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use document::Document;
pub use error::{EvalError, Result};
pub use eval::{AnswerRecord, GroundTruthItem, LlmJudge};
pub use ingest::Ingestor;
pub use llm::LlmClient;
pub use persistence::{load_json, save_json};
pub use retrieve::RagPipeline;
pub use store::QdrantStore;
