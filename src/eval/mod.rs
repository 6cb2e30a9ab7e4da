//! Evaluation stages that run on the JSON files produced by answering.
//!
//! This module provides:
//! - Ground-truth and results file types, joined on `question_id`
//! - Ground-truth generation from an ingested collection
//! - LLM-as-judge scoring of RAG and baseline answers
//! - Retrieval hit rate
//! - Aggregation and human/judge agreement

pub mod agreement;
pub mod dataset;
pub mod ground_truth;
pub mod hit_rate;
pub mod judge;
pub mod summary;

pub use agreement::{AgreementReport, HumanLabel, cohens_kappa, compare, load_human_labels};
pub use dataset::{
    AnswerRecord, GroundTruthItem, PageRef, RetrievedChunk, load_answers, load_ground_truth,
};
pub use ground_truth::GroundTruthGenerator;
pub use hit_rate::{
    ChunkRelevance, HitRateReport, HitRateSummary, evaluate_hit_rate, k_from_filename,
};
pub use judge::{JudgeVariant, LlmJudge, NoRagReport, NoRagVerdict, RagVerdict};
pub use summary::{JudgmentSummary, load_judged, right_chunks_wrong_answer, summarize};
