//! Retrieval hit rate: did any retrieved chunk hold the answer?

use super::dataset::{AnswerRecord, GroundTruthItem, RetrievedChunk, join_on_question_id};
use super::judge::LlmJudge;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

static K_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"k(\d+)").expect("valid k pattern"));

/// Retrieval depth encoded in a results filename, e.g. `results_k5.json` -> `"5"`.
pub fn k_from_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| K_IN_NAME.captures(name))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Decides whether a retrieved chunk holds the answer to a ground-truth question.
pub trait ChunkRelevance {
    /// Model name recorded in the report.
    fn judge_model(&self) -> &str;

    fn is_relevant(
        &self,
        item: &GroundTruthItem,
        chunk: &RetrievedChunk,
        gt_document: &str,
    ) -> impl Future<Output = Result<bool>>;
}

impl ChunkRelevance for LlmJudge {
    fn judge_model(&self) -> &str {
        self.model()
    }

    async fn is_relevant(
        &self,
        item: &GroundTruthItem,
        chunk: &RetrievedChunk,
        gt_document: &str,
    ) -> Result<bool> {
        self.chunk_is_relevant(item, chunk, gt_document).await
    }
}

/// Verdict on one retrieved chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkJudgment {
    pub chunk_index: usize,
    pub source: Option<String>,
    pub page: Option<String>,
    pub is_relevant: bool,
    pub text_preview: String,
}

/// Hit-rate outcome for one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionHit {
    pub question_id: String,
    pub question: String,
    pub expected_answer: String,
    pub correct_pages: String,
    pub hit: bool,
    /// Index of the first relevant chunk.
    pub hit_at: Option<usize>,
    pub chunks_judged: Vec<ChunkJudgment>,
}

/// Detailed hit-rate report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitRateReport {
    pub k: String,
    pub judge_model: String,
    pub gt_document: String,
    pub results_file: String,
    pub ground_truth_file: String,
    pub total_questions: usize,
    pub hits: usize,
    pub hit_rate: f64,
    pub per_question: Vec<QuestionHit>,
}

/// Compact summary written next to the detailed report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitRateSummary {
    pub k: String,
    pub results_file: String,
    pub judge_model: String,
    pub total_questions: usize,
    pub hits: usize,
    pub hit_rate: f64,
    pub hit_rate_percent: f64,
}

impl HitRateReport {
    pub fn summary(&self) -> HitRateSummary {
        HitRateSummary {
            k: self.k.clone(),
            results_file: self.results_file.clone(),
            judge_model: self.judge_model.clone(),
            total_questions: self.total_questions,
            hits: self.hits,
            hit_rate: self.hit_rate,
            hit_rate_percent: self.hit_rate * 100.0,
        }
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Hit Rate ==========");
        println!("k:                {}", self.k);
        println!("Results file:     {}", self.results_file);
        println!("Judge model:      {}", self.judge_model);
        println!("Questions:        {}", self.total_questions);
        println!("Hits:             {}", self.hits);
        println!("Hit rate:         {:.2}%", self.hit_rate * 100.0);
        println!("==============================");
    }
}

/// Hits over questions evaluated; 0 when nothing was evaluated.
pub fn hit_rate(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Judge the chunks of one record in order, stopping at the first relevant one.
pub async fn judge_question<J: ChunkRelevance>(
    judge: &J,
    item: &GroundTruthItem,
    record: &AnswerRecord,
    gt_document: &str,
) -> Result<QuestionHit> {
    let mut chunks_judged = Vec::new();
    let mut hit_at = None;

    for (idx, chunk) in record.retrieved_chunks.iter().enumerate() {
        let is_relevant = judge.is_relevant(item, chunk, gt_document).await?;
        chunks_judged.push(ChunkJudgment {
            chunk_index: idx,
            source: chunk.source.clone(),
            page: chunk.page.as_ref().map(|p| p.to_string()),
            is_relevant,
            text_preview: chunk.preview(),
        });

        if is_relevant {
            hit_at = Some(idx);
            break;
        }
    }

    Ok(QuestionHit {
        question_id: item.question_id.clone(),
        question: item.question.clone(),
        expected_answer: item.expected_answer.clone(),
        correct_pages: item.correct_pages(),
        hit: hit_at.is_some(),
        hit_at,
        chunks_judged,
    })
}

/// Compute the hit rate of one results file. `k` is read from the results
/// file name.
pub async fn evaluate_hit_rate<J: ChunkRelevance>(
    judge: &J,
    ground_truth: &[GroundTruthItem],
    records: &[AnswerRecord],
    gt_document: &str,
    results_file: &Path,
    ground_truth_file: &Path,
) -> Result<HitRateReport> {
    let (pairs, missing) = join_on_question_id(ground_truth, records);
    for id in &missing {
        warn!(question_id = %id, "question not found in results, skipping");
    }

    let mut per_question = Vec::with_capacity(pairs.len());
    for (idx, (item, record)) in pairs.iter().enumerate() {
        let outcome = judge_question(judge, item, record, gt_document).await?;
        info!(
            question_id = %outcome.question_id,
            hit = outcome.hit,
            chunks = outcome.chunks_judged.len(),
            "[{}/{}] hit rate",
            idx + 1,
            pairs.len()
        );
        per_question.push(outcome);
    }

    let hits = per_question.iter().filter(|q| q.hit).count();
    let total_questions = per_question.len();

    Ok(HitRateReport {
        k: k_from_filename(results_file),
        judge_model: judge.judge_model().to_string(),
        gt_document: gt_document.to_string(),
        results_file: results_file.display().to_string(),
        ground_truth_file: ground_truth_file.display().to_string(),
        total_questions,
        hits,
        hit_rate: hit_rate(hits, total_questions),
        per_question,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::dataset::PageRef;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replies YES/NO from a fixed sequence and counts the calls.
    struct CannedJudge {
        replies: RefCell<VecDeque<bool>>,
        calls: Cell<usize>,
    }

    impl CannedJudge {
        fn new(replies: &[bool]) -> Self {
            Self {
                replies: RefCell::new(replies.iter().copied().collect()),
                calls: Cell::new(0),
            }
        }
    }

    impl ChunkRelevance for CannedJudge {
        fn judge_model(&self) -> &str {
            "canned"
        }

        async fn is_relevant(
            &self,
            _item: &GroundTruthItem,
            _chunk: &RetrievedChunk,
            _gt_document: &str,
        ) -> Result<bool> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.replies.borrow_mut().pop_front().unwrap_or(false))
        }
    }

    fn record(id: &str, chunks: usize) -> AnswerRecord {
        AnswerRecord {
            question_id: id.to_string(),
            question: "q".to_string(),
            expected_answer: "a".to_string(),
            generated_answer: "g".to_string(),
            retrieved_chunks: (0..chunks)
                .map(|i| RetrievedChunk {
                    page: Some(PageRef::Number(i as i64 + 1)),
                    source: Some("survey".to_string()),
                    text: Some(format!("chunk {}", i)),
                })
                .collect(),
        }
    }

    #[test]
    fn test_k_from_filename() {
        assert_eq!(k_from_filename(Path::new("out/results_clean_k15.json")), "15");
        assert_eq!(k_from_filename(Path::new("results_k3.json")), "3");
        assert_eq!(k_from_filename(Path::new("baseline.json")), "N/A");
    }

    #[test]
    fn test_k_from_filename_ignores_directories() {
        assert_eq!(k_from_filename(Path::new("k99/baseline.json")), "N/A");
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(hit_rate(0, 0), 0.0);
        assert_eq!(hit_rate(3, 4), 0.75);
    }

    #[test]
    fn test_no_matching_records_gives_zero_rate() {
        let judge = LlmJudge::from_config(crate::config::LlmConfig::default());
        let gt = vec![GroundTruthItem::new("GT_001", "q", "a")];

        let report = tokio_test::block_on(evaluate_hit_rate(
            &judge,
            &gt,
            &[],
            "survey",
            Path::new("results_k3.json"),
            Path::new("gt.json"),
        ))
        .unwrap();
        assert_eq!(report.k, "3");
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.hit_rate, 0.0);
        assert_eq!(report.judge_model, "gpt-4o-mini");
    }

    #[test]
    fn test_judging_stops_at_first_relevant_chunk() {
        let judge = CannedJudge::new(&[false, true, true]);
        let item = GroundTruthItem::new("GT_001", "q", "a");

        let record = record("GT_001", 3);
        let hit = tokio_test::block_on(judge_question(&judge, &item, &record, "survey")).unwrap();

        assert!(hit.hit);
        assert_eq!(hit.hit_at, Some(1));
        assert_eq!(hit.chunks_judged.len(), 2);
        assert!(!hit.chunks_judged[0].is_relevant);
        assert_eq!(hit.chunks_judged[1].page.as_deref(), Some("2"));
        assert_eq!(judge.calls.get(), 2);
    }

    #[test]
    fn test_no_relevant_chunk_judges_all() {
        let judge = CannedJudge::new(&[false, false, false]);
        let item = GroundTruthItem::new("GT_001", "q", "a");

        let record = record("GT_001", 3);
        let hit = tokio_test::block_on(judge_question(&judge, &item, &record, "survey")).unwrap();

        assert!(!hit.hit);
        assert_eq!(hit.hit_at, None);
        assert_eq!(hit.chunks_judged.len(), 3);
    }

    #[test]
    fn test_report_records_provenance() {
        // GT_001 hits on its first chunk, GT_002 misses on both.
        let judge = CannedJudge::new(&[true, false, false]);
        let gt = vec![
            GroundTruthItem::new("GT_001", "q1", "a1"),
            GroundTruthItem::new("GT_002", "q2", "a2"),
            GroundTruthItem::new("GT_003", "q3", "a3"),
        ];
        let records = vec![record("GT_001", 2), record("GT_002", 2)];

        let report = tokio_test::block_on(evaluate_hit_rate(
            &judge,
            &gt,
            &records,
            "survey",
            Path::new("out/results_k5.json"),
            Path::new("data/gt.json"),
        ))
        .unwrap();

        assert_eq!(report.total_questions, 2);
        assert_eq!(report.hits, 1);
        assert_eq!(report.hit_rate, 0.5);
        assert_eq!(report.k, "5");
        assert_eq!(report.results_file, "out/results_k5.json");
        assert_eq!(report.ground_truth_file, "data/gt.json");

        let summary = report.summary();
        assert_eq!(summary.results_file, "out/results_k5.json");
        assert_eq!(summary.judge_model, "canned");
    }

    #[test]
    fn test_summary_from_report() {
        let report = HitRateReport {
            k: "5".to_string(),
            judge_model: "gpt-4o-mini".to_string(),
            gt_document: "survey".to_string(),
            results_file: "results_k5.json".to_string(),
            ground_truth_file: "gt.json".to_string(),
            total_questions: 4,
            hits: 1,
            hit_rate: 0.25,
            per_question: Vec::new(),
        };
        let summary = report.summary();
        assert_eq!(summary.k, "5");
        assert_eq!(summary.hit_rate_percent, 25.0);
    }
}
