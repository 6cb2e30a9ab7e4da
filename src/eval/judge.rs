//! LLM-as-judge scoring of generated answers.

use super::dataset::{AnswerRecord, GroundTruthItem, RetrievedChunk, join_on_question_id};
use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use crate::llm::{LlmClient, Prompts, extract_json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Which RAG judge prompt to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeVariant {
    /// Correctness, hallucination and source drift.
    #[default]
    Standard,
    /// Also scores whether the retrieved chunks held the answer.
    WithChunks,
}

impl JudgeVariant {
    fn prompt(self) -> &'static str {
        match self {
            JudgeVariant::Standard => Prompts::judge_rag(),
            JudgeVariant::WithChunks => Prompts::judge_rag_with_chunks(),
        }
    }
}

/// Judged RAG answer. Verdicts are 0 or 1; `None` only when judging failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagVerdict {
    pub question_id: String,
    pub correctness: Option<u8>,
    pub hallucination: Option<u8>,
    pub source_drift: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_chunks: Option<u8>,
    #[serde(default)]
    pub justification: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagVerdict {
    fn failed(question_id: &str, err: &EvalError) -> Self {
        Self {
            question_id: question_id.to_string(),
            correctness: None,
            hallucination: None,
            source_drift: None,
            correct_chunks: None,
            justification: Value::Null,
            error: Some(err.to_record_string()),
        }
    }
}

/// Judged answer of the no-retrieval baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoRagVerdict {
    pub question_id: String,
    pub question: String,
    pub expected_answer: String,
    pub generated_answer: String,
    pub correctness: Option<u8>,
    pub hallucination: Option<u8>,
    pub justification: Value,
    pub error: Option<String>,
    pub judge_model: String,
}

/// Provenance of a baseline judging run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunInfo {
    pub run_type: String,
    pub judge_model: String,
    pub ground_truth_file: String,
    pub baseline_file: String,
}

/// Output file of a baseline judging run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoRagReport {
    pub run_info: RunInfo,
    pub results: Vec<NoRagVerdict>,
}

/// Read a 0/1 verdict from whatever the model produced: a number, a numeric
/// string or a boolean.
fn parse_flag(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Some(0),
            Some(f) if f == 1.0 => Some(1),
            _ => None,
        },
        Value::Bool(b) => Some(u8::from(*b)),
        Value::String(s) => match s.trim() {
            "0" => Some(0),
            "1" => Some(1),
            _ => None,
        },
        _ => None,
    }
}

fn required_flag(raw: &serde_json::Map<String, Value>, key: &str, response: &str) -> Result<u8> {
    raw.get(key).and_then(parse_flag).ok_or_else(|| {
        EvalError::LlmParse(format!(
            "Missing or invalid '{}' in judge response: {}",
            key, response
        ))
    })
}

fn parse_object(response: &str) -> Result<serde_json::Map<String, Value>> {
    let json_str = extract_json(response);
    let value: Value = serde_json::from_str(&json_str).map_err(|e| {
        EvalError::LlmParse(format!(
            "Failed to parse judge response: {}. Response: {}",
            e, response
        ))
    })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(EvalError::LlmParse(format!(
            "Judge response is not a JSON object: {}",
            response
        ))),
    }
}

/// LLM-as-judge for answers and retrieved chunks.
pub struct LlmJudge {
    client: LlmClient,
    variant: JudgeVariant,
}

impl LlmJudge {
    /// Create a new judge with the given LLM client.
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            variant: JudgeVariant::default(),
        }
    }

    /// Create from LLM config.
    pub fn from_config(config: LlmConfig) -> Self {
        Self::new(LlmClient::new(config))
    }

    pub fn with_variant(mut self, variant: JudgeVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Render the RAG judge prompt for one answer.
    pub fn rag_prompt(&self, item: &GroundTruthItem, record: &AnswerRecord) -> Result<String> {
        let chunks = serde_json::to_string_pretty(&record.retrieved_chunks)
            .map_err(|e| EvalError::Serialization(e.to_string()))?;

        Ok(Prompts::fill(
            self.variant.prompt(),
            &[
                ("question", &item.question),
                ("expected_answer", &item.expected_answer),
                ("generated_answer", &record.generated_answer),
                ("retrieved_chunks", &chunks),
            ],
        ))
    }

    /// Judge one RAG answer.
    pub async fn judge_rag(
        &self,
        item: &GroundTruthItem,
        record: &AnswerRecord,
    ) -> Result<RagVerdict> {
        let prompt = self.rag_prompt(item, record)?;
        let response = self.client.complete(None, &prompt).await?;
        Self::parse_rag_verdict(&item.question_id, &response, self.variant)
    }

    fn parse_rag_verdict(
        question_id: &str,
        response: &str,
        variant: JudgeVariant,
    ) -> Result<RagVerdict> {
        let raw = parse_object(response)?;

        let correct_chunks = match variant {
            JudgeVariant::Standard => raw.get("correct_chunks").and_then(parse_flag),
            JudgeVariant::WithChunks => Some(required_flag(&raw, "correct_chunks", response)?),
        };

        Ok(RagVerdict {
            question_id: question_id.to_string(),
            correctness: Some(required_flag(&raw, "correctness", response)?),
            hallucination: Some(required_flag(&raw, "hallucination", response)?),
            source_drift: Some(required_flag(&raw, "source_drift", response)?),
            correct_chunks,
            justification: raw.get("justification").cloned().unwrap_or(Value::Null),
            error: None,
        })
    }

    /// Judge every ground-truth item that has a record, in ground-truth order.
    ///
    /// Items without a record are skipped with a warning. A failing call aborts
    /// the run unless `keep_going` is set, in which case the error is recorded.
    pub async fn judge_rag_run(
        &self,
        ground_truth: &[GroundTruthItem],
        records: &[AnswerRecord],
        keep_going: bool,
    ) -> Result<Vec<RagVerdict>> {
        let (pairs, missing) = join_on_question_id(ground_truth, records);
        for id in &missing {
            warn!(question_id = %id, "question not found in results, skipping");
        }

        let mut verdicts = Vec::with_capacity(pairs.len());
        for (idx, (item, record)) in pairs.iter().enumerate() {
            let verdict = match self.judge_rag(item, record).await {
                Ok(verdict) => verdict,
                Err(e) if keep_going => {
                    warn!(question_id = %item.question_id, error = %e, "judge call failed");
                    RagVerdict::failed(&item.question_id, &e)
                }
                Err(e) => return Err(e),
            };
            info!(
                question_id = %item.question_id,
                correctness = ?verdict.correctness,
                "[{}/{}] judged",
                idx + 1,
                pairs.len()
            );
            verdicts.push(verdict);
        }

        Ok(verdicts)
    }

    /// Judge one baseline answer. Failures are recorded on the verdict.
    pub async fn judge_no_rag(
        &self,
        item: &GroundTruthItem,
        record: &AnswerRecord,
    ) -> NoRagVerdict {
        let generated_answer = record.generated_answer.trim().to_string();
        let mut verdict = NoRagVerdict {
            question_id: item.question_id.clone(),
            question: item.question.clone(),
            expected_answer: item.expected_answer.clone(),
            generated_answer: generated_answer.clone(),
            correctness: None,
            hallucination: None,
            justification: Value::Null,
            error: None,
            judge_model: self.client.model().to_string(),
        };

        let prompt = Prompts::fill(
            Prompts::judge_no_rag(),
            &[
                ("question", &item.question),
                ("expected_answer", &item.expected_answer),
                ("generated_answer", &generated_answer),
            ],
        );

        let outcome = match self.client.complete(None, &prompt).await {
            Ok(response) => parse_object(&response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(raw) => {
                verdict.correctness = raw.get("correctness").and_then(parse_flag);
                verdict.hallucination = raw.get("hallucination").and_then(parse_flag);
                verdict.justification = raw.get("justification").cloned().unwrap_or(Value::Null);
            }
            Err(e) => verdict.error = Some(e.to_record_string()),
        }

        verdict
    }

    /// Judge every baseline answer that has a ground-truth item.
    pub async fn judge_no_rag_run(
        &self,
        ground_truth: &[GroundTruthItem],
        records: &[AnswerRecord],
        ground_truth_file: &str,
        baseline_file: &str,
    ) -> NoRagReport {
        let (pairs, missing) = join_on_question_id(ground_truth, records);
        for id in &missing {
            warn!(question_id = %id, "question not found in baseline results, skipping");
        }

        let mut results = Vec::with_capacity(pairs.len());
        for (item, record) in pairs {
            let verdict = self.judge_no_rag(item, record).await;
            info!(
                question_id = %verdict.question_id,
                status = if verdict.error.is_none() { "OK" } else { "ERROR" },
                "baseline judged"
            );
            results.push(verdict);
        }

        NoRagReport {
            run_info: RunInfo {
                run_type: "judge_without_rag".to_string(),
                judge_model: self.client.model().to_string(),
                ground_truth_file: ground_truth_file.to_string(),
                baseline_file: baseline_file.to_string(),
            },
            results,
        }
    }

    /// Render the YES/NO relevance prompt for one retrieved chunk.
    pub fn relevance_prompt(
        item: &GroundTruthItem,
        chunk: &RetrievedChunk,
        gt_document: &str,
    ) -> String {
        let page = chunk
            .page
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let correct_pages = item.correct_pages();

        Prompts::fill(
            Prompts::chunk_relevance(),
            &[
                ("question", &item.question),
                ("expected_answer", &item.expected_answer),
                ("gt_document", gt_document),
                ("correct_pages", &correct_pages),
                ("source", chunk.source.as_deref().unwrap_or("unknown")),
                ("page", &page),
                ("chunk_text", chunk.text_or_empty()),
            ],
        )
    }

    /// Ask whether one chunk is relevant. Only a YES reply counts.
    pub async fn chunk_is_relevant(
        &self,
        item: &GroundTruthItem,
        chunk: &RetrievedChunk,
        gt_document: &str,
    ) -> Result<bool> {
        let prompt = Self::relevance_prompt(item, chunk, gt_document);
        let reply = self.client.complete_with_limit(None, &prompt, 5).await?;
        Ok(is_yes(&reply))
    }
}

/// A YES reply, ignoring case, whitespace and a trailing period.
fn is_yes(reply: &str) -> bool {
    reply.trim().trim_end_matches('.').eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::dataset::{PageRef, SourceRef};
    use serde_json::json;

    #[test]
    fn test_parse_rag_verdict() {
        let response = r#"```json
{"correctness": 1, "hallucination": 0, "source_drift": 0,
 "justification": {"correctness": "matches", "hallucination": "supported", "source_drift": "GT only"}}
```"#;
        let verdict =
            LlmJudge::parse_rag_verdict("GT_001", response, JudgeVariant::Standard).unwrap();
        assert_eq!(verdict.correctness, Some(1));
        assert_eq!(verdict.hallucination, Some(0));
        assert_eq!(verdict.source_drift, Some(0));
        assert_eq!(verdict.correct_chunks, None);
        assert_eq!(verdict.justification["correctness"], "matches");
    }

    #[test]
    fn test_parse_rag_verdict_with_chunks() {
        let response = r#"{"correctness": "0", "hallucination": true, "source_drift": 0, "correct_chunks": 1, "justification": {}}"#;
        let verdict =
            LlmJudge::parse_rag_verdict("GT_002", response, JudgeVariant::WithChunks).unwrap();
        assert_eq!(verdict.correctness, Some(0));
        assert_eq!(verdict.hallucination, Some(1));
        assert_eq!(verdict.correct_chunks, Some(1));
    }

    #[test]
    fn test_with_chunks_requires_field() {
        let response = r#"{"correctness": 1, "hallucination": 0, "source_drift": 0}"#;
        assert!(LlmJudge::parse_rag_verdict("GT_003", response, JudgeVariant::WithChunks).is_err());
    }

    #[test]
    fn test_missing_verdict_is_error() {
        let response = r#"{"correctness": 1, "hallucination": 0}"#;
        let err =
            LlmJudge::parse_rag_verdict("GT_004", response, JudgeVariant::Standard).unwrap_err();
        assert!(err.to_string().contains("source_drift"));
    }

    #[test]
    fn test_out_of_range_flag_rejected() {
        assert_eq!(parse_flag(&json!(2)), None);
        assert_eq!(parse_flag(&json!("yes")), None);
        assert_eq!(parse_flag(&json!(1.0)), Some(1));
        assert_eq!(parse_flag(&json!(false)), Some(0));
    }

    #[test]
    fn test_failed_verdict_serialization() {
        let err = EvalError::LlmApi("timeout".to_string());
        let verdict = RagVerdict::failed("GT_009", &err);
        let json = serde_json::to_value(&verdict).unwrap();
        assert!(json["correctness"].is_null());
        assert!(json.get("correct_chunks").is_none());
        assert_eq!(json["error"], "LlmApiError: LLM API error: timeout");
    }

    #[test]
    fn test_rag_prompt_includes_chunks_json() {
        let judge = LlmJudge::from_config(LlmConfig::default());
        let item = GroundTruthItem::new("GT_001", "Which mode?", "Car");
        let record = AnswerRecord {
            question_id: "GT_001".to_string(),
            question: "Which mode?".to_string(),
            expected_answer: "Car".to_string(),
            generated_answer: "The car.".to_string(),
            retrieved_chunks: vec![RetrievedChunk {
                page: Some(PageRef::Number(7)),
                source: Some("survey".to_string()),
                text: Some("Car is the most common mode.".to_string()),
            }],
        };
        let prompt = judge.rag_prompt(&item, &record).unwrap();
        assert!(prompt.contains("\"page\": 7"));
        assert!(prompt.contains("The car."));
        assert!(!prompt.contains("{retrieved_chunks}"));
    }

    #[test]
    fn test_relevance_prompt() {
        let mut item = GroundTruthItem::new("GT_001", "Share of car trips?", "49 percent");
        item.source = Some(SourceRef {
            document: "survey.pdf".to_string(),
            pages: vec![PageRef::Number(3)],
        });
        let chunk = RetrievedChunk {
            page: Some(PageRef::Number(3)),
            source: Some("survey".to_string()),
            text: Some("49 percent of trips are by car".to_string()),
        };
        let prompt = LlmJudge::relevance_prompt(&item, &chunk, "survey");
        assert!(prompt.contains("Correct page(s): 3"));
        assert!(prompt.contains("- Source Document: survey"));
        assert!(prompt.contains("- Text: 49 percent of trips are by car"));
    }

    #[test]
    fn test_runs_skip_questions_without_records() {
        let judge = LlmJudge::from_config(LlmConfig::default());
        let gt = vec![GroundTruthItem::new("GT_001", "q", "a")];

        let verdicts = tokio_test::block_on(judge.judge_rag_run(&gt, &[], false)).unwrap();
        assert!(verdicts.is_empty());

        let report =
            tokio_test::block_on(judge.judge_no_rag_run(&gt, &[], "gt.json", "baseline.json"));
        assert!(report.results.is_empty());
        assert_eq!(report.run_info.run_type, "judge_without_rag");
        assert_eq!(report.run_info.baseline_file, "baseline.json");
    }

    /// A judge whose endpoint refuses every connection.
    fn unreachable_judge() -> LlmJudge {
        LlmJudge::from_config(LlmConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
    }

    fn answered(id: &str) -> AnswerRecord {
        AnswerRecord {
            question_id: id.to_string(),
            question: "Which mode?".to_string(),
            expected_answer: "Car".to_string(),
            generated_answer: " The car. ".to_string(),
            retrieved_chunks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_rag_run_aborts_on_failure() {
        let judge = unreachable_judge();
        let gt = vec![GroundTruthItem::new("GT_001", "Which mode?", "Car")];

        let err = judge.judge_rag_run(&gt, &[answered("GT_001")], false).await.unwrap_err();
        assert_eq!(err.kind(), "HttpError");
    }

    #[tokio::test]
    async fn test_rag_run_keep_going_records_error() {
        let judge = unreachable_judge();
        let gt = vec![
            GroundTruthItem::new("GT_001", "Which mode?", "Car"),
            GroundTruthItem::new("GT_002", "Which year?", "2017"),
        ];
        let records = vec![answered("GT_001"), answered("GT_002")];

        let verdicts = judge.judge_rag_run(&gt, &records, true).await.unwrap();
        assert_eq!(verdicts.len(), 2);
        for verdict in &verdicts {
            assert!(verdict.error.as_deref().unwrap().starts_with("HttpError: "));
            assert_eq!(verdict.correctness, None);
            assert_eq!(verdict.hallucination, None);
            assert_eq!(verdict.source_drift, None);
        }
        assert_eq!(verdicts[1].question_id, "GT_002");
    }

    #[tokio::test]
    async fn test_no_rag_run_records_error_per_item() {
        let judge = unreachable_judge();
        let gt = vec![GroundTruthItem::new("GT_001", "Which mode?", "Car")];

        let report = judge
            .judge_no_rag_run(&gt, &[answered("GT_001")], "gt.json", "baseline.json")
            .await;
        assert_eq!(report.results.len(), 1);
        let verdict = &report.results[0];
        assert!(verdict.error.as_deref().unwrap().starts_with("HttpError: "));
        assert_eq!(verdict.correctness, None);
        assert_eq!(verdict.hallucination, None);
        assert_eq!(verdict.generated_answer, "The car.");
        assert_eq!(report.run_info.judge_model, "gpt-4o-mini");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("YES"));
        assert!(is_yes(" yes.\n"));
        assert!(!is_yes("NO"));
        assert!(!is_yes("YES, because"));
    }
}
