//! Aggregation of judged files into percentages and distributions.

use crate::error::{EvalError, Result};
use crate::persistence::load_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Verdict fields that are aggregated, in report order.
pub const METRICS: [&str; 4] = ["correctness", "hallucination", "source_drift", "correct_chunks"];

/// A judged record, kept schema-free so RAG and baseline files share one path.
pub type JudgedRecord = Map<String, Value>;

#[derive(Deserialize)]
#[serde(untagged)]
enum JudgedFile {
    List(Vec<JudgedRecord>),
    Wrapped { results: Vec<JudgedRecord> },
}

/// Load a judged file in plain-list or `{"results": [...]}` form.
pub fn load_judged(path: &Path) -> Result<Vec<JudgedRecord>> {
    let file: JudgedFile = load_json(path).map_err(|e| match e {
        EvalError::Serialization(msg) => EvalError::Serialization(format!(
            "{} (expected a list of records or an object with 'results')",
            msg
        )),
        other => other,
    })?;

    Ok(match file {
        JudgedFile::List(records) => records,
        JudgedFile::Wrapped { results } => results,
    })
}

/// Value of a 0/1 field; anything missing, null or unrecognised is 0.
pub fn flag(record: &JudgedRecord, key: &str) -> u8 {
    match record.get(key) {
        Some(Value::Number(n)) if n.as_f64() == Some(1.0) => 1,
        Some(Value::Bool(true)) => 1,
        Some(Value::String(s)) if s.trim() == "1" => 1,
        _ => 0,
    }
}

/// Counts for one verdict field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricStats {
    pub metric: String,
    /// Whether any record carries the field. Absent metrics have zero counts.
    pub present: bool,
    pub ones: usize,
    pub zeros: usize,
    pub total: usize,
}

impl MetricStats {
    /// Share of 1s in percent; 0 for an empty file.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.ones as f64 / self.total as f64 * 100.0
        }
    }

    fn report_line(&self) -> String {
        if !self.present {
            return format!("{:<15} n/a", self.metric);
        }
        format!(
            "{:<15} {:>4} / {:<4} ({:.1}%)   zeros: {}",
            self.metric,
            self.ones,
            self.total,
            self.percentage(),
            self.zeros
        )
    }
}

/// Aggregate view of a judged file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgmentSummary {
    pub total: usize,
    /// Records whose judge call failed.
    pub errors: usize,
    pub metrics: Vec<MetricStats>,
    /// Verdict combination (e.g. `correctness=1, hallucination=0`) -> count.
    pub combinations: BTreeMap<String, usize>,
}

impl JudgmentSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricStats> {
        self.metrics.iter().find(|m| m.metric == name)
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Judgment Summary ==========");
        println!("Total records: {}", self.total);
        if self.errors > 0 {
            println!("Judge errors:  {}", self.errors);
        }
        println!("--------------------------------------");
        for m in &self.metrics {
            println!("{}", m.report_line());
        }
        println!("--------------------------------------");
        println!("Verdict combinations:");
        for (combo, count) in &self.combinations {
            println!("  {:>4}  {}", count, combo);
        }
        println!("======================================");
    }
}

fn has_error(record: &JudgedRecord) -> bool {
    matches!(record.get("error"), Some(v) if !v.is_null())
}

/// Metrics present in at least one record. Within a present metric, records
/// lacking the field count as 0.
fn present_metrics(records: &[JudgedRecord]) -> Vec<&'static str> {
    METRICS
        .iter()
        .copied()
        .filter(|m| records.iter().any(|r| r.contains_key(*m)))
        .collect()
}

/// Count 1s and 0s per metric and tally verdict combinations.
///
/// Every metric in [`METRICS`] is reported; those no record carries are
/// marked absent and left out of the combinations.
pub fn summarize(records: &[JudgedRecord]) -> JudgmentSummary {
    let metrics = present_metrics(records);
    let total = records.len();

    let stats = METRICS
        .iter()
        .map(|metric| {
            if !metrics.contains(metric) {
                return MetricStats {
                    metric: metric.to_string(),
                    present: false,
                    ones: 0,
                    zeros: 0,
                    total: 0,
                };
            }
            let ones = records.iter().filter(|r| flag(r, metric) == 1).count();
            MetricStats {
                metric: metric.to_string(),
                present: true,
                ones,
                zeros: total - ones,
                total,
            }
        })
        .collect();

    let mut combinations = BTreeMap::new();
    for record in records {
        let combo = metrics
            .iter()
            .map(|m| format!("{}={}", m, flag(record, m)))
            .collect::<Vec<_>>()
            .join(", ");
        *combinations.entry(combo).or_insert(0) += 1;
    }

    JudgmentSummary {
        total,
        errors: records.iter().filter(|r| has_error(r)).count(),
        metrics: stats,
        combinations,
    }
}

/// A record whose retrieval succeeded but whose answer was judged wrong.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissedAnswer {
    pub question_id: String,
    pub justification: Option<String>,
}

/// Records with `correct_chunks = 1` and `correctness = 0`.
pub fn right_chunks_wrong_answer(records: &[JudgedRecord]) -> Vec<MissedAnswer> {
    records
        .iter()
        .filter(|r| flag(r, "correct_chunks") == 1 && flag(r, "correctness") == 0)
        .map(|r| MissedAnswer {
            question_id: r
                .get("question_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            justification: r
                .get("justification")
                .and_then(|j| j.get("correctness"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::save_json;
    use serde_json::json;
    use tempfile::TempDir;

    fn records(values: Value) -> Vec<JudgedRecord> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_percentage_is_count_over_total() {
        let recs = records(json!([
            {"question_id": "GT_001", "correctness": 1, "hallucination": 0, "source_drift": 0},
            {"question_id": "GT_002", "correctness": 1, "hallucination": 1, "source_drift": 0},
            {"question_id": "GT_003", "correctness": 0, "hallucination": 0, "source_drift": 1},
            {"question_id": "GT_004", "correctness": 1, "hallucination": 0, "source_drift": 0}
        ]));
        let summary = summarize(&recs);

        let correctness = summary.metric("correctness").unwrap();
        assert_eq!(correctness.ones, 3);
        assert_eq!(correctness.zeros, 1);
        assert_eq!(correctness.percentage(), 75.0);
        assert_eq!(summary.metric("hallucination").unwrap().percentage(), 25.0);
        assert!(!summary.metric("correct_chunks").unwrap().present);
        assert_eq!(
            summary.combinations["correctness=1, hallucination=0, source_drift=0"],
            2
        );
    }

    #[test]
    fn test_missing_and_null_count_as_zero() {
        let recs = records(json!([
            {"question_id": "a", "correctness": null, "hallucination": 1, "error": "LlmApiError: boom"},
            {"question_id": "b", "hallucination": 1}
        ]));
        let summary = summarize(&recs);
        let correctness = summary.metric("correctness").unwrap();
        assert_eq!(correctness.ones, 0);
        assert_eq!(correctness.zeros, 2);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_empty_file() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.metrics.len(), METRICS.len());
        assert!(summary.metrics.iter().all(|m| !m.present));
    }

    #[test]
    fn test_absent_metrics_are_reported_as_not_available() {
        let recs = records(json!([
            {"question_id": "GT_001", "correctness": 1, "hallucination": 0, "error": null}
        ]));
        let summary = summarize(&recs);

        let names: Vec<_> = summary.metrics.iter().map(|m| m.metric.as_str()).collect();
        assert_eq!(names, METRICS);
        let drift = summary.metric("source_drift").unwrap();
        assert!(!drift.present);
        assert_eq!(drift.report_line(), format!("{:<15} n/a", "source_drift"));
        assert!(summary.metric("correctness").unwrap().report_line().contains("(100.0%)"));
        assert_eq!(summary.combinations["correctness=1, hallucination=0"], 1);
    }

    #[test]
    fn test_load_wrapped_and_plain() {
        let dir = TempDir::new().unwrap();
        let wrapped = dir.path().join("judged_no_rag.json");
        let plain = dir.path().join("judged_k5.json");
        save_json(
            &json!({
                "run_info": {"run_type": "judge_without_rag"},
                "results": [{"question_id": "x", "correctness": 1}]
            }),
            &wrapped,
        )
        .unwrap();
        save_json(&json!([{"question_id": "y", "correctness": 0}]), &plain).unwrap();

        assert_eq!(load_judged(&wrapped).unwrap()[0]["question_id"], "x");
        assert_eq!(load_judged(&plain).unwrap()[0]["question_id"], "y");
    }

    #[test]
    fn test_load_rejects_other_shapes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        save_json(&json!({"items": []}), &path).unwrap();
        assert!(matches!(load_judged(&path), Err(EvalError::Serialization(_))));
    }

    #[test]
    fn test_right_chunks_wrong_answer() {
        let recs = records(json!([
            {"question_id": "GT_001", "correctness": 0, "correct_chunks": 1,
             "justification": {"correctness": "Wrong year."}},
            {"question_id": "GT_002", "correctness": 1, "correct_chunks": 1},
            {"question_id": "GT_003", "correctness": 0, "correct_chunks": 0}
        ]));
        let missed = right_chunks_wrong_answer(&recs);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].question_id, "GT_001");
        assert_eq!(missed[0].justification.as_deref(), Some("Wrong year."));
    }
}
