//! Ground-truth questions and generated-answer records.
//!
//! Both file kinds are JSON lists joined on `question_id`.

use crate::error::{EvalError, Result};
use crate::persistence::load_json;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Where the answer to a ground-truth question lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Ground-truth document name.
    pub document: String,
    /// Pages that contain the answer.
    #[serde(default)]
    pub pages: Vec<PageRef>,
}

/// The chunk a ground-truth question was written from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupportingChunk {
    pub page: Option<PageRef>,
    pub text: String,
}

/// One ground-truth question with its expected answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundTruthItem {
    pub question_id: String,
    pub question: String,
    pub expected_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supporting_chunk: Option<SupportingChunk>,
}

impl GroundTruthItem {
    pub fn new(
        question_id: impl Into<String>,
        question: impl Into<String>,
        expected_answer: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question: question.into(),
            expected_answer: expected_answer.into(),
            source: None,
            supporting_chunk: None,
        }
    }

    /// Pages that hold the answer, comma-joined, or "unknown".
    pub fn correct_pages(&self) -> String {
        match &self.source {
            Some(source) if !source.pages.is_empty() => source
                .pages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => "unknown".to_string(),
        }
    }
}

/// A page reference as found in the data files: a page number, or free text
/// such as `"3, 5"` or `"model-cited"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PageRef {
    Number(i64),
    Text(String),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{}", n),
            PageRef::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<usize> for PageRef {
    fn from(page: usize) -> Self {
        PageRef::Number(page as i64)
    }
}

impl PageRef {
    /// Convert a JSON payload value from the vector store.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(PageRef::Number),
            serde_json::Value::String(s) => Some(PageRef::Text(s.clone())),
            _ => None,
        }
    }
}

/// A chunk shown to the generator, as recorded in a results file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub page: Option<PageRef>,
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RetrievedChunk {
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First 100 characters of the text, with "..." when truncated.
    pub fn preview(&self) -> String {
        let text = self.text_or_empty();
        if text.chars().count() > 100 {
            format!("{}...", text.chars().take(100).collect::<String>())
        } else {
            text.to_string()
        }
    }
}

/// One generated answer with the chunks it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub question: String,
    pub expected_answer: String,
    pub generated_answer: String,
    #[serde(default)]
    pub retrieved_chunks: Vec<RetrievedChunk>,
}

/// Load a ground-truth file, rejecting duplicate question ids.
pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruthItem>> {
    let items: Vec<GroundTruthItem> = load_json(path)?;
    ensure_unique_ids(items.iter().map(|i| i.question_id.as_str()), path)?;
    Ok(items)
}

/// Load a results file, rejecting duplicate question ids.
pub fn load_answers(path: &Path) -> Result<Vec<AnswerRecord>> {
    let records: Vec<AnswerRecord> = load_json(path)?;
    ensure_unique_ids(records.iter().map(|r| r.question_id.as_str()), path)?;
    Ok(records)
}

/// Fail on the first id that occurs twice.
pub fn ensure_unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>, path: &Path) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(EvalError::DuplicateQuestionId {
                id: id.to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Index records by question id. Ids are unique once loaded through
/// [`load_answers`].
pub fn index_by_question_id(records: &[AnswerRecord]) -> HashMap<&str, &AnswerRecord> {
    records
        .iter()
        .map(|r| (r.question_id.as_str(), r))
        .collect()
}

/// Pair each ground-truth item with its record, in ground-truth order.
/// Items without a record are returned separately.
pub fn join_on_question_id<'a>(
    ground_truth: &'a [GroundTruthItem],
    records: &'a [AnswerRecord],
) -> (Vec<(&'a GroundTruthItem, &'a AnswerRecord)>, Vec<&'a str>) {
    let index = index_by_question_id(records);
    let mut pairs = Vec::new();
    let mut missing = Vec::new();

    for item in ground_truth {
        match index.get(item.question_id.as_str()) {
            Some(record) => pairs.push((item, *record)),
            None => missing.push(item.question_id.as_str()),
        }
    }

    (pairs, missing)
}

/// Keep the first `n` items (for quick runs).
pub fn take_items(items: Vec<GroundTruthItem>, max: Option<usize>) -> Vec<GroundTruthItem> {
    match max {
        Some(n) => items.into_iter().take(n).collect(),
        None => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::save_json;
    use tempfile::TempDir;

    fn record(id: &str) -> AnswerRecord {
        AnswerRecord {
            question_id: id.to_string(),
            question: "q".to_string(),
            expected_answer: "e".to_string(),
            generated_answer: "g".to_string(),
            retrieved_chunks: Vec::new(),
        }
    }

    #[test]
    fn test_parse_ground_truth_file_shape() {
        let json = r#"[{
            "question_id": "GT_001",
            "question": "Which mode dominates?",
            "expected_answer": "Car",
            "source": {"document": "survey.pdf", "pages": [12]},
            "supporting_chunk": {"page": 12, "text": "Car trips dominate."}
        }]"#;
        let items: Vec<GroundTruthItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0].correct_pages(), "12");
        assert_eq!(
            items[0].supporting_chunk.as_ref().unwrap().page,
            Some(PageRef::Number(12))
        );
    }

    #[test]
    fn test_minimal_ground_truth() {
        let json = r#"[{"question_id": "Q1", "question": "q", "expected_answer": "a"}]"#;
        let items: Vec<GroundTruthItem> = serde_json::from_str(json).unwrap();
        assert!(items[0].source.is_none());
        assert_eq!(items[0].correct_pages(), "unknown");
    }

    #[test]
    fn test_page_ref_forms() {
        let chunks: Vec<RetrievedChunk> = serde_json::from_str(
            r#"[{"page": 3, "source": "s", "text": "t"},
                {"page": "3, 5", "source": "GT.pdf"},
                {"page": null, "source": null, "text": "x"}]"#,
        )
        .unwrap();
        assert_eq!(chunks[0].page, Some(PageRef::Number(3)));
        assert_eq!(chunks[1].page, Some(PageRef::Text("3, 5".to_string())));
        assert!(chunks[1].text.is_none());
        assert!(chunks[2].page.is_none());
    }

    #[test]
    fn test_preview_truncates() {
        let chunk = RetrievedChunk {
            page: None,
            source: None,
            text: Some("x".repeat(150)),
        };
        let preview = chunk.preview();
        assert_eq!(preview.len(), 103);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        save_json(&vec![record("GT_001"), record("GT_002"), record("GT_001")], &path).unwrap();

        match load_answers(&path) {
            Err(EvalError::DuplicateQuestionId { id, .. }) => assert_eq!(id, "GT_001"),
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_join_reports_missing() {
        let gt = vec![
            GroundTruthItem::new("GT_001", "q1", "a1"),
            GroundTruthItem::new("GT_002", "q2", "a2"),
            GroundTruthItem::new("GT_003", "q3", "a3"),
        ];
        let records = vec![record("GT_003"), record("GT_001")];

        let (pairs, missing) = join_on_question_id(&gt, &records);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.question_id, "GT_001");
        assert_eq!(pairs[1].1.question_id, "GT_003");
        assert_eq!(missing, vec!["GT_002"]);
    }

    #[test]
    fn test_take_items() {
        let gt = vec![
            GroundTruthItem::new("a", "q", "e"),
            GroundTruthItem::new("b", "q", "e"),
        ];
        assert_eq!(take_items(gt.clone(), Some(1)).len(), 1);
        assert_eq!(take_items(gt, None).len(), 2);
    }
}
