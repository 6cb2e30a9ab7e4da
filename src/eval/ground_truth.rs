//! Ground-truth generation from an ingested collection.

use super::dataset::{GroundTruthItem, PageRef, SourceRef, SupportingChunk};
use crate::error::{EvalError, Result};
use crate::llm::{LlmClient, Prompts, extract_json};
use crate::store::{QdrantStore, StoredPoint};
use serde::Deserialize;
use tracing::info;

/// Points fetched per scroll request while collecting chunks.
const SCROLL_PAGE_SIZE: usize = 256;

#[derive(Deserialize)]
struct GeneratedPair {
    question: String,
    expected_answer: String,
}

/// Pick `n` items spread evenly: every `max(len / n, 1)`-th item, first `n`.
///
/// Fails when fewer than `n` items are available.
pub fn stride_sample<T>(items: &[T], n: usize) -> Result<Vec<&T>> {
    if items.len() < n {
        return Err(EvalError::InsufficientData(format!(
            "{} chunks available, {} questions requested",
            items.len(),
            n
        )));
    }

    let step = (items.len() / n.max(1)).max(1);
    Ok(items.iter().step_by(step).take(n).collect())
}

/// Question id for the 1-based position `i`.
pub fn question_id(i: usize) -> String {
    format!("GT_{:03}", i)
}

fn parse_pair(response: &str) -> Result<GeneratedPair> {
    let json_str = extract_json(response);
    serde_json::from_str(&json_str).map_err(|e| {
        EvalError::LlmParse(format!(
            "Failed to parse question/answer pair: {}. Response: {}",
            e, response
        ))
    })
}

/// Build one ground-truth item from a sampled chunk and the model's reply.
fn build_item(
    index: usize,
    point: &StoredPoint,
    document: &str,
    response: &str,
) -> Result<GroundTruthItem> {
    let pair = parse_pair(response)?;
    let page = point.page().as_ref().and_then(PageRef::from_value);

    Ok(GroundTruthItem {
        question_id: question_id(index),
        question: pair.question,
        expected_answer: pair.expected_answer,
        source: Some(SourceRef {
            document: document.to_string(),
            pages: page.iter().cloned().collect(),
        }),
        supporting_chunk: Some(SupportingChunk {
            page,
            text: point.text().unwrap_or_default().to_string(),
        }),
    })
}

/// Writes ground-truth questions from chunks already in the vector store.
pub struct GroundTruthGenerator {
    llm: LlmClient,
    store: QdrantStore,
}

impl GroundTruthGenerator {
    pub fn new(llm: LlmClient, store: QdrantStore) -> Self {
        Self { llm, store }
    }

    /// Sample `n` chunks of `collection` and ask for one question per chunk.
    /// `document` is recorded as the source document of every item.
    pub async fn generate(
        &self,
        collection: &str,
        document: &str,
        n: usize,
    ) -> Result<Vec<GroundTruthItem>> {
        let points = self.store.scroll_all(collection, SCROLL_PAGE_SIZE).await?;
        info!(collection, chunks = points.len(), "fetched chunks for sampling");

        let sampled = stride_sample(&points, n)?;
        let mut items = Vec::with_capacity(sampled.len());

        for (i, point) in sampled.into_iter().enumerate() {
            let prompt = Prompts::fill(
                Prompts::ground_truth_pair(),
                &[("chunk", point.text().unwrap_or_default())],
            );
            let response = self.llm.complete(None, &prompt).await?;
            let item = build_item(i + 1, point, document, &response)?;
            info!(question_id = %item.question_id, "generated ground-truth question");
            items.push(item);
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PointId;
    use serde_json::json;

    #[test]
    fn test_stride_sample() {
        let items: Vec<usize> = (0..10).collect();
        let sampled = stride_sample(&items, 3).unwrap();
        assert_eq!(sampled, vec![&0, &3, &6]);
    }

    #[test]
    fn test_stride_sample_exact_and_short() {
        let items = [1, 2, 3];
        assert_eq!(stride_sample(&items, 3).unwrap().len(), 3);
        assert!(matches!(
            stride_sample(&items, 4),
            Err(EvalError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_question_id_format() {
        assert_eq!(question_id(1), "GT_001");
        assert_eq!(question_id(42), "GT_042");
        assert_eq!(question_id(1000), "GT_1000");
    }

    #[test]
    fn test_build_item() {
        let point = StoredPoint {
            id: PointId::Num(3),
            score: None,
            payload: json!({"text": "49 percent of trips are by car.", "page_no": 3})
                .as_object()
                .cloned(),
        };
        let response = "```json\n{\"question\": \"Share of car trips?\", \"expected_answer\": \"49 percent\"}\n```";

        let item = build_item(1, &point, "survey.pdf", response).unwrap();
        assert_eq!(item.question_id, "GT_001");
        assert_eq!(item.expected_answer, "49 percent");
        assert_eq!(item.correct_pages(), "3");
        assert_eq!(
            item.supporting_chunk.unwrap().text,
            "49 percent of trips are by car."
        );
    }

    #[test]
    fn test_build_item_rejects_incomplete_pair() {
        let point = StoredPoint {
            id: PointId::Num(1),
            score: None,
            payload: None,
        };
        assert!(build_item(1, &point, "doc.pdf", r#"{"question": "q"}"#).is_err());
    }
}
