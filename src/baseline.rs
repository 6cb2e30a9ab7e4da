//! Answering without retrieval.
//!
//! The whole document is placed in the prompt with `[PAGE n]` markers and the
//! model is asked to cite pages. Cited pages are recovered from the reply.

use crate::document::Document;
use crate::error::Result;
use crate::eval::dataset::{AnswerRecord, GroundTruthItem, PageRef, RetrievedChunk};
use crate::llm::{LlmClient, Prompts};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::info;

/// Source name recorded on the baseline's pseudo-chunk.
pub const BASELINE_SOURCE: &str = "GT.pdf";

/// Page placeholder when the reply cites no page.
pub const UNCITED_PAGE: &str = "model-cited";

static PAGES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Pages:\s*([0-9,\s]+)").expect("valid pages-line pattern")
});

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[PAGE\s+(\d+)\]").expect("valid page-marker pattern"));

/// Pages cited in a reply.
///
/// An explicit `Pages: 3, 5` line wins. Otherwise every `[PAGE n]` marker is
/// collected, deduplicated and sorted numerically. `None` when neither is
/// present.
pub fn extract_cited_pages(answer: &str) -> Option<String> {
    if let Some(caps) = PAGES_LINE.captures(answer) {
        let listed = caps[1].trim().trim_end_matches(',').trim();
        if !listed.is_empty() {
            return Some(listed.to_string());
        }
    }

    let pages: BTreeSet<u32> = PAGE_MARKER
        .captures_iter(answer)
        .filter_map(|caps| caps[1].parse().ok())
        .collect();

    if pages.is_empty() {
        return None;
    }

    Some(
        pages
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Answers questions from a full document in the prompt.
pub struct DocumentBaseline {
    llm: LlmClient,
    document_text: String,
}

impl DocumentBaseline {
    pub fn new(llm: LlmClient, document: &Document) -> Self {
        Self {
            llm,
            document_text: document.content_with_markers(),
        }
    }

    /// Render the prompt for one question.
    pub fn prompt(&self, question: &str) -> String {
        Prompts::fill(
            Prompts::document_answer(),
            &[("question", question), ("document", &self.document_text)],
        )
    }

    /// Answer one question; the record carries a single pseudo-chunk with the cited pages.
    pub async fn answer(&self, item: &GroundTruthItem) -> Result<AnswerRecord> {
        let generated_answer = self.llm.complete(None, &self.prompt(&item.question)).await?;
        let pages =
            extract_cited_pages(&generated_answer).unwrap_or_else(|| UNCITED_PAGE.to_string());

        Ok(AnswerRecord {
            question_id: item.question_id.clone(),
            question: item.question.clone(),
            expected_answer: item.expected_answer.clone(),
            generated_answer,
            retrieved_chunks: vec![RetrievedChunk {
                page: Some(PageRef::Text(pages)),
                source: Some(BASELINE_SOURCE.to_string()),
                text: None,
            }],
        })
    }

    /// Answer every question in order.
    pub async fn answer_all(&self, items: &[GroundTruthItem]) -> Result<Vec<AnswerRecord>> {
        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            records.push(self.answer(item).await?);
            info!(
                question_id = %item.question_id,
                "[{}/{}] answered without retrieval",
                idx + 1,
                items.len()
            );
        }
        Ok(records)
    }
}

/// Ask the model directly, with neither retrieval nor a document.
pub async fn ask_plain(llm: &LlmClient, question: &str) -> Result<String> {
    llm.complete(Some(Prompts::plain_assistant()), question).await
}
