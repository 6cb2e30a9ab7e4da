//! LLM prompts for answering, judging and ground-truth generation.
//!
//! Templates use `{name}` placeholders that are filled with [`Prompts::fill`].
//! Literal JSON braces in the templates are left untouched.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder pattern"));

/// Collection of prompts used across the evaluation stages.
pub struct Prompts;

impl Prompts {
    /// Replace each `{key}` in `template` with its value in a single pass.
    ///
    /// Inserted values are never scanned again, and placeholders without a
    /// value are kept as written.
    pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                values
                    .iter()
                    .find(|(key, _)| *key == &caps[1])
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// System prompt for rewriting a question into a search query.
    pub fn query_rewriter() -> &'static str {
        "Rewrite the user query into a concise standalone search query. Do not answer."
    }

    /// System prompt for plain answering without any document.
    pub fn plain_assistant() -> &'static str {
        "You are a helpful assistant that can answer questions and help with tasks."
    }

    /// User part of the RAG prompt.
    pub fn rag_question() -> &'static str {
        "User question: {question}\n"
    }

    /// Retrieval part of the RAG prompt; `{chunks}` holds one chunk text per line.
    pub fn rag_context() -> &'static str {
        "Retrieved content:\n{chunks}"
    }

    /// Prompt for the no-retrieval baseline over a whole document.
    pub fn document_answer() -> &'static str {
        r#"You are an assistant that answers questions strictly based on the provided document.

Rules:
- Use only the document.
- Cite the page number(s) where the answer is found.
- If the answer is not stated, reply exactly:
"Not stated in the document."

Question:
{question}

Answer format:
Answer: <answer text>
Pages: <page numbers>

Document:
{document}"#
    }

    /// Judge prompt for RAG answers: correctness, hallucination and source drift.
    pub fn judge_rag() -> &'static str {
        r#"You are an evaluation judge for a Retrieval-Augmented Generation (RAG) system.
Evaluate the model answer on THREE dimensions using ONLY the provided information.
Do NOT use outside knowledge.

Definitions:

Correctness:
- 1 if the model answer matches the expected ground-truth answer in both meaning and key details.
- 0 otherwise.

Hallucination:
- 1 if the model answer contains ANY factual claim not supported by the retrieved chunks.
- 0 if EVERY factual claim in the model answer is supported by at least one retrieved chunk.

Source Drift:
- 1 if the answer cites or relies on a document that is NOT the ground-truth source document.
- 0 if the answer is grounded in the ground-truth source document.

Question:
{question}

Expected ground-truth answer:
{expected_answer}

Model answer:
{generated_answer}

Retrieved chunks:
{retrieved_chunks}

Return STRICTLY in JSON:
{
  "correctness": 0 | 1,
  "hallucination": 0 | 1,
  "source_drift": 0 | 1,
  "justification": {
    "correctness": "...",
    "hallucination": "...",
    "source_drift": "..."
  }
}"#
    }

    /// Judge prompt for RAG answers that also scores the retrieved chunks.
    pub fn judge_rag_with_chunks() -> &'static str {
        r#"You are an evaluation judge for a Retrieval-Augmented Generation (RAG) system.
Evaluate the model answer on FOUR dimensions using ONLY the provided information.
Do NOT use outside knowledge.

Definitions:

Correctness:
- 1 if the model answer matches the expected ground-truth answer in both meaning and key details.
- 0 otherwise.

Hallucination:
- 1 if the model answer contains ANY factual claim not supported by the retrieved chunks.
- 0 if EVERY factual claim in the model answer is supported by at least one retrieved chunk.

Source Drift:
- 1 if the answer cites or relies on a document that is NOT the ground-truth source document.
- 0 if the answer is grounded in the ground-truth source document.

Correct Chunks:
- 1 if at least one retrieved chunk contains the information needed to give the expected answer.
- 0 otherwise.

Question:
{question}

Expected ground-truth answer:
{expected_answer}

Model answer:
{generated_answer}

Retrieved chunks:
{retrieved_chunks}

Return STRICTLY in JSON:
{
  "correctness": 0 | 1,
  "hallucination": 0 | 1,
  "source_drift": 0 | 1,
  "correct_chunks": 0 | 1,
  "justification": {
    "correctness": "...",
    "hallucination": "...",
    "source_drift": "...",
    "correct_chunks": "..."
  }
}"#
    }

    /// Judge prompt for the baseline without retrieval.
    pub fn judge_no_rag() -> &'static str {
        r#"You are an evaluation judge for a baseline LLM WITHOUT retrieval (no RAG).
Evaluate the model answer using ONLY the expected ground-truth answer.
Do NOT use outside knowledge.

Definitions:

Correctness:
- 1 if the model answer matches the expected ground-truth answer in meaning.
- 0 otherwise.

Hallucination:
- 1 if the model answer contains incorrect or fabricated factual information beyond what is supported by the expected answer.
- 0 if the answer is consistent with the expected answer (it may be shorter, but must not introduce wrong facts).

Question:
{question}

Expected ground-truth answer:
{expected_answer}

Model answer:
{generated_answer}

Return STRICTLY in JSON:
{
  "correctness": 0,
  "hallucination": 0,
  "justification": {
    "correctness": "...",
    "hallucination": "..."
  }
}"#
    }

    /// Per-chunk relevance prompt for hit-rate computation. The answer is YES or NO.
    pub fn chunk_relevance() -> &'static str {
        r#"You are judging whether a retrieved document chunk is relevant for answering a specific question.

Question:
{question}

Expected Answer:
{expected_answer}

Ground truth document: {gt_document}
Correct page(s): {correct_pages}

Retrieved Chunk Information:
- Source Document: {source}
- Page: {page}
- Text: {chunk_text}

Judgment Criteria: A chunk is RELEVANT only if ALL THREE conditions are met:
1. Correct Document: Chunk must be from the ground truth document
2. Correct Page: Chunk must be from a correct page
3. Contains Answer: Chunk must contain the expected answer or information needed to derive it

Instructions:
- Answer ONLY with "YES" or "NO"
- YES = All three conditions are met
- NO = Any condition fails

Example Judgments:
- GT document, page 3, contains "49 percent" when answer is "49 percent" -> YES
- GT document, page 3, doesn't contain the expected answer -> NO
- Wrong document (noise/conflict), even if it contains the answer -> NO
- Ground truth document, wrong page, contains answer -> NO"#
    }

    /// Prompt to write one question/answer pair from a document chunk.
    pub fn ground_truth_pair() -> &'static str {
        r#"You are generating ground-truth evaluation data for a Retrieval-Augmented Generation (RAG) system.

DOCUMENT CHUNK:
---------
{chunk}
---------

Your task:
1. Write ONE clear, non-trivial factual question in ENGLISH that can be answered using ONLY the information in the text.
2. The question must require understanding the information in the text, not just reading a single number or title.
3. Write the exact correct answer in ENGLISH, based strictly on the text.

Constraints:
- Prefer questions involving comparisons, trends, proportions, or explanations stated in the text.
- Do NOT use outside knowledge.
- Do NOT infer beyond the text.

Output strictly in JSON:
{
  "question": "...",
  "expected_answer": "..."
}"#
    }
}
