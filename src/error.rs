//! Error types for the evaluation toolkit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while ingesting, answering, judging or aggregating.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization of a data file.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file the stage depends on does not exist.
    #[error("File not found at '{0}'")]
    FileNotFound(PathBuf),

    /// No PDF documents found in a corpus directory.
    #[error("No PDF documents found at '{0}'")]
    EmptyCorpus(PathBuf),

    /// The PDF could not be parsed or yielded no text.
    #[error("PDF error for '{path}': {message}")]
    Pdf { path: PathBuf, message: String },

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// Embedding API error.
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Vector store request failed.
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Human-label CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(String),

    /// The same question id appears twice in a file that is joined on it.
    #[error("Duplicate question_id '{id}' in '{path}'")]
    DuplicateQuestionId { id: String, path: PathBuf },

    /// Not enough data to run the requested stage.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a PDF error with path context.
    pub fn pdf(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Pdf {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short name of the error kind, used when an error is recorded in an
    /// output file instead of aborting the run.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IoError",
            Self::Serialization(_) => "SerializationError",
            Self::FileNotFound(_) => "FileNotFound",
            Self::EmptyCorpus(_) => "EmptyCorpus",
            Self::Pdf { .. } => "PdfError",
            Self::LlmApi(_) => "LlmApiError",
            Self::LlmParse(_) => "LlmParseError",
            Self::Embedding(_) => "EmbeddingError",
            Self::VectorStore(_) => "VectorStoreError",
            Self::Http(_) => "HttpError",
            Self::Config(_) => "ConfigError",
            Self::Csv(_) => "CsvError",
            Self::DuplicateQuestionId { .. } => "DuplicateQuestionId",
            Self::InsufficientData(_) => "InsufficientData",
        }
    }

    /// Render as `"<Kind>: <message>"` for the `error` field of a record.
    pub fn to_record_string(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::LlmParse(err.to_string())
    }
}

impl From<csv::Error> for EvalError {
    fn from(err: csv::Error) -> Self {
        EvalError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_string_includes_kind() {
        let err = EvalError::LlmApi("rate limited".to_string());
        assert_eq!(
            err.to_record_string(),
            "LlmApiError: LLM API error: rate limited"
        );
    }

    #[test]
    fn test_duplicate_message_names_id() {
        let err = EvalError::DuplicateQuestionId {
            id: "GT_004".to_string(),
            path: PathBuf::from("results.json"),
        };
        assert!(err.to_string().contains("GT_004"));
        assert!(err.to_string().contains("results.json"));
    }
}
