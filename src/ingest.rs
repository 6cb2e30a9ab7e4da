//! Ingestion: PDF -> pages -> chunks -> embeddings -> vector store.

use crate::chunker::{Chunk, ChunkConfig, chunk_document};
use crate::document::Document;
use crate::embedder::Embedder;
use crate::error::{EvalError, Result};
use crate::store::{Distance, NewPoint, PointId, QdrantStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Target collection.
    pub collection: String,
    /// Named vector inside each point.
    pub vector_name: String,
    /// Chunking settings.
    pub chunk_config: ChunkConfig,
    /// Drop and recreate the collection first.
    pub recreate: bool,
    /// Extra payload merged into every point.
    pub metadata: Map<String, Value>,
    /// Override for the `source` payload field; defaults to the file stem.
    pub source: Option<String>,
    /// Number documents as synthetic conflict documents (`conflict_id` 1..n).
    pub conflict: bool,
}

impl IngestOptions {
    pub fn new(collection: impl Into<String>, vector_name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            vector_name: vector_name.into(),
            chunk_config: ChunkConfig::default(),
            recreate: false,
            metadata: Map::new(),
            source: None,
            conflict: false,
        }
    }
}

/// What one document contributed to the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestReport {
    pub collection: String,
    pub created_collection: bool,
    pub documents: Vec<DocumentReport>,
}

impl IngestReport {
    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks).sum()
    }
}

/// Find PDF files: the path itself, or every `.pdf` below a directory, sorted.
pub fn discover_pdfs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(EvalError::FileNotFound(path.to_path_buf()));
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut pdfs: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if pdfs.is_empty() {
        return Err(EvalError::EmptyCorpus(path.to_path_buf()));
    }

    pdfs.sort();
    Ok(pdfs)
}

/// Build the payload for one chunk.
pub fn chunk_payload(
    chunk: &Chunk,
    doc_id: &str,
    metadata: &Map<String, Value>,
) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("type".to_string(), json!("pdf"));
    payload.insert("doc_id".to_string(), json!(doc_id));
    for (key, value) in metadata {
        payload.insert(key.clone(), value.clone());
    }
    payload.insert("text".to_string(), json!(chunk.text));
    payload.insert("source".to_string(), json!(chunk.source));
    payload.insert("page_no".to_string(), json!(chunk.page));
    payload
}

/// Runs ingestion against one embedder and store.
pub struct Ingestor {
    embedder: Embedder,
    store: QdrantStore,
}

impl Ingestor {
    pub fn new(embedder: Embedder, store: QdrantStore) -> Self {
        Self { embedder, store }
    }

    /// Ingest a PDF file or every PDF under a directory.
    pub async fn ingest_path(&self, path: &Path, options: &IngestOptions) -> Result<IngestReport> {
        let pdfs = discover_pdfs(path)?;
        info!(count = pdfs.len(), collection = %options.collection, "ingesting documents");

        if options.recreate && self.store.collection_exists(&options.collection).await? {
            self.store.delete_collection(&options.collection).await?;
        }

        let created_collection = self
            .store
            .ensure_collection(
                &options.collection,
                &options.vector_name,
                self.embedder.dimensions(),
                Distance::Cosine,
            )
            .await?;

        let mut report = IngestReport {
            collection: options.collection.clone(),
            created_collection,
            documents: Vec::new(),
        };

        for (i, pdf) in pdfs.iter().enumerate() {
            let document = Document::load(pdf)?;

            let mut metadata = options.metadata.clone();
            if options.conflict {
                metadata.insert("conflict_doc".to_string(), json!(true));
                metadata.insert("conflict_id".to_string(), json!(i + 1));
            }

            let source = match (&options.source, options.conflict) {
                (Some(source), _) => source.clone(),
                (None, true) => "synthetic_conflict".to_string(),
                (None, false) => document.name.clone(),
            };

            let doc_report = self
                .ingest_document(&document, &source, &metadata, options)
                .await?;
            report.documents.push(doc_report);
        }

        Ok(report)
    }

    /// Chunk, embed and upsert one loaded document.
    pub async fn ingest_document(
        &self,
        document: &Document,
        source: &str,
        metadata: &Map<String, Value>,
        options: &IngestOptions,
    ) -> Result<DocumentReport> {
        let chunks = chunk_document(document, source, &options.chunk_config);
        let doc_id = document
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| document.name.clone());

        if chunks.is_empty() {
            warn!(document = %document.name, "document produced no chunks");
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_all(&texts).await?;

        let points: Vec<NewPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| NewPoint {
                id: PointId::Uuid(uuid::Uuid::new_v4().to_string()),
                vector,
                payload: chunk_payload(chunk, &doc_id, metadata),
            })
            .collect();

        self.store
            .upsert(&options.collection, &options.vector_name, points)
            .await?;

        info!(
            document = %document.name,
            pages = document.page_count(),
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(DocumentReport {
            path: document.path.clone().unwrap_or_default(),
            source: source.to_string(),
            pages: document.page_count(),
            chunks: chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("survey.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        assert_eq!(discover_pdfs(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_discover_directory_sorted_pdfs_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("conflicts")).unwrap();
        std::fs::write(dir.path().join("conflicts/Conflict_Doc_2.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("conflicts/Conflict_Doc_1.PDF"), b"").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"").unwrap();

        let pdfs = discover_pdfs(dir.path()).unwrap();
        assert_eq!(pdfs.len(), 2);
        assert!(pdfs[0].ends_with("Conflict_Doc_1.PDF"));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_pdfs(dir.path()),
            Err(EvalError::EmptyCorpus(_))
        ));
    }

    #[test]
    fn test_chunk_payload_fields_win_over_metadata() {
        let chunk = Chunk {
            text: "Car trips dominate.".to_string(),
            page: 12,
            source: "survey".to_string(),
            index: 0,
        };
        let mut metadata = Map::new();
        metadata.insert("conflict_id".to_string(), json!(2));
        metadata.insert("page_no".to_string(), json!(99));

        let payload = chunk_payload(&chunk, "docs/survey.pdf", &metadata);
        assert_eq!(payload["page_no"], 12);
        assert_eq!(payload["source"], "survey");
        assert_eq!(payload["type"], "pdf");
        assert_eq!(payload["doc_id"], "docs/survey.pdf");
        assert_eq!(payload["conflict_id"], 2);
    }
}
