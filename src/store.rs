//! Qdrant vector store client over the REST API.
//!
//! Points carry one named vector and a JSON payload with at least `text`,
//! `source` and `page_no`.

use crate::config::QdrantConfig;
use crate::error::{EvalError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

/// Payload keys that may hold chunk text, in lookup order.
const TEXT_KEYS: [&str; 4] = ["text", "content", "chunk", "page_content"];

/// Point identifier: Qdrant accepts unsigned integers and UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(s) => write!(f, "{}", s),
        }
    }
}

/// Distance metric of a collection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

/// A point to upsert.
#[derive(Debug, Clone)]
pub struct NewPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// A point returned by search or scroll.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPoint {
    pub id: PointId,
    /// Similarity score; only present on search results.
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl StoredPoint {
    fn lookup(&self, key: &str) -> Option<&Value> {
        let payload = self.payload.as_ref()?;
        payload.get(key).or_else(|| {
            payload
                .get("metadata")
                .and_then(|m| m.as_object())
                .and_then(|m| m.get(key))
        })
    }

    /// Chunk text, looked up under the usual payload keys.
    pub fn text(&self) -> Option<&str> {
        TEXT_KEYS
            .iter()
            .filter_map(|key| self.lookup(key).and_then(|v| v.as_str()))
            .find(|text| !text.is_empty())
    }

    /// Page number the chunk came from, as stored (number or string).
    pub fn page(&self) -> Option<Value> {
        self.lookup("page_no")
            .or_else(|| self.lookup("page"))
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Source document name.
    pub fn source(&self) -> Option<&str> {
        self.lookup("source").and_then(|v| v.as_str())
    }
}

/// One page of scroll results.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrollPage {
    pub points: Vec<StoredPoint>,
    #[serde(default)]
    pub next_page_offset: Option<PointId>,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct QdrantErrorResponse {
    status: QdrantErrorStatus,
}

#[derive(Debug, Deserialize)]
struct QdrantErrorStatus {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

/// Client for one Qdrant instance.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantStore {
    pub fn new(config: &QdrantConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Self::parse_body(status, &body)
    }

    fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<QdrantErrorResponse>(body) {
                return Err(EvalError::VectorStore(format!(
                    "({}): {}",
                    status, err.status.error
                )));
            }
            return Err(EvalError::VectorStore(format!("({}): {}", status, body)));
        }

        let parsed: QdrantResponse<T> = serde_json::from_str(body)
            .map_err(|e| EvalError::VectorStore(format!("Invalid response: {}", e)))?;
        Ok(parsed.result)
    }

    /// Whether a collection exists.
    pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let builder = self
            .client
            .get(self.url(&format!("/collections/{}/exists", collection)));
        let result: ExistsResult = self.execute(builder).await?;
        Ok(result.exists)
    }

    /// Create a collection holding one named vector per point.
    pub async fn create_collection(
        &self,
        collection: &str,
        vector_name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        info!(collection, vector_name, dimensions, "creating collection");
        let builder = self
            .client
            .put(self.url(&format!("/collections/{}", collection)))
            .json(&Self::collection_body(vector_name, dimensions, distance));
        let _: bool = self.execute(builder).await?;
        Ok(())
    }

    fn collection_body(vector_name: &str, dimensions: usize, distance: Distance) -> Value {
        json!({
            "vectors": {
                vector_name: { "size": dimensions, "distance": distance }
            }
        })
    }

    /// Create the collection unless it already exists. Returns true when created.
    pub async fn ensure_collection(
        &self,
        collection: &str,
        vector_name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<bool> {
        if self.collection_exists(collection).await? {
            debug!(collection, "collection already exists");
            return Ok(false);
        }
        self.create_collection(collection, vector_name, dimensions, distance)
            .await?;
        Ok(true)
    }

    /// Drop a collection and all of its points.
    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        info!(collection, "deleting collection");
        let builder = self
            .client
            .delete(self.url(&format!("/collections/{}", collection)));
        let _: bool = self.execute(builder).await?;
        Ok(())
    }

    /// Insert or replace points, waiting until they are indexed.
    pub async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        points: Vec<NewPoint>,
    ) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        debug!(collection, count = points.len(), "upserting points");
        let builder = self
            .client
            .put(self.url(&format!("/collections/{}/points?wait=true", collection)))
            .json(&Self::upsert_body(vector_name, &points));
        let _: Value = self.execute(builder).await?;
        Ok(())
    }

    fn upsert_body(vector_name: &str, points: &[NewPoint]) -> Value {
        let points: Vec<Value> = points
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": { vector_name: p.vector },
                    "payload": p.payload,
                })
            })
            .collect();
        json!({ "points": points })
    }

    /// Nearest-neighbour search returning the top `k` points with payloads.
    pub async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<StoredPoint>> {
        let builder = self
            .client
            .post(self.url(&format!("/collections/{}/points/search", collection)))
            .json(&json!({
                "vector": { "name": vector_name, "vector": vector },
                "limit": k,
                "with_payload": true,
            }));
        self.execute(builder).await
    }

    /// Fetch one page of points, without vectors.
    pub async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        offset: Option<&PointId>,
    ) -> Result<ScrollPage> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let builder = self
            .client
            .post(self.url(&format!("/collections/{}/points/scroll", collection)))
            .json(&body);
        self.execute(builder).await
    }

    /// Fetch every point of a collection by following scroll offsets.
    pub async fn scroll_all(&self, collection: &str, page_size: usize) -> Result<Vec<StoredPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let page = self.scroll(collection, page_size, offset.as_ref()).await?;
            points.extend(page.points);
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(points)
    }

    /// Exact number of points in a collection.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        let builder = self
            .client
            .post(self.url(&format!("/collections/{}/points/count", collection)))
            .json(&json!({ "exact": true }));
        let result: CountResult = self.execute(builder).await?;
        Ok(result.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(payload: Value) -> StoredPoint {
        StoredPoint {
            id: PointId::Num(1),
            score: None,
            payload: payload.as_object().cloned(),
        }
    }

    #[test]
    fn test_text_fallback_keys() {
        assert_eq!(point(json!({"text": "a"})).text(), Some("a"));
        assert_eq!(point(json!({"content": "b"})).text(), Some("b"));
        assert_eq!(point(json!({"text": "", "chunk": "c"})).text(), Some("c"));
        assert_eq!(
            point(json!({"metadata": {"page_content": "d"}})).text(),
            Some("d")
        );
        assert_eq!(point(json!({"source": "x"})).text(), None);
    }

    #[test]
    fn test_page_and_source() {
        let p = point(json!({"page_no": 12, "source": "survey"}));
        assert_eq!(p.page(), Some(json!(12)));
        assert_eq!(p.source(), Some("survey"));

        let nested = point(json!({"metadata": {"page": "3"}}));
        assert_eq!(nested.page(), Some(json!("3")));

        assert_eq!(point(json!({"page_no": null})).page(), None);
    }

    #[test]
    fn test_point_id_roundtrip_forms() {
        let ids: Vec<PointId> =
            serde_json::from_str(r#"[7, "4b1c0f9e-0000-4000-8000-000000000000"]"#).unwrap();
        assert_eq!(ids[0], PointId::Num(7));
        assert!(matches!(ids[1], PointId::Uuid(_)));
        assert_eq!(ids[0].to_string(), "7");
    }

    #[test]
    fn test_collection_body() {
        let body = QdrantStore::collection_body("text-embedding-3-small", 1536, Distance::Cosine);
        assert_eq!(body["vectors"]["text-embedding-3-small"]["size"], 1536);
        assert_eq!(
            body["vectors"]["text-embedding-3-small"]["distance"],
            "Cosine"
        );
    }

    #[test]
    fn test_upsert_body_uses_named_vector() {
        let mut payload = Map::new();
        payload.insert("text".to_string(), json!("hello"));
        let points = vec![NewPoint {
            id: PointId::Num(3),
            vector: vec![0.25, 0.5],
            payload,
        }];
        let body = QdrantStore::upsert_body("emb", &points);
        assert_eq!(body["points"][0]["id"], 3);
        assert_eq!(body["points"][0]["vector"]["emb"][1], 0.5);
        assert_eq!(body["points"][0]["payload"]["text"], "hello");
    }

    #[test]
    fn test_parse_scroll_page() {
        let body = r#"{"result": {"points": [{"id": 1, "payload": {"text": "x"}}], "next_page_offset": 2}, "status": "ok", "time": 0.01}"#;
        let page: ScrollPage = QdrantStore::parse_body(StatusCode::OK, body).unwrap();
        assert_eq!(page.points.len(), 1);
        assert_eq!(page.next_page_offset, Some(PointId::Num(2)));
    }

    #[test]
    fn test_parse_search_results() {
        let body = r#"{"result": [{"id": "a", "score": 0.91, "payload": {"text": "t", "page_no": 4}}], "status": "ok"}"#;
        let hits: Vec<StoredPoint> = QdrantStore::parse_body(StatusCode::OK, body).unwrap();
        assert_eq!(hits[0].score, Some(0.91));
        assert_eq!(hits[0].page(), Some(json!(4)));
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"status": {"error": "Not found: Collection `x` doesn't exist!"}, "time": 0.0}"#;
        let err = QdrantStore::parse_body::<Value>(StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(err.to_string().contains("doesn't exist"));
    }
}
