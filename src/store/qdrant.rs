//! Qdrant vector database backend

use super::payload::{point_uuid, ChunkPayload, ChunkPoint};
use super::{ScoredChunk, VectorBackend, VectorRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, GetCollectionInfoResponse, GetPointsBuilder, PointId,
    PointStruct, ScalarQuantizationBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Qdrant collection handle
pub struct QdrantBackend {
    client: Qdrant,
    url: String,
    collection: String,
}

impl QdrantBackend {
    /// Build a client; no connection is made until the first request
    pub fn new(url: &str, collection: &str) -> Result<Self> {
        debug!("Configuring Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
        })
    }

    async fn collection_vector_sizes(&self) -> Result<Option<Vec<(String, u64)>>> {
        let info = self.client.collection_info(&self.collection).await?;
        Ok(extract_vector_sizes(&info))
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn describe(&self) -> String {
        format!("qdrant ({})", self.url)
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.client.collection_exists(&self.collection).await?)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection {} already exists", self.collection);

            if let Some(sizes) = self.collection_vector_sizes().await? {
                if sizes.len() > 1 {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' uses named vectors ({}) which are not supported",
                        self.collection,
                        describe_vector_sizes(&sizes)
                    )));
                }

                if let Some((_, size)) = sizes.first() {
                    if *size as usize != dimension {
                        return Err(Error::Qdrant(format!(
                            "Collection '{}' has vector size {}, but the embedding model produces {}. Rebuild the index or choose a new collection name.",
                            self.collection, size, dimension
                        )));
                    }
                }
            }

            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, dimension
        );

        let vectors_config = VectorParamsBuilder::new(dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;

        Ok(())
    }

    async fn delete_collection(&self) -> Result<bool> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(false);
        }

        info!("Deleting collection {}", self.collection);
        self.client.delete_collection(&self.collection).await?;
        Ok(true)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let by_point: HashMap<String, &String> = ids
            .iter()
            .map(|id| (point_uuid(id).to_string(), id))
            .collect();
        let point_ids: Vec<PointId> = by_point
            .keys()
            .map(|uuid| PointId::from(uuid.clone()))
            .collect();

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, point_ids)
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|p| by_point.get(&point_id_to_string(p.id)).map(|id| (*id).clone()))
            .collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        debug!(
            "Upserting {} points to collection {}",
            records.len(),
            self.collection
        );

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                ChunkPoint {
                    id: point_uuid(&record.id),
                    vector: record.embedding,
                    payload: ChunkPayload::from(&record.chunk),
                }
                .to_point_struct()
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|p| {
                let payload: ChunkPayload = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_from_qdrant_value(v)))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();

                ScoredChunk {
                    chunk: payload.into_chunk(),
                    score: p.score,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let info = self.client.collection_info(&self.collection).await?;
        let points_count = info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0);
        Ok(points_count as usize)
    }
}

fn describe_vector_sizes(sizes: &[(String, u64)]) -> String {
    sizes
        .iter()
        .map(|(name, size)| format!("{}:{}", name, size))
        .collect::<Vec<_>>()
        .join(", ")
}

fn extract_vector_sizes(info: &GetCollectionInfoResponse) -> Option<Vec<(String, u64)>> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;
    let config = vectors_config.config.as_ref()?;

    match config {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => {
            Some(vec![("default".to_string(), params.size)])
        }
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(map) => {
            let sizes: Vec<(String, u64)> = map
                .map
                .iter()
                .map(|(name, params)| (name.clone(), params.size))
                .collect();
            if sizes.is_empty() {
                None
            } else {
                Some(sizes)
            }
        }
    }
}

/// Convert PointId to string
fn point_id_to_string(id: Option<PointId>) -> String {
    match id {
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)),
        }) => uuid,
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)),
        }) => num.to_string(),
        _ => String::new(),
    }
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::GuidelineChunk;
    use qdrant_client::qdrant::point_id::PointIdOptions;
    use qdrant_client::qdrant::value::Kind;

    #[test]
    fn test_describe() {
        let backend = QdrantBackend::new("http://127.0.0.1:6334", "nutrition_guidelines").unwrap();
        assert_eq!(backend.describe(), "qdrant (http://127.0.0.1:6334)");
    }

    #[test]
    fn test_point_id_to_string() {
        let uuid = point_uuid("abc").to_string();
        let id = PointId {
            point_id_options: Some(PointIdOptions::Uuid(uuid.clone())),
        };
        assert_eq!(point_id_to_string(Some(id)), uuid);
        assert_eq!(point_id_to_string(None), "");
    }

    #[test]
    fn test_json_from_qdrant_value() {
        let value = qdrant_client::qdrant::Value {
            kind: Some(Kind::IntegerValue(3)),
        };
        assert_eq!(json_from_qdrant_value(value), serde_json::json!(3));

        let value = qdrant_client::qdrant::Value {
            kind: Some(Kind::StringValue("iron".to_string())),
        };
        assert_eq!(json_from_qdrant_value(value), serde_json::json!("iron"));
    }

    fn record(chunk: &GuidelineChunk, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: chunk.id.clone(),
            embedding,
            chunk: chunk.clone(),
        }
    }

    #[tokio::test]
    #[ignore] // Run manually with: QDRANT_URL=http://localhost:6334 cargo test -- --ignored
    async fn test_qdrant_data_path() {
        let Ok(url) = std::env::var("QDRANT_URL") else {
            return;
        };
        let collection = format!("growthwise_test_{}", chrono::Utc::now().timestamp_micros());
        let backend = QdrantBackend::new(&url, &collection).unwrap();

        assert!(!backend.collection_exists().await.unwrap());
        backend.ensure_collection(3).await.unwrap();

        let feeding = GuidelineChunk::new("feeding.md", None, "Offer iron rich foods daily");
        let hygiene = GuidelineChunk::new("hygiene.pdf", Some(2), "Wash hands before meals");
        backend
            .upsert(vec![
                record(&feeding, vec![1.0, 0.0, 0.0]),
                record(&hygiene, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let existing = backend
            .existing_ids(&[feeding.id.clone(), "not-indexed".to_string()])
            .await
            .unwrap();
        assert_eq!(existing, HashSet::from([feeding.id.clone()]));

        let hits = backend.search(&[0.1, 1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, hygiene);

        assert_eq!(backend.count().await.unwrap(), 2);
        assert!(matches!(backend.ensure_collection(4).await, Err(Error::Qdrant(_))));
        assert!(backend.delete_collection().await.unwrap());
        assert!(!backend.delete_collection().await.unwrap());
    }
}
