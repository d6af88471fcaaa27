//! Payload schema for Qdrant points

use crate::chunk::GuidelineChunk;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each chunk in Qdrant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// SHA-1 chunk id (the point id is derived from it)
    pub chunk_id: String,

    /// Normalized chunk text
    pub text: String,

    /// Source document path, relative to the docs directory
    pub source_path: String,

    /// 0-based page for paged formats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("chunk_id".to_string(), string_to_qdrant(&self.chunk_id));
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert("source_path".to_string(), string_to_qdrant(&self.source_path));

        if let Some(page) = self.page {
            map.insert("page".to_string(), int_to_qdrant(page as i64));
        }

        map
    }

    pub fn into_chunk(self) -> GuidelineChunk {
        GuidelineChunk {
            id: self.chunk_id,
            text: self.text,
            source_path: self.source_path,
            page: self.page,
        }
    }
}

impl From<&GuidelineChunk> for ChunkPayload {
    fn from(chunk: &GuidelineChunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            source_path: chunk.source_path.clone(),
            page: chunk.page,
        }
    }
}

/// Qdrant point ids must be UUIDs or integers; derive a stable UUID v5
pub fn point_uuid(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes())
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }
}
