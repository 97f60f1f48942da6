//! Qdrant-backed knowledge store

use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, Condition,
        CreateCollection, Distance, FieldCondition, Filter, Match, ScrollPoints, SearchPoints,
        Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::KnowledgeConfig;
use crate::errors::{Result, RivetError};
use crate::knowledge::embed::EmbeddingProvider;
use crate::knowledge::store::{KnowledgeStore, RetrievedDoc, SearchFilter};
use crate::types::{EquipmentType, Vendor};

/// Knowledge store backed by a Qdrant collection of atoms
pub struct QdrantKnowledgeStore {
    client: QdrantClient,
    collection: String,
    score_threshold: f32,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantKnowledgeStore {
    /// Connect and make sure the atom collection exists
    pub async fn connect(
        config: &KnowledgeConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = QdrantClient::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| RivetError::Knowledge(format!("failed to create client: {}", e)))?;

        let store = Self {
            client,
            collection: config.collection.clone(),
            score_threshold: config.score_threshold,
            embedder,
        };

        store.ensure_collection(config.vector_size).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RivetError::Knowledge(format!("failed to list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: vector_size,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    RivetError::Knowledge(format!(
                        "failed to create collection {}: {}",
                        self.collection, e
                    ))
                })?;
            debug!(collection = %self.collection, "created atom collection");
        }

        Ok(())
    }

    fn build_filter(filter: &SearchFilter) -> Option<Filter> {
        let mut must = Vec::new();

        if let Some(vendor) = filter.vendor {
            must.push(keyword_condition("vendor", vendor.tag()));
        }
        if let Some(equipment) = filter.equipment_type {
            must.push(keyword_condition("equipment_type", equipment.tag()));
        }
        if let Some(atom_type) = &filter.atom_type {
            must.push(keyword_condition("atom_type", atom_type));
        }

        if must.is_empty() {
            None
        } else {
            Some(Filter {
                must,
                ..Default::default()
            })
        }
    }
}

#[async_trait::async_trait]
impl KnowledgeStore for QdrantKnowledgeStore {
    async fn semantic_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        let vector = self.embedder.embed(query).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector,
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                score_threshold: Some(self.score_threshold),
                filter: Self::build_filter(filter),
                ..Default::default()
            })
            .await
            .map_err(|e| RivetError::Knowledge(format!("semantic search failed: {}", e)))?;

        let docs = search_result
            .result
            .into_iter()
            .map(|point| doc_from_payload(point_id_to_string(&point.id), point.score, point.payload))
            .collect();

        Ok(docs)
    }

    async fn keyword_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        // Scroll filter-matching points, then score lexically client-side.
        // Scroll depth is bounded; this path only runs when the vector
        // search is unavailable.
        let scroll_result = self
            .client
            .scroll(&ScrollPoints {
                collection_name: self.collection.clone(),
                filter: Self::build_filter(filter),
                limit: Some((top_k * 10) as u32),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| RivetError::Knowledge(format!("keyword search failed: {}", e)))?;

        let mut docs: Vec<RetrievedDoc> = scroll_result
            .result
            .into_iter()
            .map(|point| {
                let mut doc =
                    doc_from_payload(point_id_to_string(&point.id), 0.0, point.payload);
                doc.similarity = lexical_overlap(query, &doc);
                doc
            })
            .filter(|doc| doc.similarity > 0.0)
            .collect();

        docs.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        docs.truncate(top_k);

        Ok(docs)
    }
}

/// Fraction of query words present in the document title or content
fn lexical_overlap(query: &str, doc: &RetrievedDoc) -> f32 {
    let haystack = format!("{} {}", doc.title, doc.content).to_lowercase();
    let query_lower = query.to_lowercase();
    let words: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .collect();

    if words.is_empty() {
        return 0.0;
    }

    let matches = words.iter().filter(|w| haystack.contains(*w)).count();
    matches as f32 / words.len() as f32
}

fn keyword_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::Field(
            FieldCondition {
                key: key.to_string(),
                r#match: Some(Match {
                    match_value: Some(qdrant_client::qdrant::r#match::MatchValue::Keyword(
                        value.to_string(),
                    )),
                }),
                ..Default::default()
            },
        )),
    }
}

fn doc_from_payload(
    atom_id: String,
    score: f32,
    payload: HashMap<String, QdrantValue>,
) -> RetrievedDoc {
    RetrievedDoc {
        atom_id,
        title: payload_string(&payload, "title").unwrap_or_default(),
        summary: payload_string(&payload, "summary").unwrap_or_default(),
        content: payload_string(&payload, "content").unwrap_or_default(),
        similarity: score,
        vendor: payload_string(&payload, "vendor").and_then(|t| Vendor::from_tag(&t)),
        equipment_type: payload_string(&payload, "equipment_type")
            .and_then(|t| EquipmentType::from_tag(&t)),
        source: payload_string(&payload, "source"),
        page_number: payload_integer(&payload, "page_number").map(|n| n as u32),
    }
}

fn payload_string(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    payload.get(key).and_then(|value| {
        value.kind.as_ref().and_then(|kind| {
            use qdrant_client::qdrant::value::Kind;
            match kind {
                Kind::StringValue(s) => Some(s.clone()),
                _ => None,
            }
        })
    })
}

fn payload_integer(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|value| {
        value.kind.as_ref().and_then(|kind| {
            use qdrant_client::qdrant::value::Kind;
            match kind {
                Kind::IntegerValue(i) => Some(*i),
                _ => None,
            }
        })
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, content: &str) -> RetrievedDoc {
        RetrievedDoc {
            atom_id: "a1".to_string(),
            title: title.to_string(),
            summary: String::new(),
            content: content.to_string(),
            similarity: 0.0,
            vendor: None,
            equipment_type: None,
            source: None,
            page_number: None,
        }
    }

    #[test]
    fn test_lexical_overlap_full_match() {
        let d = doc("G120 faults", "overcurrent trip causes and fixes");
        let score = lexical_overlap("overcurrent trip", &d);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_overlap_no_match() {
        let d = doc("PLC wiring", "input card diagrams");
        assert_eq!(lexical_overlap("hydraulic pump seal", &d), 0.0);
    }

    #[test]
    fn test_build_filter_empty_for_unset_fields() {
        assert!(QdrantKnowledgeStore::build_filter(&SearchFilter::default()).is_none());
    }

    #[test]
    fn test_build_filter_includes_set_fields() {
        let filter = SearchFilter {
            vendor: Some(Vendor::Siemens),
            equipment_type: Some(EquipmentType::Vfd),
            atom_type: None,
        };
        let built = QdrantKnowledgeStore::build_filter(&filter).unwrap();
        assert_eq!(built.must.len(), 2);
    }
}
