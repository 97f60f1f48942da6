//! Knowledge store contract and retrieved-document record

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{EquipmentType, Intent, Vendor};

/// Metadata filter applied to a knowledge search.
///
/// All fields are optional; an unset field does not constrain the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub vendor: Option<Vendor>,
    pub equipment_type: Option<EquipmentType>,
    pub atom_type: Option<String>,
}

impl SearchFilter {
    /// Build a filter from an extracted intent.
    ///
    /// Generic vendor and unknown equipment stay unset so they do not
    /// exclude cross-vendor material.
    pub fn from_intent(intent: &Intent) -> Self {
        Self {
            vendor: (!intent.vendor.is_generic()).then_some(intent.vendor),
            equipment_type: intent.equipment_type.is_known().then_some(intent.equipment_type),
            atom_type: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.equipment_type.is_none() && self.atom_type.is_none()
    }
}

/// One knowledge atom returned by a search, fresh per query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub atom_id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub similarity: f32,
    pub vendor: Option<Vendor>,
    pub equipment_type: Option<EquipmentType>,
    /// Origin URL or document reference
    pub source: Option<String>,
    pub page_number: Option<u32>,
}

/// Search contract for the external knowledge store
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Vector similarity search constrained by the filter
    async fn semantic_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>>;

    /// Lexical search over the same filter, used when the semantic path fails
    async fn keyword_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>>;
}
