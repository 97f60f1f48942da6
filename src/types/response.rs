//! Response record returned to every front-end
//!
//! Built once per request by the router and synthesizer, immutable after.

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageLevel;
use crate::gaps::PriorityBranch;
use crate::router::{AgentKind, Route};

/// One cited source, numbered in first-reference order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub number: usize,
    pub atom_id: String,
    pub title: String,
    pub page_number: Option<u32>,
    pub source: Option<String>,
}

/// Decision trail for one request, kept for observability and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTrace {
    pub coverage: CoverageLevel,
    pub docs_found: usize,
    pub route: Route,
    pub agent: AgentKind,
    pub intent_confidence: f32,
    /// Which precedence branch set the gap priority, when a gap fired
    pub priority_branch: Option<PriorityBranch>,
    /// Logged gap id; `None` when no gap fired or the gap store failed
    pub gap_id: Option<String>,
}

/// The single artifact returned to any front-end (chat, voice, API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivetResponse {
    pub text: String,
    pub confidence: f32,
    pub route_taken: Route,
    pub citations: Vec<Citation>,
    pub safety_warnings: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub links: Vec<String>,
    pub kb_enrichment_triggered: bool,
    pub research_triggered: bool,
    pub trace: RouteTrace,
}
