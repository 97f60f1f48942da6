//! Four-way route decision
//!
//! One route per request, decided in a fixed order: clarity first, then
//! coverage. Agent selection is an orthogonal overlay in `agents`; a route
//! never changes once selected, and failures inside a route are absorbed
//! locally.

pub mod agents;

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;
use crate::coverage::CoverageLevel;
use crate::types::Intent;

pub use agents::{agent_for, AgentKind, GenericAgent, SafetyAgent, SmeAgent, VendorAgent};

/// Response strategy for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Strong coverage, answer from the store
    Direct,
    /// Thin coverage, answer now and enrich in the background
    Enrich,
    /// No coverage, best-effort answer and background research
    Research,
    /// Intent too vague, ask before doing any knowledge work
    Clarify,
}

impl Route {
    /// True when this route fires the gap detector and research pipeline
    pub fn triggers_research(&self) -> bool {
        matches!(self, Route::Enrich | Route::Research)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Enrich => "enrich",
            Route::Research => "research",
            Route::Clarify => "clarify",
        }
    }
}

/// Route decision, evaluated in order
pub struct Router {
    config: RoutingConfig,
}

impl Router {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// Clarity gate first: a vague intent clarifies without any knowledge
    /// work. Otherwise the coverage level alone picks the route.
    pub fn decide(&self, intent: &Intent, coverage: CoverageLevel) -> Route {
        if self.needs_clarification(intent) {
            return Route::Clarify;
        }

        match coverage {
            CoverageLevel::Strong => Route::Direct,
            CoverageLevel::Thin => Route::Enrich,
            CoverageLevel::None => Route::Research,
        }
    }

    /// The clarity gate on its own, so callers can skip the coverage probe
    /// entirely for vague requests.
    pub fn needs_clarification(&self, intent: &Intent) -> bool {
        intent.confidence < self.config.clarity_threshold
    }

    pub fn answer_top_k(&self) -> usize {
        self.config.answer_top_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquipmentType, Vendor};

    fn intent(confidence: f32) -> Intent {
        Intent {
            vendor: Vendor::Siemens,
            equipment_type: EquipmentType::Vfd,
            symptom: "trips on start".to_string(),
            fault_codes: vec![],
            confidence,
            raw_summary: String::new(),
        }
    }

    fn router() -> Router {
        Router::new(RoutingConfig::default())
    }

    #[test]
    fn test_low_confidence_clarifies_regardless_of_coverage() {
        let r = router();
        assert_eq!(r.decide(&intent(0.2), CoverageLevel::Strong), Route::Clarify);
        assert_eq!(r.decide(&intent(0.2), CoverageLevel::None), Route::Clarify);
    }

    #[test]
    fn test_coverage_maps_to_route() {
        let r = router();
        assert_eq!(r.decide(&intent(0.9), CoverageLevel::Strong), Route::Direct);
        assert_eq!(r.decide(&intent(0.9), CoverageLevel::Thin), Route::Enrich);
        assert_eq!(r.decide(&intent(0.9), CoverageLevel::None), Route::Research);
    }

    #[test]
    fn test_threshold_boundary_answers() {
        let r = router();
        // Exactly at the threshold counts as clear enough
        assert_eq!(r.decide(&intent(0.45), CoverageLevel::Strong), Route::Direct);
    }

    #[test]
    fn test_research_trigger_routes() {
        assert!(Route::Enrich.triggers_research());
        assert!(Route::Research.triggers_research());
        assert!(!Route::Direct.triggers_research());
        assert!(!Route::Clarify.triggers_research());
    }
}
