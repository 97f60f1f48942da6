//! Gap analysis: turns an uncovered question into an actionable ingestion trigger.
//!
//! The detector is pure computation. It never touches storage or the network;
//! it classifies priority, pulls equipment identifiers out of the raw query,
//! and proposes search terms and source kinds for the research side.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coverage::CoverageLevel;
use crate::errors::{Result, RivetError};
use crate::types::{contains_safety_keywords, EquipmentType, Intent, Vendor};

/// Cap on extracted equipment identifiers per trigger.
pub const MAX_IDENTIFIERS: usize = 5;
/// Cap on generated search terms per trigger.
pub const MAX_SEARCH_TERMS: usize = 10;
/// Stored query text is clipped to this many characters.
pub const MAX_QUERY_CHARS: usize = 500;
/// Stored symptom text is clipped to this many characters.
pub const MAX_SYMPTOM_CHARS: usize = 200;

/// Matched as whole tokens, not substrings.
const FAULT_TOKENS: &[&str] = &[
    "fault", "faults", "faulted", "faulting", "error", "errors", "alarm", "alarms", "trip",
    "trips", "tripped", "tripping",
];

/// Exact stems only. Inflected forms like "troubleshooting" do not match,
/// so "general troubleshooting tips" stays on the generic path.
const REPAIR_TOKENS: &[&str] = &["troubleshoot", "diagnose", "fix", "repair"];

/// How urgently a knowledge gap should be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapPriority {
    High,
    Medium,
    Low,
}

impl GapPriority {
    pub fn display_name(&self) -> &'static str {
        match self {
            GapPriority::High => "HIGH",
            GapPriority::Medium => "MEDIUM",
            GapPriority::Low => "LOW",
        }
    }
}

/// Which rung of the priority ladder fired. The ladder is ordered, so a
/// query with both safety and fault keywords reports the safety branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBranch {
    SafetyKeyword,
    FaultKeyword,
    RepairKeyword,
    KnownVendor,
    Default,
}

/// Kinds of places worth scraping for gap-filling material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    ManufacturerWebsite,
    ManualsIndex,
    ServiceBulletins,
    TechnicalStandards,
    IndustryForums,
}

impl SourceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::ManufacturerWebsite => "manufacturer-website",
            SourceKind::ManualsIndex => "manuals-index",
            SourceKind::ServiceBulletins => "service-bulletins",
            SourceKind::TechnicalStandards => "technical-standards",
            SourceKind::IndustryForums => "industry-forums",
        }
    }
}

/// Flat record handed to the ingestion side when coverage falls short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionTrigger {
    pub trigger_id: String,
    pub query_text: String,
    pub priority: GapPriority,
    pub vendor: Vendor,
    pub equipment_type: EquipmentType,
    pub symptom: String,
    pub fault_codes: Vec<String>,
    pub equipment_identified: Vec<String>,
    pub search_terms: Vec<String>,
    pub sources_to_try: Vec<SourceKind>,
    pub kb_coverage: CoverageLevel,
    pub priority_branch: PriorityBranch,
    pub triggered_at: DateTime<Utc>,
}

/// Builds [`IngestionTrigger`]s from intent, coverage, and the raw query.
pub struct GapDetector {
    identifier_patterns: Vec<Regex>,
}

impl GapDetector {
    pub fn new() -> Result<Self> {
        // Model-number shapes seen across drive, PLC, and I/O catalogs:
        // letter-prefixed (G120C, ACS880-01), letter-digit families
        // (S7-1200), and catalog numbers (1756-L61).
        let patterns = [
            r"\b[A-Z]{1,4}[-\s]?\d{2,6}[A-Z0-9]*(?:-[A-Z0-9]{1,6})?\b",
            r"\b[A-Z]\d-\d{2,5}[A-Z0-9]*\b",
            r"\b\d{3,4}-[A-Z]{1,2}\d{1,3}[A-Z0-9]*\b",
        ];
        let identifier_patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| RivetError::Internal(format!("identifier pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            identifier_patterns,
        })
    }

    /// Produce a trigger for a coverage gap, or `None` when coverage is
    /// strong enough that no ingestion work is needed.
    pub fn analyze(
        &self,
        intent: &Intent,
        coverage: CoverageLevel,
        query: &str,
    ) -> Option<IngestionTrigger> {
        if !coverage.is_gap() {
            return None;
        }

        let (priority, branch) = Self::priority_for(intent, query);

        let mut identifiers = self.extract_identifiers(query);
        identifiers.retain(|id| !intent.fault_codes.contains(id));
        identifiers.truncate(MAX_IDENTIFIERS);

        let search_terms = Self::search_terms(intent, &identifiers);
        let sources_to_try = Self::source_candidates(priority, intent.equipment_type);

        Some(IngestionTrigger {
            trigger_id: Uuid::new_v4().to_string(),
            query_text: truncate_chars(query, MAX_QUERY_CHARS),
            priority,
            vendor: intent.vendor,
            equipment_type: intent.equipment_type,
            symptom: truncate_chars(&intent.symptom, MAX_SYMPTOM_CHARS),
            fault_codes: intent.fault_codes.clone(),
            equipment_identified: identifiers,
            search_terms,
            sources_to_try,
            kb_coverage: coverage,
            priority_branch: branch,
            triggered_at: Utc::now(),
        })
    }

    /// Ordered priority ladder. The first matching rung wins, so safety
    /// outranks fault codes, which outrank repair phrasing, which outranks
    /// a merely recognized vendor.
    pub fn priority_for(intent: &Intent, query: &str) -> (GapPriority, PriorityBranch) {
        let text = format!("{} {}", query, intent.symptom).to_lowercase();

        if intent.equipment_type.is_safety_related() || contains_safety_keywords(&text) {
            return (GapPriority::High, PriorityBranch::SafetyKeyword);
        }
        if !intent.fault_codes.is_empty() || has_token(&text, FAULT_TOKENS) {
            return (GapPriority::High, PriorityBranch::FaultKeyword);
        }
        if has_token(&text, REPAIR_TOKENS) {
            return (GapPriority::Medium, PriorityBranch::RepairKeyword);
        }
        if !intent.vendor.is_generic() {
            return (GapPriority::Medium, PriorityBranch::KnownVendor);
        }
        (GapPriority::Low, PriorityBranch::Default)
    }

    /// Scan the uppercased query for model-number shapes. Matches are
    /// normalized (whitespace and hyphens stripped) and deduplicated in
    /// first-seen order, so "G120-C" and "G120C" collapse to one entry.
    pub fn extract_identifiers(&self, query: &str) -> Vec<String> {
        let upper = query.to_uppercase();

        let mut matches: Vec<(usize, String)> = Vec::new();
        for re in &self.identifier_patterns {
            for m in re.find_iter(&upper) {
                matches.push((m.start(), normalize_identifier(m.as_str())));
            }
        }
        matches.sort_by_key(|(start, _)| *start);

        let mut seen = std::collections::HashSet::new();
        let mut identifiers = Vec::new();
        for (_, normalized) in matches {
            if normalized.len() < 3 {
                continue;
            }
            if seen.insert(normalized.clone()) {
                identifiers.push(normalized);
            }
        }
        identifiers
    }

    fn search_terms(intent: &Intent, identifiers: &[String]) -> Vec<String> {
        let mut terms = Vec::new();

        for id in identifiers {
            terms.push(format!("{} manual filetype:pdf", id));
            terms.push(format!("{} troubleshooting guide", id));
        }

        if !intent.vendor.is_generic() && intent.equipment_type.is_known() {
            let vendor = intent.vendor.display_name();
            let equipment = intent.equipment_type.display_name();
            terms.push(format!("{} {} manual", vendor, equipment));
            terms.push(format!("{} {} service bulletin", vendor, equipment));
        }

        let anchor = identifiers.first().cloned().unwrap_or_else(|| {
            if intent.vendor.is_generic() {
                intent.equipment_type.display_name().to_string()
            } else {
                intent.vendor.display_name().to_string()
            }
        });
        for code in intent.fault_codes.iter().take(3) {
            terms.push(format!("{} fault code {}", anchor, code));
        }

        if let Some(host) = intent.vendor.portal_host() {
            terms.push(format!("site:{} {} manual", host, anchor));
        }

        terms.truncate(MAX_SEARCH_TERMS);
        terms
    }

    fn source_candidates(priority: GapPriority, equipment: EquipmentType) -> Vec<SourceKind> {
        let mut sources = vec![SourceKind::ManufacturerWebsite, SourceKind::ManualsIndex];
        if priority == GapPriority::High {
            sources.push(SourceKind::ServiceBulletins);
        }
        if equipment == EquipmentType::SafetyRelay {
            sources.push(SourceKind::TechnicalStandards);
        }
        if priority != GapPriority::High {
            sources.push(SourceKind::IndustryForums);
        }
        sources
    }
}

fn has_token(text: &str, tokens: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| tokens.contains(&word))
}

fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
