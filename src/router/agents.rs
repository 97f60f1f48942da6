//! SME agent selection and template responders
//!
//! Agent choice overlays the route decision with its own priority: safety
//! questions always go to the safety specialist, known vendors to their
//! specialist, everything else to the generic responder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::knowledge::RetrievedDoc;
use crate::types::{contains_safety_keywords, Intent, Vendor};

/// Which specialist answers the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "agent", content = "vendor", rename_all = "snake_case")]
pub enum AgentKind {
    Safety,
    Vendor(Vendor),
    Generic,
}

impl AgentKind {
    /// Selection priority: safety beats vendor beats generic. The query
    /// text is checked alongside the extracted symptom so safety phrasing
    /// the extractor missed still reaches the safety specialist.
    pub fn select(intent: &Intent, query: &str) -> AgentKind {
        if intent.is_safety_related() || contains_safety_keywords(query) {
            AgentKind::Safety
        } else if !intent.vendor.is_generic() {
            AgentKind::Vendor(intent.vendor)
        } else {
            AgentKind::Generic
        }
    }

    pub fn description(&self) -> String {
        match self {
            AgentKind::Safety => "safety specialist".to_string(),
            AgentKind::Vendor(v) => format!("{} specialist", v.display_name()),
            AgentKind::Generic => "general maintenance".to_string(),
        }
    }
}

/// A specialized responder drafting the answer text for its domain
#[async_trait]
pub trait SmeAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Draft an answer from the retrieved documents. With no documents the
    /// draft is a best-effort first-principles answer.
    async fn draft(&self, intent: &Intent, docs: &[RetrievedDoc], query: &str) -> Result<String>;
}

/// Instantiate the responder for a selected agent kind
pub fn agent_for(kind: AgentKind) -> Box<dyn SmeAgent> {
    match kind {
        AgentKind::Safety => Box::new(SafetyAgent),
        AgentKind::Vendor(vendor) => Box::new(VendorAgent { vendor }),
        AgentKind::Generic => Box::new(GenericAgent),
    }
}

fn numbered_findings(docs: &[RetrievedDoc]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            let body = if doc.summary.is_empty() {
                &doc.content
            } else {
                &doc.summary
            };
            format!("{}. {}", i + 1, body.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Safety-first responder for e-stop, relay, and guarding questions
pub struct SafetyAgent;

#[async_trait]
impl SmeAgent for SafetyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Safety
    }

    async fn draft(&self, intent: &Intent, docs: &[RetrievedDoc], _query: &str) -> Result<String> {
        let mut text = String::from(
            "This involves a safety function, so treat the machine as unsafe until the \
             circuit is verified.\n\n",
        );

        if docs.is_empty() {
            text.push_str(&format!(
                "No validated procedure is on file yet for this {}. General guidance:\n\
                 1. Verify the supply and reset channel wiring against the relay datasheet.\n\
                 2. Check every interlock and e-stop contact in the chain for continuity.\n\
                 3. Confirm the monitored feedback loop closes before reset is attempted.\n\
                 Have a qualified person validate the circuit before returning to service.",
                intent.equipment_type.display_name()
            ));
        } else {
            text.push_str("Verified guidance from the knowledge base:\n");
            text.push_str(&numbered_findings(docs));
            text.push_str(
                "\n\nAfter any change, re-validate the safety function per the applicable \
                 standard before restarting production.",
            );
        }

        Ok(text)
    }
}

/// Vendor-specialist responder, phrased around the vendor's documentation
pub struct VendorAgent {
    pub vendor: Vendor,
}

#[async_trait]
impl SmeAgent for VendorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Vendor(self.vendor)
    }

    async fn draft(&self, intent: &Intent, docs: &[RetrievedDoc], _query: &str) -> Result<String> {
        let mut text = String::new();

        if docs.is_empty() {
            text.push_str(&format!(
                "There is no {} material on file for this yet. Based on typical {} behavior:\n\
                 1. Record the exact fault code and LED states from the unit.\n\
                 2. Cycle control power and note whether the fault returns immediately or under load.\n\
                 3. Compare parameter settings against the commissioning sheet.",
                self.vendor.display_name(),
                intent.equipment_type.display_name()
            ));
            if let Some(host) = self.vendor.portal_host() {
                text.push_str(&format!(
                    "\nThe official documentation portal ({}) covers this series in detail.",
                    host
                ));
            }
        } else {
            text.push_str(&format!(
                "Per {} documentation:\n",
                self.vendor.display_name()
            ));
            text.push_str(&numbered_findings(docs));
        }

        if !intent.fault_codes.is_empty() {
            text.push_str(&format!(
                "\n\nReported code(s): {}.",
                intent.fault_codes.join(", ")
            ));
        }

        Ok(text)
    }
}

/// Fallback responder when no specialist applies
pub struct GenericAgent;

#[async_trait]
impl SmeAgent for GenericAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Generic
    }

    async fn draft(&self, _intent: &Intent, docs: &[RetrievedDoc], _query: &str) -> Result<String> {
        if docs.is_empty() {
            return Ok(
                "Nothing specific is on file for this yet. A systematic starting point:\n\
                 1. Reproduce the problem and note exactly when it occurs.\n\
                 2. Inspect power, connections, and mechanical condition.\n\
                 3. Isolate the faulty section by splitting the system at test points."
                    .to_string(),
            );
        }

        let mut text = String::from("From the knowledge base:\n");
        text.push_str(&numbered_findings(docs));
        Ok(text)
    }
}
