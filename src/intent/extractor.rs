//! Intent extraction seam and keyword default

use async_trait::async_trait;
use regex::Regex;

use crate::errors::{Result, RivetError};
use crate::types::{EquipmentType, Intent, Vendor};

/// Turns raw query text into a structured intent
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Intent>;
}

/// Keyword-driven extractor.
///
/// Confidence is a bounded weighted sum of what was recognized: vendor,
/// equipment type, fault codes, and symptom vocabulary. Vague one-liners
/// land under the clarification threshold; specific fault reports land
/// well above it.
pub struct KeywordIntentExtractor {
    fault_code_re: Regex,
}

const SYMPTOM_KEYWORDS: &[&str] = &[
    "fault", "error", "alarm", "trip", "won't", "wont", "not working", "does not",
    "doesn't", "fails", "failure", "stuck", "reset", "noise", "overheat", "intermittent",
];

impl KeywordIntentExtractor {
    pub fn new() -> Result<Self> {
        let fault_code_re = Regex::new(r"\b(?:F|E|A|AL|ERR|FL)[-\s]?\d{1,5}\b")
            .map_err(|e| RivetError::Internal(format!("fault code pattern: {}", e)))?;
        Ok(Self { fault_code_re })
    }

    fn extract_fault_codes(&self, text: &str) -> Vec<String> {
        let upper = text.to_uppercase();
        let mut codes = Vec::new();
        for m in self.fault_code_re.find_iter(&upper) {
            let normalized: String = m.as_str().chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
            if !codes.contains(&normalized) {
                codes.push(normalized);
            }
        }
        codes
    }

    fn score_confidence(
        vendor: Vendor,
        equipment: EquipmentType,
        fault_codes: &[String],
        text: &str,
    ) -> f32 {
        let lower = text.to_lowercase();
        let mut confidence: f32 = 0.3;

        if !vendor.is_generic() {
            confidence += 0.2;
        }
        if equipment.is_known() {
            confidence += 0.2;
        }
        if !fault_codes.is_empty() {
            confidence += 0.15;
        }
        if SYMPTOM_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            confidence += 0.1;
        }
        if lower.split_whitespace().count() < 3 {
            confidence -= 0.2;
        }

        confidence.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl IntentExtractor for KeywordIntentExtractor {
    async fn extract(&self, text: &str) -> Result<Intent> {
        let vendor = Vendor::detect(text);
        let equipment_type = EquipmentType::detect(text);
        let fault_codes = self.extract_fault_codes(text);
        let symptom = text.trim().to_string();
        let confidence = Self::score_confidence(vendor, equipment_type, &fault_codes, text);

        let raw_summary = format!(
            "vendor={} equipment={} codes=[{}]",
            vendor.display_name(),
            equipment_type.display_name(),
            fault_codes.join(", ")
        );

        Ok(Intent {
            vendor,
            equipment_type,
            symptom,
            fault_codes,
            confidence,
            raw_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extracts_vendor_equipment_and_codes() {
        let extractor = KeywordIntentExtractor::new().unwrap();
        let intent = extractor
            .extract("Siemens G120 VFD tripping on fault F30005 at startup")
            .await
            .unwrap();

        assert_eq!(intent.vendor, Vendor::Siemens);
        assert_eq!(intent.equipment_type, EquipmentType::Vfd);
        assert_eq!(intent.fault_codes, vec!["F30005"]);
        assert!(intent.confidence > 0.7);
    }

    #[tokio::test]
    async fn test_vague_query_scores_low() {
        let extractor = KeywordIntentExtractor::new().unwrap();
        let intent = extractor.extract("it's broken").await.unwrap();

        assert_eq!(intent.vendor, Vendor::Generic);
        assert_eq!(intent.equipment_type, EquipmentType::Unknown);
        assert!(intent.confidence < 0.45);
    }

    #[test]
    fn test_fault_codes_normalized_and_deduped() {
        let extractor = KeywordIntentExtractor::new().unwrap();
        let codes = extractor.extract_fault_codes("shows F 7 then F-7 then E21");
        assert_eq!(codes, vec!["F7", "E21"]);
    }

    #[tokio::test]
    async fn test_confidence_stays_in_bounds() {
        let extractor = KeywordIntentExtractor::new().unwrap();
        let intent = extractor
            .extract("Allen-Bradley PowerFlex 525 PLC fault error alarm trip F1 not working")
            .await
            .unwrap();
        assert!(intent.confidence <= 1.0);
        assert!(intent.confidence >= 0.0);
    }
}
