//! Response synthesis: pure post-processing over a drafted answer.
//!
//! No network, no storage. The synthesizer decorates a draft with safety
//! notices, citation markers, step checkboxes, and a confidence badge,
//! each independently switchable in configuration.

use crate::config::SynthesisConfig;
use crate::coverage::CoverageLevel;
use crate::knowledge::RetrievedDoc;
use crate::types::{Citation, Intent};

/// Draft text mentioning any of these gets the DANGER treatment.
const HIGH_VOLTAGE_TERMS: &[&str] = &[
    "high voltage",
    "high-voltage",
    "arc flash",
    "arc-flash",
    "medium voltage",
    "480v",
    "480 v",
    "600v",
    "600 v",
];

/// Stored-energy hazards get the discharge warning.
const DRIVE_TERMS: &[&str] = &["vfd", "drive", "capacitor", "dc bus"];

const LOTO_REMINDER: &str = "Reminder: follow your site lockout/tagout procedure before \
                             working on this equipment.";

/// Words taken from a doc to locate its first reference in the draft.
const SIGNATURE_WORDS: usize = 8;

#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub safety_warnings: Vec<String>,
}

pub struct ResponseSynthesizer {
    config: SynthesisConfig,
}

impl ResponseSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Decorate `draft`. With every flag disabled the draft passes through
    /// unchanged.
    pub fn synthesize(
        &self,
        draft: &str,
        docs: &[RetrievedDoc],
        intent: &Intent,
        coverage: CoverageLevel,
    ) -> SynthesizedAnswer {
        let (mut body, citations) = if self.config.citations {
            apply_citations(draft, docs)
        } else {
            (draft.to_string(), Vec::new())
        };

        if self.config.step_checkboxes {
            body = checkbox_steps(&body);
        }

        // Hazard scan runs over the original draft so citation markers and
        // checkboxes cannot mask a keyword.
        let (leading_notice, trailing_notice) = if self.config.safety_warnings {
            safety_notice(draft, intent)
        } else {
            (None, None)
        };

        let badge = if self.config.confidence_badge {
            Some(badge_line(coverage).to_string())
        } else {
            None
        };

        let mut safety_warnings = Vec::new();
        let mut sections: Vec<String> = Vec::new();
        if let Some(badge) = badge {
            sections.push(badge);
        }
        if let Some(notice) = leading_notice {
            safety_warnings.push(notice.clone());
            sections.push(notice);
        }
        sections.push(body);
        if let Some(notice) = trailing_notice {
            safety_warnings.push(notice.clone());
            sections.push(notice);
        }
        if let Some(footer) = citation_footer(&citations) {
            sections.push(footer);
        }

        SynthesizedAnswer {
            text: sections.join("\n\n"),
            citations,
            safety_warnings,
        }
    }
}

/// DANGER and WARNING notices lead the answer; the default lockout/tagout
/// reminder trails it. Exactly one of the three applies.
fn safety_notice(draft: &str, intent: &Intent) -> (Option<String>, Option<String>) {
    let lower = draft.to_lowercase();

    if HIGH_VOLTAGE_TERMS.iter().any(|term| lower.contains(term)) {
        return (Some(danger_block()), None);
    }
    if DRIVE_TERMS.iter().any(|term| lower.contains(term)) {
        return (Some(discharge_warning(intent)), None);
    }
    (None, Some(LOTO_REMINDER.to_string()))
}

fn danger_block() -> String {
    "DANGER: this work involves potentially lethal voltage. De-energize the equipment, \
     apply lockout/tagout, and verify zero energy at the point of work before any contact. \
     Follow NFPA 70E arc-flash boundaries and wear the PPE your site assessment requires."
        .to_string()
}

fn discharge_warning(intent: &Intent) -> String {
    let vendor = if intent.vendor.is_generic() {
        "The".to_string()
    } else {
        intent.vendor.display_name().to_string()
    };
    format!(
        "WARNING: {} drive DC bus capacitors hold a charge after power-off. Wait at least \
         5 minutes, then verify discharge with a multimeter rated for the bus voltage \
         before touching any terminal.",
        vendor
    )
}

fn badge_line(coverage: CoverageLevel) -> &'static str {
    match coverage {
        CoverageLevel::Strong => "Confidence: high (strong knowledge-base coverage).",
        CoverageLevel::Thin => "Confidence: limited (thin knowledge-base coverage).",
        CoverageLevel::None => {
            "Confidence: low (no knowledge-base coverage). Consider escalating to a \
             qualified expert."
        }
    }
}

/// Insert `[n]` at each doc's first textual reference and collect citation
/// entries. Docs never referenced in the draft are skipped so the numbering
/// stays contiguous.
fn apply_citations(draft: &str, docs: &[RetrievedDoc]) -> (String, Vec<Citation>) {
    let mut lines: Vec<String> = draft.lines().map(String::from).collect();
    let mut citations: Vec<Citation> = Vec::new();

    for doc in docs {
        let signature = doc_signature(doc);
        if signature.is_empty() {
            continue;
        }
        if let Some(line) = lines
            .iter_mut()
            .find(|line| line.to_lowercase().contains(&signature))
        {
            let number = citations.len() + 1;
            line.push_str(&format!(" [{}]", number));
            citations.push(Citation {
                number,
                atom_id: doc.atom_id.clone(),
                title: doc.title.clone(),
                page_number: doc.page_number,
                source: doc.source.clone(),
            });
        }
    }

    (lines.join("\n"), citations)
}

fn doc_signature(doc: &RetrievedDoc) -> String {
    let body = if doc.summary.is_empty() {
        &doc.content
    } else {
        &doc.summary
    };
    body.split_whitespace()
        .take(SIGNATURE_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn citation_footer(citations: &[Citation]) -> Option<String> {
    if citations.is_empty() {
        return None;
    }
    let mut footer = String::from("Sources:");
    for citation in citations {
        footer.push('\n');
        footer.push_str(&format!("[{}] {}", citation.number, citation.title));
        if let Some(page) = citation.page_number {
            footer.push_str(&format!(", Page {}", page));
        }
        if let Some(source) = &citation.source {
            footer.push_str(&format!(" ({})", source));
        }
    }
    Some(footer)
}

/// Prefix each step of a numbered sequence with an unchecked box. A lone
/// numbered line is not a sequence and passes through untouched.
fn checkbox_steps(body: &str) -> String {
    let step_count = body.lines().filter(|line| is_step_line(line)).count();
    if step_count < 2 {
        return body.to_string();
    }

    body.lines()
        .map(|line| {
            if is_step_line(line) {
                format!("- [ ] {}", line.trim_start())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_step_line(line: &str) -> bool {
    let trimmed = line.trim_start();

    let lower = trimmed.to_lowercase();
    if let Some(rest) = lower.strip_prefix("step ") {
        return rest.chars().next().is_some_and(|c| c.is_ascii_digit());
    }

    let digits = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return false;
    }
    let mut rest = trimmed.chars().skip(digits);
    matches!(rest.next(), Some('.') | Some(')')) && matches!(rest.next(), Some(' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquipmentType, Vendor};

    fn intent(vendor: Vendor) -> Intent {
        Intent {
            vendor,
            equipment_type: EquipmentType::Vfd,
            symptom: "overvoltage trip".to_string(),
            fault_codes: Vec::new(),
            confidence: 0.8,
            raw_summary: String::new(),
        }
    }

    fn doc(atom_id: &str, title: &str, summary: &str, page: Option<u32>) -> RetrievedDoc {
        RetrievedDoc {
            atom_id: atom_id.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            content: String::new(),
            similarity: 0.9,
            vendor: None,
            equipment_type: None,
            source: Some(format!("https://docs.example.com/{}", atom_id)),
            page_number: page,
        }
    }

    fn all_on() -> ResponseSynthesizer {
        ResponseSynthesizer::new(SynthesisConfig::default())
    }

    #[test]
    fn danger_outranks_discharge_warning() {
        let synth = all_on();
        let draft = "Check the VFD cabinet; arc flash risk at the incoming terminals.";
        let answer = synth.synthesize(draft, &[], &intent(Vendor::Siemens), CoverageLevel::Thin);

        assert_eq!(answer.safety_warnings.len(), 1);
        assert!(answer.safety_warnings[0].starts_with("DANGER:"));
        assert!(answer.text.contains("NFPA 70E"));
        assert!(!answer.text.contains("WARNING:"));
    }

    #[test]
    fn drive_mention_gets_vendor_aware_discharge_warning() {
        let synth = all_on();
        let draft = "Measure the dc bus before replacing the precharge resistor.";
        let answer = synth.synthesize(draft, &[], &intent(Vendor::Abb), CoverageLevel::Strong);

        assert_eq!(answer.safety_warnings.len(), 1);
        assert!(answer.safety_warnings[0].starts_with("WARNING: ABB"));
        assert!(answer.safety_warnings[0].contains("multimeter"));
    }

    #[test]
    fn safety_notice_is_never_omitted() {
        let synth = all_on();
        let draft = "Swap the fan filter and log the maintenance interval.";
        let answer = synth.synthesize(draft, &[], &intent(Vendor::Generic), CoverageLevel::Strong);

        assert_eq!(answer.safety_warnings.len(), 1);
        assert!(answer.safety_warnings[0].contains("lockout/tagout"));
        // The default reminder trails the body.
        assert!(answer.text.ends_with(LOTO_REMINDER));
    }

    #[test]
    fn safety_flag_off_suppresses_all_notices() {
        let config = SynthesisConfig {
            safety_warnings: false,
            ..SynthesisConfig::default()
        };
        let synth = ResponseSynthesizer::new(config);
        let draft = "arc flash hazard at the bus bars";
        let answer = synth.synthesize(draft, &[], &intent(Vendor::Siemens), CoverageLevel::Thin);

        assert!(answer.safety_warnings.is_empty());
        assert!(!answer.text.contains("DANGER"));
    }

    #[test]
    fn citations_marked_at_first_reference_with_footer() {
        let synth = ResponseSynthesizer::new(SynthesisConfig {
            safety_warnings: false,
            confidence_badge: false,
            step_checkboxes: false,
            citations: true,
        });
        let docs = vec![
            doc(
                "atom-1",
                "G120 List Manual",
                "F30005 indicates overload of the power unit",
                Some(412),
            ),
            doc("atom-2", "Commissioning Guide", "check the supply voltage tolerance", None),
        ];
        let draft = "1. F30005 indicates overload of the power unit.\n\
                     2. Check the supply voltage tolerance at the input terminals.";
        let answer = synth.synthesize(draft, &docs, &intent(Vendor::Siemens), CoverageLevel::Strong);

        assert!(answer.text.contains("power unit. [1]"));
        assert!(answer.text.contains("input terminals. [2]"));
        assert_eq!(answer.citations.len(), 2);
        assert!(answer
            .text
            .contains("[1] G120 List Manual, Page 412 (https://docs.example.com/atom-1)"));
        // No page number on the second source.
        assert!(answer
            .text
            .contains("[2] Commissioning Guide (https://docs.example.com/atom-2)"));
    }

    #[test]
    fn unreferenced_doc_keeps_numbering_contiguous() {
        let synth = ResponseSynthesizer::new(SynthesisConfig {
            safety_warnings: false,
            confidence_badge: false,
            step_checkboxes: false,
            citations: true,
        });
        let docs = vec![
            doc("atom-1", "Manual A", "the braking resistor rating", Some(10)),
            doc("atom-2", "Manual B", "text that never appears anywhere", None),
            doc("atom-3", "Manual C", "ramp-down time configuration", Some(33)),
        ];
        let draft = "Check the braking resistor rating first.\n\
                     Then review ramp-down time configuration.";
        let answer = synth.synthesize(draft, &docs, &intent(Vendor::Generic), CoverageLevel::Thin);

        assert_eq!(answer.citations.len(), 2);
        assert_eq!(answer.citations[0].number, 1);
        assert_eq!(answer.citations[1].number, 2);
        assert_eq!(answer.citations[1].atom_id, "atom-3");
        assert!(answer.text.contains("[2] Manual C, Page 33"));
        assert!(!answer.text.contains("Manual B"));
    }

    #[test]
    fn no_docs_means_no_markers_and_no_footer() {
        let synth = all_on();
        let answer = synth.synthesize(
            "Plain advice with no sources.",
            &[],
            &intent(Vendor::Generic),
            CoverageLevel::None,
        );
        assert!(answer.citations.is_empty());
        assert!(!answer.text.contains("Sources:"));
        assert!(!answer.text.contains("[1]"));
    }

    #[test]
    fn numbered_sequence_gets_checkboxes() {
        let body = "Do this in order:\n1. Isolate the supply.\n2. Verify zero energy.\n3) Replace the contactor.";
        let boxed = checkbox_steps(body);
        assert!(boxed.contains("- [ ] 1. Isolate the supply."));
        assert!(boxed.contains("- [ ] 2. Verify zero energy."));
        assert!(boxed.contains("- [ ] 3) Replace the contactor."));
        assert!(boxed.starts_with("Do this in order:"));
    }

    #[test]
    fn lone_numbered_line_is_not_a_sequence() {
        let body = "See note 1 below.\n1. A single item.";
        assert_eq!(checkbox_steps(body), body);
    }

    #[test]
    fn step_keyword_lines_count_as_steps() {
        let body = "Step 1: isolate.\nStep 2: verify.";
        let boxed = checkbox_steps(body);
        assert!(boxed.contains("- [ ] Step 1: isolate."));
        assert!(boxed.contains("- [ ] Step 2: verify."));
    }

    #[test]
    fn badge_follows_coverage() {
        let synth = ResponseSynthesizer::new(SynthesisConfig {
            safety_warnings: false,
            confidence_badge: true,
            step_checkboxes: false,
            citations: false,
        });
        let strong = synth.synthesize("x", &[], &intent(Vendor::Generic), CoverageLevel::Strong);
        assert!(strong.text.starts_with("Confidence: high"));

        let none = synth.synthesize("x", &[], &intent(Vendor::Generic), CoverageLevel::None);
        assert!(none.text.contains("escalating to a qualified expert"));
    }

    #[test]
    fn all_flags_off_passes_draft_through() {
        let synth = ResponseSynthesizer::new(SynthesisConfig {
            citations: false,
            safety_warnings: false,
            step_checkboxes: false,
            confidence_badge: false,
        });
        let draft = "1. Check wiring.\n2. Check fuses.\narc flash mention";
        let answer = synth.synthesize(
            draft,
            &[doc("a", "T", "check wiring", None)],
            &intent(Vendor::Siemens),
            CoverageLevel::Strong,
        );
        assert_eq!(answer.text, draft);
        assert!(answer.citations.is_empty());
        assert!(answer.safety_warnings.is_empty());
    }
}
