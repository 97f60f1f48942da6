//! Extracted query intent and the closed vendor/equipment vocabularies
//!
//! The intent collaborator produces one `Intent` per request; it is
//! immutable from then on. Vendor and equipment enums are closed sets so
//! downstream matching (agent selection, filters, search terms) stays
//! exhaustive.

use serde::{Deserialize, Serialize};

/// Safety-related keywords checked in symptom and query text.
///
/// Shared by agent selection and gap prioritization so both agree on what
/// counts as a safety question. All entries lowercase.
pub const SAFETY_KEYWORDS: &[&str] = &[
    "e-stop",
    "estop",
    "emergency stop",
    "safety relay",
    "safety circuit",
    "safety interlock",
    "sil rating",
    "sil 2",
    "sil 3",
    "category 3",
    "category 4",
    "performance level",
    "iso 13849",
    "iec 62061",
    "light curtain",
    "two-hand control",
    "lockout",
    "tagout",
    "arc flash",
];

/// Check text for any safety keyword (case-insensitive)
pub fn contains_safety_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    SAFETY_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Recognized equipment manufacturers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Siemens,
    AllenBradley,
    Abb,
    Fanuc,
    Mitsubishi,
    Omron,
    Schneider,
    Yaskawa,
    /// No specific manufacturer identified
    Generic,
}

impl Vendor {
    /// Detect a vendor from free text, first match wins
    pub fn detect(text: &str) -> Vendor {
        let lower = text.to_lowercase();
        if lower.contains("siemens") || lower.contains("sinamics") || lower.contains("simatic") {
            Vendor::Siemens
        } else if lower.contains("allen-bradley")
            || lower.contains("allen bradley")
            || lower.contains("rockwell")
            || lower.contains("powerflex")
            || lower.contains("compactlogix")
            || lower.contains("controllogix")
        {
            Vendor::AllenBradley
        } else if lower.contains("abb") || lower.contains("acs880") || lower.contains("acs580") {
            Vendor::Abb
        } else if lower.contains("fanuc") {
            Vendor::Fanuc
        } else if lower.contains("mitsubishi") || lower.contains("melsec") {
            Vendor::Mitsubishi
        } else if lower.contains("omron") {
            Vendor::Omron
        } else if lower.contains("schneider") || lower.contains("altivar") || lower.contains("modicon")
        {
            Vendor::Schneider
        } else if lower.contains("yaskawa") {
            Vendor::Yaskawa
        } else {
            Vendor::Generic
        }
    }

    /// Human-readable vendor name
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Siemens => "Siemens",
            Vendor::AllenBradley => "Allen-Bradley",
            Vendor::Abb => "ABB",
            Vendor::Fanuc => "FANUC",
            Vendor::Mitsubishi => "Mitsubishi Electric",
            Vendor::Omron => "Omron",
            Vendor::Schneider => "Schneider Electric",
            Vendor::Yaskawa => "Yaskawa",
            Vendor::Generic => "Generic",
        }
    }

    /// Stable tag used in store payloads and filters, matches the serde form
    pub fn tag(&self) -> &'static str {
        match self {
            Vendor::Siemens => "siemens",
            Vendor::AllenBradley => "allen_bradley",
            Vendor::Abb => "abb",
            Vendor::Fanuc => "fanuc",
            Vendor::Mitsubishi => "mitsubishi",
            Vendor::Omron => "omron",
            Vendor::Schneider => "schneider",
            Vendor::Yaskawa => "yaskawa",
            Vendor::Generic => "generic",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Vendor> {
        match tag {
            "siemens" => Some(Vendor::Siemens),
            "allen_bradley" => Some(Vendor::AllenBradley),
            "abb" => Some(Vendor::Abb),
            "fanuc" => Some(Vendor::Fanuc),
            "mitsubishi" => Some(Vendor::Mitsubishi),
            "omron" => Some(Vendor::Omron),
            "schneider" => Some(Vendor::Schneider),
            "yaskawa" => Some(Vendor::Yaskawa),
            "generic" => Some(Vendor::Generic),
            _ => None,
        }
    }

    /// Documentation portal host used in vendor-site search hints
    pub fn portal_host(&self) -> Option<&'static str> {
        match self {
            Vendor::Siemens => Some("support.industry.siemens.com"),
            Vendor::AllenBradley => Some("rockwellautomation.com"),
            Vendor::Abb => Some("library.abb.com"),
            Vendor::Fanuc => Some("fanucamerica.com"),
            Vendor::Mitsubishi => Some("mitsubishielectric.com"),
            Vendor::Omron => Some("automation.omron.com"),
            Vendor::Schneider => Some("se.com"),
            Vendor::Yaskawa => Some("yaskawa.com"),
            Vendor::Generic => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Vendor::Generic)
    }
}

/// Recognized equipment categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    Vfd,
    Plc,
    SafetyRelay,
    Hmi,
    ServoDrive,
    Sensor,
    MotorStarter,
    Unknown,
}

impl EquipmentType {
    /// Detect an equipment type from free text, first match wins
    pub fn detect(text: &str) -> EquipmentType {
        let lower = text.to_lowercase();
        if lower.contains("safety relay") || lower.contains("safety controller") {
            EquipmentType::SafetyRelay
        } else if lower.contains("vfd")
            || lower.contains("variable frequency")
            || lower.contains("drive fault")
            || lower.contains("inverter")
        {
            EquipmentType::Vfd
        } else if lower.contains("servo") {
            EquipmentType::ServoDrive
        } else if lower.contains("plc") || lower.contains("controller") || lower.contains("ladder") {
            EquipmentType::Plc
        } else if lower.contains("hmi") || lower.contains("touchscreen") || lower.contains("panel")
        {
            EquipmentType::Hmi
        } else if lower.contains("sensor")
            || lower.contains("proximity")
            || lower.contains("photoeye")
        {
            EquipmentType::Sensor
        } else if lower.contains("motor starter")
            || lower.contains("contactor")
            || lower.contains("overload relay")
        {
            EquipmentType::MotorStarter
        } else {
            EquipmentType::Unknown
        }
    }

    /// Human-readable equipment name, also used as a search token
    pub fn display_name(&self) -> &'static str {
        match self {
            EquipmentType::Vfd => "VFD",
            EquipmentType::Plc => "PLC",
            EquipmentType::SafetyRelay => "safety relay",
            EquipmentType::Hmi => "HMI",
            EquipmentType::ServoDrive => "servo drive",
            EquipmentType::Sensor => "sensor",
            EquipmentType::MotorStarter => "motor starter",
            EquipmentType::Unknown => "equipment",
        }
    }

    /// Stable tag used in store payloads and filters, matches the serde form
    pub fn tag(&self) -> &'static str {
        match self {
            EquipmentType::Vfd => "vfd",
            EquipmentType::Plc => "plc",
            EquipmentType::SafetyRelay => "safety_relay",
            EquipmentType::Hmi => "hmi",
            EquipmentType::ServoDrive => "servo_drive",
            EquipmentType::Sensor => "sensor",
            EquipmentType::MotorStarter => "motor_starter",
            EquipmentType::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Option<EquipmentType> {
        match tag {
            "vfd" => Some(EquipmentType::Vfd),
            "plc" => Some(EquipmentType::Plc),
            "safety_relay" => Some(EquipmentType::SafetyRelay),
            "hmi" => Some(EquipmentType::Hmi),
            "servo_drive" => Some(EquipmentType::ServoDrive),
            "sensor" => Some(EquipmentType::Sensor),
            "motor_starter" => Some(EquipmentType::MotorStarter),
            "unknown" => Some(EquipmentType::Unknown),
            _ => None,
        }
    }

    pub fn is_safety_related(&self) -> bool {
        matches!(self, EquipmentType::SafetyRelay)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EquipmentType::Unknown)
    }
}

/// Structured intent extracted from a raw query, immutable per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub vendor: Vendor,
    pub equipment_type: EquipmentType,
    pub symptom: String,
    pub fault_codes: Vec<String>,
    /// Extraction confidence in [0, 1]
    pub confidence: f32,
    pub raw_summary: String,
}

impl Intent {
    /// True when the question concerns safety equipment or safety keywords
    /// appear in the symptom text
    pub fn is_safety_related(&self) -> bool {
        self.equipment_type.is_safety_related() || contains_safety_keywords(&self.symptom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_detection() {
        assert_eq!(Vendor::detect("Siemens G120 fault F30005"), Vendor::Siemens);
        assert_eq!(Vendor::detect("powerflex 525 wont start"), Vendor::AllenBradley);
        assert_eq!(Vendor::detect("my pump is leaking"), Vendor::Generic);
    }

    #[test]
    fn test_vendor_portal_host() {
        assert_eq!(
            Vendor::Siemens.portal_host(),
            Some("support.industry.siemens.com")
        );
        assert_eq!(Vendor::Generic.portal_host(), None);
    }

    #[test]
    fn test_equipment_detection() {
        assert_eq!(
            EquipmentType::detect("PILZ safety relay not resetting"),
            EquipmentType::SafetyRelay
        );
        assert_eq!(EquipmentType::detect("VFD overcurrent trip"), EquipmentType::Vfd);
        assert_eq!(EquipmentType::detect("conveyor is noisy"), EquipmentType::Unknown);
    }

    #[test]
    fn test_safety_keyword_matching() {
        assert!(contains_safety_keywords("the E-Stop will not reset"));
        assert!(contains_safety_keywords("needs Category 3 circuit"));
        assert!(!contains_safety_keywords("bearing noise on conveyor"));
    }

    #[test]
    fn test_intent_safety_related() {
        let intent = Intent {
            vendor: Vendor::Generic,
            equipment_type: EquipmentType::Vfd,
            symptom: "e-stop not resetting".to_string(),
            fault_codes: vec![],
            confidence: 0.9,
            raw_summary: String::new(),
        };
        assert!(intent.is_safety_related());

        let relay = Intent {
            vendor: Vendor::Siemens,
            equipment_type: EquipmentType::SafetyRelay,
            symptom: "output stuck".to_string(),
            fault_codes: vec![],
            confidence: 0.9,
            raw_summary: String::new(),
        };
        assert!(relay.is_safety_related());
    }
}
