//! Engine configuration
//!
//! Loaded once at startup from `~/.rivet/config.toml` and immutable after.
//! Coverage thresholds live here and nowhere else; every module reads the
//! same two cutoffs. `validate()` failures are the only fatal errors in the
//! system and surface before any request is handled.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{Result, RivetError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RivetConfig {
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub gaps: GapsConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Document-count thresholds for coverage classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Minimum documents for THIN coverage
    pub thin_min: usize,
    /// Minimum documents for STRONG coverage
    pub strong_min: usize,
    /// Top-k used by the coverage probe retrieval
    pub probe_top_k: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            thin_min: 2,
            strong_min: 5,
            probe_top_k: 20,
        }
    }
}

/// Route-decision parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Intent confidence below this routes to clarification
    pub clarity_threshold: f32,
    /// Top-k documents used to ground an answer
    pub answer_top_k: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            clarity_threshold: 0.45,
            answer_top_k: 5,
        }
    }
}

/// Research pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Cap on sources queued per run
    pub max_sources: usize,
    /// Per-provider call timeout
    pub provider_timeout_secs: u64,
    /// Wall-clock budget for one pipeline run, including retries
    pub run_budget_secs: u64,
    /// Completion window reported to the user
    pub eta_minutes: u32,
    /// Topical communities searched by the link-aggregator provider
    pub subreddits: Vec<String>,
    /// Stack Exchange site slug searched by the Q&A provider
    pub stackexchange_site: String,
    /// User agent sent to forum APIs
    pub user_agent: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_sources: 10,
            provider_timeout_secs: 15,
            run_budget_secs: 120,
            eta_minutes: 30,
            subreddits: vec![
                "PLC".to_string(),
                "IndustrialMaintenance".to_string(),
                "electricians".to_string(),
            ],
            stackexchange_site: "stackoverflow".to_string(),
            user_agent: "rivet/0.3 (industrial-maintenance research)".to_string(),
        }
    }
}

/// Gap logging parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapsConfig {
    /// Rolling window for unresolved-gap deduplication
    pub dedup_window_days: i64,
}

impl Default for GapsConfig {
    fn default() -> Self {
        Self { dedup_window_days: 7 }
    }
}

/// Response post-processing toggles, each independent of the others
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub citations: bool,
    pub safety_warnings: bool,
    pub step_checkboxes: bool,
    pub confidence_badge: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            citations: true,
            safety_warnings: true,
            step_checkboxes: true,
            confidence_badge: true,
        }
    }
}

/// Knowledge store connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub qdrant_url: String,
    pub collection: String,
    /// Minimum similarity for a probe hit
    pub score_threshold: f32,
    pub vector_size: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "knowledge_atoms".to_string(),
            score_threshold: 0.35,
            vector_size: 768,
        }
    }
}

/// Gap, fingerprint, and queue database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            db_path: home.join(".rivet").join("rivet.db"),
        }
    }
}

impl RivetConfig {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        if !config_path.exists() {
            let config = RivetConfig::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .map_err(|e| RivetError::Config(format!("failed to read {:?}: {}", config_path, e)))?;

        let config: RivetConfig = toml::from_str(&contents)
            .map_err(|e| RivetError::Config(format!("failed to parse {:?}: {}", config_path, e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RivetError::Config(format!("failed to create {:?}: {}", parent, e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RivetError::Config(format!("failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| RivetError::Config(format!("failed to write {:?}: {}", config_path, e)))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RivetError::Config("could not determine home directory".to_string()))?;

        Ok(home.join(".rivet").join("config.toml"))
    }

    /// Check the loaded values; called at startup, before any request
    pub fn validate(&self) -> Result<()> {
        if self.coverage.thin_min == 0 {
            return Err(RivetError::Config("coverage.thin_min must be at least 1".to_string()));
        }
        if self.coverage.strong_min <= self.coverage.thin_min {
            return Err(RivetError::Config(format!(
                "coverage.strong_min ({}) must exceed thin_min ({})",
                self.coverage.strong_min, self.coverage.thin_min
            )));
        }
        if self.coverage.probe_top_k < self.coverage.strong_min {
            return Err(RivetError::Config(format!(
                "coverage.probe_top_k ({}) must be at least strong_min ({})",
                self.coverage.probe_top_k, self.coverage.strong_min
            )));
        }
        if !(0.0..=1.0).contains(&self.routing.clarity_threshold) {
            return Err(RivetError::Config(format!(
                "routing.clarity_threshold ({}) must be within 0..=1",
                self.routing.clarity_threshold
            )));
        }
        if self.routing.answer_top_k == 0 {
            return Err(RivetError::Config("routing.answer_top_k must be at least 1".to_string()));
        }
        if self.research.max_sources == 0 {
            return Err(RivetError::Config("research.max_sources must be at least 1".to_string()));
        }
        if self.research.provider_timeout_secs == 0 || self.research.run_budget_secs == 0 {
            return Err(RivetError::Config(
                "research timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.research.user_agent.trim().is_empty() {
            return Err(RivetError::Config("research.user_agent must not be empty".to_string()));
        }
        if self.research.stackexchange_site.trim().is_empty() {
            return Err(RivetError::Config(
                "research.stackexchange_site must not be empty".to_string(),
            ));
        }
        if self.research.subreddits.is_empty() {
            return Err(RivetError::Config(
                "research.subreddits must name at least one community".to_string(),
            ));
        }
        if self.gaps.dedup_window_days < 1 {
            return Err(RivetError::Config("gaps.dedup_window_days must be at least 1".to_string()));
        }
        if self.knowledge.qdrant_url.trim().is_empty() {
            return Err(RivetError::Config("knowledge.qdrant_url must not be empty".to_string()));
        }
        if self.knowledge.collection.trim().is_empty() {
            return Err(RivetError::Config("knowledge.collection must not be empty".to_string()));
        }
        if self.knowledge.vector_size == 0 {
            return Err(RivetError::Config("knowledge.vector_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Override the database path
    pub fn with_db_path(mut self, path: PathBuf) -> Self {
        self.storage.db_path = path;
        self
    }

    /// Override the coverage thresholds
    pub fn with_coverage_thresholds(mut self, thin_min: usize, strong_min: usize) -> Self {
        self.coverage.thin_min = thin_min;
        self.coverage.strong_min = strong_min;
        self
    }

    /// Override the clarification threshold
    pub fn with_clarity_threshold(mut self, threshold: f32) -> Self {
        self.routing.clarity_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = RivetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coverage.thin_min, 2);
        assert_eq!(config.coverage.strong_min, 5);
        assert_eq!(config.gaps.dedup_window_days, 7);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = RivetConfig::default().with_coverage_thresholds(5, 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_thin_min() {
        let config = RivetConfig::default().with_coverage_thresholds(0, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_clarity() {
        let config = RivetConfig::default().with_clarity_threshold(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RivetConfig::default();
        let toml_string = toml::to_string(&config).unwrap();
        assert!(toml_string.contains("thin_min"));
        assert!(toml_string.contains("qdrant_url"));

        let deserialized: RivetConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.coverage.strong_min, 5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let partial = "[coverage]\nthin_min = 3\nstrong_min = 8\nprobe_top_k = 25\n";
        let config: RivetConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.coverage.thin_min, 3);
        assert_eq!(config.routing.answer_top_k, 5);
        assert!(config.synthesis.citations);
    }
}
