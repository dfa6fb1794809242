use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::StoreError;

/// Maximum evolution-log entries retained in the document.
pub const EVOLUTION_LOG_CAP: usize = 20;

/// Strategic posture of the agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Even weighting of growth and safety.
    Balanced,
    /// Chase order volume.
    VolumeGrowth,
    /// Position upmarket, defend margin.
    PremiumPositioning,
    /// Maximise net profit.
    ProfitMaximization,
    /// Undercut to win share.
    MarketPenetration,
}

impl StrategyMode {
    /// Snake-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::VolumeGrowth => "volume_growth",
            Self::PremiumPositioning => "premium_positioning",
            Self::ProfitMaximization => "profit_maximization",
            Self::MarketPenetration => "market_penetration",
        }
    }
}

/// Risk appetite; drives the confidence valve and arbitration weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    /// Conservative.
    Low,
    /// Default posture.
    Medium,
    /// Growth-leaning.
    High,
    /// Maximum growth weighting.
    Aggressive,
}

impl RiskTolerance {
    /// Minimum self-reported confidence required to act (inclusive).
    #[must_use]
    pub const fn confidence_threshold(self) -> f64 {
        match self {
            Self::Low => 0.85,
            Self::Medium => 0.70,
            Self::High | Self::Aggressive => 0.60,
        }
    }

    /// `(growth, safety)` weights for triangle arbitration.
    #[must_use]
    pub const fn arbitration_weights(self) -> (f64, f64) {
        match self {
            Self::High | Self::Aggressive => (0.7, 0.3),
            Self::Low | Self::Medium => (0.3, 0.7),
        }
    }

    /// Snake-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Aggressive => "aggressive",
        }
    }
}

/// The mutable strategy DNA.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyParameters {
    /// Strategic posture.
    pub mode: StrategyMode,
    /// Free-form tone used in prompt templating.
    pub tone: String,
    /// Risk appetite.
    pub risk_tolerance: RiskTolerance,
    /// Maximum fractional price move per decision, clamped to `[0.01, 0.20]`.
    pub price_step: f64,
}

impl StrategyParameters {
    /// Returns a copy with `price_step` clamped to the permitted range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.price_step = self.price_step.clamp(0.01, 0.20);
        self
    }
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Balanced,
            tone: "professional".into(),
            risk_tolerance: RiskTolerance::Medium,
            price_step: 0.05,
        }
    }
}

/// Document metadata with the monotonic evolution counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMeta {
    /// Semantic version string, opaque to the core.
    pub version: String,
    /// Strictly monotonic promotion counter.
    pub evolution_counter: u64,
    /// Timestamp of the last promotion.
    pub last_evolution: DateTime<Utc>,
}

/// Metrics captured at the moment a mutation was triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionTrigger {
    /// Window revenue in dollars.
    pub revenue: f64,
    /// Trend label at trigger time.
    pub trend: String,
    /// Composite health score at trigger time.
    pub health_score: f64,
}

/// One promotion recorded in the rolling evolution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionEntry {
    /// Promotion time.
    pub timestamp: DateTime<Utc>,
    /// Metrics that triggered the mutation.
    pub trigger: EvolutionTrigger,
    /// Parameters replaced by this promotion.
    pub old_params: StrategyParameters,
    /// Parameters promoted.
    pub new_params: StrategyParameters,
    /// LLM-provided rationale for the mutation.
    pub reasoning: String,
}

/// The versioned strategy configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Metadata and counters.
    pub meta: ConfigMeta,
    /// Prompt template with `{field}` placeholders for strategy parameters.
    pub system_prompt_template: String,
    /// Current strategy DNA.
    pub strategy_parameters: StrategyParameters,
    /// Rolling log of the last promotions (length ≤ 20).
    #[serde(default)]
    pub evolution_log: Vec<EvolutionEntry>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            meta: ConfigMeta {
                version: "1.0.0".into(),
                evolution_counter: 0,
                last_evolution: Utc::now(),
            },
            system_prompt_template: "You are an autonomous commerce strategist. \
                 Strategy mode: {mode}. Tone: {tone}. Risk tolerance: {risk_tolerance}."
                .into(),
            strategy_parameters: StrategyParameters::default(),
            evolution_log: Vec::new(),
        }
    }
}

/// Owner of the config document. Single writer (the evolver); the decision
/// engine hot-reads through [`ConfigStore::load`] at the start of each cycle.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl ConfigStore {
    /// Creates a store over the given config path and backup directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Config file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load; a missing or unparseable document is fatal to the cycle.
    pub fn load(&self) -> Result<ConfigDocument, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut doc: ConfigDocument = serde_json::from_str(&raw)?;
        doc.strategy_parameters = doc.strategy_parameters.clamped();
        Ok(doc)
    }

    /// Loads the document, bootstrapping a default one on first run.
    pub fn load_or_init(&self) -> Result<ConfigDocument, StoreError> {
        match self.load() {
            Err(StoreError::Missing(_)) => {
                let doc = ConfigDocument::default();
                self.write(&doc)?;
                Ok(doc)
            }
            other => other,
        }
    }

    /// Atomically promotes new strategy parameters.
    ///
    /// Backs up the current document under a name encoding the replaced
    /// counter, increments the counter, appends an evolution-log entry, and
    /// replaces the document via write-to-temporary-then-rename. Returns the
    /// new counter value.
    pub fn promote(
        &self,
        new_params: StrategyParameters,
        reasoning: impl Into<String>,
        trigger: EvolutionTrigger,
    ) -> Result<u64, StoreError> {
        let mut doc = self.load()?;
        self.backup(&doc)?;

        let old_params = doc.strategy_parameters.clone();
        let new_params = new_params.clamped();
        doc.meta.evolution_counter += 1;
        doc.meta.last_evolution = Utc::now();
        doc.strategy_parameters = new_params.clone();
        doc.evolution_log.push(EvolutionEntry {
            timestamp: doc.meta.last_evolution,
            trigger,
            old_params,
            new_params,
            reasoning: reasoning.into(),
        });
        let overflow = doc.evolution_log.len().saturating_sub(EVOLUTION_LOG_CAP);
        doc.evolution_log.drain(..overflow);

        self.write(&doc)?;
        Ok(doc.meta.evolution_counter)
    }

    fn backup(&self, doc: &ConfigDocument) -> Result<(), StoreError> {
        fs::create_dir_all(&self.backup_dir)?;
        let name = format!(
            "config_{}_{}.json",
            doc.meta.evolution_counter,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        fs::copy(&self.path, self.backup_dir.join(name))?;
        Ok(())
    }

    fn write(&self, doc: &ConfigDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
