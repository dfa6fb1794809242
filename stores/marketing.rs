use std::{fs, path::PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::layout::StoreError;

/// Daily ad spend assumed when no ledger entries are configured at all.
pub const DEFAULT_DAILY_AD_ESTIMATE: f64 = 5.0;

/// ROAS reported when revenue exists but ad spend is zero. Keeps the value
/// finite instead of dividing by zero.
pub const ROAS_SATURATION: f64 = 10.0;

/// Return on ad spend for a window, saturating when spend is zero.
#[must_use]
pub fn roas(revenue: f64, ad_spend: f64) -> f64 {
    if ad_spend > 0.0 {
        revenue / ad_spend
    } else if revenue > 0.0 {
        ROAS_SATURATION
    } else {
        0.0
    }
}

/// Per-platform transaction fee: a percentage plus a fixed amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeRate {
    /// Fractional fee on the sale amount (0.10 = 10%).
    pub percent: f64,
    /// Fixed fee per transaction, in dollars.
    pub fixed: f64,
}

impl FeeRate {
    /// Transaction cost in minor units for a sale of `amount_minor`.
    #[must_use]
    pub fn fee_minor(&self, amount_minor: i64) -> i64 {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        {
            (amount_minor as f64 * self.percent + self.fixed * 100.0).round() as i64
        }
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        // Gumroad-style fallback used when a platform has no entry.
        Self {
            percent: 0.10,
            fixed: 0.30,
        }
    }
}

/// One daily ad spend entry. Dates are kept as strings and parsed at use so
/// a single bad row cannot poison the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSpendEntry {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Spend in dollars.
    pub spend: f64,
}

/// The marketing ledger document: fees, ad spend, fixed costs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketingLedger {
    /// Fee schedule keyed by platform tag.
    #[serde(default)]
    pub platform_fees: IndexMap<String, FeeRate>,
    /// Daily ad spend entries.
    #[serde(default)]
    pub daily_ad_spend: Vec<AdSpendEntry>,
    /// Monthly fixed costs keyed by label, in dollars.
    #[serde(default)]
    pub monthly_fixed_costs: IndexMap<String, f64>,
}

impl MarketingLedger {
    /// Fee rate for a platform, falling back to the default schedule.
    #[must_use]
    pub fn fee_for(&self, platform: &str) -> FeeRate {
        self.platform_fees
            .get(platform)
            .copied()
            .unwrap_or_default()
    }

    /// Ad spend in dollars over the trailing `days` ending at `now`.
    ///
    /// Entries with unparseable dates are included (conservative). An empty
    /// ledger yields `daily_estimate * days`.
    #[must_use]
    pub fn ad_spend(&self, now: DateTime<Utc>, days: i64, daily_estimate: f64) -> f64 {
        if self.daily_ad_spend.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            return daily_estimate * days as f64;
        }
        let cutoff = (now - chrono::Duration::days(days)).date_naive();
        self.daily_ad_spend
            .iter()
            .filter(|entry| {
                NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d")
                    .map_or(true, |date| date >= cutoff)
            })
            .map(|entry| entry.spend)
            .sum()
    }

    /// Total monthly fixed costs in dollars.
    #[must_use]
    pub fn monthly_fixed_total(&self) -> f64 {
        self.monthly_fixed_costs.values().sum()
    }
}

/// Store for the marketing ledger JSON document.
#[derive(Debug, Clone)]
pub struct MarketingStore {
    path: PathBuf,
}

impl MarketingStore {
    /// Creates a store over the given JSON path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the ledger; a missing file yields the empty default.
    pub fn load(&self) -> Result<MarketingLedger, StoreError> {
        if !self.path.exists() {
            return Ok(MarketingLedger::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the ledger (used by tests and setup tooling).
    pub fn save(&self, ledger: &MarketingLedger) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(ledger)?)?;
        Ok(())
    }
}
