use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commerce platform a side effect targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Shopify storefront.
    Shopify,
    /// Gumroad storefront.
    Gumroad,
}

/// Raised when a decision names a platform no bridge serves.
#[derive(Debug, Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shopify" => Ok(Self::Shopify),
            "gumroad" => Ok(Self::Gumroad),
            other => Err(UnknownPlatform(other.to_owned())),
        }
    }
}

impl Platform {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shopify => "shopify",
            Self::Gumroad => "gumroad",
        }
    }
}

/// Copy field a MODIFY_COPY decision rewrites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CopyTarget {
    /// Long-form product description.
    Description,
    /// Product title.
    Title,
    /// Product name.
    Name,
}

/// Raised when a decision names a copy target outside the vocabulary.
#[derive(Debug, Error)]
#[error("unknown copy target: {0}")]
pub struct UnknownTarget(pub String);

impl FromStr for CopyTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "description" => Ok(Self::Description),
            "title" => Ok(Self::Title),
            "name" => Ok(Self::Name),
            other => Err(UnknownTarget(other.to_owned())),
        }
    }
}

/// External price-update collaborator.
#[async_trait]
pub trait PriceUpdater: Send + Sync {
    /// Pushes a new price to the platform.
    async fn update_price(&self, platform: Platform, product_id: &str, new_price: f64)
        -> Result<()>;

    /// Last known price for the product, used to bound the fractional move.
    async fn current_price(&self, platform: Platform, product_id: &str) -> Result<Option<f64>>;
}

/// External copy-update collaborator.
#[async_trait]
pub trait CopyUpdater: Send + Sync {
    /// Pushes replacement copy to the platform.
    async fn update_copy(
        &self,
        platform: Platform,
        product_id: &str,
        target: CopyTarget,
        content: &str,
    ) -> Result<()>;
}

/// A dispatched call recorded by [`DryRunBridge`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    /// A price update.
    Price {
        /// Target platform.
        platform: Platform,
        /// Product identifier.
        product_id: String,
        /// New price in dollars.
        new_price: f64,
    },
    /// A copy update.
    Copy {
        /// Target platform.
        platform: Platform,
        /// Product identifier.
        product_id: String,
        /// Copy field.
        target: CopyTarget,
        /// Content length in characters.
        content_len: usize,
    },
}

/// In-memory bridge that records every dispatch instead of calling out.
///
/// Used in dry-run mode and by tests; `priced_at` seeds the price the
/// contract check compares fractional moves against.
#[derive(Debug, Default)]
pub struct DryRunBridge {
    calls: Mutex<Vec<BridgeCall>>,
    known_price: Mutex<Option<f64>>,
}

impl DryRunBridge {
    /// Creates a bridge with no known price.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bridge reporting `price` as the current price.
    #[must_use]
    pub fn priced_at(price: f64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            known_price: Mutex::new(Some(price)),
        }
    }

    /// Snapshot of every recorded call.
    #[must_use]
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PriceUpdater for DryRunBridge {
    async fn update_price(
        &self,
        platform: Platform,
        product_id: &str,
        new_price: f64,
    ) -> Result<()> {
        self.calls.lock().push(BridgeCall::Price {
            platform,
            product_id: product_id.to_owned(),
            new_price,
        });
        *self.known_price.lock() = Some(new_price);
        Ok(())
    }

    async fn current_price(&self, _platform: Platform, _product_id: &str) -> Result<Option<f64>> {
        Ok(*self.known_price.lock())
    }
}

#[async_trait]
impl CopyUpdater for DryRunBridge {
    async fn update_copy(
        &self,
        platform: Platform,
        product_id: &str,
        target: CopyTarget,
        content: &str,
    ) -> Result<()> {
        self.calls.lock().push(BridgeCall::Copy {
            platform,
            product_id: product_id.to_owned(),
            target,
            content_len: content.chars().count(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parse_is_case_insensitive() {
        assert_eq!("Shopify".parse::<Platform>().unwrap(), Platform::Shopify);
        assert!("etsy".parse::<Platform>().is_err());
    }

    #[test]
    fn copy_target_vocabulary_is_closed() {
        assert_eq!(
            "description".parse::<CopyTarget>().unwrap(),
            CopyTarget::Description
        );
        assert!("tags".parse::<CopyTarget>().is_err());
    }

    #[tokio::test]
    async fn dry_run_bridge_records_and_tracks_price() {
        let bridge = DryRunBridge::priced_at(20.0);
        bridge
            .update_price(Platform::Gumroad, "guide", 21.0)
            .await
            .unwrap();
        assert_eq!(
            bridge
                .current_price(Platform::Gumroad, "guide")
                .await
                .unwrap(),
            Some(21.0)
        );
        assert_eq!(bridge.calls().len(), 1);
    }
}
