use chrono::Datelike;
use indexmap::IndexMap;
use serde::Serialize;
use vela_stores::{events, EventKind, SaleEvent};

/// Latest events quoted back to the model as a sample.
const SAMPLE_SIZE: usize = 10;

/// Compact statistical summary of the full event log. This is what the
/// model sees; raw events are never pasted into prompts.
#[derive(Debug, Clone, Serialize)]
pub struct StatsDigest {
    /// Total events, sales and refunds alike.
    pub total_events: usize,
    /// Sale count.
    pub orders: usize,
    /// Net revenue in dollars.
    pub revenue: f64,
    /// Mean sale amount in dollars.
    pub avg_order: f64,
    /// Largest sale in dollars.
    pub max_order: f64,
    /// Smallest sale in dollars.
    pub min_order: f64,
    /// Sale counts per platform, in first-seen order.
    pub platforms: IndexMap<String, usize>,
    /// Sale counts per weekday, Monday first.
    pub weekday_counts: IndexMap<String, usize>,
    /// The most recent sales, `"product ($amount)"`.
    pub recent_sample: Vec<String>,
}

/// Digests the full event list.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn digest(all_events: &[SaleEvent]) -> StatsDigest {
    let sales: Vec<&SaleEvent> = all_events
        .iter()
        .filter(|e| e.kind == EventKind::Sale)
        .collect();

    let amounts: Vec<f64> = sales.iter().map(|e| e.amount_minor as f64 / 100.0).collect();
    let avg_order = if amounts.is_empty() {
        0.0
    } else {
        amounts.iter().sum::<f64>() / amounts.len() as f64
    };

    let mut platforms = IndexMap::new();
    for sale in &sales {
        *platforms.entry(sale.platform.clone()).or_insert(0) += 1;
    }

    let mut weekday_counts: IndexMap<String, usize> = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ]
    .into_iter()
    .map(|day| (day.to_owned(), 0))
    .collect();
    for sale in &sales {
        let day = match sale.timestamp.weekday() {
            chrono::Weekday::Mon => "Monday",
            chrono::Weekday::Tue => "Tuesday",
            chrono::Weekday::Wed => "Wednesday",
            chrono::Weekday::Thu => "Thursday",
            chrono::Weekday::Fri => "Friday",
            chrono::Weekday::Sat => "Saturday",
            chrono::Weekday::Sun => "Sunday",
        };
        if let Some(count) = weekday_counts.get_mut(day) {
            *count += 1;
        }
    }

    let recent_sample = sales
        .iter()
        .rev()
        .take(SAMPLE_SIZE)
        .map(|e| format!("{} (${:.2})", e.product_name, e.amount_minor as f64 / 100.0))
        .collect();

    let min_order = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    StatsDigest {
        total_events: all_events.len(),
        orders: sales.len(),
        revenue: events::revenue_minor(all_events) as f64 / 100.0,
        avg_order,
        max_order: amounts.iter().copied().fold(0.0, f64::max),
        min_order: if min_order.is_finite() { min_order } else { 0.0 },
        platforms,
        weekday_counts,
        recent_sample,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sale(platform: &str, amount_minor: i64, order_id: &str) -> SaleEvent {
        SaleEvent {
            timestamp: Utc::now() - Duration::hours(1),
            platform: platform.into(),
            kind: EventKind::Sale,
            order_id: order_id.into(),
            product_name: "Guide".into(),
            amount_minor,
            currency: "USD".into(),
            buyer: "b@example.com".into(),
        }
    }

    #[test]
    fn digest_summarises_sales() {
        let events = vec![
            sale("gumroad", 2000, "a"),
            sale("gumroad", 4000, "b"),
            sale("shopify", 6000, "c"),
        ];
        let digest = digest(&events);
        assert_eq!(digest.orders, 3);
        assert!((digest.revenue - 120.0).abs() < 1e-9);
        assert!((digest.avg_order - 40.0).abs() < 1e-9);
        assert!((digest.max_order - 60.0).abs() < 1e-9);
        assert!((digest.min_order - 20.0).abs() < 1e-9);
        assert_eq!(digest.platforms.get("gumroad"), Some(&2));
        assert_eq!(digest.recent_sample.len(), 3);
    }

    #[test]
    fn empty_log_digests_to_zeroes() {
        let digest = digest(&[]);
        assert_eq!(digest.orders, 0);
        assert!(digest.revenue.abs() < f64::EPSILON);
        assert!(digest.min_order.abs() < f64::EPSILON);
    }
}
