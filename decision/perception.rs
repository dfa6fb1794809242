use chrono::{DateTime, Duration, Utc};
use vela_stores::events::{self, SaleEvent};

use crate::model::{MarketSnapshot, TrendDirection};

/// Converts minor units to dollars.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dollars(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Computes the market snapshot from the full deduplicated event list.
///
/// The trend compares the two most recent equal-length 24-hour windows;
/// a change beyond ±5% flips the direction, and a missing previous window
/// reports `new`.
#[must_use]
pub fn market_snapshot(all_events: &[SaleEvent], now: DateTime<Utc>) -> MarketSnapshot {
    if all_events.is_empty() {
        return MarketSnapshot {
            conversion_rate: 0.0,
            total_revenue: 0.0,
            total_orders: 0,
            revenue_24h: 0.0,
            orders_24h: 0,
            trend: TrendDirection::New,
            trend_pct: 0.0,
            data_available: false,
        };
    }

    let total_orders = all_events
        .iter()
        .filter(|e| e.kind == vela_stores::EventKind::Sale)
        .count();
    let total_revenue = dollars(events::revenue_minor(all_events));

    let current = events::between(all_events, now - Duration::hours(24), now);
    let previous = events::between(
        all_events,
        now - Duration::hours(48),
        now - Duration::hours(24),
    );
    let revenue_24h = dollars(events::revenue_minor(&current));
    let previous_revenue = dollars(events::revenue_minor(&previous));

    let (trend, trend_pct) = classify_trend(revenue_24h, previous_revenue);

    // Traffic proxy from the original analytics: roughly twenty visits per
    // order, floored at one hundred.
    #[allow(clippy::cast_precision_loss)]
    let conversion_rate = total_orders as f64 / (total_orders * 20).max(100) as f64;

    MarketSnapshot {
        conversion_rate,
        total_revenue,
        total_orders,
        revenue_24h,
        orders_24h: current.len(),
        trend,
        trend_pct,
        data_available: true,
    }
}

/// Classifies a revenue trend against the previous window.
#[must_use]
pub fn classify_trend(current: f64, previous: f64) -> (TrendDirection, f64) {
    if previous <= 0.0 {
        return (TrendDirection::New, 0.0);
    }
    let pct = (current - previous) / previous * 100.0;
    let trend = if pct > 5.0 {
        TrendDirection::Growing
    } else if pct < -5.0 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };
    (trend, pct)
}
