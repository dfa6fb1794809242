use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::StoreError;

const HEADER: &str = "timestamp,platform,event_type,order_id,product_name,amount,currency,customer_email";

/// Kind of commercial event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A completed sale.
    Sale,
    /// A refunded order.
    Refund,
}

impl EventKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sale" => Some(Self::Sale),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Refund => "refund",
        }
    }
}

/// One immutable row of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleEvent {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Platform tag (e.g. `gumroad`, `shopify`).
    pub platform: String,
    /// Sale or refund.
    pub kind: EventKind,
    /// Order identifier; duplicates are deduplicated at read time.
    pub order_id: String,
    /// Product name.
    pub product_name: String,
    /// Amount in minor units (cents).
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Buyer identifier.
    pub buyer: String,
}

/// Read interface over the append-only sales CSV.
///
/// The file is written by the external webhook receiver; the core only
/// appends in tests and never truncates.
#[derive(Debug, Clone)]
pub struct EventLogStore {
    path: PathBuf,
}

impl EventLogStore {
    /// Creates a store over the given CSV path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all events, skipping the header, malformed rows, and the torn
    /// tail, deduplicating on `(order_id, kind)` (first occurrence wins).
    pub fn read_all(&self) -> Result<Vec<SaleEvent>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut events = Vec::new();
        let mut seen: HashSet<(String, EventKind)> = HashSet::new();
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("timestamp,") {
                continue;
            }
            let Some(event) = parse_row(trimmed) else {
                continue;
            };
            if seen.insert((event.order_id.clone(), event.kind)) {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Appends an event, writing the header first on a fresh file.
    pub fn append(&self, event: &SaleEvent) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let fresh = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh {
            writeln!(file, "{HEADER}")?;
        }
        writeln!(file, "{}", format_row(event))?;
        Ok(())
    }
}

/// Net revenue in minor units: sales minus refunds.
#[must_use]
pub fn revenue_minor(events: &[SaleEvent]) -> i64 {
    events
        .iter()
        .map(|e| match e.kind {
            EventKind::Sale => e.amount_minor,
            EventKind::Refund => -e.amount_minor,
        })
        .sum()
}

/// Events with `from < timestamp <= upto`.
#[must_use]
pub fn between(events: &[SaleEvent], from: DateTime<Utc>, upto: DateTime<Utc>) -> Vec<SaleEvent> {
    events
        .iter()
        .filter(|e| e.timestamp > from && e.timestamp <= upto)
        .cloned()
        .collect()
}

fn parse_row(line: &str) -> Option<SaleEvent> {
    let fields = split_csv(line);
    if fields.len() < 8 {
        return None;
    }
    let timestamp = parse_timestamp(&fields[0])?;
    let kind = EventKind::parse(&fields[2])?;
    let amount: f64 = fields[5].trim().parse().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    let amount_minor = (amount * 100.0).round() as i64;
    Some(SaleEvent {
        timestamp,
        platform: fields[1].trim().to_ascii_lowercase(),
        kind,
        order_id: fields[3].trim().to_string(),
        product_name: fields[4].trim().to_string(),
        amount_minor,
        currency: fields[6].trim().to_string(),
        buyer: fields[7].trim().to_string(),
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // The webhook receiver writes naive ISO timestamps.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn format_row(event: &SaleEvent) -> String {
    #[allow(clippy::cast_precision_loss)]
    let amount = event.amount_minor as f64 / 100.0;
    [
        event.timestamp.to_rfc3339(),
        quote(&event.platform),
        event.kind.as_str().to_string(),
        quote(&event.order_id),
        quote(&event.product_name),
        format!("{amount:.2}"),
        quote(&event.currency),
        quote(&event.buyer),
    ]
    .join(",")
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_csv(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn event(order_id: &str, amount_minor: i64) -> SaleEvent {
        SaleEvent {
            timestamp: Utc::now(),
            platform: "gumroad".into(),
            kind: EventKind::Sale,
            order_id: order_id.into(),
            product_name: "Template Pack".into(),
            amount_minor,
            currency: "USD".into(),
            buyer: "buyer@example.com".into(),
        }
    }

    #[test]
    fn round_trips_events() {
        let dir = tempdir().unwrap();
        let store = EventLogStore::new(dir.path().join("sales.csv"));
        store.append(&event("ord-1", 1999)).unwrap();
        store.append(&event("ord-2", 4500)).unwrap();
        let events = store.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].amount_minor, 1999);
        assert_eq!(revenue_minor(&events), 6499);
    }

    #[test]
    fn deduplicates_order_ids() {
        let dir = tempdir().unwrap();
        let store = EventLogStore::new(dir.path().join("sales.csv"));
        store.append(&event("ord-1", 1999)).unwrap();
        store.append(&event("ord-1", 1999)).unwrap();
        let mut refund = event("ord-1", 1999);
        refund.kind = EventKind::Refund;
        store.append(&refund).unwrap();
        let events = store.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(revenue_minor(&events), 0);
    }

    #[test]
    fn skips_corrupt_rows_and_torn_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        let store = EventLogStore::new(&path);
        store.append(&event("ord-1", 1000)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not,a,valid,row").unwrap();
        write!(file, "2026-01-01T00:00:00,gumroad,sale,ord-").unwrap();
        let events = store.read_all().unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn quoted_product_names_survive() {
        let dir = tempdir().unwrap();
        let store = EventLogStore::new(dir.path().join("sales.csv"));
        let mut ev = event("ord-9", 2500);
        ev.product_name = "Bundle, \"Deluxe\"".into();
        store.append(&ev).unwrap();
        let events = store.read_all().unwrap();
        assert_eq!(events[0].product_name, "Bundle, \"Deluxe\"");
    }

    #[test]
    fn window_filter_is_half_open() {
        let now = Utc::now();
        let mut old = event("ord-1", 100);
        old.timestamp = now - chrono::Duration::days(3);
        let mut fresh = event("ord-2", 200);
        fresh.timestamp = now - chrono::Duration::hours(1);
        let events = vec![old, fresh];
        let window = between(&events, now - chrono::Duration::days(1), now);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].order_id, "ord-2");
    }
}
