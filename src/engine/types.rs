use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

// One price/quantity pair on one side of a synthetic book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
    // running sum of quantities from the best price outward
    pub cumulative_total: f64,
    pub timestamp: u64,
}

// Full book for one venue at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub venue_id: String,
    pub symbol: String,
    pub sequence_id: u64,
    pub bids: Vec<PriceLevel>, // descending price
    pub asks: Vec<PriceLevel>, // ascending price
    pub timestamp: u64,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn total_quantity(&self, side: Side) -> f64 {
        self.levels(side).iter().map(|l| l.quantity).sum()
    }
}

/// Snapshots across every enabled venue for a single tick.
///
/// Produced once and shared behind an `Arc`; consumers only ever see it read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSet {
    pub tick: u64,
    pub snapshots: Vec<OrderBookSnapshot>,
}

impl SnapshotSet {
    pub fn venue(&self, venue_id: &str) -> Option<&OrderBookSnapshot> {
        self.snapshots.iter().find(|s| s.venue_id == venue_id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

// Milliseconds since the unix epoch, 0 if the clock is before it
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
