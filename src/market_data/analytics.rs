// Derived views over snapshot-sets, all pure functions

use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::engine::types::{OrderBookSnapshot, Side, SnapshotSet};

pub const TIGHT_SPREAD_PCT: f64 = 0.01;
pub const NORMAL_SPREAD_PCT: f64 = 0.05;
pub const BUY_PRESSURE_RATIO: f64 = 1.2;
pub const SELL_PRESSURE_RATIO: f64 = 0.8;
pub const DEFAULT_PROFILE_BUCKET: f64 = 10.0;
pub const DEFAULT_PROFILE_DEPTH: usize = 20;
// search window as a fraction of the target price
pub const SEARCH_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub mid_price: Option<f64>,
    pub spread: Option<f64>,
    pub spread_pct: Option<f64>,
    pub total_bid_volume: f64,
    pub total_ask_volume: f64,
    // (bid - ask) / (bid + ask) * 100
    pub volume_imbalance_pct: f64,
    pub venues: usize,
}

pub fn market_stats(set: &SnapshotSet) -> MarketStats {
    let best_bid = set
        .snapshots
        .iter()
        .filter_map(|s| s.best_bid().map(|l| l.price))
        .max_by_key(|p| OrderedFloat(*p));
    let best_ask = set
        .snapshots
        .iter()
        .filter_map(|s| s.best_ask().map(|l| l.price))
        .min_by_key(|p| OrderedFloat(*p));

    let total_bid_volume: f64 = set.snapshots.iter().map(|s| s.total_quantity(Side::Bid)).sum();
    let total_ask_volume: f64 = set.snapshots.iter().map(|s| s.total_quantity(Side::Ask)).sum();

    let (mid_price, spread, spread_pct) = match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => {
            let spread = ask - bid;
            let pct = if bid > 0.0 { Some(spread / bid * 100.0) } else { None };
            (Some((bid + ask) / 2.0), Some(spread), pct)
        }
        _ => (None, None, None),
    };

    let total = total_bid_volume + total_ask_volume;
    let volume_imbalance_pct = if total > 0.0 { (total_bid_volume - total_ask_volume) / total * 100.0 } else { 0.0 };

    MarketStats {
        best_bid,
        best_ask,
        mid_price,
        spread,
        spread_pct,
        total_bid_volume,
        total_ask_volume,
        volume_imbalance_pct,
        venues: set.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadCategory {
    Tight,
    Normal,
    Wide,
}

impl SpreadCategory {
    pub fn classify(spread_pct: f64) -> Self {
        if spread_pct < TIGHT_SPREAD_PCT {
            SpreadCategory::Tight
        } else if spread_pct < NORMAL_SPREAD_PCT {
            SpreadCategory::Normal
        } else {
            SpreadCategory::Wide
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadMetrics {
    pub venue_id: String,
    pub bid_price: f64,
    pub ask_price: f64,
    pub spread: f64,
    pub spread_pct: f64,
    pub category: SpreadCategory,
    // top bid quantity + top ask quantity
    pub liquidity: f64,
}

fn venue_spread(snapshot: &OrderBookSnapshot) -> SpreadMetrics {
    match (snapshot.best_bid(), snapshot.best_ask()) {
        (Some(bid), Some(ask)) => {
            let spread = ask.price - bid.price;
            let spread_pct = if bid.price > 0.0 { spread / bid.price * 100.0 } else { 0.0 };
            SpreadMetrics {
                venue_id: snapshot.venue_id.clone(),
                bid_price: bid.price,
                ask_price: ask.price,
                spread,
                spread_pct,
                category: SpreadCategory::classify(spread_pct),
                liquidity: bid.quantity + ask.quantity,
            }
        }
        // a one-sided or empty book has no usable spread
        _ => SpreadMetrics {
            venue_id: snapshot.venue_id.clone(),
            bid_price: 0.0,
            ask_price: 0.0,
            spread: 0.0,
            spread_pct: 0.0,
            category: SpreadCategory::Wide,
            liquidity: 0.0,
        },
    }
}

// Tightest first
pub fn spread_metrics(set: &SnapshotSet) -> Vec<SpreadMetrics> {
    set.snapshots
        .iter()
        .map(venue_spread)
        .sorted_by_key(|m| OrderedFloat(m.spread_pct))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeLevel {
    pub price: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub total_volume: f64,
    pub venues: Vec<String>,
}

// Highest price bucket first, at most `depth` buckets
pub fn volume_profile(set: &SnapshotSet, bucket: f64, depth: usize) -> Vec<VolumeLevel> {
    if !(bucket > 0.0) {
        return Vec::new();
    }
    let mut buckets: BTreeMap<i64, VolumeLevel> = BTreeMap::new();

    for snapshot in &set.snapshots {
        for side in [Side::Bid, Side::Ask] {
            for level in snapshot.levels(side) {
                let key = (level.price / bucket).round() as i64;
                let entry = buckets.entry(key).or_insert_with(|| VolumeLevel {
                    price: key as f64 * bucket,
                    bid_volume: 0.0,
                    ask_volume: 0.0,
                    total_volume: 0.0,
                    venues: Vec::new(),
                });
                match side {
                    Side::Bid => entry.bid_volume += level.quantity,
                    Side::Ask => entry.ask_volume += level.quantity,
                }
                entry.total_volume += level.quantity;
                if !entry.venues.contains(&snapshot.venue_id) {
                    entry.venues.push(snapshot.venue_id.clone());
                }
            }
        }
    }

    buckets.into_values().rev().take(depth).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImbalanceSignal {
    Buy,
    Sell,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Imbalance {
    pub tick: u64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub ratio: f64,
    pub signal: ImbalanceSignal,
}

pub fn imbalance(set: &SnapshotSet) -> Imbalance {
    let bid_volume: f64 = set.snapshots.iter().map(|s| s.total_quantity(Side::Bid)).sum();
    let ask_volume: f64 = set.snapshots.iter().map(|s| s.total_quantity(Side::Ask)).sum();
    // an empty ask side divides by one
    let ratio = bid_volume / if ask_volume == 0.0 { 1.0 } else { ask_volume };
    let signal = if ratio > BUY_PRESSURE_RATIO {
        ImbalanceSignal::Buy
    } else if ratio < SELL_PRESSURE_RATIO {
        ImbalanceSignal::Sell
    } else {
        ImbalanceSignal::Neutral
    };
    Imbalance { tick: set.tick, bid_volume, ask_volume, ratio, signal }
}

// Last n history entries oldest first, then current
pub fn imbalance_series(history: &[Arc<SnapshotSet>], current: &SnapshotSet, n: usize) -> Vec<Imbalance> {
    let skip = history.len().saturating_sub(n);
    history[skip..]
        .iter()
        .map(|set| imbalance(set))
        .chain(std::iter::once(imbalance(current)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelMatch {
    pub venue_id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub cumulative_total: f64,
}

// Nearest first
pub fn search_price_levels(set: &SnapshotSet, target: f64) -> Vec<LevelMatch> {
    if !(target > 0.0) {
        return Vec::new();
    }
    let window = target * SEARCH_TOLERANCE;

    set.snapshots
        .iter()
        .flat_map(|snapshot| {
            [Side::Bid, Side::Ask].into_iter().flat_map(move |side| {
                snapshot.levels(side).iter().map(move |level| LevelMatch {
                    venue_id: snapshot.venue_id.clone(),
                    side,
                    price: level.price,
                    quantity: level.quantity,
                    cumulative_total: level.cumulative_total,
                })
            })
        })
        .filter(|m| (m.price - target).abs() <= window)
        .sorted_by_key(|m| OrderedFloat((m.price - target).abs()))
        .collect()
}
