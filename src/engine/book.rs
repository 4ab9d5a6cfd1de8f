use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::engine::types::{OrderBookSnapshot, PriceLevel, Side};

pub const SYMBOL: &str = "BTCUSDT";
pub const REFERENCE_PRICE: f64 = 65_000.0;
pub const PRICE_STEP: f64 = 0.5;
pub const LEVELS_PER_SIDE: usize = 20;

// Quantities only move on every 4th tick
pub const SMOOTHING_PERIOD: u64 = 4;
pub const MAX_PERTURBATION: f64 = 0.05;
pub const MIN_QUANTITY: f64 = 0.1;

// Range for a level's first quantity
const SEED_QUANTITY_MIN: f64 = 1.0;
const SEED_QUANTITY_MAX: f64 = 11.0;

/// Shape of every synthetic book: where it is centred and how deep it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookParams {
    pub symbol: String,
    pub reference_price: f64,
    pub price_step: f64,
    pub levels_per_side: usize,
}

impl Default for BookParams {
    fn default() -> Self {
        Self {
            symbol: SYMBOL.to_string(),
            reference_price: REFERENCE_PRICE,
            price_step: PRICE_STEP,
            levels_per_side: LEVELS_PER_SIDE,
        }
    }
}

// Last emitted quantity per level index, one vec per side
#[derive(Debug, Default, Clone, PartialEq)]
struct VenueQuantities {
    bids: Vec<f64>,
    asks: Vec<f64>,
}

impl VenueQuantities {
    fn side_mut(&mut self, side: Side) -> &mut Vec<f64> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn side(&self, side: Side) -> &[f64] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

/// Synthesises per-venue books around a fixed reference price.
///
/// Every (venue, side, index) keeps the quantity it last emitted. That memory is
/// what turns independent noise into a slow random walk: a level only moves on
/// ticks where `tick_counter % SMOOTHING_PERIOD == 0`, and then by at most
/// `MAX_PERTURBATION`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyntheticBook {
    params: BookParams,
    quantities: AHashMap<String, VenueQuantities>,
}

impl SyntheticBook {
    pub fn new(params: BookParams) -> Self {
        debug!(symbol = %params.symbol, reference_price = params.reference_price, levels = params.levels_per_side, "Initialized synthetic book");
        Self { params, quantities: AHashMap::new() }
    }

    pub fn params(&self) -> &BookParams {
        &self.params
    }

    // Bids step down from the reference price, asks step up
    pub fn level_price(&self, side: Side, index: usize) -> f64 {
        let offset = index as f64 * self.params.price_step;
        let price = match side {
            Side::Bid => self.params.reference_price - offset,
            Side::Ask => self.params.reference_price + offset,
        };
        round_to(price, 2)
    }

    /// Last quantity emitted for a level, if the venue has been synthesised yet.
    pub fn quantity(&self, venue_id: &str, side: Side, index: usize) -> Option<f64> {
        self.quantities.get(venue_id)?.side(side).get(index).copied()
    }

    pub fn tracked_venues(&self) -> usize {
        self.quantities.len()
    }

    #[instrument(level = "trace", skip(self, rng))]
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        venue_id: &str,
        tick_counter: u64,
        sequence_id: u64,
        timestamp: u64,
        rng: &mut R,
    ) -> OrderBookSnapshot {
        let perturb = tick_counter % SMOOTHING_PERIOD == 0;
        let bids = self.build_side(venue_id, Side::Bid, perturb, timestamp, rng);
        let asks = self.build_side(venue_id, Side::Ask, perturb, timestamp, rng);

        trace!(venue = venue_id, tick = tick_counter, perturb, "Built venue book");

        OrderBookSnapshot {
            venue_id: venue_id.to_string(),
            symbol: self.params.symbol.clone(),
            sequence_id,
            bids,
            asks,
            timestamp,
        }
    }

    fn build_side<R: Rng + ?Sized>(
        &mut self,
        venue_id: &str,
        side: Side,
        perturb: bool,
        timestamp: u64,
        rng: &mut R,
    ) -> Vec<PriceLevel> {
        let depth = self.params.levels_per_side;
        let prices: Vec<f64> = (0..depth).map(|i| self.level_price(side, i)).collect();

        if !self.quantities.contains_key(venue_id) {
            self.quantities.insert(venue_id.to_string(), VenueQuantities::default());
        }
        let memory = match self.quantities.get_mut(venue_id) {
            Some(m) => m.side_mut(side),
            None => return Vec::new(),
        };
        // depth may have grown since the venue was first seen
        memory.truncate(depth);

        let mut levels = Vec::with_capacity(depth);
        for (index, price) in prices.into_iter().enumerate() {
            let quantity = next_quantity(memory.get(index).copied(), perturb, rng);
            if index < memory.len() {
                memory[index] = quantity;
            } else {
                memory.push(quantity);
            }
            levels.push(PriceLevel { price, quantity, cumulative_total: 0.0, timestamp });
        }

        accumulate(&mut levels);
        levels
    }
}

/// Apply the smoothing rule to one level.
///
/// A level seen for the first time gets a fresh quantity in `[1, 11)`. After that
/// it is reused unchanged unless `perturb` is set, in which case it moves by at most
/// `MAX_PERTURBATION`, floored at `MIN_QUANTITY`.
pub fn next_quantity<R: Rng + ?Sized>(previous: Option<f64>, perturb: bool, rng: &mut R) -> f64 {
    match previous {
        None => round_to(rng.gen_range(SEED_QUANTITY_MIN..SEED_QUANTITY_MAX), 4),
        Some(q) if perturb => {
            let jitter = rng.gen_range(-MAX_PERTURBATION..=MAX_PERTURBATION);
            round_to((q + jitter).max(MIN_QUANTITY), 4)
        }
        Some(q) => q,
    }
}

// Fill cumulative_total from the best price outward
pub fn accumulate(levels: &mut [PriceLevel]) {
    let mut running = 0.0;
    for level in levels.iter_mut() {
        running += level.quantity;
        level.cumulative_total = running;
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
