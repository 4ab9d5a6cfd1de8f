use crate::config::StreamSettings;
use crate::engine::types::{OrderBookSnapshot, PriceLevel};

// Keeps levels inside the price range whose quantity clears the threshold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelFilter {
    pub price_range: Option<(f64, f64)>,
    pub quantity_threshold: f64,
}

impl LevelFilter {
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            price_range: settings.price_range,
            quantity_threshold: settings.quantity_threshold,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.price_range.is_none() && self.quantity_threshold <= 0.0
    }

    pub fn accepts(&self, level: &PriceLevel) -> bool {
        let in_range = match self.price_range {
            Some((min, max)) => level.price >= min && level.price <= max,
            None => true,
        };
        in_range && level.quantity >= self.quantity_threshold
    }

    // Snapshot survives even with both sides empty; totals stay as computed unfiltered
    pub fn apply(&self, snapshot: &mut OrderBookSnapshot) {
        if self.is_passthrough() {
            return;
        }
        snapshot.bids.retain(|l| self.accepts(l));
        snapshot.asks.retain(|l| self.accepts(l));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64, quantity: f64) -> PriceLevel {
        PriceLevel { price, quantity, cumulative_total: quantity, timestamp: 0 }
    }

    fn snapshot(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> OrderBookSnapshot {
        OrderBookSnapshot {
            venue_id: "binance".into(),
            symbol: "BTCUSDT".into(),
            sequence_id: 1,
            bids,
            asks,
            timestamp: 0,
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let filter = LevelFilter { price_range: Some((100.0, 200.0)), quantity_threshold: 0.0 };
        assert!(filter.accepts(&level(100.0, 1.0)));
        assert!(filter.accepts(&level(200.0, 1.0)));
        assert!(!filter.accepts(&level(200.01, 1.0)));
        assert!(!filter.accepts(&level(99.99, 1.0)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filter = LevelFilter { price_range: None, quantity_threshold: 5.0 };
        assert!(filter.accepts(&level(1.0, 5.0)));
        assert!(!filter.accepts(&level(1.0, 4.9999)));
    }

    #[test]
    fn test_apply_keeps_empty_snapshot() {
        let filter = LevelFilter { price_range: Some((0.0, 1.0)), quantity_threshold: 0.0 };
        let mut snap = snapshot(vec![level(10.0, 2.0)], vec![level(11.0, 3.0)]);
        filter.apply(&mut snap);
        assert!(snap.bids.is_empty());
        assert!(snap.asks.is_empty());
        assert_eq!(snap.venue_id, "binance");
    }

    #[test]
    fn test_passthrough() {
        let filter = LevelFilter::from_settings(&StreamSettings::default());
        assert!(filter.is_passthrough());
        let mut snap = snapshot(vec![level(10.0, 0.5)], vec![]);
        filter.apply(&mut snap);
        assert_eq!(snap.bids.len(), 1);
    }
}
