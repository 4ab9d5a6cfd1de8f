//! Property tests for snapshot production
//!
//! - every enabled venue appears exactly once per tick, disabled ones never
//! - bids descend, asks ascend
//! - cumulative totals are non-decreasing and end at the side's total
//! - filtered levels always satisfy the active range and threshold
//! - quantities move on at most one of any four consecutive ticks
//! - history stays within the active time range's cap, even right after it shrinks

use lobviz_rs::config::{StreamSettings, TimeRange};
use lobviz_rs::engine::book::{BookParams, SMOOTHING_PERIOD};
use lobviz_rs::engine::types::{OrderBookSnapshot, Side};
use lobviz_rs::market_data::generator::OrderbookGenerator;
use lobviz_rs::market_data::venue::VenueRegistry;
use proptest::prelude::*;

const VENUES: [&str; 3] = ["binance", "coinbase", "okx"];

fn generator(seed: u64) -> OrderbookGenerator {
    OrderbookGenerator::seeded(BookParams::default(), VenueRegistry::default(), seed)
}

fn assert_well_formed(snap: &OrderBookSnapshot) {
    assert!(snap.bids.windows(2).all(|w| w[0].price > w[1].price), "bids not descending");
    assert!(snap.asks.windows(2).all(|w| w[0].price < w[1].price), "asks not ascending");
    for side in [Side::Bid, Side::Ask] {
        let levels = snap.levels(side);
        assert!(levels.windows(2).all(|w| w[0].cumulative_total <= w[1].cumulative_total));
        if let Some(last) = levels.last() {
            let sum: f64 = levels.iter().map(|l| l.quantity).sum();
            assert!((last.cumulative_total - sum).abs() < 1e-6);
        }
    }
}

/// Mask of which demo venues to disable before producing
fn arb_disabled() -> impl Strategy<Value = [bool; 3]> {
    any::<[bool; 3]>()
}

fn arb_price_range() -> impl Strategy<Value = (f64, f64)> {
    (64_980.0f64..65_020.0, 0.0f64..20.0).prop_map(|(min, width)| (min, min + width))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_snapshot_per_enabled_venue(seed in any::<u64>(), disabled in arb_disabled(), ticks in 1usize..12) {
        let mut g = generator(seed);
        for (venue, off) in VENUES.iter().zip(disabled.iter()) {
            if *off {
                g.toggle_venue(venue);
            }
        }

        for _ in 0..ticks {
            let set = g.produce_tick();
            let ids: Vec<&str> = set.snapshots.iter().map(|s| s.venue_id.as_str()).collect();
            let expected: Vec<&str> = VENUES.iter().zip(disabled.iter()).filter(|(_, off)| !**off).map(|(v, _)| *v).collect();
            prop_assert_eq!(ids, expected);
            for snap in &set.snapshots {
                prop_assert_eq!(snap.bids.len(), 20);
                prop_assert_eq!(snap.asks.len(), 20);
                assert_well_formed(snap);
            }
        }
    }

    #[test]
    fn filters_hold_for_every_level(seed in any::<u64>(), range in arb_price_range(), threshold in 0.0f64..12.0) {
        let mut g = generator(seed);
        g.apply_settings(StreamSettings { price_range: Some(range), quantity_threshold: threshold, ..Default::default() });

        for _ in 0..8 {
            let set = g.produce_tick();
            prop_assert_eq!(set.len(), 3);
            for snap in &set.snapshots {
                for level in snap.bids.iter().chain(snap.asks.iter()) {
                    prop_assert!(level.price >= range.0 && level.price <= range.1);
                    prop_assert!(level.quantity >= threshold);
                }
            }
        }
    }

    #[test]
    fn at_most_one_change_per_smoothing_window(seed in any::<u64>(), warmup in 0u64..9, index in 0usize..20) {
        let mut g = generator(seed);
        for _ in 0..warmup {
            g.produce_tick();
        }

        let mut previous = g.produce_tick().venue("okx").map(|s| s.bids[index].quantity);
        let mut changes = 0;
        for _ in 0..SMOOTHING_PERIOD {
            let current = g.produce_tick().venue("okx").map(|s| s.bids[index].quantity);
            if current != previous {
                changes += 1;
            }
            previous = current;
        }
        prop_assert!(changes <= 1);
    }

    #[test]
    fn history_never_exceeds_cap(seed in any::<u64>(), ticks in 0usize..700) {
        let mut g = generator(seed);
        g.apply_settings(StreamSettings { time_range: TimeRange::OneMinute, ..Default::default() });
        for _ in 0..ticks {
            g.produce_tick();
            prop_assert!(g.history_len() <= 600);
        }
        prop_assert_eq!(g.history_len(), ticks.min(600));
    }

    #[test]
    fn history_fits_cap_after_time_range_change(
        seed in any::<u64>(),
        ticks in 0usize..800,
        from in prop::sample::select(vec![TimeRange::OneMinute, TimeRange::FiveMinutes]),
        to in prop::sample::select(vec![TimeRange::OneMinute, TimeRange::FiveMinutes]),
    ) {
        let mut g = generator(seed);
        g.apply_settings(StreamSettings { time_range: from, ..Default::default() });
        for _ in 0..ticks {
            g.produce_tick();
        }
        let newest = g.latest().tick;

        g.apply_settings(StreamSettings { time_range: to, ..Default::default() });
        let cap = g.history_cap();
        prop_assert!(g.history_len() <= cap);
        prop_assert_eq!(g.history_len(), ticks.min(from.history_cap(g.tick_period())).min(cap));
        if ticks > 0 {
            // the newest entries survive
            prop_assert_eq!(g.snapshot_ago(0).tick, newest);
            prop_assert_eq!(g.snapshot_ago(usize::MAX).tick, newest + 1 - g.history_len() as u64);
        }
    }
}

#[test]
fn quantities_frozen_for_three_ticks_after_tick_zero() {
    let mut g = generator(1);
    assert_eq!(g.tick_counter(), 0);
    let sets: Vec<_> = (0..4).map(|_| g.produce_tick()).collect();
    for venue in VENUES {
        let first = sets[0].venue(venue).unwrap();
        for set in &sets[1..] {
            let snap = set.venue(venue).unwrap();
            assert_eq!(snap.bids, first.bids);
            assert_eq!(snap.asks, first.asks);
        }
    }
}

#[test]
fn fourth_tick_may_move_quantities_within_bounds() {
    let mut g = generator(2);
    let sets: Vec<_> = (0..5).map(|_| g.produce_tick()).collect();
    let before = sets[3].venue("binance").unwrap();
    let after = sets[4].venue("binance").unwrap();
    for (b, a) in before.asks.iter().zip(after.asks.iter()) {
        assert!((a.quantity - b.quantity).abs() <= 0.0501);
        assert!(a.quantity >= 0.1);
    }
}

#[test]
fn unknown_venue_toggle_leaves_venues_unchanged() {
    let mut g = generator(3);
    let before = g.venues().to_vec();
    g.toggle_venue("kraken");
    assert_eq!(g.venues(), before.as_slice());
    assert_eq!(g.produce_tick().len(), 3);
}

#[test]
fn filter_example_range_and_threshold() {
    let mut g = generator(4);
    g.apply_settings(StreamSettings {
        price_range: Some((64_000.0, 66_000.0)),
        quantity_threshold: 5.0,
        ..Default::default()
    });
    for _ in 0..20 {
        for snap in &g.produce_tick().snapshots {
            for level in snap.bids.iter().chain(snap.asks.iter()) {
                assert!(level.price >= 64_000.0 && level.price <= 66_000.0);
                assert!(level.quantity >= 5.0);
            }
        }
    }
}

#[test]
fn fully_filtered_venue_still_present() {
    let mut g = generator(5);
    g.apply_settings(StreamSettings { price_range: Some((70_000.0, 71_000.0)), ..Default::default() });
    let set = g.produce_tick();
    assert_eq!(set.len(), 3);
    for snap in &set.snapshots {
        assert!(snap.bids.is_empty());
        assert!(snap.asks.is_empty());
    }
}

#[test]
fn sentinel_entry_evicted_once_cap_exceeded() {
    let mut g = generator(6);
    g.apply_settings(StreamSettings { time_range: TimeRange::OneMinute, ..Default::default() });

    let sentinel = g.produce_tick();
    assert_eq!(sentinel.tick, 0);
    for _ in 1..600 {
        g.produce_tick();
    }
    assert_eq!(g.history_len(), 600);
    assert_eq!(g.snapshot_ago(usize::MAX).tick, 0);

    g.produce_tick();
    assert_eq!(g.history_len(), 600);
    let history = g.history();
    assert!(history.iter().all(|set| set.tick != sentinel.tick));
    assert_eq!(history.first().map(|s| s.tick), Some(1));
    assert!(history.windows(2).all(|w| w[0].tick + 1 == w[1].tick));
}

#[test]
fn independent_generators_do_not_share_state() {
    let mut a = generator(7);
    let b = generator(7);
    for _ in 0..5 {
        a.produce_tick();
    }
    assert_eq!(a.tick_counter(), 5);
    assert_eq!(b.tick_counter(), 0);
    assert_eq!(b.history_len(), 0);
}
