use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::config::{AppConfig, StreamSettings, DEFAULT_TICK_PERIOD};
use crate::engine::book::{BookParams, SyntheticBook};
use crate::engine::types::{now_ms, SnapshotSet};
use crate::market_data::filter::LevelFilter;
use crate::market_data::history::History;
use crate::market_data::venue::{Venue, VenueRegistry};

/// Everything that persists between ticks.
#[derive(Debug, Clone)]
pub struct GeneratorState {
    book: SyntheticBook,
    tick_counter: u64,
    last_sequence: u64,
    history: History<Arc<SnapshotSet>>,
}

impl GeneratorState {
    fn new(params: BookParams, history_cap: usize) -> Self {
        Self {
            book: SyntheticBook::new(params),
            tick_counter: 0,
            last_sequence: 0,
            history: History::new(history_cap),
        }
    }

    pub fn book(&self) -> &SyntheticBook {
        &self.book
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    pub fn history(&self) -> &History<Arc<SnapshotSet>> {
        &self.history
    }
}

/// Produces one synthetic snapshot per enabled venue on every tick and keeps a
/// bounded history of what it produced.
///
/// The generator has no clock of its own; `OrderbookStream` drives `produce_tick`
/// on a timer. Each instance owns its state, so several can run side by side.
#[derive(Debug)]
pub struct OrderbookGenerator<R = StdRng> {
    venues: VenueRegistry,
    settings: StreamSettings,
    filter: LevelFilter,
    tick_period: Duration,
    state: GeneratorState,
    latest: Arc<SnapshotSet>,
    rng: R,
}

impl OrderbookGenerator<StdRng> {
    pub fn new(params: BookParams, venues: VenueRegistry) -> Self {
        Self::with_rng(params, venues, DEFAULT_TICK_PERIOD, StdRng::from_entropy())
    }

    pub fn seeded(params: BookParams, venues: VenueRegistry, seed: u64) -> Self {
        Self::with_rng(params, venues, DEFAULT_TICK_PERIOD, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let venues = match &cfg.venues {
            Some(v) => VenueRegistry::new(v.clone()),
            None => VenueRegistry::default(),
        };
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut generator = Self::with_rng(cfg.book_params(), venues, cfg.tick_period(), rng);
        generator.apply_settings(cfg.stream.clone());
        generator
    }
}

impl Default for OrderbookGenerator<StdRng> {
    fn default() -> Self {
        Self::new(BookParams::default(), VenueRegistry::default())
    }
}

impl<R: Rng> OrderbookGenerator<R> {
    pub fn with_rng(params: BookParams, venues: VenueRegistry, tick_period: Duration, rng: R) -> Self {
        let settings = StreamSettings::default();
        let cap = settings.time_range.history_cap(tick_period);
        info!(tick_period_ms = tick_period.as_millis() as u64, history_cap = cap, "Created orderbook generator");
        Self {
            venues,
            filter: LevelFilter::from_settings(&settings),
            settings,
            tick_period,
            state: GeneratorState::new(params, cap),
            latest: Arc::new(SnapshotSet::default()),
            rng,
        }
    }

    /// Swap in new settings. Filters apply from the next tick and entries already in
    /// history keep the levels they were produced with. A smaller time range drops
    /// the oldest entries right away so history never exceeds the active cap.
    pub fn apply_settings(&mut self, settings: StreamSettings) {
        let cap = settings.time_range.history_cap(self.tick_period);
        self.filter = LevelFilter::from_settings(&settings);
        let trimmed = self.state.history.set_cap(cap);
        if trimmed > 0 {
            metrics::gauge!("lobviz_history_len").set(self.state.history.len() as f64);
        }
        debug!(time_range = %settings.time_range, history_cap = cap, trimmed, price_range = ?settings.price_range,
            quantity_threshold = settings.quantity_threshold, real_time = settings.real_time_mode, "Applied stream settings");
        self.settings = settings;
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Synthesise, filter and record one snapshot-set.
    #[instrument(level = "debug", skip(self), fields(tick = self.state.tick_counter))]
    pub fn produce_tick(&mut self) -> Arc<SnapshotSet> {
        let started = Instant::now();
        let tick = self.state.tick_counter;
        let timestamp = now_ms();
        // time-derived but never repeats
        let sequence_id = timestamp.max(self.state.last_sequence + 1);
        self.state.last_sequence = sequence_id;

        let mut snapshots = Vec::new();
        for venue in self.venues.enabled() {
            let mut snapshot = self.state.book.build(&venue.id, tick, sequence_id, timestamp, &mut self.rng);
            self.filter.apply(&mut snapshot);
            snapshots.push(snapshot);
        }

        let set = Arc::new(SnapshotSet { tick, snapshots });
        self.state.tick_counter += 1;
        let evicted = self.state.history.push(Arc::clone(&set));
        self.latest = Arc::clone(&set);

        let elapsed = started.elapsed();
        metrics::counter!("lobviz_ticks_total").increment(1);
        metrics::gauge!("lobviz_history_len").set(self.state.history.len() as f64);
        metrics::histogram!("lobviz_tick_build_us").record(elapsed.as_micros() as f64);
        debug!(
            tick,
            sequence_id,
            venues = set.len(),
            history_len = self.state.history.len(),
            evicted,
            build_us = elapsed.as_micros() as u64,
            "Produced snapshot-set"
        );

        set
    }

    /// Flip a venue on or off; the next tick picks it up. Unknown ids are ignored.
    pub fn toggle_venue(&mut self, venue_id: &str) {
        self.venues.toggle(venue_id);
    }

    pub fn venues(&self) -> &[Venue] {
        self.venues.all()
    }

    pub fn latest(&self) -> Arc<SnapshotSet> {
        Arc::clone(&self.latest)
    }

    pub fn history(&self) -> Vec<Arc<SnapshotSet>> {
        self.state.history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    pub fn history_cap(&self) -> usize {
        self.state.history.cap()
    }

    /// Snapshot-set from `ticks_ago` ticks back, clamped to the oldest retained one.
    /// Falls back to the latest set while history is still empty.
    pub fn snapshot_ago(&self, ticks_ago: usize) -> Arc<SnapshotSet> {
        match self.state.history.ago(ticks_ago) {
            Some(set) => Arc::clone(set),
            None => self.latest(),
        }
    }

    pub fn tick_counter(&self) -> u64 {
        self.state.tick_counter
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }
}
