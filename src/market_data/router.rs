// Router drives the generator on a timer and hands read-only views to consumers
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::StreamSettings;
use crate::engine::types::SnapshotSet;
use crate::market_data::generator::OrderbookGenerator;
use crate::market_data::venue::Venue;

struct Shared {
    generator: OrderbookGenerator<StdRng>,
    connected: bool,
    // bumped on every start and stop so a stale ticker can tell it was cancelled
    generation: u64,
    tx: watch::Sender<Arc<SnapshotSet>>,
}

impl Shared {
    fn tick(&mut self) {
        let set = self.generator.produce_tick();
        // stores the value even with no receivers
        self.tx.send_replace(set);
    }
}

// No tick lands after stop() returns: the ticker checks connected and generation under the same lock
pub struct OrderbookStream {
    shared: Arc<Mutex<Shared>>,
    task: Option<JoinHandle<()>>,
    tick_period: Duration,
}

impl OrderbookStream {
    pub fn new(generator: OrderbookGenerator<StdRng>) -> Self {
        let tick_period = generator.tick_period();
        let (tx, _rx) = watch::channel(generator.latest());
        Self {
            shared: Arc::new(Mutex::new(Shared { generator, connected: false, generation: 0, tx })),
            task: None,
            tick_period,
        }
    }

    // Needs a tokio runtime when real_time_mode is set
    pub fn start(&mut self, settings: StreamSettings) {
        self.cancel_task();
        let real_time = settings.real_time_mode;
        {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            shared.generator.apply_settings(settings);
            shared.connected = true;
            shared.tick();
        }
        info!(real_time, tick_period_ms = self.tick_period.as_millis() as u64, "Stream started");
        if real_time {
            self.spawn_ticker();
        }
    }

    pub fn stop(&mut self) {
        let was_connected = self.mark_stopped();
        self.cancel_task();
        if was_connected {
            info!("Stream stopped");
        }
    }

    pub async fn shutdown(mut self) {
        self.mark_stopped();
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Ticker task ended abnormally");
                }
            }
        }
        info!("Stream shut down");
    }

    // Real-time off keeps the stream connected; back on ticks immediately
    pub fn update_settings(&mut self, settings: StreamSettings) {
        let real_time = settings.real_time_mode;
        let connected = {
            let mut shared = self.shared.lock();
            shared.generator.apply_settings(settings);
            shared.connected
        };
        if !connected {
            return;
        }

        match (real_time, self.task.is_some()) {
            (false, true) => {
                self.invalidate_generation();
                self.cancel_task();
                debug!("Real-time mode off, timer cancelled");
            }
            (true, false) => {
                self.shared.lock().tick();
                self.spawn_ticker();
                debug!("Real-time mode on, timer restarted");
            }
            _ => {}
        }
    }

    pub fn toggle_venue(&self, venue_id: &str) {
        self.shared.lock().generator.toggle_venue(venue_id);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    pub fn is_ticking(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn latest(&self) -> Arc<SnapshotSet> {
        self.shared.lock().generator.latest()
    }

    pub fn venues(&self) -> Vec<Venue> {
        self.shared.lock().generator.venues().to_vec()
    }

    pub fn settings(&self) -> StreamSettings {
        self.shared.lock().generator.settings().clone()
    }

    pub fn history(&self) -> Vec<Arc<SnapshotSet>> {
        self.shared.lock().generator.history()
    }

    pub fn history_len(&self) -> usize {
        self.shared.lock().generator.history_len()
    }

    pub fn snapshot_ago(&self, ticks_ago: usize) -> Arc<SnapshotSet> {
        self.shared.lock().generator.snapshot_ago(ticks_ago)
    }

    pub fn tick_counter(&self) -> u64 {
        self.shared.lock().generator.tick_counter()
    }

    // Receiver always holds the latest snapshot-set
    pub fn subscribe(&self) -> watch::Receiver<Arc<SnapshotSet>> {
        self.shared.lock().tx.subscribe()
    }

    // Returns whether the stream was connected
    fn mark_stopped(&self) -> bool {
        let mut shared = self.shared.lock();
        let was = shared.connected;
        shared.connected = false;
        shared.generation += 1;
        was
    }

    fn invalidate_generation(&self) {
        self.shared.lock().generation += 1;
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn spawn_ticker(&mut self) {
        let shared = Arc::clone(&self.shared);
        let period = self.tick_period;
        let generation = self.shared.lock().generation;

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick completes immediately; start already produced one
            interval.tick().await;
            loop {
                interval.tick().await;
                let live = {
                    let mut guard = shared.lock();
                    let live = guard.connected && guard.generation == generation;
                    if live {
                        guard.tick();
                    }
                    live
                };
                if !live {
                    debug!(generation, "Ticker observed cancellation");
                    break;
                }
            }
        }));
    }
}

impl Drop for OrderbookStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::book::BookParams;
    use crate::market_data::venue::VenueRegistry;

    fn stream() -> OrderbookStream {
        OrderbookStream::new(OrderbookGenerator::seeded(BookParams::default(), VenueRegistry::default(), 5))
    }

    #[test]
    fn test_start_without_real_time_needs_no_runtime() {
        let mut s = stream();
        assert!(!s.is_connected());
        s.start(StreamSettings { real_time_mode: false, ..Default::default() });
        assert!(s.is_connected());
        assert!(!s.is_ticking());
        assert_eq!(s.history_len(), 1);
        assert_eq!(s.latest().len(), 3);
        s.stop();
        assert!(!s.is_connected());
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut s = stream();
        s.stop();
        s.stop();
        assert!(!s.is_connected());
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn test_update_settings_while_stopped_does_not_tick() {
        let mut s = stream();
        s.update_settings(StreamSettings::dashboard());
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.settings(), StreamSettings::dashboard());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_timer() {
        let mut s = stream();
        s.start(StreamSettings::default());
        assert!(s.is_ticking());
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        // one immediate tick plus one per 100ms
        let len = s.history_len();
        assert!((10..=11).contains(&len), "history_len = {len}");
        s.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_sees_latest() {
        let mut s = stream();
        let mut rx = s.subscribe();
        s.start(StreamSettings::default());
        assert_eq!(rx.borrow_and_update().tick, 0);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().tick, 1);
        s.shutdown().await;
    }
}
