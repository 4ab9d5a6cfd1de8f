use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// A simulated trading source. The endpoint is never dialled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub color: String,
    pub endpoint: String,
}

impl Venue {
    pub fn new(id: &str, name: &str, color: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            color: color.to_string(),
            endpoint: endpoint.into(),
        }
    }
}

pub fn demo_venues() -> Vec<Venue> {
    vec![
        Venue::new("binance", "Binance", "#F3BA2F", "wss://stream.binance.com:9443/ws/btcusdt@depth20@100ms"),
        Venue::new("coinbase", "Coinbase", "#0052FF", "wss://ws-feed.pro.coinbase.com"),
        Venue::new("okx", "OKX", "#00D4FF", "wss://ws.okx.com:8443/ws/v5/public"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueRegistry {
    venues: Vec<Venue>,
}

impl Default for VenueRegistry {
    fn default() -> Self {
        Self::new(demo_venues())
    }
}

impl VenueRegistry {
    pub fn new(venues: Vec<Venue>) -> Self {
        info!(count = venues.len(), "Registered venues");
        Self { venues }
    }

    pub fn all(&self) -> &[Venue] {
        &self.venues
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Venue> {
        self.venues.iter().filter(|v| v.enabled)
    }

    pub fn get(&self, venue_id: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.id == venue_id)
    }

    // Unknown ids are ignored
    pub fn toggle(&mut self, venue_id: &str) {
        match self.venues.iter_mut().find(|v| v.id == venue_id) {
            Some(venue) => {
                venue.enabled = !venue.enabled;
                debug!(venue = venue_id, enabled = venue.enabled, "Toggled venue");
            }
            None => debug!(venue = venue_id, "Ignoring toggle for unknown venue"),
        }
    }
}
