use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use lobviz_rs::config::{AppConfig, StreamSettings, TimeRange};
use lobviz_rs::engine::types::SnapshotSet;
use lobviz_rs::market_data::analytics::{self, DEFAULT_PROFILE_BUCKET, DEFAULT_PROFILE_DEPTH};
use lobviz_rs::market_data::generator::OrderbookGenerator;
use lobviz_rs::market_data::router::OrderbookStream;
use lobviz_rs::telemetry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lobviz", about = "Synthetic multi-venue order book stream")]
struct Cli {
    /// Config file (any format the config crate understands)
    #[arg(long)]
    config: Option<String>,

    /// Seed for reproducible quantities
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print a summary every second instead of opening the prompt
    #[arg(long)]
    headless: bool,

    /// How long a headless run lasts
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    #[arg(long, default_value_t = 9000)]
    metrics_port: u16,
}

// Helper function to print top of book across venues
fn print_state_summary(set: &SnapshotSet) {
    let stats = analytics::market_stats(set);

    println!("\n=== Tick {} ({} venues) ===", set.tick, stats.venues);
    for snap in &set.snapshots {
        let bid = snap.best_bid().map(|l| format!("{:.4} @ {:.2}", l.quantity, l.price)).unwrap_or_else(|| "None".into());
        let ask = snap.best_ask().map(|l| format!("{:.4} @ {:.2}", l.quantity, l.price)).unwrap_or_else(|| "None".into());
        println!("{:<10} bid {:<22} ask {:<22} levels {}/{}", snap.venue_id, bid, ask, snap.bids.len(), snap.asks.len());
    }
    match (stats.mid_price, stats.spread) {
        (Some(mid), Some(spread)) => println!("Mid: {:.2}  Spread: {:.2}", mid, spread),
        _ => println!("Mid: N/A  Spread: N/A"),
    }
    println!(
        "Volume bid {:.4} / ask {:.4}  imbalance {:+.2}%",
        stats.total_bid_volume, stats.total_ask_volume, stats.volume_imbalance_pct
    );
    println!("========================\n");
}

fn print_help() {
    println!("Available commands:");
    println!("  top                    - Show latest snapshot-set");
    println!("  venues                 - List venues");
    println!("  toggle <venue>         - Enable/disable a venue");
    println!("  spread                 - Per-venue spread metrics");
    println!("  profile                - Volume profile ($10 buckets)");
    println!("  imbalance              - Bid/ask imbalance over recent ticks");
    println!("  search <price>         - Levels within 0.1% of price");
    println!("  history [ticks_ago]    - Historical snapshot-set");
    println!("  range <min> <max>      - Set price filter (range off to clear)");
    println!("  threshold <qty>        - Set minimum level quantity");
    println!("  timerange <1m|5m|15m|1h> - Set history retention");
    println!("  pause, resume          - Toggle real-time production");
    println!("  json                   - Dump latest snapshot-set as JSON");
    println!("  quit, q                - Exit");
}

async fn run_headless(mut stream: OrderbookStream, duration: Duration) {
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = report.tick() => print_state_summary(&stream.latest()),
        }
    }

    stream.stop();
    info!(history_len = stream.history_len(), ticks = stream.tick_counter(), "Headless run complete");
    stream.shutdown().await;
}

fn apply(stream: &mut OrderbookStream, edit: impl FnOnce(&mut StreamSettings)) {
    let mut settings = stream.settings();
    edit(&mut settings);
    match settings.validate() {
        Ok(()) => stream.update_settings(settings),
        Err(e) => println!("Rejected: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let cli = Cli::parse();

    telemetry::init_tracing(&cli.log_level);
    telemetry::init_metrics(cli.metrics_port)?;

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }

    let mut stream = OrderbookStream::new(OrderbookGenerator::from_config(&cfg));
    stream.start(cfg.stream.clone());

    if cli.headless {
        run_headless(stream, Duration::from_secs(cli.duration_secs)).await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // CLI loop
    loop {
        print!("\nLOBVIZ> ");
        io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else { break };
        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();

        match command.as_str() {
            "help" | "h" => print_help(),
            "top" => print_state_summary(&stream.latest()),
            "venues" => {
                for venue in stream.venues() {
                    println!("  {:<10} {:<10} {} {}", venue.id, venue.name, if venue.enabled { "on " } else { "off" }, venue.color);
                }
            }
            "toggle" => match parts.get(1) {
                Some(id) => {
                    stream.toggle_venue(id);
                    println!("Toggled {} (applies on next tick)", id);
                }
                None => println!("Usage: toggle <venue>"),
            },
            "spread" => {
                for m in analytics::spread_metrics(&stream.latest()) {
                    println!(
                        "  {:<10} bid {:.2} ask {:.2} spread {:.2} ({:.4}%) {:?} liquidity {:.4}",
                        m.venue_id, m.bid_price, m.ask_price, m.spread, m.spread_pct, m.category, m.liquidity
                    );
                }
            }
            "profile" => {
                for level in analytics::volume_profile(&stream.latest(), DEFAULT_PROFILE_BUCKET, DEFAULT_PROFILE_DEPTH) {
                    println!(
                        "  {:>10.2} bid {:>9.4} ask {:>9.4} total {:>9.4} [{}]",
                        level.price, level.bid_volume, level.ask_volume, level.total_volume, level.venues.join(",")
                    );
                }
            }
            "imbalance" => {
                for point in analytics::imbalance_series(&stream.history(), &stream.latest(), 20) {
                    println!("  tick {:>6} ratio {:.3} {:?}", point.tick, point.ratio, point.signal);
                }
            }
            "search" => match parts.get(1).and_then(|p| p.parse::<f64>().ok()) {
                Some(target) => {
                    let found = analytics::search_price_levels(&stream.latest(), target);
                    if found.is_empty() {
                        println!("No levels near {}", target);
                    }
                    for m in found {
                        println!("  {:<10} {} {:.2} qty {:.4} total {:.4}", m.venue_id, m.side.as_str(), m.price, m.quantity, m.cumulative_total);
                    }
                }
                None => println!("Usage: search <price>"),
            },
            "history" => {
                let ago = parts.get(1).and_then(|p| p.parse::<usize>().ok()).unwrap_or(0);
                println!("Retained {} snapshot-sets", stream.history_len());
                print_state_summary(&stream.snapshot_ago(ago));
            }
            "range" => match (parts.get(1), parts.get(2)) {
                (Some(&"off"), None) => apply(&mut stream, |s| s.price_range = None),
                (Some(min), Some(max)) => match (min.parse::<f64>(), max.parse::<f64>()) {
                    (Ok(min), Ok(max)) => apply(&mut stream, |s| s.price_range = Some((min, max))),
                    _ => println!("Invalid numbers"),
                },
                _ => println!("Usage: range <min> <max> | range off"),
            },
            "threshold" => match parts.get(1).and_then(|p| p.parse::<f64>().ok()) {
                Some(q) => apply(&mut stream, |s| s.quantity_threshold = q),
                None => println!("Usage: threshold <qty>"),
            },
            "timerange" => match parts.get(1).map(|p| p.parse::<TimeRange>()) {
                Some(Ok(range)) => apply(&mut stream, |s| s.time_range = range),
                Some(Err(e)) => println!("{}", e),
                None => println!("Usage: timerange <1m|5m|15m|1h>"),
            },
            "pause" => apply(&mut stream, |s| s.real_time_mode = false),
            "resume" => apply(&mut stream, |s| s.real_time_mode = true),
            "json" => println!("{}", serde_json::to_string_pretty(&*stream.latest())?),
            "quit" | "q" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "" => continue,
            _ => {
                println!("Unknown command. Type 'help' for available commands.");
            }
        }
    }

    stream.shutdown().await;
    Ok(())
}
