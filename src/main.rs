use std::time::Instant;

use chrono::Duration;
use fxdata::{
    BrickFeed, DataKind, GridRenkoFeed, Market, Pair, PriceSource, Rate, RenkoFeed, Session,
    Source, Symbol, Tick, TickOn, TickSet, TradeDate,
};
use tracing_subscriber::EnvFilter;

const RAW_TICK_BYTES: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("FX Tick Set Codec");
    println!("=================\n");

    let session = Session::new(TradeDate::from_ymd(2016, 1, 4)?, Market::NewYork)?;
    let mut tick_set = TickSet::new(Source::Dukascopy, Pair::new(Symbol::EurUsd), session);

    let start = session.min_tick_on().value();
    let mut bid = 108_500;
    for i in 0..10_000i64 {
        let drift = ((i as f64 / 150.0).sin() * 3.0).round() as i32;
        bid += drift;
        let value = start + Duration::milliseconds(i * 250 + (i % 7) * 13);
        let tick_on = TickOn::new(value, &session)?;
        let bid_rate = Rate::from_int(bid)?;
        let ask_rate = bid_rate.checked_add(2 + (i % 3) as i32)?;
        tick_set.add(Tick::new(tick_on, bid_rate, ask_rate)?)?;
    }

    println!("Original data:");
    println!("  Tick set: {}", tick_set);
    println!("  Ticks: {}", tick_set.len());
    let original_size = tick_set.len() * RAW_TICK_BYTES;
    println!("  Raw size: {} bytes\n", original_size);

    let started = Instant::now();
    let encoded = tick_set.save(DataKind::Sts)?;
    let encode_time = started.elapsed();
    println!("Encoded data:");
    println!("  Size: {} bytes", encoded.len());
    println!(
        "  Compression ratio: {:.2}%",
        encoded.len() as f64 / original_size as f64 * 100.0
    );
    println!("  Encode time: {:?}\n", encode_time);

    let started = Instant::now();
    let mut restored = TickSet::from_file_name(&tick_set.file_name(DataKind::Sts))?;
    restored.load(&encoded, DataKind::Sts)?;
    println!("Decoded data:");
    println!("  Ticks restored: {}", restored.len());
    println!("  Identical: {}", restored == tick_set);
    println!("  Decode time: {:?}\n", started.elapsed());

    println!("--- File I/O ---");
    let dir = std::env::temp_dir();
    let path = tick_set.full_path(&dir, DataKind::Sts);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tick_set.write_to_file(&path, DataKind::Sts)?;
    println!("Written to: {}", path.display());
    let mut loaded = TickSet::from_file_name(&tick_set.file_name(DataKind::Sts))?;
    loaded.read_from_file(&path, DataKind::Sts)?;
    println!("Loaded {} ticks from file", loaded.len());
    std::fs::remove_file(&path).ok();
    println!("Cleanup complete\n");

    println!("--- Feeds ---");
    let mut brick_feed = BrickFeed::new(10)?;
    let mut renko = RenkoFeed::new(session, PriceSource::Mid, 10, false)?;
    let mut grid = GridRenkoFeed::new(session, 10)?;
    for tick in &tick_set {
        brick_feed.handle_tick(tick)?;
        renko.handle_tick(tick)?;
        grid.handle_tick(tick)?;
    }
    println!("Brick feed:  {} bricks, {}", brick_feed.len(), brick_feed.pattern(20));
    println!("Renko feed:  {} bricks, {}", renko.len(), tail(&renko.pattern(true)));
    println!("Grid renko:  {} bricks, {}", grid.len(), grid.pattern(20));

    Ok(())
}

fn tail(pattern: &str) -> &str {
    &pattern[pattern.len().saturating_sub(20)..]
}
