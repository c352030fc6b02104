mod args;
mod render;
mod settings;

use args::Args;
use clap::Parser;
use ledger_engine::{EngineConfig, LedgerStore, SimEngine};
use log::{error, info, warn};
use price_gateway::{CoinGeckoClient, FeedCache, ReplayFeed};
use settings::SimSettings;
use sim_api::{AdminCommand, Caller, Command, Identity, PriceFeed, PriceSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tokio::time::sleep;

/// Canned series for `--replay`, cents per BTC.
const REPLAY_SERIES: &[i64] = &[
    5_000_000, 5_150_000, 4_900_000, 5_300_000, 5_600_000, 5_450_000, 5_800_000,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = SimSettings::load(args.config.as_deref())?;

    let db_path = args
        .db
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| settings.db_path.clone());
    let refresh = Duration::from_secs(args.refresh_secs.unwrap_or(settings.refresh_secs));

    let store = LedgerStore::open(&db_path)?;
    let cfg = EngineConfig {
        seed_cash: settings.seed_cash,
        admin_ids: settings.admin_ids.iter().copied().collect(),
    };
    info!("ledger open at {db_path}, {} admin(s)", cfg.admin_ids.len());

    let refetch = Arc::new(Notify::new());

    let (engine, feed): (Arc<SimEngine>, Arc<dyn PriceFeed>) = if args.replay {
        let feed = Arc::new(ReplayFeed::new(REPLAY_SERIES.to_vec()));
        let engine = Arc::new(SimEngine::new(store, cfg, feed.clone()));
        tokio::spawn(replay_loop(feed.clone(), engine.clone(), refresh));
        (engine, feed)
    } else {
        let cache = Arc::new(FeedCache::new());
        let engine = Arc::new(SimEngine::new(store, cfg, cache.clone()));
        let client = CoinGeckoClient::new(settings.feed_url.clone());
        tokio::spawn(fetch_loop(
            client,
            cache.clone(),
            engine.clone(),
            refresh,
            refetch.clone(),
        ));
        (engine, cache)
    };

    let who = Identity::new(args.user_id, args.user_name.clone());
    repl(engine, feed, who, refetch).await
}

/// Fetch, publish, settle, sleep. A failed fetch keeps the last good
/// price in place; `refetch` short-circuits the sleep after a price
/// revert.
async fn fetch_loop(
    client: CoinGeckoClient,
    cache: Arc<FeedCache>,
    engine: Arc<SimEngine>,
    every: Duration,
    refetch: Arc<Notify>,
) {
    loop {
        match client.fetch().await {
            Ok(data) => {
                cache.publish(&data);
                if cache.is_pinned() {
                    info!("price pinned; fetched data cached without settlement");
                } else {
                    settle_tick(&engine, data.snapshot).await;
                }
            }
            Err(e) => warn!("price fetch failed: {e:#}"),
        }
        tokio::select! {
            _ = sleep(every) => {}
            _ = refetch.notified() => info!("immediate refresh requested"),
        }
    }
}

async fn replay_loop(feed: Arc<ReplayFeed>, engine: Arc<SimEngine>, every: Duration) {
    loop {
        sleep(every).await;
        let snapshot = feed.advance();
        info!("replay tick: {} cents", snapshot.price);
        settle_tick(&engine, snapshot).await;
    }
}

/// The ledger is synchronous SQLite; keep it off the async runtime.
async fn settle_tick(engine: &Arc<SimEngine>, snapshot: PriceSnapshot) {
    let engine = engine.clone();
    match tokio::task::spawn_blocking(move || engine.settle(&snapshot)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("settlement pass failed: {e}"),
        Err(e) => error!("settlement task panicked: {e}"),
    }
}

async fn repl(
    engine: Arc<SimEngine>,
    feed: Arc<dyn PriceFeed>,
    who: Identity,
    refetch: Arc<Notify>,
) -> anyhow::Result<()> {
    println!("type !help for commands, quit to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let cmd = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("error: {e}");
                continue;
            }
        };
        let reverting = matches!(cmd, Command::Admin(AdminCommand::RevertPrice));

        // Snapshot price and stats up front; handlers never fetch.
        let price = feed.current();
        let stats = feed.stats();
        let task_engine = engine.clone();
        let task_who = who.clone();
        let result = tokio::task::spawn_blocking(move || {
            task_engine.handle(&task_who, cmd, price.as_ref(), stats.as_ref())
        })
        .await?;

        match result {
            Ok(reply) => {
                println!("{}", render::render(who.display_name(), &reply));
                // A revert means the pinned price is gone; pull real
                // data as soon as possible.
                if reverting {
                    refetch.notify_one();
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }
    Ok(())
}
