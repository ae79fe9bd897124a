use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use sniper_bot::{
    config::AppConfig,
    executor::Executor,
    listener::{HttpPostSource, Listener},
    notifier::Notifier,
    portfolio::Portfolio,
    publisher::Publisher,
    radar::MarketRadar,
    smart_money::{wallet_scorer::WalletScorer, SmartMoneyTracker},
    store::Store,
    utils::logging,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level override (falls back to config/env when absent)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load()?;
    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    logging::init_logging(log_level)?;

    info!(name = sniper_bot::NAME, version = sniper_bot::VERSION, "starting sniping engine");

    let store = Arc::new(Store::connect(&config.store).await?);
    let notifier = Arc::new(Notifier::new(config.messenger.clone()));
    let publisher = Arc::new(Publisher::new(store.clone(), notifier.clone(), config.store.signal_recency_cap));

    let radar = Arc::new(MarketRadar::new(config.radar.clone(), publisher.clone()));
    let wallet_scorer = Arc::new(WalletScorer::new(store.clone(), &config.store));
    let smart_money = Arc::new(SmartMoneyTracker::new(
        config.smart_money.clone(),
        wallet_scorer.clone(),
        publisher.clone(),
    ));

    let portfolio = Arc::new(Portfolio::new(config.portfolio.initial_capital));
    let executor = Arc::new(Executor::new(config.executor.clone(), portfolio.clone()));

    let post_source = Arc::new(HttpPostSource::new(config.listener.social_base_url.clone()));
    let listener = Arc::new(Listener::new(
        config.listener.clone(),
        radar.clone(),
        store.clone(),
        executor.clone(),
        publisher.clone(),
        post_source,
    ));

    let radar_handle = {
        let radar = radar.clone();
        let ttl = config.radar.cache_ttl_seconds;
        tokio::spawn(async move {
            loop {
                radar.scan(false).await;
                tokio::time::sleep(std::time::Duration::from_secs(ttl)).await;
            }
        })
    };

    let listener_handle = {
        let listener = listener.clone();
        tokio::spawn(async move { listener.run().await })
    };

    let gc_handle = {
        let smart_money = smart_money.clone();
        let gc_age = config.smart_money.gc_age_seconds;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                smart_money.gc(gc_age).await;
            }
        })
    };

    info!("all workers started; awaiting shutdown signal");
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }

    listener.stop();
    radar_handle.abort();
    listener_handle.abort();
    gc_handle.abort();

    info!("shutdown complete");
    Ok(())
}
