//! Pythd Client Binary
//!
//! A small publisher loop: connects to the oracle daemon, lists the
//! products it serves, and — when a publish account is configured —
//! subscribes to its price schedule and publishes a configured price on
//! every schedule signal.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin pythd-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `PYTHD_WS_URL`: WebSocket endpoint of the daemon, e.g.
//!   `ws://127.0.0.1:8910`
//!
//! ## Optional
//! - `PYTHD_PUBLISH_ACCOUNT`: Price account to publish for; list-only
//!   when unset
//! - `PYTHD_PUBLISH_PRICE`: Scaled integer price to publish (default: 0)
//! - `PYTHD_PUBLISH_CONF`: Scaled confidence interval (default: 0)
//! - `PYTHD_RECONNECT_DELAY_INITIAL_MS`, `PYTHD_RECONNECT_DELAY_MAX_SECS`,
//!   `PYTHD_RECONNECT_DELAY_MULTIPLIER`, `PYTHD_RECONNECT_JITTER`:
//!   Backoff tuning
//! - `RUST_LOG`: Log filter (default: `pythd_client=info`)

use std::time::Duration;

use pythd_client::{ClientConfig, PriceStatus, PythClient, telemetry};
use tokio::signal;

/// How long to wait before retrying a resubscribe after a reset.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let config = ClientConfig::from_env()?;
    tracing::info!(url = %config.url, "starting pythd client");

    let client = PythClient::connect(config).await?;

    let products = client.get_product_list().await?;
    tracing::info!(count = products.len(), "oracle serves products");
    for product in &products {
        tracing::debug!(
            account = %product.account,
            symbol = %product.attr_dict.symbol,
            price_accounts = product.price.len(),
            "product"
        );
    }

    let publish_account = std::env::var("PYTHD_PUBLISH_ACCOUNT").ok();
    let price = parse_env_i64("PYTHD_PUBLISH_PRICE", 0);
    let conf = parse_env_u64("PYTHD_PUBLISH_CONF", 0);

    match publish_account {
        Some(account) => {
            tokio::select! {
                () = publish_loop(&client, &account, price, conf) => {}
                _ = signal::ctrl_c() => {
                    tracing::info!("received Ctrl+C, shutting down");
                }
            }
        }
        None => {
            tracing::info!("no PYTHD_PUBLISH_ACCOUNT configured, listing only");
            let _ = signal::ctrl_c().await;
            tracing::info!("received Ctrl+C, shutting down");
        }
    }

    client.close();
    Ok(())
}

/// Subscribe and publish on every schedule signal, resubscribing after
/// each connection reset.
async fn publish_loop(client: &PythClient, account: &str, price: i64, conf: u64) {
    loop {
        let mut subscription = match client.subscribe_price_sched(account).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(error = %e, account, "subscribe failed, retrying");
                tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                continue;
            }
        };

        while subscription.signals.recv().await.is_some() {
            match client
                .update_price(account, price, conf, PriceStatus::Trading)
                .await
            {
                Ok(()) => tracing::debug!(account, price, conf, "published price"),
                Err(e) => tracing::warn!(error = %e, account, "price update failed"),
            }
        }

        // channel closed: the connection was reset and the subscription
        // died with it
        tracing::info!(account, "subscription invalidated, resubscribing");
    }
}

fn parse_env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
