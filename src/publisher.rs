/*!
Signal Publisher: fans out signals to subscribers, keeps a bounded per-market
recency list, persists durably, and dispatches critical-alert notifications,
all without letting any of those three ever block the others.
*/

use crate::models::{Side, Signal, SignalType};
use crate::notifier::Notifier;
use crate::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Outbound-signal seam used by producers (Radar, Listener, Smart-Money
/// Tracker) so none of them depends on the Publisher's concrete type.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn emit(
        &self,
        signal_type: SignalType,
        market_id: &str,
        side: Side,
        magnitude: f64,
        metadata: serde_json::Value,
    );
}

/// Discards every signal. Used in tests and standalone component construction
/// where publishing isn't under test.
pub struct NullSink;

#[async_trait]
impl SignalSink for NullSink {
    async fn emit(&self, _: SignalType, _: &str, _: Side, _: f64, _: serde_json::Value) {}
}

pub struct Publisher {
    broadcast_tx: broadcast::Sender<Signal>,
    store: Arc<Store>,
    notifier: Arc<Notifier>,
    recency_cap: isize,
}

impl Publisher {
    pub fn new(store: Arc<Store>, notifier: Arc<Notifier>, recency_cap: isize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            broadcast_tx,
            store,
            notifier,
            recency_cap,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.broadcast_tx.subscribe()
    }

    pub async fn recent(&self, market_id: &str, limit: isize) -> Vec<Signal> {
        self.store.recent_signals(market_id, limit).await
    }
}

#[async_trait]
impl SignalSink for Publisher {
    async fn emit(
        &self,
        signal_type: SignalType,
        market_id: &str,
        side: Side,
        magnitude: f64,
        metadata: serde_json::Value,
    ) {
        let signal = Signal {
            signal_type,
            market_id: market_id.to_string(),
            side,
            magnitude,
            timestamp: chrono::Utc::now(),
            metadata,
        };

        // 1. Broadcast first; subscriber lag/absence must never delay persistence.
        if let Err(e) = self.broadcast_tx.send(signal.clone()) {
            debug!(error = %e, "no active subscribers for signal broadcast");
        }

        // 2 & 3: persistence and recency list, off the emit path.
        let store = self.store.clone();
        let persisted = signal.clone();
        let cap = self.recency_cap;
        tokio::spawn(async move {
            if let Err(e) = store.push_recent_signal(&persisted, cap).await {
                warn!(error = %e, market_id = %persisted.market_id, "failed to record signal recency list");
            }
            if let Err(e) = store.persist_signal(&persisted).await {
                warn!(error = %e, market_id = %persisted.market_id, "failed to persist signal");
            }
        });

        // 4. Critical alerts get a best-effort messenger notification.
        if signal_type == SignalType::CriticalSnipe {
            let notifier = self.notifier.clone();
            let alert = signal.clone();
            tokio::spawn(async move {
                let title = alert
                    .metadata
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&alert.market_id)
                    .to_string();
                if let Err(e) = notifier
                    .send_critical_market_alert(&alert.market_id, &title)
                    .await
                {
                    warn!(error = %e, "failed to dispatch critical alert");
                }
            });
        }
    }
}
