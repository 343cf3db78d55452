//! Subscription handles.
//!
//! Each subscription owns a bounded broadcast channel fed by the receive
//! loop. The loop never waits on a consumer: when the buffer is full the
//! oldest event is overwritten and the consumer observes the gap as lag.

use futures_util::Stream;
use serde_json::Value;
use sw_telemetry::SUBSCRIPTION_LAGGED;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::warn;

/// Subscription ID as returned by the node.
pub type SubscriptionId = String;

/// Handle to one event stream.
///
/// Infinite and not restartable; yields `None` once the session is gone.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: broadcast::Receiver<Value>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, rx: broadcast::Receiver<Value>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next event payload, or `None` after session close or connection loss.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(skipped)) => record_lag(&self.id, skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Consume the handle as a stream of payloads.
    pub fn into_stream(self) -> impl Stream<Item = Value> + Send + 'static {
        let id = self.id;
        BroadcastStream::new(self.rx).filter_map(move |item| match item {
            Ok(payload) => Some(payload),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                record_lag(&id, skipped);
                None
            }
        })
    }
}

fn record_lag(subscription: &str, skipped: u64) {
    SUBSCRIPTION_LAGGED.inc_by(skipped as f64);
    warn!(
        subscription = subscription,
        skipped = skipped,
        "Subscriber lagging, oldest events dropped"
    );
}
