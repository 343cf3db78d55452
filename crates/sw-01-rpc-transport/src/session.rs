//! Transport session over one WebSocket connection.
//!
//! Flow:
//! 1. `call` allocates an id, registers a pending entry and queues the frame
//! 2. The writer task drains the outbound queue into the socket
//! 3. The receive loop decodes frames and resolves pending entries by id
//! 4. The caller wakes on its oneshot receiver or times out
//!
//! When the receive loop exits, for any reason, every call still pending is
//! resolved with the termination cause and every subscription is closed.

use crate::codec::{self, Frame};
use crate::config::TransportConfig;
use crate::error::{RemoteError, TransportError};
use crate::result::{ResultKind, RpcResult};
use crate::subscription::{Subscription, SubscriptionId};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sw_telemetry::{
    log_rpc_event, metric_inc, HistogramTimer, RPC_CALLS, RPC_CALL_DURATION, RPC_PENDING_CALLS,
    SUBSCRIPTION_EVENTS,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, info, warn};

type Delivery = Result<Box<RawValue>, TransportError>;

/// Lifecycle signal shared by the session handle and its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Signal {
    Running,
    Close,
    WriteFailed(String),
}

/// A call waiting for its response.
struct PendingCall {
    method: String,
    sender: oneshot::Sender<Delivery>,
    registered_at: Instant,
    /// Set for subscription-creation calls; registered under the returned id.
    subscription: Option<broadcast::Sender<Value>>,
}

struct CallTable {
    calls: HashMap<u64, PendingCall>,
    /// Set once the receive loop has exited.
    terminated: Option<TransportError>,
}

/// State shared between the handle and the receive loop.
struct Shared {
    calls: Mutex<CallTable>,
    subscriptions: Mutex<HashMap<SubscriptionId, broadcast::Sender<Value>>>,
    next_id: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            calls: Mutex::new(CallTable {
                calls: HashMap::new(),
                terminated: None,
            }),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn dispatch(&self, text: &str) {
        match codec::decode(text) {
            Ok(Frame::Response { id, outcome }) => self.resolve(id, outcome),
            Ok(Frame::Notification {
                subscription,
                payload,
            }) => self.forward(subscription, payload),
            Ok(Frame::Request { id, method, .. }) => {
                debug!(request_id = id, method = %method, "Ignoring request from server");
            }
            Err(e) => warn!(error = %e, "Skipping undecodable frame"),
        }
    }

    fn resolve(&self, id: u64, outcome: Result<Box<RawValue>, RemoteError>) {
        let Some(pending) = self.calls.lock().calls.remove(&id) else {
            debug!(request_id = id, "Dropping response for unknown or abandoned call");
            return;
        };
        RPC_PENDING_CALLS.dec();

        if let (Some(sink), Ok(raw)) = (pending.subscription, outcome.as_ref()) {
            let key = serde_json::from_str::<Value>(raw.get())
                .ok()
                .and_then(|value| codec::subscription_key(&value));
            if let Some(key) = key {
                debug!(subscription = %key, "Registered subscription");
                self.subscriptions.lock().insert(key, sink);
            }
        }

        debug!(
            request_id = id,
            method = %pending.method,
            response_time_ms = pending.registered_at.elapsed().as_millis() as u64,
            "Resolved pending call"
        );
        // The caller may have timed out in the meantime.
        let _ = pending.sender.send(outcome.map_err(TransportError::Remote));
    }

    fn forward(&self, subscription: SubscriptionId, payload: Value) {
        let mut subscriptions = self.subscriptions.lock();
        let delivered = subscriptions
            .get(&subscription)
            .map(|sink| sink.send(payload).is_ok());

        match delivered {
            Some(true) => SUBSCRIPTION_EVENTS.inc(),
            Some(false) => {
                subscriptions.remove(&subscription);
                debug!(subscription = %subscription, "Removed subscription without receivers");
            }
            None => debug!(subscription = %subscription, "Notification for unknown subscription"),
        }
    }

    /// Remove a call that will not wait for its response anymore.
    fn abandon(&self, id: u64) {
        if self.calls.lock().calls.remove(&id).is_some() {
            RPC_PENDING_CALLS.dec();
        }
    }

    fn terminate(&self, cause: TransportError) {
        let drained: Vec<PendingCall> = {
            let mut table = self.calls.lock();
            if table.terminated.is_none() {
                table.terminated = Some(cause.clone());
            }
            table.calls.drain().map(|(_, call)| call).collect()
        };

        for call in drained {
            RPC_PENDING_CALLS.dec();
            let _ = call.sender.send(Err(cause.clone()));
        }

        self.subscriptions.lock().clear();
    }

    fn termination_cause(&self) -> TransportError {
        self.calls
            .lock()
            .terminated
            .clone()
            .unwrap_or(TransportError::Closed)
    }
}

/// Removes the pending entry if the call future ends early (timeout or drop).
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.abandon(self.id);
    }
}

/// One duplex connection with correlated calls and subscriptions.
pub struct Session {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Message>,
    signal: Arc<watch::Sender<Signal>>,
    tasks: tokio::sync::Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
    subscription_buffer: usize,
}

impl Session {
    /// Dial the configured endpoint.
    pub async fn open(config: &TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        let connect_error = |reason: String| TransportError::Connect {
            url: config.url.clone(),
            reason,
        };

        let (ws, _response) =
            tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str()))
                .await
                .map_err(|_| connect_error("handshake timed out".to_string()))?
                .map_err(|e| connect_error(e.to_string()))?;

        info!(url = %config.url, "Connected to node");
        Ok(Self::from_stream(ws, config))
    }

    /// Run a session over an established WebSocket stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stream<S>(ws: WebSocketStream<S>, config: &TransportConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let shared = Arc::new(Shared::new());
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer.max(1));
        let (signal_tx, signal_rx) = watch::channel(Signal::Running);
        let signal = Arc::new(signal_tx);

        let writer = tokio::spawn(write_loop(
            sink,
            outbound_rx,
            signal.clone(),
            signal_rx.clone(),
        ));
        let reader = tokio::spawn(receive_loop(
            stream,
            shared.clone(),
            signal.clone(),
            signal_rx,
        ));

        Self {
            shared,
            outbound: outbound_tx,
            signal,
            tasks: tokio::sync::Mutex::new(Some((reader, writer))),
            subscription_buffer: config.subscription_buffer.max(1),
        }
    }

    /// Send a request and wait up to `timeout` for its response.
    pub async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        kind: ResultKind,
        timeout: Duration,
    ) -> Result<RpcResult, TransportError> {
        let outcome = self
            .request(method, params, timeout, None)
            .await
            .and_then(|raw| into_result(method, &raw, kind));
        record_outcome(method, &outcome);
        outcome
    }

    /// Create a subscription with `method` (e.g. `eth_subscribe`).
    ///
    /// The returned handle sees every notification that follows the
    /// creation response.
    pub async fn subscribe(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Subscription, TransportError> {
        let (sink, rx) = broadcast::channel(self.subscription_buffer);
        let outcome = self
            .request(method, params, timeout, Some(sink))
            .await
            .and_then(|raw| {
                serde_json::from_str::<Value>(raw.get())
                    .ok()
                    .and_then(|value| codec::subscription_key(&value))
                    .ok_or_else(|| TransportError::Decode {
                        method: method.to_string(),
                        reason: format!("invalid subscription id {}", raw.get()),
                    })
            });
        record_outcome(method, &outcome);

        let id = outcome?;
        info!(method = %method, subscription = %id, "Subscribed");
        Ok(Subscription::new(id, rx))
    }

    async fn request(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
        subscription: Option<broadcast::Sender<Value>>,
    ) -> Result<Box<RawValue>, TransportError> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = codec::encode_request(id, method, &params);
        let (tx, rx) = oneshot::channel();

        {
            let mut table = self.shared.calls.lock();
            if let Some(cause) = &table.terminated {
                return Err(cause.clone());
            }
            table.calls.insert(
                id,
                PendingCall {
                    method: method.to_string(),
                    sender: tx,
                    registered_at: Instant::now(),
                    subscription,
                },
            );
        }
        RPC_PENDING_CALLS.inc();
        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };
        let _timer = HistogramTimer::new(&RPC_CALL_DURATION);
        log_rpc_event!(debug, "Registered pending call", method, id);

        let deadline = tokio::time::Instant::now() + timeout;
        let timed_out = || {
            warn!(
                request_id = id,
                method = %method,
                timeout_ms = timeout.as_millis() as u64,
                "Call timed out"
            );
            TransportError::Timeout {
                method: method.to_string(),
                timeout,
            }
        };

        match tokio::time::timeout_at(deadline, self.outbound.send(Message::Text(frame.into())))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(self.shared.termination_cause()),
            Err(_) => return Err(timed_out()),
        }

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(_)) => Err(self.shared.termination_cause()),
            Err(_) => Err(timed_out()),
        }
    }

    /// Stop the session and wait for the receive loop to exit.
    ///
    /// Idempotent. Calls still pending are resolved with `Closed`.
    pub async fn close(&self) {
        let mut tasks = self.tasks.lock().await;
        signal(&self.signal, Signal::Close);

        if let Some((reader, writer)) = tasks.take() {
            if let Err(e) = reader.await {
                warn!(error = %e, "Receive loop ended abnormally");
            }
            if let Err(e) = writer.await {
                warn!(error = %e, "Writer task ended abnormally");
            }
            info!("Session closed");
        }
    }

    /// Whether the receive loop has exited.
    pub fn is_closed(&self) -> bool {
        self.shared.calls.lock().terminated.is_some()
    }

    /// Number of calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.shared.calls.lock().calls.len()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.lock().len()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        signal(&self.signal, Signal::Close);
    }
}

/// Move from `Running` to `next`; later signals are ignored.
fn signal(sender: &watch::Sender<Signal>, next: Signal) {
    sender.send_if_modified(|current| {
        if *current == Signal::Running {
            *current = next;
            true
        } else {
            false
        }
    });
}

fn into_result(method: &str, raw: &RawValue, kind: ResultKind) -> Result<RpcResult, TransportError> {
    match kind {
        ResultKind::Raw => Ok(RpcResult::Raw(raw.get().as_bytes().to_vec())),
        ResultKind::Structured => serde_json::from_str(raw.get())
            .map(RpcResult::Structured)
            .map_err(|e| TransportError::Decode {
                method: method.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn record_outcome<T>(method: &str, outcome: &Result<T, TransportError>) {
    let label = match outcome {
        Ok(_) => "ok",
        Err(e) => e.outcome_label(),
    };
    metric_inc!(RPC_CALLS, &[method, label]);
}

async fn write_loop<W>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Message>,
    signal_tx: Arc<watch::Sender<Signal>>,
    mut signal_rx: watch::Receiver<Signal>,
) where
    W: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!(error = %e, "WebSocket write failed");
                        signal(&signal_tx, Signal::WriteFailed(e.to_string()));
                        return;
                    }
                }
                None => break,
            },
            changed = signal_rx.changed() => {
                if changed.is_err() || *signal_rx.borrow() != Signal::Running {
                    break;
                }
            }
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "WebSocket close handshake failed");
    }
}

async fn receive_loop<R>(
    mut stream: R,
    shared: Arc<Shared>,
    signal_tx: Arc<watch::Sender<Signal>>,
    mut signal_rx: watch::Receiver<Signal>,
) where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let cause = loop {
        tokio::select! {
            changed = signal_rx.changed() => {
                let current = if changed.is_err() {
                    Signal::Close
                } else {
                    signal_rx.borrow().clone()
                };
                match current {
                    Signal::Running => continue,
                    Signal::Close => break TransportError::Closed,
                    Signal::WriteFailed(reason) => break TransportError::ConnectionLost(reason),
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => shared.dispatch(text.as_str()),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => shared.dispatch(text),
                    Err(_) => warn!(len = data.len(), "Skipping non-UTF-8 binary frame"),
                },
                // tungstenite queues the pong reply itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    break TransportError::ConnectionLost(match frame {
                        Some(frame) => format!(
                            "closed by peer: {} {}",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        ),
                        None => "closed by peer".to_string(),
                    });
                }
                Some(Err(e)) => break TransportError::ConnectionLost(e.to_string()),
                None => break TransportError::ConnectionLost("stream ended".to_string()),
            }
        }
    };

    match &cause {
        TransportError::Closed => debug!("Receive loop stopping on close"),
        other => warn!(error = %other, "Receive loop terminated"),
    }

    shared.terminate(cause);
    signal(&signal_tx, Signal::Close);
}
