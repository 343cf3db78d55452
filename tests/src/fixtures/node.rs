//! Scripted Istanbul node speaking JSON-RPC over an in-memory WebSocket.
//!
//! Serves the methods the monitor uses from a [`Chain`], records every
//! request it sees, and can be told to stay silent on chosen methods or to
//! drop the connection.

use super::chain::Chain;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_types::{quantity, to_checksum, Header};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use sw_01_rpc_transport::codec::{self, encode_error, encode_notification, encode_response, Frame};
use sw_01_rpc_transport::error::codes;
use sw_01_rpc_transport::{RemoteError, RpcClient, Session, TransportConfig};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{protocol::Role, Message};
use tokio_tungstenite::WebSocketStream;

/// Subscription id handed out for `eth_subscribe`.
pub const SUBSCRIPTION_ID: &str = "0x9cef478923ff08bf67fde6c64013158d";

pub const NODE_ENODE: &str = "enode://79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8@127.0.0.1:21000?discport=0";

enum Push {
    Text(String),
    Close,
}

struct NodeState {
    chain: Mutex<Chain>,
    silent: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
    admin_enabled: bool,
}

impl NodeState {
    fn respond(&self, id: u64, method: &str, params: &[Value]) -> String {
        let result = match method {
            "eth_getBlockByNumber" => {
                let chain = self.chain.lock();
                let header = match params.first().and_then(Value::as_str) {
                    Some("latest") => Some(chain.head()),
                    Some(tag) => quantity::parse(tag).ok().and_then(|n| chain.header(n)),
                    None => None,
                };
                match header {
                    Some(header) => header_json(header),
                    None => Value::Null,
                }
            }
            "istanbul_getValidators" => {
                let validators: Vec<String> = self
                    .chain
                    .lock()
                    .validators()
                    .iter()
                    .map(to_checksum)
                    .collect();
                json!(validators)
            }
            "admin_nodeInfo" if self.admin_enabled => json!({
                "id": "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
                "name": "Geth/v1.9.7-stable/linux-amd64/go1.13.4",
                "enode": NODE_ENODE,
                "ip": "127.0.0.1",
                "ports": {"discovery": 0, "listener": 21000},
                "listenAddr": "[::]:21000",
                "protocols": {"istanbul": {"network": 2018, "consensus": "istanbul"}}
            }),
            "admin_peers" if self.admin_enabled => json!([]),
            "eth_subscribe" => json!(SUBSCRIPTION_ID),
            other => {
                let error = RemoteError::new(
                    codes::METHOD_NOT_FOUND,
                    format!("the method {} does not exist/is not available", other),
                );
                return encode_error(id, &error);
            }
        };
        encode_response(id, &result)
    }
}

pub fn header_json(header: &Header) -> Value {
    serde_json::to_value(header).expect("header serializes")
}

/// Handle to a running fake node.
#[derive(Clone)]
pub struct FakeNode {
    state: Arc<NodeState>,
    pushes: mpsc::UnboundedSender<Push>,
}

impl FakeNode {
    /// Start a node serving `chain` and return it with a connected client.
    pub async fn start(chain: Chain) -> (Self, RpcClient) {
        Self::start_with(chain, true, TransportConfig::default()).await
    }

    /// Like [`start`](Self::start); `admin_enabled = false` answers the
    /// `admin_*` methods with "method not found" like a locked-down node.
    pub async fn start_with(
        chain: Chain,
        admin_enabled: bool,
        config: TransportConfig,
    ) -> (Self, RpcClient) {
        let (client_io, server_io) = tokio::io::duplex(256 * 1024);
        let client_ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server_ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        let state = Arc::new(NodeState {
            chain: Mutex::new(chain),
            silent: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
            admin_enabled,
        });
        let (pushes_tx, pushes_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(server_ws, Arc::clone(&state), pushes_rx));

        let session = Arc::new(Session::from_stream(client_ws, &config));
        let client = RpcClient::from_session(session, config.default_timeout);
        (
            Self {
                state,
                pushes: pushes_tx,
            },
            client,
        )
    }

    /// Never answer `method` from now on.
    pub fn silence(&self, method: &str) {
        self.state.silent.lock().insert(method.to_string());
    }

    /// Number of requests received for `method`.
    pub fn requests(&self, method: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }

    /// Mine a block without announcing it.
    pub fn mine(&self) -> Header {
        self.state.chain.lock().mine()
    }

    /// Mine a block and announce it on the `newHeads` subscription.
    pub fn mine_and_announce(&self) -> Header {
        let header = self.mine();
        let frame = encode_notification(SUBSCRIPTION_ID, &header_json(&header));
        let _ = self.pushes.send(Push::Text(frame));
        header
    }

    /// Send a raw text frame to the client.
    pub fn push_raw(&self, frame: impl Into<String>) {
        let _ = self.pushes.send(Push::Text(frame.into()));
    }

    /// Close the connection from the node side.
    pub fn disconnect(&self) {
        let _ = self.pushes.send(Push::Close);
    }

    pub fn with_chain<T>(&self, f: impl FnOnce(&Chain) -> T) -> T {
        f(&self.state.chain.lock())
    }
}

async fn serve(
    mut ws: WebSocketStream<DuplexStream>,
    state: Arc<NodeState>,
    mut pushes: mpsc::UnboundedReceiver<Push>,
) {
    loop {
        tokio::select! {
            incoming = ws.next() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                let Ok(Frame::Request { id, method, params }) = codec::decode(text.as_str()) else {
                    continue;
                };
                state.requests.lock().push(method.clone());
                if state.silent.lock().contains(&method) {
                    continue;
                }
                let reply = state.respond(id, &method, &params);
                if ws.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            push = pushes.recv() => match push {
                Some(Push::Text(frame)) => {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Some(Push::Close) | None => {
                    let _ = ws.close(None).await;
                    break;
                }
            },
        }
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
