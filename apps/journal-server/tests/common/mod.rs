//! In-process stand-in for the upstream price feed.
//!
//! A real WebSocket server bound to a local port: it records every control
//! frame the hub sends, pushes arbitrary frames to the connected client,
//! and can drop the active connection to exercise the reconnect path.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

pub struct MockFeed {
    addr: SocketAddr,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: broadcast::Sender<String>,
    close_signal: Arc<Notify>,
    connections: Arc<AtomicUsize>,
}

impl MockFeed {
    /// Bind a local port and accept feed connections until dropped.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let (outbound_tx, _) = broadcast::channel::<String>(64);
        let close_signal = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));

        let accept_outbound = outbound_tx.clone();
        let accept_close = Arc::clone(&close_signal);
        let accept_connections = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                accept_connections.fetch_add(1, Ordering::SeqCst);

                let inbound = inbound_tx.clone();
                let mut outbound = accept_outbound.subscribe();
                let close = Arc::clone(&accept_close);
                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            frame = read.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = inbound.send(text.to_string());
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                            pushed = outbound.recv() => {
                                if let Ok(text) = pushed
                                    && write.send(Message::Text(text.into())).await.is_err()
                                {
                                    break;
                                }
                            }
                            () = close.notified() => {
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            inbound: inbound_rx,
            outbound: outbound_tx,
            close_signal,
            connections,
        }
    }

    /// WebSocket URL for the hub to dial.
    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Push a frame to every connected client.
    pub fn push(&self, frame: &str) {
        let _ = self.outbound.send(frame.to_string());
    }

    /// Push a single-record trade frame.
    pub fn push_trade(&self, symbol: &str, price: &str, timestamp: i64) {
        self.push(&format!(
            r#"{{"type":"trade","data":[{{"s":"{symbol}","p":{price},"t":{timestamp}}}]}}"#
        ));
    }

    /// Close the active connection from the server side.
    pub fn drop_connection(&self) {
        self.close_signal.notify_one();
    }

    /// Wait for the next control frame from the hub, parsed as JSON.
    pub async fn expect_control(&mut self) -> serde_json::Value {
        let text = timeout(WAIT, self.inbound.recv())
            .await
            .expect("timed out waiting for a control frame")
            .expect("feed server stopped");
        serde_json::from_str(&text).expect("control frame is JSON")
    }

    /// Wait until the hub has sent subscribe requests for exactly the given
    /// symbols, in any order.
    pub async fn expect_subscribes(&mut self, mut symbols: Vec<&str>) {
        symbols.sort_unstable();
        let mut seen = Vec::new();
        while seen.len() < symbols.len() {
            let control = self.expect_control().await;
            assert_eq!(control["type"], "subscribe", "unexpected frame: {control}");
            seen.push(control["symbol"].as_str().unwrap().to_string());
        }
        seen.sort_unstable();
        assert_eq!(seen, symbols);
    }
}

/// Poll `check` until it passes or the deadline lapses.
pub async fn wait_for<F>(mut check: F, what: &str)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
