//! Binance `bookTicker` WebSocket feed (primary-oracle source).
//!
//! Connects to `<url>/ws/<symbol>@bookTicker` and turns every top-of-book
//! update into a mid-price sample. Connection attempts use exponential
//! backoff bounded by `max_connect_attempts`; the same budget applies after
//! each disconnect. When it is exhausted the sample channel closes.

use std::sync::Arc;
use std::time::Duration;

use fairmm_core::{BoxFuture, Clock, Price};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::source::{PriceFeed, PriceSample, SAMPLE_CHANNEL_CAPACITY};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Oracle feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Stream symbol (e.g. "btcusdt").
    #[serde(default)]
    pub symbol: String,

    /// Connection attempts per outage before giving up (minimum 1).
    #[serde(default = "default_max_connect_attempts")]
    pub max_connect_attempts: u32,

    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Maximum delay for exponential backoff.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            symbol: String::new(),
            max_connect_attempts: default_max_connect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl FeedConfig {
    /// Full stream URL.
    pub fn stream_url(&self) -> String {
        format!(
            "{}/ws/{}@bookTicker",
            self.url.trim_end_matches('/'),
            self.symbol.to_lowercase()
        )
    }

    /// Backoff before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self
            .reconnect_base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.reconnect_max_delay_ms);
        Duration::from_millis(delay)
    }
}

fn default_url() -> String {
    "wss://stream.binance.com:9443".to_string()
}
fn default_max_connect_attempts() -> u32 {
    5
}
fn default_reconnect_base_delay_ms() -> u64 {
    1000
}
fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

/// Raw `bookTicker` payload. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct BookTicker {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bid: Decimal,
    #[serde(rename = "a")]
    ask: Decimal,
}

/// Parse a `bookTicker` message into its mid price.
///
/// Returns `Ok(None)` for an empty or crossed book.
pub fn parse_book_ticker(text: &str) -> FeedResult<Option<Price>> {
    let ticker: BookTicker = serde_json::from_str(text)?;
    if ticker.bid <= Decimal::ZERO || ticker.ask <= Decimal::ZERO || ticker.bid > ticker.ask {
        debug!(symbol = %ticker.symbol, bid = %ticker.bid, ask = %ticker.ask, "Unusable book ticker");
        return Ok(None);
    }
    Ok(Some(Price::new((ticker.bid + ticker.ask) / Decimal::TWO)))
}

/// Why the read loop returned.
#[derive(Debug)]
enum StreamEnd {
    Shutdown,
    ReceiverDropped,
    Lost(String),
}

struct FeedSession {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// `bookTicker` price feed.
pub struct BinanceBookTickerFeed {
    config: FeedConfig,
    clock: Arc<dyn Clock>,
    session: Mutex<Option<FeedSession>>,
}

impl BinanceBookTickerFeed {
    pub fn new(config: FeedConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

/// Try to connect up to `max_connect_attempts` times.
///
/// Returns `Ok(None)` if shutdown was requested while retrying.
async fn connect_with_retry(
    config: &FeedConfig,
    shutdown: &CancellationToken,
) -> FeedResult<Option<WsStream>> {
    let url = config.stream_url();
    let max_attempts = config.max_connect_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        info!(url = %url, attempt, "Connecting to price feed");

        let result = tokio::select! {
            () = shutdown.cancelled() => return Ok(None),
            r = connect_async_tls_with_config(url.as_str(), None, true, None) => r,
        };

        match result {
            Ok((stream, _response)) => {
                info!(url = %url, "Price feed connected");
                return Ok(Some(stream));
            }
            Err(e) if attempt >= max_attempts => {
                error!(?e, attempt, "Price feed connect attempts exhausted");
                return Err(FeedError::ConnectionFailed(format!(
                    "{url}: {e} (after {attempt} attempts)"
                )));
            }
            Err(e) => {
                let delay = config.backoff_delay(attempt);
                warn!(?e, attempt, delay_ms = delay.as_millis() as u64, "Price feed connect failed, retrying");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = shutdown.cancelled() => return Ok(None),
                }
            }
        }
    }
}

/// Forward samples until the stream ends, shutdown, or the receiver drops.
async fn read_stream(
    stream: WsStream,
    tx: &mpsc::Sender<PriceSample>,
    clock: &dyn Clock,
    shutdown: &CancellationToken,
) -> StreamEnd {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(?e, "Failed to send Close frame during shutdown");
                }
                return StreamEnd::Shutdown;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match parse_book_ticker(&text) {
                        Ok(Some(mid)) => {
                            let sample = PriceSample::new(mid, clock.now_ms());
                            if tx.send(sample).await.is_err() {
                                return StreamEnd::ReceiverDropped;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(?e, "Failed to parse price feed message"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            return StreamEnd::Lost(e.to_string());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| format!("code={} reason={}", u16::from(f.code), f.reason))
                            .unwrap_or_else(|| "no close frame".to_string());
                        return StreamEnd::Lost(reason);
                    }
                    Some(Err(e)) => return StreamEnd::Lost(e.to_string()),
                    None => return StreamEnd::Lost("stream ended".to_string()),
                    _ => {}
                }
            }
        }
    }
}

/// Session task: read, reconnect within budget, close channel on exit.
async fn run_session(
    mut stream: WsStream,
    config: FeedConfig,
    tx: mpsc::Sender<PriceSample>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) {
    loop {
        match read_stream(stream, &tx, clock.as_ref(), &shutdown).await {
            StreamEnd::Shutdown => {
                info!("Price feed shut down");
                return;
            }
            StreamEnd::ReceiverDropped => {
                info!("Price feed receiver dropped, stopping");
                return;
            }
            StreamEnd::Lost(reason) => {
                warn!(%reason, "Price feed disconnected, reconnecting");
            }
        }

        stream = match connect_with_retry(&config, &shutdown).await {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(e) => {
                error!(?e, "Price feed lost");
                return;
            }
        };
    }
}

impl PriceFeed for BinanceBookTickerFeed {
    fn name(&self) -> &'static str {
        "binance-bookticker"
    }

    fn connect(&self) -> BoxFuture<'_, FeedResult<mpsc::Receiver<PriceSample>>> {
        Box::pin(async move {
            if self.session.lock().is_some() {
                return Err(FeedError::AlreadyConnected);
            }
            crate::init_crypto();

            let shutdown = CancellationToken::new();
            let stream = connect_with_retry(&self.config, &shutdown)
                .await?
                .ok_or_else(|| FeedError::ConnectionFailed("cancelled".to_string()))?;

            let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
            let task = tokio::spawn(run_session(
                stream,
                self.config.clone(),
                tx,
                self.clock.clone(),
                shutdown.clone(),
            ));
            *self.session.lock() = Some(FeedSession { shutdown, task });
            Ok(rx)
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let session = self.session.lock().take();
            let Some(session) = session else {
                return;
            };
            session.shutdown.cancel();
            if let Err(e) = session.task.await {
                warn!(?e, "Price feed task ended abnormally");
            }
        })
    }
}
