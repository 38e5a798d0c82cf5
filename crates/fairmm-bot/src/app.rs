//! Application wiring and main run loop.

use std::sync::Arc;
use std::time::Duration;

use fairmm_core::{Clock, SystemClock};
use fairmm_exchange::{DynExchange, ExchangeKind, PaperExchange};
use fairmm_feed::{BinanceBookTickerFeed, PriceFeed, PriceSource, VenueMidFeed};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::events::TracingEventSink;
use crate::orchestrator::Orchestrator;
use crate::paper_mark::PaperMarkFeed;

/// Build the venue adapter. The paper venue is also returned concretely so
/// the feed can drive its marks.
pub fn build_exchange(config: &AppConfig) -> (DynExchange, Option<Arc<PaperExchange>>) {
    match config.exchange {
        ExchangeKind::Paper => {
            let paper = Arc::new(PaperExchange::new(config.paper.clone()));
            let exchange: DynExchange = paper.clone();
            (exchange, Some(paper))
        }
    }
}

/// Build the configured price feed.
pub fn build_feed(
    config: &AppConfig,
    exchange: DynExchange,
    paper: Option<Arc<PaperExchange>>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn PriceFeed> {
    match config.price_source {
        PriceSource::PrimaryOracle => {
            let oracle: Arc<dyn PriceFeed> =
                Arc::new(BinanceBookTickerFeed::new(config.feed.clone(), clock));
            match paper {
                Some(paper) => Arc::new(PaperMarkFeed::new(oracle, paper, config.symbol.clone())),
                None => oracle,
            }
        }
        PriceSource::VenueMid => {
            Arc::new(VenueMidFeed::new(exchange, config.symbol.clone(), clock))
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
}

impl Application {
    /// Validate the configuration and wire up all collaborators.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (exchange, paper) = build_exchange(&config);
        let feed = build_feed(&config, exchange.clone(), paper, clock.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            config.clone(),
            exchange,
            feed,
            clock,
            Arc::new(TracingEventSink),
        )?);

        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Start, log status periodically, stop on Ctrl+C.
    pub async fn run(&self) -> AppResult<()> {
        info!(
            symbol = %self.config.symbol,
            exchange = %self.config.exchange,
            price_source = %self.config.price_source,
            "Starting orchestrator"
        );

        let started = tokio::select! {
            result = self.orchestrator.start() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received during startup");
                self.orchestrator.stop().await;
                return Ok(());
            }
        };
        if let Err(e) = started {
            error!(error = %e, "Startup failed");
            self.orchestrator.stop().await;
            return Err(e);
        }

        let period = Duration::from_millis(self.config.status_interval_ms);
        let mut status_interval =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = status_interval.tick() => self.log_status(),
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.orchestrator.stop().await;
        self.log_status();
        Ok(())
    }

    fn log_status(&self) {
        let status = self.orchestrator.status();
        match serde_json::to_string(&status) {
            Ok(json) => info!(
                state = %status.state,
                fair_price = ?status.fair_price.map(|p| p.to_string()),
                notional_usd = %status.exposure.notional_usd,
                close_mode = status.is_close_mode,
                status = %json,
                "Status"
            ),
            Err(e) => warn!(error = %e, "Failed to serialize status"),
        }
    }
}
