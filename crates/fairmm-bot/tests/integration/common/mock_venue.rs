//! Paper venue wrapper with a scripted margin ratio and latency.

use std::sync::Arc;
use std::time::Duration;

use fairmm_core::{
    AccountInfo, BoxFuture, Market, Order, OrderIntent, PlacedOrder, Position,
};
use fairmm_exchange::{Exchange, ExchangeResult, OrderbookCallback, PaperExchange};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Delegates to a [`PaperExchange`], except that `get_account` reports a
/// margin ratio chosen by the test once one is set, and `get_open_orders`
/// can be slowed down.
pub struct MarginVenue {
    paper: Arc<PaperExchange>,
    ratio: Mutex<Option<Decimal>>,
    open_orders_delay: Mutex<Option<Duration>>,
}

impl MarginVenue {
    pub fn new(paper: Arc<PaperExchange>) -> Self {
        Self {
            paper,
            ratio: Mutex::new(None),
            open_orders_delay: Mutex::new(None),
        }
    }

    pub fn set_margin_ratio(&self, ratio: Decimal) {
        *self.ratio.lock() = Some(ratio);
    }

    /// Delay every later `get_open_orders` response by `delay`.
    pub fn set_open_orders_delay(&self, delay: Duration) {
        *self.open_orders_delay.lock() = Some(delay);
    }
}

impl Exchange for MarginVenue {
    fn name(&self) -> &'static str {
        "paper-margin"
    }

    fn connect(&self) -> BoxFuture<'_, ExchangeResult<()>> {
        self.paper.connect()
    }

    fn disconnect(&self) -> BoxFuture<'_, ExchangeResult<()>> {
        self.paper.disconnect()
    }

    fn get_markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>> {
        self.paper.get_markets()
    }

    fn subscribe_orderbook<'a>(
        &'a self,
        symbol: &'a str,
        callback: OrderbookCallback,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        self.paper.subscribe_orderbook(symbol, callback)
    }

    fn unsubscribe_orderbook<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        self.paper.unsubscribe_orderbook(symbol)
    }

    fn get_account(&self) -> BoxFuture<'_, ExchangeResult<AccountInfo>> {
        Box::pin(async move {
            let account = self.paper.get_account().await?;
            let ratio = *self.ratio.lock();
            Ok(match ratio {
                Some(ratio) => AccountInfo {
                    equity: dec!(1000),
                    available_margin: dec!(1000) * ratio,
                },
                None => account,
            })
        })
    }

    fn get_positions(&self) -> BoxFuture<'_, ExchangeResult<Vec<Position>>> {
        self.paper.get_positions()
    }

    fn get_open_orders<'a>(
        &'a self,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Order>>> {
        Box::pin(async move {
            let delay = *self.open_orders_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.paper.get_open_orders(symbol).await
        })
    }

    fn place_order(&self, intent: OrderIntent) -> BoxFuture<'_, ExchangeResult<PlacedOrder>> {
        self.paper.place_order(intent)
    }

    fn cancel_order<'a>(
        &'a self,
        order_id: &'a str,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        self.paper.cancel_order(order_id, symbol)
    }

    fn cancel_all_orders<'a>(
        &'a self,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        self.paper.cancel_all_orders(symbol)
    }
}
