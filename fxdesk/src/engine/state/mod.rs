use crate::{
    Timed,
    config::SimulationConfig,
    engine::{convert::CurrencyConverter, lot::manager::LotManager},
    event::HedgeOrder,
};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use fxdesk_instrument::{Side, currency::Currency, pair::CurrencyPair};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Most-recent [`MarketUpdate`](crate::event::MarketUpdate) payload cached by the engine,
/// together with the update's event time.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct MarketQuote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
    pub time: DateTime<Utc>,
}

/// Dealing-desk accounting state.
///
/// Value-semantic: every transition consumes `self` and returns a new instance, so no aliasing
/// survives a handler return. All maps are insertion-ordered (`IndexMap`), which keeps iteration
/// and serialization deterministic across runs.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct EngineState {
    /// Signed cash balance per currency. An absent key is zero.
    pub cash_balances: IndexMap<Currency, Decimal>,

    /// Desk net position per traded pair, in base-currency units.
    pub positions: IndexMap<CurrencyPair, Decimal>,

    /// Most-recent quote per currency pair.
    pub market_rates: IndexMap<CurrencyPair, MarketQuote>,

    /// Free-form configuration values stored by `ConfigUpdate` events.
    pub config_values: IndexMap<SmolStr, SmolStr>,

    /// Ordered log of in-flight hedge orders. Opaque - nothing in the core matches fills
    /// against it.
    pub hedge_orders: Vec<Timed<HedgeOrder>>,

    /// Currency in which equity, exposures and P&L are summarized.
    pub reporting_currency: Currency,

    /// Number of events dispatched since initialization.
    pub event_count: u64,

    /// Present iff lot tracking is enabled.
    pub lot_manager: Option<LotManager>,
}

impl EngineState {
    /// Construct the initial [`Self`] for the provided configuration.
    ///
    /// The [`LotManager`] is present iff lot tracking is enabled, with one empty queue per
    /// configured risk pair (in configuration order).
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            cash_balances: IndexMap::default(),
            positions: IndexMap::default(),
            market_rates: IndexMap::default(),
            config_values: IndexMap::default(),
            hedge_orders: Vec::default(),
            reporting_currency: config.reporting_currency.clone(),
            event_count: 0,
            lot_manager: config
                .lot_tracking
                .enabled
                .then(|| LotManager::new(config.lot_tracking.risk_pairs.iter().cloned())),
        }
    }

    /// Return the cash balance for the provided [`Currency`], zero if absent.
    pub fn cash(&self, currency: &Currency) -> Decimal {
        self.cash_balances
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Return the net position for the provided [`CurrencyPair`], zero if absent.
    pub fn position(&self, pair: &CurrencyPair) -> Decimal {
        self.positions.get(pair).copied().unwrap_or(Decimal::ZERO)
    }

    /// Return a [`CurrencyConverter`] view over the cached market rates.
    pub fn converter(&self) -> CurrencyConverter<'_> {
        CurrencyConverter::new(&self.market_rates)
    }

    pub fn with_cash(mut self, currency: Currency, delta: Decimal) -> Self {
        *self.cash_balances.entry(currency).or_insert(Decimal::ZERO) += delta;
        self
    }

    pub fn with_position(mut self, pair: CurrencyPair, delta: Decimal) -> Self {
        *self.positions.entry(pair).or_insert(Decimal::ZERO) += delta;
        self
    }

    pub fn with_market_rate(mut self, pair: CurrencyPair, quote: MarketQuote) -> Self {
        self.market_rates.insert(pair, quote);
        self
    }

    pub fn with_config_value(mut self, key: SmolStr, value: SmolStr) -> Self {
        self.config_values.insert(key, value);
        self
    }

    pub fn with_hedge_order(mut self, order: Timed<HedgeOrder>) -> Self {
        self.hedge_orders.push(order);
        self
    }

    pub fn with_reporting_currency(mut self, currency: Currency) -> Self {
        self.reporting_currency = currency;
        self
    }

    pub fn with_lot_manager(mut self, manager: LotManager) -> Self {
        self.lot_manager = Some(manager);
        self
    }

    pub fn increment_event_count(mut self) -> Self {
        self.event_count += 1;
        self
    }

    /// Apply the cash and position effects of a trade atomically, in **desk** terms.
    ///
    /// Desk [`Side::Buy`]: the desk receives `notional` of base and pays `notional * price` of
    /// quote. Desk [`Side::Sell`] inverts both flows. Handlers invert client-perspective sides
    /// before calling.
    pub fn apply_trade(
        self,
        pair: &CurrencyPair,
        desk_side: Side,
        notional: Decimal,
        price: Decimal,
    ) -> Self {
        let signed = match desk_side {
            Side::Buy => notional,
            Side::Sell => -notional,
        };

        self.with_cash(pair.base.clone(), signed)
            .with_cash(pair.quote.clone(), -signed * price)
            .with_position(pair.clone(), signed)
    }
}
