use crate::{
    Timed,
    config::SimulationConfig,
    engine::{
        decompose::decompose,
        lot::{
            LotOrigin,
            manager::{LegOutcome, LotManager},
        },
        state::{EngineState, MarketQuote},
    },
    error::DeskError,
    event::{
        ClientTrade, ClockTick, ConfigUpdate, DeskEvent, DeskEventKind, HedgeFill, HedgeOrder,
        MarketUpdate,
    },
    output::{OutputRecord, RecordData, RecordKind, RecordValue},
};
use chrono::{DateTime, Utc};
use fxdesk_instrument::{Side, pair::CurrencyPair};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use tracing::warn;

/// Dispatch one event to the handler for its variant.
///
/// Every handler is a pure function `(state, event) -> (state, records)`: recoverable failures
/// become output records and dispatch continues; the `Err` arm is reserved for invariant
/// breakage, which the processor treats as fatal.
pub fn process(
    state: EngineState,
    config: &SimulationConfig,
    event: &DeskEvent,
) -> Result<(EngineState, Vec<OutputRecord>), DeskError> {
    match &event.kind {
        DeskEventKind::Market(update) => Ok(handle_market_update(state, event.time, update)),
        DeskEventKind::Trade(trade) => handle_client_trade(state, config, event.time, trade),
        DeskEventKind::HedgeOrder(order) => Ok(handle_hedge_order(state, event.time, order)),
        DeskEventKind::HedgeFill(fill) => handle_hedge_fill(state, config, event.time, fill),
        DeskEventKind::Config(update) => Ok(handle_config_update(state, event.time, update)),
        DeskEventKind::Clock(tick) => Ok(handle_clock_tick(state, event.time, tick)),
    }
}

/// Cache a validated quote in `market_rates`.
///
/// A quote violating `bid <= mid <= ask` is rejected with a `validation_error` record and leaves
/// the cached rates untouched.
pub fn handle_market_update(
    state: EngineState,
    time: DateTime<Utc>,
    update: &MarketUpdate,
) -> (EngineState, Vec<OutputRecord>) {
    if update.bid > update.ask || update.mid < update.bid || update.mid > update.ask {
        warn!(
            pair = %update.pair,
            bid = %update.bid,
            ask = %update.ask,
            mid = %update.mid,
            "rejecting market update with inconsistent quote"
        );
        let record = OutputRecord::new(time, RecordKind::ValidationError)
            .with("event", "market_update")
            .with("currency_pair", &update.pair)
            .with("bid", update.bid)
            .with("ask", update.ask)
            .with("mid", update.mid)
            .with("error", "quote violates bid <= mid <= ask");
        return (state.increment_event_count(), vec![record]);
    }

    let record = OutputRecord::new(time, RecordKind::MarketUpdate)
        .with("currency_pair", &update.pair)
        .with("bid", update.bid)
        .with("ask", update.ask)
        .with("mid", update.mid);

    let state = state
        .with_market_rate(
            update.pair.clone(),
            MarketQuote::new(update.bid, update.ask, update.mid, time),
        )
        .increment_event_count();

    (state, vec![record])
}

/// Apply a client trade: cash and position accounting always, lot effects when lot tracking is
/// enabled.
///
/// A decomposition failure (missing rate, un-allowed pair) skips every lot effect of the trade
/// and surfaces as a `lot_tracking_error` record; the accounting legs still apply.
pub fn handle_client_trade(
    state: EngineState,
    config: &SimulationConfig,
    time: DateTime<Utc>,
    trade: &ClientTrade,
) -> Result<(EngineState, Vec<OutputRecord>), DeskError> {
    if let Some(record) = validate_trade_values(
        time,
        "client_trade",
        &trade.trade_id,
        trade.notional,
        trade.price,
    ) {
        return Ok((state.increment_event_count(), vec![record]));
    }

    let mut records = vec![
        OutputRecord::new(time, RecordKind::ClientTrade)
            .with("trade_id", &trade.trade_id)
            .with("client_id", &trade.client_id)
            .with("currency_pair", &trade.pair)
            .with("side", trade.side)
            .with("notional", trade.notional)
            .with("price", trade.price),
    ];

    let desk_side = trade.side.invert();
    let mut state = state.apply_trade(&trade.pair, desk_side, trade.notional, trade.price);

    if let Some(manager) = state.lot_manager.take() {
        let (manager, lot_records) = apply_lot_effects(
            &state,
            config,
            manager,
            time,
            &trade.pair,
            desk_side,
            trade.notional,
            trade.price,
            &trade.trade_id,
        )?;
        records.extend(lot_records);
        state = state.with_lot_manager(manager);
    }

    Ok((state.increment_event_count(), records))
}

/// Record an externally supplied hedge order on the in-flight log.
pub fn handle_hedge_order(
    state: EngineState,
    time: DateTime<Utc>,
    order: &HedgeOrder,
) -> (EngineState, Vec<OutputRecord>) {
    let record = OutputRecord::new(time, RecordKind::HedgeOrder)
        .with("order_id", &order.order_id)
        .with("currency_pair", &order.pair)
        .with("side", order.side)
        .with("notional", order.notional)
        .with("limit_price", order.limit_price);

    let state = state
        .with_hedge_order(Timed::new(order.clone(), time))
        .increment_event_count();

    (state, vec![record])
}

/// Apply a hedge fill: accounting like a client trade, but hedge sides are already the desk's.
///
/// Lot effects require the fill's pair to be a configured hedge pair; a fill outside that set
/// keeps its cash/position accounting but skips lots with a `lot_tracking_error` record.
pub fn handle_hedge_fill(
    state: EngineState,
    config: &SimulationConfig,
    time: DateTime<Utc>,
    fill: &HedgeFill,
) -> Result<(EngineState, Vec<OutputRecord>), DeskError> {
    if let Some(record) = validate_trade_values(
        time,
        "hedge_fill",
        &fill.order_id,
        fill.notional,
        fill.fill_price,
    ) {
        return Ok((state.increment_event_count(), vec![record]));
    }

    let mut records = vec![
        OutputRecord::new(time, RecordKind::HedgeFill)
            .with("order_id", &fill.order_id)
            .with("currency_pair", &fill.pair)
            .with("side", fill.side)
            .with("notional", fill.notional)
            .with("limit_price", fill.limit_price)
            .with("fill_price", fill.fill_price)
            .with("slippage", fill.slippage),
    ];

    let mut state = state.apply_trade(&fill.pair, fill.side, fill.notional, fill.fill_price);

    if config.lot_tracking.hedge_fills_open_lots
        && let Some(manager) = state.lot_manager.take()
    {
        if config.lot_tracking.hedge_pairs.contains(&fill.pair) {
            let (manager, lot_records) = apply_lot_effects(
                &state,
                config,
                manager,
                time,
                &fill.pair,
                fill.side,
                fill.notional,
                fill.fill_price,
                &fill.order_id,
            )?;
            records.extend(lot_records);
            state = state.with_lot_manager(manager);
        } else {
            warn!(
                order_id = %fill.order_id,
                pair = %fill.pair,
                "skipping lot effects for hedge fill outside the configured hedge pairs"
            );
            records.push(
                OutputRecord::new(time, RecordKind::LotTrackingError)
                    .with("trade_id", &fill.order_id)
                    .with("currency_pair", &fill.pair)
                    .with("error", "unsupported-hedge-pair")
                    .with(
                        "detail",
                        format!("pair {} is not a configured hedge pair", fill.pair).as_str(),
                    ),
            );
            state = state.with_lot_manager(manager);
        }
    }

    Ok((state.increment_event_count(), records))
}

/// Apply a runtime configuration change.
pub fn handle_config_update(
    state: EngineState,
    time: DateTime<Utc>,
    update: &ConfigUpdate,
) -> (EngineState, Vec<OutputRecord>) {
    let record = OutputRecord::new(time, RecordKind::ConfigUpdate)
        .with("config_key", &update.key)
        .with("config_value", &update.value);

    let state = if update.key == "reporting_currency" {
        state.with_reporting_currency(update.value.as_str().into())
    } else {
        state.with_config_value(update.key.clone(), update.value.clone())
    };

    (state.increment_event_count(), vec![record])
}

/// Snapshot derived quantities: per-currency exposures, total equity, net positions, and - when
/// lot tracking is enabled - realized/unrealized P&L and lot counts.
///
/// State is mutated only to increment the event count.
pub fn handle_clock_tick(
    state: EngineState,
    time: DateTime<Utc>,
    tick: &ClockTick,
) -> (EngineState, Vec<OutputRecord>) {
    let state = state.increment_event_count();

    let mut exposures = RecordData::default();
    let mut unpriced_currencies = Vec::new();
    let mut total_equity = Decimal::ZERO;
    let converter = state.converter();
    for (currency, balance) in &state.cash_balances {
        match converter.convert(*balance, currency, &state.reporting_currency) {
            Ok(value) => {
                total_equity += value;
                exposures.insert(currency.code().clone(), RecordValue::Decimal(value));
            }
            Err(error) => {
                warn!(%error, %currency, "excluding unpriceable exposure from snapshot");
                unpriced_currencies.push(RecordValue::from(currency));
            }
        }
    }

    let mut positions = RecordData::default();
    for (pair, net) in &state.positions {
        positions.insert(SmolStr::new(pair.to_string()), RecordValue::Decimal(*net));
    }

    let mut record = OutputRecord::new(time, RecordKind::Snapshot)
        .with("tick_label", &tick.label)
        .with("event_count", state.event_count)
        .with("exposures", exposures)
        .with("unpriced_currencies", unpriced_currencies)
        .with("total_equity", total_equity)
        .with("positions", positions);

    if let Some(manager) = &state.lot_manager {
        let mut risk_positions = RecordData::default();
        for (pair, net) in manager.net_positions() {
            risk_positions.insert(SmolStr::new(pair.to_string()), RecordValue::Decimal(net));
        }

        let marked = manager.unrealized_pnl(&state.market_rates);
        for pair in &marked.unpriced_pairs {
            warn!(%pair, "open lots have no cached quote to mark against");
        }

        record = record
            .with("risk_positions", risk_positions)
            .with("realized_pnl", manager.realized_pnl)
            .with("unrealized_pnl", marked.total)
            .with(
                "unpriced_risk_pairs",
                marked
                    .unpriced_pairs
                    .iter()
                    .map(RecordValue::from)
                    .collect::<Vec<_>>(),
            )
            .with("open_lots", manager.open_lot_count())
            .with("closed_lots", manager.closed_lot_count());
    }

    (state, vec![record])
}

/// Reject non-positive trade notionals and prices with a `validation_error` record.
fn validate_trade_values(
    time: DateTime<Utc>,
    event: &str,
    id: &SmolStr,
    notional: Decimal,
    price: Decimal,
) -> Option<OutputRecord> {
    if notional > Decimal::ZERO && price > Decimal::ZERO {
        return None;
    }

    warn!(
        event,
        id = %id,
        %notional,
        %price,
        "rejecting event with non-positive notional or price"
    );
    Some(
        OutputRecord::new(time, RecordKind::ValidationError)
            .with("event", event)
            .with("id", id)
            .with("notional", notional)
            .with("price", price)
            .with("error", "notional and price must be positive"),
    )
}

/// Decompose a desk-side trade and drive the lot manager, emitting lot records per leg.
fn apply_lot_effects(
    state: &EngineState,
    config: &SimulationConfig,
    mut manager: LotManager,
    time: DateTime<Utc>,
    pair: &CurrencyPair,
    desk_side: Side,
    notional: Decimal,
    price: Decimal,
    origin_id: &SmolStr,
) -> Result<(LotManager, Vec<OutputRecord>), DeskError> {
    let decomposed = decompose(
        pair,
        desk_side,
        notional,
        price,
        &config.lot_tracking,
        &state.reporting_currency,
        &state.converter(),
    );

    let mut records = Vec::new();
    match decomposed {
        Ok(legs) => {
            for (leg_index, leg) in legs.iter().enumerate() {
                let origin = LotOrigin::new(origin_id.clone(), leg_index, pair.clone());
                let outcome = manager
                    .apply_leg(leg, &origin, time)
                    .map_err(|error| DeskError::InvariantViolated(error.to_string()))?;
                records.extend(leg_outcome_records(time, origin_id, &outcome));
            }
        }
        Err(error) => {
            warn!(%error, id = %origin_id, "skipping lot effects");
            records.push(
                OutputRecord::new(time, RecordKind::LotTrackingError)
                    .with("trade_id", origin_id)
                    .with("currency_pair", pair)
                    .with("error", error.code())
                    .with("detail", error.to_string().as_str()),
            );
        }
    }

    Ok((manager, records))
}

/// Records for one applied leg: matches first (they are realized first), then any opened lot.
fn leg_outcome_records(
    time: DateTime<Utc>,
    origin_id: &SmolStr,
    outcome: &LegOutcome,
) -> Vec<OutputRecord> {
    let mut records = Vec::with_capacity(outcome.matches.len() + 1);

    for matched in &outcome.matches {
        records.push(
            OutputRecord::new(time, RecordKind::LotMatch)
                .with("matched_lot_id", matched.lot_id.0)
                .with("risk_pair", &matched.risk_pair)
                .with("quantity", matched.quantity)
                .with("entry_price", matched.entry_price)
                .with("exit_price", matched.exit_price)
                .with("realized_pnl", matched.realized_pnl)
                .with("origin_trade_id", origin_id),
        );
    }

    if let Some(lot) = &outcome.opened {
        records.push(
            OutputRecord::new(time, RecordKind::LotCreated)
                .with("lot_id", lot.id.0)
                .with("risk_pair", &lot.risk_pair)
                .with("side", lot.side)
                .with("quantity", lot.quantity)
                .with("trade_price", lot.trade_price)
                .with("origin_trade_id", &lot.origin.trade_id)
                .with("origin_pair", &lot.origin.pair)
                .with("origin_leg_index", lot.origin.leg_index),
        );
    }

    records
}
