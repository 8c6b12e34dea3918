use crate::Sequence;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, From};
use fxdesk_instrument::{Side, pair::CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Global ordering key for a [`DeskEvent`].
///
/// The `(time, sequence)` pair must be unique across the entire input stream; the derived `Ord`
/// orders by `time` first, then `sequence`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct EventKey {
    pub time: DateTime<Utc>,
    pub sequence: Sequence,
}

/// Input event envelope processed by the simulation.
///
/// Events are dispatched in non-decreasing [`EventKey`] order regardless of the order in which
/// sources present them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct DeskEvent {
    pub time: DateTime<Utc>,
    pub sequence: Sequence,
    pub kind: DeskEventKind,
}

impl DeskEvent {
    pub fn key(&self) -> EventKey {
        EventKey::new(self.time, self.sequence)
    }
}

/// All input event variants understood by the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, From)]
#[serde(rename_all = "snake_case")]
pub enum DeskEventKind {
    Market(MarketUpdate),
    Trade(ClientTrade),
    HedgeOrder(HedgeOrder),
    HedgeFill(HedgeFill),
    Config(ConfigUpdate),
    Clock(ClockTick),
}

/// Fresh bid/ask/mid quote for a currency pair.
///
/// A valid quote satisfies `bid <= mid <= ask`; violations are rejected by the market-update
/// handler with a `validation_error` record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct MarketUpdate {
    pub pair: CurrencyPair,
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
}

/// A client trade, expressed from the client's perspective.
///
/// `side` is the client side - the desk always takes the opposite. `notional` is a positive
/// base-currency amount; `price` is quote per unit base.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct ClientTrade {
    pub pair: CurrencyPair,
    pub side: Side,
    pub notional: Decimal,
    pub price: Decimal,
    pub client_id: SmolStr,
    pub trade_id: SmolStr,
}

/// An externally supplied hedge order, expressed from the desk's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct HedgeOrder {
    pub order_id: SmolStr,
    pub pair: CurrencyPair,
    pub side: Side,
    pub notional: Decimal,
    pub limit_price: Decimal,
}

/// Execution of a [`HedgeOrder`], expressed from the desk's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct HedgeFill {
    pub order_id: SmolStr,
    pub pair: CurrencyPair,
    pub side: Side,
    pub notional: Decimal,
    pub limit_price: Decimal,
    pub fill_price: Decimal,
    pub slippage: Decimal,
}

/// Runtime configuration change.
///
/// The key `reporting_currency` mutates the engine's reporting currency; any other key is stored
/// in the free-form configuration map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct ConfigUpdate {
    pub key: SmolStr,
    pub value: SmolStr,
}

/// Periodic clock tick that triggers a derived-state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct ClockTick {
    pub label: SmolStr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sequence;
    use chrono::TimeZone;

    fn time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_event_key_orders_by_time_then_sequence() {
        struct TestCase {
            lhs: EventKey,
            rhs: EventKey,
            expected: std::cmp::Ordering,
        }

        let cases = vec![
            // TC0: earlier time wins regardless of sequence
            TestCase {
                lhs: EventKey::new(time(1), Sequence(99)),
                rhs: EventKey::new(time(2), Sequence(0)),
                expected: std::cmp::Ordering::Less,
            },
            // TC1: equal time falls back to sequence
            TestCase {
                lhs: EventKey::new(time(5), Sequence(1)),
                rhs: EventKey::new(time(5), Sequence(2)),
                expected: std::cmp::Ordering::Less,
            },
            // TC2: identical keys compare equal
            TestCase {
                lhs: EventKey::new(time(5), Sequence(1)),
                rhs: EventKey::new(time(5), Sequence(1)),
                expected: std::cmp::Ordering::Equal,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(test.lhs.cmp(&test.rhs), test.expected, "TC{index} failed");
        }
    }
}
