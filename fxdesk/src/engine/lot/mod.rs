use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use fxdesk_instrument::{Side, pair::CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::VecDeque;

/// Per-risk-pair queues, deterministic lot-id assignment and realized P&L accumulation.
pub mod manager;

/// Unique identifier for a [`Lot`], assigned from a monotonic counter in dispatch order.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct LotId(pub u64);

/// Provenance of a lot: the client trade (or hedge fill) and decomposed leg it came from.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct LotOrigin {
    /// Identifier of the originating client trade or hedge order.
    pub trade_id: SmolStr,

    /// Index of the decomposed leg within the originating trade.
    pub leg_index: usize,

    /// The pair the client actually traded, which may differ from the lot's risk pair.
    pub pair: CurrencyPair,
}

/// An immutable opening of risk in a direct (quoted against the reporting currency) pair.
///
/// Lots never mutate: reductions return a new lot with a smaller remaining `quantity`, and a lot
/// whose remaining quantity reaches zero moves to the closed history.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Lot {
    pub id: LotId,
    pub risk_pair: CurrencyPair,
    pub side: Side,

    /// Remaining open quantity. Strictly positive while the lot is open.
    pub quantity: Decimal,

    /// Quantity as originally opened.
    pub quantity_max: Decimal,

    pub trade_price: Decimal,
    pub time_open: DateTime<Utc>,
    pub origin: LotOrigin,
}

impl Lot {
    /// Open a new lot with its full quantity remaining.
    pub fn open(
        id: LotId,
        risk_pair: CurrencyPair,
        side: Side,
        quantity: Decimal,
        trade_price: Decimal,
        time_open: DateTime<Utc>,
        origin: LotOrigin,
    ) -> Self {
        Self {
            id,
            risk_pair,
            side,
            quantity,
            quantity_max: quantity,
            trade_price,
            time_open,
            origin,
        }
    }

    /// Return a new [`Self`] with `matched` quantity removed.
    pub fn reduced(&self, matched: Decimal) -> Self {
        Self {
            quantity: self.quantity - matched,
            ..self.clone()
        }
    }

    /// Remaining quantity signed by side: positive for Buy, negative for Sell.
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            Side::Buy => self.quantity,
            Side::Sell => -self.quantity,
        }
    }

    /// Mark-to-market P&L of the remaining quantity at the provided mid.
    pub fn unrealized_pnl(&self, mid: Decimal) -> Decimal {
        match self.side {
            Side::Buy => (mid - self.trade_price) * self.quantity,
            Side::Sell => (self.trade_price - mid) * self.quantity,
        }
    }
}

/// A fully matched [`Lot`], retained as append-only history.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ClosedLot {
    pub lot: Lot,
    pub time_closed: DateTime<Utc>,
}

/// One matched slice of an open lot, with the realized P&L it recognized.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct LotMatch {
    pub lot_id: LotId,
    pub risk_pair: CurrencyPair,
    pub quantity: Decimal,

    /// Trade price of the matched lot.
    pub entry_price: Decimal,

    /// Reference price of the incoming leg.
    pub exit_price: Decimal,

    /// Realized P&L in the risk pair's quote currency (the reporting currency).
    pub realized_pnl: Decimal,
}

/// FIFO queue of open lots for a single risk pair, plus its closed-lot history.
///
/// All open lots share one side, or the queue is empty: an incoming leg of the opposite side
/// matches against openings before any new lot is created.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct LotQueue {
    pub risk_pair: CurrencyPair,
    pub open: VecDeque<Lot>,
    pub closed: Vec<ClosedLot>,
}

impl LotQueue {
    pub fn new(risk_pair: CurrencyPair) -> Self {
        Self {
            risk_pair,
            open: VecDeque::new(),
            closed: Vec::new(),
        }
    }

    /// Side of the currently open lots, `None` if the queue is empty.
    pub fn open_side(&self) -> Option<Side> {
        self.open.front().map(|lot| lot.side)
    }

    pub fn push_open(&mut self, lot: Lot) {
        self.open.push_back(lot);
    }

    /// Match an incoming leg of `side` against opposing open lots in FIFO order.
    ///
    /// Returns the matches produced and the leg quantity left unmatched once no opposing open
    /// lots remain. The caller opens a new lot with any remainder (the position has flipped).
    pub fn match_fifo(
        &mut self,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        time: DateTime<Utc>,
    ) -> (Vec<LotMatch>, Decimal) {
        let mut matches = Vec::new();
        let mut remaining = quantity;

        while !remaining.is_zero() {
            let Some(lot) = self.open.pop_front() else {
                break;
            };
            if lot.side == side {
                self.open.push_front(lot);
                break;
            }

            let matched = lot.quantity.min(remaining);
            let realized_pnl = match lot.side {
                Side::Buy => (price - lot.trade_price) * matched,
                Side::Sell => (lot.trade_price - price) * matched,
            };
            matches.push(LotMatch::new(
                lot.id,
                lot.risk_pair.clone(),
                matched,
                lot.trade_price,
                price,
                realized_pnl,
            ));

            remaining -= matched;
            let reduced = lot.reduced(matched);
            if reduced.quantity.is_zero() {
                self.closed.push(ClosedLot::new(reduced, time));
            } else {
                self.open.push_front(reduced);
            }
        }

        (matches, remaining)
    }

    /// Net open quantity, signed by side.
    pub fn net_quantity(&self) -> Decimal {
        self.open.iter().map(Lot::signed_quantity).sum()
    }

    /// Aggregate mark-to-market P&L of all open lots at the provided mid.
    pub fn unrealized_pnl(&self, mid: Decimal) -> Decimal {
        self.open.iter().map(|lot| lot.unrealized_pnl(mid)).sum()
    }
}
