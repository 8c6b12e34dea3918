use crate::{
    Sequence,
    engine::{
        decompose::TradeLeg,
        lot::{Lot, LotId, LotMatch, LotOrigin, LotQueue},
        state::MarketQuote,
    },
};
use chrono::{DateTime, Utc};
use fxdesk_instrument::pair::CurrencyPair;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Owns one [`LotQueue`] per configured risk pair, the lot-id counter and the cumulative
/// realized P&L.
///
/// Queues are created in configuration order and iterated in insertion order, so per-pair
/// aggregates serialize identically across runs. The counter is advanced exactly once per lot
/// created, in dispatch order.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct LotManager {
    pub queues: IndexMap<CurrencyPair, LotQueue>,
    lot_sequence: Sequence,

    /// Cumulative realized P&L across all matches, in the reporting currency.
    pub realized_pnl: Decimal,
}

/// Lot effects of applying one decomposed leg: matches against opposing lots first, then at most
/// one newly opened lot for any remainder.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LegOutcome {
    pub matches: Vec<LotMatch>,
    pub opened: Option<Lot>,
}

/// Aggregate mark-to-market view across all queues.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct UnrealizedPnl {
    pub by_pair: IndexMap<CurrencyPair, Decimal>,
    pub total: Decimal,

    /// Risk pairs holding open lots but no cached quote to mark against.
    pub unpriced_pairs: Vec<CurrencyPair>,
}

/// Invariant breakage inside the lot layer. Always fatal: the decomposer only emits legs in
/// configured risk pairs, so an unknown pair here means the engine state is inconsistent.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum LotError {
    #[error("no lot queue exists for risk pair {pair}")]
    UnknownRiskPair { pair: CurrencyPair },
}

impl LotManager {
    pub fn new(risk_pairs: impl IntoIterator<Item = CurrencyPair>) -> Self {
        Self {
            queues: risk_pairs
                .into_iter()
                .map(|pair| (pair.clone(), LotQueue::new(pair)))
                .collect(),
            lot_sequence: Sequence::default(),
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Apply one decomposed leg to its risk-pair queue.
    ///
    /// Opposing open lots are matched in FIFO order first; any remainder opens a new lot (a
    /// position flip when matches preceded it). Realized P&L from the matches is accumulated.
    pub fn apply_leg(
        &mut self,
        leg: &TradeLeg,
        origin: &LotOrigin,
        time: DateTime<Utc>,
    ) -> Result<LegOutcome, LotError> {
        let Some(queue) = self.queues.get_mut(&leg.risk_pair) else {
            return Err(LotError::UnknownRiskPair {
                pair: leg.risk_pair.clone(),
            });
        };

        let (matches, remaining) = match queue.open_side() {
            Some(open_side) if open_side != leg.side => {
                queue.match_fifo(leg.side, leg.quantity, leg.reference_price, time)
            }
            _ => (Vec::new(), leg.quantity),
        };

        for matched in &matches {
            self.realized_pnl += matched.realized_pnl;
        }

        let opened = if remaining.is_zero() {
            None
        } else {
            let lot = Lot::open(
                LotId(self.lot_sequence.fetch_add().value()),
                leg.risk_pair.clone(),
                leg.side,
                remaining,
                leg.reference_price,
                time,
                origin.clone(),
            );
            queue.push_open(lot.clone());
            Some(lot)
        };

        Ok(LegOutcome { matches, opened })
    }

    /// Net open position per risk pair, in configuration order.
    pub fn net_positions(&self) -> impl Iterator<Item = (&CurrencyPair, Decimal)> {
        self.queues
            .iter()
            .map(|(pair, queue)| (pair, queue.net_quantity()))
    }

    /// Mark all open lots against the provided quotes.
    pub fn unrealized_pnl(&self, rates: &IndexMap<CurrencyPair, MarketQuote>) -> UnrealizedPnl {
        let mut marked = UnrealizedPnl::default();

        for (pair, queue) in &self.queues {
            match rates.get(pair) {
                Some(quote) => {
                    let pnl = queue.unrealized_pnl(quote.mid);
                    marked.total += pnl;
                    marked.by_pair.insert(pair.clone(), pnl);
                }
                None if !queue.open.is_empty() => {
                    marked.unpriced_pairs.push(pair.clone());
                }
                None => {}
            }
        }

        marked
    }

    pub fn open_lot_count(&self) -> usize {
        self.queues.values().map(|queue| queue.open.len()).sum()
    }

    pub fn closed_lot_count(&self) -> usize {
        self.queues.values().map(|queue| queue.closed.len()).sum()
    }
}
