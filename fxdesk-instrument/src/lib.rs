#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # FxDesk-Instrument
//! FxDesk-Instrument contains core Currency, CurrencyPair and Side data structures and associated
//! utilities.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// [`Currency`](currency::Currency) related data structures.
pub mod currency;

/// [`CurrencyPair`](pair::CurrencyPair) related data structures.
///
/// eg/ `CurrencyPair`, `PairParseError`, etc.
pub mod pair;

/// [`Side`] of a trade, order or lot - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Side {
    /// Return the opposing [`Side`].
    ///
    /// The desk takes the opposite side of every client trade, so this is the bridge between
    /// client-perspective and desk-perspective values.
    pub fn invert(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_invert() {
        assert_eq!(Side::Buy.invert(), Side::Sell);
        assert_eq!(Side::Sell.invert(), Side::Buy);
    }

    #[test]
    fn test_side_de_aliases() {
        for input in ["\"Buy\"", "\"buy\"", "\"BUY\"", "\"b\""] {
            let side: Side = serde_json::from_str(input).unwrap();
            assert_eq!(side, Side::Buy);
        }
    }
}
