use crate::{
    config::LotTrackingConfig,
    engine::convert::{ConvertError, CurrencyConverter},
};
use fxdesk_instrument::{Side, currency::Currency, pair::CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One direct risk-pair leg of a decomposed trade, expressed from the desk's perspective.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct TradeLeg {
    pub risk_pair: CurrencyPair,
    pub side: Side,
    pub quantity: Decimal,

    /// Price recorded on lots the leg opens and used to realize P&L on matches: the executed
    /// trade price for a direct-pair trade, the risk pair's current mid for a decomposed cross.
    pub reference_price: Decimal,
}

/// Failure to decompose a trade into risk-pair legs.
///
/// Never touches state: the caller records the failure and skips all lot effects of the trade
/// while the cash/position accounting still applies.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum DecomposeError {
    #[error("{0}")]
    MissingRate(#[from] ConvertError),

    #[error("pair {pair} is neither a risk pair nor an allowed trade pair")]
    UnsupportedPair { pair: CurrencyPair },

    #[error("no risk pair is configured for currency {currency}")]
    MissingRiskPair { currency: Currency },
}

impl DecomposeError {
    /// Stable short code for record payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRate(_) => "missing-rate",
            Self::UnsupportedPair { .. } => "unsupported-pair",
            Self::MissingRiskPair { .. } => "missing-risk-pair",
        }
    }
}

/// Reduce a desk-side trade in any allowed pair to one or more direct risk-pair legs.
///
/// A trade in a risk pair passes through as a single leg at its executed price. Any other
/// allowed pair decomposes flow-by-flow: each non-reporting currency the trade moves maps to its
/// configured risk pair, priced at that pair's current mid. The base flow keeps the desk side
/// and the trade notional; the quote flow takes the opposite side and `notional * price`.
///
/// Reads only the provided converter snapshot; state is never touched.
pub fn decompose(
    pair: &CurrencyPair,
    desk_side: Side,
    notional: Decimal,
    price: Decimal,
    config: &LotTrackingConfig,
    reporting: &Currency,
    converter: &CurrencyConverter<'_>,
) -> Result<Vec<TradeLeg>, DecomposeError> {
    if config.risk_pairs.contains(pair) {
        return Ok(vec![TradeLeg {
            risk_pair: pair.clone(),
            side: desk_side,
            quantity: notional,
            reference_price: price,
        }]);
    }

    if !config.trade_pairs.contains(pair) {
        return Err(DecomposeError::UnsupportedPair { pair: pair.clone() });
    }

    let flows = [
        (&pair.base, desk_side, notional),
        (&pair.quote, desk_side.invert(), notional * price),
    ];

    let mut legs = Vec::with_capacity(2);
    for (currency, side, quantity) in flows {
        if currency == reporting {
            continue;
        }

        let risk_pair = config
            .risk_pairs
            .iter()
            .find(|risk| risk.contains(currency))
            .ok_or_else(|| DecomposeError::MissingRiskPair {
                currency: currency.clone(),
            })?;

        legs.push(TradeLeg {
            risk_pair: risk_pair.clone(),
            side,
            quantity,
            reference_price: converter.rate(currency, reporting)?,
        });
    }

    Ok(legs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::MarketQuote;
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;
    use rust_decimal_macros::dec;

    fn config(risk: &[&str], trade: &[&str]) -> LotTrackingConfig {
        LotTrackingConfig {
            enabled: true,
            risk_pairs: risk.iter().map(|pair| pair.parse().unwrap()).collect(),
            trade_pairs: trade.iter().map(|pair| pair.parse().unwrap()).collect(),
            ..LotTrackingConfig::default()
        }
    }

    fn rates(quotes: &[(&str, Decimal)]) -> IndexMap<CurrencyPair, MarketQuote> {
        quotes
            .iter()
            .map(|(pair, mid)| {
                (
                    pair.parse().unwrap(),
                    MarketQuote::new(
                        *mid,
                        *mid,
                        *mid,
                        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    ),
                )
            })
            .collect()
    }

    fn pair(input: &str) -> CurrencyPair {
        input.parse().unwrap()
    }

    #[test]
    fn test_direct_risk_pair_passes_through_at_trade_price() {
        let config = config(&["EUR/USD"], &[]);
        let rates = rates(&[("EUR/USD", dec!(1.1000))]);
        let converter = CurrencyConverter::new(&rates);

        // Client BUY 1000000 EUR/USD -> desk Sell.
        let legs = decompose(
            &pair("EUR/USD"),
            Side::Sell,
            dec!(1000000),
            dec!(1.1020),
            &config,
            &Currency::new("USD"),
            &converter,
        )
        .unwrap();

        assert_eq!(
            legs,
            vec![TradeLeg {
                risk_pair: pair("EUR/USD"),
                side: Side::Sell,
                quantity: dec!(1000000),
                reference_price: dec!(1.1020),
            }]
        );
    }

    #[test]
    fn test_cross_decomposes_into_two_mid_priced_legs() {
        let config = config(&["EUR/USD", "GBP/USD"], &["EUR/GBP"]);
        let rates = rates(&[("EUR/USD", dec!(1.1000)), ("GBP/USD", dec!(1.2941))]);
        let converter = CurrencyConverter::new(&rates);

        // Client BUY 1000000 EUR/GBP @ 0.8500 -> desk Sell.
        let legs = decompose(
            &pair("EUR/GBP"),
            Side::Sell,
            dec!(1000000),
            dec!(0.8500),
            &config,
            &Currency::new("USD"),
            &converter,
        )
        .unwrap();

        assert_eq!(
            legs,
            vec![
                TradeLeg {
                    risk_pair: pair("EUR/USD"),
                    side: Side::Sell,
                    quantity: dec!(1000000),
                    reference_price: dec!(1.1000),
                },
                TradeLeg {
                    risk_pair: pair("GBP/USD"),
                    side: Side::Buy,
                    quantity: dec!(850000.0000),
                    reference_price: dec!(1.2941),
                },
            ]
        );
    }

    #[test]
    fn test_cross_with_reporting_base_produces_single_quote_leg() {
        let config = config(&["JPY/USD"], &["USD/JPY"]);
        let rates = rates(&[("USD/JPY", dec!(160))]);
        let converter = CurrencyConverter::new(&rates);

        // Client SELL 1000000 USD/JPY @ 159.50 -> desk Buy.
        let legs = decompose(
            &pair("USD/JPY"),
            Side::Buy,
            dec!(1000000),
            dec!(159.50),
            &config,
            &Currency::new("USD"),
            &converter,
        )
        .unwrap();

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].risk_pair, pair("JPY/USD"));
        assert_eq!(legs[0].side, Side::Sell);
        assert_eq!(legs[0].quantity, dec!(159500000.0000));
        assert_eq!(legs[0].reference_price, Decimal::ONE / dec!(160));
    }

    #[test]
    fn test_missing_rate_rejects_whole_trade() {
        let config = config(&["EUR/USD", "GBP/USD"], &["EUR/GBP"]);
        let rates = rates(&[("EUR/USD", dec!(1.1000))]);
        let converter = CurrencyConverter::new(&rates);

        let result = decompose(
            &pair("EUR/GBP"),
            Side::Sell,
            dec!(1000000),
            dec!(0.8500),
            &config,
            &Currency::new("USD"),
            &converter,
        );

        let error = result.unwrap_err();
        assert_eq!(error.code(), "missing-rate");
        assert_eq!(
            error,
            DecomposeError::MissingRate(ConvertError::MissingRate {
                from: Currency::new("GBP"),
                to: Currency::new("USD"),
            })
        );
    }

    #[test]
    fn test_unallowed_pair_is_rejected() {
        let config = config(&["EUR/USD"], &[]);
        let rates = rates(&[]);
        let converter = CurrencyConverter::new(&rates);

        let error = decompose(
            &pair("EUR/GBP"),
            Side::Sell,
            dec!(100),
            dec!(0.85),
            &config,
            &Currency::new("USD"),
            &converter,
        )
        .unwrap_err();

        assert_eq!(error.code(), "unsupported-pair");
    }

    #[test]
    fn test_allowed_cross_without_risk_pair_is_rejected() {
        let config = config(&["EUR/USD"], &["EUR/GBP"]);
        let rates = rates(&[("EUR/USD", dec!(1.1000))]);
        let converter = CurrencyConverter::new(&rates);

        let error = decompose(
            &pair("EUR/GBP"),
            Side::Sell,
            dec!(100),
            dec!(0.85),
            &config,
            &Currency::new("USD"),
            &converter,
        )
        .unwrap_err();

        assert_eq!(
            error,
            DecomposeError::MissingRiskPair {
                currency: Currency::new("GBP")
            }
        );
    }
}
