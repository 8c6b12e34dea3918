use crate::engine::state::MarketQuote;
use fxdesk_instrument::{currency::Currency, pair::CurrencyPair};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read-only conversion view over the engine's cached market rates.
///
/// Resolution is identity, then the direct pair's mid, then the inverse pair's `1 / mid`. No
/// triangulation through a third currency is attempted at this layer - crosses are split into
/// direct legs by the [decomposer](crate::engine::decompose) instead. All internal valuation uses
/// the mid rate; bid/ask are reserved for execution-price modeling by collaborators.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter<'a> {
    rates: &'a IndexMap<CurrencyPair, MarketQuote>,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(rates: &'a IndexMap<CurrencyPair, MarketQuote>) -> Self {
        Self { rates }
    }

    /// Resolve the rate converting one unit of `from` into units of `to`.
    pub fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, ConvertError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let direct = CurrencyPair::new(from.clone(), to.clone());
        if let Some(quote) = self.rates.get(&direct) {
            return Ok(quote.mid);
        }

        let inverse = direct.inverse();
        if let Some(quote) = self.rates.get(&inverse) {
            if quote.mid.is_zero() {
                return Err(ConvertError::ZeroMid { pair: inverse });
            }
            return Ok(Decimal::ONE / quote.mid);
        }

        Err(ConvertError::MissingRate {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Convert `amount` of `from` into units of `to` at the resolved mid rate.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, ConvertError> {
        Ok(amount * self.rate(from, to)?)
    }
}

/// Failure to resolve a conversion rate from the cached quotes.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ConvertError {
    #[error("no cached quote resolves a {from}/{to} rate")]
    MissingRate { from: Currency, to: Currency },

    #[error("cached quote for {pair} has a zero mid and cannot be inverted")]
    ZeroMid { pair: CurrencyPair },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

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

    fn currency(code: &str) -> Currency {
        Currency::new(code)
    }

    #[test]
    fn test_rate_resolution() {
        struct TestCase {
            from: &'static str,
            to: &'static str,
            expected: Result<Decimal, ConvertError>,
        }

        let rates = rates(&[("EUR/USD", dec!(1.1000)), ("USD/JPY", dec!(160))]);
        let converter = CurrencyConverter::new(&rates);

        let cases = vec![
            // TC0: identity
            TestCase {
                from: "USD",
                to: "USD",
                expected: Ok(Decimal::ONE),
            },
            // TC1: direct quote mid
            TestCase {
                from: "EUR",
                to: "USD",
                expected: Ok(dec!(1.1000)),
            },
            // TC2: inverse quote
            TestCase {
                from: "JPY",
                to: "USD",
                expected: Ok(Decimal::ONE / dec!(160)),
            },
            // TC3: no triangulation through USD
            TestCase {
                from: "EUR",
                to: "JPY",
                expected: Err(ConvertError::MissingRate {
                    from: currency("EUR"),
                    to: currency("JPY"),
                }),
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(
                converter.rate(&currency(test.from), &currency(test.to)),
                test.expected,
                "TC{index} failed"
            );
        }
    }

    #[test]
    fn test_convert_multiplies_by_rate() {
        let rates = rates(&[("EUR/USD", dec!(1.1000))]);
        let converter = CurrencyConverter::new(&rates);

        assert_eq!(
            converter.convert(dec!(1000000), &currency("EUR"), &currency("USD")),
            Ok(dec!(1100000.0000))
        );
    }

    #[test]
    fn test_zero_mid_cannot_be_inverted() {
        let rates = rates(&[("EUR/USD", dec!(0))]);
        let converter = CurrencyConverter::new(&rates);

        assert_eq!(
            converter.rate(&currency("USD"), &currency("EUR")),
            Err(ConvertError::ZeroMid {
                pair: "EUR/USD".parse().unwrap()
            })
        );
    }
}
