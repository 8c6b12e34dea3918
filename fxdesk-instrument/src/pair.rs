use crate::currency::Currency;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A currency pair containing a base and quote [`Currency`].
///
/// Prices for a pair are expressed in units of quote per unit base, eg/ `EUR/USD` at `1.1000`
/// means 1.1000 USD per EUR. The canonical text representation is `"BASE/QUOTE"`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(into = "String")]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new<B, Q>(base: B, quote: Q) -> Self
    where
        B: Into<Currency>,
        Q: Into<Currency>,
    {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Return the pair with base and quote swapped, eg/ `EUR/USD` -> `USD/EUR`.
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Return true if either side of the pair is the provided [`Currency`].
    pub fn contains(&self, currency: &Currency) -> bool {
        &self.base == currency || &self.quote == currency
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl From<CurrencyPair> for String {
    fn from(value: CurrencyPair) -> Self {
        value.to_string()
    }
}

/// Failure to parse a [`CurrencyPair`] from its `"BASE/QUOTE"` text representation.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
#[error("invalid currency pair: {input}")]
pub struct PairParseError {
    pub input: String,
}

impl FromStr for CurrencyPair {
    type Err = PairParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(PairParseError {
                input: input.to_string(),
            }),
        }
    }
}

impl<'de> serde::de::Deserialize<'de> for CurrencyPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let input = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        CurrencyPair::from_str(input.as_ref()).map_err(serde::de::Error::custom)
    }
}
