use derive_more::Display;
use serde::Serialize;
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;

/// FxDesk uppercase `SmolStr` representation for a currency.
///
/// Follows the ISO-4217 convention of uppercase codes, eg/ `Currency("EUR")`. Inputs are
/// normalized on construction so that `"eur"` and `"EUR"` compare equal after parsing.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
pub struct Currency(SmolStr);

impl Currency {
    /// Construct a new uppercase [`Self`] from the provided `Into<SmolStr>`.
    pub fn new<S>(code: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let code = code.into();
        if code.chars().all(char::is_uppercase) {
            Self(code)
        } else {
            Self(code.to_uppercase_smolstr())
        }
    }

    /// Return the currency code `SmolStr` of [`Self`].
    pub fn code(&self) -> &SmolStr {
        &self.0
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SmolStr> for Currency {
    fn from(value: SmolStr) -> Self {
        Self::new(value)
    }
}

impl From<String> for Currency {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Currency {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<'de> serde::de::Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let code = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Ok(Currency::new(code.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalizes_to_uppercase() {
        assert_eq!(Currency::new("eur"), Currency::new("EUR"));
        assert_eq!(Currency::new("Usd").code(), "USD");
    }

    #[test]
    fn test_currency_serde_round_trip() {
        let currency = Currency::new("GBP");
        let json = serde_json::to_string(&currency).unwrap();
        assert_eq!(json, "\"GBP\"");

        let de: Currency = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(de, currency);
    }
}
