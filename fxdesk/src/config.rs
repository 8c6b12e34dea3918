use fxdesk_instrument::{currency::Currency, pair::CurrencyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level simulation configuration consumed by the core.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub reporting_currency: Currency,
    #[serde(default)]
    pub lot_tracking: LotTrackingConfig,
}

impl SimulationConfig {
    pub fn new<C>(reporting_currency: C) -> Self
    where
        C: Into<Currency>,
    {
        Self {
            reporting_currency: reporting_currency.into(),
            lot_tracking: LotTrackingConfig::default(),
        }
    }

    pub fn with_lot_tracking(self, lot_tracking: LotTrackingConfig) -> Self {
        Self {
            lot_tracking,
            ..self
        }
    }

    /// Validate the internal consistency of [`Self`].
    ///
    /// Lot tracking requires every risk pair to be quoted against the reporting currency (risk
    /// pair realized P&L is recognized in the risk pair's quote currency), and every hedge pair
    /// to be a risk pair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lot_tracking.enabled {
            return Ok(());
        }

        for pair in &self.lot_tracking.risk_pairs {
            if pair.quote != self.reporting_currency {
                return Err(ConfigError::RiskPairNotQuotedAgainstReporting {
                    pair: pair.clone(),
                    reporting: self.reporting_currency.clone(),
                });
            }
        }

        for pair in &self.lot_tracking.hedge_pairs {
            if !self.lot_tracking.risk_pairs.contains(pair) {
                return Err(ConfigError::HedgePairNotRiskPair { pair: pair.clone() });
            }
        }

        Ok(())
    }
}

/// Lot tracking configuration.
///
/// When `enabled` is false the [`LotManager`](crate::engine::lot::manager::LotManager) is absent
/// from state and no lot-related records are emitted.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct LotTrackingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub matching_rule: MatchingRule,

    /// Direct pairs where lots live. Each must be quoted against the reporting currency.
    #[serde(default)]
    pub risk_pairs: Vec<CurrencyPair>,

    /// Pairs clients may trade; may include crosses absent from `risk_pairs`.
    #[serde(default)]
    pub trade_pairs: Vec<CurrencyPair>,

    /// Pairs the desk may hedge in; must be a subset of `risk_pairs`.
    #[serde(default)]
    pub hedge_pairs: Vec<CurrencyPair>,

    /// Whether hedge fills open and match lots exactly like client trades.
    #[serde(default = "default_hedge_fills_open_lots")]
    pub hedge_fills_open_lots: bool,
}

impl Default for LotTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            matching_rule: MatchingRule::default(),
            risk_pairs: Vec::new(),
            trade_pairs: Vec::new(),
            hedge_pairs: Vec::new(),
            hedge_fills_open_lots: default_hedge_fills_open_lots(),
        }
    }
}

fn default_hedge_fills_open_lots() -> bool {
    true
}

/// Lot matching policy. FIFO is the only defined rule.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum MatchingRule {
    #[default]
    #[serde(rename = "FIFO")]
    Fifo,
}

/// Invalid [`SimulationConfig`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("risk pair {pair} is not quoted against reporting currency {reporting}")]
    RiskPairNotQuotedAgainstReporting {
        pair: CurrencyPair,
        reporting: Currency,
    },

    #[error("hedge pair {pair} is not a configured risk pair")]
    HedgePairNotRiskPair { pair: CurrencyPair },
}
