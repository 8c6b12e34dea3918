use chrono::{DateTime, Utc};
use derive_more::Display;
use fxdesk_instrument::{Side, currency::Currency, pair::CurrencyPair};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Closed set of output record types emitted by the event handlers.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[display("client_trade")]
    ClientTrade,
    #[display("market_update")]
    MarketUpdate,
    #[display("hedge_order")]
    HedgeOrder,
    #[display("hedge_fill")]
    HedgeFill,
    #[display("config_update")]
    ConfigUpdate,
    #[display("snapshot")]
    Snapshot,
    #[display("lot_created")]
    LotCreated,
    #[display("lot_match")]
    LotMatch,
    #[display("lot_tracking_error")]
    LotTrackingError,
    #[display("validation_error")]
    ValidationError,
    #[display("fatal_error")]
    FatalError,
}

/// Structured, insertion-ordered record payload.
///
/// Insertion order is preserved through serialization, so a fixed input stream always yields
/// byte-identical output.
pub type RecordData = IndexMap<SmolStr, RecordValue>;

/// A single value inside a [`RecordData`] payload.
///
/// Untagged, so payloads serialize naturally: decimals as canonical decimal strings, timestamps
/// as ISO-8601 UTC, text as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Integer(u64),
    Decimal(Decimal),
    Time(DateTime<Utc>),
    Text(SmolStr),
    List(Vec<RecordValue>),
    Map(RecordData),
}

impl From<u64> for RecordValue {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for RecordValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as u64)
    }
}

impl From<Decimal> for RecordValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<DateTime<Utc>> for RecordValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::Text(SmolStr::new(value))
    }
}

impl From<SmolStr> for RecordValue {
    fn from(value: SmolStr) -> Self {
        Self::Text(value)
    }
}

impl From<&SmolStr> for RecordValue {
    fn from(value: &SmolStr) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Side> for RecordValue {
    fn from(value: Side) -> Self {
        Self::Text(SmolStr::new(value.to_string()))
    }
}

impl From<&Currency> for RecordValue {
    fn from(value: &Currency) -> Self {
        Self::Text(value.code().clone())
    }
}

impl From<&CurrencyPair> for RecordValue {
    fn from(value: &CurrencyPair) -> Self {
        Self::Text(SmolStr::new(value.to_string()))
    }
}

impl From<Vec<RecordValue>> for RecordValue {
    fn from(value: Vec<RecordValue>) -> Self {
        Self::List(value)
    }
}

impl From<RecordData> for RecordValue {
    fn from(value: RecordData) -> Self {
        Self::Map(value)
    }
}

/// A single output record forwarded to the caller's [`RecordSink`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputRecord {
    pub time: DateTime<Utc>,
    pub kind: RecordKind,
    pub data: RecordData,
}

impl OutputRecord {
    pub fn new(time: DateTime<Utc>, kind: RecordKind) -> Self {
        Self {
            time,
            kind,
            data: RecordData::default(),
        }
    }

    /// Append a `(key, value)` entry to the record payload, preserving insertion order.
    pub fn with<V>(mut self, key: &str, value: V) -> Self
    where
        V: Into<RecordValue>,
    {
        self.data.insert(SmolStr::new(key), value.into());
        self
    }
}

/// Order-preserving consumer of [`OutputRecord`]s.
///
/// The core does not know how records are persisted; collaborators implement this for files,
/// audit logs, sockets, etc.
pub trait RecordSink {
    fn send(&mut self, record: OutputRecord);
}

/// In-memory [`RecordSink`] that appends every record to a `Vec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecSink {
    pub records: Vec<OutputRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn send(&mut self, record: OutputRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_data_serializes_in_insertion_order() {
        let record = OutputRecord::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            RecordKind::ClientTrade,
        )
        .with("trade_id", "t-1")
        .with("notional", dec!(1000000))
        .with("price", dec!(1.1000));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            "{\"time\":\"2024-01-01T00:00:00Z\",\"kind\":\"client_trade\",\
             \"data\":{\"trade_id\":\"t-1\",\"notional\":\"1000000\",\"price\":\"1.1000\"}}"
        );
    }

    #[test]
    fn test_decimal_values_serialize_as_canonical_strings() {
        let value = RecordValue::from(dec!(1.1000));
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"1.1000\"");
    }

    #[test]
    fn test_vec_sink_preserves_order() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut sink = VecSink::new();
        sink.send(OutputRecord::new(time, RecordKind::MarketUpdate));
        sink.send(OutputRecord::new(time, RecordKind::ClientTrade));

        let kinds = sink
            .records
            .iter()
            .map(|record| record.kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec![RecordKind::MarketUpdate, RecordKind::ClientTrade]);
    }
}
