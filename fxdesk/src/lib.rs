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

//! # FxDesk
//! FxDesk is a deterministic, event-driven simulation core for a foreign-exchange dealing desk.
//! * **Deterministic**: A fixed input event stream produces byte-identical output record streams
//!   and final state on every run. Single-threaded, event-time driven, no wall clock, no entropy,
//!   no randomized-hash iteration.
//! * **Exact**: All monetary, quantity and price values are exact `rust_decimal` decimals. No
//!   floats cross a handler boundary, comparison or serialization.
//! * **Attributable**: Client trades decompose into risk-pair legs, open immutable lots, and
//!   realize P&L with strict FIFO matching.
//!
//! ## Overview
//! The [`Simulation`](engine::run::Simulation) merges finite event sources into a single
//! globally-ordered sequence and dispatches each event to a pure handler. Handlers consult the
//! [`EngineState`](engine::state::EngineState) and, for trades, invoke the
//! [decomposer](engine::decompose) (which uses the [converter](engine::convert)) to derive
//! risk-pair legs, then drive the [`LotManager`](engine::lot::manager::LotManager). Each dispatch
//! yields a new state and zero or more [`OutputRecord`](output::OutputRecord)s, which are
//! forwarded to the caller's [`RecordSink`](output::RecordSink).

use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Simulation configuration surface.
///
/// eg/ `SimulationConfig`, `LotTrackingConfig`, `MatchingRule`, etc.
pub mod config;

/// Simulation engine: state, transitions, conversion, decomposition, lot tracking, handlers and
/// the event-dispatch loop.
pub mod engine;

/// Defines all possible fatal errors in the FxDesk core.
pub mod error;

/// Input event model.
///
/// eg/ `DeskEvent`, `MarketUpdate`, `ClientTrade`, `EventKey`, etc.
pub mod event;

/// Provides default FxDesk Tracing logging initialisers.
pub mod logging;

/// Output record model and the record sink contract.
///
/// eg/ `OutputRecord`, `RecordKind`, `RecordSink`, etc.
pub mod output;

/// Event source contract and in-memory sources.
pub mod source;

/// A timed value.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Constructor,
)]
pub struct Timed<T> {
    pub value: T,
    pub time: DateTime<Utc>,
}

/// Monotonically increasing event sequence. Disambiguates events sharing a timestamp, and backs
/// deterministic lot-id assignment.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Constructor,
)]
pub struct Sequence(pub u64);

impl Sequence {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn fetch_add(&mut self) -> Sequence {
        let sequence = *self;
        self.0 += 1;
        sequence
    }
}
