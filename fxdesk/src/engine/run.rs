use crate::{
    config::SimulationConfig,
    engine::{handler, state::EngineState},
    error::DeskError,
    event::DeskEvent,
    output::{OutputRecord, RecordKind, RecordSink},
    source::EventSource,
};
use itertools::Itertools;
use tracing::{error, info};

/// The simulation processor: owns the configuration and the evolving [`EngineState`].
///
/// `run` merges all sources into a single globally-ordered event sequence, dispatches each event
/// to the handler for its variant, and forwards the produced records to the sink in
/// `(dispatch index, intra-handler order)`. Strictly sequential - determinism is bought with
/// single-threadedness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    pub config: SimulationConfig,
    pub state: EngineState,
}

impl Simulation {
    /// Construct a new [`Self`] with a validated configuration and its initial state.
    pub fn new(config: SimulationConfig) -> Result<Self, DeskError> {
        config.validate()?;
        let state = EngineState::new(&config);
        Ok(Self { config, state })
    }

    /// Drain the provided sources and dispatch every event in global order.
    ///
    /// Returns the final [`EngineState`] on source exhaustion - the only form of termination.
    /// Duplicate `(time, sequence)` keys and handler invariant breakage are fatal: a final
    /// `fatal_error` record is forwarded to the sink and the error is re-raised.
    pub fn run<Source, Sink>(
        mut self,
        sources: Vec<Source>,
        sink: &mut Sink,
    ) -> Result<EngineState, DeskError>
    where
        Source: EventSource,
        Sink: RecordSink,
    {
        let events = match collect_events(sources) {
            Ok(events) => events,
            Err(error) => {
                return Err(fatal(error, None, sink));
            }
        };

        info!(events = events.len(), "starting simulation run");

        for event in &events {
            match handler::process(self.state, &self.config, event) {
                Ok((state, records)) => {
                    self.state = state;
                    for record in records {
                        sink.send(record);
                    }
                }
                Err(error) => {
                    return Err(fatal(error, Some(event), sink));
                }
            }
        }

        info!(
            events = events.len(),
            event_count = self.state.event_count,
            "simulation run complete"
        );

        Ok(self.state)
    }
}

/// Eagerly drain all sources and produce the single globally-ordered event sequence.
///
/// The sort is stable, so sources presenting the same events in differing arrival orders still
/// yield an identical dispatch order. Duplicate ordering keys violate the source contract.
fn collect_events<Source>(sources: Vec<Source>) -> Result<Vec<DeskEvent>, DeskError>
where
    Source: EventSource,
{
    let mut events = sources
        .into_iter()
        .flat_map(EventSource::into_events)
        .collect::<Vec<_>>();
    events.sort_by_key(DeskEvent::key);

    if let Some((duplicate, _)) = events
        .iter()
        .tuple_windows()
        .find(|(lhs, rhs)| lhs.key() == rhs.key())
    {
        return Err(DeskError::DuplicateEventKey {
            key: duplicate.key(),
        });
    }

    Ok(events)
}

/// Emit a final `fatal_error` record and re-raise the error.
fn fatal<Sink>(error: DeskError, event: Option<&DeskEvent>, sink: &mut Sink) -> DeskError
where
    Sink: RecordSink,
{
    error!(%error, "aborting simulation run");

    // Fatal errors raised before any dispatch have no event time; epoch keeps the record total.
    let time = event
        .map(|event| event.time)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH);

    let mut record = OutputRecord::new(time, RecordKind::FatalError)
        .with("error", error.to_string().as_str());
    if let Some(event) = event {
        record = record.with("event_sequence", event.sequence.value());
    }
    sink.send(record);

    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Sequence,
        event::{ClockTick, DeskEventKind, MarketUpdate},
        output::VecSink,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn market_event(secs: i64, sequence: u64) -> DeskEvent {
        DeskEvent::new(
            time(secs),
            Sequence(sequence),
            DeskEventKind::Market(MarketUpdate::new(
                "EUR/USD".parse().unwrap(),
                dec!(1.0995),
                dec!(1.1005),
                dec!(1.1000),
            )),
        )
    }

    fn tick_event(secs: i64, sequence: u64) -> DeskEvent {
        DeskEvent::new(
            time(secs),
            Sequence(sequence),
            DeskEventKind::Clock(ClockTick::new(SmolStr::new("EOD"))),
        )
    }

    #[test]
    fn test_run_dispatches_in_key_order_across_sources() {
        let simulation = Simulation::new(SimulationConfig::new("USD")).unwrap();
        let mut sink = VecSink::new();

        // Sources present events out of order; the processor sorts by (time, sequence).
        let state = simulation
            .run(
                vec![vec![tick_event(3, 2)], vec![market_event(1, 1)]],
                &mut sink,
            )
            .unwrap();

        assert_eq!(state.event_count, 2);
        assert_eq!(sink.records[0].kind, RecordKind::MarketUpdate);
        assert_eq!(sink.records[1].kind, RecordKind::Snapshot);
    }

    #[test]
    fn test_run_rejects_duplicate_event_keys() {
        let simulation = Simulation::new(SimulationConfig::new("USD")).unwrap();
        let mut sink = VecSink::new();

        let result = simulation.run(
            vec![vec![market_event(1, 1), tick_event(1, 1)]],
            &mut sink,
        );

        assert!(matches!(result, Err(DeskError::DuplicateEventKey { .. })));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].kind, RecordKind::FatalError);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = SimulationConfig::new("USD");
        config.lot_tracking.enabled = true;
        config.lot_tracking.risk_pairs = vec!["EUR/GBP".parse().unwrap()];

        assert!(matches!(
            Simulation::new(config),
            Err(DeskError::Config(_))
        ));
    }
}
