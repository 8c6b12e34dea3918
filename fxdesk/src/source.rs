use crate::event::DeskEvent;
use std::sync::Arc;

/// Finite, ordered producer of [`DeskEvent`]s.
///
/// The processor drains every source eagerly before dispatch, so sources need no ordering
/// guarantee of their own - the processor's stable sort by `(time, sequence)` produces the same
/// global order for any partitioning of a stream across sources.
pub trait EventSource {
    fn into_events(self) -> impl Iterator<Item = DeskEvent>;
}

impl EventSource for Vec<DeskEvent> {
    fn into_events(self) -> impl Iterator<Item = DeskEvent> {
        self.into_iter()
    }
}

/// In-memory event source.
///
/// Stores all events in shared memory and yields them by lazy cloning as they are required,
/// allowing the same data to back many simulation runs.
#[derive(Debug, Clone)]
pub struct InMemoryEvents {
    events: Arc<Vec<DeskEvent>>,
}

impl InMemoryEvents {
    pub fn new(events: Arc<Vec<DeskEvent>>) -> Self {
        Self { events }
    }
}

impl EventSource for InMemoryEvents {
    fn into_events(self) -> impl Iterator<Item = DeskEvent> {
        let events = Arc::clone(&self.events);
        (0..events.len()).map(move |index| events[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sequence, event::DeskEventKind};
    use chrono::{TimeZone, Utc};
    use smol_str::SmolStr;

    fn tick(sequence: u64) -> DeskEvent {
        DeskEvent::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Sequence(sequence),
            DeskEventKind::Clock(crate::event::ClockTick::new(SmolStr::new("EOD"))),
        )
    }

    #[test]
    fn test_in_memory_events_yields_all_events_per_drain() {
        let source = InMemoryEvents::new(Arc::new(vec![tick(0), tick(1)]));

        let first = source.clone().into_events().collect::<Vec<_>>();
        let second = source.into_events().collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
