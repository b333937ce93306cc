pub mod properties;

use quickcheck::{Arbitrary, Gen};
use perfstat::{event::LogicalEvent, merge::{GroupCounters, GroupId}, CounterMap};

#[derive(Debug, Clone, Copy)]
pub struct AnyEvent(pub LogicalEvent);

impl Arbitrary for AnyEvent {
    fn arbitrary(g: &mut Gen) -> Self {
        AnyEvent(*g.choose(LogicalEvent::ALL).unwrap())
    }
}

/// Counters spelled the way perf prints them, with small counts so sums
/// never overflow.
#[derive(Debug, Clone)]
pub struct PerfCounters(pub CounterMap);

impl Arbitrary for PerfCounters {
    fn arbitrary(g: &mut Gen) -> Self {
        let size = usize::arbitrary(g) % 24;
        let counters = (0..size)
            .map(|_| {
                let event = *g.choose(LogicalEvent::ALL).unwrap();
                let spelling = *g.choose(event.spellings()).unwrap();
                (spelling.to_string(), u64::arbitrary(g) % 1_000_000_000)
            })
            .collect();
        PerfCounters(counters)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let entries: Vec<(String, u64)> = self.0.clone().into_iter().collect();
        Box::new(entries.shrink().map(|e| PerfCounters(e.into_iter().collect())))
    }
}

/// Up to four groups of counters, each group present or absent at random.
#[derive(Debug, Clone)]
pub struct AnyGroups(pub GroupCounters);

impl Arbitrary for AnyGroups {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut groups = GroupCounters::new();
        for group in GroupId::ALL {
            if bool::arbitrary(g) {
                groups.insert(group, PerfCounters::arbitrary(g).0);
            }
        }
        AnyGroups(groups)
    }
}
