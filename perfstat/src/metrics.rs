//! Named metrics derived from a merged counter map.

use std::{collections::BTreeMap, fmt};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use crate::{event::{resolve, LogicalEvent}, CounterMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Count,
    /// Plain ratio, e.g. instructions per cycle.
    Ratio,
    Percent,
    Millis,
}

macro_rules! metrics {
    ( $( $variant:ident => $name:literal, $kind:ident; )+ ) => {
        /// Output metrics. Declaration order is the canonical report order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Metric {
            $( $variant ),+
        }

        impl Metric {
            pub const ALL: &'static [Metric] = &[ $( Metric::$variant ),+ ];

            pub fn name(self) -> &'static str {
                match self {
                    $( Metric::$variant => $name ),+
                }
            }

            pub fn kind(self) -> MetricKind {
                match self {
                    $( Metric::$variant => MetricKind::$kind ),+
                }
            }
        }
    };
}

metrics! {
    AverageWallTime => "Average Wall Time (ms)", Millis;
    Cycles => "Cycles", Count;
    Instructions => "Total Instructions (IC)", Count;
    Ipc => "IPC (Instructions Per Cycle)", Ratio;
    MemoryAccessInstructions => "Memory Access Instructions", Count;
    MemLoadsRetired => "Memory Loads Retired", Count;
    MemStoresRetired => "Memory Stores Retired", Count;
    L1LoadHitRate => "L1 Load Hit Rate", Percent;
    L1LoadHits => "L1 Load Hits", Count;
    L1LoadMisses => "L1 Load Misses", Count;
    L1FillBufferHits => "L1 Fill Buffer Hits (Loads)", Count;
    L1dStores => "L1D Cache Stores", Count;
    L1dStoreMisses => "L1D Cache Store Misses", Count;
    L1dStoreMissRate => "L1D Cache Store Miss Rate", Percent;
    L2LoadHitRate => "L2 Load Hit Rate (for loads reaching L2)", Percent;
    L2LoadHits => "L2 Load Hits", Count;
    L2LoadMisses => "L2 Load Misses", Count;
    L3LoadHitRate => "L3 Load Hit Rate (for loads reaching L3)", Percent;
    L3LoadHits => "L3 Load Hits", Count;
    L3LoadMisses => "L3 Load Misses (Loads hitting DRAM)", Count;
    LlcStores => "LLC Stores", Count;
    LlcStoreMisses => "LLC Store Misses", Count;
    LlcStoreMissRate => "LLC Store Miss Rate", Percent;
    BranchMisses => "Branch Misses", Count;
    L1IcacheLoadMisses => "L1 ICache Load Misses", Count;
    DtlbLoadMisses => "dTLB Load Misses", Count;
    DtlbStoreMisses => "dTLB Store Misses", Count;
    ItlbLoadMisses => "iTLB Load Misses", Count;
    OffcoreDemandDataRd => "Offcore Reqs Demand Data Rd", Count;
    StallsL3Miss => "Stalls L3 Miss (Cycles)", Count;
    LoadLatencyGt128 => "Load Latency >128 cycles", Count;
    ContextSwitches => "Context Switches", Count;
    PageFaults => "Page Faults", Count;
    MajorPageFaults => "Major Page Faults", Count;
    MinorPageFaults => "Minor Page Faults", Count;
}

impl Metric {
    /// Metrics produced by [`derive`], in canonical order.
    pub fn derived() -> &'static [Metric] {
        &Metric::ALL[1..]
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.iter().find(|m| m.name() == name).copied()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Metric::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown metric \"{}\"", name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Numeric(f64),
    /// The metric's precondition (a non-zero denominator) was not met.
    NotApplicable,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Count(c) => Some(*c as f64),
            MetricValue::Numeric(v) => Some(*v),
            MetricValue::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, MetricValue::NotApplicable)
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Count(c) => serializer.serialize_u64(*c),
            MetricValue::Numeric(v) => serializer.serialize_f64(*v),
            MetricValue::NotApplicable => serializer.serialize_none(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MetricRecord(BTreeMap<Metric, MetricValue>);

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<MetricValue> {
        self.0.get(&metric).copied()
    }

    /// Numeric value of `metric`, `None` if absent or not applicable.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.get(metric).and_then(|v| v.as_f64())
    }

    pub fn insert(&mut self, metric: Metric, value: MetricValue) {
        self.0.insert(metric, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, MetricValue)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn ratio(numerator: u64, denominator: u64) -> MetricValue {
    if denominator == 0 {
        MetricValue::NotApplicable
    } else {
        MetricValue::Numeric(numerator as f64 / denominator as f64)
    }
}

fn percent(numerator: u64, denominator: u64) -> MetricValue {
    match ratio(numerator, denominator) {
        MetricValue::Numeric(r) => MetricValue::Numeric(r * 100.0),
        other => other,
    }
}

/// Derives every metric in [`Metric::derived`] from raw merged counts.
pub fn derive(counters: &CounterMap) -> MetricRecord {
    use LogicalEvent as E;
    use MetricValue::Count;

    let get = |event| resolve(counters, event);
    let mut record = MetricRecord::new();

    let cycles = get(E::Cycles);
    let instructions = get(E::Instructions);
    record.insert(Metric::Cycles, Count(cycles));
    record.insert(Metric::Instructions, Count(instructions));
    record.insert(Metric::Ipc, ratio(instructions, cycles));

    let loads = get(E::MemLoadsRetired);
    let stores = get(E::MemStoresRetired);
    record.insert(Metric::MemoryAccessInstructions, Count(loads.saturating_add(stores)));
    record.insert(Metric::MemLoadsRetired, Count(loads));
    record.insert(Metric::MemStoresRetired, Count(stores));

    let levels = [
        (E::L1LoadHit, E::L1LoadMiss, Metric::L1LoadHitRate, Metric::L1LoadHits, Metric::L1LoadMisses),
        (E::L2LoadHit, E::L2LoadMiss, Metric::L2LoadHitRate, Metric::L2LoadHits, Metric::L2LoadMisses),
        (E::L3LoadHit, E::L3LoadMiss, Metric::L3LoadHitRate, Metric::L3LoadHits, Metric::L3LoadMisses),
    ];
    for (hit, miss, rate, hits_metric, misses_metric) in levels {
        let hits = get(hit);
        let misses = get(miss);
        record.insert(rate, percent(hits, hits.saturating_add(misses)));
        record.insert(hits_metric, Count(hits));
        record.insert(misses_metric, Count(misses));
    }
    record.insert(Metric::L1FillBufferHits, Count(get(E::L1FillBufferHit)));

    let l1d_stores = get(E::L1DcacheStores);
    let l1d_store_misses = get(E::L1DcacheStoreMisses);
    record.insert(Metric::L1dStores, Count(l1d_stores));
    record.insert(Metric::L1dStoreMisses, Count(l1d_store_misses));
    record.insert(Metric::L1dStoreMissRate, percent(l1d_store_misses, l1d_stores));

    let llc_stores = get(E::LlcStores);
    let llc_store_misses = get(E::LlcStoreMisses);
    record.insert(Metric::LlcStores, Count(llc_stores));
    record.insert(Metric::LlcStoreMisses, Count(llc_store_misses));
    record.insert(Metric::LlcStoreMissRate, percent(llc_store_misses, llc_stores));

    let passthrough = [
        (Metric::BranchMisses, E::BranchMisses),
        (Metric::L1IcacheLoadMisses, E::L1IcacheLoadMisses),
        (Metric::DtlbLoadMisses, E::DtlbLoadMisses),
        (Metric::DtlbStoreMisses, E::DtlbStoreMisses),
        (Metric::ItlbLoadMisses, E::ItlbLoadMisses),
        (Metric::OffcoreDemandDataRd, E::OffcoreDemandDataRd),
        (Metric::StallsL3Miss, E::StallsL3Miss),
        (Metric::LoadLatencyGt128, E::LoadLatencyGt128),
        (Metric::ContextSwitches, E::ContextSwitches),
        (Metric::PageFaults, E::PageFaults),
        (Metric::MajorPageFaults, E::MajorFaults),
        (Metric::MinorPageFaults, E::MinorFaults),
    ];
    for (metric, event) in passthrough {
        record.insert(metric, Count(get(event)));
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(entries: &[(&str, u64)]) -> CounterMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_every_derived_metric_present() {
        let record = derive(&CounterMap::new());
        assert_eq!(record.len(), Metric::derived().len());
        let keys: Vec<Metric> = record.iter().map(|(m, _)| m).collect();
        assert_eq!(keys, Metric::derived());
        assert_eq!(record.get(Metric::AverageWallTime), None);
    }

    #[test]
    fn test_empty_counters_guarded() {
        let record = derive(&CounterMap::new());
        for metric in [
            Metric::Ipc, Metric::L1LoadHitRate, Metric::L2LoadHitRate,
            Metric::L3LoadHitRate, Metric::L1dStoreMissRate, Metric::LlcStoreMissRate,
        ] {
            assert_eq!(record.get(metric), Some(MetricValue::NotApplicable), "{}", metric);
        }
        assert_eq!(record.get(Metric::MemoryAccessInstructions), Some(MetricValue::Count(0)));
    }

    #[test]
    fn test_store_miss_rates() {
        let record = derive(&counters(&[
            ("L1-dcache-stores:u", 200),
            ("L1-dcache-store-misses:u", 50),
            ("LLC-stores", 10),
            ("LLC-store-misses", 1),
        ]));
        assert_eq!(record.get(Metric::L1dStoreMissRate), Some(MetricValue::Numeric(25.0)));
        assert_eq!(record.get(Metric::LlcStoreMissRate), Some(MetricValue::Numeric(10.0)));
    }

    #[test]
    fn test_rates_not_clamped() {
        let record = derive(&counters(&[("LLC-stores", 10), ("LLC-store-misses", 30)]));
        assert_eq!(record.get(Metric::LlcStoreMissRate), Some(MetricValue::Numeric(300.0)));
    }

    #[test]
    fn test_memory_access_sum() {
        let record = derive(&counters(&[
            ("mem_inst_retired.all_loads:u", 30),
            ("mem_inst_retired.all_stores", 12),
        ]));
        assert_eq!(record.get(Metric::MemoryAccessInstructions), Some(MetricValue::Count(42)));
    }

    #[test]
    fn test_metric_names_roundtrip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.name()), Some(*metric));
        }
        assert_eq!(Metric::from_name("Bogus"), None);
    }
}
