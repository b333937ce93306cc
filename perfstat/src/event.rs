//! Logical hardware events and the raw `perf` spellings that carry them.
//!
//! `perf stat` prints the same counter under different names depending on
//! the modifiers it was collected with (`cycles:u` vs `cycles`) and on the
//! kernel's aliases (`page-faults` vs `faults`). Every [`LogicalEvent`]
//! lists the spellings it accepts, most specific first.

use crate::CounterMap;

macro_rules! logical_events {
    ( $( $variant:ident => $name:literal [ $( $spelling:literal ),+ ] ),+ $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LogicalEvent {
            $( $variant ),+
        }

        impl LogicalEvent {
            pub const ALL: &'static [LogicalEvent] = &[ $( LogicalEvent::$variant ),+ ];

            /// Tool-independent name of the event.
            pub fn name(self) -> &'static str {
                match self {
                    $( LogicalEvent::$variant => $name ),+
                }
            }

            /// Accepted raw spellings in priority order.
            pub fn spellings(self) -> &'static [&'static str] {
                match self {
                    $( LogicalEvent::$variant => &[ $( $spelling ),+ ] ),+
                }
            }
        }
    };
}

logical_events! {
    Cycles => "CYCLES" ["cycles:u", "cycles"],
    Instructions => "IC" ["instructions:u", "instructions"],
    MemLoadsRetired => "MEM_LOADS_RETIRED"
        ["mem_inst_retired.all_loads:u", "mem_inst_retired.all_loads"],
    MemStoresRetired => "MEM_STORES_RETIRED"
        ["mem_inst_retired.all_stores:u", "mem_inst_retired.all_stores"],

    L1FillBufferHit => "MEM_LOAD_RETIRED_FB_HIT"
        ["mem_load_retired.fb_hit:u", "mem_load_retired.fb_hit"],
    L1LoadHit => "MEM_LOAD_RETIRED_L1_HIT"
        ["mem_load_retired.l1_hit:u", "mem_load_retired.l1_hit"],
    L1LoadMiss => "MEM_LOAD_RETIRED_L1_MISS"
        ["mem_load_retired.l1_miss:u", "mem_load_retired.l1_miss"],
    L2LoadHit => "MEM_LOAD_RETIRED_L2_HIT"
        ["mem_load_retired.l2_hit:u", "mem_load_retired.l2_hit"],
    L2LoadMiss => "MEM_LOAD_RETIRED_L2_MISS"
        ["mem_load_retired.l2_miss:u", "mem_load_retired.l2_miss"],
    L3LoadHit => "MEM_LOAD_RETIRED_L3_HIT"
        ["mem_load_retired.l3_hit:u", "mem_load_retired.l3_hit"],
    L3LoadMiss => "MEM_LOAD_RETIRED_L3_MISS"
        ["mem_load_retired.l3_miss:u", "mem_load_retired.l3_miss"],

    L1IcacheLoadMisses => "L1_ICACHE_MISSES"
        ["L1-icache-load-misses:u", "L1-icache-load-misses"],
    L1DcacheStores => "L1_DCACHE_STORES"
        ["L1-dcache-stores:u", "L1-dcache-stores"],
    L1DcacheStoreMisses => "L1_DCACHE_STORE_MISSES"
        ["L1-dcache-store-misses:u", "L1-dcache-store-misses"],

    DtlbLoads => "DTLB_LOADS" ["dTLB-loads:u", "dTLB-loads"],
    DtlbLoadMisses => "DTLB_LOAD_MISSES" ["dTLB-load-misses:u", "dTLB-load-misses"],
    DtlbStores => "DTLB_STORES" ["dTLB-stores:u", "dTLB-stores"],
    DtlbStoreMisses => "DTLB_STORE_MISSES" ["dTLB-store-misses:u", "dTLB-store-misses"],
    ItlbLoads => "ITLB_LOADS" ["iTLB-loads:u", "iTLB-loads"],
    ItlbLoadMisses => "ITLB_LOAD_MISSES" ["iTLB-load-misses:u", "iTLB-load-misses"],

    LlcStores => "LLC_STORES_COUNT" ["LLC-stores:u", "LLC-stores"],
    LlcStoreMisses => "LLC_STORE_MISSES_COUNT" ["LLC-store-misses:u", "LLC-store-misses"],

    BranchMisses => "BRANCH_MISSES" ["branch-misses:u", "branch-misses"],

    OffcoreAllDataRd => "OFFCORE_REQS_ALL_DATA_RD"
        ["offcore_requests.all_data_rd:u", "offcore_requests.all_data_rd"],
    OffcoreDemandDataRd => "OFFCORE_REQS_DEMAND_DATA_RD"
        ["offcore_requests.demand_data_rd:u", "offcore_requests.demand_data_rd"],
    OffcoreOutstandingDataRd => "OFFCORE_REQS_OUTSTANDING_CYCLES_DATA_RD"
        ["offcore_requests_outstanding.cycles_with_data_rd:u",
         "offcore_requests_outstanding.cycles_with_data_rd"],
    StallsL3Miss => "CYCLE_ACTIVITY_STALLS_L3_MISS"
        ["cycle_activity.stalls_l3_miss:u", "cycle_activity.stalls_l3_miss"],
    LoadLatencyGt32 => "MEM_TRANS_LATENCY_GT_32"
        ["mem_trans_retired.load_latency_gt_32:u", "mem_trans_retired.load_latency_gt_32"],
    LoadLatencyGt128 => "MEM_TRANS_LATENCY_GT_128"
        ["mem_trans_retired.load_latency_gt_128:u", "mem_trans_retired.load_latency_gt_128"],
    LoadLatencyGt512 => "MEM_TRANS_LATENCY_GT_512"
        ["mem_trans_retired.load_latency_gt_512:u", "mem_trans_retired.load_latency_gt_512"],

    ContextSwitches => "CONTEXT_SWITCHES"
        ["context-switches:u", "context-switches", "cs:u", "cs"],
    PageFaults => "PAGE_FAULTS" ["page-faults:u", "page-faults", "faults:u", "faults"],
    MajorFaults => "MAJOR_FAULTS" ["major-faults:u", "major-faults"],
    MinorFaults => "MINOR_FAULTS" ["minor-faults:u", "minor-faults"],
}

/// Value of `event`, or `None` if none of its spellings (nor its logical
/// name) occurs in `counters`.
pub fn lookup(counters: &CounterMap, event: LogicalEvent) -> Option<u64> {
    event.spellings()
        .iter()
        .find_map(|spelling| counters.get(*spelling))
        .or_else(|| counters.get(event.name()))
        .copied()
}

/// Value of `event`, treating an absent counter as zero.
pub fn resolve(counters: &CounterMap, event: LogicalEvent) -> u64 {
    lookup(counters, event).unwrap_or(0)
}
