#[macro_use(quickcheck)]
extern crate quickcheck;
mod testlib;
use testlib::{
    AnyEvent, AnyGroups, PerfCounters,
    properties::{prop_rate_bounded, prop_values_well_formed},
};
use perfstat::{
    event::{lookup, resolve, LogicalEvent},
    merge::{merge_groups, GroupId, MergePolicy},
    metrics::{derive, Metric, MetricValue},
};

quickcheck! {
    fn absent_event_resolves_to_zero(counters: PerfCounters, event: AnyEvent) -> bool {
        let mut counters = counters.0;
        for spelling in event.0.spellings() {
            counters.remove(*spelling);
        }
        counters.remove(event.0.name());

        lookup(&counters, event.0).is_none() && resolve(&counters, event.0) == 0
    }

    fn derive_is_deterministic(counters: PerfCounters) -> bool {
        derive(&counters.0) == derive(&counters.0)
    }

    fn derive_covers_every_metric(counters: PerfCounters) -> bool {
        let record = derive(&counters.0);
        let metrics: Vec<Metric> = record.iter().map(|(m, _)| m).collect();
        metrics == Metric::derived() && prop_values_well_formed(&record)
    }

    fn hit_rates_bounded(counters: PerfCounters) -> bool {
        let record = derive(&counters.0);
        [Metric::L1LoadHitRate, Metric::L2LoadHitRate, Metric::L3LoadHitRate]
            .into_iter()
            .all(|m| prop_rate_bounded(record.get(m)))
    }

    fn ipc_guarded_by_cycles(counters: PerfCounters) -> bool {
        let record = derive(&counters.0);
        let cycles = resolve(&counters.0, LogicalEvent::Cycles);
        let applicable = record.get(Metric::Ipc).map_or(false, |v| v.is_applicable());
        applicable == (cycles != 0)
    }

    fn merged_events_are_union(groups: AnyGroups) -> bool {
        let merged = merge_groups(&groups.0, &MergePolicy::default());
        let all_present = groups.0.values()
            .flat_map(|c| c.keys())
            .all(|event| merged.contains_key(event));
        let none_invented = merged.keys()
            .all(|event| groups.0.values().any(|c| c.contains_key(event)));
        all_present && none_invented
    }

    fn core_group_wins_in_any_order(groups: AnyGroups, reversed: bool) -> bool {
        let mut policy = MergePolicy::default();
        if reversed {
            policy.group_order.reverse();
        }
        let merged = merge_groups(&groups.0, &policy);

        let Some(core) = groups.0.get(&GroupId::Group1) else {
            return true;
        };
        policy.core_events.iter()
            .filter_map(|event| core.get(event).map(|count| (event, count)))
            .all(|(event, count)| merged.get(event) == Some(count))
    }

    fn first_claim_wins_outside_core(groups: AnyGroups) -> bool {
        let policy = MergePolicy::default();
        let merged = merge_groups(&groups.0, &policy);
        merged.iter()
            .filter(|(event, _)| !policy.core_events.contains(*event))
            .all(|(event, count)| {
                let first = policy.group_order.iter()
                    .find_map(|g| groups.0.get(g).and_then(|c| c.get(event)));
                first == Some(count)
            })
    }
}

#[test]
fn not_applicable_is_distinct_from_zero() {
    assert_ne!(MetricValue::NotApplicable, MetricValue::Numeric(0.0));
    assert_ne!(MetricValue::NotApplicable, MetricValue::Count(0));
}
