#[macro_use(quickcheck)]
extern crate quickcheck;
use std::collections::BTreeMap;
use analysis::{importance::build_dataset, report::format_count};
use perfstat::{
    diag::Diagnostics,
    metrics::{Metric, MetricRecord, MetricValue},
    ConfigKey, RunTable,
};

fn table_of(runs: &[(u16, Option<u16>)]) -> RunTable<MetricRecord> {
    let algos = runs.iter().enumerate()
        .map(|(i, (wall_time, cycles))| {
            let mut record = MetricRecord::new();
            record.insert(Metric::AverageWallTime, MetricValue::Numeric(*wall_time as f64));
            record.insert(
                Metric::Cycles,
                cycles.map_or(MetricValue::NotApplicable, |c| MetricValue::Count(c as u64)),
            );
            (format!("benchmark_{:04}", i), record)
        })
        .collect();
    BTreeMap::from([(ConfigKey::new("g", "t"), algos)])
}

quickcheck! {
    fn count_grouping_keeps_digits(count: u64) -> bool {
        let text = format_count(count);
        let groups: Vec<&str> = text.split(',').collect();

        text.replace(',', "") == count.to_string()
            && (1..=3).contains(&groups[0].len())
            && groups[1..].iter().all(|g| g.len() == 3)
    }

    fn missing_values_take_column_mean(runs: Vec<(u16, Option<u16>)>) -> bool {
        let mut diag = Diagnostics::quiet();
        let dataset = build_dataset(&table_of(&runs), &[Metric::Cycles], &[], &mut diag);

        let present: Vec<f64> = runs.iter().filter_map(|(_, c)| c.map(|c| c as f64)).collect();
        if runs.len() < 2 || present.is_empty() {
            return dataset.is_none();
        }
        let Some(dataset) = dataset else {
            return false;
        };

        let fill = present.iter().sum::<f64>() / present.len() as f64;
        dataset.features == [Metric::Cycles]
            && dataset.target == runs.iter().map(|(t, _)| *t as f64).collect::<Vec<_>>()
            && dataset.rows.iter().zip(&runs).all(|(row, (_, cycles))| match cycles {
                Some(c) => row[0] == *c as f64,
                None => (row[0] - fill).abs() <= 1e-9 * fill.max(1.0),
            })
    }
}
