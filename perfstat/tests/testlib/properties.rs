use perfstat::metrics::{MetricRecord, MetricValue};

// Every derived value is either a count, a finite number or not applicable.
pub fn prop_values_well_formed(record: &MetricRecord) -> bool {
    record.iter().all(|(_, value)| match value {
        MetricValue::Numeric(v) => v.is_finite() && v >= 0.0,
        MetricValue::Count(_) | MetricValue::NotApplicable => true,
    })
}

// A hit rate lies within [0, 100] whenever it is defined.
pub fn prop_rate_bounded(value: Option<MetricValue>) -> bool {
    match value {
        Some(MetricValue::Numeric(v)) => (0.0..=100.0).contains(&v),
        Some(MetricValue::NotApplicable) => true,
        _ => false,
    }
}
