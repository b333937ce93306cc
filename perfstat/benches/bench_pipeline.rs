use std::fmt::Write;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use perfstat::{
    counters::parse_counters,
    diag::Diagnostics,
    event::LogicalEvent,
    merge::{merge_groups, GroupCounters, GroupId, MergePolicy},
    metrics::derive,
    walltime::read_wall_time,
};

const SAMPLE_SIZE: usize = 32;

criterion_group!(benches,
    bench_parse_counters,
    bench_merge_derive,
    bench_wall_time
);
criterion_main!(benches);

fn perf_output(repeat: usize) -> String {
    let mut text = String::from(" Performance counter stats for './bench':\n\n");
    for i in 0..repeat {
        for event in LogicalEvent::ALL {
            let _ = writeln!(text, "  {:>15} {}", 1_000 + i * 7, event.spellings()[0]);
        }
    }
    text.push_str("\n       2.345678000 seconds time elapsed\n");
    text
}

fn bench_parse_counters(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_counters");
    group.sample_size(SAMPLE_SIZE);

    for repeat in [1, 16, 256] {
        let text = perf_output(repeat);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(repeat), &text, |b, text| {
            b.iter(|| {
                let mut diag = Diagnostics::quiet();
                parse_counters(text.as_bytes(), "bench", &mut diag)
            })
        });
    }
    group.finish();
}

fn bench_merge_derive(c: &mut Criterion) {
    let mut diag = Diagnostics::quiet();
    let counters = parse_counters(perf_output(1).as_bytes(), "bench", &mut diag)
        .expect("in-memory input");
    let groups: GroupCounters = GroupId::ALL.iter()
        .map(|g| (*g, counters.clone()))
        .collect();
    let policy = MergePolicy::default();

    c.bench_function("merge_and_derive", |b| {
        b.iter(|| derive(&merge_groups(&groups, &policy)))
    });
}

fn bench_wall_time(c: &mut Criterion) {
    let text: String = (0..5)
        .map(|run| format!("RESULT\tgen=g\tdatatype=t\talgo=x\trun={}\tmilli={}\n", run, 10.5))
        .chain(std::iter::repeat("phase two output\n".to_string()).take(1000))
        .collect();

    c.bench_function("read_wall_time", |b| {
        b.iter(|| {
            let mut diag = Diagnostics::quiet();
            read_wall_time(text.as_bytes(), 5, "bench", &mut diag)
        })
    });
}
