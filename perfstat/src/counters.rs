//! Parser for a single `perf stat` output file.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use crate::{diag::Diagnostics, fmt_open_err, path_str, CounterMap};

const NOT_SUPPORTED: &str = "<not supported>";
const NOT_COUNTED: &str = "<not counted>";

// Lines perf prints around the counter table which carry no event.
const KNOWN_PREFIXES: &[&str] = &[
    "Performance counter stats for",
    "Some events weren't counted",
    "Try disabling",
    "echo 0 >",
    "perf stat",
    "Sampling",
    NOT_COUNTED,
];
const KNOWN_FRAGMENTS: &[&str] = &[
    "seconds time elapsed",
    "seconds user",
    "seconds sys",
    "CPUs utilized",
    "msec task-clock",
    "msec cpu-clock",
];

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Count(&'a str, &'a str),
    NotSupported(&'a str),
    Ignored,
    Unrecognized,
}

pub fn read_counter_file(path: &Path, diag: &mut Diagnostics) -> Result<CounterMap, String> {
    let file = File::open(path).map_err(|e| fmt_open_err(e, path))?;
    parse_counters(BufReader::new(file), path_str(path), diag)
}

/// Parses `perf stat` text. `origin` names the source in diagnostics.
/// Only a read error fails; bad lines are reported and skipped.
pub fn parse_counters(
    reader: impl BufRead,
    origin: &str,
    diag: &mut Diagnostics) -> Result<CounterMap, String>
{
    let mut counters = CounterMap::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line
            .map_err(|e| format!("unable to read line from {}: {}", origin, e))?;

        match classify(&line) {
            Line::Count(count, event) => match parse_count(count) {
                Some(value) => {
                    counters.insert(event.to_string(), value);
                },
                None => diag.warn(format!(
                    "could not parse count '{}' for event '{}' in {}:{}",
                    count, event, origin, number + 1
                )),
            },
            Line::NotSupported(event) => {
                counters.insert(event.to_string(), 0);
            },
            Line::Ignored => (),
            Line::Unrecognized => diag.warn(format!(
                "unrecognized line in {}:{}: {}",
                origin, number + 1, line.trim()
            )),
        }
    }

    if counters.is_empty() {
        diag.warn(format!("no counter lines found in {}", origin));
    }
    Ok(counters)
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Line::Ignored;
    }

    if let Some(rest) = line.strip_prefix(NOT_SUPPORTED) {
        return match rest.split_ascii_whitespace().next() {
            Some(event) if is_event_name(event) => Line::NotSupported(event),
            _ => Line::Unrecognized,
        };
    }

    let mut fields = line.split_ascii_whitespace();
    if let (Some(count), Some(event)) = (fields.next(), fields.next()) {
        if is_count(count) && is_event_name(event) {
            return Line::Count(count, event);
        }
    }

    let known = KNOWN_PREFIXES.iter().any(|p| line.starts_with(p))
        || KNOWN_FRAGMENTS.iter().any(|f| line.contains(f));
    if known {
        Line::Ignored
    } else {
        Line::Unrecognized
    }
}

fn is_count(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_digit() || b == b',')
}

fn is_event_name(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b|
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-')
    )
}

fn parse_count(count: &str) -> Option<u64> {
    let digits: String = count.chars().filter(|&c| c != ',').collect();
    digits.parse().ok()
}
