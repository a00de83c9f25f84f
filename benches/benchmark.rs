use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use remindly::parser::{extract_title, parse_reminder_at};

const INPUTS: [&str; 6] = [
    "Call mom tomorrow at 3pm",
    "Pay rent on 1st",
    "last Saturday of the month brunch",
    "alternating Mondays until Dec 2026",
    "not today, but tomorrow, check in with Raj",
    "remind me to water the plants every 3 days",
];

fn bench_parse_reminder(c: &mut Criterion) {
    let now = NaiveDate::from_ymd_opt(2025, 6, 2).and_then(|d| d.and_hms_opt(10, 0, 0)).unwrap();

    c.bench_function("parse_reminder_mixed", |b| {
        b.iter(|| {
            for input in INPUTS {
                black_box(parse_reminder_at(black_box(input), now));
            }
        })
    });

    c.bench_function("extract_title_mixed", |b| {
        b.iter(|| {
            for input in INPUTS {
                black_box(extract_title(black_box(input)));
            }
        })
    });
}

criterion_group!(benches, bench_parse_reminder);
criterion_main!(benches);
