//! 日付正規化のベンチマーク

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metric_query::query::{DateRange, Extraction, ResultNormalizer};

fn bench_normalize_date(c: &mut Criterion) {
    let normalizer =
        ResultNormalizer::with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap_or_default());
    let mut group = c.benchmark_group("normalize_date");

    let inputs = [
        ("iso", "2024-03-31"),
        ("us_slash", "03/31/2024"),
        ("month_name", "March 31st, 2024"),
        ("rfc3339", "2024-03-31T15:30:00Z"),
        ("month_year", "March 2024"),
        ("no_year", "March 31"),
        ("short_year", "03/31/24"),
        ("unparseable", "last quarter"),
    ];

    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| normalizer.normalize_date(black_box(input)))
        });
    }
    group.finish();
}

fn bench_normalize_extraction(c: &mut Criterion) {
    let normalizer =
        ResultNormalizer::with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap_or_default());
    let extraction = Extraction {
        entities: (0..10).map(|i| format!("Company {i}")).collect(),
        parameter: Some("revenue".to_string()),
        dates: DateRange {
            start: Some("January 1st, 2024".to_string()),
            end: None,
        },
    };

    c.bench_function("normalize_ten_entities", |b| {
        b.iter(|| normalizer.normalize(black_box(&extraction)))
    });
}

criterion_group!(benches, bench_normalize_date, bench_normalize_extraction);
criterion_main!(benches);
