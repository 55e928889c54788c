//! Benchmark conversion speed on adversarial input: deep nesting, long
//! runs of unmatched markers, and bracket soup.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use safemark_core::Converter;

fn adversarial_inputs(size: usize) -> Vec<(&'static str, String)> {
    vec![
        ("quotes_at_limit", format!("{}x\n", "> ".repeat(60)).repeat(size)),
        ("quotes_over_limit", format!("{}x", "> ".repeat(size * 10))),
        ("unmatched_stars", "*a ".repeat(size * 100)),
        ("unmatched_brackets", "[a](".repeat(size * 100)),
        ("entities", "&amp; &bogus &#x41; & ".repeat(size * 50)),
        ("autolinks", "http://a.b/c ".repeat(size * 50)),
        ("lists", "* item\n".repeat(size * 100)),
    ]
}

fn bench_adversarial(c: &mut Criterion) {
    let mut group = c.benchmark_group("adversarial");
    let converter = Converter::new();

    for size in [1, 10].iter() {
        for (name, input) in adversarial_inputs(*size) {
            group.throughput(Throughput::Bytes(input.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &input, |b, input| {
                b.iter(|| black_box(converter.convert(black_box(input)).map(|html| html.len())))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_adversarial);
criterion_main!(benches);
