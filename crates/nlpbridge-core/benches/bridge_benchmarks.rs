//! Benchmarks for the bridge round trip over the stub engine
//!
//! Each iteration encodes the input, calls through the C ABI, converts the
//! returned records and hands the descriptor back.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nlpbridge_core::Nlp;

const SENTENCE: &str = "The quick brown fox jumps over the lazy dog. ";

fn bench_tokenize(c: &mut Criterion) {
    let nlp = Nlp::stub("en_core_web_sm").expect("stub engine");
    let mut group = c.benchmark_group("tokenize");

    for size in [10, 100, 1000, 10000] {
        let text = SENTENCE.repeat(size / 10 + 1);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| nlp.tokenize(black_box(text)).expect("tokenize"))
        });
    }

    group.finish();
}

fn bench_entities(c: &mut Criterion) {
    let nlp = Nlp::stub("en_core_web_sm").expect("stub engine");
    let mut group = c.benchmark_group("extract_entities");

    let texts = [
        ("short", "Apple Inc is based in Cupertino."),
        (
            "medium",
            "Barack Obama was born in Hawaii. He was the President of the United States.",
        ),
        (
            "long",
            "Microsoft Corp was founded by Bill Gates and Paul Allen in 1975. \
             The company is headquartered in Redmond, Washington. \
             Satya Nadella became CEO in 2014.",
        ),
    ];
    for (name, text) in texts {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| nlp.extract_entities(black_box(text)).expect("entities"))
        });
    }

    group.finish();
}

fn bench_sentences(c: &mut Criterion) {
    let nlp = Nlp::stub("en_core_web_sm").expect("stub engine");
    let mut group = c.benchmark_group("split_sentences");

    for count in [1, 10, 100] {
        let text = "This is a sentence. ".repeat(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| nlp.split_sentences(black_box(text)).expect("sentences"))
        });
    }

    group.finish();
}

fn bench_pos_tags(c: &mut Criterion) {
    let nlp = Nlp::stub("en_core_web_sm").expect("stub engine");
    let text = SENTENCE.repeat(20);
    c.bench_function("pos_tags", |b| {
        b.iter(|| nlp.pos_tags(black_box(&text)).expect("pos tags"))
    });
}

criterion_group!(benches, bench_tokenize, bench_entities, bench_sentences, bench_pos_tags);
criterion_main!(benches);
