use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use parley::llm::family::ModelFamily;
use parley::llm::generator::encode_delta;
use parley::pipeline::chunker::SentenceChunker;
use parley::pipeline::playback::farewell_batches;
use std::hint::black_box;

/// Split `text` into deltas of `size` characters, like a token stream.
fn token_stream(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn response_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Sentence number {i} says something mildly interesting. "))
        .collect()
}

fn bench_chunker(c: &mut Criterion) {
    let text = response_text(200);
    let mut group = c.benchmark_group("sentence_chunker");
    group.throughput(Throughput::Bytes(text.len() as u64));

    for delta_size in [1, 4, 16, 64] {
        let deltas = token_stream(&text, delta_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(delta_size),
            &deltas,
            |b, deltas| {
                b.iter(|| {
                    let mut chunker = SentenceChunker::new();
                    let mut chunks = 0;
                    for delta in deltas {
                        if chunker.push(black_box(delta)).is_some() {
                            chunks += 1;
                        }
                    }
                    if chunker.finish().is_some() {
                        chunks += 1;
                    }
                    chunks
                })
            },
        );
    }
    group.finish();
}

fn bench_delta_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_delta");
    for family in [
        ModelFamily::Amazon,
        ModelFamily::Meta,
        ModelFamily::Anthropic,
        ModelFamily::Cohere,
    ] {
        let raw = encode_delta(family, " and then the story continues");
        group.bench_with_input(BenchmarkId::from_parameter(family.as_str()), &raw, |b, raw| {
            b.iter(|| family.extract_delta(black_box(raw)))
        });
    }
    group.finish();
}

fn bench_farewell_batches(c: &mut Criterion) {
    let text = response_text(500);
    c.bench_function("farewell_batches_500_sentences", |b| {
        b.iter(|| farewell_batches(black_box(&text), 20))
    });
}

criterion_group!(benches, bench_chunker, bench_delta_decoding, bench_farewell_batches);
criterion_main!(benches);
