use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vaultlink_core::{ContentSniffer, EnvelopeCipher};

fn bench_seal_open(c: &mut Criterion) {
    let cipher = EnvelopeCipher::new();
    let mut group = c.benchmark_group("envelope");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let plaintext = vec![0x5au8; size];
        let envelope = cipher.generate_envelope().unwrap();
        let sealed = cipher.seal(&envelope, &plaintext).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("seal", size), &plaintext, |b, p| {
            b.iter(|| cipher.seal(&envelope, black_box(p)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, s| {
            b.iter(|| cipher.open(&envelope, black_box(s)).unwrap())
        });
    }

    group.finish();
}

fn bench_sniff(c: &mut Criterion) {
    let sniffer = ContentSniffer::new();
    let text = "The quick brown fox jumps over the lazy dog.\n".repeat(200);

    c.bench_function("sniff_text_9k", |b| {
        b.iter(|| sniffer.classify(black_box(text.as_bytes())))
    });
}

criterion_group!(benches, bench_seal_open, bench_sniff);
criterion_main!(benches);
