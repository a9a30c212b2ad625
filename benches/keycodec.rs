use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ordkey::{decode_tuple, encode_tuple, Element, Key, MemoryEngine, RangeIterator};

fn tuple() -> Vec<Element> {
    vec![
        Element::from("user:profile"),
        Element::from(184_467_440u64),
        Element::from("2023-07-15-session"),
        Element::Bytes(vec![0xde, 0xad, 0xbe, 0xef]),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let t = tuple();
    c.bench_function("encode_tuple", |b| {
        b.iter(|| encode_tuple(black_box(&t)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let raw = encode_tuple(&tuple());
    c.bench_function("decode_tuple", |b| {
        b.iter(|| decode_tuple(black_box(&raw), b"").unwrap())
    });
}

fn bench_key_compare(c: &mut Criterion) {
    let a = Key::new(&tuple()).unwrap();
    let mut other = tuple();
    other.push(Element::from(1u8));
    let b = Key::new(&other).unwrap();
    c.bench_function("key_compare", |bench| {
        bench.iter(|| black_box(&a).cmp(black_box(&b)))
    });
}

fn bench_scan(c: &mut Criterion) {
    let mut engine = MemoryEngine::new();
    for i in 0..1_000u64 {
        let key = Key::new(&[Element::from("bulk"), Element::from(i)]).unwrap();
        engine.put(key.to_raw(b"s:"), vec![0u8; 16]);
    }
    c.bench_function("scan_1k", |b| {
        b.iter(|| {
            let it = RangeIterator::new(&engine, "s:").forward().unwrap();
            it.map(|r| r.unwrap()).count()
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_key_compare,
    bench_scan
);
criterion_main!(benches);
