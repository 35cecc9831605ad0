use bindelta::codec::{PatchApplier, PatchEncoder};
use bindelta::config::DiffOptions;
use bindelta::engine::DiffEngine;
use bindelta::hash::SampleIndex;
use bindelta::source::SliceSource;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn encode_patch(original: &[u8], new: &[u8]) -> Vec<u8> {
    let org = SliceSource::new(original.to_vec());
    let new_src = SliceSource::new(new.to_vec());
    let mut engine = DiffEngine::new(org, new_src, DiffOptions::default());
    let mut patch = Vec::new();
    let mut enc = PatchEncoder::new(&mut patch);
    engine.diff(&mut enc).unwrap();
    patch
}

fn apply_patch(original: &[u8], patch: &[u8]) -> Vec<u8> {
    let mut org_reader = std::io::Cursor::new(original.to_vec());
    let mut patch_reader = std::io::Cursor::new(patch.to_vec());
    let mut out = Vec::new();
    PatchApplier::apply(&mut patch_reader, &mut org_reader, &mut out).unwrap();
    out
}

fn bench_diff_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("diff_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let original = gen_data(size, 1);
        let new = mutate(&original, 4096);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let patch = encode_patch(black_box(&original), black_box(&new));
                black_box(patch);
            });
        });
    }
    g.finish();
}

fn bench_patch_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("patch_speed_vs_patch_size");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let original = gen_data(size, 2);
        let new = mutate(&original, 8192);
        let patch = encode_patch(&original, &new);
        g.throughput(Throughput::Bytes(patch.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = apply_patch(black_box(&original), black_box(&patch));
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_patch_size_vs_edit_density(c: &mut Criterion) {
    let mut g = c.benchmark_group("patch_size_vs_edit_density");
    let original = gen_data(2 * 1024 * 1024, 3);
    for stride in [256usize, 1024, 4096, 16384, 65536] {
        let new = mutate(&original, stride);
        g.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, _| {
            b.iter(|| {
                let patch = encode_patch(&original, &new);
                black_box(patch.len());
            });
        });
    }
    g.finish();
}

fn bench_sample_index(c: &mut Criterion) {
    let mut g = c.benchmark_group("sample_index_insert_and_lookup");
    for capacity in [1 << 14, 1 << 16, 1 << 18] {
        g.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let mut index = SampleIndex::new(capacity);
                for i in 0..(capacity / 2) as u64 {
                    index.add((i.wrapping_mul(2654435761)) as u32, i, 0);
                }
                black_box(index.get(0x1234_5678));
            });
        });
    }
    g.finish();
}

fn bench_real_world_scenarios(c: &mut Criterion) {
    let mut g = c.benchmark_group("real_world_scenarios");
    let scenarios = [
        ("software_update", 4 * 1024 * 1024usize, 1024usize),
        ("document_versioning", 512 * 1024usize, 256usize),
        ("database_snapshot", 8 * 1024 * 1024usize, 4096usize),
        ("log_rotation_append", 2 * 1024 * 1024usize, 0usize),
    ];

    for (name, size, stride) in scenarios {
        let original = gen_data(size, size as u64);
        let new = if stride == 0 {
            let mut n = original.clone();
            n.extend_from_slice(b"appended-tail-content-for-log-rotation-scenario");
            n
        } else {
            mutate(&original, stride)
        };
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_function(name, |b| {
            b.iter(|| {
                let patch = encode_patch(&original, &new);
                let out = apply_patch(&original, &patch);
                black_box(out);
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_diff_speed,
    bench_patch_speed,
    bench_patch_size_vs_edit_density,
    bench_sample_index,
    bench_real_world_scenarios
);
criterion_main!(benches);
