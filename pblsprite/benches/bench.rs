use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pblsprite::{encode::Compression, PaletteInfo, Raster, ReductionMethod, SpriteTableWriter};

fn test_image(width: u32, height: u32) -> Vec<[u8; 4]> {
    (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            if (x / 8 + y / 8) % 3 == 0 {
                [0, 0, 0, 0]
            } else {
                [(x * 4) as u8 & 0xC0, (y * 4) as u8 & 0x80, 0x40, 0xFF]
            }
        })
        .collect()
}

fn convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");

    for size in [16u32, 64, 144] {
        let pixels = test_image(size, size);
        group.throughput(criterion::Throughput::Elements(u64::from(size * size)));

        for method in [ReductionMethod::Nearest, ReductionMethod::Truncate] {
            group.bench_with_input(
                BenchmarkId::new(format!("palette {method}"), size),
                &pixels,
                |b, pixels| b.iter(|| PaletteInfo::build(pixels, method).unwrap()),
            );
            group.bench_with_input(
                BenchmarkId::new(format!("raster {method}"), size),
                &pixels,
                |b, pixels| b.iter(|| Raster::from_rgba(size, size, pixels, method).unwrap()),
            );
        }

        let raster = Raster::from_rgba(size, size, &pixels, ReductionMethod::Nearest).unwrap();
        group.bench_with_input(BenchmarkId::new("png", size), &raster, |b, raster| {
            b.iter(|| raster.to_png_vec(Compression::Best).unwrap())
        });
    }
}

fn pack(c: &mut Criterion) {
    let payloads: Vec<Vec<u8>> = (0..256).map(|i| vec![i as u8; 100 + i]).collect();

    c.bench_function("pack 256 tiles", |b| {
        b.iter(|| {
            let mut table = SpriteTableWriter::new();
            for (i, payload) in payloads.iter().enumerate() {
                table.add_entry("bench", i as u32 + 1, payload).unwrap();
            }
            let mut out = Vec::with_capacity(table.file_size());
            table.finalize_to_vec(&mut out).unwrap();
            out
        })
    });
}

criterion_group!(benches, convert, pack);
criterion_main!(benches);
