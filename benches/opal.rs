use opal::lowlevel::{SsdKernel, SsdScalar};
use opal::{CorrespondenceSearch, Grid, ImageLibrary, Label, PatchDistance, SearchSettings};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(width: usize, height: usize, seed: usize) -> Grid<f64> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = (((x + seed) * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as f64);
        }
    }
    Grid::from_vec(data, height, width).unwrap()
}

fn make_labels(width: usize, height: usize) -> Grid<Label> {
    let data = (0..width * height)
        .map(|i| ((i / width) / 16 * 4 + (i % width) / 16) as Label)
        .collect();
    Grid::from_vec(data, height, width).unwrap()
}

fn bench_patch_distance(c: &mut Criterion) {
    let fixed = make_image(128, 128, 0);
    let moving = make_image(128, 128, 5);

    c.bench_function("patch_ssd_full_r3", |b| {
        b.iter(|| black_box(SsdScalar::patch_ssd(&fixed, (40, 40), &moving, (52, 47), 7)));
    });

    c.bench_function("patch_distance_shift_sweep_r3", |b| {
        b.iter(|| {
            let mut d = PatchDistance::new(&fixed, (3, 3), &moving, (3, 3), 3).unwrap();
            while d.shift_right().is_ok() {}
            black_box(d.value())
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let (width, height) = (128, 96);
    let mut library = ImageLibrary::new();
    for seed in [0, 3, 9, 21] {
        library
            .add(make_image(width, height, seed), make_labels(width, height))
            .unwrap();
    }

    let settings = SearchSettings {
        init_window_radius: 8,
        patch_radius: 3,
        max_iterations: 4,
        ..SearchSettings::default()
    };

    c.bench_function("search_run_sequential", |b| {
        b.iter(|| {
            let mut search = CorrespondenceSearch::new(&library, settings.clone()).unwrap();
            black_box(search.run().unwrap().as_slice().len())
        });
    });

    let parallel = SearchSettings {
        parallel: true,
        ..settings.clone()
    };
    c.bench_function("search_run_parallel_passes", |b| {
        b.iter(|| {
            let mut search = CorrespondenceSearch::new(&library, parallel.clone()).unwrap();
            black_box(search.run().unwrap().as_slice().len())
        });
    });
}

criterion_group!(benches, bench_patch_distance, bench_search);
criterion_main!(benches);
