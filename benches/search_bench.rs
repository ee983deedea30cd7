use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kmknn::{
    batch_distances, find_knn, find_neighbors, query_knn, Dataset, DistanceMetric, KmknnIndex,
    KmknnParams, SearchOptions,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_random_points(num: usize, dim: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..num * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Dataset::from_row_major(values, dim).unwrap()
}

fn bench_search_varying_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_knn_k");

    let reference = generate_random_points(20_000, 8, 1);
    let index = KmknnIndex::build(reference, &KmknnParams::default()).unwrap();
    let query: Vec<f64> = generate_random_points(1, 8, 2).as_slice().to_vec();

    for k in [1, 10, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::new("kmknn", k), k, |bencher, &k| {
            bencher.iter(|| index.search_knn(black_box(&query), k, None))
        });
    }

    // Exhaustive scan for comparison
    group.bench_function("brute_force", |bencher| {
        bencher.iter(|| {
            let mut all = batch_distances(black_box(&query), index.reference().as_slice(), DistanceMetric::Euclidean);
            all.sort_by(|a, b| a.1.total_cmp(&b.1));
            all.truncate(10);
            all
        })
    });

    group.finish();
}

fn bench_search_varying_clusters(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_knn_clusters");
    group.sample_size(10);

    let reference = generate_random_points(10_000, 8, 3);
    let queries = generate_random_points(500, 8, 4);

    for clusters in [1, 25, 100, 400].iter() {
        let params = KmknnParams::default().with_num_clusters(*clusters);
        let index = KmknnIndex::build(reference.clone(), &params).unwrap();

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(clusters), clusters, |bencher, _| {
            bencher.iter(|| query_knn(&index, black_box(&queries), 10, &SearchOptions::default()))
        });
    }

    group.finish();
}

fn bench_find_mode(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_mode");
    group.sample_size(10);

    let reference = generate_random_points(10_000, 4, 5);
    let index = KmknnIndex::build(reference, &KmknnParams::default()).unwrap();

    group.throughput(Throughput::Elements(index.len() as u64));
    group.bench_function("find_knn_k10", |bencher| {
        bencher.iter(|| find_knn(&index, 10, &SearchOptions::default()))
    });
    group.bench_function("find_neighbors_r0.1", |bencher| {
        bencher.iter(|| find_neighbors(&index, 0.1, &SearchOptions::default()))
    });

    group.finish();
}

criterion_group!(benches, bench_search_varying_k, bench_search_varying_clusters, bench_find_mode);
criterion_main!(benches);
