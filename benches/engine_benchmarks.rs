use criterion::{criterion_group, criterion_main, Criterion};
use vantage_core::board::Board;
use vantage_core::config::{EngineConfig, SearchLimits};
use vantage_core::moves::perft;
use vantage_core::search::search;

fn bench_perft_depth_4(c: &mut Criterion) {
    c.bench_function("perft startpos depth 4", |b| {
        b.iter(|| {
            let mut board = Board::new_initial();
            perft::perft(&mut board, 4)
        });
    });
}

fn bench_search_depth_5(c: &mut Criterion) {
    c.bench_function("search startpos depth 5", |b| {
        b.iter(|| {
            let mut board = Board::new_initial();
            search(&mut board, &EngineConfig::default(), SearchLimits::depth(5))
        });
    });
}

criterion_group!(benches, bench_perft_depth_4, bench_search_depth_5);
criterion_main!(benches);
