use avl_collections::associative::avl_map::AvlMap;
use avl_collections::associative::avl_set::AvlSet;
use avl_collections::hierarchies::avl_core::WithIndex;
use avl_collections::monoid::{Sum, ValueSum};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn filled_set(n: i32) -> AvlSet<i32> {
    let mut set = AvlSet::new();
    for i in 0..n {
        set.insert(i);
    }
    set
}

fn filled_map_with_sum(n: i32) -> AvlMap<i32, i32, WithIndex, ValueSum> {
    let mut map = AvlMap::new();
    for i in 0..n {
        map.insert(i, i);
    }
    map
}

pub fn bench_set_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("avl_set_insert");
    for &n in &[100, 1_000, 10_000] {
        group.bench_with_input(format!("n_{n}"), &n, |b, &n| {
            b.iter(|| {
                let mut set = AvlSet::new();
                for i in 0..n {
                    set.insert(black_box(i));
                }
                black_box(set);
            })
        });
    }
    group.finish();
}

pub fn bench_set_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("avl_set_lookup");
    for &n in &[100, 1_000, 10_000] {
        let set = filled_set(n);
        group.bench_with_input(format!("n_{n}"), &n, |b, &n| {
            b.iter(|| {
                for i in 0..n {
                    black_box(set.contains(&i));
                }
            })
        });
    }
    group.finish();
}

pub fn bench_set_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("avl_set_iterate");
    for &n in &[100, 1_000, 10_000] {
        let set = filled_set(n);
        group.bench_with_input(format!("n_{n}"), &n, |b, _| {
            b.iter(|| {
                for key in set.iter() {
                    black_box(key);
                }
            })
        });
    }
    group.finish();
}

pub fn bench_map_summarize_by_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("avl_map_summarize_by_index");
    for &n in &[100, 1_000, 10_000] {
        let map = filled_map_with_sum(n);
        group.bench_with_input(format!("n_{n}"), &n, |b, &n| {
            b.iter(|| {
                black_box(map.summarize_by_index(0, n as usize));
                let _: Sum<i32> = map.summarize_by_index(n as usize / 4, 3 * n as usize / 4);
            })
        });
    }
    group.finish();
}

pub fn bench_rank_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("avl_set_at_and_index");
    for &n in &[100, 1_000, 10_000] {
        let set: AvlSet<i32, WithIndex> = {
            let mut s = AvlSet::new();
            for i in 0..n {
                s.insert(i);
            }
            s
        };
        group.bench_with_input(format!("n_{n}"), &n, |b, &n| {
            b.iter(|| {
                for i in 0..n as usize {
                    black_box(set.at(i));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_set_insert,
    bench_set_lookup,
    bench_set_iterate,
    bench_map_summarize_by_index,
    bench_rank_access
);
criterion_main!(benches);
