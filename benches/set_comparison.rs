use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;
use std::collections::HashSet as StdHashSet;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashSet as HashbrownHashSet;
use quad_set::HashSet as QuadHashSet;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

/// Fixed-key SipHash so every set under test hashes identically.
#[derive(Clone, Default)]
struct SipBuilder;

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210)
    }
}

trait SetValue: Clone + Hash + Eq {
    fn new(key: u64) -> Self;
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct SmallTestItem {
    key: u64,
}

impl SetValue for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct TestItem {
    key: String,
}

impl SetValue for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
        })
    }
}

const SIZES: &[usize] = &[
    (1 << 4),
    (1 << 6),
    (1 << 8),
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
];

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn random_values<V: SetValue>(count: usize) -> Vec<V> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| V::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn bench_insert_random<V: SetValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("insert_random_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let values = random_values::<V>(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("quad_set/{size}"), |b| {
            b.iter_batched(
                || values.clone(),
                |values| {
                    let mut set = QuadHashSet::with_hasher(SipBuilder);
                    for value in values {
                        black_box(set.insert(value));
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || values.clone(),
                |values| {
                    let mut set = HashbrownHashSet::with_hasher(SipBuilder);
                    for value in values {
                        black_box(set.insert(value));
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter_batched(
                || values.clone(),
                |values| {
                    let mut set = StdHashSet::with_hasher(SipBuilder);
                    for value in values {
                        black_box(set.insert(value));
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<V: SetValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_hit_miss_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let present = random_values::<V>(size);
        let mut probes = present.clone();
        probes.extend(random_values::<V>(size));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let mut quad = QuadHashSet::with_hasher(SipBuilder);
        quad.extend(present.iter().cloned());
        let mut brown = HashbrownHashSet::with_hasher(SipBuilder);
        brown.extend(present.iter().cloned());

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("quad_set/{size}"), |b| {
            b.iter(|| {
                for probe in probes.iter() {
                    black_box(quad.contains(probe));
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for probe in probes.iter() {
                    black_box(brown.contains(probe));
                }
            })
        });
    }

    group.finish();
}

fn bench_churn<V: SetValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        // Every value appears twice: the first sighting inserts, the second
        // removes.
        let mut values = random_values::<V>(size);
        values.extend(values.clone());

        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_function(format!("quad_set/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut values = values.clone();
                    values.shuffle(&mut SmallRng::from_os_rng());
                    values
                },
                |values| {
                    let mut set = QuadHashSet::with_hasher(SipBuilder);
                    for value in values {
                        if set.take(&value).is_none() {
                            set.add_new(value);
                        }
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut values = values.clone();
                    values.shuffle(&mut SmallRng::from_os_rng());
                    values
                },
                |values| {
                    let mut set = HashbrownHashSet::with_hasher(SipBuilder);
                    for value in values {
                        if set.take(&value).is_none() {
                            set.insert(value);
                        }
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_mixed_zipf<V: SetValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("mixed_zipf_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let mut rng = SmallRng::from_os_rng();
        let op_distr = Zipf::new(3.0, 1.0).unwrap();
        let key_distr = Zipf::new(size as f64 * 2.0, 1.0).unwrap();

        let operations = (0..size * 3)
            .map(|_| {
                let op_choice: f64 = rng.sample(op_distr);
                let operation = if op_choice <= 1.0 {
                    Operation::Find
                } else if op_choice <= 2.0 {
                    Operation::Insert
                } else {
                    Operation::Remove
                };
                (operation, V::new(rng.sample(key_distr) as u64))
            })
            .collect::<Vec<(Operation, V)>>();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function(format!("quad_set/{size}"), |b| {
            b.iter_batched(
                || operations.clone(),
                |operations| {
                    let mut set = QuadHashSet::with_hasher(SipBuilder);
                    for (operation, value) in operations {
                        match operation {
                            Operation::Insert => {
                                black_box(set.insert(value));
                            }
                            Operation::Remove => {
                                black_box(set.take(&value));
                            }
                            Operation::Find => {
                                black_box(set.contains(&value));
                            }
                        }
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || operations.clone(),
                |operations| {
                    let mut set = HashbrownHashSet::with_hasher(SipBuilder);
                    for (operation, value) in operations {
                        match operation {
                            Operation::Insert => {
                                black_box(set.insert(value));
                            }
                            Operation::Remove => {
                                black_box(set.take(&value));
                            }
                            Operation::Find => {
                                black_box(set.contains(&value));
                            }
                        }
                    }
                    black_box(set)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<V: SetValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let values = random_values::<V>(size);
        let quad: QuadHashSet<V, SipBuilder> = values.iter().cloned().collect();
        let brown: HashbrownHashSet<V, SipBuilder> = values.iter().cloned().collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("quad_set/{size}"), |b| {
            b.iter(|| {
                for value in quad.iter() {
                    black_box(value);
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for value in brown.iter() {
                    black_box(value);
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 6>,
    bench_insert_random::<TestItem, 5>,
    bench_find_hit_miss::<SmallTestItem, 6>,
    bench_find_hit_miss::<TestItem, 5>,
    bench_churn::<SmallTestItem, 6>,
    bench_churn::<TestItem, 5>,
    bench_mixed_zipf::<SmallTestItem, 6>,
    bench_mixed_zipf::<TestItem, 5>,
    bench_iteration::<SmallTestItem, 6>,
    bench_iteration::<TestItem, 5>,
);

criterion_main!(benches);
