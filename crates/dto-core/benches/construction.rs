#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Benchmark contract construction and validation.
//!
//! Measures:
//! - Flat construction with coercion
//! - Nested construction through deferred references
//! - One-of probing when the match is first versus last
//! - Value validation including composite-key merging

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dto_core::{map, Catalog, ContractType, Descriptor, Kind, Map, MergeOptions};

// ============================================================================
// FIXTURES
// ============================================================================

fn person() -> ContractType {
    ContractType::builder("Person")
        .required("name", Kind::text())
        .optional("age", Kind::integer())
        .optional("score", Kind::float())
        .optional("active", Kind::boolean())
        .optional("born", Kind::date())
        .build()
}

fn person_input() -> Map {
    map! {
        "name" => "Alice",
        "age" => "34",
        "score" => "9.5",
        "active" => "yes",
        "born" => "1990-04-01",
    }
}

fn user_catalog() -> (Arc<Catalog>, ContractType) {
    let catalog = Catalog::new();
    catalog.define(
        ContractType::builder("Address")
            .required("city", Kind::text())
            .required("state", Kind::text()),
    );
    let user = catalog.define(
        ContractType::builder("User")
            .required("email", Kind::text())
            .optional("address", Kind::contract("Address")),
    );
    (catalog, user)
}

fn payment(candidates: usize) -> ContractType {
    let mut types: Vec<ContractType> = (0..candidates)
        .map(|i| {
            ContractType::builder(format!("Method{i}"))
                .required(format!("field{i}"), Kind::text())
                .build()
        })
        .collect();
    types.push(
        ContractType::builder("Card")
            .required("number", Kind::text())
            .build(),
    );
    ContractType::builder("Payment")
        .attribute(Descriptor::new("method", Kind::one_of(types)))
        .build()
}

// ============================================================================
// BENCHMARKS
// ============================================================================

fn bench_flat_construction(c: &mut Criterion) {
    let ty = person();
    let input = person_input();
    c.bench_function("construct_flat", |b| {
        b.iter(|| ty.construct(black_box(input.clone())));
    });
}

fn bench_nested_construction(c: &mut Criterion) {
    let (_catalog, user) = user_catalog();
    let input = map! {
        "email" => "a@b.c",
        "address" => map! { "city" => "NYC", "state" => "NY" },
    };
    c.bench_function("construct_nested", |b| {
        b.iter(|| user.construct(black_box(input.clone())));
    });
}

fn bench_one_of_probing(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_of_probing");
    let input = map! { "method" => map! { "number" => "4111" } };

    for misses in &[0_usize, 4, 16] {
        let ty = payment(*misses);
        group.bench_with_input(BenchmarkId::new("candidates_before_match", misses), misses, |b, _| {
            b.iter(|| ty.construct(black_box(input.clone())));
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let (_catalog, user) = user_catalog();
    let contract = user.construct(map! {
        "email" => "a@b.c",
        "address" => map! { "city" => "NYC", "state" => "NY" },
    });
    c.bench_function("schema_validate_nested", |b| {
        b.iter(|| black_box(&contract).schema_validate());
    });
    c.bench_function("value_errors_nested", |b| {
        b.iter(|| black_box(&contract).value_errors());
    });
}

fn bench_mutation(c: &mut Criterion) {
    let contract = person().construct(person_input());
    c.bench_function("clone_with_change", |b| {
        b.iter(|| contract.clone_with(black_box(map! { "age" => 35 })));
    });
    c.bench_function("merge_map", |b| {
        b.iter(|| contract.merge(black_box(map! { "score" => 1.5 }), MergeOptions::default()));
    });
}

criterion_group!(
    benches,
    bench_flat_construction,
    bench_nested_construction,
    bench_one_of_probing,
    bench_validation,
    bench_mutation
);

criterion_main!(benches);
