use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rlm_translate::glossary::{ConflictResolutionRule, GlossaryManager};

/// Populate a manager with `count` distinct terms, no conflicts.
fn seed_terms(rule: ConflictResolutionRule, count: usize) -> GlossaryManager {
    let mut mgr = GlossaryManager::new(rule);
    for i in 0..count {
        mgr.add_term(&format!("term_{i}"), &format!("target_{i}"), 0.8, &[0], false, false);
    }
    mgr
}

fn bench_add_term_no_conflict(c: &mut Criterion) {
    let mut group = c.benchmark_group("glossary_add_no_conflict");

    for &count in &[10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("terms", count), &count, |b, &count| {
            b.iter(|| {
                let mut mgr = GlossaryManager::new(ConflictResolutionRule::Majority);
                for i in 0..count {
                    mgr.add_term(black_box(&format!("term_{i}")), "target", 0.8, &[0], false, false);
                }
            });
        });
    }
    group.finish();
}

fn bench_add_term_with_conflicts(c: &mut Criterion) {
    let mut group = c.benchmark_group("glossary_add_with_conflicts");

    for rule in [
        ConflictResolutionRule::Majority,
        ConflictResolutionRule::PresetFirst,
        ConflictResolutionRule::DocumentInitial,
        ConflictResolutionRule::MostRecent,
    ] {
        group.bench_with_input(BenchmarkId::new("rule", format!("{rule:?}")), &rule, |b, &rule| {
            b.iter(|| {
                let mut mgr = seed_terms(rule, 200);
                for i in 0..200 {
                    mgr.add_term(black_box(&format!("term_{i}")), "challenger", 0.4, &[1, 2], false, false);
                }
            });
        });
    }
    group.finish();
}

fn bench_glossary_dict_export(c: &mut Criterion) {
    let mgr = seed_terms(ConflictResolutionRule::Majority, 500);

    c.bench_function("glossary_dict_export_500", |b| {
        b.iter(|| black_box(mgr.glossary_dict()));
    });
}

criterion_group!(benches, bench_add_term_no_conflict, bench_add_term_with_conflicts, bench_glossary_dict_export);
criterion_main!(benches);
