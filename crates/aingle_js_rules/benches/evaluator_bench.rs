//! Benchmarks for aingle_js_rules
//!
//! Run with: cargo bench -p aingle_js_rules

use aingle_js_rules::{
    Dataset, NativeRuntime, Node, ResultDecoder, RuleEngine, ScriptRule, ScriptValue,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn tagging_runtime() -> NativeRuntime {
    NativeRuntime::new().with_function("tag", |frame, _| {
        let this = frame.this().cloned().unwrap_or_else(|| Node::blank("none"));
        Ok(ScriptValue::Array(vec![
            ScriptValue::triple(this.clone(), Node::iri("urn:bench:tagged"), Node::boolean(true)),
            ScriptValue::labeled_triple(this, Node::iri("urn:bench:rank"), 1i64),
        ]))
    })
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for size in [10, 100, 1000].iter() {
        let focus: Vec<Node> = (0..*size)
            .map(|i| Node::iri(format!("urn:bench:node:{}", i)))
            .collect();

        group.bench_with_input(BenchmarkId::new("fresh_contexts", size), &focus, |b, focus| {
            let mut engine = RuleEngine::new(Dataset::memory(), Arc::new(tagging_runtime()));
            engine.add_rule(ScriptRule::new("tag", "tag"));
            b.iter(|| {
                engine.execute(black_box(focus)).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("shared_context", size), &focus, |b, focus| {
            let mut engine = RuleEngine::new(Dataset::memory(), Arc::new(tagging_runtime()));
            engine.add_rule(ScriptRule::new("tag", "tag"));
            let _outer = engine.scripting().enter().unwrap();
            b.iter(|| {
                engine.execute(black_box(focus)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let decoder = ResultDecoder::new();
    let mut group = c.benchmark_group("decode");

    for size in [10, 1000].iter() {
        let positional = ScriptValue::Array(
            (0..*size)
                .map(|i| {
                    ScriptValue::triple(
                        Node::iri(format!("urn:s:{}", i)),
                        Node::iri("urn:p"),
                        i as i64,
                    )
                })
                .collect(),
        );
        let labeled = ScriptValue::Array(
            (0..*size)
                .map(|i| {
                    ScriptValue::labeled_triple(
                        Node::iri(format!("urn:s:{}", i)),
                        Node::iri("urn:p"),
                        i as i64,
                    )
                })
                .collect(),
        );

        group.bench_with_input(BenchmarkId::new("positional", size), &positional, |b, v| {
            b.iter(|| decoder.decode_each(black_box(v), |t| drop(black_box(t))).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("labeled", size), &labeled, |b, v| {
            b.iter(|| decoder.decode_each(black_box(v), |t| drop(black_box(t))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execute, bench_decode);
criterion_main!(benches);
