use criterion::{Criterion, black_box, criterion_group, criterion_main};
use zwerg::builtins::demo::demo_vocabulary;
use zwerg::{Query, Stack};

/// Runs a compiled query to exhaustion and returns how many result stacks it
/// produced, so the benchmarked closure has an observable side effect for
/// `black_box` to pin.
fn run_to_completion(query: &Query) -> usize {
    query.start(Stack::new()).count()
}

/// A single non-foldable division chain, run once per iteration.
const DIVIDE_CHAIN: &str = "1000000 7 div 7 div 7 div";

/// A pathological transitive closure: every seed reachable by repeated
/// negation is exactly the seed and its negation, so `Closure*` here
/// measures the dedup bookkeeping rather than runaway expansion.
const NEG_STAR: &str = "12345 neg*";

/// A thousand-deep chain of individual `add` calls, one push-and-add per
/// step so the engine actually walks the pipeline a thousand times rather
/// than folding a single literal.
fn add_chain_1000() -> String {
    let mut src = String::from("0");
    for _ in 0..1000 {
        src.push_str(" 1 add");
    }
    src
}

fn criterion_benchmark(c: &mut Criterion) {
    let voc = demo_vocabulary();

    let divide_chain = Query::compile(DIVIDE_CHAIN, &voc).unwrap();
    c.bench_function("divide_chain", |b| {
        b.iter(|| black_box(run_to_completion(&divide_chain)));
    });

    let neg_star = Query::compile(NEG_STAR, &voc).unwrap();
    c.bench_function("neg_star", |b| {
        b.iter(|| black_box(run_to_completion(&neg_star)));
    });

    let add_chain = Query::compile(&add_chain_1000(), &voc).unwrap();
    c.bench_function("add_chain_1000", |b| {
        b.iter(|| black_box(run_to_completion(&add_chain)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
