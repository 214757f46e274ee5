//! Pipeline benchmarks over representative grammars.
//!
//! Run with:
//! ```bash
//! cargo bench --bench pipeline
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strapprox_rs::approximate_to_pattern;
use strapprox_rs::parser::parse_grammar;

const NEDERHOF: &str = "S -> Aa\nA -> SB | Bb\nB -> Bc | d\n";
const BOTH_RECURSIVE: &str = "S -> TS | a\nT -> SP\nP -> +\n";
const REPLACE_HEAVY: &str = "A -> B | replace[f,x](B)\nB -> C | replace[a,b](C)\nC -> fC | aC | f | a\n";

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for (name, grammar) in [
        ("nederhof", NEDERHOF),
        ("both_recursive", BOTH_RECURSIVE),
        ("replace_heavy", REPLACE_HEAVY),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut g = parse_grammar(black_box(grammar)).unwrap();
                approximate_to_pattern(&mut g).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_nederhof", |b| {
        b.iter(|| parse_grammar(black_box(NEDERHOF)).unwrap())
    });
}

criterion_group!(benches, bench_pipeline, bench_parse);
criterion_main!(benches);
