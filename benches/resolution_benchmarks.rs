//! Benchmarks for call resolution and call execution.
//!
//! - Resolution by name over growing overload sets, cold and through the
//!   cached identity
//! - Entry calls that complete, and calls that suspend and resume
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use std::cell::Cell;
use std::fmt::Write as _;
use std::hint::black_box;

use botscript::prelude::*;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

/// Initialize puffin profiler.
#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `count` overloads of `f`, each taking one more `int` than the last, plus
/// a `double` variant of the single-argument form.
fn overload_source(count: usize) -> String {
    let mut source = String::from("int f(double a) { return 0; }\n");
    for arity in 1..=count {
        let params: Vec<String> = (0..arity).map(|i| format!("int p{i}")).collect();
        let _ = writeln!(source, "int f({}) {{ return {arity}; }}", params.join(", "));
    }
    source
}

fn bench_resolution(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("resolve");

    for count in [4usize, 32, 128] {
        let mut engine = Engine::new();
        let program = engine
            .compile_program("bench", &overload_source(count))
            .expect("bench source compiles");
        let args = [DataType::float()];

        group.bench_with_input(BenchmarkId::new("by_name", count), &count, |b, _| {
            b.iter(|| {
                let cached = Cell::new(None);
                let target = engine.resolve_call(program, "f", black_box(&args), &cached);
                end_profiling_frame();
                black_box(target)
            })
        });

        let cached = Cell::new(None);
        engine
            .resolve_call(program, "f", &args, &cached)
            .expect("f(float) resolves");
        group.bench_with_input(BenchmarkId::new("cached", count), &count, |b, _| {
            b.iter(|| {
                let target = engine.resolve_call(program, "f", black_box(&args), &cached);
                end_profiling_frame();
                black_box(target)
            })
        });
    }
    group.finish();
}

fn bench_calls(c: &mut Criterion) {
    setup_profiler();
    let mut engine = Engine::new();
    let program = engine
        .compile_program(
            "bench",
            "int add(int a, int b) { return a + b; }
             int chain(int n) { return add(n, 1) + add(n, 2) + add(n, 3); }
             int slow(int n) { wait(1); return chain(n); }",
        )
        .expect("bench source compiles");
    let mut stack = engine.new_stack(program);
    let args = [Variable::int(7)];

    c.bench_function("call/complete", |b| {
        b.iter(|| {
            let outcome = engine.call(&mut stack, "chain", black_box(&args));
            end_profiling_frame();
            black_box(outcome)
        })
    });

    c.bench_function("call/suspend_resume", |b| {
        b.iter(|| {
            let suspended = engine.call(&mut stack, "slow", black_box(&args));
            let outcome = engine.resume(&mut stack);
            end_profiling_frame();
            black_box((suspended, outcome))
        })
    });

    c.bench_function("call/snapshot", |b| {
        engine
            .call(&mut stack, "slow", &args)
            .expect("slow starts");
        b.iter(|| {
            let json = stack.to_json().expect("stack serializes");
            black_box(ExecStack::from_json(&json).expect("stack deserializes"))
        });
        engine.abort(&mut stack);
    });
}

criterion_group!(benches, bench_resolution, bench_calls);
criterion_main!(benches);
