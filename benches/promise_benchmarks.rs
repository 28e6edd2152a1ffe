use asyncgen::{
    Control, JobQueue, StepBody, Value, async_generator_next, new_async_generator, new_promise, on_settled, resolve_promise,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// Benchmarks for the promise/job-queue plumbing and the async generator
// driver built on top of it.

// Initialize logger for benchmark so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

fn bench_resolve_and_drain(c: &mut Criterion) {
    c.bench_function("promise_resolve_drain", |b| {
        b.iter(|| {
            let queue = JobQueue::new();
            let promise = new_promise();
            on_settled(&queue, &promise, Box::new(|_q, outcome| {
                let _ = black_box(outcome);
            }));
            resolve_promise(&queue, &promise, Value::from(1i64));
            queue.drain();
        })
    });
}

fn bench_adoption_chain(c: &mut Criterion) {
    c.bench_function("promise_adoption_chain_16", |b| {
        b.iter(|| {
            let queue = JobQueue::new();
            let root = new_promise();
            let mut tail = root.clone();
            for _ in 0..16 {
                let link = new_promise();
                resolve_promise(&queue, &link, Value::Promise(tail.clone()));
                tail = link;
            }
            on_settled(&queue, &tail, Box::new(|_q, outcome| {
                let _ = black_box(outcome);
            }));
            resolve_promise(&queue, &root, Value::from(1i64));
            queue.drain();
        })
    });
}

fn bench_generator_pump(c: &mut Criterion) {
    c.bench_function("async_generator_pump_64", |b| {
        b.iter(|| {
            let queue = JobQueue::new();
            let mut body = StepBody::new();
            for i in 0..64i64 {
                body = body.step(move |_scope, _input| Control::Yield(Value::from(i)));
            }
            let generator = new_async_generator(body.step(|_scope, _input| Control::Done(Value::Undefined)));
            for _ in 0..65 {
                let _ = black_box(async_generator_next(&queue, &generator, Value::Undefined));
            }
            queue.drain();
        })
    });
}

criterion_group!(benches, bench_resolve_and_drain, bench_adoption_chain, bench_generator_pump);
criterion_main!(benches);
