use asyncgen::{
    Completion, Control, GeneratorState, IterResult, JobQueue, PromiseRef, StepBody, Value, async_generator_next,
    async_generator_return, new_async_generator, new_promise, on_settled, reject_promise, resolve_promise,
};
use std::cell::RefCell;
use std::rc::Rc;

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

type SettlementLog = Rc<RefCell<Vec<Result<IterResult, Value>>>>;

fn new_log() -> SettlementLog {
    Rc::new(RefCell::new(Vec::new()))
}

fn record(queue: &JobQueue, promise: &PromiseRef, log: &SettlementLog) {
    let log = log.clone();
    on_settled(
        queue,
        promise,
        Box::new(move |_q, outcome| {
            log.borrow_mut().push(match outcome {
                Ok(Value::IterResult(result)) => Ok(*result),
                Ok(other) => panic!("request settled with a non-iterator result: {:?}", other),
                Err(reason) => Err(reason),
            });
        }),
    );
}

#[test]
fn test_return_before_start_closes_the_generator() {
    let queue = JobQueue::new();
    let started = Rc::new(RefCell::new(false));
    let body = {
        let started = started.clone();
        StepBody::new().step(move |_scope, _input| {
            *started.borrow_mut() = true;
            Control::Yield(Value::from(1i64))
        })
    };
    let generator = new_async_generator(body);
    let log = new_log();
    record(&queue, &async_generator_return(&queue, &generator, Value::from("early")), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    queue.drain();

    assert!(!*started.borrow(), "the body must never run");
    let log = log.borrow();
    assert_eq!(log[0], Ok(IterResult::new(Value::from("early"), true)));
    // Issued after the terminal state was reached.
    assert_eq!(log[1], Ok(IterResult::new(Value::Undefined, true)));
}

#[test]
fn test_return_at_yield_completes_with_the_given_value() {
    let queue = JobQueue::new();
    let generator = new_async_generator(
        StepBody::new()
            .step(|_scope, _input| Control::Yield(Value::from("first")))
            .step(|_scope, _input| Control::Yield(Value::from("second"))),
    );
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_return(&queue, &generator, Value::from("stop")), &log);
    queue.drain();

    let log = log.borrow();
    assert_eq!(log[0], Ok(IterResult::new(Value::from("first"), false)));
    assert_eq!(log[1], Ok(IterResult::new(Value::from("stop"), true)));
    assert_eq!(generator.borrow().state, GeneratorState::Completed);
}

#[test]
fn test_return_while_awaiting_drains_queued_requests_with_its_value() {
    let queue = JobQueue::new();
    let holder = new_promise();
    let body = {
        let holder = holder.clone();
        StepBody::new()
            .step(move |_scope, _input| Control::Yield(Value::Promise(holder.clone())))
            .step(|_scope, resumed| Control::Done(resumed))
    };
    let generator = new_async_generator(body);
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_return(&queue, &generator, Value::from("x")), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    queue.drain();

    // The return is queued behind the in-flight await; nothing settles
    // until the awaited promise does.
    assert_eq!(log.borrow().len(), 0);

    resolve_promise(&queue, &holder, Value::from("y"));
    queue.drain();

    let log = log.borrow();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0], Ok(IterResult::new(Value::from("y"), false)));
    assert_eq!(log[1], Ok(IterResult::new(Value::from("x"), true)));
    // The queued next() calls observe the forced return value instead of
    // driving the body further.
    assert_eq!(log[2], Ok(IterResult::new(Value::from("x"), true)));
    assert_eq!(log[3], Ok(IterResult::new(Value::from("x"), true)));
}

#[test]
fn test_return_with_promise_argument_is_awaited() {
    let queue = JobQueue::new();
    let generator = new_async_generator(
        StepBody::new()
            .step(|_scope, _input| Control::Yield(Value::from("first")))
            .step(|_scope, _input| Control::Yield(Value::from("second"))),
    );
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    let holder = new_promise();
    record(&queue, &async_generator_return(&queue, &generator, Value::Promise(holder.clone())), &log);
    queue.drain();

    assert_eq!(log.borrow().len(), 1);
    assert_eq!(generator.borrow().state, GeneratorState::AwaitingReturnValue);

    resolve_promise(&queue, &holder, Value::from("rv"));
    queue.drain();
    assert_eq!(log.borrow()[1], Ok(IterResult::new(Value::from("rv"), true)));
    assert_eq!(generator.borrow().state, GeneratorState::Completed);
}

#[test]
fn test_rejected_return_argument_errors_the_generator() {
    let queue = JobQueue::new();
    let generator = new_async_generator(
        StepBody::new()
            .step(|_scope, _input| Control::Yield(Value::from("first")))
            .step(|_scope, _input| Control::Yield(Value::from("second"))),
    );
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    let holder = new_promise();
    record(&queue, &async_generator_return(&queue, &generator, Value::Promise(holder.clone())), &log);
    reject_promise(&queue, &holder, Value::from("bad return"));
    queue.drain();

    let log = log.borrow();
    assert_eq!(log[1], Err(Value::from("bad return")));
    assert_eq!(generator.borrow().state, GeneratorState::Errored);
}

#[test]
fn test_return_runs_finally_cleanup() {
    let queue = JobQueue::new();
    let cleaned_up: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let body = {
        let cleaned_up = cleaned_up.clone();
        StepBody::new()
            .step(|_scope, _input| Control::Yield(Value::from("in try")))
            .protected_step(move |_scope, completion| match completion {
                Completion::Return(value) => {
                    cleaned_up.borrow_mut().push("finally");
                    Control::Done(value)
                }
                Completion::Normal(_) => Control::Yield(Value::from("after try")),
                Completion::Thrown(error) => {
                    cleaned_up.borrow_mut().push("finally");
                    Control::Fail(error)
                }
            })
    };
    let generator = new_async_generator(body);
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_return(&queue, &generator, Value::from("bye")), &log);
    queue.drain();

    assert_eq!(*cleaned_up.borrow(), vec!["finally"]);
    let log = log.borrow();
    assert_eq!(log[0], Ok(IterResult::new(Value::from("in try"), false)));
    assert_eq!(log[1], Ok(IterResult::new(Value::from("bye"), true)));
}

#[test]
fn test_yield_inside_finally_keeps_the_generator_alive() {
    let queue = JobQueue::new();
    let body = StepBody::new()
        .step(|_scope, _input| Control::Yield(Value::from("in try")))
        .protected_step(|scope, completion| match completion {
            Completion::Return(value) => {
                scope.set("pending_return", value);
                Control::Yield(Value::from("from finally"))
            }
            Completion::Normal(_) => Control::Yield(Value::from("after try")),
            Completion::Thrown(error) => Control::Fail(error),
        })
        .step(|scope, _input| Control::Done(scope.get("pending_return")));
    let generator = new_async_generator(body);
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_return(&queue, &generator, Value::from("deferred")), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    queue.drain();

    let log = log.borrow();
    // The return request surfaces the finally-block yield; completion
    // happens on the later resume with the remembered return value.
    assert_eq!(log[0], Ok(IterResult::new(Value::from("in try"), false)));
    assert_eq!(log[1], Ok(IterResult::new(Value::from("from finally"), false)));
    assert_eq!(log[2], Ok(IterResult::new(Value::from("deferred"), true)));
    assert_eq!(generator.borrow().state, GeneratorState::Completed);
}

#[test]
fn test_return_after_completion_settles_trivially() {
    let queue = JobQueue::new();
    let generator = new_async_generator(StepBody::new().step(|_scope, _input| Control::Done(Value::from("done"))));
    let log = new_log();
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    queue.drain();
    record(&queue, &async_generator_return(&queue, &generator, Value::from("late")), &log);
    queue.drain();

    let log = log.borrow();
    assert_eq!(log[0], Ok(IterResult::new(Value::from("done"), true)));
    assert_eq!(log[1], Ok(IterResult::new(Value::Undefined, true)));
}

#[test]
fn test_return_before_start_with_queued_requests_drains_them() {
    let queue = JobQueue::new();
    let generator = new_async_generator(StepBody::new().step(|_scope, _input| Control::Yield(Value::from(1i64))));
    let log = new_log();
    let holder = new_promise();
    record(&queue, &async_generator_return(&queue, &generator, Value::Promise(holder.clone())), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    record(&queue, &async_generator_next(&queue, &generator, Value::Undefined), &log);
    queue.drain();
    assert_eq!(log.borrow().len(), 0);

    resolve_promise(&queue, &holder, Value::from("x"));
    queue.drain();

    let log = log.borrow();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], Ok(IterResult::new(Value::from("x"), true)));
    assert_eq!(log[1], Ok(IterResult::new(Value::from("x"), true)));
    assert_eq!(log[2], Ok(IterResult::new(Value::from("x"), true)));
}
