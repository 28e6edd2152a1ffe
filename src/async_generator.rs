use crate::coroutine::{Completion, Control, CoroutineBody};
use crate::promise::{JobQueue, PromiseRef, new_promise, on_settled, reject_promise, resolve_promise};
use crate::value::{Value, generate_unique_id, value_to_string};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One call to `next`/`return`/`throw`, queued until the generator can
/// service it.
#[derive(Clone, Debug)]
pub enum AsyncGeneratorRequest {
    Next(Value),
    Return(Value),
    Throw(Value),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorState {
    NotStarted,
    Running,
    /// Parked at a yield, waiting for the next request.
    SuspendedYield,
    /// A yielded promise has not settled; the driving request stays
    /// unresolved and the queue is blocked behind it.
    AwaitingYieldOperand,
    /// A promise-valued resume argument has not settled.
    AwaitingResumeValue,
    /// A promise-valued return argument has not settled.
    AwaitingReturnValue,
    Completed,
    Errored,
}

impl GeneratorState {
    /// Whether a request is currently driving the body. While true, newly
    /// issued requests only queue; the queue drains when the in-flight
    /// request finishes.
    fn is_in_flight(self) -> bool {
        matches!(
            self,
            GeneratorState::Running
                | GeneratorState::AwaitingYieldOperand
                | GeneratorState::AwaitingResumeValue
                | GeneratorState::AwaitingReturnValue
        )
    }
}

pub struct AsyncGenerator {
    pub id: usize,
    pub state: GeneratorState,
    body: Box<dyn CoroutineBody>,
    pending: VecDeque<(PromiseRef, AsyncGeneratorRequest)>,
}

pub type AsyncGeneratorRef = Rc<RefCell<AsyncGenerator>>;

pub fn new_async_generator(body: impl CoroutineBody + 'static) -> AsyncGeneratorRef {
    Rc::new(RefCell::new(AsyncGenerator {
        id: generate_unique_id(),
        state: GeneratorState::NotStarted,
        body: Box::new(body),
        pending: VecDeque::new(),
    }))
}

/// Request the next value. Returns a promise for the `{value, done}`
/// record. Requests are serviced strictly in issue order.
pub fn async_generator_next(queue: &JobQueue, generator: &AsyncGeneratorRef, value: Value) -> PromiseRef {
    enqueue_request(queue, generator, AsyncGeneratorRequest::Next(value))
}

/// Force the generator toward completion with `value` as its return
/// value, unwinding any protected region the body is parked in.
pub fn async_generator_return(queue: &JobQueue, generator: &AsyncGeneratorRef, value: Value) -> PromiseRef {
    enqueue_request(queue, generator, AsyncGeneratorRequest::Return(value))
}

/// Throw `error` at the current suspension point, as if the parked yield
/// expression itself threw.
pub fn async_generator_throw(queue: &JobQueue, generator: &AsyncGeneratorRef, error: Value) -> PromiseRef {
    enqueue_request(queue, generator, AsyncGeneratorRequest::Throw(error))
}

fn enqueue_request(queue: &JobQueue, generator: &AsyncGeneratorRef, request: AsyncGeneratorRequest) -> PromiseRef {
    let promise = new_promise();
    {
        let mut generator = generator.borrow_mut();
        log::trace!(
            "generator {}: enqueue {:?} (queue depth {})",
            generator.id,
            request,
            generator.pending.len() + 1
        );
        generator.pending.push_back((promise.clone(), request));
    }
    pump(queue, generator);
    promise
}

// Service queued requests until the generator suspends mid-request or
// the queue is empty.
fn pump(queue: &JobQueue, generator: &AsyncGeneratorRef) {
    loop {
        let entry = {
            let mut g = generator.borrow_mut();
            if g.state.is_in_flight() {
                return;
            }
            match g.pending.pop_front() {
                Some(entry) => entry,
                None => return,
            }
        };
        let (promise, request) = entry;
        service_request(queue, generator, promise, request);
    }
}

fn service_request(queue: &JobQueue, generator: &AsyncGeneratorRef, promise: PromiseRef, request: AsyncGeneratorRequest) {
    let state = generator.borrow().state;
    match (state, request) {
        // Terminal: next/return settle trivially, throw surfaces as a
        // rejection.
        (GeneratorState::Completed | GeneratorState::Errored, AsyncGeneratorRequest::Next(_) | AsyncGeneratorRequest::Return(_)) => {
            fulfill_iter_result(queue, &promise, Value::Undefined, true);
        }
        (GeneratorState::Completed | GeneratorState::Errored, AsyncGeneratorRequest::Throw(error)) => {
            reject_promise(queue, &promise, error);
        }

        (GeneratorState::NotStarted, AsyncGeneratorRequest::Next(value)) => {
            // The first resume value has no yield to substitute into;
            // bodies conventionally ignore it.
            resume_body(queue, generator, promise, Completion::Normal(value), false);
        }
        (GeneratorState::NotStarted, AsyncGeneratorRequest::Return(value)) => {
            if let Some(awaited) = value.as_promise().cloned() {
                generator.borrow_mut().state = GeneratorState::AwaitingReturnValue;
                let generator = generator.clone();
                on_settled(
                    queue,
                    &awaited,
                    Box::new(move |q, outcome| {
                        match outcome {
                            Ok(value) => complete_forced(q, &generator, &promise, value),
                            Err(reason) => complete_errored(q, &generator, &promise, reason),
                        }
                        pump(q, &generator);
                    }),
                );
            } else {
                complete_forced(queue, generator, &promise, value);
            }
        }
        (GeneratorState::NotStarted, AsyncGeneratorRequest::Throw(error)) => {
            complete_errored(queue, generator, &promise, error);
        }

        (GeneratorState::SuspendedYield, AsyncGeneratorRequest::Next(value)) => {
            if let Some(awaited) = value.as_promise().cloned() {
                // Implicit await of the resume value before it is
                // substituted for the parked yield expression.
                generator.borrow_mut().state = GeneratorState::AwaitingResumeValue;
                let generator = generator.clone();
                on_settled(
                    queue,
                    &awaited,
                    Box::new(move |q, outcome| {
                        let completion = match outcome {
                            Ok(value) => Completion::Normal(value),
                            Err(reason) => Completion::Thrown(reason),
                        };
                        resume_body(q, &generator, promise, completion, false);
                        pump(q, &generator);
                    }),
                );
            } else {
                resume_body(queue, generator, promise, Completion::Normal(value), false);
            }
        }
        (GeneratorState::SuspendedYield, AsyncGeneratorRequest::Throw(error)) => {
            resume_body(queue, generator, promise, Completion::Thrown(error), false);
        }
        (GeneratorState::SuspendedYield, AsyncGeneratorRequest::Return(value)) => {
            if let Some(awaited) = value.as_promise().cloned() {
                generator.borrow_mut().state = GeneratorState::AwaitingReturnValue;
                let generator = generator.clone();
                on_settled(
                    queue,
                    &awaited,
                    Box::new(move |q, outcome| {
                        match outcome {
                            Ok(value) => resume_body(q, &generator, promise, Completion::Return(value), true),
                            Err(reason) => resume_body(q, &generator, promise, Completion::Thrown(reason), false),
                        }
                        pump(q, &generator);
                    }),
                );
            } else {
                resume_body(queue, generator, promise, Completion::Return(value), true);
            }
        }

        // Unreachable while the pump gates on in-flight states.
        (_, _) => {
            reject_promise(queue, &promise, Value::String("Async generator already running".to_string()));
        }
    }
}

// Drive the body one resumption step and apply the resulting control.
// `forced_return` records that the injected completion came from a
// `return()` request, which changes how a resulting completion drains
// the queue.
fn resume_body(queue: &JobQueue, generator: &AsyncGeneratorRef, promise: PromiseRef, input: Completion, forced_return: bool) {
    let control = {
        let mut g = generator.borrow_mut();
        log::trace!("generator {}: resume with {:?}", g.id, input);
        g.state = GeneratorState::Running;
        g.body.resume(input)
    };
    handle_control(queue, generator, promise, control, forced_return);
}

fn handle_control(queue: &JobQueue, generator: &AsyncGeneratorRef, promise: PromiseRef, control: Control, forced_return: bool) {
    match control {
        Control::Yield(value) => {
            if let Some(awaited) = value.as_promise().cloned() {
                // The yield operand is awaited before the yield becomes
                // visible; the driving request stays unresolved until the
                // operand settles.
                generator.borrow_mut().state = GeneratorState::AwaitingYieldOperand;
                let generator = generator.clone();
                on_settled(
                    queue,
                    &awaited,
                    Box::new(move |q, outcome| {
                        match outcome {
                            Ok(value) => {
                                generator.borrow_mut().state = GeneratorState::SuspendedYield;
                                fulfill_iter_result(q, &promise, value, false);
                            }
                            Err(reason) => {
                                // A rejected operand throws at the yield
                                // point; the same request keeps driving.
                                resume_body(q, &generator, promise, Completion::Thrown(reason), false);
                            }
                        }
                        pump(q, &generator);
                    }),
                );
            } else {
                generator.borrow_mut().state = GeneratorState::SuspendedYield;
                fulfill_iter_result(queue, &promise, value, false);
            }
        }
        Control::Done(value) => {
            if forced_return {
                complete_forced(queue, generator, &promise, value);
            } else {
                let mut g = generator.borrow_mut();
                g.state = GeneratorState::Completed;
                log::debug!("generator {}: completed with {}", g.id, value_to_string(&value));
                drop(g);
                fulfill_iter_result(queue, &promise, value, true);
            }
        }
        Control::Fail(error) => {
            complete_errored(queue, generator, &promise, error);
        }
    }
}

// Forced completion via `return()`: the driving request resolves with
// the return value, and requests already queued behind it settle without
// re-entering the body. Queued `next` calls observe the forced return
// value.
fn complete_forced(queue: &JobQueue, generator: &AsyncGeneratorRef, promise: &PromiseRef, value: Value) {
    let drained = {
        let mut g = generator.borrow_mut();
        g.state = GeneratorState::Completed;
        log::debug!("generator {}: closed via return with {}", g.id, value_to_string(&value));
        g.pending.drain(..).collect::<Vec<_>>()
    };
    fulfill_iter_result(queue, promise, value.clone(), true);
    for (queued_promise, request) in drained {
        match request {
            AsyncGeneratorRequest::Next(_) => fulfill_iter_result(queue, &queued_promise, value.clone(), true),
            AsyncGeneratorRequest::Return(v) => fulfill_iter_result(queue, &queued_promise, v, true),
            AsyncGeneratorRequest::Throw(error) => reject_promise(queue, &queued_promise, error),
        }
    }
}

// Error completion: the driving request rejects, and every request
// already queued behind it settles trivially. A queued throw's error is
// dropped rather than re-surfaced.
fn complete_errored(queue: &JobQueue, generator: &AsyncGeneratorRef, promise: &PromiseRef, error: Value) {
    let drained = {
        let mut g = generator.borrow_mut();
        g.state = GeneratorState::Errored;
        log::debug!("generator {}: errored with {}", g.id, value_to_string(&error));
        g.pending.drain(..).collect::<Vec<_>>()
    };
    reject_promise(queue, promise, error);
    for (queued_promise, _request) in drained {
        fulfill_iter_result(queue, &queued_promise, Value::Undefined, true);
    }
}

fn fulfill_iter_result(queue: &JobQueue, promise: &PromiseRef, value: Value, done: bool) {
    resolve_promise(queue, promise, Value::iter_result(value, done));
}
