use crate::value::{Value, generate_unique_id, value_to_string};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A single-threaded promise cell. Reactions registered against it are
/// never run inline; settlement schedules them on the job queue so
/// observable ordering always follows microtask ordering.
pub struct JsPromise {
    pub id: usize,
    pub state: PromiseState,
    reactions: Vec<Reaction>,
    /// Whether a reaction has been attached. Used to avoid reporting
    /// unhandled rejections after the promise has been observed.
    pub handled: bool,
    /// Set once resolve/reject has been called, including while an
    /// adopted inner promise is still pending.
    locked: bool,
}

#[derive(Clone, Debug)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

pub type PromiseRef = Rc<RefCell<JsPromise>>;

/// A settlement callback: receives `Ok(value)` on fulfillment and
/// `Err(reason)` on rejection.
pub type Reaction = Box<dyn FnOnce(&JobQueue, Result<Value, Value>)>;

type Job = Box<dyn FnOnce(&JobQueue)>;

pub fn new_promise() -> PromiseRef {
    Rc::new(RefCell::new(JsPromise {
        id: generate_unique_id(),
        state: PromiseState::Pending,
        reactions: Vec::new(),
        handled: false,
        locked: false,
    }))
}

/// The microtask queue. An explicit, locally-scoped object threaded
/// through every operation that can schedule work; `drain` runs queued
/// jobs to a fixed point.
#[derive(Default)]
pub struct JobQueue {
    jobs: RefCell<VecDeque<(usize, Job)>>,
    unhandled: RefCell<Vec<(usize, Value)>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: Job) {
        // Assign a compact job id so enqueue -> run logs can be correlated.
        let job_id = generate_unique_id();
        let mut jobs = self.jobs.borrow_mut();
        jobs.push_back((job_id, job));
        log::trace!("enqueue job {} (queue depth {})", job_id, jobs.len());
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }

    /// Run all currently queued jobs, and any jobs they enqueue, to a
    /// fixed point. Surviving unhandled rejections are reported once the
    /// queue is exhausted.
    pub fn drain(&self) {
        loop {
            let next = self.jobs.borrow_mut().pop_front();
            let Some((job_id, job)) = next else { break };
            log::trace!("run job {}", job_id);
            job(self);
        }
        for (promise_id, reason) in self.unhandled.borrow().iter() {
            log::warn!(
                "Unhandled promise rejection (promise {}): {}",
                promise_id,
                value_to_string(reason)
            );
        }
    }

    /// Take and clear the rejections nothing ever observed. Exposed so
    /// tests can assert on them.
    pub fn take_unhandled_rejections(&self) -> Vec<(usize, Value)> {
        std::mem::take(&mut *self.unhandled.borrow_mut())
    }

    fn record_unhandled(&self, promise_id: usize, reason: Value) {
        self.unhandled.borrow_mut().push((promise_id, reason));
    }

    fn clear_unhandled(&self, promise_id: usize) {
        self.unhandled.borrow_mut().retain(|(id, _)| *id != promise_id);
    }
}

/// Resolve a promise. Resolving with another promise adopts its
/// eventual state: the adoption is itself scheduled as a job, and the
/// outer promise settles only once the inner one does.
pub fn resolve_promise(queue: &JobQueue, promise: &PromiseRef, value: Value) {
    {
        let mut p = promise.borrow_mut();
        if p.locked {
            return;
        }
        p.locked = true;
    }
    if let Value::Promise(inner) = &value {
        if Rc::ptr_eq(inner, promise) {
            settle(queue, promise, Err(crate::raise_type_error!("Chaining cycle detected for promise").into()));
            return;
        }
        let inner = inner.clone();
        let outer = promise.clone();
        queue.enqueue(Box::new(move |q| {
            on_settled(
                q,
                &inner,
                Box::new(move |q, outcome| {
                    settle(q, &outer, outcome);
                }),
            );
        }));
        return;
    }
    settle(queue, promise, Ok(value));
}

pub fn reject_promise(queue: &JobQueue, promise: &PromiseRef, reason: Value) {
    {
        let mut p = promise.borrow_mut();
        if p.locked {
            return;
        }
        p.locked = true;
    }
    settle(queue, promise, Err(reason));
}

fn settle(queue: &JobQueue, promise: &PromiseRef, outcome: Result<Value, Value>) {
    let reactions = {
        let mut p = promise.borrow_mut();
        if !matches!(p.state, PromiseState::Pending) {
            return;
        }
        match &outcome {
            Ok(value) => {
                log::trace!("promise {} fulfilled with {}", p.id, value_to_string(value));
                p.state = PromiseState::Fulfilled(value.clone());
            }
            Err(reason) => {
                log::trace!("promise {} rejected with {}", p.id, value_to_string(reason));
                p.state = PromiseState::Rejected(reason.clone());
                if !p.handled {
                    queue.record_unhandled(p.id, reason.clone());
                }
            }
        }
        std::mem::take(&mut p.reactions)
    };
    for reaction in reactions {
        let outcome = outcome.clone();
        queue.enqueue(Box::new(move |q| reaction(q, outcome)));
    }
}

/// Register a settlement callback. If the promise is already settled the
/// callback still runs from the job queue, never inline.
pub fn on_settled(queue: &JobQueue, promise: &PromiseRef, reaction: Reaction) {
    let mut p = promise.borrow_mut();
    p.handled = true;
    queue.clear_unhandled(p.id);
    match p.state.clone() {
        PromiseState::Pending => p.reactions.push(reaction),
        PromiseState::Fulfilled(value) => {
            queue.enqueue(Box::new(move |q| reaction(q, Ok(value))));
        }
        PromiseState::Rejected(reason) => {
            queue.enqueue(Box::new(move |q| reaction(q, Err(reason))));
        }
    }
}
