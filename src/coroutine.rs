use crate::value::Value;
use indexmap::IndexMap;

/// What the driver injects at a suspension point when it resumes a
/// coroutine body: the settled resume value, an error thrown into the
/// body, or a forced return delivered by `return()`.
#[derive(Clone, Debug)]
pub enum Completion {
    Normal(Value),
    Thrown(Value),
    Return(Value),
}

/// What one resumption step of a body produces: suspend at a yield,
/// complete with a return value, or complete abruptly with an error.
#[derive(Clone, Debug)]
pub enum Control {
    Yield(Value),
    Done(Value),
    Fail(Value),
}

/// A suspendable computation. Each `resume` call drives the body from
/// its last suspension point to the next yield, return or throw. The
/// body keeps its own resume point; the driver never inspects it.
pub trait CoroutineBody {
    fn resume(&mut self, input: Completion) -> Control;
}

/// Named local-variable slots for a body, insertion-ordered. Reading an
/// unset slot yields `Undefined`.
#[derive(Default)]
pub struct Scope {
    slots: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Value {
        self.slots.get(name).cloned().unwrap_or(Value::Undefined)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.slots.insert(name.to_string(), value);
    }
}

pub type StepFn = Box<dyn FnMut(&mut Scope, Completion) -> Control>;

/// A body expressed as a list of step closures plus a resume index.
/// Each step covers the code from one suspension point to the next;
/// resuming runs the step at the current index and advances.
#[derive(Default)]
pub struct StepBody {
    steps: Vec<StepFn>,
    pc: usize,
    scope: Scope,
}

impl StepBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step that only runs on a normal resumption. Abrupt
    /// completions propagate without entering the closure: a thrown
    /// completion fails the body, a return completion completes it.
    pub fn step(mut self, mut f: impl FnMut(&mut Scope, Value) -> Control + 'static) -> Self {
        self.steps.push(Box::new(move |scope, input| match input {
            Completion::Normal(value) => f(scope, value),
            Completion::Thrown(error) => Control::Fail(error),
            Completion::Return(value) => Control::Done(value),
        }));
        self
    }

    /// Append a step that sees the raw completion. Used for protected
    /// regions (try/catch/finally) that intercept thrown or return
    /// completions and run cleanup before, or instead of, propagating.
    pub fn protected_step(mut self, f: impl FnMut(&mut Scope, Completion) -> Control + 'static) -> Self {
        self.steps.push(Box::new(f));
        self
    }
}

impl CoroutineBody for StepBody {
    fn resume(&mut self, input: Completion) -> Control {
        if self.pc >= self.steps.len() {
            // Resumed past the last step: fall off the end of the body.
            return match input {
                Completion::Normal(_) => Control::Done(Value::Undefined),
                Completion::Thrown(error) => Control::Fail(error),
                Completion::Return(value) => Control::Done(value),
            };
        }
        let index = self.pc;
        self.pc += 1;
        let control = (self.steps[index])(&mut self.scope, input);
        if matches!(control, Control::Done(_) | Control::Fail(_)) {
            self.pc = self.steps.len();
        }
        control
    }
}
