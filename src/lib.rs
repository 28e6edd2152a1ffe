pub(crate) mod async_generator;
pub(crate) mod coroutine;
pub(crate) mod error;
pub(crate) mod int64;
pub(crate) mod promise;
pub(crate) mod value;

pub use async_generator::{
    AsyncGenerator, AsyncGeneratorRef, AsyncGeneratorRequest, GeneratorState, async_generator_next, async_generator_return,
    async_generator_throw, new_async_generator,
};
pub use coroutine::{Completion, Control, CoroutineBody, Scope, StepBody, StepFn};
pub use error::RuntimeError;
pub use int64::Int64;
pub use promise::{
    JobQueue, JsPromise, PromiseRef, PromiseState, Reaction, new_promise, on_settled, reject_promise, resolve_promise,
};
pub use value::{IterResult, Value, generate_unique_id, value_to_string};
