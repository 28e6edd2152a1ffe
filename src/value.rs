use crate::int64::Int64;
use crate::promise::PromiseRef;
use std::rc::Rc;

static UNIQUE_ID_SEED: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

pub fn generate_unique_id() -> usize {
    UNIQUE_ID_SEED.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
}

/// The runtime value domain shared by the promise layer and the
/// coroutine driver.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Boolean(bool),
    Int64(Int64),
    String(String),
    Promise(PromiseRef),
    IterResult(Box<IterResult>),
}

/// The `{value, done}` record every generator request promise settles
/// with.
#[derive(Clone, Debug, PartialEq)]
pub struct IterResult {
    pub value: Value,
    pub done: bool,
}

impl IterResult {
    pub fn new(value: Value, done: bool) -> Self {
        Self { value, done }
    }
}

impl Value {
    pub fn iter_result(value: Value, done: bool) -> Value {
        Value::IterResult(Box::new(IterResult::new(value, done)))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_promise(&self) -> Option<&PromiseRef> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Promises compare by cell identity.
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::IterResult(a), Value::IterResult(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}n", i),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Promise(p) => write!(f, "Promise#{}", p.borrow().id),
            Value::IterResult(r) => {
                write!(f, "{{ value: {:?}, done: {} }}", r.value, r.done)
            }
        }
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Int64(i) => i.to_string(),
        Value::String(s) => s.clone(),
        Value::Promise(p) => format!("Promise#{}", p.borrow().id),
        Value::IterResult(r) => {
            format!("{{ value: {}, done: {} }}", value_to_string(&r.value), r.done)
        }
    }
}

// Errors surface to promise consumers as thrown values.
impl From<crate::RuntimeError> for Value {
    fn from(err: crate::RuntimeError) -> Self {
        Value::String(err.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(Int64::new(v))
    }
}

impl From<Int64> for Value {
    fn from(v: Int64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
