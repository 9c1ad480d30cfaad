use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Heap object referenced from a [`Value`].
///
/// Only strings exist today; new object kinds get their own variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Obj {
    String(String),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(_) => "string",
        }
    }
}

impl std::fmt::Display for Obj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Obj::String(s) => write!(f, "{}", s),
        }
    }
}

/// Runtime value.
///
/// Values are the only data that can exist on the VM stack, in the constant
/// pool, or in the globals table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    /// 64-bit floating-point number; the language has no separate integer type.
    Number(f64),
    Obj(Rc<Obj>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Obj(Rc::new(Obj::String(s.into())))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Obj(obj) => obj.type_name(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Obj(obj) if matches!(**obj, Obj::String(_)))
    }

    /// `nil` and `false` are falsey, everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// # Panics
    ///
    /// Panics if the value is not a bool. Callers check the tag first.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => panic!("value conversion error: expected bool, got {}", other.type_name()),
        }
    }

    /// # Panics
    ///
    /// Panics if the value is not a number. Callers check the tag first.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            other => panic!(
                "value conversion error: expected number, got {}",
                other.type_name()
            ),
        }
    }

    /// # Panics
    ///
    /// Panics if the value is not an object. Callers check the tag first.
    pub fn as_obj(&self) -> &Obj {
        match self {
            Value::Obj(obj) => obj,
            other => panic!(
                "value conversion error: expected object, got {}",
                other.type_name()
            ),
        }
    }

    /// # Panics
    ///
    /// Panics if the value is not a string object. Callers check the tag first.
    pub fn as_str(&self) -> &str {
        match self.as_obj() {
            Obj::String(s) => s,
        }
    }
}

/// Equality is only defined between values with the same tag; anything
/// else compares unequal. Numbers follow IEEE-754 (`NaN != NaN`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Obj(obj) => write!(f, "{}", obj),
        }
    }
}
