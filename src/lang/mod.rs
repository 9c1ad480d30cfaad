//! # Runtime value model
//!
//! A [`value::Value`] is a tagged union over nil, booleans, numbers and
//! references to heap objects ([`value::Obj`]). Object lifetimes are
//! managed by reference counting only; there is no tracing collector.

pub mod value;

pub use value::{Obj, Value};
