//! Memoization over an external key-value store.
//!
//! [`CacheObject`] wraps a store handle with raw get/set/del and a key-function memoizer.
//! [`CacheContext`] owns one namespaced connection with an explicit `open`/`close` lifecycle
//! and memoizes through positional key templates. Both hand out [`Memoized`] functions.

pub mod domain;
pub mod memoize;
pub mod planes;
pub mod ports;

#[cfg(test)]
mod testing;

pub use domain::{KeyFn, KeyStrategy, KeyTemplate, Namespace, TemplateArgs};
pub use memoize::{MemoError, Memoized, WritePolicy};
pub use planes::control::context::CacheContext;
pub use planes::data::cache_object::CacheObject;
pub use planes::data::operation::EntryStore;
pub use ports::{KeyValueStore, StoreConnector};
