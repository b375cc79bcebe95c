//! # Herald Demo
//!
//! Sample application: a greeter, a cached user count and an idempotent
//! wallet credit, dispatched through Herald.

pub mod app;
pub mod handlers;

pub use app::{DemoApp, DemoReport};
