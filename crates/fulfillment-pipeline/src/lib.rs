//! Orchestration for the order fulfillment pipeline.
//!
//! This crate composes the five stage services from `fulfillment-stages`
//! into one strictly sequential chain, Input through Completed, with the
//! first failing stage short-circuiting the rest. It exposes exactly three
//! entry points on [`OrderPipeline`]: `process_order`,
//! `process_order_with_fallback` and `process_order_with_progress`, plus
//! the transition table and progress mapping used by external monitoring.

pub mod pipeline;
pub mod progress;
pub mod state_machine;

pub use pipeline::{Dependencies, OrderPipeline};
pub use progress::{noop_sink, ProgressSink};
pub use state_machine::{is_valid_transition, state_progress};
