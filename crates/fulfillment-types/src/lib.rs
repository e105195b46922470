//! Shared types for the order fulfillment pipeline.
//!
//! This crate defines the state model the pipeline moves an order through
//! and the closed error taxonomy every stage failure maps into. Each stage
//! consumes exactly one state struct and produces the next one, so the
//! compiler rejects running a stage against the wrong input.

pub mod error;
pub mod state;

pub use error::OrderError;
pub use state::{
	Address, AllocatedInventory, AllocatedItem, CalculatedShipping, CartItem, CompletedOrder,
	FailedOrder, OrderInput, OrderProcessingState, PaymentMethod, PaymentMethodKind,
	ProcessedPayment, StateKind, ValidatedCart,
};
