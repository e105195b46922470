//! Order processing state model.
//!
//! An order in flight *is* the sequence of these values: each stage builds
//! the next state from the previous one and the previous value is dropped.
//! Nothing holds a long-lived mutable order record. Later states are
//! supersets of earlier ones, augmented with the producing stage's results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// A single line item in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
	pub product_id: String,
	pub product_name: String,
	pub price: Decimal,
	pub quantity: u32,
}

/// Shipping destination on file for the ordering user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
	pub street: String,
	pub city: String,
	pub postal_code: String,
	pub country: String,
}

/// Payment instrument chosen by the customer.
///
/// The gateway-specific fields stay opaque to the pipeline; only the kind
/// is interpreted, and only by the payment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
	#[serde(rename = "type")]
	pub kind: PaymentMethodKind,
	pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
	CreditCard,
	Paypal,
	BankTransfer,
}

/// A line item with stock reserved at a concrete warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedItem {
	pub product_id: String,
	pub quantity: u32,
	pub warehouse_id: String,
}

/// Raw checkout request, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInput {
	pub user_id: String,
	pub cart_id: String,
	pub payment_method: PaymentMethod,
}

/// Cart contents verified (existence, ownership, non-emptiness, address on
/// file) and priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedCart {
	pub user_id: String,
	pub cart_items: Vec<CartItem>,
	pub shipping_address: Address,
	pub payment_method: PaymentMethod,
	pub subtotal: Decimal,
}

/// Freight priced; `total_amount` is fixed from here on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedShipping {
	pub user_id: String,
	pub cart_items: Vec<CartItem>,
	pub shipping_address: Address,
	pub payment_method: PaymentMethod,
	pub subtotal: Decimal,
	pub shipping_cost: Decimal,
	pub total_amount: Decimal,
}

/// Charge captured; the order now has a persistent identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedPayment {
	pub user_id: String,
	pub order_id: String,
	pub cart_items: Vec<CartItem>,
	pub shipping_address: Address,
	pub payment_id: String,
	pub total_amount: Decimal,
}

/// Stock reserved for every line item, all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedInventory {
	pub user_id: String,
	pub order_id: String,
	pub cart_items: Vec<CartItem>,
	pub shipping_address: Address,
	pub payment_id: String,
	pub total_amount: Decimal,
	pub allocated_items: Vec<AllocatedItem>,
}

/// Terminal success state: shipment created, order marked, customer
/// notified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOrder {
	pub user_id: String,
	pub order_id: String,
	pub total_amount: Decimal,
	pub estimated_delivery: DateTime<Utc>,
	pub tracking_number: String,
}

/// Terminal failure state, reachable from any stage.
///
/// `order_id` is absent when the failure happened before payment assigned
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedOrder {
	pub user_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	pub error: OrderError,
	pub failed_at: DateTime<Utc>,
}

impl FailedOrder {
	/// Builds the terminal failure state, stamping the failure time.
	pub fn from_error(
		user_id: impl Into<String>,
		order_id: Option<String>,
		error: OrderError,
	) -> Self {
		Self {
			user_id: user_id.into(),
			order_id,
			error,
			failed_at: Utc::now(),
		}
	}
}

/// Union of every position an order can occupy in the pipeline.
///
/// Stage services take the concrete structs, not this enum; the union
/// exists for callers that observe progress or want a single terminal
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OrderProcessingState {
	Input(OrderInput),
	ValidatedCart(ValidatedCart),
	CalculatedShipping(CalculatedShipping),
	ProcessedPayment(ProcessedPayment),
	AllocatedInventory(AllocatedInventory),
	Completed(CompletedOrder),
	Failed(FailedOrder),
}

/// Discriminant of [`OrderProcessingState`], used by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
	Input,
	ValidatedCart,
	CalculatedShipping,
	ProcessedPayment,
	AllocatedInventory,
	Completed,
	Failed,
}

impl OrderProcessingState {
	pub fn kind(&self) -> StateKind {
		match self {
			OrderProcessingState::Input(_) => StateKind::Input,
			OrderProcessingState::ValidatedCart(_) => StateKind::ValidatedCart,
			OrderProcessingState::CalculatedShipping(_) => StateKind::CalculatedShipping,
			OrderProcessingState::ProcessedPayment(_) => StateKind::ProcessedPayment,
			OrderProcessingState::AllocatedInventory(_) => StateKind::AllocatedInventory,
			OrderProcessingState::Completed(_) => StateKind::Completed,
			OrderProcessingState::Failed(_) => StateKind::Failed,
		}
	}

	/// The ordering user, present in every state.
	pub fn user_id(&self) -> &str {
		match self {
			OrderProcessingState::Input(s) => &s.user_id,
			OrderProcessingState::ValidatedCart(s) => &s.user_id,
			OrderProcessingState::CalculatedShipping(s) => &s.user_id,
			OrderProcessingState::ProcessedPayment(s) => &s.user_id,
			OrderProcessingState::AllocatedInventory(s) => &s.user_id,
			OrderProcessingState::Completed(s) => &s.user_id,
			OrderProcessingState::Failed(s) => &s.user_id,
		}
	}

	/// True for states with no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderProcessingState::Completed(_) | OrderProcessingState::Failed(_)
		)
	}
}
