//! The closed error taxonomy for order processing.
//!
//! Every failure a stage can surface maps to exactly one of these variants,
//! each carrying only the context needed to render or act on it. The
//! orchestrator never inspects these values; it only short-circuits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while an order moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderError {
	/// The referenced cart does not exist.
	#[error("cart not found: {cart_id}")]
	CartNotFound { cart_id: String },
	/// The cart exists but cannot be checked out as-is.
	#[error("invalid cart: {reason}")]
	InvalidCart { reason: String },
	/// The payment gateway failed or declined the charge.
	#[error("payment failed: {reason}")]
	PaymentFailed {
		reason: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		payment_id: Option<String>,
	},
	/// A line item requested more stock than is on hand.
	#[error("insufficient inventory for {product_id}: requested {requested}, available {available}")]
	InsufficientInventory {
		product_id: String,
		requested: u32,
		available: u32,
	},
	/// The shipping collaborator could not price the shipment.
	#[error("shipping calculation failed: {reason}")]
	ShippingCalculationFailed { reason: String },
	/// A collaborator failure with no more specific classification.
	#[error("unexpected error: {message}")]
	#[serde(rename = "UnknownError")]
	Unknown { message: String },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_inventory_context_in_message() {
		let error = OrderError::InsufficientInventory {
			product_id: "prod1".to_string(),
			requested: 3,
			available: 1,
		};
		assert_eq!(
			error.to_string(),
			"insufficient inventory for prod1: requested 3, available 1"
		);
	}

	#[test]
	fn serializes_with_type_tag() {
		let error = OrderError::CartNotFound {
			cart_id: "cart456".to_string(),
		};
		let value = serde_json::to_value(&error).unwrap();
		assert_eq!(value["type"], "CartNotFound");
		assert_eq!(value["cart_id"], "cart456");
	}

	#[test]
	fn unknown_keeps_its_wire_name() {
		let error = OrderError::Unknown {
			message: "boom".to_string(),
		};
		let value = serde_json::to_value(&error).unwrap();
		assert_eq!(value["type"], "UnknownError");
	}

	#[test]
	fn payment_failure_omits_absent_payment_id() {
		let error = OrderError::PaymentFailed {
			reason: "card declined".to_string(),
			payment_id: None,
		};
		let value = serde_json::to_value(&error).unwrap();
		assert!(value.get("payment_id").is_none());
	}
}
