//! Payment capture, the third pipeline stage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fulfillment_types::{
	Address, CalculatedShipping, CartItem, OrderError, PaymentMethod, ProcessedPayment,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Structured failure reported by the payment gateway.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct PaymentError {
	pub code: String,
	pub message: String,
}

/// Gateway response for a charge attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
	pub payment_id: String,
	pub status: PaymentStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
	Success,
	Pending,
	Failed,
}

impl fmt::Display for PaymentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PaymentStatus::Success => write!(f, "success"),
			PaymentStatus::Pending => write!(f, "pending"),
			PaymentStatus::Failed => write!(f, "failed"),
		}
	}
}

/// The order row persisted before the charge is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
	pub id: String,
	pub user_id: String,
	pub items: Vec<CartItem>,
	pub shipping_address: Address,
	pub subtotal: Decimal,
	pub shipping_cost: Decimal,
	pub total_amount: Decimal,
	pub payment_method: PaymentMethod,
	pub status: OrderRecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRecordStatus {
	PendingPayment,
	Paid,
	Failed,
}

/// Charges the order total through the gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentService: Send + Sync {
	async fn process_payment(
		&self,
		amount: Decimal,
		method: &PaymentMethod,
		order_id: &str,
	) -> Result<PaymentResult, PaymentError>;
}

/// Write access to the orders store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
	/// Persists a new order row and returns its id.
	async fn create(&self, record: OrderRecord) -> anyhow::Result<String>;
}

/// Captures payment for a priced order.
pub struct PaymentProcessor {
	payment_service: Arc<dyn PaymentService>,
	order_repo: Arc<dyn OrderRepository>,
}

impl PaymentProcessor {
	pub fn new(payment_service: Arc<dyn PaymentService>, order_repo: Arc<dyn OrderRepository>) -> Self {
		Self {
			payment_service,
			order_repo,
		}
	}

	/// Persists the order in `pending_payment` status first, so a crash on
	/// the gateway side still leaves a recoverable row, then captures the
	/// charge. Only a `success` status advances the state.
	#[tracing::instrument(skip_all, fields(user_id = %calculated.user_id, total = %calculated.total_amount))]
	pub async fn process(&self, calculated: CalculatedShipping) -> Result<ProcessedPayment, OrderError> {
		let order_id = Uuid::new_v4().to_string();

		let record = OrderRecord {
			id: order_id.clone(),
			user_id: calculated.user_id.clone(),
			items: calculated.cart_items.clone(),
			shipping_address: calculated.shipping_address.clone(),
			subtotal: calculated.subtotal,
			shipping_cost: calculated.shipping_cost,
			total_amount: calculated.total_amount,
			payment_method: calculated.payment_method.clone(),
			status: OrderRecordStatus::PendingPayment,
		};

		self.order_repo
			.create(record)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to create order record: {e}"),
			})?;

		let result = self
			.payment_service
			.process_payment(calculated.total_amount, &calculated.payment_method, &order_id)
			.await
			.map_err(|e| OrderError::PaymentFailed {
				reason: format!("payment failed: {e}"),
				payment_id: None,
			})?;

		if result.status != PaymentStatus::Success {
			tracing::warn!(%order_id, status = %result.status, "payment not captured");
			return Err(OrderError::PaymentFailed {
				reason: format!("payment status: {}", result.status),
				payment_id: Some(result.payment_id),
			});
		}

		tracing::info!(%order_id, payment_id = %result.payment_id, "payment captured");

		Ok(ProcessedPayment {
			user_id: calculated.user_id,
			order_id,
			cart_items: calculated.cart_items,
			shipping_address: calculated.shipping_address,
			payment_id: result.payment_id,
			total_amount: calculated.total_amount,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_types::PaymentMethodKind;
	use mockall::predicate::eq;
	use mockall::Sequence;
	use serde_json::json;

	fn calculated() -> CalculatedShipping {
		CalculatedShipping {
			user_id: "user123".to_string(),
			cart_items: vec![CartItem {
				product_id: "prod1".to_string(),
				product_name: "Product 1".to_string(),
				price: Decimal::from(1000),
				quantity: 2,
			}],
			shipping_address: Address {
				street: "123 Main St".to_string(),
				city: "Tokyo".to_string(),
				postal_code: "100-0001".to_string(),
				country: "JP".to_string(),
			},
			payment_method: PaymentMethod {
				kind: PaymentMethodKind::CreditCard,
				details: json!({ "card_number": "****1234" }),
			},
			subtotal: Decimal::from(2000),
			shipping_cost: Decimal::from(500),
			total_amount: Decimal::from(2500),
		}
	}

	fn captured() -> PaymentResult {
		PaymentResult {
			payment_id: "payment123".to_string(),
			status: PaymentStatus::Success,
			transaction_id: Some("tx456".to_string()),
		}
	}

	#[tokio::test]
	async fn records_the_order_before_charging() {
		let mut seq = Sequence::new();

		let mut orders = MockOrderRepository::new();
		orders
			.expect_create()
			.times(1)
			.in_sequence(&mut seq)
			.withf(|record| {
				record.status == OrderRecordStatus::PendingPayment
					&& record.total_amount == Decimal::from(2500)
			})
			.returning(|record| Ok(record.id));

		let mut gateway = MockPaymentService::new();
		gateway
			.expect_process_payment()
			.times(1)
			.in_sequence(&mut seq)
			.with(eq(Decimal::from(2500)), mockall::predicate::always(), mockall::predicate::always())
			.returning(|_, _, _| Ok(captured()));

		let processed = PaymentProcessor::new(Arc::new(gateway), Arc::new(orders))
			.process(calculated())
			.await
			.unwrap();

		assert_eq!(processed.payment_id, "payment123");
		assert_eq!(processed.total_amount, Decimal::from(2500));
		assert!(!processed.order_id.is_empty());
	}

	#[tokio::test]
	async fn gateway_error_is_payment_failed_without_id() {
		let mut orders = MockOrderRepository::new();
		orders.expect_create().returning(|record| Ok(record.id));

		let mut gateway = MockPaymentService::new();
		gateway.expect_process_payment().returning(|_, _, _| {
			Err(PaymentError {
				code: "NETWORK_ERROR".to_string(),
				message: "network timeout".to_string(),
			})
		});

		let result = PaymentProcessor::new(Arc::new(gateway), Arc::new(orders))
			.process(calculated())
			.await;

		assert!(matches!(
			result,
			Err(OrderError::PaymentFailed {
				payment_id: None,
				..
			})
		));
	}

	#[tokio::test]
	async fn declined_status_keeps_the_gateway_payment_id() {
		let mut orders = MockOrderRepository::new();
		orders.expect_create().returning(|record| Ok(record.id));

		let mut gateway = MockPaymentService::new();
		gateway.expect_process_payment().returning(|_, _, _| {
			Ok(PaymentResult {
				payment_id: "payment123".to_string(),
				status: PaymentStatus::Failed,
				transaction_id: None,
			})
		});

		let result = PaymentProcessor::new(Arc::new(gateway), Arc::new(orders))
			.process(calculated())
			.await;

		assert_eq!(
			result.unwrap_err(),
			OrderError::PaymentFailed {
				reason: "payment status: failed".to_string(),
				payment_id: Some("payment123".to_string()),
			}
		);
	}

	#[tokio::test]
	async fn persistence_failure_never_reaches_the_gateway() {
		let mut orders = MockOrderRepository::new();
		orders
			.expect_create()
			.returning(|_| Err(anyhow::anyhow!("write conflict")));

		// No expectation on the gateway: a call would panic the test.
		let gateway = MockPaymentService::new();

		let result = PaymentProcessor::new(Arc::new(gateway), Arc::new(orders))
			.process(calculated())
			.await;

		assert!(matches!(result, Err(OrderError::Unknown { .. })));
	}
}
