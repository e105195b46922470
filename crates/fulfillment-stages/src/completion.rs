//! Order completion, the final pipeline stage.
//!
//! Three sequential sub-steps: create the shipment, mark the order
//! completed, notify the customer. The first failure aborts the stage at
//! that point; whatever already happened stays done and is reconciled
//! out-of-band rather than rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fulfillment_types::{AllocatedInventory, CompletedOrder, OrderError};
use serde::{Deserialize, Serialize};

use crate::shipping::{ShipmentLine, ShipmentRequest, ShippingService};

/// Tracking details attached to the order row when it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompletionMetadata {
	pub tracking_number: String,
	pub estimated_delivery: DateTime<Utc>,
	pub shipment_id: String,
	pub completed_at: DateTime<Utc>,
}

/// Status updates on the orders store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderUpdateRepository: Send + Sync {
	/// Marks the order completed and stores its tracking metadata.
	async fn mark_completed(
		&self,
		order_id: &str,
		metadata: OrderCompletionMetadata,
	) -> anyhow::Result<()>;
}

/// Customer-facing notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
	async fn send_order_completion(
		&self,
		user_id: &str,
		order_id: &str,
		tracking_number: &str,
	) -> anyhow::Result<()>;
}

/// Hands an allocated order to the carrier and closes it out.
pub struct OrderCompleter {
	shipping_service: Arc<dyn ShippingService>,
	order_update_repo: Arc<dyn OrderUpdateRepository>,
	notification_service: Arc<dyn NotificationService>,
}

impl OrderCompleter {
	pub fn new(
		shipping_service: Arc<dyn ShippingService>,
		order_update_repo: Arc<dyn OrderUpdateRepository>,
		notification_service: Arc<dyn NotificationService>,
	) -> Self {
		Self {
			shipping_service,
			order_update_repo,
			notification_service,
		}
	}

	#[tracing::instrument(skip_all, fields(order_id = %allocated.order_id))]
	pub async fn complete(&self, allocated: AllocatedInventory) -> Result<CompletedOrder, OrderError> {
		let request = Self::shipment_request(&allocated);

		let shipment = self
			.shipping_service
			.create_shipment(request)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to create shipment: {e}"),
			})?;

		let metadata = OrderCompletionMetadata {
			tracking_number: shipment.tracking_number.clone(),
			estimated_delivery: shipment.estimated_delivery,
			shipment_id: shipment.shipment_id.clone(),
			completed_at: Utc::now(),
		};

		self.order_update_repo
			.mark_completed(&allocated.order_id, metadata)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to update order status: {e}"),
			})?;

		self.notification_service
			.send_order_completion(
				&allocated.user_id,
				&allocated.order_id,
				&shipment.tracking_number,
			)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to send completion notification: {e}"),
			})?;

		tracing::info!(tracking_number = %shipment.tracking_number, "order completed");

		Ok(CompletedOrder {
			user_id: allocated.user_id,
			order_id: allocated.order_id,
			total_amount: allocated.total_amount,
			estimated_delivery: shipment.estimated_delivery,
			tracking_number: shipment.tracking_number,
		})
	}

	/// Joins cart items to their allocations by product id. An unmatched
	/// item falls back to the `"default"` warehouse; a successful
	/// allocation never leaves one.
	fn shipment_request(allocated: &AllocatedInventory) -> ShipmentRequest {
		let lines = allocated
			.cart_items
			.iter()
			.map(|item| {
				let warehouse_id = allocated
					.allocated_items
					.iter()
					.find(|alloc| alloc.product_id == item.product_id)
					.map(|alloc| alloc.warehouse_id.clone())
					.unwrap_or_else(|| "default".to_string());
				ShipmentLine {
					product_id: item.product_id.clone(),
					product_name: item.product_name.clone(),
					quantity: item.quantity,
					warehouse_id,
				}
			})
			.collect();

		ShipmentRequest {
			order_id: allocated.order_id.clone(),
			lines,
			shipping_address: allocated.shipping_address.clone(),
			total_amount: allocated.total_amount,
		}
	}
}
