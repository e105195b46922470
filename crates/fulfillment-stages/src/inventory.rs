//! Inventory allocation, the fourth pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fulfillment_types::{AllocatedInventory, AllocatedItem, CartItem, OrderError, ProcessedPayment};
use futures::future;
use serde::{Deserialize, Serialize};

/// A reservation handed back by the inventory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAllocation {
	pub product_id: String,
	pub quantity: u32,
	pub reservation_id: String,
	pub expires_at: DateTime<Utc>,
}

/// Stock levels and reservations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryService: Send + Sync {
	async fn check_availability(&self, product_id: &str, quantity: u32) -> anyhow::Result<bool>;
	async fn allocate_stock(
		&self,
		product_id: &str,
		quantity: u32,
	) -> anyhow::Result<InventoryAllocation>;
}

/// Warehouse routing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarehouseService: Send + Sync {
	async fn find_optimal_warehouse(&self, product_id: &str, quantity: u32)
		-> anyhow::Result<String>;
}

/// Reserves stock for every line item of a paid order.
pub struct InventoryAllocator {
	inventory_service: Arc<dyn InventoryService>,
	warehouse_service: Arc<dyn WarehouseService>,
}

impl InventoryAllocator {
	pub fn new(
		inventory_service: Arc<dyn InventoryService>,
		warehouse_service: Arc<dyn WarehouseService>,
	) -> Self {
		Self {
			inventory_service,
			warehouse_service,
		}
	}

	/// Allocates all line items, all-or-nothing. Per-item reservations run
	/// concurrently; the first failing item in cart order decides the stage
	/// error.
	#[tracing::instrument(skip_all, fields(order_id = %processed.order_id))]
	pub async fn allocate(&self, processed: ProcessedPayment) -> Result<AllocatedInventory, OrderError> {
		let reservations = processed.cart_items.iter().map(|item| self.allocate_item(item));
		let allocated_items = future::join_all(reservations)
			.await
			.into_iter()
			.collect::<Result<Vec<_>, _>>()?;

		tracing::info!(items = allocated_items.len(), "inventory allocated");

		Ok(AllocatedInventory {
			user_id: processed.user_id,
			order_id: processed.order_id,
			cart_items: processed.cart_items,
			shipping_address: processed.shipping_address,
			payment_id: processed.payment_id,
			total_amount: processed.total_amount,
			allocated_items,
		})
	}

	async fn allocate_item(&self, item: &CartItem) -> Result<AllocatedItem, OrderError> {
		let available = self
			.inventory_service
			.check_availability(&item.product_id, item.quantity)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!(
					"failed to check availability for product {}: {e}",
					item.product_id
				),
			})?;

		if !available {
			// The availability contract is a plain yes/no, so remaining
			// stock is reported as zero.
			return Err(OrderError::InsufficientInventory {
				product_id: item.product_id.clone(),
				requested: item.quantity,
				available: 0,
			});
		}

		let warehouse_id = self
			.warehouse_service
			.find_optimal_warehouse(&item.product_id, item.quantity)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to find warehouse for product {}: {e}", item.product_id),
			})?;

		let allocation = self
			.inventory_service
			.allocate_stock(&item.product_id, item.quantity)
			.await
			.map_err(|_| OrderError::InsufficientInventory {
				product_id: item.product_id.clone(),
				requested: item.quantity,
				available: 0,
			})?;

		Ok(AllocatedItem {
			product_id: allocation.product_id,
			quantity: allocation.quantity,
			warehouse_id,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use fulfillment_types::Address;
	use rust_decimal::Decimal;

	fn processed() -> ProcessedPayment {
		ProcessedPayment {
			user_id: "user123".to_string(),
			order_id: "order789".to_string(),
			cart_items: vec![
				CartItem {
					product_id: "prod1".to_string(),
					product_name: "Product 1".to_string(),
					price: Decimal::from(1000),
					quantity: 2,
				},
				CartItem {
					product_id: "prod2".to_string(),
					product_name: "Product 2".to_string(),
					price: Decimal::from(2000),
					quantity: 1,
				},
			],
			shipping_address: Address {
				street: "123 Main St".to_string(),
				city: "Tokyo".to_string(),
				postal_code: "100-0001".to_string(),
				country: "JP".to_string(),
			},
			payment_id: "payment123".to_string(),
			total_amount: Decimal::from(4500),
		}
	}

	fn reservation(product_id: &str, quantity: u32) -> InventoryAllocation {
		InventoryAllocation {
			product_id: product_id.to_string(),
			quantity,
			reservation_id: "res123".to_string(),
			expires_at: Utc::now() + Duration::hours(1),
		}
	}

	#[tokio::test]
	async fn allocates_every_line_item() {
		let mut inventory = MockInventoryService::new();
		inventory.expect_check_availability().returning(|_, _| Ok(true));
		inventory
			.expect_allocate_stock()
			.returning(|id, qty| Ok(reservation(id, qty)));

		let mut warehouses = MockWarehouseService::new();
		warehouses
			.expect_find_optimal_warehouse()
			.returning(|_, _| Ok("wh1".to_string()));

		let allocated = InventoryAllocator::new(Arc::new(inventory), Arc::new(warehouses))
			.allocate(processed())
			.await
			.unwrap();

		assert_eq!(allocated.allocated_items.len(), 2);
		assert!(allocated
			.allocated_items
			.iter()
			.all(|item| item.warehouse_id == "wh1"));
		assert_eq!(allocated.total_amount, Decimal::from(4500));
	}

	#[tokio::test]
	async fn unavailable_item_fails_the_whole_stage() {
		let mut inventory = MockInventoryService::new();
		inventory
			.expect_check_availability()
			.returning(|id, _| Ok(id != "prod1"));
		inventory
			.expect_allocate_stock()
			.returning(|id, qty| Ok(reservation(id, qty)));

		let mut warehouses = MockWarehouseService::new();
		warehouses
			.expect_find_optimal_warehouse()
			.returning(|_, _| Ok("wh1".to_string()));

		let result = InventoryAllocator::new(Arc::new(inventory), Arc::new(warehouses))
			.allocate(processed())
			.await;

		assert_eq!(
			result.unwrap_err(),
			OrderError::InsufficientInventory {
				product_id: "prod1".to_string(),
				requested: 2,
				available: 0,
			}
		);
	}

	#[tokio::test]
	async fn availability_check_failure_is_unknown() {
		let mut inventory = MockInventoryService::new();
		inventory
			.expect_check_availability()
			.returning(|_, _| Err(anyhow::anyhow!("inventory backend down")));

		let warehouses = MockWarehouseService::new();

		let result = InventoryAllocator::new(Arc::new(inventory), Arc::new(warehouses))
			.allocate(processed())
			.await;

		assert!(matches!(result, Err(OrderError::Unknown { .. })));
	}

	#[tokio::test]
	async fn warehouse_failure_is_unknown() {
		let mut inventory = MockInventoryService::new();
		inventory.expect_check_availability().returning(|_, _| Ok(true));

		let mut warehouses = MockWarehouseService::new();
		warehouses
			.expect_find_optimal_warehouse()
			.returning(|_, _| Err(anyhow::anyhow!("no route")));

		let result = InventoryAllocator::new(Arc::new(inventory), Arc::new(warehouses))
			.allocate(processed())
			.await;

		assert!(matches!(result, Err(OrderError::Unknown { .. })));
	}

	#[tokio::test]
	async fn reservation_failure_is_insufficient_inventory() {
		let mut inventory = MockInventoryService::new();
		inventory.expect_check_availability().returning(|_, _| Ok(true));
		inventory
			.expect_allocate_stock()
			.returning(|_, _| Err(anyhow::anyhow!("reservation conflict")));

		let mut warehouses = MockWarehouseService::new();
		warehouses
			.expect_find_optimal_warehouse()
			.returning(|_, _| Ok("wh1".to_string()));

		let result = InventoryAllocator::new(Arc::new(inventory), Arc::new(warehouses))
			.allocate(processed())
			.await;

		assert_eq!(
			result.unwrap_err(),
			OrderError::InsufficientInventory {
				product_id: "prod1".to_string(),
				requested: 2,
				available: 0,
			}
		);
	}
}
