//! Shipping calculation, the second pipeline stage, plus the carrier-facing
//! DTOs shared with order completion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fulfillment_types::{Address, CalculatedShipping, CartItem, OrderError, ValidatedCart};
use futures::future;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical properties of a product, used for freight pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetails {
	pub id: String,
	pub name: String,
	/// Grams.
	pub weight: f64,
	/// Centimeters.
	pub dimensions: Dimensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimensions {
	pub length: f64,
	pub width: f64,
	pub height: f64,
}

impl Dimensions {
	pub fn volume(&self) -> f64 {
		self.length * self.width * self.height
	}
}

/// One line of a shipment request, routed to a concrete warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLine {
	pub product_id: String,
	pub product_name: String,
	pub quantity: u32,
	pub warehouse_id: String,
}

/// Everything the carrier needs to pick up an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
	pub order_id: String,
	pub lines: Vec<ShipmentLine>,
	pub shipping_address: Address,
	pub total_amount: Decimal,
}

/// Carrier confirmation for a created shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResult {
	pub shipment_id: String,
	pub tracking_number: String,
	pub estimated_delivery: DateTime<Utc>,
	pub carrier: String,
}

/// Product catalog lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
	async fn product_details(&self, product_id: &str) -> anyhow::Result<Option<ProductDetails>>;
}

/// Carrier integration: freight pricing and shipment creation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShippingService: Send + Sync {
	async fn calculate_shipping_cost(
		&self,
		address: &Address,
		total_weight: f64,
		total_volume: f64,
	) -> anyhow::Result<Decimal>;

	async fn create_shipment(&self, request: ShipmentRequest) -> anyhow::Result<ShipmentResult>;
}

/// Prices freight for a validated cart and fixes the order total.
pub struct ShippingCalculator {
	shipping_service: Arc<dyn ShippingService>,
	product_repo: Arc<dyn ProductRepository>,
}

impl ShippingCalculator {
	pub fn new(
		shipping_service: Arc<dyn ShippingService>,
		product_repo: Arc<dyn ProductRepository>,
	) -> Self {
		Self {
			shipping_service,
			product_repo,
		}
	}

	/// Fetches every product's physical details concurrently, aggregates
	/// weight and volume, then prices the shipment with a single carrier
	/// call. `total_amount = subtotal + shipping_cost`.
	#[tracing::instrument(skip_all, fields(user_id = %validated.user_id))]
	pub async fn calculate(&self, validated: ValidatedCart) -> Result<CalculatedShipping, OrderError> {
		// Fan-out over the cart; the first failing item in cart order
		// decides the stage error.
		let lookups = validated.cart_items.iter().map(|item| self.product_for(item));
		let products = future::join_all(lookups)
			.await
			.into_iter()
			.collect::<Result<Vec<_>, _>>()?;

		let mut total_weight = 0.0;
		let mut total_volume = 0.0;
		for (item, product) in validated.cart_items.iter().zip(&products) {
			total_weight += product.weight * f64::from(item.quantity);
			total_volume += product.dimensions.volume() * f64::from(item.quantity);
		}

		let shipping_cost = self
			.shipping_service
			.calculate_shipping_cost(&validated.shipping_address, total_weight, total_volume)
			.await
			.map_err(|e| OrderError::ShippingCalculationFailed {
				reason: format!("failed to calculate shipping cost: {e}"),
			})?;

		tracing::debug!(%shipping_cost, total_weight, total_volume, "shipping calculated");

		Ok(CalculatedShipping {
			user_id: validated.user_id,
			cart_items: validated.cart_items,
			shipping_address: validated.shipping_address,
			payment_method: validated.payment_method,
			subtotal: validated.subtotal,
			shipping_cost,
			total_amount: validated.subtotal + shipping_cost,
		})
	}

	async fn product_for(&self, item: &CartItem) -> Result<ProductDetails, OrderError> {
		self.product_repo
			.product_details(&item.product_id)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to fetch product details for {}: {e}", item.product_id),
			})?
			.ok_or_else(|| OrderError::InvalidCart {
				reason: format!("product {} not found", item.product_id),
			})
	}
}
